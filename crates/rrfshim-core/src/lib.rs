//! # rrfshim Core
//!
//! Translates RRF-style tool, fan and heater commands into the parameter
//! syntax of the tool-changer's own commands.
//! Provides the alias tables, the command line reader, the translator and
//! the executor seam through which dispatches leave the crate.

pub mod alias;
pub mod builtin;
pub mod command;
pub mod dispatch;
pub mod error;
pub mod translator;

pub use alias::{ChainedDispatch, CommandAlias, ParameterRule, ValueTransform};
pub use builtin::builtin_aliases;
pub use command::{CommandLine, CommandSyntax, InvocationContext};
pub use dispatch::{CommandExecutor, Dispatch, RecordingExecutor, WriterExecutor};
pub use error::{CommandLineError, Error, ExecutorError, Result, TranslateError};
pub use translator::{Translation, Translator};
