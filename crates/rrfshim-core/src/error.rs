//! Error handling for rrfshim
//!
//! Provides the error types for every layer of the translator:
//! - Translation errors (alias lookup)
//! - Command line errors (reading raw text commands)
//! - Executor errors (handing dispatches to the host)
//!
//! Values carried by parameters are never validated here; they are forwarded
//! as text and judged by the target command.
//!
//! All error types use `thiserror` for ergonomic error handling.

use thiserror::Error;

/// Translation error type
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslateError {
    /// The command name has no alias table
    #[error("Unknown legacy command: {name}")]
    UnknownCommand {
        /// The command name that was looked up.
        name: String,
    },
}

/// Command line error type
///
/// Represents problems found while splitting a raw text line into a
/// command name and its named parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandLineError {
    /// Line contains parameters but no command name
    #[error("Missing command name in '{line}'")]
    MissingName {
        /// The offending line.
        line: String,
    },

    /// A parameter token could not be split into name and value
    #[error("Malformed parameter '{token}' for {command}")]
    MalformedParameter {
        /// The command the token belongs to.
        command: String,
        /// The token as written.
        token: String,
    },

    /// A quoted value was never closed
    #[error("Unterminated quote in parameters of {command}")]
    UnterminatedQuote {
        /// The command whose parameters were being read.
        command: String,
    },
}

/// Executor error type
///
/// Returned by [`crate::CommandExecutor`] implementations when a dispatch
/// cannot be handed to the host.
#[derive(Error, Debug)]
pub enum ExecutorError {
    /// Writing the dispatch failed
    #[error("I/O error while dispatching {command}: {source}")]
    Io {
        /// The target command being dispatched.
        command: String,
        /// The underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// The host refused the dispatch
    #[error("Dispatch of {command} rejected: {reason}")]
    Rejected {
        /// The target command being dispatched.
        command: String,
        /// The reason given by the host.
        reason: String,
    },
}

/// Main error type for rrfshim
///
/// A unified error type that can represent any error from the translator.
#[derive(Error, Debug)]
pub enum Error {
    /// Translation error
    #[error(transparent)]
    Translate(#[from] TranslateError),

    /// Command line error
    #[error(transparent)]
    CommandLine(#[from] CommandLineError),

    /// Executor error
    #[error(transparent)]
    Executor(#[from] ExecutorError),
}

impl Error {
    /// Check if this is an unknown command error
    pub fn is_unknown_command(&self) -> bool {
        matches!(self, Error::Translate(TranslateError::UnknownCommand { .. }))
    }

    /// Check if this is a command line error
    pub fn is_command_line_error(&self) -> bool {
        matches!(self, Error::CommandLine(_))
    }

    /// Check if this is an executor error
    pub fn is_executor_error(&self) -> bool {
        matches!(self, Error::Executor(_))
    }
}

/// Result type using Error
pub type Result<T> = std::result::Result<T, Error>;
