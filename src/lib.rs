//! # rrfshim
//!
//! Translates RRF-style fan and tool temperature commands (`M106`, `M109`,
//! `M568`) into the tool-changer's own commands.
//!
//! ## Architecture
//!
//! 1. **rrfshim-core** - Alias tables, command line reader, translator, executors
//! 2. **rrfshim-settings** - Alias configuration files
//! 3. **rrfshim** - Stream session and command line binary

pub mod session;

pub use rrfshim_core::{
    builtin_aliases, ChainedDispatch, CommandAlias, CommandExecutor, CommandLine,
    CommandLineError, CommandSyntax, Dispatch, Error, ExecutorError, InvocationContext,
    ParameterRule, RecordingExecutor, Result, TranslateError, Translation, Translator,
    ValueTransform, WriterExecutor,
};
pub use rrfshim_settings::{default_config_path, AliasConfig, ConfigError, SettingsError};
pub use session::{LineOutcome, SessionStats, StreamSink, TranslationSession};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build date (set at compile time)
pub const BUILD_DATE: &str = env!("BUILD_DATE");

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human readable, multi-line
    #[default]
    Pretty,
    /// One JSON object per event
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => Err(format!("Unknown log format: {}", other)),
        }
    }
}

/// Initialize logging
///
/// Sets up structured logging with:
/// - stderr output, so stdout carries only the command stream
/// - RUST_LOG environment variable support (defaults to `warn`)
pub fn init_logging(format: LogFormat) -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::prelude::*;
    use tracing_subscriber::EnvFilter;

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    match format {
        LogFormat::Pretty => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .with_level(true)
                .with_line_number(true)
                .pretty();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
        LogFormat::Json => {
            let fmt_layer = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .json();

            tracing_subscriber::registry()
                .with(env_filter)
                .with(fmt_layer)
                .try_init()?;
        }
    }

    Ok(())
}
