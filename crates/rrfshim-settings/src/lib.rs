//! rrfshim Settings Crate
//!
//! Handles alias configuration files: loading, validation, saving and
//! building the translator they describe.

pub mod config;
pub mod error;

pub use config::{default_config_path, AliasConfig, CONFIG_DIR_NAME, CONFIG_FILE_NAME};
pub use error::{ConfigError, ConfigResult, SettingsError, SettingsResult};
