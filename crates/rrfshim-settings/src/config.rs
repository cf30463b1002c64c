//! Alias configuration for rrfshim
//!
//! Loads extra or replacement alias tables from a JSON or TOML file and
//! builds the immutable translator from them. The file is read once at
//! startup; the resulting [`Translator`] never changes afterwards.
//!
//! A TOML file looks like:
//! ```toml
//! include_builtin = true
//!
//! [[aliases]]
//! name = "M107"
//! target = "KTC_SET_AND_SAVE_PARTFAN_SPEED"
//! fixed = [["S", "0"]]
//!
//! [[aliases.rules]]
//! source = "P"
//! target = "P"
//! ```

use rrfshim_core::{builtin_aliases, CommandAlias, ParameterRule, Translator};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult, SettingsError, SettingsResult};

/// Directory name under the platform config directory
pub const CONFIG_DIR_NAME: &str = "rrfshim";
/// Default alias file name
pub const CONFIG_FILE_NAME: &str = "aliases.toml";

fn default_include_builtin() -> bool {
    true
}

/// Alias configuration file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasConfig {
    /// Start from the built-in M106/M109/M568 tables
    #[serde(default = "default_include_builtin")]
    pub include_builtin: bool,
    /// Configured aliases; one named like a built-in replaces it
    #[serde(default)]
    pub aliases: Vec<CommandAlias>,
}

impl Default for AliasConfig {
    fn default() -> Self {
        Self {
            include_builtin: true,
            aliases: Vec::new(),
        }
    }
}

/// Supported file formats
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> ConfigResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(ConfigError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}

impl AliasConfig {
    /// Create config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse TOML text
    pub fn from_toml_str(content: &str) -> SettingsResult<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse JSON text
    pub fn from_json_str(content: &str) -> SettingsResult<Self> {
        let config: Self = serde_json::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let format = Format::from_path(path)?;
        let content = std::fs::read_to_string(path).map_err(|e| {
            SettingsError::LoadError(format!("{}: {}", path.display(), e))
        })?;

        let config = match format {
            Format::Json => Self::from_json_str(&content)?,
            Format::Toml => Self::from_toml_str(&content)?,
        };

        info!(
            path = %path.display(),
            aliases = config.aliases.len(),
            include_builtin = config.include_builtin,
            "loaded alias configuration"
        );
        Ok(config)
    }

    /// Load the given file, else the default file if it exists, else defaults
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match default_config_path() {
            Ok(default) if default.is_file() => Self::load_from_file(&default),
            Ok(default) => {
                debug!(path = %default.display(), "no alias configuration, using built-in tables");
                Ok(Self::default())
            }
            Err(e) => {
                debug!(error = %e, "no config directory, using built-in tables");
                Ok(Self::default())
            }
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::from_path(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        std::fs::write(path, content).map_err(|e| {
            SettingsError::SaveError(format!("{}: {}", path.display(), e))
        })?;

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> ConfigResult<()> {
        let mut seen = HashSet::new();
        for alias in &self.aliases {
            let context = format!("alias {}", alias.name);
            check_name(&alias.name, "alias name")?;
            if !seen.insert(alias.name.to_ascii_uppercase()) {
                return Err(ConfigError::DuplicateAlias(alias.name.clone()));
            }
            if alias.target.is_empty() {
                return Err(ConfigError::MissingKey(format!("{}.target", context)));
            }
            check_name(&alias.target, &context)?;
            check_rules(&alias.rules, &context)?;
            check_fixed(&alias.fixed, &context)?;

            for chained in &alias.chained {
                let context = format!("{} chained {}", context, chained.target);
                check_name(&chained.target, &context)?;
                for name in chained
                    .requires_all
                    .iter()
                    .chain(&chained.requires_any)
                    .chain(&chained.carry)
                {
                    check_name(name, &context)?;
                }
                check_rules(&chained.rules, &context)?;
                check_fixed(&chained.fixed, &context)?;
            }
        }
        Ok(())
    }

    /// Build the translator described by this configuration
    pub fn build_translator(&self) -> Translator {
        let base = if self.include_builtin {
            builtin_aliases()
        } else {
            Vec::new()
        };
        Translator::new(base.into_iter().chain(self.aliases.iter().cloned()))
    }
}

/// Platform location of the default alias file
pub fn default_config_path() -> ConfigResult<PathBuf> {
    dirs::config_dir()
        .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
        .ok_or_else(|| ConfigError::UnsupportedPlatform(std::env::consts::OS.to_string()))
}

/// Names must survive a round trip through a command line
fn check_name(name: &str, context: &str) -> ConfigResult<()> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidName {
            name: name.to_string(),
            context: context.to_string(),
        })
    }
}

fn check_rules(rules: &[ParameterRule], context: &str) -> ConfigResult<()> {
    for rule in rules {
        check_name(&rule.source, context)?;
        check_name(&rule.target, context)?;
    }
    Ok(())
}

fn check_fixed(fixed: &[(String, String)], context: &str) -> ConfigResult<()> {
    for (name, _) in fixed {
        check_name(name, context)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rrfshim_core::{InvocationContext, ValueTransform};

    const FAN_OFF: &str = r#"
[[aliases]]
name = "M107"
target = "KTC_SET_AND_SAVE_PARTFAN_SPEED"
description = "Turn part cooling fan off"
fixed = [["S", "0"]]

[[aliases.rules]]
source = "P"
target = "P"

[[aliases.rules]]
source = "T"
target = "P"
"#;

    #[test]
    fn test_default_includes_builtin() {
        let config = AliasConfig::default();
        assert!(config.include_builtin);
        let translator = config.build_translator();
        assert!(translator.is_legacy("M106"));
        assert!(translator.is_legacy("M109"));
        assert!(translator.is_legacy("M568"));
    }

    #[test]
    fn test_parse_toml_alias() {
        let config = AliasConfig::from_toml_str(FAN_OFF).unwrap();
        assert!(config.include_builtin);
        assert_eq!(config.aliases.len(), 1);
        assert_eq!(config.aliases[0].rules[1].transform, ValueTransform::Identity);

        let translator = config.build_translator();
        let supplied = InvocationContext::from_pairs([("T", "1")]);
        let translation = translator.translate("M107", &supplied).unwrap();
        assert_eq!(
            translation.primary().to_string(),
            "KTC_SET_AND_SAVE_PARTFAN_SPEED P=1 S=0"
        );
    }

    #[test]
    fn test_transform_in_toml() {
        let content = r#"
include_builtin = false

[[aliases]]
name = "M106"
target = "SET_FAN"

[[aliases.rules]]
source = "S"
target = "SPEED"
transform = { kind = "default_if_empty", value = "1" }
"#;
        let config = AliasConfig::from_toml_str(content).unwrap();
        let translator = config.build_translator();
        assert_eq!(translator.aliases().len(), 1);

        let supplied = InvocationContext::from_pairs([("S", "")]);
        let translation = translator.translate("M106", &supplied).unwrap();
        assert_eq!(translation.primary().to_string(), "SET_FAN SPEED=1");
        assert!(!translator.is_legacy("M568"));
    }

    #[test]
    fn test_configured_alias_replaces_builtin() {
        let mut config = AliasConfig::default();
        config.aliases.push(
            CommandAlias::new("M106", "MY_FAN").rule(ParameterRule::passthrough("S")),
        );
        let translator = config.build_translator();
        assert_eq!(translator.aliases().len(), 3);

        let supplied = InvocationContext::from_pairs([("S", "9"), ("T", "1")]);
        let translation = translator.translate("M106", &supplied).unwrap();
        assert_eq!(translation.primary().to_string(), "MY_FAN S=9");
    }

    #[test]
    fn test_validate_rejects_duplicates() {
        let mut config = AliasConfig::default();
        config.aliases.push(CommandAlias::new("M107", "FAN"));
        config.aliases.push(CommandAlias::new("m107", "FAN"));
        assert_eq!(
            config.validate(),
            Err(ConfigError::DuplicateAlias("M107".to_string()))
        );
    }

    #[test]
    fn test_validate_rejects_bad_names() {
        let mut config = AliasConfig::default();
        config.aliases.push(CommandAlias::new("M107", "SET FAN"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidName { .. })
        ));

        let mut config = AliasConfig::default();
        config.aliases.push(CommandAlias::new("M107", ""));
        assert!(matches!(config.validate(), Err(ConfigError::MissingKey(_))));

        let mut config = AliasConfig::default();
        config
            .aliases
            .push(CommandAlias::new("M107", "FAN").rule(ParameterRule::new("S", "SP=1")));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidName { .. })
        ));
    }

    #[test]
    fn test_validation_error_surfaces_on_parse() {
        let content = r#"
[[aliases]]
name = "M107"
target = "SET FAN"
"#;
        let err = AliasConfig::from_toml_str(content).unwrap_err();
        assert!(matches!(err, SettingsError::Config(_)));
    }

    #[test]
    fn test_unsupported_extension() {
        let err = AliasConfig::load_from_file(Path::new("aliases.yaml")).unwrap_err();
        assert!(matches!(
            err,
            SettingsError::Config(ConfigError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_default_config_path_file_name() {
        if let Ok(path) = default_config_path() {
            assert!(path.ends_with(Path::new(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME)));
        }
    }
}
