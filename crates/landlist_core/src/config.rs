//! Engine configuration.
//!
//! Loaded from an optional TOML file; every field has a default so an empty
//! or missing file yields a working configuration.
//!
//! ```toml
//! storage_key = "landListings"
//! expiring_window_days = 30
//! extension_months = 6
//! log_level = "info"
//! ```

use crate::lifecycle::{DEFAULT_EXPIRING_WINDOW_DAYS, DEFAULT_EXTENSION_MONTHS};
use crate::logging::default_log_level;
use crate::repo::is_valid_storage_key;
use log::warn;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::Path;

/// Blob key holding the whole collection.
pub const DEFAULT_STORAGE_KEY: &str = "landListings";
/// Largest accepted `expiring_window_days` (about a century).
pub const MAX_EXPIRING_WINDOW_DAYS: i64 = 36_500;
/// Largest accepted `extension_months`.
pub const MAX_EXTENSION_MONTHS: u32 = 1_200;

#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Invalid(String),
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "failed to read config: {err}"),
            Self::Parse(err) => write!(f, "failed to parse config: {err}"),
            Self::Invalid(reason) => write!(f, "invalid config: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Parse(err) => Some(err),
            Self::Invalid(_) => None,
        }
    }
}

impl From<std::io::Error> for ConfigError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<toml::de::Error> for ConfigError {
    fn from(value: toml::de::Error) -> Self {
        Self::Parse(value)
    }
}

/// Tunables for the listing store and its host process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Blob key holding the serialized collection.
    pub storage_key: String,
    /// Look-ahead window for "expiring soon" reports.
    pub expiring_window_days: i64,
    /// Months added by a default extension.
    pub extension_months: u32,
    /// One of `trace|debug|info|warn|error`.
    pub log_level: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_string(),
            expiring_window_days: DEFAULT_EXPIRING_WINDOW_DAYS,
            extension_months: DEFAULT_EXTENSION_MONTHS,
            log_level: default_log_level().to_string(),
        }
    }
}

impl EngineConfig {
    /// Parses and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path)?;
        Self::from_toml_str(&source)
    }

    /// Reads a TOML file, falling back to defaults when it is missing or invalid.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::load(path) {
            Ok(config) => config,
            Err(ConfigError::Io(err)) if err.kind() == std::io::ErrorKind::NotFound => {
                Self::default()
            }
            Err(err) => {
                warn!(
                    "event=config_load module=config status=fallback path={} error={err}",
                    path.display()
                );
                Self::default()
            }
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !is_valid_storage_key(&self.storage_key) {
            return Err(ConfigError::Invalid(format!(
                "storage_key `{}` must match [A-Za-z0-9_.-]+",
                self.storage_key
            )));
        }
        if !(1..=MAX_EXPIRING_WINDOW_DAYS).contains(&self.expiring_window_days) {
            return Err(ConfigError::Invalid(format!(
                "expiring_window_days must be between 1 and {MAX_EXPIRING_WINDOW_DAYS}"
            )));
        }
        if !(1..=MAX_EXTENSION_MONTHS).contains(&self.extension_months) {
            return Err(ConfigError::Invalid(format!(
                "extension_months must be between 1 and {MAX_EXTENSION_MONTHS}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, EngineConfig, DEFAULT_STORAGE_KEY, MAX_EXPIRING_WINDOW_DAYS};

    #[test]
    fn empty_document_yields_defaults() {
        let config = EngineConfig::from_toml_str("").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.storage_key, DEFAULT_STORAGE_KEY);
        assert_eq!(config.expiring_window_days, 30);
    }

    #[test]
    fn partial_document_overrides_selected_fields() {
        let config = EngineConfig::from_toml_str("expiring_window_days = 7\n").unwrap();
        assert_eq!(config.expiring_window_days, 7);
        assert_eq!(config.extension_months, 6);
    }

    #[test]
    fn invalid_values_are_rejected() {
        let err = EngineConfig::from_toml_str("storage_key = \"../x\"").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_toml_str("expiring_window_days = 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));

        let err = EngineConfig::from_toml_str("extension_months = \"six\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn out_of_range_values_are_rejected() {
        let huge_window = "expiring_window_days = 200000000000000";
        let err = EngineConfig::from_toml_str(huge_window).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(reason) if reason.contains("36500")));

        let config = EngineConfig::from_toml_str("expiring_window_days = 36500").unwrap();
        assert_eq!(config.expiring_window_days, MAX_EXPIRING_WINDOW_DAYS);

        let err = EngineConfig::from_toml_str("extension_months = 1201").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::load_or_default(dir.path().join("absent.toml"));
        assert_eq!(config, EngineConfig::default());
    }
}
