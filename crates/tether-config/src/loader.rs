//! Configuration loading from a JSON file and `TETHER_*` environment overrides.
//!
//! # Design
//! - File values override defaults; environment values override the file.
//! - Environment lookup is injectable so tests never mutate process state.

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::defaults::{ENV_LOG_LEVEL, ENV_POLL_INTERVAL_MS, ENV_POLL_MAX_ATTEMPTS};
use crate::error::{ConfigError, ConfigResult};
use crate::model::ControllerConfig;

impl ControllerConfig {
    /// Load configuration from `path` (when given) and the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error when the file cannot be read or parsed, or when a
    /// resulting value fails validation.
    pub fn load(path: Option<&Path>) -> ConfigResult<Self> {
        Self::load_with_env(path, |key| std::env::var(key).ok())
    }

    /// Load configuration using `env` to resolve environment overrides.
    ///
    /// # Errors
    ///
    /// See [`ControllerConfig::load`].
    pub fn load_with_env<F>(path: Option<&Path>, env: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(env)?;
        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> ConfigResult<Self> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        debug!(path = %path.display(), "loaded controller configuration file");
        Ok(config)
    }

    fn apply_env<F>(&mut self, env: F) -> ConfigResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = env(ENV_POLL_INTERVAL_MS) {
            self.poll_interval_ms = parse_number("poll_interval_ms", &value)?;
        }
        if let Some(value) = env(ENV_POLL_MAX_ATTEMPTS) {
            self.poll_max_attempts = parse_number("poll_max_attempts", &value)?;
        }
        if let Some(value) = env(ENV_LOG_LEVEL) {
            self.log_level = value;
        }
        Ok(())
    }

    /// Check invariants that serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidField`] for a zero poll interval, a zero
    /// attempt cap, or an empty log level.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.poll_interval_ms == 0 {
            return Err(invalid("poll_interval_ms", "0", "must be positive"));
        }
        if self.poll_max_attempts == 0 {
            return Err(invalid("poll_max_attempts", "0", "must be positive"));
        }
        if self.log_level.trim().is_empty() {
            return Err(invalid("log_level", &self.log_level, "must not be empty"));
        }
        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(field: &'static str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(field, value, "not a number"))
}

fn invalid(field: &'static str, value: &str, reason: &'static str) -> ConfigError {
    ConfigError::InvalidField {
        field,
        value: Some(value.to_string()),
        reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;
    use std::time::Duration;

    use anyhow::Result;
    use tether_core::OptionSet;

    fn env_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), (*value).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_polling() -> Result<()> {
        let config = ControllerConfig::load_with_env(None, env_from(&[]))?;
        assert_eq!(config.poll_interval(), Duration::from_secs(1));
        assert_eq!(config.poll_max_attempts, 60);
        assert!(config.global_options.is_empty());
        Ok(())
    }

    #[test]
    fn file_values_then_env_overrides() -> Result<()> {
        let mut file = tempfile::NamedTempFile::new()?;
        write!(
            file,
            r#"{{"global_options": {{"dir": "/srv/dl", "split": "4"}}, "poll_max_attempts": 10, "log_format": "json"}}"#
        )?;

        let config = ControllerConfig::load_with_env(
            Some(file.path()),
            env_from(&[("TETHER_POLL_INTERVAL_MS", "250"), ("TETHER_LOG_LEVEL", "debug")]),
        )?;

        assert_eq!(
            config.global_options,
            OptionSet::new().with("dir", "/srv/dl").with("split", "4")
        );
        assert_eq!(config.poll_max_attempts, 10);
        assert_eq!(config.poll_interval_ms, 250);
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.logging().format, tether_telemetry::LogFormat::Json);
        Ok(())
    }

    #[test]
    fn zero_attempts_are_rejected() {
        let err = ControllerConfig::load_with_env(
            None,
            env_from(&[("TETHER_POLL_MAX_ATTEMPTS", "0")]),
        )
        .expect_err("zero attempts");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "poll_max_attempts",
                ..
            }
        ));
    }

    #[test]
    fn non_numeric_env_is_rejected() {
        let err = ControllerConfig::load_with_env(
            None,
            env_from(&[("TETHER_POLL_INTERVAL_MS", "soon")]),
        )
        .expect_err("bad number");
        assert!(matches!(
            err,
            ConfigError::InvalidField {
                field: "poll_interval_ms",
                reason: "not a number",
                ..
            }
        ));
    }

    #[test]
    fn missing_and_malformed_files_are_reported() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let missing = dir.path().join("absent.json");
        assert!(matches!(
            ControllerConfig::load_with_env(Some(&missing), env_from(&[])),
            Err(ConfigError::Io { .. })
        ));

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{ not json")?;
        assert!(matches!(
            ControllerConfig::load_with_env(Some(&broken), env_from(&[])),
            Err(ConfigError::Parse { .. })
        ));
        Ok(())
    }
}
