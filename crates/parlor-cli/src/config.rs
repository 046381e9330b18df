//! Configuration loading and management.

use std::fmt;
use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{Duration, FixedOffset};
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use parlor_core::CoreConfig;
use serde::{Deserialize, Serialize};

/// Application configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Path to the database file.
    pub database_path: PathBuf,

    /// Reference time zone for day-boundary attribution, as a fixed UTC
    /// offset (e.g. `+09:00`).
    pub timezone_offset: String,

    /// How many seconds in the future a session start time may lie.
    pub future_skew_secs: i64,

    /// SQLite busy timeout in milliseconds.
    pub store_timeout_ms: u64,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("database_path", &self.database_path)
            .field("timezone_offset", &self.timezone_offset)
            .field("future_skew_secs", &self.future_skew_secs)
            .field("store_timeout_ms", &self.store_timeout_ms)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            database_path: data_dir.join("parlor.db"),
            timezone_offset: "+00:00".to_string(),
            future_skew_secs: 300,
            store_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (PARLOR_*)
        figment = figment.merge(Env::prefixed("PARLOR_"));

        figment.extract()
    }

    /// Converts the loaded values into the explicit core configuration.
    pub fn core_config(&self) -> anyhow::Result<CoreConfig> {
        let reference_tz: FixedOffset = self
            .timezone_offset
            .parse()
            .with_context(|| format!("invalid timezone offset: {}", self.timezone_offset))?;
        Ok(CoreConfig {
            reference_tz,
            future_skew: Duration::seconds(self.future_skew_secs),
            store_timeout: std::time::Duration::from_millis(self.store_timeout_ms),
        })
    }
}

/// Returns the platform-specific config directory for parlor.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("parlor"))
}

/// Returns the platform-specific data directory for parlor.
///
/// On Linux: `~/.local/share/parlor`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("parlor"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dirs_data_path_ends_with_parlor() {
        let path = dirs_data_path().unwrap();
        assert_eq!(path.file_name().unwrap(), "parlor");
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("parlor.db"));
    }

    #[test]
    fn test_default_core_config_is_utc() {
        let core = Config::default().core_config().unwrap();
        assert_eq!(core.reference_tz.local_minus_utc(), 0);
        assert_eq!(core.future_skew, Duration::seconds(300));
        assert_eq!(core.store_timeout, std::time::Duration::from_secs(5));
    }

    #[test]
    fn test_offset_parsing() {
        let config = Config {
            timezone_offset: "+09:00".to_string(),
            ..Config::default()
        };
        let core = config.core_config().unwrap();
        assert_eq!(core.reference_tz.local_minus_utc(), 9 * 3600);

        let config = Config {
            timezone_offset: "tokyo".to_string(),
            ..Config::default()
        };
        assert!(config.core_config().is_err());
    }
}
