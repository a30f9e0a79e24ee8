//! Configuration management for groupstore
//!
//! Defaults, `GROUPSTORE_*` environment overrides, and TOML files. The
//! membership core only ever sees [`MembershipConfig`]; the other sections
//! are for the command line front end.

use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;

mod error;

pub use error::ConfigError;

/// Fan-out used by indexed member lists when no split threshold is set
pub const DEFAULT_MAX_FAN_OUT: usize = 1000;

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Group membership configuration
    pub membership: MembershipConfig,

    /// Store configuration
    pub store: StoreConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Membership configuration, fixed for the lifetime of a manager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MembershipConfig {
    /// 0 selects the flat representation for new groups; a positive value
    /// selects the indexed one and is the maximum fan-out of its nodes
    pub split_threshold: usize,

    /// Save the store after every successful mutation
    pub auto_save: bool,
}

/// Store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// JSON file backing the node store
    pub data_file: PathBuf,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for MembershipConfig {
    fn default() -> Self {
        Self {
            split_threshold: 0,
            auto_save: true,
        }
    }
}

impl MembershipConfig {
    pub fn min_fan_out(&self) -> usize {
        self.split_threshold / 2
    }

    pub fn max_fan_out(&self) -> usize {
        self.split_threshold
    }

    /// `(min, max)` children per node of an indexed member list
    ///
    /// Groups keep an existing indexed list when the threshold is later set
    /// to 0, so that case falls back to [`DEFAULT_MAX_FAN_OUT`].
    pub fn fan_out(&self) -> (usize, usize) {
        if self.split_threshold < 2 {
            (DEFAULT_MAX_FAN_OUT / 2, DEFAULT_MAX_FAN_OUT)
        } else {
            (self.min_fan_out(), self.max_fan_out())
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("./groupstore.json"),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

fn parse<T: std::str::FromStr>(key: &str, value: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidEnv {
            key: key.to_string(),
            value: value.to_string(),
            reason: e.to_string(),
        })
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// Environment variables follow the pattern: GROUPSTORE_<SECTION>_<KEY>
    /// Example: GROUPSTORE_MEMBERSHIP_SPLIT_THRESHOLD=1000
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Like [`from_env`](Self::from_env) with a custom variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        // Membership config
        if let Some(v) = lookup("GROUPSTORE_MEMBERSHIP_SPLIT_THRESHOLD") {
            config.membership.split_threshold = parse("GROUPSTORE_MEMBERSHIP_SPLIT_THRESHOLD", &v)?;
        }
        if let Some(v) = lookup("GROUPSTORE_MEMBERSHIP_AUTO_SAVE") {
            config.membership.auto_save = parse("GROUPSTORE_MEMBERSHIP_AUTO_SAVE", &v)?;
        }

        // Store config
        if let Some(v) = lookup("GROUPSTORE_STORE_DATA_FILE") {
            config.store.data_file = PathBuf::from(v);
        }

        // Logging config
        if let Some(v) = lookup("GROUPSTORE_LOG_LEVEL") {
            config.logging.level = v;
        }
        if let Some(v) = lookup("GROUPSTORE_LOG_JSON") {
            config.logging.json_format = parse("GROUPSTORE_LOG_JSON", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<std::path::Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: Self = toml::from_str(&contents)?;

        config.validate()?;
        Ok(config)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.membership.split_threshold == 1 {
            return Err(ConfigError::Invalid(
                "split_threshold must be 0 or at least 2".to_string(),
            ));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(())
    }
}
