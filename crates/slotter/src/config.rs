//! Configuration management for the slotter.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::schedule::FIELD_RANGE;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Default data directory name.
const DATA_DIR_NAME: &str = "slotter";

/// Default OAuth token file name.
const TOKEN_FILE_NAME: &str = "google_credentials.json";

/// Default saved ROS link file name.
const ROS_URL_FILE_NAME: &str = "ros_document_url.txt";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `SLOTTER_`, sections split on `__`)
/// 2. TOML config file at `~/.config/slotter/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Google API configuration.
    pub google: GoogleConfig,
    /// ROS spreadsheet configuration.
    pub ros: RosConfig,
    /// Match schedule configuration.
    pub schedule: ScheduleConfig,
    /// Placeholder generator configuration.
    pub placeholders: PlaceholderConfig,
}

/// Google API configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoogleConfig {
    /// Path to the OAuth client `credentials.json` downloaded from the
    /// Google Cloud console.
    pub client_secrets_path: Option<PathBuf>,
    /// Where the authorized token is stored.
    /// Defaults to `~/.local/share/slotter/google_credentials.json`
    pub token_path: Option<PathBuf>,
    /// Open the consent page in a browser during authorization.
    pub open_browser: bool,
    /// Timeout for each Google API request in seconds.
    pub http_timeout_secs: u64,
}

/// ROS spreadsheet configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RosConfig {
    /// Spreadsheet link to use instead of the saved one.
    pub document_url: Option<String>,
    /// Where the saved link is kept.
    /// Defaults to `~/.local/share/slotter/ros_document_url.txt`
    pub url_store_path: Option<PathBuf>,
}

/// Match schedule configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Schedule JSON used when no file is given on the command line.
    pub path: Option<PathBuf>,
    /// Competition field whose matches are slotted.
    pub field: u8,
}

/// Placeholder generator configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaceholderConfig {
    /// Sheets whose title contains this text are left alone.
    pub skip_sheet_marker: String,
}

impl Default for GoogleConfig {
    fn default() -> Self {
        Self {
            client_secrets_path: None,
            token_path: None, // Will be resolved to default at runtime
            open_browser: true,
            http_timeout_secs: 60,
        }
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            path: None,
            field: 1,
        }
    }
}

impl Default for PlaceholderConfig {
    fn default() -> Self {
        Self {
            skip_sheet_marker: "OC".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("SLOTTER_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a single TOML file without the environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is missing, unparsable, or invalid.
    pub fn check_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::config_validation(format!(
                "config file not found: {}",
                path.display()
            )));
        }
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(path))
            .extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(DATA_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Get the default data directory path.
    #[must_use]
    pub fn default_data_dir() -> PathBuf {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from(".local/share"))
            .join(DATA_DIR_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if !FIELD_RANGE.contains(&self.schedule.field) {
            return Err(Error::config_validation(format!(
                "schedule.field must be between {} and {} (got {})",
                FIELD_RANGE.start(),
                FIELD_RANGE.end(),
                self.schedule.field
            )));
        }

        if self.placeholders.skip_sheet_marker.trim().is_empty() {
            return Err(Error::config_validation(
                "placeholders.skip_sheet_marker must not be empty",
            ));
        }

        if self.google.http_timeout_secs == 0 {
            return Err(Error::config_validation(
                "google.http_timeout_secs must be greater than 0",
            ));
        }

        Ok(())
    }

    /// Get the token path, resolving defaults if not set.
    #[must_use]
    pub fn token_path(&self) -> PathBuf {
        self.google
            .token_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(TOKEN_FILE_NAME))
    }

    /// Get the saved ROS link path, resolving defaults if not set.
    #[must_use]
    pub fn ros_url_store_path(&self) -> PathBuf {
        self.ros
            .url_store_path
            .clone()
            .unwrap_or_else(|| Self::default_data_dir().join(ROS_URL_FILE_NAME))
    }

    /// Get the HTTP timeout as a Duration.
    #[must_use]
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.google.http_timeout_secs)
    }
}
