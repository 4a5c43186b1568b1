//! Error types for the slotter.
//!
//! This module defines all error types used throughout the slotter crate.
//! Most variants carry the exact sentence shown to the operator, since the
//! tools are run by broadcast staff rather than developers.

use std::path::PathBuf;

use slotter_google::GoogleError;
use thiserror::Error;

/// The main error type for slotter operations.
#[derive(Error, Debug)]
pub enum Error {
    // === Configuration Errors ===
    /// Failed to load configuration.
    #[error("failed to load configuration: {0}")]
    ConfigLoad(Box<figment::Error>),

    /// Configuration validation failed.
    #[error("invalid configuration: {message}")]
    ConfigValidation {
        /// Description of the validation failure.
        message: String,
    },

    // === Google Errors ===
    /// A Google API call failed.
    #[error(transparent)]
    Google(#[from] GoogleError),

    /// Credentials are missing, invalid, or lack a scope.
    #[error("{0}")]
    Credentials(String),

    // === Input Errors ===
    /// The saved or supplied ROS document link is unusable.
    #[error("{0}")]
    RosDocument(String),

    /// The match schedule is missing, malformed, or does not fit the ROS.
    #[error("{0}")]
    Schedule(String),

    /// A spreadsheet tab does not have the expected layout.
    #[error("{0}")]
    Sheet(String),

    /// The script document or its block markers are unusable.
    #[error("{0}")]
    Script(String),

    /// A sheet has more placeholders than two-letter codes.
    #[error("{sheet}: ran out of placeholder codes after {limit} entries")]
    PlaceholderCodesExhausted {
        /// Sheet title.
        sheet: String,
        /// Number of available codes.
        limit: usize,
    },

    // === I/O Errors ===
    /// File system operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to read a file the operator pointed at.
    #[error("failed to read {path}: {source}")]
    FileRead {
        /// Path that couldn't be read.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// Failed to create a required directory.
    #[error("failed to create directory {path}: {source}")]
    DirectoryCreate {
        /// Path that couldn't be created.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    // === Serialization Errors ===
    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

const AUTHORIZE_COMMAND: &str = "fgslot tools credentials authorize";

/// Printed after errors that a fresh authorization would fix.
pub const REAUTHORIZE_HINT: &str =
    "Run `fgslot tools credentials authorize` to load Google Drive credentials.";

/// A specialized Result type for slotter operations.
pub type Result<T> = std::result::Result<T, Error>;

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::ConfigLoad(Box::new(err))
    }
}

impl Error {
    /// Create a credentials error.
    #[must_use]
    pub fn credentials(message: impl Into<String>) -> Self {
        Self::Credentials(message.into())
    }

    /// Create a ROS document error.
    #[must_use]
    pub fn ros_document(message: impl Into<String>) -> Self {
        Self::RosDocument(message.into())
    }

    /// Create a schedule error.
    #[must_use]
    pub fn schedule(message: impl Into<String>) -> Self {
        Self::Schedule(message.into())
    }

    /// Create a sheet layout error.
    #[must_use]
    pub fn sheet(message: impl Into<String>) -> Self {
        Self::Sheet(message.into())
    }

    /// Create a script error.
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::Script(message.into())
    }

    /// Create a configuration validation error.
    #[must_use]
    pub fn config_validation(message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            message: message.into(),
        }
    }

    /// Check if re-running the OAuth flow would fix this error.
    #[must_use]
    pub fn needs_reauthorization(&self) -> bool {
        match self {
            Self::Credentials(_) => true,
            Self::Google(err) => err.is_scope_error(),
            _ => false,
        }
    }

    /// A follow-up line for the operator, when the message itself does not
    /// already say what to run.
    #[must_use]
    pub fn hint(&self) -> Option<&'static str> {
        if !self.needs_reauthorization() || self.to_string().contains(AUTHORIZE_COMMAND) {
            return None;
        }
        Some(REAUTHORIZE_HINT)
    }
}
