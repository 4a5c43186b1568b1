//! Error types for the Google API client.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced while talking to Google or handling OAuth tokens.
#[derive(Debug, Error)]
pub enum GoogleError {
    /// The HTTP request itself failed (network, DNS, TLS, etc.).
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Google returned a non-2xx status code.
    #[error("Google API error ({status}): {body}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Raw response body for debugging.
        body: String,
    },

    /// The access token does not carry the scopes this request needs.
    #[error(
        "Your Google credentials do not grant access to Google Docs. \
         Run `fgslot tools credentials authorize` to sign in again."
    )]
    InsufficientScopes,

    /// The spreadsheet is an Office file opened in compatibility mode.
    #[error(
        "The selected file is stored in Office Compatibility mode. \
         Open it in Google Sheets and use File → Save as Google Sheets, then try again."
    )]
    OfficeCompatibility,

    /// The client secrets file could not be used.
    #[error("invalid client secrets file {path}: {message}")]
    ClientSecrets {
        /// Path to the secrets file.
        path: PathBuf,
        /// Description of what went wrong.
        message: String,
    },

    /// The OAuth exchange failed.
    #[error("authorization failed: {0}")]
    OAuth(String),

    /// Reading or writing the stored token failed.
    #[error("token store error at {path}: {source}")]
    TokenStore {
        /// Path to the token file.
        path: PathBuf,
        /// The underlying error.
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Local I/O for the redirect listener failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for Google client operations.
pub type Result<T> = std::result::Result<T, GoogleError>;

impl GoogleError {
    /// Create a new OAuth error.
    #[must_use]
    pub fn oauth(message: impl Into<String>) -> Self {
        Self::OAuth(message.into())
    }

    /// Check if this error is a missing-scope problem that a fresh
    /// authorization would fix.
    #[must_use]
    pub fn is_scope_error(&self) -> bool {
        matches!(self, Self::InsufficientScopes)
    }

    /// Classify a failed response body.
    ///
    /// Google reports missing scopes either in the message text or through the
    /// `ACCESS_TOKEN_SCOPE_INSUFFICIENT` reason in the error details.
    pub(crate) fn from_response(status: u16, body: String) -> Self {
        let lowered = body.to_lowercase();
        if lowered.contains("insufficient authentication scopes")
            || body.contains("ACCESS_TOKEN_SCOPE_INSUFFICIENT")
        {
            return Self::InsufficientScopes;
        }
        if status == 400 && lowered.contains("not supported for this document") {
            return Self::OfficeCompatibility;
        }
        Self::Api { status, body }
    }
}
