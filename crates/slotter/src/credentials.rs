//! Google Drive credentials.
//!
//! Authorization happens once through the installed-app flow; the token is
//! stored on disk and refreshed on demand before each tool runs.

use std::path::{Path, PathBuf};

use slotter_google::{
    AuthorizedUser, ClientSecrets, DriveUser, GoogleApi, GoogleClient, InstalledAppFlow,
    TokenStore, REQUIRED_SCOPES,
};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::{Error, Result};
use crate::text::{truncate_chars, MAX_MESSAGE_LEN};

/// Shown when no token has been saved yet.
pub const NO_CREDENTIALS: &str = "No credentials loaded";

/// Loads, refreshes, and saves the stored Google token.
#[derive(Debug, Clone)]
pub struct CredentialManager {
    store: TokenStore,
    client_secrets_path: Option<PathBuf>,
    open_browser: bool,
    http: reqwest::Client,
}

fn message_error(prefix: &str, err: &impl std::fmt::Display) -> Error {
    Error::credentials(truncate_chars(&format!("{prefix}: {err}"), MAX_MESSAGE_LEN))
}

impl CredentialManager {
    /// Create a manager from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()
            .map_err(slotter_google::GoogleError::from)?;
        Ok(Self::new(
            TokenStore::new(config.token_path()),
            config.google.client_secrets_path.clone(),
            config.google.open_browser,
            http,
        ))
    }

    /// Create a manager from its parts.
    #[must_use]
    pub fn new(
        store: TokenStore,
        client_secrets_path: Option<PathBuf>,
        open_browser: bool,
        http: reqwest::Client,
    ) -> Self {
        Self {
            store,
            client_secrets_path,
            open_browser,
            http,
        }
    }

    /// Where the token is stored.
    #[must_use]
    pub fn token_path(&self) -> &Path {
        self.store.path()
    }

    /// Read the stored token, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the token file exists but cannot be read.
    pub fn load(&self) -> Result<Option<AuthorizedUser>> {
        self.store
            .load()
            .map_err(|e| message_error("Failed to load saved credentials", &e))
    }

    /// Return a usable token, refreshing and re-saving it when expired.
    ///
    /// # Errors
    ///
    /// Returns an error when no token is stored, the refresh fails, the
    /// token is invalid, or it lacks a required scope.
    pub async fn valid(&self) -> Result<AuthorizedUser> {
        let mut user = self.load()?.ok_or_else(|| {
            Error::credentials("Load Google Drive credentials before running this tool.")
        })?;

        if user.is_expired() && user.refresh_token.is_some() {
            user.refresh(&self.http)
                .await
                .map_err(|e| message_error("Failed to refresh credentials", &e))?;
            self.store.save(&user)?;
        }

        ensure_usable(&user)?;
        debug!(?user, "Credentials are valid");
        Ok(user)
    }

    /// An authenticated API client using the stored token.
    ///
    /// # Errors
    ///
    /// Returns an error if no valid token is available.
    pub async fn client(&self) -> Result<GoogleClient> {
        let user = self.valid().await?;
        Ok(GoogleClient::with_client(self.http.clone(), user.token))
    }

    /// Run the OAuth consent flow and save the resulting token.
    ///
    /// `client_secrets` overrides the configured secrets file. Returns the
    /// status line to show.
    ///
    /// # Errors
    ///
    /// Returns an error if no secrets file is known, the flow fails, or the
    /// token cannot be saved.
    pub async fn authorize(&self, client_secrets: Option<&Path>) -> Result<String> {
        let secrets_path = client_secrets
            .or(self.client_secrets_path.as_deref())
            .ok_or_else(|| Error::credentials("Please select a credentials.json file first."))?;

        info!("Starting OAuth flow...");
        let secrets = ClientSecrets::from_file(secrets_path)?;
        let flow =
            InstalledAppFlow::new(secrets, &REQUIRED_SCOPES).with_open_browser(self.open_browser);
        let user = flow
            .authorize(&self.http)
            .await
            .map_err(|e| message_error("Authorization failed", &e))?;

        self.store
            .save(&user)
            .map_err(|e| {
                message_error("Authorization succeeded, but saving credentials failed", &e)
            })?;
        Ok(format!(
            "Authorization successful. Credentials saved to {}.",
            self.store.path().display()
        ))
    }

    /// Describe the stored credentials and, when usable, the signed-in user.
    ///
    /// Returns the status lines to show; problems are reported rather than
    /// returned as errors.
    pub async fn status(&self, api: Option<&dyn GoogleApi>) -> Vec<String> {
        let mut lines = vec![format!("Token file: {}", self.store.path().display())];
        match self.load() {
            Ok(None) => {
                lines.push(NO_CREDENTIALS.to_string());
                return lines;
            }
            Err(err) => {
                lines.push(err.to_string());
                return lines;
            }
            Ok(Some(_)) => {}
        }

        match self.valid().await {
            Ok(user) => {
                lines.push("Loaded saved credentials. You're ready to go.".to_string());
                let owned;
                let api: &dyn GoogleApi = if let Some(api) = api {
                    api
                } else {
                    owned = GoogleClient::with_client(self.http.clone(), user.token);
                    &owned
                };
                lines.push(logged_in_user(api).await);
            }
            Err(err) => lines.push(err.to_string()),
        }
        lines
    }
}

/// Check a token's validity and scopes.
///
/// # Errors
///
/// Returns an error naming what is wrong with the token.
pub fn ensure_usable(user: &AuthorizedUser) -> Result<()> {
    if !user.is_valid() {
        return Err(Error::credentials(
            "Stored credentials are invalid. Please re-authorize.",
        ));
    }
    if !user.has_scopes(&REQUIRED_SCOPES) {
        return Err(Error::credentials(
            "Stored credentials are missing Google Docs access. Please re-authorize.",
        ));
    }
    Ok(())
}

/// `"Ada Lovelace • ada@example.org"`, omitting empty parts.
#[must_use]
pub fn format_user(user: &DriveUser) -> String {
    let parts: Vec<&str> = [user.display_name.trim(), user.email_address.trim()]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect();
    if parts.is_empty() {
        "Unknown user".to_string()
    } else {
        parts.join(" • ")
    }
}

/// Look up the signed-in user and describe them.
pub async fn logged_in_user(api: &dyn GoogleApi) -> String {
    match api.about_user().await {
        Ok(user) => format!("Logged in as {}.", format_user(&user)),
        Err(err) => truncate_chars(
            &format!("Failed to fetch logged-in user: {err}"),
            MAX_MESSAGE_LEN,
        ),
    }
}
