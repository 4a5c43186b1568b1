//! Installed-app OAuth flow and persisted user tokens.
//!
//! The flow follows Google's loopback redirect model: a one-shot listener on
//! `127.0.0.1` receives the authorization code, which is then exchanged for
//! an access token and a refresh token. Tokens are stored as JSON in the
//! same shape Google's own client libraries use for "authorized user" files.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Duration, Utc};
use rand::distr::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{GoogleError, Result};

/// Scopes the slotter needs: read Drive, edit Sheets, edit Docs.
pub const REQUIRED_SCOPES: [&str; 3] = [
    "https://www.googleapis.com/auth/drive.readonly",
    "https://www.googleapis.com/auth/spreadsheets",
    "https://www.googleapis.com/auth/documents",
];

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Tokens are treated as expired this long before their real expiry.
const EXPIRY_SKEW_SECS: i64 = 60;

const REDIRECT_RESPONSE: &str = "The authentication flow has completed. You may close this window.";

/// OAuth client configuration from a downloaded `credentials.json`.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct ClientSecrets {
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Consent endpoint.
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    /// Token endpoint.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

impl fmt::Debug for ClientSecrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClientSecrets")
            .field("client_id", &self.client_id)
            .field("auth_uri", &self.auth_uri)
            .field("token_uri", &self.token_uri)
            .finish_non_exhaustive()
    }
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

impl ClientSecrets {
    /// Parse a client secrets document.
    ///
    /// Google issues either an `installed` (desktop) or a `web` section; the
    /// desktop section wins when both are present.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is malformed or has neither section.
    pub fn parse(path: &Path, json: &str) -> Result<Self> {
        let file: ClientSecretsFile =
            serde_json::from_str(json).map_err(|e| GoogleError::ClientSecrets {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?;
        file.installed
            .or(file.web)
            .ok_or_else(|| GoogleError::ClientSecrets {
                path: path.to_path_buf(),
                message: "expected an \"installed\" or \"web\" client section".to_string(),
            })
    }

    /// Read and parse a client secrets file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| GoogleError::ClientSecrets {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::parse(path, &json)
    }
}

/// A persisted user authorization.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizedUser {
    /// Current access token.
    pub token: String,
    /// Long-lived refresh token.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Token endpoint used for refreshes.
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    /// OAuth client ID.
    pub client_id: String,
    /// OAuth client secret.
    #[serde(default)]
    pub client_secret: String,
    /// Granted scopes.
    #[serde(default)]
    pub scopes: Vec<String>,
    /// When the access token expires.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

impl fmt::Debug for AuthorizedUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthorizedUser")
            .field("client_id", &self.client_id)
            .field("has_refresh_token", &self.refresh_token.is_some())
            .field("scopes", &self.scopes)
            .field("expiry", &self.expiry)
            .finish_non_exhaustive()
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

impl AuthorizedUser {
    fn from_token_response(
        secrets: &ClientSecrets,
        requested_scopes: &[&str],
        response: TokenResponse,
        now: DateTime<Utc>,
    ) -> Self {
        let scopes = response.scope.as_deref().map_or_else(
            || requested_scopes.iter().map(ToString::to_string).collect(),
            |granted| granted.split_whitespace().map(str::to_string).collect(),
        );
        Self {
            token: response.access_token,
            refresh_token: response.refresh_token,
            token_uri: secrets.token_uri.clone(),
            client_id: secrets.client_id.clone(),
            client_secret: secrets.client_secret.clone(),
            scopes,
            expiry: response.expires_in.map(|secs| now + Duration::seconds(secs)),
        }
    }

    /// Check whether the access token is expired at `now`.
    ///
    /// Tokens without an expiry never expire.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expiry
            .is_some_and(|expiry| expiry - Duration::seconds(EXPIRY_SKEW_SECS) <= now)
    }

    /// Check whether the access token is expired now.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check whether the token is usable without a refresh.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        !self.token.is_empty() && !self.is_expired()
    }

    /// Check whether every scope in `required` was granted.
    #[must_use]
    pub fn has_scopes(&self, required: &[&str]) -> bool {
        required
            .iter()
            .all(|scope| self.scopes.iter().any(|granted| granted == scope))
    }

    /// Exchange the refresh token for a new access token.
    ///
    /// The existing refresh token is kept when Google does not issue a new
    /// one.
    ///
    /// # Errors
    ///
    /// Returns an error if there is no refresh token or the exchange fails.
    pub async fn refresh(&mut self, http: &reqwest::Client) -> Result<()> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or_else(|| GoogleError::oauth("no refresh token is available"))?;

        debug!(token_uri = %self.token_uri, "Refreshing access token");
        let response = http
            .post(&self.token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
            ])
            .send()
            .await?;
        let response: TokenResponse = parse_token_response(response).await?;

        self.token = response.access_token;
        self.expiry = response
            .expires_in
            .map(|secs| Utc::now() + Duration::seconds(secs));
        if let Some(new_refresh) = response.refresh_token {
            self.refresh_token = Some(new_refresh);
        }
        if let Some(scope) = response.scope {
            self.scopes = scope.split_whitespace().map(str::to_string).collect();
        }
        info!("Access token refreshed");
        Ok(())
    }
}

async fn parse_token_response(response: reqwest::Response) -> Result<TokenResponse> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(GoogleError::oauth(format!(
            "token endpoint returned {}: {}",
            status.as_u16(),
            body.trim()
        )));
    }
    serde_json::from_str(&body)
        .map_err(|e| GoogleError::oauth(format!("unexpected token response: {e}")))
}

/// JSON file holding an [`AuthorizedUser`].
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    /// Create a store backed by `path`.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored token, or `None` when nothing has been saved.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(&self) -> Result<Option<AuthorizedUser>> {
        let json = match std::fs::read_to_string(&self.path) {
            Ok(json) => json,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(GoogleError::TokenStore {
                    path: self.path.clone(),
                    source,
                })
            }
        };
        Ok(Some(serde_json::from_str(&json)?))
    }

    /// Save a token, creating parent directories as needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, user: &AuthorizedUser) -> Result<()> {
        let to_store_error = |source| GoogleError::TokenStore {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(to_store_error)?;
        }
        let json = serde_json::to_string_pretty(user)?;
        std::fs::write(&self.path, json).map_err(to_store_error)?;
        debug!(path = %self.path.display(), "Saved credentials");
        Ok(())
    }
}

/// Google's installed-app authorization flow.
#[derive(Debug, Clone)]
pub struct InstalledAppFlow {
    secrets: ClientSecrets,
    scopes: Vec<String>,
    open_browser: bool,
}

impl InstalledAppFlow {
    /// Create a flow for the given client and scopes.
    #[must_use]
    pub fn new(secrets: ClientSecrets, scopes: &[&str]) -> Self {
        Self {
            secrets,
            scopes: scopes.iter().map(ToString::to_string).collect(),
            open_browser: true,
        }
    }

    /// Choose whether to launch the system browser.
    #[must_use]
    pub fn with_open_browser(mut self, open_browser: bool) -> Self {
        self.open_browser = open_browser;
        self
    }

    /// Build the consent URL.
    ///
    /// # Errors
    ///
    /// Returns an error if the client's `auth_uri` is not a valid URL.
    pub fn authorization_url(&self, redirect_uri: &str, state: &str) -> Result<Url> {
        let scope = self.scopes.join(" ");
        Url::parse_with_params(
            &self.secrets.auth_uri,
            &[
                ("response_type", "code"),
                ("client_id", self.secrets.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("scope", scope.as_str()),
                ("state", state),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .map_err(|e| GoogleError::oauth(format!("invalid auth_uri: {e}")))
    }

    /// Run the flow end to end and return the authorized user.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot bind, the redirect carries an
    /// error or a mismatched state, or the code exchange fails.
    pub async fn authorize(&self, http: &reqwest::Client) -> Result<AuthorizedUser> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let port = listener.local_addr()?.port();
        let redirect_uri = format!("http://127.0.0.1:{port}/");
        let state = random_state();
        let url = self.authorization_url(&redirect_uri, &state)?;

        eprintln!("Please visit this URL to authorize this application:\n{url}");
        if self.open_browser {
            open_in_browser(url.as_str());
        }

        let code = accept_redirect(&listener, &state).await?;
        info!("Authorization code received, exchanging for tokens");

        let response = http
            .post(&self.secrets.token_uri)
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code.as_str()),
                ("client_id", self.secrets.client_id.as_str()),
                ("client_secret", self.secrets.client_secret.as_str()),
                ("redirect_uri", redirect_uri.as_str()),
            ])
            .send()
            .await?;
        let response = parse_token_response(response).await?;

        let scopes: Vec<&str> = self.scopes.iter().map(String::as_str).collect();
        Ok(AuthorizedUser::from_token_response(
            &self.secrets,
            &scopes,
            response,
            Utc::now(),
        ))
    }
}

fn random_state() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(30)
        .map(char::from)
        .collect()
}

fn open_in_browser(url: &str) {
    #[cfg(target_os = "macos")]
    let result = std::process::Command::new("open").arg(url).spawn();
    #[cfg(target_os = "windows")]
    let result = std::process::Command::new("cmd")
        .args(["/C", "start", "", url])
        .spawn();
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    let result = std::process::Command::new("xdg-open").arg(url).spawn();

    if let Err(e) = result {
        warn!("Could not open a browser: {e}");
    }
}

async fn accept_redirect(listener: &TcpListener, expected_state: &str) -> Result<String> {
    let (mut stream, peer) = listener.accept().await?;
    debug!(%peer, "Redirect connection accepted");

    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0_u8; 1024];
    loop {
        let read = stream.read(&mut chunk).await?;
        if read == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..read]);
        if buf.windows(4).any(|w| w == b"\r\n\r\n") || buf.len() > 16 * 1024 {
            break;
        }
    }

    let request = String::from_utf8_lossy(&buf);
    let result = parse_redirect(&request, expected_state);

    let body = match &result {
        Ok(_) => REDIRECT_RESPONSE.to_string(),
        Err(e) => e.to_string(),
    };
    let reply = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\n\
         Content-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(reply.as_bytes()).await?;
    stream.shutdown().await?;

    result
}

/// Extract the authorization code from the redirect's request line.
fn parse_redirect(request: &str, expected_state: &str) -> Result<String> {
    let target = request
        .lines()
        .next()
        .and_then(|line| line.split_whitespace().nth(1))
        .ok_or_else(|| GoogleError::oauth("malformed redirect request"))?;
    let url = Url::parse(&format!("http://127.0.0.1{target}"))
        .map_err(|e| GoogleError::oauth(format!("malformed redirect target: {e}")))?;

    let mut code = None;
    let mut state = None;
    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "code" => code = Some(value.into_owned()),
            "state" => state = Some(value.into_owned()),
            "error" => return Err(GoogleError::oauth(format!("consent denied: {value}"))),
            _ => {}
        }
    }

    if state.as_deref() != Some(expected_state) {
        return Err(GoogleError::oauth("state mismatch in redirect"));
    }
    code.ok_or_else(|| GoogleError::oauth("redirect did not include an authorization code"))
}
