//! The saved run-of-show (ROS) spreadsheet link.
//!
//! Every sheet tool works on the same spreadsheet, so its link is saved
//! once to a small text file and read back by each command. A link in the
//! configuration file takes precedence over the saved one.

use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use percent_encoding::percent_decode_str;
use regex::Regex;
use slotter_google::GoogleApi;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::text::{truncate_chars, MAX_MESSAGE_LEN};

static DOCUMENT_ID_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"/document/(?:u/\d+/)?d/([A-Za-z0-9_-]+)").expect("valid regex")
});

/// The spreadsheet ID in a Google Sheets link.
#[must_use]
pub fn extract_spreadsheet_id(url: &str) -> Option<String> {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.contains(&"spreadsheets") {
        if let Some(index) = parts.iter().position(|part| *part == "d") {
            if let Some(id) = parts.get(index + 1).filter(|id| !id.is_empty()) {
                return Some((*id).to_string());
            }
        }
    }

    if url.contains("spreadsheets") && url.contains("#gid") {
        let (path, _, _) = split_url(url);
        let segments: Vec<&str> = path.split('/').collect();
        if let Some(index) = segments.iter().position(|part| *part == "d") {
            return segments
                .get(index + 1)
                .filter(|id| !id.is_empty())
                .map(|id| (*id).to_string());
        }
    }
    None
}

/// The document ID in a Google Docs link.
#[must_use]
pub fn extract_document_id(url: &str) -> Option<String> {
    DOCUMENT_ID_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Split a link into `(path, query, fragment)`.
fn split_url(url: &str) -> (&str, &str, &str) {
    let (rest, fragment) = url.split_once('#').unwrap_or((url, ""));
    let (rest, query) = rest.split_once('?').unwrap_or((rest, ""));
    let path = match rest.split_once("://") {
        Some((_, after_scheme)) => after_scheme
            .find('/')
            .map_or("", |slash| &after_scheme[slash..]),
        None => rest,
    };
    (path, query, fragment)
}

fn decode(text: &str) -> String {
    percent_decode_str(text).decode_utf8_lossy().into_owned()
}

fn query_value(query: &str, keys: &[&str]) -> Option<String> {
    let pairs: Vec<(String, String)> = url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .filter(|(_, value)| !value.is_empty())
        .collect();
    keys.iter().find_map(|key| {
        pairs
            .iter()
            .find(|(name, _)| name == key)
            .map(|(_, value)| decode(value))
    })
}

/// A best-effort human-friendly name taken from the link itself.
#[must_use]
pub fn derive_document_name(url: &str) -> Option<String> {
    if url.is_empty() {
        return None;
    }
    let (path, query, fragment) = split_url(url);

    let from_path = path.split('/').rev().find(|part| {
        !part.is_empty()
            && !matches!(
                part.to_lowercase().as_str(),
                "edit" | "view" | "copy" | "d" | "spreadsheets" | "file"
            )
    });
    if let Some(part) = from_path {
        return Some(decode(part));
    }

    query_value(query, &["name", "title", "resourcekey"])
        .or_else(|| query_value(fragment, &["name", "title"]))
}

/// The ROS spreadsheet link, saved between runs.
#[derive(Debug, Clone)]
pub struct RosDocument {
    store_path: PathBuf,
    override_url: Option<String>,
    resolved_title: Option<String>,
}

impl RosDocument {
    /// Create a handle on the link stored at `store_path`.
    ///
    /// A non-empty `override_url` is used instead of the saved link.
    #[must_use]
    pub fn new(store_path: impl Into<PathBuf>, override_url: Option<String>) -> Self {
        Self {
            store_path: store_path.into(),
            override_url: override_url
                .map(|url| url.trim().to_string())
                .filter(|url| !url.is_empty()),
            resolved_title: None,
        }
    }

    /// Where the link is saved.
    #[must_use]
    pub fn store_path(&self) -> &Path {
        &self.store_path
    }

    /// Validate and save a link. Returns the spreadsheet ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the link is empty, has no spreadsheet ID, or
    /// cannot be written.
    pub fn save(&self, url: &str) -> Result<String> {
        let url = url.trim();
        if url.is_empty() {
            return Err(Error::ros_document(
                "Please enter a Google Sheets link before saving.",
            ));
        }
        let spreadsheet_id = extract_spreadsheet_id(url).ok_or_else(|| {
            Error::ros_document("Unable to determine spreadsheet ID from the provided link.")
        })?;

        if let Some(parent) = self.store_path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| Error::DirectoryCreate {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(&self.store_path, url).map_err(|e| {
            Error::ros_document(truncate_chars(
                &format!("Failed to save document URL: {e}"),
                MAX_MESSAGE_LEN,
            ))
        })?;

        info!(path = %self.store_path.display(), "ROS document URL saved.");
        Ok(spreadsheet_id)
    }

    /// The link in effect: the configured override, else the saved one.
    #[must_use]
    pub fn load_saved(&self) -> Option<String> {
        if let Some(url) = &self.override_url {
            return Some(url.clone());
        }
        match std::fs::read_to_string(&self.store_path) {
            Ok(text) => Some(text.trim().to_string()).filter(|url| !url.is_empty()),
            Err(err) => {
                debug!(
                    path = %self.store_path.display(),
                    error = %err,
                    "No saved ROS document URL"
                );
                None
            }
        }
    }

    /// The link and its spreadsheet ID, for a tool about to run.
    ///
    /// `action` completes the sentence "Save a ROS document URL before ...".
    ///
    /// # Errors
    ///
    /// Returns an error when no link is saved or it has no spreadsheet ID.
    pub fn require(&self, action: &str) -> Result<(String, String)> {
        let url = self.load_saved().ok_or_else(|| {
            Error::ros_document(format!("Save a ROS document URL before {action}."))
        })?;
        let spreadsheet_id = extract_spreadsheet_id(&url).ok_or_else(|| {
            Error::ros_document("Unable to determine spreadsheet ID from the saved document URL.")
        })?;
        Ok((url, spreadsheet_id))
    }

    /// Remember the spreadsheet title reported by Google.
    pub fn set_resolved_title(&mut self, title: &str) {
        let title = title.trim();
        if !title.is_empty() {
            self.resolved_title = Some(title.to_string());
        }
    }

    /// The name to show for the saved link.
    #[must_use]
    pub fn display_name(&self) -> String {
        let Some(url) = self.load_saved() else {
            return "Not set".to_string();
        };
        if let Some(title) = &self.resolved_title {
            return title.clone();
        }
        derive_document_name(&url)
            .or_else(|| extract_spreadsheet_id(&url).map(|id| format!("Spreadsheet {id}")))
            .unwrap_or_else(|| "Unknown".to_string())
    }

    /// Fetch the spreadsheet title from Google.
    ///
    /// Failures are logged and yield `None`; a missing title never stops a
    /// tool from running.
    pub async fn resolve_title(&mut self, api: &dyn GoogleApi) -> Option<String> {
        let spreadsheet_id = self.load_saved().and_then(|url| extract_spreadsheet_id(&url))?;
        match api.get_spreadsheet(&spreadsheet_id).await {
            Ok(spreadsheet) => {
                self.set_resolved_title(spreadsheet.title());
                self.resolved_title.clone()
            }
            Err(err) => {
                let message = format!("Failed to fetch spreadsheet details: {err}");
                warn!("{}", truncate_chars(&message, MAX_MESSAGE_LEN));
                None
            }
        }
    }
}
