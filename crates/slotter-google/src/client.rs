//! Authenticated REST client for Sheets, Docs, and Drive.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::docs::{BatchUpdateDocumentRequest, DocRequest, Document};
use crate::error::{GoogleError, Result};
use crate::sheets::{BatchUpdateValuesRequest, Spreadsheet, ValueRange, SPREADSHEET_FIELDS};

const SHEETS_BASE: &str = "https://sheets.googleapis.com/v4/spreadsheets";
const DOCS_BASE: &str = "https://docs.googleapis.com/v1/documents";
const DRIVE_BASE: &str = "https://www.googleapis.com/drive/v3";

/// The signed-in Drive user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DriveUser {
    /// Display name.
    pub display_name: String,
    /// Email address.
    pub email_address: String,
}

#[derive(Deserialize)]
struct About {
    #[serde(default)]
    user: DriveUser,
}

/// The Google operations the slotter performs.
///
/// [`GoogleClient`] is the live implementation; tests substitute in-memory
/// fakes.
#[async_trait]
pub trait GoogleApi: Send + Sync {
    /// Fetch a spreadsheet with its grid data.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the file is an Office file
    /// in compatibility mode.
    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> Result<Spreadsheet>;

    /// Write values with `USER_ENTERED` semantics.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn batch_update_values(&self, spreadsheet_id: &str, data: &[ValueRange]) -> Result<()>;

    /// Fetch a document.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn get_document(&self, document_id: &str) -> Result<Document>;

    /// Apply document edits in order.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn batch_update_document(&self, document_id: &str, requests: &[DocRequest])
        -> Result<()>;

    /// Export a document as plain text through Drive.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn export_document_text(&self, document_id: &str) -> Result<String>;

    /// Look up the signed-in user.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    async fn about_user(&self) -> Result<DriveUser>;
}

/// Bearer-token HTTP client for the Google REST APIs.
#[derive(Debug, Clone)]
pub struct GoogleClient {
    http: reqwest::Client,
    access_token: String,
}

impl GoogleClient {
    /// Create a client reusing an existing [`reqwest::Client`].
    #[must_use]
    pub fn with_client(http: reqwest::Client, access_token: impl Into<String>) -> Self {
        Self {
            http,
            access_token: access_token.into(),
        }
    }

    // ---- private helpers ----

    /// Return the response unchanged on success, or a classified error
    /// carrying the body on failure.
    async fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<no body>".to_string());
        Err(GoogleError::from_response(status.as_u16(), body))
    }

    async fn parse_response<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        let response = Self::ensure_success(response).await?;
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl GoogleApi for GoogleClient {
    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> Result<Spreadsheet> {
        debug!(spreadsheet_id, "Fetching spreadsheet");
        let response = self
            .http
            .get(format!("{SHEETS_BASE}/{spreadsheet_id}"))
            .bearer_auth(&self.access_token)
            .query(&[("includeGridData", "true"), ("fields", SPREADSHEET_FIELDS)])
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn batch_update_values(&self, spreadsheet_id: &str, data: &[ValueRange]) -> Result<()> {
        debug!(spreadsheet_id, ranges = data.len(), "Writing values");
        let body = BatchUpdateValuesRequest {
            value_input_option: "USER_ENTERED",
            data,
        };
        let response = self
            .http
            .post(format!("{SHEETS_BASE}/{spreadsheet_id}/values:batchUpdate"))
            .bearer_auth(&self.access_token)
            .json(&body)
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> Result<Document> {
        debug!(document_id, "Fetching document");
        let response = self
            .http
            .get(format!("{DOCS_BASE}/{document_id}"))
            .bearer_auth(&self.access_token)
            .send()
            .await?;
        Self::parse_response(response).await
    }

    async fn batch_update_document(
        &self,
        document_id: &str,
        requests: &[DocRequest],
    ) -> Result<()> {
        debug!(document_id, requests = requests.len(), "Updating document");
        let response = self
            .http
            .post(format!("{DOCS_BASE}/{document_id}:batchUpdate"))
            .bearer_auth(&self.access_token)
            .json(&BatchUpdateDocumentRequest { requests })
            .send()
            .await?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    async fn export_document_text(&self, document_id: &str) -> Result<String> {
        debug!(document_id, "Exporting document text");
        let response = self
            .http
            .get(format!("{DRIVE_BASE}/files/{document_id}/export"))
            .bearer_auth(&self.access_token)
            .query(&[("mimeType", "text/plain")])
            .send()
            .await?;
        let response = Self::ensure_success(response).await?;
        Ok(response.text().await?)
    }

    async fn about_user(&self) -> Result<DriveUser> {
        let response = self
            .http
            .get(format!("{DRIVE_BASE}/about"))
            .bearer_auth(&self.access_token)
            .query(&[("fields", "user(displayName,emailAddress)")])
            .send()
            .await?;
        let about: About = Self::parse_response(response).await?;
        Ok(about.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_about_deserialize() {
        let about: About = serde_json::from_str(
            r#"{"user": {"displayName": "Ada", "emailAddress": "ada@example.org",
                "kind": "drive#user"}}"#,
        )
        .unwrap();
        assert_eq!(about.user.display_name, "Ada");
        assert_eq!(about.user.email_address, "ada@example.org");
    }

    #[test]
    fn test_about_without_user() {
        let about: About = serde_json::from_str("{}").unwrap();
        assert_eq!(about.user, DriveUser::default());
    }

    #[test]
    fn test_client_construction() {
        let client = GoogleClient::with_client(reqwest::Client::new(), "token");
        assert_eq!(client.access_token, "token");
    }
}
