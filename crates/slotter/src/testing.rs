//! Test doubles shared by the tool tests.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use slotter_google::{
    DocRequest, Document, DriveUser, GoogleApi, GoogleError, GridData, Sheet, Spreadsheet,
    ValueRange,
};

/// In-memory [`GoogleApi`] that records every write.
#[derive(Debug, Default)]
pub struct FakeGoogle {
    pub spreadsheets: HashMap<String, Spreadsheet>,
    pub documents: HashMap<String, Document>,
    pub exports: HashMap<String, String>,
    pub user: DriveUser,
    pub value_writes: Mutex<Vec<ValueRange>>,
    pub doc_requests: Mutex<Vec<DocRequest>>,
}

impl FakeGoogle {
    pub fn with_spreadsheet(id: &str, spreadsheet: Spreadsheet) -> Self {
        let mut fake = Self::default();
        fake.spreadsheets.insert(id.to_string(), spreadsheet);
        fake
    }

    pub fn written(&self) -> Vec<ValueRange> {
        self.value_writes.lock().unwrap().clone()
    }

    pub fn requests(&self) -> Vec<DocRequest> {
        self.doc_requests.lock().unwrap().clone()
    }
}

fn not_found(id: &str) -> GoogleError {
    GoogleError::Api {
        status: 404,
        body: format!("{id} not found"),
    }
}

#[async_trait]
impl GoogleApi for FakeGoogle {
    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> slotter_google::Result<Spreadsheet> {
        self.spreadsheets
            .get(spreadsheet_id)
            .cloned()
            .ok_or_else(|| not_found(spreadsheet_id))
    }

    async fn batch_update_values(
        &self,
        _spreadsheet_id: &str,
        data: &[ValueRange],
    ) -> slotter_google::Result<()> {
        self.value_writes.lock().unwrap().extend_from_slice(data);
        Ok(())
    }

    async fn get_document(&self, document_id: &str) -> slotter_google::Result<Document> {
        self.documents
            .get(document_id)
            .cloned()
            .ok_or_else(|| not_found(document_id))
    }

    async fn batch_update_document(
        &self,
        _document_id: &str,
        requests: &[DocRequest],
    ) -> slotter_google::Result<()> {
        self.doc_requests.lock().unwrap().extend_from_slice(requests);
        Ok(())
    }

    async fn export_document_text(&self, document_id: &str) -> slotter_google::Result<String> {
        self.exports
            .get(document_id)
            .cloned()
            .ok_or_else(|| not_found(document_id))
    }

    async fn about_user(&self) -> slotter_google::Result<DriveUser> {
        Ok(self.user.clone())
    }
}

/// A spreadsheet made of `(title, rows)` tabs, indexed in order.
pub fn spreadsheet(title: &str, tabs: Vec<(&str, Vec<Vec<&str>>)>) -> Spreadsheet {
    let mut spreadsheet = Spreadsheet {
        spreadsheet_id: "sheet-id".to_string(),
        ..Spreadsheet::default()
    };
    spreadsheet.properties.title = title.to_string();
    spreadsheet.sheets = tabs
        .into_iter()
        .enumerate()
        .map(|(index, (name, rows))| Sheet::new(name, index, GridData::from_rows(rows)))
        .collect();
    spreadsheet
}

/// A `Videos` tab: video number, team, value, duration, and match columns.
pub fn videos_tab() -> Vec<Vec<&'static str>> {
    vec![
        vec!["Team videos"],
        vec!["Video #", "Team", "Value", "Duration", "Match"],
        vec!["Video 007", "🇫🇷 Team France", "3", "0:45", ""],
        vec!["12", "Japan (JPN)", "1,5", "0:30", ""],
        vec!["", "Delegation of Kenya", "", "0:40", ""],
        vec!["4", "Refugee Team", "2", "0:50", ""],
    ]
}
