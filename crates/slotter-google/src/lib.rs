//! `slotter-google` - Google Sheets, Docs, and Drive access for the slotter
//!
//! This crate holds the wire models for the three REST APIs the slotter uses,
//! the installed-app OAuth flow with its token store, and an authenticated
//! client behind the [`GoogleApi`] trait.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod client;
pub mod docs;
pub mod error;
pub mod oauth;
pub mod sheets;

pub use client::{DriveUser, GoogleApi, GoogleClient};
pub use docs::{DocRequest, Document};
pub use error::{GoogleError, Result};
pub use oauth::{AuthorizedUser, ClientSecrets, InstalledAppFlow, TokenStore, REQUIRED_SCOPES};
pub use sheets::{CellData, GridData, Sheet, Spreadsheet, ValueRange};
