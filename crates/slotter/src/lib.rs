//! `slotter` - FIRST Global team video slotter
//!
//! This library provides the tools that prepare the run-of-show (ROS)
//! spreadsheet for the broadcast: match numbering, placeholder codes, team
//! video assignment, and host script generation for the script Google Doc.

#![warn(missing_docs)]
#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

pub mod cli;
pub mod config;
pub mod country;
pub mod credentials;
pub mod error;
pub mod logging;
pub mod match_numbers;
pub mod placeholders;
pub mod report;
pub mod ros_document;
pub mod schedule;
pub mod script;
pub mod sheet;
pub mod text;
pub mod videos;

#[cfg(test)]
mod testing;

pub use config::Config;
pub use error::{Error, Result};
pub use logging::init_logging;
