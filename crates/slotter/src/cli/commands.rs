//! CLI command definitions.
//!
//! This module defines the structure of all CLI subcommands.

use std::path::PathBuf;

use clap::{Args, Subcommand};

/// Team video commands.
#[derive(Debug, Subcommand)]
pub enum TeamVideosCommand {
    /// Fill TEAM VIDEO PLACEHOLDER rows with team videos
    Optimize(ScheduleArgs),

    /// List the script blocks found in a Google Doc and the ROS tabs
    Blocks {
        /// Google Docs link of the script document
        #[arg(short, long, value_name = "URL")]
        doc: String,

        /// Only scan this ROS tab
        #[arg(short, long, value_name = "TITLE")]
        sheet: Option<String>,
    },

    /// Generate a block's script from the ROS and insert it into the Doc
    FillScript(FillScriptCommand),
}

/// Fill Script arguments.
#[derive(Debug, Args)]
pub struct FillScriptCommand {
    /// Google Docs link of the script document
    #[arg(short, long, value_name = "URL")]
    pub doc: String,

    /// ROS tab holding the block
    #[arg(short, long, value_name = "TITLE")]
    pub sheet: String,

    /// Block number, as written in the `[Block N start]` markers
    #[arg(short, long, value_name = "N")]
    pub block: u32,
}

/// Schedule source shared by the tools that read matches.
#[derive(Debug, Args)]
pub struct ScheduleArgs {
    /// Match schedule JSON (defaults to `schedule.path` in the config)
    #[arg(short, long, value_name = "FILE")]
    pub schedule: Option<PathBuf>,

    /// Competition field, 1 to 5 (defaults to `schedule.field`)
    #[arg(short, long, value_name = "N")]
    pub field: Option<u8>,
}

/// Setup and ROS preparation tools.
#[derive(Debug, Subcommand)]
pub enum ToolsCommand {
    /// Manage the Google Drive credentials
    #[command(subcommand)]
    Credentials(CredentialsCommand),

    /// Manage the saved ROS spreadsheet link
    #[command(subcommand)]
    RosDocument(RosDocumentCommand),

    /// Give each TEAM VIDEO PLACEHOLDER a unique code
    Placeholders,

    /// Write schedule match numbers into the RANKING MATCH rows
    MatchNumbers {
        /// Schedule source
        #[command(flatten)]
        schedule: ScheduleArgs,

        /// Replace existing match numbers instead of only filling blanks
        #[arg(short, long)]
        renumber: bool,
    },
}

/// Credential commands.
#[derive(Debug, Subcommand)]
pub enum CredentialsCommand {
    /// Run the Google consent flow and save the token
    Authorize {
        /// OAuth client `credentials.json` (defaults to the configured one)
        #[arg(long, value_name = "FILE")]
        client_secrets: Option<PathBuf>,
    },

    /// Show the saved token and signed-in user
    Status,
}

/// ROS document commands.
#[derive(Debug, Subcommand)]
pub enum RosDocumentCommand {
    /// Save the ROS spreadsheet link
    Set {
        /// Google Sheets link
        url: String,
    },

    /// Show the ROS spreadsheet in use
    Show,
}

/// Schedule import arguments.
#[derive(Debug, Args)]
pub struct ScheduleCommand {
    /// Match schedule JSON (defaults to `schedule.path` in the config)
    pub file: Option<PathBuf>,

    /// Competition field, 1 to 5 (defaults to `schedule.field`)
    #[arg(short, long, value_name = "N")]
    pub field: Option<u8>,

    /// Output the field's matches as JSON
    #[arg(short, long)]
    pub json: bool,
}

/// Configuration commands.
#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Show current configuration
    Show {
        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Show the configuration file path
    Path,

    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        file: Option<PathBuf>,
    },
}
