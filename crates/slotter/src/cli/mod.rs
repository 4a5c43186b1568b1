//! Command-line interface for the slotter.
//!
//! This module provides the CLI structure for the `fgslot` binary.

mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use commands::{
    ConfigCommand, CredentialsCommand, FillScriptCommand, RosDocumentCommand, ScheduleArgs,
    ScheduleCommand, TeamVideosCommand, ToolsCommand,
};

use crate::logging::Verbosity;

/// fgslot - FIRST Global team video slotter
///
/// Prepares the run-of-show spreadsheet for the broadcast: numbers the
/// ranking matches, codes the team video placeholders, assigns team
/// videos, and writes host scripts into the script Google Doc.
#[derive(Debug, Parser)]
#[command(name = "fgslot")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to custom configuration file
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Print the changes without writing to Google
    #[arg(long, global = true)]
    pub dry_run: bool,

    /// The command to execute
    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Assign team videos and generate scripts
    #[command(subcommand)]
    TeamVideos(TeamVideosCommand),

    /// Credentials, ROS link, and ROS preparation tools
    #[command(subcommand)]
    Tools(ToolsCommand),

    /// Import a match schedule and summarize it
    Schedule(ScheduleCommand),

    /// View or validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
}

impl Cli {
    /// Get the verbosity level based on flags.
    #[must_use]
    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("fgslot").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_name() {
        let cli = Cli::command();
        assert_eq!(cli.get_name(), "fgslot");
    }

    #[test]
    fn test_cli_verify() {
        // Verify the CLI structure is valid
        Cli::command().debug_assert();
    }

    #[test]
    fn test_command_order() {
        let cli = Cli::command();
        let top: Vec<&str> = cli
            .get_subcommands()
            .map(clap::Command::get_name)
            .filter(|name| *name != "help")
            .collect();
        assert_eq!(top, ["team-videos", "tools", "schedule", "config"]);

        let tools: Vec<&str> = cli
            .find_subcommand("tools")
            .unwrap()
            .get_subcommands()
            .map(clap::Command::get_name)
            .filter(|name| *name != "help")
            .collect();
        assert_eq!(
            tools,
            ["credentials", "ros-document", "placeholders", "match-numbers"]
        );
    }

    #[test]
    fn test_verbosity_from_flags() {
        assert_eq!(parse(&["config", "path"]).verbosity(), Verbosity::Normal);
        assert_eq!(parse(&["-v", "config", "path"]).verbosity(), Verbosity::Verbose);
        assert_eq!(parse(&["-vv", "config", "path"]).verbosity(), Verbosity::Trace);
        assert_eq!(parse(&["-q", "-v", "config", "path"]).verbosity(), Verbosity::Quiet);
    }

    #[test]
    fn test_parse_optimize() {
        let cli = parse(&["team-videos", "optimize", "--schedule", "matches.json", "--field", "2"]);
        let Command::TeamVideos(TeamVideosCommand::Optimize(args)) = cli.command else {
            panic!("expected team-videos optimize");
        };
        assert_eq!(args.schedule, Some(PathBuf::from("matches.json")));
        assert_eq!(args.field, Some(2));
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_parse_fill_script() {
        let cli = parse(&[
            "team-videos",
            "fill-script",
            "--doc",
            "https://docs.google.com/document/d/doc1/edit",
            "--sheet",
            "Day 1",
            "--block",
            "3",
            "--dry-run",
        ]);
        let Command::TeamVideos(TeamVideosCommand::FillScript(fill)) = cli.command else {
            panic!("expected team-videos fill-script");
        };
        assert_eq!(fill.sheet, "Day 1");
        assert_eq!(fill.block, 3);
        assert!(cli.dry_run);
    }

    #[test]
    fn test_fill_script_requires_block() {
        let result = Cli::try_parse_from([
            "fgslot",
            "team-videos",
            "fill-script",
            "--doc",
            "d",
            "--sheet",
            "Day 1",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_parse_blocks_without_sheet() {
        let cli = parse(&["team-videos", "blocks", "--doc", "d"]);
        assert!(matches!(
            cli.command,
            Command::TeamVideos(TeamVideosCommand::Blocks { sheet: None, .. })
        ));
    }

    #[test]
    fn test_parse_tools() {
        assert!(matches!(
            parse(&["tools", "placeholders"]).command,
            Command::Tools(ToolsCommand::Placeholders)
        ));
        assert!(matches!(
            parse(&["tools", "credentials", "status"]).command,
            Command::Tools(ToolsCommand::Credentials(CredentialsCommand::Status))
        ));
        assert!(matches!(
            parse(&["tools", "ros-document", "show"]).command,
            Command::Tools(ToolsCommand::RosDocument(RosDocumentCommand::Show))
        ));
    }

    #[test]
    fn test_parse_schedule() {
        let cli = parse(&["schedule", "matches.json", "--json"]);
        let Command::Schedule(schedule) = cli.command else {
            panic!("expected schedule");
        };
        assert_eq!(schedule.file, Some(PathBuf::from("matches.json")));
        assert!(schedule.json);
        assert!(schedule.field.is_none());
    }

    #[test]
    fn test_parse_with_config() {
        let cli = parse(&["-c", "/custom/config.toml", "config", "show"]);
        assert_eq!(cli.config, Some(PathBuf::from("/custom/config.toml")));
        assert!(matches!(
            cli.command,
            Command::Config(ConfigCommand::Show { json: false })
        ));
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = parse(&["tools", "placeholders", "--dry-run", "-q"]);
        assert!(cli.dry_run);
        assert!(cli.quiet);
    }
}
