//! `fgslot` - CLI for the FIRST Global team video slotter
//!
//! This binary drives the ROS spreadsheet and script document tools from the
//! command line.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::path::PathBuf;

use clap::Parser;
use tracing::info;

use slotter::cli::{
    Cli, Command, ConfigCommand, CredentialsCommand, FillScriptCommand, RosDocumentCommand,
    ScheduleArgs, ScheduleCommand, TeamVideosCommand, ToolsCommand,
};
use slotter::credentials::CredentialManager;
use slotter::ros_document::RosDocument;
use slotter::schedule::{validate_field, Schedule};
use slotter::script::{self, FillRequest};
use slotter::{init_logging, match_numbers, placeholders, videos, Config, Error};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() -> CliResult {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Validation reports a broken file instead of failing to load it
    if let Command::Config(ConfigCommand::Validate { file }) = &cli.command {
        handle_validate(file.clone().or_else(|| cli.config.clone()));
        return Ok(());
    }

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;
    let dry_run = cli.dry_run;
    if dry_run {
        info!("Dry run: nothing will be written to Google.");
    }

    // Execute the command
    let result = match cli.command {
        Command::TeamVideos(cmd) => handle_team_videos(&config, cmd, dry_run).await,
        Command::Tools(cmd) => handle_tools(&config, cmd, dry_run).await,
        Command::Schedule(cmd) => handle_schedule(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    };

    if let Err(err) = &result {
        if let Some(hint) = err.downcast_ref::<Error>().and_then(Error::hint) {
            eprintln!("{hint}");
        }
    }
    result
}

fn ros_document(config: &Config) -> RosDocument {
    RosDocument::new(config.ros_url_store_path(), config.ros.document_url.clone())
}

/// The saved ROS spreadsheet ID, or an error telling the operator to save one.
fn ros_spreadsheet_id(config: &Config, action: &str) -> Result<String, Error> {
    let ros = ros_document(config);
    let (_, spreadsheet_id) = ros.require(action)?;
    info!("Using ROS document: {}", ros.display_name());
    Ok(spreadsheet_id)
}

async fn google_client(config: &Config) -> Result<slotter_google::GoogleClient, Error> {
    CredentialManager::from_config(config)?.client().await
}

/// The schedule named on the command line, else the configured one.
fn load_schedule(config: &Config, path: Option<PathBuf>) -> Result<Option<Schedule>, Error> {
    path.or_else(|| config.schedule.path.clone())
        .map(|path| -> Result<Schedule, Error> {
            let schedule = Schedule::load(&path)?;
            info!(path = %path.display(), "Loaded match schedule");
            Ok(schedule)
        })
        .transpose()
}

fn field(config: &Config, args: &ScheduleArgs) -> Result<u8, Error> {
    validate_field(args.field.unwrap_or(config.schedule.field))
}

fn print_outcome(title: &str, render: &str, status: &str, dry_run: bool) {
    println!("Spreadsheet: {title}");
    println!("{render}");
    println!();
    if dry_run {
        println!("Dry run: no changes were written. {status}");
    } else {
        println!("{status}");
    }
}

fn join_blocks(blocks: &[u32]) -> String {
    blocks
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

async fn handle_team_videos(config: &Config, cmd: TeamVideosCommand, dry_run: bool) -> CliResult {
    match cmd {
        TeamVideosCommand::Optimize(args) => {
            let field = field(config, &args)?;
            let schedule = load_schedule(config, args.schedule)?;
            let matches = videos::schedule_matches(schedule.as_ref(), field)?;
            let spreadsheet_id = ros_spreadsheet_id(config, "optimizing team videos")?;
            let client = google_client(config).await?;

            let result = videos::run(&client, &spreadsheet_id, &matches, dry_run).await?;
            print_outcome(&result.title, &result.render(), &result.status(), dry_run);
        }
        TeamVideosCommand::Blocks { doc, sheet } => {
            let client = google_client(config).await?;
            let document = script::document_blocks(&client, &doc).await?;
            println!("Document: {}", document.status());
            if !document.blocks.is_empty() {
                println!("  Blocks: {}", join_blocks(&document.blocks));
            }

            let spreadsheet_id = ros_spreadsheet_id(config, "loading ROS blocks")?;
            let sheets =
                script::spreadsheet_blocks(&client, &spreadsheet_id, sheet.as_deref()).await?;
            for sheet in sheets {
                println!("{}", sheet.status());
                if !sheet.blocks.is_empty() {
                    println!("  Blocks: {}", join_blocks(&sheet.blocks));
                }
            }
        }
        TeamVideosCommand::FillScript(fill) => handle_fill_script(config, &fill, dry_run).await?,
    }
    Ok(())
}

async fn handle_fill_script(config: &Config, fill: &FillScriptCommand, dry_run: bool) -> CliResult {
    let spreadsheet_id = ros_spreadsheet_id(config, "generating scripts")?;
    let client = google_client(config).await?;

    let generated = script::generate(
        &client,
        FillRequest {
            document_url: &fill.doc,
            spreadsheet_id: &spreadsheet_id,
            sheet_title: &fill.sheet,
            block: fill.block,
        },
    )
    .await?;

    println!("{}", generated.render());
    if !generated.diagnostics.is_empty() {
        println!();
        println!("Notes:");
        for diagnostic in &generated.diagnostics {
            println!("  - {diagnostic}");
        }
    }
    println!();
    println!("{}", generated.insert(&client, dry_run).await?);
    Ok(())
}

async fn handle_tools(config: &Config, cmd: ToolsCommand, dry_run: bool) -> CliResult {
    match cmd {
        ToolsCommand::Credentials(cmd) => {
            let manager = CredentialManager::from_config(config)?;
            match cmd {
                CredentialsCommand::Authorize { client_secrets } => {
                    println!("{}", manager.authorize(client_secrets.as_deref()).await?);
                }
                CredentialsCommand::Status => {
                    for line in manager.status(None).await {
                        println!("{line}");
                    }
                }
            }
        }
        ToolsCommand::RosDocument(cmd) => {
            let mut ros = ros_document(config);
            if let RosDocumentCommand::Set { url } = &cmd {
                let spreadsheet_id = ros.save(url)?;
                println!("Saved ROS document URL (spreadsheet {spreadsheet_id}).");
            }
            // The title is a nicety; without credentials the link's name is shown.
            if ros.load_saved().is_some() {
                if let Ok(client) = google_client(config).await {
                    ros.resolve_title(&client).await;
                }
            }
            println!("ROS document: {}", ros.display_name());
            if let Some(url) = ros.load_saved() {
                println!("Link: {url}");
            }
            println!("Saved at: {}", ros.store_path().display());
        }
        ToolsCommand::Placeholders => {
            let spreadsheet_id = ros_spreadsheet_id(config, "generating placeholders")?;
            let client = google_client(config).await?;
            let (title, plan) = placeholders::run(
                &client,
                &spreadsheet_id,
                &config.placeholders.skip_sheet_marker,
                dry_run,
            )
            .await?;
            print_outcome(&title, &plan.render(), &plan.status(), dry_run);
        }
        ToolsCommand::MatchNumbers { schedule, renumber } => {
            let field = field(config, &schedule)?;
            let loaded = load_schedule(config, schedule.schedule)?;
            let by_date = match_numbers::schedule_for_field(loaded.as_ref(), field)?;
            let spreadsheet_id = ros_spreadsheet_id(config, "generating match numbers")?;
            let client = google_client(config).await?;

            let result =
                match_numbers::run(&client, &spreadsheet_id, &by_date, renumber, dry_run).await?;
            print_outcome(&result.title, &result.render(), &result.status(), dry_run);
        }
    }
    Ok(())
}

fn handle_schedule(config: &Config, cmd: &ScheduleCommand) -> CliResult {
    let field = validate_field(cmd.field.unwrap_or(config.schedule.field))?;
    let schedule = load_schedule(config, cmd.file.clone())?
        .ok_or_else(|| Error::schedule("Choose a match schedule JSON file to import."))?;

    if cmd.json {
        let matches = schedule.matches_for_field(field);
        println!("{}", serde_json::to_string_pretty(&matches)?);
    } else {
        for line in schedule.summary(field) {
            println!("{line}");
        }
    }
    Ok(())
}

fn display_path(path: Option<&PathBuf>) -> String {
    path.map_or_else(|| "(not set)".to_string(), |path| path.display().to_string())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> CliResult {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Google]");
                println!(
                    "  Client secrets:     {}",
                    display_path(config.google.client_secrets_path.as_ref())
                );
                println!("  Token path:         {}", config.token_path().display());
                println!("  Open browser:       {}", config.google.open_browser);
                println!("  HTTP timeout (s):   {}", config.google.http_timeout_secs);
                println!();
                println!("[ROS]");
                println!(
                    "  Document URL:       {}",
                    config.ros.document_url.as_deref().unwrap_or("(saved link)")
                );
                println!("  Saved link path:    {}", config.ros_url_store_path().display());
                println!();
                println!("[Schedule]");
                println!(
                    "  Path:               {}",
                    display_path(config.schedule.path.as_ref())
                );
                println!("  Field:              {}", config.schedule.field);
                println!();
                println!("[Placeholders]");
                println!(
                    "  Skip sheet marker:  {}",
                    config.placeholders.skip_sheet_marker
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Validate { file } => handle_validate(file),
    }
    Ok(())
}

fn handle_validate(file: Option<PathBuf>) {
    let path = file.unwrap_or_else(Config::default_config_path);
    println!("Validating configuration: {}", path.display());
    match Config::check_file(&path) {
        Ok(_) => println!("Configuration is valid."),
        Err(e) => println!("Configuration error: {e}"),
    }
}
