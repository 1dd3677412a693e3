//! kindred CLI: behavioral matchmaking engine.
//!
//! Reads one match request (JSON) per invocation, writes the JSON result to
//! stdout and diagnostics to stderr. Malformed or empty input follows the
//! empty-result contract instead of failing.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use kindred::model::{GroupMatchRequest, UserRecord};
use kindred::pipeline::{MatchPipeline, PipelineConfig};
use kindred::tables::MatchTables;

#[derive(Parser)]
#[command(name = "kindred", version, about = "Behavioral matchmaking engine")]
struct Cli {
    /// Data directory for the persistent history store. History stays in
    /// memory for this invocation when omitted.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// External category-table TOML replacing the bundled default.
    #[arg(long, global = true)]
    tables: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Match every user against every other user.
    Users {
        /// JSON file with the user list. Reads stdin when omitted.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Match every user against every group.
    Groups {
        /// JSON file with `{users, groups}`. Reads stdin when omitted.
        #[arg(long)]
        file: Option<PathBuf>,
    },

    /// Dump the persisted historical-time table.
    History,

    /// Show the active category tables.
    Tables,
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let tables = match &cli.tables {
        Some(path) => MatchTables::from_path(path).into_diagnostic()?,
        None => MatchTables::bundled().into_diagnostic()?,
    };
    let mut config = PipelineConfig::new(tables);
    config.data_dir = cli.data_dir.clone();

    match cli.command {
        Commands::Users { file } => {
            let pipeline = MatchPipeline::new(config).into_diagnostic()?;
            let input = read_input(file.as_deref())?;
            // Unparseable input follows the same contract as an empty batch.
            let users: Vec<UserRecord> = match serde_json::from_str(&input) {
                Ok(users) => users,
                Err(e) => {
                    tracing::warn!("request did not parse: {e}");
                    Vec::new()
                }
            };
            match pipeline.match_users(&users).into_diagnostic()? {
                Some(report) => print_json(&report)?,
                None => print_json(&serde_json::json!({"best_to_worst": {}}))?,
            }
        }
        Commands::Groups { file } => {
            let pipeline = MatchPipeline::new(config).into_diagnostic()?;
            let input = read_input(file.as_deref())?;
            let request: GroupMatchRequest = match serde_json::from_str(&input) {
                Ok(request) => request,
                Err(e) => {
                    tracing::warn!("request did not parse: {e}");
                    GroupMatchRequest {
                        users: Vec::new(),
                        groups: Vec::new(),
                    }
                }
            };
            match pipeline
                .match_groups(&request.users, &request.groups)
                .into_diagnostic()?
            {
                Some(report) => print_json(&report)?,
                None => print_json(&serde_json::json!({"best_to_worst_groups": {}}))?,
            }
        }
        Commands::History => {
            let pipeline = MatchPipeline::new(config).into_diagnostic()?;
            let history = pipeline.history().into_diagnostic()?;
            let sorted: BTreeMap<String, f64> = history
                .iter()
                .map(|(key, minutes)| (key.to_string(), *minutes))
                .collect();
            print_json(&sorted)?;
        }
        Commands::Tables => {
            for category in config.tables.categories() {
                println!(
                    "{:<12} buckets {:?}  keywords: {}",
                    category.name,
                    category.expected_minutes,
                    category.keywords.join(", ")
                );
            }
        }
    }

    Ok(())
}

fn read_input(file: Option<&std::path::Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path).into_diagnostic(),
        None => {
            let mut buffer = String::new();
            std::io::stdin()
                .read_to_string(&mut buffer)
                .into_diagnostic()?;
            Ok(buffer)
        }
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string(value).into_diagnostic()?);
    Ok(())
}
