//! Pharmatrain CLI - Command-line interface for pharmaceutical model training
//!
//! This CLI provides a `pharmatrain` command that runs the training jobs in
//! sequence, reports their outcome, and prepares the image corpus they read.

mod commands;
mod config;

use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

use commands::dataset::DatasetCommand;
use commands::train::TrainOptions;
use config::Settings;

/// Pharmatrain - Pharmaceutical image model training orchestrator
#[derive(Parser, Debug)]
#[command(
    name = "pharmatrain",
    author,
    version,
    about = "Pharmatrain - train pharmaceutical image models",
    long_about = "Runs the drug classifier, authenticity verifier and pill detector training \
                  jobs one at a time,\nrecords their outcome in a timestamped report, and \
                  prepares the labeled image corpus."
)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    log_level: Option<String>,

    /// Project root (overrides project_root from pharmatrain.toml)
    #[arg(short = 'p', long, global = true)]
    project_root: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Train models
    ///
    /// Checks prerequisites, runs each requested job to completion, writes a
    /// training report and prints a summary. Exits non-zero if any job failed.
    Train {
        /// Jobs to run, in order (defaults to every known job)
        #[arg(long, num_args = 1..)]
        models: Vec<String>,

        /// Kill a job that runs longer than this many seconds
        #[arg(long)]
        timeout_secs: Option<u64>,

        /// Print the report as JSON instead of the summary
        #[arg(long)]
        json: bool,
    },

    /// List the known training jobs
    Jobs {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Validate, split and pair the image corpus
    #[command(subcommand)]
    Dataset(DatasetCommand),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut settings = match Settings::discover_and_load() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red().bold(), e);
            std::process::exit(1);
        }
    };
    if args.project_root.is_some() {
        settings.project_root = args.project_root;
    }

    // Initialize tracing
    let level_name = args.log_level.as_deref().or(settings.log_level.as_deref());
    let level = match level_name.unwrap_or("info") {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .without_time()
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match args.command {
        Command::Train { models, timeout_secs, json } => {
            let options = TrainOptions { models, timeout_secs, json };
            let success = commands::train::execute(&settings, options).await?;
            if !success {
                std::process::exit(1);
            }
        }
        Command::Jobs { json } => commands::jobs::execute(&settings, json)?,
        Command::Dataset(command) => commands::dataset::execute(&settings, command)?,
    }

    Ok(())
}
