//! Training command implementation.

use crate::config::Settings;
use anyhow::{Context, Result};
use chrono::Utc;
use colored::Colorize;
use pharmatrain_training::{
    JobRegistry, JobRunner, Orchestrator, ProgressSink, ProjectLayout, RunSummary,
    StdoutProgressSink, TrainingError, TracingProgressSink, render_summary, report, write_report,
};
use serde_json::json;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::warn;

#[derive(Debug, Default)]
pub struct TrainOptions {
    pub models: Vec<String>,
    pub timeout_secs: Option<u64>,
    pub json: bool,
}

/// Run the requested jobs and write the report. Returns whether every job completed.
pub async fn execute(settings: &Settings, options: TrainOptions) -> Result<bool> {
    let layout = ProjectLayout::new(settings.project_root()?);
    let registry = JobRegistry::builtin(settings.interpreter());

    let requested = if !options.models.is_empty() {
        options.models
    } else {
        settings.models.clone().unwrap_or_else(|| registry.names())
    };
    let timeout = options.timeout_secs.map(Duration::from_secs).or_else(|| settings.job_timeout());

    let runner = JobRunner::new().with_timeout(timeout);
    let mut orchestrator = Orchestrator::new(layout.clone(), registry, runner);

    if !options.json {
        println!();
        println!("{}", "Pharmaceutical Model Training".bold().cyan());
        println!("  {} {}", "Project:".dimmed(), layout.root().display());
        println!("  {} {}", "Models:".dimmed(), requested.join(", "));
        println!();
    }

    match orchestrator.check_prerequisites(&requested) {
        Ok(prereqs) => {
            for warning in &prereqs.warnings {
                eprintln!("  {} {}", "!".yellow(), warning);
            }
        }
        Err(TrainingError::Prerequisite(errors)) => {
            for error in &errors {
                eprintln!("  {} {}", "✗".red(), error);
            }
            anyhow::bail!("Prerequisites check failed, no job was started");
        }
        Err(e) => return Err(e).context("Failed to check prerequisites"),
    }

    let cancel = CancellationToken::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, stopping the running job");
                cancel.cancel();
            }
        })
    };

    let sink: Box<dyn ProgressSink> =
        if options.json { Box::new(TracingProgressSink) } else { Box::new(StdoutProgressSink) };
    let summary = orchestrator.run(Some(&requested), sink.as_ref(), &cancel).await;
    interrupt.abort();
    let success = summary.success();

    let report = report::generate(orchestrator.session(), Utc::now());
    let report_path = write_report(&report, &layout.training_dir())
        .context("Failed to write training report")?;

    if options.json {
        let out = json!({
            "report_path": report_path,
            "completed": summary.completed,
            "failed": summary.failed,
            "skipped": summary.skipped,
            "report": report,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        println!();
        print!("{}", render_summary(&report));
        println!();
        print_outcome(&summary);
        println!("  {} {}", "Report:".dimmed(), report_path.display());
        println!();
    }

    Ok(success)
}

fn print_outcome(summary: &RunSummary) {
    if !summary.completed.is_empty() {
        println!("  {} {}", "Completed:".green().bold(), summary.completed.join(", "));
    }
    if !summary.failed.is_empty() {
        println!("  {} {}", "Failed:".red().bold(), summary.failed.join(", "));
    }
    if !summary.skipped.is_empty() {
        println!("  {} {}", "Not started:".yellow().bold(), summary.skipped.join(", "));
    }
    if summary.success() {
        println!("  {}", "All models trained successfully".green());
    }
}
