//! `pharmatrain dataset` - corpus validation, splitting and pair sampling.

use crate::config::Settings;
use anyhow::{Context, Result};
use chrono::Utc;
use clap::Subcommand;
use colored::Colorize;
use pharmatrain_training::dataset::validate::{
    dataset_report, write_dataset_report, write_validation_report,
};
use pharmatrain_training::{
    ImageClass, JobConfig, JobKind, JobRegistry, ProjectLayout, SplitRatios, ValidationReport,
    load_image_pools, sample_pairs, split_dataset, validate_dataset, write_pairs_jsonl,
};
use serde_json::json;
use std::path::PathBuf;

#[derive(Subcommand, Debug)]
pub enum DatasetCommand {
    /// Count images per class and category and flag problems
    Validate {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Copy the corpus into train/val/test splits, per category
    Split {
        #[arg(long, default_value_t = 0.7)]
        train: f64,

        #[arg(long, default_value_t = 0.2)]
        val: f64,

        #[arg(long, default_value_t = 0.1)]
        test: f64,
    },

    /// Write a dataset report with recommendations
    Report,

    /// Sample labeled comparison pairs for the authenticity verifier
    Pairs {
        /// Pairs to request (defaults to num_pairs from the authenticity config)
        #[arg(long)]
        num_pairs: Option<usize>,

        /// Output file (defaults to data/processed/pairs.jsonl)
        #[arg(long)]
        output: Option<PathBuf>,
    },
}

pub fn execute(settings: &Settings, command: DatasetCommand) -> Result<()> {
    let layout = ProjectLayout::new(settings.project_root()?);
    match command {
        DatasetCommand::Validate { json } => validate(&layout, json),
        DatasetCommand::Split { train, val, test } => split(&layout, train, val, test),
        DatasetCommand::Report => report(&layout),
        DatasetCommand::Pairs { num_pairs, output } => pairs(&layout, settings, num_pairs, output),
    }
}

fn validate(layout: &ProjectLayout, json_output: bool) -> Result<()> {
    let report = validate_dataset(layout).context("Failed to scan image corpus")?;
    write_validation_report(&report, &layout.validation_report_path())
        .context("Failed to write validation report")?;

    if json_output {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    println!("{}", "Dataset Validation".bold().cyan());
    print_counts(&report);
    if report.issues.is_empty() {
        println!("  {}", "No issues found".green());
    } else {
        println!();
        println!("  {}", format!("Issues ({})", report.issues.len()).yellow().bold());
        for issue in &report.issues {
            println!("    {} {}", "!".yellow(), issue);
        }
    }
    println!();
    Ok(())
}

fn print_counts(report: &ValidationReport) {
    for class in ImageClass::ALL {
        let stats = report.class(class);
        println!();
        println!("  {} {}", format!("{class}:").bold(), stats.total);
        for (category, count) in &stats.categories {
            println!("    {:<28} {}", category, count);
        }
    }
    println!();
    println!("  {} {}", "Total images:".bold(), report.total_images);
}

fn split(layout: &ProjectLayout, train: f64, val: f64, test: f64) -> Result<()> {
    let ratios = SplitRatios::new(train, val, test)?;
    let summary = split_dataset(layout, &ratios).context("Failed to split dataset")?;

    println!();
    println!("{}", "Dataset Split".bold().cyan());
    println!("{:<8} {:>10} {:>12}", "Split", "Authentic", "Counterfeit");
    println!("{}", "─".repeat(32));
    for (split, counts) in &summary.splits {
        let authentic = counts.get(&ImageClass::Authentic).copied().unwrap_or_default();
        let counterfeit = counts.get(&ImageClass::Counterfeit).copied().unwrap_or_default();
        println!("{:<8} {:>10} {:>12}", split.as_str(), authentic, counterfeit);
    }
    println!();
    println!("  {} {}", "Summary:".dimmed(), layout.split_summary_path().display());
    println!();
    Ok(())
}

fn report(layout: &ProjectLayout) -> Result<()> {
    let report = dataset_report(layout, Utc::now()).context("Failed to scan image corpus")?;
    let path = write_dataset_report(&report, layout).context("Failed to write dataset report")?;

    println!();
    println!("{}", "Dataset Report".bold().cyan());
    print_counts(&report.structure_validation);
    if !report.recommendations.is_empty() {
        println!();
        println!("  {}", "Recommendations".bold());
        for recommendation in &report.recommendations {
            println!("    - {recommendation}");
        }
    }
    println!();
    println!("  {} {}", "Report:".dimmed(), path.display());
    println!();
    Ok(())
}

/// `num_pairs` from the authenticity config, or its stock value when the file is absent.
fn configured_num_pairs(layout: &ProjectLayout, settings: &Settings) -> Result<usize> {
    let registry = JobRegistry::builtin(settings.interpreter());
    let path = registry
        .find_kind(JobKind::AuthenticityVerifier)
        .map(|def| layout.configs_dir().join(&def.config))
        .filter(|path| path.is_file());

    let config = match path {
        Some(path) => JobConfig::load(JobKind::AuthenticityVerifier, &path)?,
        None => JobConfig::default_for(JobKind::AuthenticityVerifier),
    };
    match config {
        JobConfig::AuthenticityVerifier(c) => Ok(c.num_pairs),
        other => anyhow::bail!("unexpected config kind: {}", other.kind().as_str()),
    }
}

fn pairs(
    layout: &ProjectLayout,
    settings: &Settings,
    num_pairs: Option<usize>,
    output: Option<PathBuf>,
) -> Result<()> {
    let num_pairs = match num_pairs {
        Some(n) => n,
        None => configured_num_pairs(layout, settings)?,
    };
    let (authentic, counterfeit) = load_image_pools(layout).context("Failed to load image pools")?;
    let pairs = sample_pairs(&authentic, &counterfeit, num_pairs, &mut rand::thread_rng());

    let output = output.unwrap_or_else(|| layout.default_pairs_path());
    write_pairs_jsonl(&output, &pairs).context("Failed to write pairs")?;

    let positives = pairs.iter().filter(|p| p.label == 1).count();
    println!(
        "{}",
        serde_json::to_string_pretty(&json!({
            "requested": num_pairs,
            "generated": pairs.len(),
            "positive": positives,
            "negative": pairs.len() - positives,
            "authentic_pool": authentic.len(),
            "counterfeit_pool": counterfeit.len(),
            "output": output,
        }))?
    );
    Ok(())
}
