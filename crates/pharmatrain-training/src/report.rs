use crate::error::TrainingResult;
use crate::job::JobStatus;
use crate::orchestrator::TrainingSession;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionMetadata {
    pub timestamp: DateTime<Utc>,
    pub project_root: PathBuf,
    /// Number of jobs that completed.
    pub models_trained: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelReport {
    pub status: JobStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_seconds: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_human: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total_models: usize,
    pub completed: usize,
    pub failed: usize,
    pub pending: usize,
}

/// Final state of a training session, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    pub training_session: SessionMetadata,
    pub models: BTreeMap<String, ModelReport>,
    pub summary: ReportSummary,
}

/// Snapshot `session` as a report. Durations appear only for jobs with both timestamps.
#[must_use]
pub fn generate(session: &TrainingSession, now: DateTime<Utc>) -> TrainingReport {
    let models = session
        .jobs()
        .iter()
        .map(|job| {
            let duration = job.duration();
            let entry = ModelReport {
                status: job.status,
                start_time: job.start_time,
                end_time: job.end_time,
                error: job.error.clone(),
                duration_seconds: duration
                    .map(|d| d.num_microseconds().map_or(0.0, |us| us as f64 / 1e6)),
                duration_human: duration.map(format_duration_human),
            };
            (job.name.clone(), entry)
        })
        .collect();

    TrainingReport {
        training_session: SessionMetadata {
            timestamp: now,
            project_root: session.project_root().to_path_buf(),
            models_trained: session.completed_count(),
        },
        models,
        summary: ReportSummary {
            total_models: session.jobs().len(),
            completed: session.completed_count(),
            failed: session.failed_count(),
            pending: session.pending_count(),
        },
    }
}

#[must_use]
pub fn report_file_name(timestamp: DateTime<Utc>) -> String {
    format!("training_report_{}.json", timestamp.format("%Y%m%d_%H%M%S"))
}

/// Persist `report` under `dir`. Never overwrites: a second report within the
/// same second gets a numeric suffix.
pub fn write_report(report: &TrainingReport, dir: &Path) -> TrainingResult<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let json = serde_json::to_string_pretty(report)?;
    let base = report_file_name(report.training_session.timestamp);
    let stem = base.trim_end_matches(".json");

    let mut attempt = 0usize;
    loop {
        let path = if attempt == 0 {
            dir.join(&base)
        } else {
            dir.join(format!("{stem}_{attempt}.json"))
        };
        match std::fs::OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(mut file) => {
                file.write_all(json.as_bytes())?;
                info!(path = %path.display(), "Training report saved");
                return Ok(path);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
            Err(e) => return Err(e.into()),
        }
    }
}

/// `H:MM:SS[.ffffff]`, prefixed with `N day(s), ` when longer than a day.
#[must_use]
pub fn format_duration_human(duration: chrono::Duration) -> String {
    let total_us = duration.num_microseconds().unwrap_or(i64::MAX).max(0);
    let micros = total_us % 1_000_000;
    let total_secs = total_us / 1_000_000;
    let days = total_secs / 86_400;
    let hours = (total_secs % 86_400) / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;

    let mut out = String::new();
    if days > 0 {
        let _ = write!(out, "{days} day{}, ", if days == 1 { "" } else { "s" });
    }
    let _ = write!(out, "{hours}:{minutes:02}:{seconds:02}");
    if micros > 0 {
        let _ = write!(out, ".{micros:06}");
    }
    out
}

fn status_glyph(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Completed => "✅",
        JobStatus::Failed => "❌",
        JobStatus::Running => "🔄",
        JobStatus::Pending => "⏳",
    }
}

/// Human-readable summary, one line per job.
#[must_use]
pub fn render_summary(report: &TrainingReport) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", "=".repeat(60));
    let _ = writeln!(out, "PHARMACEUTICAL MODEL TRAINING SUMMARY");
    let _ = writeln!(out, "{}", "=".repeat(60));

    for (name, model) in &report.models {
        let _ = write!(
            out,
            "{} {}: {}",
            status_glyph(model.status),
            name.to_uppercase(),
            model.status.as_str().to_uppercase()
        );
        if let Some(start) = model.start_time {
            let _ = write!(out, " | started {}", start.format("%Y-%m-%d %H:%M:%S"));
        }
        if let Some(end) = model.end_time {
            let _ = write!(out, " | ended {}", end.format("%Y-%m-%d %H:%M:%S"));
        }
        if let Some(duration) = &model.duration_human {
            let _ = write!(out, " | duration {duration}");
        }
        if let Some(error) = &model.error {
            let _ = write!(out, " | error: {error}");
        }
        out.push('\n');
    }

    let s = &report.summary;
    let _ = writeln!(
        out,
        "Total: {} | Completed: {} | Failed: {} | Pending: {}",
        s.total_models, s.completed, s.failed, s.pending
    );
    out
}
