use crate::error::{TrainingError, TrainingResult};
use crate::runner::Outcome;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Lifecycle state of a job: `pending -> running -> {completed, failed}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One trainable model unit tracked by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub name: String,
    pub script: PathBuf,
    pub config: PathBuf,
    pub output_dir: PathBuf,
    pub status: JobStatus,
    pub start_time: Option<DateTime<Utc>>,
    pub end_time: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

impl Job {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        script: PathBuf,
        config: PathBuf,
        output_dir: PathBuf,
    ) -> Self {
        Self {
            name: name.into(),
            script,
            config,
            output_dir,
            status: JobStatus::Pending,
            start_time: None,
            end_time: None,
            error: None,
        }
    }

    pub fn mark_running(&mut self, now: DateTime<Utc>) -> TrainingResult<()> {
        self.transition(JobStatus::Running)?;
        self.start_time = Some(now);
        Ok(())
    }

    /// Record the runner's outcome. Only valid while the job is running.
    pub fn finish(&mut self, outcome: &Outcome, now: DateTime<Utc>) -> TrainingResult<()> {
        match outcome {
            Outcome::Success => self.transition(JobStatus::Completed)?,
            Outcome::Failed(detail) => {
                self.transition(JobStatus::Failed)?;
                self.error = Some(detail.to_string());
            }
        }
        self.end_time = Some(now);
        Ok(())
    }

    /// Wall-clock duration, only when both ends were recorded.
    #[must_use]
    pub fn duration(&self) -> Option<chrono::Duration> {
        match (self.start_time, self.end_time) {
            (Some(start), Some(end)) => Some(end - start),
            _ => None,
        }
    }

    fn transition(&mut self, to: JobStatus) -> TrainingResult<()> {
        let allowed = matches!(
            (self.status, to),
            (JobStatus::Pending, JobStatus::Running)
                | (JobStatus::Running, JobStatus::Completed | JobStatus::Failed)
        );
        if !allowed {
            return Err(TrainingError::InvalidTransition {
                job: self.name.clone(),
                from: self.status.to_string(),
                to: to.to_string(),
            });
        }
        self.status = to;
        Ok(())
    }
}
