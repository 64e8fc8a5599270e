use crate::error::{TrainingError, TrainingResult};
use crate::job::{Job, JobStatus};
use crate::layout::ProjectLayout;
use crate::prereq::{self, PrerequisiteReport, Prerequisites};
use crate::progress::ProgressSink;
use crate::registry::JobRegistry;
use crate::runner::{JobExecutor, Outcome};
use chrono::Utc;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

/// The orchestrator's working set: every known job and its lifecycle state.
#[derive(Debug, Clone)]
pub struct TrainingSession {
    project_root: PathBuf,
    jobs: Vec<Job>,
}

impl TrainingSession {
    #[must_use]
    pub fn new(project_root: PathBuf, jobs: Vec<Job>) -> Self {
        Self { project_root, jobs }
    }

    #[must_use]
    pub fn project_root(&self) -> &Path {
        &self.project_root
    }

    /// Jobs in canonical order.
    #[must_use]
    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    #[must_use]
    pub fn job(&self, name: &str) -> Option<&Job> {
        self.jobs.iter().find(|j| j.name == name)
    }

    fn job_mut(&mut self, name: &str) -> Option<&mut Job> {
        self.jobs.iter_mut().find(|j| j.name == name)
    }

    #[must_use]
    pub fn count(&self, status: JobStatus) -> usize {
        self.jobs.iter().filter(|j| j.status == status).count()
    }

    #[must_use]
    pub fn completed_count(&self) -> usize {
        self.count(JobStatus::Completed)
    }

    #[must_use]
    pub fn failed_count(&self) -> usize {
        self.count(JobStatus::Failed)
    }

    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.count(JobStatus::Pending)
    }

    /// True once no job is left running.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.count(JobStatus::Running) == 0
    }
}

/// Names of requested jobs grouped by how their run ended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub completed: Vec<String>,
    pub failed: Vec<String>,
    /// Requested but never started because the run was cancelled.
    pub skipped: Vec<String>,
}

impl RunSummary {
    /// Exit status 0 is allowed only when this holds.
    #[must_use]
    pub fn success(&self) -> bool {
        self.failed.is_empty() && self.skipped.is_empty()
    }
}

/// Sequences jobs through an executor, one at a time.
pub struct Orchestrator<E> {
    layout: ProjectLayout,
    registry: JobRegistry,
    executor: E,
    session: TrainingSession,
}

impl<E: JobExecutor> Orchestrator<E> {
    #[must_use]
    pub fn new(layout: ProjectLayout, registry: JobRegistry, executor: E) -> Self {
        let session = TrainingSession::new(layout.root().to_path_buf(), registry.jobs(&layout));
        Self { layout, registry, executor, session }
    }

    #[must_use]
    pub fn session(&self) -> &TrainingSession {
        &self.session
    }

    /// Gate for `run`: fails with `TrainingError::Prerequisite` before any job starts.
    pub fn check_prerequisites(&self, job_names: &[String]) -> TrainingResult<PrerequisiteReport> {
        let prerequisites = Prerequisites::for_jobs(&self.layout, &self.registry, job_names);
        prereq::check(&prerequisites).into_result()
    }

    /// Run `requested` jobs in order (default: canonical registry order).
    ///
    /// A failing job never aborts the loop. Unknown names fail immediately
    /// without reaching the executor. Once `cancel` fires, jobs not yet
    /// started stay pending and are listed as skipped.
    pub async fn run(
        &mut self,
        requested: Option<&[String]>,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> RunSummary {
        let names = requested.map_or_else(|| self.registry.names(), <[String]>::to_vec);
        let mut summary = RunSummary::default();
        let mut seen = HashSet::new();

        for name in names {
            if !seen.insert(name.clone()) {
                warn!(job = %name, "Job requested more than once, skipping repeat");
                continue;
            }
            if self.registry.get(&name).is_none() {
                error!("Unknown model: {name}");
                summary.failed.push(name);
                continue;
            }
            if cancel.is_cancelled() {
                summary.skipped.push(name);
                continue;
            }

            match self.run_job(&name, sink, cancel).await {
                Ok(Outcome::Success) => {
                    info!(job = %name, "Training completed successfully");
                    summary.completed.push(name);
                }
                Ok(Outcome::Failed(detail)) => {
                    error!(
                        job = %name,
                        error = %detail,
                        "Training failed, continuing with next model"
                    );
                    summary.failed.push(name);
                }
                Err(e) => {
                    error!(job = %name, error = %e, "Job could not be run");
                    summary.failed.push(name);
                }
            }
        }

        summary
    }

    async fn run_job(
        &mut self,
        name: &str,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> TrainingResult<Outcome> {
        let invocation = self.registry.invocation(name, &self.layout)?;

        self.session
            .job_mut(name)
            .ok_or_else(|| TrainingError::UnknownJob(name.to_string()))?
            .mark_running(Utc::now())?;
        info!(job = %name, "Starting training");

        let outcome = self.executor.run(&invocation, sink, cancel).await;

        self.session
            .job_mut(name)
            .ok_or_else(|| TrainingError::UnknownJob(name.to_string()))?
            .finish(&outcome, Utc::now())?;
        Ok(outcome)
    }
}
