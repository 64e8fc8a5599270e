use crate::dataset::ImageClass;
use crate::error::{TrainingError, TrainingResult};
use crate::job_config::{JobConfig, JobKind};
use crate::layout::ProjectLayout;
use crate::registry::JobRegistry;
use std::path::PathBuf;
use tracing::{error, info, warn};

/// One input that must exist before jobs launch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Requirement {
    Directory(PathBuf),
    Script(PathBuf),
    /// A config file, parsed against its job kind's schema.
    Config { path: PathBuf, kind: JobKind },
    /// Missing data only warns: a job may legitimately provide its data later.
    DataDirectory(PathBuf),
}

/// Ordered list of requirements for a run.
#[derive(Debug, Clone, Default)]
pub struct Prerequisites {
    requirements: Vec<Requirement>,
}

impl Prerequisites {
    #[must_use]
    pub fn new(requirements: Vec<Requirement>) -> Self {
        Self { requirements }
    }

    /// Requirements for running `job_names`. Names missing from the registry
    /// are skipped here; the orchestrator fails them on its own.
    #[must_use]
    pub fn for_jobs(layout: &ProjectLayout, registry: &JobRegistry, job_names: &[String]) -> Self {
        let mut requirements = vec![
            Requirement::Directory(layout.scripts_dir()),
            Requirement::Directory(layout.configs_dir()),
            Requirement::Directory(layout.data_dir()),
        ];

        for name in job_names {
            let Some(def) = registry.get(name) else { continue };
            requirements.push(Requirement::Script(layout.scripts_dir().join(&def.script)));
            requirements.push(Requirement::Config {
                path: layout.configs_dir().join(&def.config),
                kind: def.kind,
            });
        }

        for class in ImageClass::ALL {
            requirements.push(Requirement::DataDirectory(layout.class_dir(class)));
        }

        Self { requirements }
    }

    #[must_use]
    pub fn requirements(&self) -> &[Requirement] {
        &self.requirements
    }
}

/// Result of a prerequisite check. Diagnostics only; nothing is created or changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrerequisiteReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl PrerequisiteReport {
    #[must_use]
    pub fn passed(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn into_result(self) -> TrainingResult<Self> {
        if self.passed() { Ok(self) } else { Err(TrainingError::Prerequisite(self.errors)) }
    }
}

/// Check every requirement and collect one diagnostic per problem.
pub fn check(prerequisites: &Prerequisites) -> PrerequisiteReport {
    info!("Checking training prerequisites");
    let mut report = PrerequisiteReport::default();

    for requirement in prerequisites.requirements() {
        match requirement {
            Requirement::Directory(dir) => {
                if !dir.is_dir() {
                    report.errors.push(format!("Required directory missing: {}", dir.display()));
                }
            }
            Requirement::Script(path) => {
                if !path.is_file() {
                    report
                        .errors
                        .push(format!("Required training script missing: {}", path.display()));
                }
            }
            Requirement::Config { path, kind } => {
                if !path.is_file() {
                    report.errors.push(format!("Required config file missing: {}", path.display()));
                } else if let Err(e) = JobConfig::load(*kind, path) {
                    report.errors.push(e.to_string());
                }
            }
            Requirement::DataDirectory(dir) => {
                if !dir.is_dir() {
                    report.warnings.push(format!("Data directory missing: {}", dir.display()));
                }
            }
        }
    }

    for msg in &report.errors {
        error!("{msg}");
    }
    for msg in &report.warnings {
        warn!("{msg}");
    }
    if !report.warnings.is_empty() {
        warn!("Training may fail without proper data setup");
    }
    if report.passed() {
        info!("Prerequisites check completed");
    }

    report
}
