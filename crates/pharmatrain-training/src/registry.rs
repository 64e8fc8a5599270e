use crate::error::{TrainingError, TrainingResult};
use crate::job::Job;
use crate::job_config::JobKind;
use crate::layout::ProjectLayout;
use std::ffi::OsString;
use std::path::PathBuf;

/// Interpreter used to launch job scripts when none is configured.
pub const DEFAULT_INTERPRETER: &str = "python3";

/// A known job: which script trains it and which config schema it reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDefinition {
    pub name: String,
    pub kind: JobKind,
    /// Script file name under `training/scripts/`.
    pub script: String,
    /// Config file name under `training/configs/`.
    pub config: String,
}

impl JobDefinition {
    #[must_use]
    pub fn new(kind: JobKind, script: &str, config: &str) -> Self {
        Self {
            name: kind.as_str().to_string(),
            kind,
            script: script.to_string(),
            config: config.to_string(),
        }
    }
}

/// Fully resolved command line for one job run.
#[derive(Debug, Clone)]
pub struct JobInvocation {
    pub job_name: String,
    pub program: OsString,
    pub args: Vec<OsString>,
    pub output_dir: PathBuf,
    pub log_path: PathBuf,
}

impl JobInvocation {
    /// Render the command line for logs.
    #[must_use]
    pub fn display_command(&self) -> String {
        std::iter::once(&self.program)
            .chain(self.args.iter())
            .map(|a| a.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Startup-time mapping from job name to invocation template and config schema.
///
/// Iteration order is the canonical run order.
#[derive(Debug, Clone)]
pub struct JobRegistry {
    interpreter: String,
    definitions: Vec<JobDefinition>,
}

impl JobRegistry {
    #[must_use]
    pub fn new(interpreter: impl Into<String>, definitions: Vec<JobDefinition>) -> Self {
        Self { interpreter: interpreter.into(), definitions }
    }

    /// The three stock jobs in canonical order.
    #[must_use]
    pub fn builtin(interpreter: impl Into<String>) -> Self {
        Self::new(
            interpreter,
            vec![
                JobDefinition::new(
                    JobKind::DrugClassifier,
                    "train_drug_classifier.py",
                    "drug_classifier_config.json",
                ),
                JobDefinition::new(
                    JobKind::AuthenticityVerifier,
                    "train_authenticity_verifier.py",
                    "authenticity_config.json",
                ),
                JobDefinition::new(
                    JobKind::PillDetector,
                    "train_pill_detector.py",
                    "pill_detection_config.json",
                ),
            ],
        )
    }

    #[must_use]
    pub fn interpreter(&self) -> &str {
        &self.interpreter
    }

    #[must_use]
    pub fn definitions(&self) -> &[JobDefinition] {
        &self.definitions
    }

    #[must_use]
    pub fn names(&self) -> Vec<String> {
        self.definitions.iter().map(|d| d.name.clone()).collect()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&JobDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    #[must_use]
    pub fn find_kind(&self, kind: JobKind) -> Option<&JobDefinition> {
        self.definitions.iter().find(|d| d.kind == kind)
    }

    /// A fresh pending `Job` for every definition, in canonical order.
    #[must_use]
    pub fn jobs(&self, layout: &ProjectLayout) -> Vec<Job> {
        self.definitions
            .iter()
            .map(|d| {
                Job::new(
                    d.name.clone(),
                    layout.scripts_dir().join(&d.script),
                    layout.configs_dir().join(&d.config),
                    layout.job_output_dir(&d.name),
                )
            })
            .collect()
    }

    /// `<interpreter> <script> --config <cfg> --data <data_root> --output <out_dir>`
    pub fn invocation(&self, name: &str, layout: &ProjectLayout) -> TrainingResult<JobInvocation> {
        let def = self.get(name).ok_or_else(|| TrainingError::UnknownJob(name.to_string()))?;
        let output_dir = layout.job_output_dir(&def.name);

        Ok(JobInvocation {
            job_name: def.name.clone(),
            program: OsString::from(&self.interpreter),
            args: vec![
                layout.scripts_dir().join(&def.script).into_os_string(),
                OsString::from("--config"),
                layout.configs_dir().join(&def.config).into_os_string(),
                OsString::from("--data"),
                layout.data_dir().into_os_string(),
                OsString::from("--output"),
                output_dir.clone().into_os_string(),
            ],
            log_path: layout.job_log_path(&def.name),
            output_dir,
        })
    }
}

impl Default for JobRegistry {
    fn default() -> Self {
        Self::builtin(DEFAULT_INTERPRETER)
    }
}
