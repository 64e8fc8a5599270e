//! Pharmatrain Training
//!
//! Orchestration and data-preparation primitives for the pharmaceutical
//! image models:
//! - Registering training jobs and resolving their command lines (`JobRegistry`)
//! - Gating a run on scripts, configs and data (`prereq`)
//! - Running each job as a subprocess with streamed, logged output (`JobRunner`)
//! - Sequencing jobs and tracking their lifecycle (`Orchestrator`)
//! - Writing timestamped training reports (`report`)
//! - Validating, splitting and pairing the image corpus (`dataset`)

pub mod dataset;
pub mod error;
pub mod job;
pub mod job_config;
pub mod layout;
pub mod orchestrator;
pub mod prereq;
pub mod progress;
pub mod registry;
pub mod report;
pub mod runner;

pub use dataset::pairs::{ComparisonPair, sample as sample_pairs, write_pairs_jsonl};
pub use dataset::split::{Split, SplitAssignment, SplitRatios, SplitSummary, split_dataset};
pub use dataset::validate::{DatasetReport, ValidationReport, validate_dataset};
pub use dataset::{DatasetItem, ImageClass, discover_items, load_image_pools};
pub use error::{TrainingError, TrainingResult};
pub use job::{Job, JobStatus};
pub use job_config::{JobConfig, JobKind};
pub use layout::ProjectLayout;
pub use orchestrator::{Orchestrator, RunSummary, TrainingSession};
pub use prereq::{PrerequisiteReport, Prerequisites};
pub use progress::{
    NullProgressSink, ProgressEvent, ProgressSink, StdoutProgressSink, TracingProgressSink,
};
pub use registry::{DEFAULT_INTERPRETER, JobDefinition, JobInvocation, JobRegistry};
pub use report::{TrainingReport, render_summary, write_report};
pub use runner::{FailureDetail, JobExecutor, JobRunner, Outcome};
