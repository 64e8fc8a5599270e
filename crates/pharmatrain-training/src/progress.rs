use serde::{Deserialize, Serialize};
use tracing::info;

/// Live view of a running job's output.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProgressEvent {
    Started { job: String, command: String },
    Line { job: String, line: String },
    Finished { job: String, success: bool },
}

pub trait ProgressSink: Send + Sync {
    fn on_event(&self, event: ProgressEvent);
}

#[derive(Debug, Default)]
pub struct StdoutProgressSink;

impl ProgressSink for StdoutProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { job, command } => println!("[{job}] started: {command}"),
            ProgressEvent::Line { job, line } => println!("[{job}] {line}"),
            ProgressEvent::Finished { job, success: true } => println!("[{job}] finished"),
            ProgressEvent::Finished { job, success: false } => println!("[{job}] failed"),
        }
    }
}

/// Forwards job output into the `tracing` pipeline.
#[derive(Debug, Default)]
pub struct TracingProgressSink;

impl ProgressSink for TracingProgressSink {
    fn on_event(&self, event: ProgressEvent) {
        match event {
            ProgressEvent::Started { job, command } => {
                info!(job = %job, command = %command, "job started");
            }
            ProgressEvent::Line { job, line } => info!(job = %job, "{line}"),
            ProgressEvent::Finished { job, success } => info!(job = %job, success, "job finished"),
        }
    }
}

/// Discards every event.
#[derive(Debug, Default)]
pub struct NullProgressSink;

impl ProgressSink for NullProgressSink {
    fn on_event(&self, _event: ProgressEvent) {}
}
