//! Launches one external training job and streams its output.
//!
//! stdout and stderr each get a reader task feeding one bounded channel. The
//! runner drains the channel into the live sink and the job log until both
//! streams close, then waits for the exit status. Lines are recorded in
//! arrival order; ordering between a stdout line and a stderr line written
//! close together is not guaranteed. A per-job timeout and a
//! cancellation token can interrupt either phase; the child is killed and the
//! run reported as failed.

use crate::progress::{ProgressEvent, ProgressSink};
use crate::registry::JobInvocation;
use async_trait::async_trait;
use chrono::{SecondsFormat, Utc};
use std::path::Path;
use std::process::{ExitStatus, Stdio};
use std::time::Duration;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Lines buffered between the reader tasks and the runner.
pub const LINE_CHANNEL_CAPACITY: usize = 256;

/// Why a job run failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureDetail {
    /// The process exited with a non-zero code.
    ExitCode(i32),
    /// The process ended without an exit code (killed by a signal).
    Terminated,
    /// The executable could not be launched.
    Spawn(String),
    /// Output directory, log file or pipe I/O failed.
    Io(String),
    TimedOut(Duration),
    Cancelled,
}

impl std::fmt::Display for FailureDetail {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ExitCode(code) => write!(f, "Process exited with code {code}"),
            Self::Terminated => f.write_str("Process terminated by signal"),
            Self::Spawn(e) => write!(f, "Failed to launch process: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::TimedOut(limit) => write!(f, "Timed out after {}s", limit.as_secs_f64()),
            Self::Cancelled => f.write_str("Cancelled"),
        }
    }
}

/// Classification of one subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failed(FailureDetail),
}

impl Outcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// Executes a resolved job invocation to completion.
#[async_trait]
pub trait JobExecutor: Send + Sync {
    async fn run(
        &self,
        invocation: &JobInvocation,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Outcome;
}

/// Subprocess-backed executor. Never retries.
#[derive(Debug, Clone, Default)]
pub struct JobRunner {
    timeout: Option<Duration>,
}

impl JobRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// `None` keeps the baseline behaviour: wait for the job indefinitely.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    async fn execute(
        &self,
        invocation: &JobInvocation,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> std::io::Result<Outcome> {
        tokio::fs::create_dir_all(&invocation.output_dir).await?;
        let mut log = JobLog::open(&invocation.log_path).await?;

        info!(job = %invocation.job_name, "Executing: {}", invocation.display_command());

        let spawned = Command::new(&invocation.program)
            .args(&invocation.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                let message = format!("failed to launch {}: {e}", invocation.display_command());
                log.write_line(&message).await;
                return Ok(Outcome::Failed(FailureDetail::Spawn(e.to_string())));
            }
        };

        let (tx, mut rx) = mpsc::channel::<String>(LINE_CHANNEL_CAPACITY);
        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(forward_lines(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(forward_lines(stderr, tx.clone()));
        }
        drop(tx);

        let expiry = expire(self.timeout.map(|t| Instant::now() + t));
        tokio::pin!(expiry);

        loop {
            let step = tokio::select! {
                () = cancel.cancelled() => Step::Interrupt(FailureDetail::Cancelled),
                () = &mut expiry => Step::Interrupt(self.timed_out()),
                line = rx.recv() => Step::Line(line),
            };
            match step {
                Step::Line(Some(line)) => {
                    log.write_line(&line).await;
                    sink.on_event(ProgressEvent::Line { job: invocation.job_name.clone(), line });
                }
                Step::Line(None) => break,
                Step::Interrupt(detail) => return Ok(abort(&mut child, &mut log, detail).await),
            }
        }

        let waited = tokio::select! {
            () = cancel.cancelled() => Err(FailureDetail::Cancelled),
            () = &mut expiry => Err(self.timed_out()),
            status = child.wait() => Ok(status),
        };
        match waited {
            Ok(status) => Ok(classify(status?)),
            Err(detail) => Ok(abort(&mut child, &mut log, detail).await),
        }
    }

    fn timed_out(&self) -> FailureDetail {
        FailureDetail::TimedOut(self.timeout.unwrap_or_default())
    }
}

#[async_trait]
impl JobExecutor for JobRunner {
    async fn run(
        &self,
        invocation: &JobInvocation,
        sink: &dyn ProgressSink,
        cancel: &CancellationToken,
    ) -> Outcome {
        sink.on_event(ProgressEvent::Started {
            job: invocation.job_name.clone(),
            command: invocation.display_command(),
        });

        let outcome = match self.execute(invocation, sink, cancel).await {
            Ok(outcome) => outcome,
            Err(e) => Outcome::Failed(FailureDetail::Io(e.to_string())),
        };

        sink.on_event(ProgressEvent::Finished {
            job: invocation.job_name.clone(),
            success: outcome.is_success(),
        });
        outcome
    }
}

enum Step {
    Line(Option<String>),
    Interrupt(FailureDetail),
}

/// Append-only per-job log. Each entry is `<ISO-8601 timestamp> - <line>`.
struct JobLog {
    path: std::path::PathBuf,
    file: File,
    write_failed: bool,
}

impl JobLog {
    async fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path).await?;
        Ok(Self { path: path.to_path_buf(), file, write_failed: false })
    }

    /// Write failures are reported once and do not stop the job.
    async fn write_line(&mut self, line: &str) {
        let timestamp = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        let entry = format!("{timestamp} - {line}\n");
        let result = match self.file.write_all(entry.as_bytes()).await {
            Ok(()) => self.file.flush().await,
            Err(e) => Err(e),
        };
        if let Err(e) = result {
            if !self.write_failed {
                warn!(path = %self.path.display(), error = %e, "Failed to write job log");
                self.write_failed = true;
            }
        }
    }
}

async fn forward_lines<R>(reader: R, tx: mpsc::Sender<String>)
where
    R: AsyncRead + Unpin,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf).trim_end().to_string();
                if tx.send(line).await.is_err() {
                    break;
                }
            }
            Err(e) => {
                debug!(error = %e, "job output stream closed with error");
                break;
            }
        }
    }
}

async fn expire(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

async fn abort(child: &mut Child, log: &mut JobLog, detail: FailureDetail) -> Outcome {
    warn!(detail = %detail, "Terminating job process");
    if let Err(e) = child.kill().await {
        warn!(error = %e, "Failed to kill job process");
    }
    log.write_line(&format!("terminated: {detail}")).await;
    Outcome::Failed(detail)
}

fn classify(status: ExitStatus) -> Outcome {
    match status.code() {
        Some(0) => Outcome::Success,
        Some(code) => Outcome::Failed(FailureDetail::ExitCode(code)),
        None => Outcome::Failed(FailureDetail::Terminated),
    }
}
