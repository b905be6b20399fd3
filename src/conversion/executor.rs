//! Conversion run execution.
//!
//! A [`ConversionRun`] drives one directory through the full pipeline:
//! resolve the tool, scan for convertible sources, then convert each one
//! sequentially under supervision. It is blocking by design and meant to
//! run on a dedicated thread (`spawn_blocking`); progress flows out through
//! the broadcast channel and cancellation flows in through an atomic flag.

use crate::config::Config;
use crate::conversion::tool::ChdTool;
use crate::scanner::list_by_extensions;
use crate::state::{AppEvent, ConversionTask, RunOutcome, RunStage, RunSummary};
use rommate_common::formats::{sidecar_path, ARCHIVE_EXTENSION, SOURCE_EXTENSIONS};
use rommate_common::Result;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{info, warn};

/// Interval between child exit polls; each poll also emits a heartbeat.
const HEARTBEAT_INTERVAL: Duration = Duration::from_millis(300);

/// How a supervised converter child ended.
enum ChildOutcome {
    Exited { status: ExitStatus, stderr: String },
    /// The child could not be launched or supervised at all. Fails the one
    /// task, never the batch.
    LaunchFailed { detail: String },
    Cancelled,
}

pub struct ConversionRun {
    config: Config,
    stop_signal: Arc<AtomicBool>,
    event_tx: broadcast::Sender<AppEvent>,
}

impl ConversionRun {
    pub fn new(
        config: Config,
        stop_signal: Arc<AtomicBool>,
        event_tx: broadcast::Sender<AppEvent>,
    ) -> Self {
        Self {
            config,
            stop_signal,
            event_tx,
        }
    }

    fn emit(&self, event: AppEvent) {
        // A send only fails when no receiver is attached, which is fine.
        let _ = self.event_tx.send(event);
    }

    fn stage(&self, stage: RunStage) {
        self.emit(AppEvent::stage_changed(stage));
    }

    fn stopped(&self) -> bool {
        self.stop_signal.load(Ordering::SeqCst)
    }

    /// Convert every source image in `dir`. Blocks until the run finishes,
    /// is cancelled, or fails to even start.
    pub fn execute(&self, dir: &Path) -> Result<RunOutcome> {
        self.stage(RunStage::ResolvingTool);
        let tool = match ChdTool::resolve(&self.config.tools) {
            Ok(tool) => tool,
            Err(err) => {
                warn!("Converter unavailable: {err}");
                let recovery = err.recovery_action(&self.config.tools);
                self.emit(AppEvent::tool_unavailable(err.to_string(), recovery));
                self.stage(RunStage::ToolUnavailable);
                self.emit(AppEvent::run_finished(RunOutcome::ToolUnavailable));
                return Ok(RunOutcome::ToolUnavailable);
            }
        };
        self.emit(AppEvent::tool_resolved(tool.path.clone()));
        self.stage(RunStage::ToolReady);

        self.stage(RunStage::Scanning);
        self.emit(AppEvent::scan_started(dir.to_path_buf()));
        let sources = list_by_extensions(dir, SOURCE_EXTENSIONS)?;
        let mut tasks: Vec<ConversionTask> = sources
            .into_iter()
            .map(|source| {
                let dest = source.with_extension(ARCHIVE_EXTENSION);
                ConversionTask::new(source, dest)
            })
            .collect();
        self.emit(AppEvent::tasks_discovered(tasks.len()));

        if tasks.is_empty() {
            info!("Nothing to convert in {:?}", dir);
            self.stage(RunStage::Finished);
            self.emit(AppEvent::run_finished(RunOutcome::NothingToConvert));
            return Ok(RunOutcome::NothingToConvert);
        }

        self.stage(RunStage::Converting);
        let total = tasks.len();
        let mut summary = RunSummary::default();
        let mut cancelled = false;

        for (i, task) in tasks.iter_mut().enumerate() {
            if self.stopped() {
                cancelled = true;
                break;
            }

            task.start();
            self.emit(AppEvent::task_started(task, i + 1, total));

            if task.dest_path.exists() {
                // Already converted; the source stays even in delete mode.
                info!("Skipping {}: {:?} exists", task.file_name, task.dest_path);
                task.skip();
            } else {
                match self.run_converter(&tool, task) {
                    ChildOutcome::Cancelled => {
                        task.fail("cancelled by stop signal");
                        summary.record(task.status);
                        self.emit(AppEvent::task_finished(task));
                        cancelled = true;
                        break;
                    }
                    ChildOutcome::Exited { status, .. } if status.success() => {
                        task.succeed();
                        if self.config.conversion.delete_originals {
                            self.delete_original(task);
                        }
                    }
                    ChildOutcome::Exited { status, stderr } => {
                        let detail = stderr
                            .lines()
                            .rev()
                            .find(|l| !l.trim().is_empty())
                            .unwrap_or("no diagnostic output")
                            .trim();
                        task.fail(&format!("chdman exited with {status}: {detail}"));
                        warn!("Conversion failed for {}: {detail}", task.file_name);
                    }
                    ChildOutcome::LaunchFailed { detail } => {
                        task.fail(&detail);
                        warn!("Conversion failed for {}: {detail}", task.file_name);
                    }
                }
            }

            summary.record(task.status);
            self.emit(AppEvent::task_finished(task));
        }

        let outcome = if cancelled {
            RunOutcome::Cancelled { summary }
        } else {
            RunOutcome::Completed { summary }
        };
        self.stage(RunStage::Finished);
        self.emit(AppEvent::run_finished(outcome.clone()));
        Ok(outcome)
    }

    /// Spawn `chdman createcd` for one task and supervise it: heartbeats
    /// while it runs, kill on the stop signal. Launch and supervision
    /// failures come back as [`ChildOutcome::LaunchFailed`] so the caller
    /// records them against the task and moves on.
    fn run_converter(&self, tool: &ChdTool, task: &ConversionTask) -> ChildOutcome {
        let spawned = Command::new(&tool.path)
            .arg("createcd")
            .arg("-i")
            .arg(&task.source_path)
            .arg("-o")
            .arg(&task.dest_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn();
        let mut child = match spawned {
            Ok(child) => child,
            Err(e) => {
                return ChildOutcome::LaunchFailed {
                    detail: format!("failed to launch chdman: {e}"),
                }
            }
        };

        // Drain stderr off-thread so a chatty child never blocks on the pipe.
        let stderr_reader = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                use std::io::Read as _;
                let mut buf = String::new();
                let _ = pipe.read_to_string(&mut buf);
                buf
            })
        });

        let status = loop {
            if self.stopped() {
                warn!("Stop requested, killing converter for {}", task.file_name);
                let _ = child.kill();
                let _ = child.wait();
                if let Some(handle) = stderr_reader {
                    let _ = handle.join();
                }
                return ChildOutcome::Cancelled;
            }

            match child.try_wait() {
                Ok(Some(status)) => break status,
                Ok(None) => {
                    self.emit(AppEvent::task_heartbeat(task));
                    std::thread::sleep(HEARTBEAT_INTERVAL);
                }
                Err(e) => {
                    let _ = child.kill();
                    let _ = child.wait();
                    if let Some(handle) = stderr_reader {
                        let _ = handle.join();
                    }
                    return ChildOutcome::LaunchFailed {
                        detail: format!("lost track of chdman: {e}"),
                    };
                }
            }
        };

        let stderr = stderr_reader
            .and_then(|h| h.join().ok())
            .unwrap_or_default();
        ChildOutcome::Exited { status, stderr }
    }

    /// Remove the converted source and, for cue sheets, its bin sidecar.
    /// Deletion failures degrade to warnings; the conversion already
    /// succeeded and the archive is in place.
    fn delete_original(&self, task: &ConversionTask) {
        let mut victims = vec![task.source_path.clone()];
        if let Some(sidecar) = sidecar_path(&task.source_path) {
            if sidecar.exists() {
                victims.push(sidecar);
            }
        }

        for path in victims {
            match std::fs::remove_file(&path) {
                Ok(()) => {
                    let name = path
                        .file_name()
                        .map(|n| n.to_string_lossy().to_string())
                        .unwrap_or_default();
                    info!("Deleted original {name}");
                    self.emit(AppEvent::source_deleted(name));
                }
                Err(e) => warn!("Could not delete {:?}: {e}", path),
            }
        }
    }
}
