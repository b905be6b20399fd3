mod types;

pub use types::*;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;
use uuid::Uuid;

/// Capacity of the event channel between the worker and its subscribers.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Structured status event emitted by the pipelines.
///
/// The worker owns all mutable state; subscribers only observe. Events carry
/// data, never formatted presentation text, so tests and frontends can both
/// consume them.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AppEvent {
    /// The conversion run moved to a new stage.
    StageChanged { stage: RunStage },

    /// The converter tool was located and verified.
    ToolResolved { path: PathBuf },

    /// The converter tool is missing or broken; a recovery path is offered.
    ToolUnavailable {
        reason: String,
        recovery: RecoveryAction,
    },

    /// A directory scan began.
    ScanStarted { directory: PathBuf },

    /// The scan produced this many conversion tasks.
    TasksDiscovered { total: usize },

    /// A conversion task started (1-based index within the batch).
    TaskStarted {
        id: Uuid,
        index: usize,
        total: usize,
        file_name: String,
    },

    /// The in-flight child process is still running. The tool emits no
    /// machine-readable progress, so this is presence, not percentage.
    TaskHeartbeat { id: Uuid, file_name: String },

    /// A conversion task reached a terminal status.
    TaskFinished {
        id: Uuid,
        file_name: String,
        status: TaskStatus,
        error: Option<String>,
    },

    /// A source image (and possibly its sidecar) was deleted after a
    /// successful conversion.
    SourceDeleted { file_name: String },

    /// A candidate group mixed file extensions and was rejected whole.
    GroupRejected {
        title: String,
        extensions: Vec<String>,
    },

    /// A playlist file was written.
    PlaylistCreated { path: PathBuf, discs: usize },

    /// A playlist already existed and was left untouched.
    PlaylistSkipped { path: PathBuf },

    /// The conversion run ended.
    RunFinished { outcome: RunOutcome },
}

impl AppEvent {
    pub fn stage_changed(stage: RunStage) -> Self {
        AppEvent::StageChanged { stage }
    }

    pub fn tool_resolved(path: PathBuf) -> Self {
        AppEvent::ToolResolved { path }
    }

    pub fn tool_unavailable(reason: String, recovery: RecoveryAction) -> Self {
        AppEvent::ToolUnavailable { reason, recovery }
    }

    pub fn scan_started(directory: PathBuf) -> Self {
        AppEvent::ScanStarted { directory }
    }

    pub fn tasks_discovered(total: usize) -> Self {
        AppEvent::TasksDiscovered { total }
    }

    pub fn task_started(task: &ConversionTask, index: usize, total: usize) -> Self {
        AppEvent::TaskStarted {
            id: task.id,
            index,
            total,
            file_name: task.file_name.clone(),
        }
    }

    pub fn task_heartbeat(task: &ConversionTask) -> Self {
        AppEvent::TaskHeartbeat {
            id: task.id,
            file_name: task.file_name.clone(),
        }
    }

    pub fn task_finished(task: &ConversionTask) -> Self {
        AppEvent::TaskFinished {
            id: task.id,
            file_name: task.file_name.clone(),
            status: task.status,
            error: task.error.clone(),
        }
    }

    pub fn source_deleted(file_name: String) -> Self {
        AppEvent::SourceDeleted { file_name }
    }

    pub fn group_rejected(title: String, extensions: Vec<String>) -> Self {
        AppEvent::GroupRejected { title, extensions }
    }

    pub fn playlist_created(path: PathBuf, discs: usize) -> Self {
        AppEvent::PlaylistCreated { path, discs }
    }

    pub fn playlist_skipped(path: PathBuf) -> Self {
        AppEvent::PlaylistSkipped { path }
    }

    pub fn run_finished(outcome: RunOutcome) -> Self {
        AppEvent::RunFinished { outcome }
    }
}

/// Create the event channel shared by a worker and its subscribers.
pub fn event_channel() -> (broadcast::Sender<AppEvent>, broadcast::Receiver<AppEvent>) {
    broadcast::channel(EVENT_CHANNEL_CAPACITY)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_type_tag() {
        let event = AppEvent::tasks_discovered(3);
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event_type"], "tasks_discovered");
        assert_eq!(json["total"], 3);
    }

    #[test]
    fn task_finished_carries_error() {
        let mut task = ConversionTask::new(
            PathBuf::from("/roms/a.cue"),
            PathBuf::from("/roms/a.chd"),
        );
        task.start();
        task.fail("chdman exited with status 1");

        let event = AppEvent::task_finished(&task);
        match event {
            AppEvent::TaskFinished {
                status,
                error,
                file_name,
                ..
            } => {
                assert_eq!(status, TaskStatus::Failed);
                assert_eq!(error.as_deref(), Some("chdman exited with status 1"));
                assert_eq!(file_name, "a.cue");
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn recovery_action_round_trips() {
        let event = AppEvent::tool_unavailable(
            "chdman not found".to_string(),
            RecoveryAction::InstallPackage {
                command: "sudo apt-get install -y mame-tools".to_string(),
            },
        );
        let json = serde_json::to_string(&event).unwrap();
        let back: AppEvent = serde_json::from_str(&json).unwrap();
        match back {
            AppEvent::ToolUnavailable { recovery, .. } => {
                assert_eq!(
                    recovery,
                    RecoveryAction::InstallPackage {
                        command: "sudo apt-get install -y mame-tools".to_string()
                    }
                );
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
