use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// One unit of conversion work: a single source image and its destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionTask {
    pub id: Uuid,
    pub source_path: PathBuf,
    pub dest_path: PathBuf,
    pub file_name: String,
    pub status: TaskStatus,
    pub error: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
    Skipped,
}

impl TaskStatus {
    /// Terminal statuses never change again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Skipped)
    }
}

impl ConversionTask {
    pub fn new(source_path: PathBuf, dest_path: PathBuf) -> Self {
        let file_name = source_path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        Self {
            id: Uuid::new_v4(),
            source_path,
            dest_path,
            file_name,
            status: TaskStatus::Pending,
            error: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn start(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn succeed(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = TaskStatus::Succeeded;
        self.completed_at = Some(Utc::now());
    }

    pub fn skip(&mut self) {
        if self.status.is_terminal() {
            return;
        }
        self.status = TaskStatus::Skipped;
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: &str) {
        if self.status.is_terminal() {
            return;
        }
        self.status = TaskStatus::Failed;
        self.error = Some(error.to_string());
        self.completed_at = Some(Utc::now());
    }
}

/// Stage of a conversion run, in transition order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStage {
    Idle,
    ResolvingTool,
    ToolUnavailable,
    ToolReady,
    Scanning,
    Converting,
    Finished,
}

impl std::fmt::Display for RunStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ResolvingTool => "resolving tool",
            Self::ToolUnavailable => "tool unavailable",
            Self::ToolReady => "tool ready",
            Self::Scanning => "scanning",
            Self::Converting => "converting",
            Self::Finished => "finished",
        };
        f.write_str(name)
    }
}

/// Aggregate counts for a finished conversion run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub succeeded: usize,
    pub skipped: usize,
    pub failed: usize,
}

impl RunSummary {
    pub fn total(&self) -> usize {
        self.succeeded + self.skipped + self.failed
    }

    /// The run counts as an overall success only when nothing failed.
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }

    pub fn record(&mut self, status: TaskStatus) {
        match status {
            TaskStatus::Succeeded => self.succeeded += 1,
            TaskStatus::Skipped => self.skipped += 1,
            TaskStatus::Failed => self.failed += 1,
            TaskStatus::Pending | TaskStatus::Running => {}
        }
    }
}

/// How a conversion run ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum RunOutcome {
    /// All tasks reached a terminal status.
    Completed { summary: RunSummary },
    /// The scan found no convertible source images; nothing ran.
    NothingToConvert,
    /// The converter tool could not be resolved or verified.
    ToolUnavailable,
    /// The stop signal fired mid-run; completed tasks keep their results.
    Cancelled { summary: RunSummary },
}

/// Remediation offered when the converter tool is unavailable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum RecoveryAction {
    /// The platform supports unattended package installation; running this
    /// command should provide the tool.
    InstallPackage { command: String },
    /// Place a chdman build at the expected bundled location.
    PlaceInBundleDir { expected: PathBuf },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_lifecycle() {
        let mut task =
            ConversionTask::new(PathBuf::from("/roms/a.cue"), PathBuf::from("/roms/a.chd"));
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(task.file_name, "a.cue");

        task.start();
        assert_eq!(task.status, TaskStatus::Running);
        assert!(task.started_at.is_some());

        task.succeed();
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert!(task.completed_at.is_some());
    }

    #[test]
    fn terminal_status_never_regresses() {
        let mut task =
            ConversionTask::new(PathBuf::from("/roms/a.cue"), PathBuf::from("/roms/a.chd"));
        task.skip();
        assert_eq!(task.status, TaskStatus::Skipped);

        task.start();
        task.fail("late failure");
        assert_eq!(task.status, TaskStatus::Skipped);
        assert!(task.error.is_none());
    }

    #[test]
    fn summary_counts_sum_to_total() {
        let mut summary = RunSummary::default();
        summary.record(TaskStatus::Succeeded);
        summary.record(TaskStatus::Succeeded);
        summary.record(TaskStatus::Skipped);
        summary.record(TaskStatus::Failed);
        summary.record(TaskStatus::Running); // ignored

        assert_eq!(summary.total(), 4);
        assert!(!summary.is_success());
        assert_eq!(
            summary,
            RunSummary {
                succeeded: 2,
                skipped: 1,
                failed: 1
            }
        );
    }

    #[test]
    fn empty_summary_is_success() {
        assert!(RunSummary::default().is_success());
    }
}
