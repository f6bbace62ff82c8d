//! State - タスクとワークフローの状態

use serde::{Deserialize, Serialize};
use std::fmt;

/// タスクのライフサイクル
///
/// 状態遷移:
/// - Pending -> Running -> Completed
/// - Pending -> Running -> Failed
/// - any -> Cancelled（明示的な要求のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    /// 作成済み、未実行
    Pending,

    /// executor が実処理中
    Running,

    Completed,
    Failed,
    Cancelled,
}

impl TaskStatus {
    /// 終端状態か（実行による遷移はもう起きない）
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled
        )
    }

    /// この状態のタスクを実行できるか
    pub fn is_executable(self) -> bool {
        matches!(self, TaskStatus::Pending)
    }

    /// `self -> next` は正当な遷移か
    ///
    /// 同じ状態に留まるのと、どこからでも Cancelled へ行くのは常に許す。
    pub fn can_transition_to(self, next: TaskStatus) -> bool {
        use TaskStatus::*;
        self == next
            || next == Cancelled
            || matches!(
                (self, next),
                (Pending, Running) | (Running, Completed) | (Running, Failed)
            )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "PENDING",
            TaskStatus::Running => "RUNNING",
            TaskStatus::Completed => "COMPLETED",
            TaskStatus::Failed => "FAILED",
            TaskStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// ワークフローのライフサイクル
///
/// 状態遷移:
/// - Draft -> Active -> Completed
/// - Draft -> Active -> Failed
/// - Paused は明示的にだけ入る。Draft と Paused は実行できる
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorkflowStatus {
    Draft,
    Active,
    Paused,
    Completed,
    Failed,
}

impl WorkflowStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, WorkflowStatus::Completed | WorkflowStatus::Failed)
    }

    pub fn is_executable(self) -> bool {
        matches!(self, WorkflowStatus::Draft | WorkflowStatus::Paused)
    }

    /// `self -> next` は正当な遷移か。Paused へは Draft か Active から明示的に入る
    pub fn can_transition_to(self, next: WorkflowStatus) -> bool {
        use WorkflowStatus::*;
        self == next
            || matches!(
                (self, next),
                (Draft, Active)
                    | (Paused, Active)
                    | (Draft, Paused)
                    | (Active, Paused)
                    | (Active, Completed)
                    | (Active, Failed)
            )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WorkflowStatus::Draft => "DRAFT",
            WorkflowStatus::Active => "ACTIVE",
            WorkflowStatus::Paused => "PAUSED",
            WorkflowStatus::Completed => "COMPLETED",
            WorkflowStatus::Failed => "FAILED",
        }
    }
}

impl fmt::Display for WorkflowStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::pending(TaskStatus::Pending, true, false)]
    #[case::running(TaskStatus::Running, false, false)]
    #[case::completed(TaskStatus::Completed, false, true)]
    #[case::failed(TaskStatus::Failed, false, true)]
    #[case::cancelled(TaskStatus::Cancelled, false, true)]
    fn task_status_classification(
        #[case] status: TaskStatus,
        #[case] executable: bool,
        #[case] terminal: bool,
    ) {
        assert_eq!(status.is_executable(), executable);
        assert_eq!(status.is_terminal(), terminal);
    }

    #[rstest]
    #[case::draft(WorkflowStatus::Draft, true, false)]
    #[case::active(WorkflowStatus::Active, false, false)]
    #[case::paused(WorkflowStatus::Paused, true, false)]
    #[case::completed(WorkflowStatus::Completed, false, true)]
    #[case::failed(WorkflowStatus::Failed, false, true)]
    fn workflow_status_classification(
        #[case] status: WorkflowStatus,
        #[case] executable: bool,
        #[case] terminal: bool,
    ) {
        assert_eq!(status.is_executable(), executable);
        assert_eq!(status.is_terminal(), terminal);
    }

    #[rstest]
    #[case::start(TaskStatus::Pending, TaskStatus::Running, true)]
    #[case::complete(TaskStatus::Running, TaskStatus::Completed, true)]
    #[case::fail(TaskStatus::Running, TaskStatus::Failed, true)]
    #[case::cancel_pending(TaskStatus::Pending, TaskStatus::Cancelled, true)]
    #[case::cancel_completed(TaskStatus::Completed, TaskStatus::Cancelled, true)]
    #[case::same(TaskStatus::Failed, TaskStatus::Failed, true)]
    #[case::skip_running(TaskStatus::Pending, TaskStatus::Completed, false)]
    #[case::restart(TaskStatus::Completed, TaskStatus::Running, false)]
    #[case::reopen(TaskStatus::Failed, TaskStatus::Pending, false)]
    fn task_transitions(#[case] from: TaskStatus, #[case] to: TaskStatus, #[case] legal: bool) {
        assert_eq!(from.can_transition_to(to), legal);
    }

    #[rstest]
    #[case::activate(WorkflowStatus::Draft, WorkflowStatus::Active, true)]
    #[case::resume(WorkflowStatus::Paused, WorkflowStatus::Active, true)]
    #[case::pause_draft(WorkflowStatus::Draft, WorkflowStatus::Paused, true)]
    #[case::pause_active(WorkflowStatus::Active, WorkflowStatus::Paused, true)]
    #[case::complete(WorkflowStatus::Active, WorkflowStatus::Completed, true)]
    #[case::skip_active(WorkflowStatus::Draft, WorkflowStatus::Completed, false)]
    #[case::reopen(WorkflowStatus::Completed, WorkflowStatus::Draft, false)]
    #[case::pause_failed(WorkflowStatus::Failed, WorkflowStatus::Paused, false)]
    fn workflow_transitions(
        #[case] from: WorkflowStatus,
        #[case] to: WorkflowStatus,
        #[case] legal: bool,
    ) {
        assert_eq!(from.can_transition_to(to), legal);
    }

    #[test]
    fn statuses_serialize_screaming_snake_case() {
        assert_eq!(
            serde_json::to_string(&TaskStatus::Running).unwrap(),
            "\"RUNNING\""
        );
        assert_eq!(
            serde_json::to_string(&WorkflowStatus::Paused).unwrap(),
            "\"PAUSED\""
        );
        assert_eq!(TaskStatus::Cancelled.to_string(), "CANCELLED");
    }
}
