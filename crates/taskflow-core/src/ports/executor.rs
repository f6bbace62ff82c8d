//! Executor ports - タスクとワークフローの実処理
//!
//! executor はストアを読み書きしません。正のステータスはストアにあり、
//! 変えるのはサービスです。executor が持つ実行中の記録は
//! `status` / `cancel` に答えるためだけのものです。
//!
//! # 学習ポイント
//! - キャンセルは `CancellationToken` で協調的に伝える
//! - ワークフロー内のタスクの遷移は [`TaskLifecycle`] のコールバックで
//!   サービスへ返す（executor はストアを知らない）

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{EngineError, Task, TaskId, TaskStatus, Workflow, WorkflowId, WorkflowStatus};

#[async_trait]
pub trait TaskExecutor: Send + Sync {
    /// タスクの実処理を行い、終わるまで呼び出し元を待たせる
    ///
    /// 先に `cancel` が発火したら `Cancelled`。
    async fn execute(&self, task: &Task, cancel: &CancellationToken) -> Result<(), EngineError>;

    /// `task_id` を実行中集合から外す。なければ `NotRunning`
    ///
    /// 助言的なもので、進行中の処理は止まらない。
    async fn cancel(&self, task_id: &TaskId) -> Result<(), EngineError>;

    /// 実行中なら `Running`、それ以外は `Pending`。正ではない
    async fn status(&self, task_id: &TaskId) -> TaskStatus;
}

/// workflow executor が各タスクの前後で呼ぶコールバック
///
/// ワークフローサービスが実装し、タスクごとの遷移を永続化して publish する。
/// コールバックがエラーを返すとワークフローは中断する。
#[async_trait]
pub trait TaskLifecycle: Send + Sync {
    /// task executor が `task` を実行する直前
    async fn task_started(&self, task: &mut Task) -> Result<(), EngineError>;

    /// task executor が `task` の `outcome` を返した直後
    async fn task_finished(
        &self,
        task: &mut Task,
        outcome: &Result<(), EngineError>,
    ) -> Result<(), EngineError>;
}

/// 何も記録しない Lifecycle
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopLifecycle;

#[async_trait]
impl TaskLifecycle for NoopLifecycle {
    async fn task_started(&self, _task: &mut Task) -> Result<(), EngineError> {
        Ok(())
    }

    async fn task_finished(
        &self,
        _task: &mut Task,
        _outcome: &Result<(), EngineError>,
    ) -> Result<(), EngineError> {
        Ok(())
    }
}

#[async_trait]
pub trait WorkflowExecutor: Send + Sync {
    /// `tasks` を渡された順に 1 つずつ実行する
    ///
    /// 実行できないタスクは飛ばす。最初のタスク失敗で中断し `TaskFailed` を返す。
    /// キャンセルはタスクの合間に確認する。
    async fn execute(
        &self,
        workflow: &Workflow,
        tasks: Vec<Task>,
        cancel: &CancellationToken,
        lifecycle: &dyn TaskLifecycle,
    ) -> Result<(), EngineError>;

    async fn cancel(&self, workflow_id: &WorkflowId) -> Result<(), EngineError>;

    /// 実行中なら `Active`、それ以外は `Draft`。正ではない
    async fn status(&self, workflow_id: &WorkflowId) -> WorkflowStatus;
}
