//! Simulated executors - 開発用の executor 実装
//!
//! - `SimulatedTaskExecutor`: 実処理の代わりに一定時間 sleep し、
//!   呼び出し元のキャンセルトークンと競争させる
//! - `SequentialWorkflowExecutor`: 任意の `TaskExecutor` でワークフローの
//!   タスクを 1 つずつ実行する
//!
//! # 学習ポイント
//! - 実行中集合への登録は `InFlight` ガードが持つ。future が途中で drop
//!   されても（`tokio::time::timeout` など）Drop で必ず外れる
//! - ガードの区間に `.await` を挟まないので、ロックは `std::sync::Mutex`
//! - `cancel(id)` は集合から外すだけの助言的なもの。止めるのはトークン

use std::collections::HashSet;
use std::hash::Hash;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::domain::{
    EngineError, EntityKind, Task, TaskId, TaskStatus, Workflow, WorkflowId, WorkflowStatus,
};
use crate::ports::{TaskExecutor, TaskLifecycle, WorkflowExecutor};

pub const DEFAULT_TASK_DURATION: Duration = Duration::from_secs(2);

fn lock<K>(set: &Mutex<HashSet<K>>) -> MutexGuard<'_, HashSet<K>> {
    set.lock().unwrap_or_else(PoisonError::into_inner)
}

/// 実行中集合への登録。Drop で外れる
struct InFlight<'a, K: Eq + Hash> {
    set: &'a Mutex<HashSet<K>>,
    id: K,
}

impl<'a, K: Eq + Hash + Clone> InFlight<'a, K> {
    fn enter(set: &'a Mutex<HashSet<K>>, id: &K) -> Self {
        lock(set).insert(id.clone());
        Self { set, id: id.clone() }
    }
}

impl<K: Eq + Hash> Drop for InFlight<'_, K> {
    fn drop(&mut self) {
        lock(self.set).remove(&self.id);
    }
}

/// SimulatedTaskExecutor は固定時間の sleep で実処理を模す
pub struct SimulatedTaskExecutor {
    duration: Duration,
    in_flight: Mutex<HashSet<TaskId>>,
}

impl SimulatedTaskExecutor {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }
}

impl Default for SimulatedTaskExecutor {
    fn default() -> Self {
        Self::new(DEFAULT_TASK_DURATION)
    }
}

#[async_trait]
impl TaskExecutor for SimulatedTaskExecutor {
    async fn execute(&self, task: &Task, cancel: &CancellationToken) -> Result<(), EngineError> {
        let _in_flight = InFlight::enter(&self.in_flight, &task.id);
        tracing::debug!(task_id = %task.id, duration_ms = self.duration.as_millis() as u64, "task work started");

        tokio::select! {
            _ = tokio::time::sleep(self.duration) => Ok(()),
            _ = cancel.cancelled() => Err(EngineError::cancelled(EntityKind::Task, &task.id)),
        }
    }

    async fn cancel(&self, task_id: &TaskId) -> Result<(), EngineError> {
        if !lock(&self.in_flight).remove(task_id) {
            return Err(EngineError::not_running(EntityKind::Task, task_id));
        }
        Ok(())
    }

    async fn status(&self, task_id: &TaskId) -> TaskStatus {
        if lock(&self.in_flight).contains(task_id) {
            TaskStatus::Running
        } else {
            TaskStatus::Pending
        }
    }
}

/// SequentialWorkflowExecutor はメンバータスクを順に実行する
///
/// # 実装詳細
/// - Pending 以外のタスクと、2 回目以降に現れた同じタスクは debug ログを
///   残して飛ばす
/// - タスクの失敗は `TaskFailed` に包んで即座に返す
/// - タスクの合間にトークンを確認し、キャンセル済みなら `Cancelled`
pub struct SequentialWorkflowExecutor {
    task_executor: Arc<dyn TaskExecutor>,
    in_flight: Mutex<HashSet<WorkflowId>>,
}

impl SequentialWorkflowExecutor {
    pub fn new(task_executor: Arc<dyn TaskExecutor>) -> Self {
        Self {
            task_executor,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    async fn run_tasks(
        &self,
        workflow: &Workflow,
        tasks: Vec<Task>,
        cancel: &CancellationToken,
        lifecycle: &dyn TaskLifecycle,
    ) -> Result<(), EngineError> {
        // a task listed twice runs once per workflow execution
        let mut executed: HashSet<TaskId> = HashSet::new();

        for mut task in tasks {
            if !task.is_executable() || executed.contains(&task.id) {
                tracing::debug!(
                    workflow_id = %workflow.id,
                    task_id = %task.id,
                    status = %task.status,
                    "skipping non-executable task"
                );
                continue;
            }

            lifecycle.task_started(&mut task).await?;
            let outcome = self.task_executor.execute(&task, cancel).await;
            lifecycle.task_finished(&mut task, &outcome).await?;
            outcome.map_err(|err| EngineError::task_failed(&task.id, err))?;
            executed.insert(task.id);

            if cancel.is_cancelled() {
                return Err(EngineError::cancelled(EntityKind::Workflow, &workflow.id));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl WorkflowExecutor for SequentialWorkflowExecutor {
    async fn execute(
        &self,
        workflow: &Workflow,
        tasks: Vec<Task>,
        cancel: &CancellationToken,
        lifecycle: &dyn TaskLifecycle,
    ) -> Result<(), EngineError> {
        let _in_flight = InFlight::enter(&self.in_flight, &workflow.id);
        self.run_tasks(workflow, tasks, cancel, lifecycle).await
    }

    async fn cancel(&self, workflow_id: &WorkflowId) -> Result<(), EngineError> {
        if !lock(&self.in_flight).remove(workflow_id) {
            return Err(EngineError::not_running(EntityKind::Workflow, workflow_id));
        }
        Ok(())
    }

    async fn status(&self, workflow_id: &WorkflowId) -> WorkflowStatus {
        if lock(&self.in_flight).contains(workflow_id) {
            WorkflowStatus::Active
        } else {
            WorkflowStatus::Draft
        }
    }
}
