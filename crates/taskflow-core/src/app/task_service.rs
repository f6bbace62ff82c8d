//! TaskService - タスクのユースケース
//!
//! # 実行プロトコル
//! 1. タスクを読み込む（`NotFound`）
//! 2. Pending 以外は拒否（`InvalidState`）
//! 3. Pending -> Running を読み込んだステータスで CAS、publish
//! 4. executor を実行
//! 5. Running -> Completed / Failed を CAS、publish
//!
//! 手順 3 と 5 の永続化失敗は `Storage` エラーで終わる。
//! 実行中に Cancelled へ更新されていたら手順 5 は `InvalidState` を返し、
//! 保存済みの Cancelled はそのまま残る。publish の失敗はログだけ。

use std::sync::Arc;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::protocol;
use crate::domain::{
    EngineError, EntityKind, ExecutionFailure, Parameter, Task, TaskId, TaskStatus,
};
use crate::ports::{EventPublisher, IdGenerator, TaskExecutor, TaskStore};

/// [`TaskService::create_task`] の入力
#[derive(Debug, Clone, Default)]
pub struct CreateTask {
    pub name: String,
    pub description: String,
    pub parameters: Vec<Parameter>,
}

impl CreateTask {
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            parameters: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, parameter: Parameter) -> Self {
        self.parameters.push(parameter);
        self
    }
}

/// [`TaskService::update_task`] の入力。`None` のフィールドは変更しない
///
/// `parameters` が `Some` なら保存済みのリストを丸ごと置き換える（空リストも可）。
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub parameters: Option<Vec<Parameter>>,
}

/// TaskService はタスクの CRUD と実行をまとめる
///
/// # 使用例
/// ```ignore
/// let task = service.create_task(CreateTask::new("build", "")).await?;
/// let done = service.execute_task(&task.id, &CancellationToken::new()).await?;
/// assert_eq!(done.status, TaskStatus::Completed);
/// ```
pub struct TaskService {
    tasks: Arc<TaskStore>,
    executor: Arc<dyn TaskExecutor>,
    publisher: Arc<dyn EventPublisher>,
    ids: Arc<dyn IdGenerator>,
}

impl TaskService {
    pub fn new(
        tasks: Arc<TaskStore>,
        executor: Arc<dyn TaskExecutor>,
        publisher: Arc<dyn EventPublisher>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            tasks,
            executor,
            publisher,
            ids,
        }
    }

    pub async fn create_task(&self, input: CreateTask) -> Result<Task, EngineError> {
        let mut task = Task::new(self.ids.generate_task_id(), input.name, input.description);
        task.parameters = input.parameters;

        self.tasks.create(&task).await?;
        tracing::debug!(task_id = %task.id, name = %task.name, "task created");
        Ok(task)
    }

    pub async fn get_task(&self, id: &TaskId) -> Result<Task, EngineError> {
        self.tasks.get_by_id(id).await
    }

    pub async fn get_all_tasks(&self) -> Result<Vec<Task>, EngineError> {
        self.tasks.get_all().await
    }

    pub async fn get_tasks_by_status(&self, status: TaskStatus) -> Result<Vec<Task>, EngineError> {
        self.tasks.get_by_status(status).await
    }

    /// 保存済みのタスクに `input` を適用する
    ///
    /// ステータス変更は正当な遷移に限る（それ以外は `InvalidState`）。変わったら
    /// publish する。読み込み後にステータスが動いていたら `InvalidState`。
    pub async fn update_task(&self, id: &TaskId, input: UpdateTask) -> Result<Task, EngineError> {
        let mut task = self.tasks.get_by_id(id).await?;
        let loaded = task.status;

        if let Some(status) = input.status {
            if !loaded.can_transition_to(status) {
                return Err(EngineError::invalid_state(EntityKind::Task, id, loaded));
            }
        }

        if let Some(name) = input.name {
            task.name = name;
        }
        if let Some(description) = input.description {
            task.description = description;
        }
        task.updated_at = Utc::now();
        if let Some(parameters) = input.parameters {
            task.replace_parameters(parameters);
        }
        if let Some(status) = input.status {
            task.update_status(status);
        }

        self.tasks.update_if_status(&task, loaded).await?;
        if task.status != loaded {
            protocol::publish(&*self.publisher, &task).await;
        }
        Ok(task)
    }

    pub async fn delete_task(&self, id: &TaskId) -> Result<(), EngineError> {
        self.tasks.delete(id).await?;
        tracing::debug!(task_id = %id, "task deleted");
        Ok(())
    }

    /// 呼び出し元のタスク上で最後まで実行する
    ///
    /// executor が失敗するとタスクは Failed で終わり、executor のエラーと一緒に
    /// エラー側で返る。実行中に別の呼び出しがステータスを動かしていたら
    /// `InvalidState`（エンティティなし）で、保存済みの状態は上書きしない。
    pub async fn execute_task(
        &self,
        id: &TaskId,
        cancel: &CancellationToken,
    ) -> Result<Task, ExecutionFailure<Task>> {
        let mut task = self.tasks.get_by_id(id).await?;
        if !task.is_executable() {
            return Err(EngineError::invalid_state(EntityKind::Task, id, task.status).into());
        }

        protocol::begin(&*self.tasks, &*self.publisher, &mut task, TaskStatus::Running).await?;
        tracing::info!(task_id = %id, name = %task.name, "task execution started");

        match self.executor.execute(&task, cancel).await {
            Ok(()) => {
                protocol::finish(
                    &*self.tasks,
                    &*self.publisher,
                    &mut task,
                    TaskStatus::Completed,
                    None,
                )
                .await?;
                tracing::info!(task_id = %id, "task execution completed");
                Ok(task)
            }
            Err(err) => {
                tracing::warn!(task_id = %id, error = %err, "task execution failed");
                protocol::finish(
                    &*self.tasks,
                    &*self.publisher,
                    &mut task,
                    TaskStatus::Failed,
                    Some(&err),
                )
                .await?;
                Err(ExecutionFailure::new(Some(task), err))
            }
        }
    }

    /// 助言的なキャンセル。executor の実行中集合から外すだけで、
    /// 保存済みのステータスには触れない
    pub async fn cancel_task(&self, id: &TaskId) -> Result<(), EngineError> {
        self.executor.cancel(id).await
    }

    /// executor から見た `id` の状態。正はストアの方
    pub async fn execution_status(&self, id: &TaskId) -> TaskStatus {
        self.executor.status(id).await
    }
}
