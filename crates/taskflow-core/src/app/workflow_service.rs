//! WorkflowService - ワークフローのユースケース
//!
//! ワークフローの実行は 2 層のステータスを動かす。
//! - ワークフロー自身: Draft/Paused -> Active -> Completed|Failed
//! - 各メンバータスク: Pending -> Running -> Completed|Failed
//!
//! executor はタスクの各段階を [`TaskLifecycle`] で知らせ、このサービスが
//! 永続化して publish する。
//!
//! # 学習ポイント
//! - メンバーの追加と削除は Draft/Paused のときだけ。Active 中の変更は
//!   実行中の executor から見えないので `InvalidState` で拒否する
//! - 同じワークフローの同時実行は開始の CAS で 1 つだけが勝つ

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::protocol;
use crate::domain::{
    EngineError, EntityKind, ExecutionFailure, Task, TaskId, TaskStatus, Workflow, WorkflowId,
    WorkflowStatus,
};
use crate::ports::{
    EventPublisher, IdGenerator, TaskLifecycle, TaskStore, WorkflowExecutor, WorkflowStore,
};

/// [`WorkflowService::create_workflow`] の入力
#[derive(Debug, Clone, Default)]
pub struct CreateWorkflow {
    pub name: String,
    pub description: String,
    pub task_ids: Vec<TaskId>,
}

impl CreateWorkflow {
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        task_ids: Vec<TaskId>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            task_ids,
        }
    }
}

/// [`WorkflowService::update_workflow`] の入力。`None` のフィールドは変更しない
#[derive(Debug, Clone, Default)]
pub struct UpdateWorkflow {
    pub name: Option<String>,
    pub description: Option<String>,
    pub status: Option<WorkflowStatus>,
}

/// WorkflowService はワークフローの CRUD、メンバー編集、実行をまとめる
pub struct WorkflowService {
    workflows: Arc<WorkflowStore>,
    tasks: Arc<TaskStore>,
    executor: Arc<dyn WorkflowExecutor>,
    publisher: Arc<dyn EventPublisher>,
    ids: Arc<dyn IdGenerator>,
}

impl WorkflowService {
    pub fn new(
        workflows: Arc<WorkflowStore>,
        tasks: Arc<TaskStore>,
        executor: Arc<dyn WorkflowExecutor>,
        publisher: Arc<dyn EventPublisher>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            workflows,
            tasks,
            executor,
            publisher,
            ids,
        }
    }

    /// Draft のワークフローを作る
    ///
    /// タスク ID はすべて存在していること。最初に見つからなかった ID で
    /// 作成全体が `NotFound` になる。
    pub async fn create_workflow(&self, input: CreateWorkflow) -> Result<Workflow, EngineError> {
        for task_id in &input.task_ids {
            self.tasks.get_by_id(task_id).await?;
        }

        let workflow = Workflow::new(
            self.ids.generate_workflow_id(),
            input.name,
            input.description,
            input.task_ids,
        );
        self.workflows.create(&workflow).await?;
        tracing::debug!(
            workflow_id = %workflow.id,
            tasks = workflow.task_ids.len(),
            "workflow created"
        );
        Ok(workflow)
    }

    pub async fn get_workflow(&self, id: &WorkflowId) -> Result<Workflow, EngineError> {
        self.workflows.get_by_id(id).await
    }

    pub async fn get_all_workflows(&self) -> Result<Vec<Workflow>, EngineError> {
        self.workflows.get_all().await
    }

    pub async fn get_workflows_by_status(
        &self,
        status: WorkflowStatus,
    ) -> Result<Vec<Workflow>, EngineError> {
        self.workflows.get_by_status(status).await
    }

    /// `task_ids` の順にメンバータスクを返す（重複も含む）
    pub async fn get_workflow_tasks(&self, id: &WorkflowId) -> Result<Vec<Task>, EngineError> {
        let workflow = self.workflows.get_by_id(id).await?;
        self.resolve_tasks(&workflow).await
    }

    /// `task_id` を末尾に追加する
    ///
    /// タスクは存在していること。Draft/Paused 以外のワークフローは
    /// `InvalidState`。
    pub async fn add_task(
        &self,
        workflow_id: &WorkflowId,
        task_id: &TaskId,
    ) -> Result<Workflow, EngineError> {
        self.tasks.get_by_id(task_id).await?;

        let mut workflow = self.editable(workflow_id).await?;
        let loaded = workflow.status;
        workflow.add_task(task_id.clone());
        self.workflows.update_if_status(&workflow, loaded).await?;
        Ok(workflow)
    }

    /// 最初に現れる `task_id` を取り除く
    ///
    /// 含まれていなければ何も書き込まない。Draft/Paused 以外のワークフローは
    /// `InvalidState`。
    pub async fn remove_task(
        &self,
        workflow_id: &WorkflowId,
        task_id: &TaskId,
    ) -> Result<Workflow, EngineError> {
        let mut workflow = self.editable(workflow_id).await?;
        let loaded = workflow.status;
        if workflow.remove_task(task_id) {
            self.workflows.update_if_status(&workflow, loaded).await?;
        }
        Ok(workflow)
    }

    /// 保存済みのワークフローに `input` を適用する
    ///
    /// ステータス変更は正当な遷移に限り、変わったら publish する。
    pub async fn update_workflow(
        &self,
        id: &WorkflowId,
        input: UpdateWorkflow,
    ) -> Result<Workflow, EngineError> {
        let mut workflow = self.workflows.get_by_id(id).await?;
        let loaded = workflow.status;

        if let Some(status) = input.status {
            if !loaded.can_transition_to(status) {
                return Err(EngineError::invalid_state(EntityKind::Workflow, id, loaded));
            }
        }

        if let Some(name) = input.name {
            workflow.name = name;
        }
        if let Some(description) = input.description {
            workflow.description = description;
        }
        workflow.updated_at = Utc::now();
        if let Some(status) = input.status {
            workflow.update_status(status);
        }

        self.workflows.update_if_status(&workflow, loaded).await?;
        if workflow.status != loaded {
            protocol::publish(&*self.publisher, &workflow).await;
        }
        Ok(workflow)
    }

    /// メンバータスクは残る
    pub async fn delete_workflow(&self, id: &WorkflowId) -> Result<(), EngineError> {
        self.workflows.delete(id).await?;
        tracing::debug!(workflow_id = %id, "workflow deleted");
        Ok(())
    }

    /// メンバータスクを順に、呼び出し元のタスク上で実行する
    ///
    /// 実行するものがなければ遷移の前に `EmptyWorkflow`。タスクが失敗すると
    /// そのタスクとワークフローが Failed になり、エラーはワークフローを名指しして
    /// タスクの失敗を包む。
    pub async fn execute_workflow(
        &self,
        id: &WorkflowId,
        cancel: &CancellationToken,
    ) -> Result<Workflow, ExecutionFailure<Workflow>> {
        let mut workflow = self.workflows.get_by_id(id).await?;
        if !workflow.is_executable() {
            return Err(
                EngineError::invalid_state(EntityKind::Workflow, id, workflow.status).into(),
            );
        }
        if !workflow.has_tasks() {
            return Err(EngineError::EmptyWorkflow { id: id.to_string() }.into());
        }
        let tasks = self.resolve_tasks(&workflow).await?;

        protocol::begin(
            &*self.workflows,
            &*self.publisher,
            &mut workflow,
            WorkflowStatus::Active,
        )
        .await?;
        tracing::info!(workflow_id = %id, tasks = tasks.len(), "workflow execution started");

        let steps = PersistingLifecycle {
            tasks: &*self.tasks,
            publisher: &*self.publisher,
        };
        match self.executor.execute(&workflow, tasks, cancel, &steps).await {
            Ok(()) => {
                protocol::finish(
                    &*self.workflows,
                    &*self.publisher,
                    &mut workflow,
                    WorkflowStatus::Completed,
                    None,
                )
                .await?;
                tracing::info!(workflow_id = %id, "workflow execution completed");
                Ok(workflow)
            }
            Err(err) => {
                tracing::warn!(workflow_id = %id, error = %err, "workflow execution failed");
                protocol::finish(
                    &*self.workflows,
                    &*self.publisher,
                    &mut workflow,
                    WorkflowStatus::Failed,
                    Some(&err),
                )
                .await?;
                let error = EngineError::workflow_failed(id, err);
                Err(ExecutionFailure::new(Some(workflow), error))
            }
        }
    }

    /// executor の実行中集合に対する助言的なキャンセル
    pub async fn cancel_workflow(&self, id: &WorkflowId) -> Result<(), EngineError> {
        self.executor.cancel(id).await
    }

    pub async fn execution_status(&self, id: &WorkflowId) -> WorkflowStatus {
        self.executor.status(id).await
    }

    async fn editable(&self, id: &WorkflowId) -> Result<Workflow, EngineError> {
        let workflow = self.workflows.get_by_id(id).await?;
        if !workflow.is_executable() {
            return Err(EngineError::invalid_state(EntityKind::Workflow, id, workflow.status));
        }
        Ok(workflow)
    }

    async fn resolve_tasks(&self, workflow: &Workflow) -> Result<Vec<Task>, EngineError> {
        let mut tasks = Vec::with_capacity(workflow.task_ids.len());
        for task_id in &workflow.task_ids {
            tasks.push(self.tasks.get_by_id(task_id).await?);
        }
        Ok(tasks)
    }
}

/// メンバータスクの遷移を永続化して publish する
struct PersistingLifecycle<'a> {
    tasks: &'a TaskStore,
    publisher: &'a dyn EventPublisher,
}

#[async_trait]
impl TaskLifecycle for PersistingLifecycle<'_> {
    async fn task_started(&self, task: &mut Task) -> Result<(), EngineError> {
        protocol::begin(self.tasks, self.publisher, task, TaskStatus::Running).await
    }

    async fn task_finished(
        &self,
        task: &mut Task,
        outcome: &Result<(), EngineError>,
    ) -> Result<(), EngineError> {
        let status = match outcome {
            Ok(()) => TaskStatus::Completed,
            Err(_) => TaskStatus::Failed,
        };
        protocol::finish(self.tasks, self.publisher, task, status, outcome.as_ref().err()).await
    }
}
