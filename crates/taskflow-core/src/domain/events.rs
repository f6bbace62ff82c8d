//! Events - ドメインイベント
//!
//! ステータス変更ごとに 1 つ作り、`EventPublisher` へ渡す。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TaskId, WorkflowId};
use super::state::{TaskStatus, WorkflowStatus};
use super::task::Task;
use super::workflow::Workflow;

/// DomainEvent は遷移直後のエンティティのスナップショットを運ぶ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    TaskStatusChanged {
        task: Task,
        occurred_at: DateTime<Utc>,
    },
    WorkflowStatusChanged {
        workflow: Workflow,
        occurred_at: DateTime<Utc>,
    },
}

impl DomainEvent {
    pub fn task_status_changed(task: &Task) -> Self {
        Self::TaskStatusChanged {
            task: task.clone(),
            occurred_at: Utc::now(),
        }
    }

    pub fn workflow_status_changed(workflow: &Workflow) -> Self {
        Self::WorkflowStatusChanged {
            workflow: workflow.clone(),
            occurred_at: Utc::now(),
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::TaskStatusChanged { occurred_at, .. }
            | Self::WorkflowStatusChanged { occurred_at, .. } => *occurred_at,
        }
    }

    /// タスクのイベントなら `(task id, status)`
    pub fn task_status(&self) -> Option<(&TaskId, TaskStatus)> {
        match self {
            Self::TaskStatusChanged { task, .. } => Some((&task.id, task.status)),
            Self::WorkflowStatusChanged { .. } => None,
        }
    }

    /// ワークフローのイベントなら `(workflow id, status)`
    pub fn workflow_status(&self) -> Option<(&WorkflowId, WorkflowStatus)> {
        match self {
            Self::WorkflowStatusChanged { workflow, .. } => Some((&workflow.id, workflow.status)),
            Self::TaskStatusChanged { .. } => None,
        }
    }
}
