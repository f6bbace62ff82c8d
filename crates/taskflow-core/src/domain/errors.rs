//! Errors - エラー型と分類
//!
//! # 学習ポイント
//! - `thiserror` で enum の各 variant にメッセージを付ける
//! - 呼び出し側が分岐するのは平らな `ErrorKind`。包む variant は中身の kind を返す
//! - 失敗した実行は `ExecutionFailure` でエンティティとエラーを一緒に返す

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// エラーが指すエンティティの種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Task,
    Workflow,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Task => f.write_str("task"),
            EntityKind::Workflow => f.write_str("workflow"),
        }
    }
}

/// ErrorKind は呼び出し側が分岐に使う分類
///
/// [`EngineError`] の包む variant は中身の kind を返す。ワークフロー内のタスクが
/// キャンセルで失敗したなら、外から見ても `Cancelled`。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    AlreadyExists,
    InvalidState,
    EmptyWorkflow,
    NotRunning,
    Cancelled,
    Storage,
}

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("{entity} {id} not found")]
    NotFound { entity: EntityKind, id: String },

    #[error("{entity} {id} already exists")]
    AlreadyExists { entity: EntityKind, id: String },

    #[error("{entity} {id} is not executable (current status: {status})")]
    InvalidState {
        entity: EntityKind,
        id: String,
        status: String,
    },

    #[error("workflow {id} has no tasks to execute")]
    EmptyWorkflow { id: String },

    #[error("{entity} {id} is not running")]
    NotRunning { entity: EntityKind, id: String },

    #[error("{entity} {id} execution cancelled")]
    Cancelled { entity: EntityKind, id: String },

    #[error("failed to {context} for {entity} {id}: {source}")]
    Storage {
        entity: EntityKind,
        id: String,
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("task {task_id} failed: {source}")]
    TaskFailed {
        task_id: String,
        #[source]
        source: Box<EngineError>,
    },

    #[error("workflow {workflow_id} failed: {source}")]
    WorkflowFailed {
        workflow_id: String,
        #[source]
        source: Box<EngineError>,
    },
}

impl EngineError {
    pub fn not_found(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn already_exists(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::AlreadyExists {
            entity,
            id: id.to_string(),
        }
    }

    pub fn invalid_state(
        entity: EntityKind,
        id: impl fmt::Display,
        status: impl fmt::Display,
    ) -> Self {
        Self::InvalidState {
            entity,
            id: id.to_string(),
            status: status.to_string(),
        }
    }

    pub fn not_running(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotRunning {
            entity,
            id: id.to_string(),
        }
    }

    pub fn cancelled(entity: EntityKind, id: impl fmt::Display) -> Self {
        Self::Cancelled {
            entity,
            id: id.to_string(),
        }
    }

    /// 遷移の途中で起きたストアの失敗を包む
    pub fn storage(
        entity: EntityKind,
        id: impl fmt::Display,
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Storage {
            entity,
            id: id.to_string(),
            context: context.into(),
            source: source.into(),
        }
    }

    pub fn task_failed(task_id: impl fmt::Display, source: EngineError) -> Self {
        Self::TaskFailed {
            task_id: task_id.to_string(),
            source: Box::new(source),
        }
    }

    pub fn workflow_failed(workflow_id: impl fmt::Display, source: EngineError) -> Self {
        Self::WorkflowFailed {
            workflow_id: workflow_id.to_string(),
            source: Box::new(source),
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::AlreadyExists { .. } => ErrorKind::AlreadyExists,
            Self::InvalidState { .. } => ErrorKind::InvalidState,
            Self::EmptyWorkflow { .. } => ErrorKind::EmptyWorkflow,
            Self::NotRunning { .. } => ErrorKind::NotRunning,
            Self::Cancelled { .. } => ErrorKind::Cancelled,
            Self::Storage { .. } => ErrorKind::Storage,
            Self::TaskFailed { source, .. } | Self::WorkflowFailed { source, .. } => source.kind(),
        }
    }

    /// エラーが指すエンティティの ID（包む variant では一番外側）
    pub fn entity_id(&self) -> &str {
        match self {
            Self::NotFound { id, .. }
            | Self::AlreadyExists { id, .. }
            | Self::InvalidState { id, .. }
            | Self::EmptyWorkflow { id }
            | Self::NotRunning { id, .. }
            | Self::Cancelled { id, .. }
            | Self::Storage { id, .. } => id,
            Self::TaskFailed { task_id, .. } => task_id,
            Self::WorkflowFailed { workflow_id, .. } => workflow_id,
        }
    }
}

/// 失敗した実行ユースケース
///
/// executor が走って失敗したなら `entity` は Failed 状態のエンティティ。
/// 実行前に止まったとき（ID なし、ステータス違い、CAS の負け、ストア障害）は `None`。
#[derive(Debug, Error)]
#[error("{error}")]
pub struct ExecutionFailure<T: fmt::Debug> {
    pub entity: Option<T>,
    #[source]
    pub error: EngineError,
}

impl<T: fmt::Debug> ExecutionFailure<T> {
    pub fn new(entity: Option<T>, error: EngineError) -> Self {
        Self { entity, error }
    }

    pub fn kind(&self) -> ErrorKind {
        self.error.kind()
    }

    pub fn into_parts(self) -> (Option<T>, EngineError) {
        (self.entity, self.error)
    }
}

impl<T: fmt::Debug> From<EngineError> for ExecutionFailure<T> {
    fn from(error: EngineError) -> Self {
        Self::new(None, error)
    }
}
