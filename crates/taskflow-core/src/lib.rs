//! taskflow-core
//!
//! Small in-process engine for tasks and workflows.
//!
//! タスクとワークフローをライフサイクル付きのレコードとして扱い、
//! 並行に安全なストア、差し替え可能な executor、ステータス変更イベントを提供します。
//!
//! # モジュール
//! - **domain**: ID、ステータス、`Task`、`Workflow`、イベント、エラー
//! - **ports**: 境界の trait（`Store`、`TaskExecutor`、`WorkflowExecutor`、
//!   `EventPublisher`、`IdGenerator`、`Clock`）
//! - **impls**: インメモリストア、模擬 executor、publisher
//! - **app**: `TaskService`、`WorkflowService`、`EngineBuilder`、`EngineConfig`

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;

pub use tokio_util::sync::CancellationToken;
