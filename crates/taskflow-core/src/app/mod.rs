//! App - アプリケーション層
//!
//! このモジュールは、ports を組み合わせてユースケースを実装します。
//!
//! # 構成
//! - **TaskService** / **WorkflowService**: CRUD、実行、ステータス別の取得
//! - **EngineBuilder** / **Engine**: プロセス内の既定値でのワイヤリング
//! - **EngineConfig**: 環境変数による設定

pub mod builder;
pub mod config;
mod protocol;
pub mod task_service;
pub mod workflow_service;

pub use self::builder::{BuildError, Engine, EngineBuilder};
pub use self::config::{DEFAULT_EVENT_CHANNEL_CAPACITY, EngineConfig};
pub use self::task_service::{CreateTask, TaskService, UpdateTask};
pub use self::workflow_service::{CreateWorkflow, UpdateWorkflow, WorkflowService};
