//! Impls - 実装（開発用・テスト用）
//!
//! このモジュールには ports のプロセス内実装を含めます。
//!
//! # 含まれるもの
//! - **InMemoryStore**: タスクとワークフローのストア
//! - **SimulatedTaskExecutor** / **SequentialWorkflowExecutor**
//! - **TracingEventPublisher**, **BroadcastEventPublisher**, **FanOutEventPublisher**,
//!   **NoopEventPublisher**
//!
//! 永続ストアや実際の executor は `ports` の同じ trait を実装して差し込む。

pub mod inmem_store;
pub mod publishers;
pub mod simulated_executor;

pub use self::inmem_store::{InMemoryStore, InMemoryTaskStore, InMemoryWorkflowStore};
pub use self::publishers::{
    BroadcastEventPublisher, FanOutEventPublisher, NoopEventPublisher, TracingEventPublisher,
};
pub use self::simulated_executor::{
    DEFAULT_TASK_DURATION, SequentialWorkflowExecutor, SimulatedTaskExecutor,
};
