//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! サービスはこれらの trait だけに依存し、プロセス内の実装
//! （インメモリストア、模擬 executor、publisher）は `impls` にあります。

pub mod clock;
pub mod event_sink;
pub mod executor;
pub mod id_generator;
pub mod store;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventPublisher;
pub use self::executor::{NoopLifecycle, TaskExecutor, TaskLifecycle, WorkflowExecutor};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::store::{Entity, Store, TaskStore, WorkflowStore};
