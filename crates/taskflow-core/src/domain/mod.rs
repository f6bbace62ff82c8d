//! Domain model: ids, statuses, tasks, workflows, events and errors.

pub mod errors;
pub mod events;
pub mod ids;
pub mod state;
pub mod task;
pub mod workflow;

pub use self::errors::{BoxError, EngineError, EntityKind, ErrorKind, ExecutionFailure};
pub use self::events::DomainEvent;
pub use self::ids::{Id, IdMarker, TaskId, WorkflowId};
pub use self::state::{TaskStatus, WorkflowStatus};
pub use self::task::{Parameter, ParameterType, Task};
pub use self::workflow::Workflow;
