//! EventPublisher 実装
//!
//! - **TracingEventPublisher**: イベントを `tracing` のログに書く
//! - **BroadcastEventPublisher**: プロセス内の購読者へ配る
//! - **NoopEventPublisher**: 何もしない
//! - **FanOutEventPublisher**: 複数の publisher へ転送する

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::broadcast;

use crate::domain::{BoxError, DomainEvent};
use crate::ports::EventPublisher;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), BoxError> {
        let payload = serde_json::to_string(event)?;
        match event {
            DomainEvent::TaskStatusChanged { task, .. } => {
                tracing::info!(task_id = %task.id, status = %task.status, %payload, "task status changed");
            }
            DomainEvent::WorkflowStatusChanged { workflow, .. } => {
                tracing::info!(workflow_id = %workflow.id, status = %workflow.status, %payload, "workflow status changed");
            }
        }
        Ok(())
    }
}

/// `tokio::sync::broadcast` チャネルへ publish する
///
/// 購読者がいなくてもエラーではない。遅い購読者は古いイベントから取りこぼし、
/// エンジン側は待たない。
#[derive(Debug, Clone)]
pub struct BroadcastEventPublisher {
    sender: broadcast::Sender<DomainEvent>,
}

impl BroadcastEventPublisher {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.sender.subscribe()
    }
}

#[async_trait]
impl EventPublisher for BroadcastEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), BoxError> {
        if self.sender.receiver_count() == 0 {
            return Ok(());
        }
        self.sender.send(event.clone())?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEventPublisher;

#[async_trait]
impl EventPublisher for NoopEventPublisher {
    async fn publish(&self, _event: &DomainEvent) -> Result<(), BoxError> {
        Ok(())
    }
}

/// 内側の publisher へ順にイベントを転送する
///
/// 途中で失敗しても残りの publisher には届く。返すのは最初の失敗。
#[derive(Clone, Default)]
pub struct FanOutEventPublisher {
    publishers: Vec<Arc<dyn EventPublisher>>,
}

impl FanOutEventPublisher {
    pub fn new(publishers: Vec<Arc<dyn EventPublisher>>) -> Self {
        Self { publishers }
    }

    pub fn push(&mut self, publisher: Arc<dyn EventPublisher>) {
        self.publishers.push(publisher);
    }

    pub fn len(&self) -> usize {
        self.publishers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.publishers.is_empty()
    }
}

#[async_trait]
impl EventPublisher for FanOutEventPublisher {
    async fn publish(&self, event: &DomainEvent) -> Result<(), BoxError> {
        let mut first_error = None;
        for publisher in &self.publishers {
            if let Err(err) = publisher.publish(event).await {
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Task, TaskId, TaskStatus};

    #[tokio::test]
    async fn broadcast_without_subscribers_is_ok() {
        let publisher = BroadcastEventPublisher::new(4);
        let task = Task::new(TaskId::new("t1"), "T1", "");
        publisher
            .publish(&DomainEvent::task_status_changed(&task))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn broadcast_delivers_to_every_subscriber() {
        let publisher = BroadcastEventPublisher::new(4);
        let mut first = publisher.subscribe();
        let mut second = publisher.subscribe();

        let mut task = Task::new(TaskId::new("t1"), "T1", "");
        task.update_status(TaskStatus::Running);
        publisher
            .publish(&DomainEvent::task_status_changed(&task))
            .await
            .unwrap();

        for rx in [&mut first, &mut second] {
            let event = rx.recv().await.unwrap();
            assert_eq!(event.task_status(), Some((&task.id, TaskStatus::Running)));
        }
    }

    #[tokio::test]
    async fn tracing_publisher_accepts_events() {
        let task = Task::new(TaskId::new("t1"), "T1", "");
        TracingEventPublisher
            .publish(&DomainEvent::task_status_changed(&task))
            .await
            .unwrap();
    }

    struct Failing;

    #[async_trait]
    impl EventPublisher for Failing {
        async fn publish(&self, _event: &DomainEvent) -> Result<(), BoxError> {
            Err("down".into())
        }
    }

    #[tokio::test]
    async fn fan_out_reaches_later_publishers_after_a_failure() {
        let broadcast = BroadcastEventPublisher::new(4);
        let mut rx = broadcast.subscribe();
        let publishers: Vec<Arc<dyn EventPublisher>> = vec![Arc::new(Failing), Arc::new(broadcast)];
        let fan_out = FanOutEventPublisher::new(publishers);
        let task = Task::new(TaskId::new("t1"), "T1", "");

        let err = fan_out
            .publish(&DomainEvent::task_status_changed(&task))
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "down");
        assert!(rx.recv().await.is_ok());
    }
}
