//! EventPublisher port - ステータス変更の通知
//!
//! publish は副経路です。サービスは失敗をログに残して処理を続けるので、
//! 実装のエラーがユースケースの結果を変えることはありません。

use async_trait::async_trait;

use crate::domain::{BoxError, DomainEvent};

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &DomainEvent) -> Result<(), BoxError>;
}
