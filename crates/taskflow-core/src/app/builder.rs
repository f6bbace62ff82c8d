//! EngineBuilder - エンジンの構築とワイヤリング
//!
//! 既定値はすべてプロセス内で完結する（インメモリストア、模擬 task executor、
//! 逐次 workflow executor、ULID）。どれも `build()` の前に差し替えられる。
//!
//! # 学習ポイント
//! - Builder パターン（`with_*` は `self` を消費して返す）
//! - 差し替えなかった部品は `Option::unwrap_or_else` で既定値を埋める
//! - 設定の検証は `build()` で一度だけ行い、`BuildError` で即座に失敗させる
//! - publisher は `FanOutEventPublisher` に束ね、サービスからは 1 つに見せる

use std::sync::Arc;

use tokio::sync::broadcast;

use super::config::EngineConfig;
use super::task_service::TaskService;
use super::workflow_service::WorkflowService;
use crate::domain::DomainEvent;
use crate::impls::{
    BroadcastEventPublisher, FanOutEventPublisher, InMemoryTaskStore, InMemoryWorkflowStore,
    SequentialWorkflowExecutor, SimulatedTaskExecutor, TracingEventPublisher,
};
use crate::ports::{
    EventPublisher, IdGenerator, SystemClock, TaskExecutor, TaskStore, UlidGenerator,
    WorkflowStore,
};

/// EngineBuilder はストア、executor、publisher を組み立てる
///
/// # 使用例
/// ```ignore
/// let engine = EngineBuilder::new(EngineConfig::from_env())
///     .with_publisher(Arc::new(MyPublisher))
///     .build()?;
/// let task = engine.tasks().create_task(CreateTask::new("build", "")).await?;
/// ```
pub struct EngineBuilder {
    config: EngineConfig,
    task_store: Option<Arc<TaskStore>>,
    workflow_store: Option<Arc<WorkflowStore>>,
    task_executor: Option<Arc<dyn TaskExecutor>>,
    ids: Option<Arc<dyn IdGenerator>>,
    publishers: Vec<Arc<dyn EventPublisher>>,
    log_events: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("event channel capacity must be at least 1")]
    ZeroEventChannelCapacity,
}

impl EngineBuilder {
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            task_store: None,
            workflow_store: None,
            task_executor: None,
            ids: None,
            publishers: Vec::new(),
            log_events: true,
        }
    }

    pub fn with_task_store(mut self, store: Arc<TaskStore>) -> Self {
        self.task_store = Some(store);
        self
    }

    pub fn with_workflow_store(mut self, store: Arc<WorkflowStore>) -> Self {
        self.workflow_store = Some(store);
        self
    }

    /// 模擬 executor を差し替える。ワークフローのタスクも同じ executor で動く
    pub fn with_task_executor(mut self, executor: Arc<dyn TaskExecutor>) -> Self {
        self.task_executor = Some(executor);
        self
    }

    pub fn with_id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = Some(ids);
        self
    }

    /// 組み込みの broadcast チャネルに並べて publisher を追加する
    pub fn with_publisher(mut self, publisher: Arc<dyn EventPublisher>) -> Self {
        self.publishers.push(publisher);
        self
    }

    /// ステータス変更の `tracing` ログの有無（既定は有効）
    pub fn log_events(mut self, enabled: bool) -> Self {
        self.log_events = enabled;
        self
    }

    pub fn build(self) -> Result<Engine, BuildError> {
        if self.config.event_channel_capacity == 0 {
            return Err(BuildError::ZeroEventChannelCapacity);
        }

        let events = BroadcastEventPublisher::new(self.config.event_channel_capacity);
        let mut fan_out = FanOutEventPublisher::default();
        fan_out.push(Arc::new(events.clone()));
        if self.log_events {
            fan_out.push(Arc::new(TracingEventPublisher));
        }
        for publisher in self.publishers {
            fan_out.push(publisher);
        }
        let publisher: Arc<dyn EventPublisher> = Arc::new(fan_out);

        let task_store = self
            .task_store
            .unwrap_or_else(|| Arc::new(InMemoryTaskStore::new()));
        let workflow_store = self
            .workflow_store
            .unwrap_or_else(|| Arc::new(InMemoryWorkflowStore::new()));
        let task_executor = self.task_executor.unwrap_or_else(|| {
            Arc::new(SimulatedTaskExecutor::new(self.config.task_duration))
        });
        let ids = self
            .ids
            .unwrap_or_else(|| Arc::new(UlidGenerator::new(SystemClock)));

        tracing::debug!(
            task_duration_ms = self.config.task_duration.as_millis() as u64,
            event_channel_capacity = self.config.event_channel_capacity,
            "engine built"
        );

        Ok(Engine {
            tasks: TaskService::new(
                Arc::clone(&task_store),
                Arc::clone(&task_executor),
                Arc::clone(&publisher),
                Arc::clone(&ids),
            ),
            workflows: WorkflowService::new(
                workflow_store,
                task_store,
                Arc::new(SequentialWorkflowExecutor::new(task_executor)),
                publisher,
                ids,
            ),
            events,
        })
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

/// 組み立て済みのエンジン（2 つのサービスとイベントチャネル）
pub struct Engine {
    tasks: TaskService,
    workflows: WorkflowService,
    events: BroadcastEventPublisher,
}

impl Engine {
    pub fn builder(config: EngineConfig) -> EngineBuilder {
        EngineBuilder::new(config)
    }

    pub fn tasks(&self) -> &TaskService {
        &self.tasks
    }

    pub fn workflows(&self) -> &WorkflowService {
        &self.workflows
    }

    /// 以降に publish されるステータス変更をすべて受け取る
    pub fn subscribe(&self) -> broadcast::Receiver<DomainEvent> {
        self.events.subscribe()
    }
}
