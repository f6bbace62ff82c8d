//! EngineConfig - 環境変数から読み込むエンジン設定

use std::env;
use std::time::Duration;

use crate::impls::DEFAULT_TASK_DURATION;

pub const DEFAULT_EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// 模擬 executor が 1 タスクにかける時間
    pub task_duration: Duration,

    /// broadcast イベントチャネルのバッファサイズ
    pub event_channel_capacity: usize,
}

impl EngineConfig {
    /// 環境変数から設定を作る
    ///
    /// 環境変数:
    /// - `TASKFLOW_TASK_DURATION_MS`: 模擬タスクの所要時間（既定: 2000）
    /// - `TASKFLOW_EVENT_CHANNEL_CAPACITY`: broadcast チャネルの容量（既定: 256）
    ///
    /// 未設定やパースできない値は既定値になる。
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let task_duration = lookup("TASKFLOW_TASK_DURATION_MS")
            .and_then(|v| v.trim().parse::<u64>().ok())
            .map(Duration::from_millis)
            .unwrap_or(DEFAULT_TASK_DURATION);

        let event_channel_capacity = lookup("TASKFLOW_EVENT_CHANNEL_CAPACITY")
            .and_then(|v| v.trim().parse::<usize>().ok())
            .filter(|capacity| *capacity > 0)
            .unwrap_or(DEFAULT_EVENT_CHANNEL_CAPACITY);

        Self {
            task_duration,
            event_channel_capacity,
        }
    }

    pub fn with_task_duration(mut self, duration: Duration) -> Self {
        self.task_duration = duration;
        self
    }

    pub fn with_event_channel_capacity(mut self, capacity: usize) -> Self {
        self.event_channel_capacity = capacity;
        self
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            task_duration: DEFAULT_TASK_DURATION,
            event_channel_capacity: DEFAULT_EVENT_CHANNEL_CAPACITY,
        }
    }
}
