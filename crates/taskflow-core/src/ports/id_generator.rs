//! IdGenerator port - ID 生成の抽象化
//!
//! テスト容易性のために、trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: 型ごとの接頭辞付きの単調増加 ULID（`task-01J...`）

use std::sync::Mutex;
use std::time::SystemTime;

use ulid::{Generator, Ulid};

use crate::domain::ids::{Id, IdMarker, TaskId, WorkflowId};
use crate::ports::Clock;

/// IdGenerator はプロセスの生存中に衝突しない ID を生成
///
/// サービス間で 1 つを共有するため `Send + Sync`。
pub trait IdGenerator: Send + Sync {
    fn generate_task_id(&self) -> TaskId;

    fn generate_workflow_id(&self) -> WorkflowId;
}

/// UlidGenerator は [`Clock`] の時刻から ULID ベースの ID を作る
///
/// # 実装詳細
/// - 単調増加の [`Generator`] を全 ID 型で 1 つ共有する
/// - 同じミリ秒内でも生成順に並び、`FixedClock` でも重複しない
pub struct UlidGenerator<C> {
    clock: C,
    inner: Mutex<Generator>,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            inner: Mutex::new(Generator::new()),
        }
    }

    fn next_ulid(&self) -> Ulid {
        let now = self.clock.now();
        let at = SystemTime::from(now);
        let mut generator = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        match generator.generate_from_datetime(at) {
            Ok(ulid) => ulid,
            // random part overflowed within one millisecond
            Err(_) => Ulid::from_parts(now.timestamp_millis() as u64, rand::random()),
        }
    }

    fn next_id<T: IdMarker>(&self) -> Id<T> {
        Id::new(format!("{}{}", T::prefix(), self.next_ulid()))
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_task_id(&self) -> TaskId {
        self.next_id()
    }

    fn generate_workflow_id(&self) -> WorkflowId {
        self.next_id()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::{FixedClock, SystemClock};
    use chrono::{TimeZone, Utc};
    use std::collections::HashSet;
    use std::sync::Arc;

    #[test]
    fn ulid_generator_generates_unique_ids() {
        let id_gen = UlidGenerator::new(SystemClock);

        let ids: HashSet<_> = (0..1_000).map(|_| id_gen.generate_task_id()).collect();
        assert_eq!(ids.len(), 1_000);
    }

    #[test]
    fn fixed_clock_ids_are_unique_and_ordered() {
        let fixed_time = Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap();
        let id_gen = UlidGenerator::new(FixedClock::new(fixed_time));

        let id1 = id_gen.generate_task_id();
        let id2 = id_gen.generate_task_id();
        assert_ne!(id1, id2);
        assert!(id1 < id2);

        let raw = id1.as_str().trim_start_matches("task-");
        let ulid = Ulid::from_string(raw).unwrap();
        assert_eq!(ulid.timestamp_ms(), fixed_time.timestamp_millis() as u64);
    }

    #[test]
    fn ids_carry_type_prefix() {
        let id_gen = UlidGenerator::new(SystemClock);

        assert!(id_gen.generate_task_id().as_str().starts_with("task-"));
        assert!(id_gen.generate_workflow_id().as_str().starts_with("workflow-"));
    }

    #[test]
    fn generator_is_shareable_across_threads() {
        let id_gen = Arc::new(UlidGenerator::new(SystemClock));
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let id_gen = Arc::clone(&id_gen);
                std::thread::spawn(move || {
                    (0..250).map(|_| id_gen.generate_task_id()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut all = HashSet::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }
        assert_eq!(all.len(), 1_000);
    }
}
