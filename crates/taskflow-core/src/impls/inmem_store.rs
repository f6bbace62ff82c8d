//! InMemoryStore - ロックで守ったマップによる `Store`
//!
//! # 学習ポイント
//! - `RwLock<BTreeMap<Id, E>>`: 読み取りはロックを共有、書き込みは排他
//!   （キー単位ではなくストア単位で 1 本）
//! - 出し入れのたびに clone して、呼び出し側と保存済みの値を共有しない
//! - 比較と書き込みを同じ write ロックの中で行う compare-and-swap
//! - `BTreeMap` なので `get_all` / `get_by_status` は id 順
//!   （`UlidGenerator` の id なら作成順）

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::domain::{EngineError, Task, Workflow};
use crate::ports::{Entity, Store};

pub type InMemoryTaskStore = InMemoryStore<Task>;

pub type InMemoryWorkflowStore = InMemoryStore<Workflow>;

pub struct InMemoryStore<E: Entity> {
    entries: RwLock<BTreeMap<E::Id, E>>,
}

impl<E: Entity> InMemoryStore<E> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

impl<E: Entity> Default for InMemoryStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: Entity> Store<E> for InMemoryStore<E> {
    async fn create(&self, entity: &E) -> Result<(), EngineError> {
        let mut entries = self.entries.write().await;
        if entries.contains_key(entity.id()) {
            return Err(EngineError::already_exists(E::KIND, entity.id()));
        }
        entries.insert(entity.id().clone(), entity.clone());
        Ok(())
    }

    async fn get_by_id(&self, id: &E::Id) -> Result<E, EngineError> {
        let entries = self.entries.read().await;
        entries
            .get(id)
            .cloned()
            .ok_or_else(|| EngineError::not_found(E::KIND, id))
    }

    async fn get_all(&self) -> Result<Vec<E>, EngineError> {
        let entries = self.entries.read().await;
        Ok(entries.values().cloned().collect())
    }

    async fn update(&self, entity: &E) -> Result<(), EngineError> {
        let mut entries = self.entries.write().await;
        let Some(stored) = entries.get_mut(entity.id()) else {
            return Err(EngineError::not_found(E::KIND, entity.id()));
        };
        *stored = entity.clone();
        Ok(())
    }

    async fn update_if_status(&self, entity: &E, expected: E::Status) -> Result<(), EngineError> {
        let mut entries = self.entries.write().await;
        let Some(stored) = entries.get_mut(entity.id()) else {
            return Err(EngineError::not_found(E::KIND, entity.id()));
        };
        if stored.status() != expected {
            return Err(EngineError::invalid_state(E::KIND, entity.id(), stored.status()));
        }
        *stored = entity.clone();
        Ok(())
    }

    async fn transition(
        &self,
        id: &E::Id,
        expected: E::Status,
        next: E::Status,
    ) -> Result<E, EngineError> {
        let mut entries = self.entries.write().await;
        let Some(stored) = entries.get_mut(id) else {
            return Err(EngineError::not_found(E::KIND, id));
        };
        if stored.status() != expected {
            return Err(EngineError::invalid_state(E::KIND, id, stored.status()));
        }
        stored.set_status(next);
        Ok(stored.clone())
    }

    async fn delete(&self, id: &E::Id) -> Result<(), EngineError> {
        let mut entries = self.entries.write().await;
        entries
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| EngineError::not_found(E::KIND, id))
    }

    async fn get_by_status(&self, status: E::Status) -> Result<Vec<E>, EngineError> {
        let entries = self.entries.read().await;
        Ok(entries
            .values()
            .filter(|entity| entity.status() == status)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{
        ErrorKind, ParameterType, TaskId, TaskStatus, WorkflowId, WorkflowStatus,
    };
    use std::sync::Arc;

    fn task(id: &str) -> Task {
        Task::new(TaskId::new(id), format!("Task {id}"), "Test Description")
    }

    #[tokio::test]
    async fn create_rejects_duplicates() {
        let store = InMemoryTaskStore::new();
        let task = task("test-id");

        store.create(&task).await.unwrap();
        let err = store.create(&task).await.unwrap_err();

        assert_eq!(err.kind(), ErrorKind::AlreadyExists);
        assert_eq!(err.entity_id(), "test-id");
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn get_round_trips_field_for_field() {
        let store = InMemoryTaskStore::new();
        let mut original = task("test-id");
        original.add_parameter("k", "v", ParameterType::String);
        store.create(&original).await.unwrap();

        let retrieved = store.get_by_id(&original.id).await.unwrap();

        assert_eq!(retrieved, original);
    }

    #[tokio::test]
    async fn get_missing_is_not_found() {
        let store = InMemoryTaskStore::new();
        let err = store.get_by_id(&TaskId::new("non-existent")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn values_do_not_alias_stored_state() {
        let store = InMemoryTaskStore::new();
        let mut original = task("test-id");
        store.create(&original).await.unwrap();

        // mutate the value we passed in
        original.name = "changed after create".into();
        original.add_parameter("late", "1", ParameterType::Number);

        // mutate a value we got back
        let mut fetched = store.get_by_id(&original.id).await.unwrap();
        fetched.update_status(TaskStatus::Failed);
        fetched.parameters.clear();

        let again = store.get_by_id(&original.id).await.unwrap();
        assert_eq!(again.name, "Task test-id");
        assert_eq!(again.status, TaskStatus::Pending);
        assert!(again.parameters.is_empty());
    }

    #[tokio::test]
    async fn workflow_task_ids_do_not_alias() {
        let store = InMemoryWorkflowStore::new();
        let workflow = Workflow::new(
            WorkflowId::new("w-1"),
            "WF",
            "",
            vec![TaskId::new("a"), TaskId::new("b")],
        );
        store.create(&workflow).await.unwrap();

        let mut fetched = store.get_by_id(&workflow.id).await.unwrap();
        fetched.task_ids.push(TaskId::new("c"));
        fetched.task_ids.remove(0);

        let again = store.get_by_id(&workflow.id).await.unwrap();
        assert_eq!(again.task_ids, vec![TaskId::new("a"), TaskId::new("b")]);
    }

    #[tokio::test]
    async fn get_all_returns_every_entity_in_id_order() {
        let store = InMemoryTaskStore::new();
        assert!(store.get_all().await.unwrap().is_empty());

        store.create(&task("task-2")).await.unwrap();
        store.create(&task("task-1")).await.unwrap();

        let ids: Vec<_> = store
            .get_all()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id.into_inner())
            .collect();
        assert_eq!(ids, vec!["task-1", "task-2"]);
    }

    #[tokio::test]
    async fn update_replaces_whole_value() {
        let store = InMemoryTaskStore::new();

        let mut task = task("test-id");
        let err = store.update(&task).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        task.add_parameter("old", "1", ParameterType::Number);
        store.create(&task).await.unwrap();

        task.name = "Updated Name".into();
        task.parameters.clear();
        store.update(&task).await.unwrap();

        let retrieved = store.get_by_id(&task.id).await.unwrap();
        assert_eq!(retrieved.name, "Updated Name");
        assert!(retrieved.parameters.is_empty());
    }

    #[tokio::test]
    async fn update_if_status_checks_stored_status() {
        let store = InMemoryTaskStore::new();
        let mut task = task("test-id");
        store.create(&task).await.unwrap();

        task.update_status(TaskStatus::Running);
        store.update_if_status(&task, TaskStatus::Pending).await.unwrap();

        // stored status is now Running, so a second Pending -> Running loses
        let err = store
            .update_if_status(&task, TaskStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.to_string().contains("RUNNING"));

        let missing = Task::new(TaskId::new("missing"), "x", "");
        let err = store
            .update_if_status(&missing, TaskStatus::Pending)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn transition_keeps_other_stored_fields() {
        let store = InMemoryTaskStore::new();
        let task = task("test-id");
        store.create(&task).await.unwrap();

        // a rename lands while the caller still holds the old copy
        let mut renamed = task.clone();
        renamed.name = "renamed".to_string();
        store.update(&renamed).await.unwrap();

        let moved = store
            .transition(&task.id, TaskStatus::Pending, TaskStatus::Running)
            .await
            .unwrap();

        assert_eq!(moved.status, TaskStatus::Running);
        assert_eq!(moved.name, "renamed");
        assert!(moved.executed_at.is_some());
        assert_eq!(store.get_by_id(&task.id).await.unwrap(), moved);
    }

    #[tokio::test]
    async fn transition_from_wrong_status_changes_nothing() {
        let store = InMemoryTaskStore::new();
        let mut task = task("test-id");
        task.update_status(TaskStatus::Cancelled);
        store.create(&task).await.unwrap();

        let err = store
            .transition(&task.id, TaskStatus::Running, TaskStatus::Completed)
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidState);
        assert!(err.to_string().contains("CANCELLED"));
        assert_eq!(store.get_by_id(&task.id).await.unwrap(), task);

        let err = store
            .transition(&TaskId::new("missing"), TaskStatus::Pending, TaskStatus::Running)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = InMemoryTaskStore::new();

        let err = store.delete(&TaskId::new("non-existent")).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let task = task("test-id");
        store.create(&task).await.unwrap();
        store.delete(&task.id).await.unwrap();

        assert!(store.is_empty().await);
        let err = store.get_by_id(&task.id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn get_by_status_filters() {
        let store = InMemoryTaskStore::new();

        let task1 = task("task-1");
        let mut task2 = task("task-2");
        task2.update_status(TaskStatus::Running);
        let mut task3 = task("task-3");
        task3.update_status(TaskStatus::Completed);

        for t in [&task1, &task2, &task3] {
            store.create(t).await.unwrap();
        }

        let pending = store.get_by_status(TaskStatus::Pending).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, task1.id);

        let running = store.get_by_status(TaskStatus::Running).await.unwrap();
        assert_eq!(running.len(), 1);

        let cancelled = store.get_by_status(TaskStatus::Cancelled).await.unwrap();
        assert!(cancelled.is_empty());
    }

    #[tokio::test]
    async fn workflow_store_filters_by_status() {
        let store = InMemoryWorkflowStore::new();
        let draft = Workflow::new(WorkflowId::new("w-1"), "a", "", vec![]);
        let mut paused = Workflow::new(WorkflowId::new("w-2"), "b", "", vec![]);
        paused.update_status(WorkflowStatus::Paused);
        store.create(&draft).await.unwrap();
        store.create(&paused).await.unwrap();

        let found = store.get_by_status(WorkflowStatus::Paused).await.unwrap();
        assert_eq!(found, vec![paused]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_creates_on_distinct_ids_all_land() {
        let store = Arc::new(InMemoryTaskStore::new());

        let handles: Vec<_> = (0..50)
            .map(|i| {
                let store = Arc::clone(&store);
                tokio::spawn(async move { store.create(&task(&format!("task-{i:02}"))).await })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        assert_eq!(store.len().await, 50);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_compare_and_swap_has_one_winner() {
        let store = Arc::new(InMemoryTaskStore::new());
        let original = task("contended");
        store.create(&original).await.unwrap();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = Arc::clone(&store);
                let mut running = original.clone();
                running.update_status(TaskStatus::Running);
                tokio::spawn(async move {
                    store.update_if_status(&running, TaskStatus::Pending).await
                })
            })
            .collect();

        let mut winners = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }
}
