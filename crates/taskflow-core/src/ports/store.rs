//! Store port - タスクとワークフローのキー付きコレクション
//!
//! 1 つのジェネリック trait で両方のエンティティを扱い、サービスは
//! [`TaskStore`] / [`WorkflowStore`] のトレイトオブジェクトに依存します。
//!
//! # 契約
//! - 値は参照で渡し、所有権付きで返す。ストアは自分のコピーを持つので、
//!   呼び出し側の値を変更しても保存済みの状態には届かない
//! - `create` は重複 id で `AlreadyExists`、`get_by_id` / `update` /
//!   `update_if_status` / `transition` / `delete` は未登録 id で `NotFound`
//! - `update` は全置換（マージしない）
//! - `transition` はステータスだけを保存済みの値の上で進めるので、
//!   実行中に受け付けた他フィールドの変更を失わない

use std::fmt;

use async_trait::async_trait;

use crate::domain::{
    DomainEvent, EngineError, EntityKind, Task, TaskId, TaskStatus, Workflow, WorkflowId,
    WorkflowStatus,
};

/// [`Store`] に格納できるもの
pub trait Entity: Clone + Send + Sync + 'static {
    type Id: Clone + Ord + fmt::Display + Send + Sync + 'static;
    type Status: Copy + PartialEq + fmt::Display + Send + Sync + 'static;

    const KIND: EntityKind;

    fn id(&self) -> &Self::Id;

    fn status(&self) -> Self::Status;

    /// `status` に遷移（タイムスタンプの更新はエンティティに任せる）
    fn set_status(&mut self, status: Self::Status);

    /// 現在のステータスのスナップショットイベント
    fn status_changed(&self) -> DomainEvent;
}

impl Entity for Task {
    type Id = TaskId;
    type Status = TaskStatus;

    const KIND: EntityKind = EntityKind::Task;

    fn id(&self) -> &TaskId {
        &self.id
    }

    fn status(&self) -> TaskStatus {
        self.status
    }

    fn set_status(&mut self, status: TaskStatus) {
        self.update_status(status);
    }

    fn status_changed(&self) -> DomainEvent {
        DomainEvent::task_status_changed(self)
    }
}

impl Entity for Workflow {
    type Id = WorkflowId;
    type Status = WorkflowStatus;

    const KIND: EntityKind = EntityKind::Workflow;

    fn id(&self) -> &WorkflowId {
        &self.id
    }

    fn status(&self) -> WorkflowStatus {
        self.status
    }

    fn set_status(&mut self, status: WorkflowStatus) {
        self.update_status(status);
    }

    fn status_changed(&self) -> DomainEvent {
        DomainEvent::workflow_status_changed(self)
    }
}

#[async_trait]
pub trait Store<E: Entity>: Send + Sync {
    async fn create(&self, entity: &E) -> Result<(), EngineError>;

    async fn get_by_id(&self, id: &E::Id) -> Result<E, EngineError>;

    /// 全エンティティ。順序は実装依存
    async fn get_all(&self) -> Result<Vec<E>, EngineError>;

    async fn update(&self, entity: &E) -> Result<(), EngineError>;

    /// 保存済みのステータスが `expected` のときだけ全置換する。
    ///
    /// 違えば保存済みのステータスを載せた `InvalidState`。判定と書き込みは
    /// 他のストア呼び出しに対して原子的。
    async fn update_if_status(&self, entity: &E, expected: E::Status) -> Result<(), EngineError>;

    /// 保存済みのステータスが `expected` のときだけ `next` に進め、更新後の
    /// コピーを返す。
    ///
    /// ステータス以外のフィールドは保存済みの値のまま。`expected` と違えば
    /// 保存済みのステータスを載せた `InvalidState`。
    async fn transition(
        &self,
        id: &E::Id,
        expected: E::Status,
        next: E::Status,
    ) -> Result<E, EngineError>;

    async fn delete(&self, id: &E::Id) -> Result<(), EngineError>;

    async fn get_by_status(&self, status: E::Status) -> Result<Vec<E>, EngineError>;
}

pub type TaskStore = dyn Store<Task>;

pub type WorkflowStore = dyn Store<Workflow>;
