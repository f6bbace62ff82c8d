//! Workflow: an ordered grouping of tasks, referenced by id.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::{TaskId, WorkflowId};
use super::state::WorkflowStatus;

/// Workflow record.
///
/// A workflow never owns tasks; `task_ids` may contain duplicates and is
/// executed in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Workflow {
    pub id: WorkflowId,
    pub name: String,
    pub description: String,
    pub status: WorkflowStatus,
    pub task_ids: Vec<TaskId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Workflow {
    pub fn new(
        id: WorkflowId,
        name: impl Into<String>,
        description: impl Into<String>,
        task_ids: Vec<TaskId>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: description.into(),
            status: WorkflowStatus::Draft,
            task_ids,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn update_status(&mut self, status: WorkflowStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }

    pub fn add_task(&mut self, task_id: TaskId) {
        self.task_ids.push(task_id);
        self.updated_at = Utc::now();
    }

    /// Remove the first occurrence of `task_id`.
    ///
    /// Returns `false` (and leaves `updated_at` untouched) if the id is absent.
    pub fn remove_task(&mut self, task_id: &TaskId) -> bool {
        let Some(index) = self.task_ids.iter().position(|id| id == task_id) else {
            return false;
        };
        self.task_ids.remove(index);
        self.updated_at = Utc::now();
        true
    }

    pub fn is_executable(&self) -> bool {
        self.status.is_executable()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    pub fn has_tasks(&self) -> bool {
        !self.task_ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ids(raw: &[&str]) -> Vec<TaskId> {
        raw.iter().map(|s| TaskId::new(*s)).collect()
    }

    #[test]
    fn new_workflow_starts_as_draft() {
        let workflow = Workflow::new(WorkflowId::new("w-1"), "WF", "desc", ids(&["a"]));
        assert_eq!(workflow.status, WorkflowStatus::Draft);
        assert!(workflow.is_executable());
        assert!(workflow.has_tasks());
    }

    #[test]
    fn empty_workflow_has_no_tasks() {
        let workflow = Workflow::new(WorkflowId::new("w-1"), "WF", "desc", vec![]);
        assert!(!workflow.has_tasks());
    }

    #[test]
    fn add_task_appends_duplicates() {
        let mut workflow = Workflow::new(WorkflowId::new("w-1"), "WF", "desc", ids(&["a"]));
        workflow.add_task(TaskId::new("a"));
        assert_eq!(workflow.task_ids, ids(&["a", "a"]));
    }

    #[test]
    fn remove_task_removes_first_occurrence_only() {
        let mut workflow =
            Workflow::new(WorkflowId::new("w-1"), "WF", "desc", ids(&["a", "b", "a"]));
        let before = workflow.updated_at;
        std::thread::sleep(Duration::from_millis(2));

        assert!(workflow.remove_task(&TaskId::new("a")));

        assert_eq!(workflow.task_ids, ids(&["b", "a"]));
        assert!(workflow.updated_at > before);
    }

    #[test]
    fn remove_absent_task_is_noop() {
        let mut workflow = Workflow::new(WorkflowId::new("w-1"), "WF", "desc", ids(&["a"]));
        let before = workflow.updated_at;
        std::thread::sleep(Duration::from_millis(2));

        assert!(!workflow.remove_task(&TaskId::new("zzz")));

        assert_eq!(workflow.task_ids, ids(&["a"]));
        assert_eq!(workflow.updated_at, before);
    }

    #[test]
    fn paused_is_executable_again() {
        let mut workflow = Workflow::new(WorkflowId::new("w-1"), "WF", "desc", ids(&["a"]));
        workflow.update_status(WorkflowStatus::Active);
        assert!(!workflow.is_executable());

        workflow.update_status(WorkflowStatus::Paused);
        assert!(workflow.is_executable());

        workflow.update_status(WorkflowStatus::Completed);
        assert!(!workflow.is_executable());
        assert!(workflow.is_terminal());
    }
}
