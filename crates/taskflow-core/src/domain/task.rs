//! Task: a single unit of automatable work.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ids::TaskId;
use super::state::TaskStatus;

/// Declared type of a parameter value. Values are always carried as strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParameterType {
    String,
    Number,
    Boolean,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub key: String,
    pub value: String,
    #[serde(rename = "type")]
    pub kind: ParameterType,
}

impl Parameter {
    pub fn new(key: impl Into<String>, value: impl Into<String>, kind: ParameterType) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            kind,
        }
    }
}

/// Task record.
///
/// Status changes go through [`Task::update_status`] so that `updated_at`
/// and `executed_at` stay consistent with `status`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub name: String,
    pub description: String,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub parameters: Vec<Parameter>,
}

impl Task {
    pub fn new(id: TaskId, name: impl Into<String>, description: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id,
            name: name.into(),
            description: description.into(),
            status: TaskStatus::Pending,
            created_at: now,
            updated_at: now,
            executed_at: None,
            parameters: Vec::new(),
        }
    }

    /// Set the status and stamp `updated_at`.
    ///
    /// `executed_at` is stamped on the first transition to Running only;
    /// later Running transitions keep the original stamp.
    pub fn update_status(&mut self, status: TaskStatus) {
        let now = Utc::now();
        self.status = status;
        self.updated_at = now;

        if status == TaskStatus::Running && self.executed_at.is_none() {
            self.executed_at = Some(now);
        }
    }

    /// Append a parameter. Duplicate keys are kept as-is.
    pub fn add_parameter(&mut self, key: impl Into<String>, value: impl Into<String>, kind: ParameterType) {
        self.parameters.push(Parameter::new(key, value, kind));
        self.updated_at = Utc::now();
    }

    /// Replace the whole parameter list in one step.
    pub fn replace_parameters(&mut self, parameters: Vec<Parameter>) {
        self.parameters = parameters;
        self.updated_at = Utc::now();
    }

    pub fn is_executable(&self) -> bool {
        self.status.is_executable()
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
