/// Task model
///
/// A task always has exactly one owner. Ownership is fixed at creation:
/// [`UpdateTask`] has no owner field, so no update can reassign it.
///
/// # Status
///
/// ```text
/// pending ⇄ in-progress ⇄ completed
/// ```
///
/// Any status may be set directly; there is no enforced transition order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use super::user::{OwnerSummary, UnknownVariant};

/// Task progress status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Converts status to its wire/storage string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in-progress",
            TaskStatus::Completed => "completed",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in-progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(UnknownVariant {
                kind: "status",
                value: other.to_string(),
            }),
        }
    }
}

/// Task priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPriority {
    Low,
    #[default]
    Medium,
    High,
}

impl TaskPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskPriority::Low => "low",
            TaskPriority::Medium => "medium",
            TaskPriority::High => "high",
        }
    }
}

impl fmt::Display for TaskPriority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskPriority {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(TaskPriority::Low),
            "medium" => Ok(TaskPriority::Medium),
            "high" => Ok(TaskPriority::High),
            other => Err(UnknownVariant {
                kind: "priority",
                value: other.to_string(),
            }),
        }
    }
}

/// Task record
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: Uuid,

    /// Short title, 1-100 characters
    pub title: String,

    /// Description, 1-500 characters
    pub description: String,

    pub status: TaskStatus,
    pub priority: TaskPriority,

    /// Optional due date; must be in the future when set through the API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<DateTime<Utc>>,

    /// Owning user. Immutable after creation.
    pub owner_id: Uuid,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    /// Past due and not yet completed
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.status != TaskStatus::Completed && self.due_date.map_or(false, |due| due < now)
    }
}

/// Input for creating a task
#[derive(Debug, Clone)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_date: Option<DateTime<Utc>>,
    pub owner_id: Uuid,
}

/// Input for updating a task
///
/// Only `Some` fields are written.
#[derive(Debug, Clone, Default)]
pub struct UpdateTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_date: Option<DateTime<Utc>>,
}

/// Listing filters, AND-combined
#[derive(Debug, Clone, Default)]
pub struct TaskFilter {
    /// Restrict to a single owner
    pub owner_id: Option<Uuid>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,

    /// Due on or before this instant
    pub due_before: Option<DateTime<Utc>>,

    /// Case-insensitive substring over title or description
    pub search: Option<String>,
}

impl TaskFilter {
    /// Checks a task against every populated filter
    pub fn matches(&self, task: &Task) -> bool {
        if self.owner_id.map_or(false, |owner| task.owner_id != owner) {
            return false;
        }
        if self.status.map_or(false, |s| task.status != s) {
            return false;
        }
        if self.priority.map_or(false, |p| task.priority != p) {
            return false;
        }
        if let Some(limit) = self.due_before {
            match task.due_date {
                Some(due) if due <= limit => {}
                _ => return false,
            }
        }
        if let Some(ref needle) = self.search {
            let needle = needle.to_lowercase();
            if !task.title.to_lowercase().contains(&needle)
                && !task.description.to_lowercase().contains(&needle)
            {
                return false;
            }
        }
        true
    }
}

/// Aggregate counts for the stats endpoint
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: u64,
    pub pending: u64,
    pub in_progress: u64,
    pub completed: u64,
    pub high_priority: u64,
    pub overdue: u64,

    /// Percentage of completed tasks, rounded; 0 when there are no tasks
    pub completion_rate: u64,
}

impl TaskStats {
    /// Fills `completion_rate` from `completed` and `total`
    pub fn with_completion_rate(mut self) -> Self {
        self.completion_rate = if self.total > 0 {
            ((self.completed as f64 / self.total as f64) * 100.0).round() as u64
        } else {
            0
        };
        self
    }
}

/// Task joined with its owner summary
#[derive(Debug, Clone, Serialize)]
pub struct TaskView {
    #[serde(flatten)]
    pub task: Task,

    /// Owner details; `None` if the owner no longer exists
    pub owner: Option<OwnerSummary>,
}
