use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use validator::Validate;

/// Represents the status of a task.
/// Serialised the way the API spells it (`"In Progress"` has a space).
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TaskStatus {
    /// Task is waiting to be picked up.
    Pending,
    /// Task is currently being worked on.
    #[serde(rename = "In Progress", alias = "InProgress")]
    InProgress,
    /// Task is done.
    Completed,
    /// The assignee declined the task.
    Rejected,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Pending,
        TaskStatus::InProgress,
        TaskStatus::Completed,
        TaskStatus::Rejected,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "Pending",
            TaskStatus::InProgress => "In Progress",
            TaskStatus::Completed => "Completed",
            TaskStatus::Rejected => "Rejected",
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    /// Accepts the API spelling as well as compact forms such as `in-progress`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_ascii_lowercase();
        match normalized.as_str() {
            "pending" => Ok(TaskStatus::Pending),
            "inprogress" => Ok(TaskStatus::InProgress),
            "completed" | "done" => Ok(TaskStatus::Completed),
            "rejected" => Ok(TaskStatus::Rejected),
            _ => Err(format!(
                "unknown status '{}' (expected pending, in-progress, completed or rejected)",
                s
            )),
        }
    }
}

/// Represents a task as returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    /// Identifier assigned by the API.
    #[serde(alias = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub status: TaskStatus,
    /// Email of the user the task is assigned to.
    #[serde(default)]
    pub assigned_to: Option<String>,
    /// Email of the user who created the assignment.
    #[serde(default)]
    pub assigned_by: Option<String>,
    /// Whether the creator executes the task themselves.
    #[serde(default)]
    pub executed_by_self: bool,
}

/// Input structure for creating a task.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskInput {
    /// Must be between 1 and 200 characters.
    #[validate(length(min = 1, max = 200))]
    pub name: String,

    /// Maximum length of 1000 characters.
    #[validate(length(max = 1000))]
    pub description: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub assigned_to: Option<String>,

    pub executed_by_self: bool,
}

/// Partial update sent with `PATCH /tasks/:id`. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TaskUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 1000))]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<TaskStatus>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(email)]
    pub assigned_to: Option<String>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.assigned_to.is_none()
    }
}
