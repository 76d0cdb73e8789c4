use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single task record as stored in the `tasks` table and returned to clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: i64,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    /// Creation time, serialized as an ISO-8601 string.
    pub created_at: DateTime<Utc>,
}

/// Request body for POST /api/tasks.
///
/// `title` is optional at the deserialization layer so that a missing field
/// produces a domain validation error (400 "Title is required") rather than a
/// framework-level rejection.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
}

/// Request body for PUT /api/tasks/{id}. Only supplied fields are changed.
///
/// `description` tracks field presence: an absent key leaves the stored
/// description alone, while an explicit `"description": null` clears it.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "deserialize_present")]
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
}

/// Deserialize a field that was present in the payload, keeping null as
/// `Some(None)`; combined with `#[serde(default)]`, an absent field stays
/// `None`.
fn deserialize_present<'de, D>(deserializer: D) -> Result<Option<Option<String>>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(Some)
}

/// A validated task ready to be inserted.
#[derive(Debug, Clone)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
}

/// Field-level changes to apply to an existing task.
///
/// `description: Some(None)` clears the description; `None` leaves it alone.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub completed: Option<bool>,
}

/// Response body for GET /api/tasks.
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListResponse {
    pub tasks: Vec<Task>,
    pub count: usize,
}

impl CreateTaskRequest {
    /// Validate the request, requiring a non-empty title.
    pub fn into_new_task(self) -> Result<NewTask, crate::models::TaskError> {
        match self.title {
            Some(title) if !title.trim().is_empty() => Ok(NewTask {
                title,
                description: self.description,
                completed: self.completed.unwrap_or(false),
            }),
            _ => Err(crate::models::TaskError::Validation {
                message: "Title is required".to_string(),
            }),
        }
    }
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(request: UpdateTaskRequest) -> Self {
        TaskPatch {
            title: request.title,
            description: request.description,
            completed: request.completed,
        }
    }
}

impl TaskPatch {
    pub fn apply(&self, task: &mut Task) {
        if let Some(title) = &self.title {
            task.title = title.clone();
        }
        if let Some(description) = &self.description {
            task.description = description.clone();
        }
        if let Some(completed) = self.completed {
            task.completed = completed;
        }
    }
}
