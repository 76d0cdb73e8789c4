use thiserror::Error;

/// Errors produced while serving a task request.
///
/// The HTTP layer maps each variant to a status code centrally; handlers never
/// translate errors themselves.
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("{message}")]
    Validation { message: String },

    #[error("Task not found")]
    NotFound { id: i64 },

    #[error("Database error: {source}")]
    Database {
        #[from]
        source: sqlx::Error,
    },

    #[error("Unexpected error: {message}")]
    Unexpected { message: String },
}

impl TaskError {
    /// HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            TaskError::Validation { .. } => 400,
            TaskError::NotFound { .. } => 404,
            TaskError::Database { .. } | TaskError::Unexpected { .. } => 500,
        }
    }

    /// Short message safe to return to clients. Internal failures collapse to
    /// a generic message; detail goes to the logs and the span only.
    pub fn client_message(&self) -> String {
        match self {
            TaskError::Validation { message } => message.clone(),
            TaskError::NotFound { .. } => "Task not found".to_string(),
            TaskError::Database { .. } | TaskError::Unexpected { .. } => {
                "Internal server error".to_string()
            }
        }
    }
}

/// Result type alias for task operations.
pub type TaskResult<T> = Result<T, TaskError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        let validation = TaskError::Validation {
            message: "Title is required".to_string(),
        };
        assert_eq!(validation.status_code(), 400);
        assert_eq!(validation.client_message(), "Title is required");

        let not_found = TaskError::NotFound { id: 42 };
        assert_eq!(not_found.status_code(), 404);

        let unexpected = TaskError::Unexpected {
            message: "boom".to_string(),
        };
        assert_eq!(unexpected.status_code(), 500);
        assert_eq!(unexpected.client_message(), "Internal server error");
    }

    #[test]
    fn test_database_error_conversion() {
        let err: TaskError = sqlx::Error::RowNotFound.into();
        match &err {
            TaskError::Database { .. } => {}
            other => panic!("Expected Database error, got {other:?}"),
        }
        assert_eq!(err.status_code(), 500);
    }
}
