pub mod errors;
pub mod task;

pub use errors::{TaskError, TaskResult};
pub use task::{CreateTaskRequest, NewTask, Task, TaskListResponse, TaskPatch, UpdateTaskRequest};
