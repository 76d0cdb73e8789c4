pub mod task_repository;

pub use task_repository::{init_schema, SqliteTaskRepository, TaskRepository};
