use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{info, instrument};

use crate::models::{NewTask, Task, TaskError, TaskPatch, TaskResult};
use crate::observability::DbQueryTimer;

const TABLE: &str = "tasks";

const SQL_SELECT_ALL: &str =
    "SELECT id, title, description, completed, created_at FROM tasks ORDER BY id";
const SQL_SELECT_BY_ID: &str =
    "SELECT id, title, description, completed, created_at FROM tasks WHERE id = ?";
const SQL_INSERT: &str =
    "INSERT INTO tasks (title, description, completed, created_at) VALUES (?, ?, ?, ?)";
const SQL_UPDATE: &str =
    "UPDATE tasks SET title = ?, description = ?, completed = ? WHERE id = ?";
const SQL_DELETE: &str = "DELETE FROM tasks WHERE id = ?";

/// Create the tasks table if it does not exist. Runs once at startup,
/// outside the per-request instrumentation pipeline.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS tasks (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            title TEXT NOT NULL,
            description TEXT,
            completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;
    info!("Database schema initialized");
    Ok(())
}

/// Trait defining the interface for task data access operations.
#[async_trait]
pub trait TaskRepository: Send + Sync {
    /// Fetch all tasks ordered by id.
    async fn find_all(&self) -> TaskResult<Vec<Task>>;

    /// Fetch a task by its id.
    async fn find_by_id(&self, id: i64) -> TaskResult<Option<Task>>;

    /// Insert a new task and return it with its assigned id.
    async fn create(&self, new_task: NewTask) -> TaskResult<Task>;

    /// Apply a partial update to an existing task.
    async fn update(&self, id: i64, patch: TaskPatch) -> TaskResult<Task>;

    /// Delete a task by id.
    async fn delete(&self, id: i64) -> TaskResult<()>;
}

/// Row as stored in SQLite; `created_at` is kept as RFC3339 text.
#[derive(Debug, sqlx::FromRow)]
struct TaskRow {
    id: i64,
    title: String,
    description: Option<String>,
    completed: bool,
    created_at: String,
}

impl TaskRow {
    fn into_task(self) -> TaskResult<Task> {
        let created_at = DateTime::parse_from_rfc3339(&self.created_at)
            .map(|dt| dt.with_timezone(&Utc))
            .map_err(|e| TaskError::Unexpected {
                message: format!("Invalid created_at for task {}: {}", self.id, e),
            })?;
        Ok(Task {
            id: self.id,
            title: self.title,
            description: self.description,
            completed: self.completed,
            created_at,
        })
    }
}

/// SQLite implementation of the task repository.
///
/// Every statement runs through the query timer so its latency is observed
/// in the database duration histogram under the statement's operation kind.
/// Reads run directly on the pool; writes run inside a transaction that is
/// committed on success and rolled back when dropped on any error path.
pub struct SqliteTaskRepository {
    pool: SqlitePool,
    timer: DbQueryTimer,
}

impl SqliteTaskRepository {
    pub fn new(pool: SqlitePool, timer: DbQueryTimer) -> Self {
        Self { pool, timer }
    }
}

#[async_trait]
impl TaskRepository for SqliteTaskRepository {
    #[instrument(skip(self))]
    async fn find_all(&self) -> TaskResult<Vec<Task>> {
        let rows: Vec<TaskRow> = self
            .timer
            .execute(
                TABLE,
                SQL_SELECT_ALL,
                sqlx::query_as(SQL_SELECT_ALL).fetch_all(&self.pool),
            )
            .await?;

        rows.into_iter().map(TaskRow::into_task).collect()
    }

    #[instrument(skip(self))]
    async fn find_by_id(&self, id: i64) -> TaskResult<Option<Task>> {
        let row: Option<TaskRow> = self
            .timer
            .execute(
                TABLE,
                SQL_SELECT_BY_ID,
                sqlx::query_as(SQL_SELECT_BY_ID)
                    .bind(id)
                    .fetch_optional(&self.pool),
            )
            .await?;

        row.map(TaskRow::into_task).transpose()
    }

    #[instrument(skip(self, new_task))]
    async fn create(&self, new_task: NewTask) -> TaskResult<Task> {
        let created_at = Utc::now();
        let mut tx = self.pool.begin().await?;

        let result = self
            .timer
            .execute(
                TABLE,
                SQL_INSERT,
                sqlx::query(SQL_INSERT)
                    .bind(&new_task.title)
                    .bind(&new_task.description)
                    .bind(new_task.completed)
                    .bind(created_at.to_rfc3339())
                    .execute(&mut *tx),
            )
            .await?;

        let id = result.last_insert_rowid();
        tx.commit().await?;

        Ok(Task {
            id,
            title: new_task.title,
            description: new_task.description,
            completed: new_task.completed,
            created_at,
        })
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: i64, patch: TaskPatch) -> TaskResult<Task> {
        let mut tx = self.pool.begin().await?;

        let row: Option<TaskRow> = self
            .timer
            .execute(
                TABLE,
                SQL_SELECT_BY_ID,
                sqlx::query_as(SQL_SELECT_BY_ID)
                    .bind(id)
                    .fetch_optional(&mut *tx),
            )
            .await?;

        // No UPDATE statement is issued for a missing task; the transaction
        // rolls back on drop.
        let mut task = match row {
            Some(row) => row.into_task()?,
            None => return Err(TaskError::NotFound { id }),
        };

        patch.apply(&mut task);

        self.timer
            .execute(
                TABLE,
                SQL_UPDATE,
                sqlx::query(SQL_UPDATE)
                    .bind(&task.title)
                    .bind(&task.description)
                    .bind(task.completed)
                    .bind(id)
                    .execute(&mut *tx),
            )
            .await?;

        tx.commit().await?;
        Ok(task)
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: i64) -> TaskResult<()> {
        let mut tx = self.pool.begin().await?;

        let row: Option<TaskRow> = self
            .timer
            .execute(
                TABLE,
                SQL_SELECT_BY_ID,
                sqlx::query_as(SQL_SELECT_BY_ID)
                    .bind(id)
                    .fetch_optional(&mut *tx),
            )
            .await?;

        if row.is_none() {
            return Err(TaskError::NotFound { id });
        }

        self.timer
            .execute(
                TABLE,
                SQL_DELETE,
                sqlx::query(SQL_DELETE).bind(id).execute(&mut *tx),
            )
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
