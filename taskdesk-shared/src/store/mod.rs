/// Persistence seam
///
/// Services talk to storage only through [`UserStore`] and [`TaskStore`].
/// Two implementations ship with the crate:
///
/// - [`postgres::PgStore`]: sqlx over PostgreSQL, used in deployments
/// - [`memory::MemoryStore`]: maps behind a tokio `RwLock`, used in tests
///   and when no database is configured in development
///
/// Both enforce the same rules: emails are unique (case-insensitive),
/// listings are sorted newest first, and deleting a user removes their
/// tasks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::models::page::{Page, PageRequest};
use crate::models::task::{CreateTask, Task, TaskFilter, TaskStats, UpdateTask};
use crate::models::user::{CreateUser, UpdateUser, User, UserFilter};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// A uniqueness constraint rejected the write
    #[error("Duplicate value for {field}")]
    Duplicate { field: String },

    /// Any other storage failure
    #[error("Store error: {0}")]
    Backend(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(ref db) = err {
            if db.code().as_deref() == Some("23505") {
                let field = match db.constraint() {
                    Some(c) if c.contains("email") => "email",
                    _ => "value",
                };
                return StoreError::Duplicate {
                    field: field.to_string(),
                };
            }
        }
        StoreError::Backend(err.to_string())
    }
}

/// User persistence
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. Fails with `Duplicate { field: "email" }` if the
    /// email is taken.
    async fn create(&self, input: CreateUser) -> Result<User, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Looks up several users at once; missing IDs are skipped
    async fn find_by_ids(&self, ids: &[Uuid]) -> Result<Vec<User>, StoreError>;

    /// Case-insensitive email lookup
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// True if `email` belongs to a user other than `except`
    async fn email_taken_by_other(&self, email: &str, except: Uuid) -> Result<bool, StoreError>;

    /// Applies the `Some` fields of `input`. Returns `None` if the user
    /// does not exist.
    async fn update(&self, id: Uuid, input: UpdateUser) -> Result<Option<User>, StoreError>;

    /// Deletes the user and every task they own
    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Filtered page of users, newest first
    async fn list(&self, filter: &UserFilter, page: PageRequest) -> Result<Page<User>, StoreError>;
}

/// Task persistence
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, input: CreateTask) -> Result<Task, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Task>, StoreError>;

    /// Applies the `Some` fields of `input`. Returns `None` if the task
    /// does not exist.
    async fn update(&self, id: Uuid, input: UpdateTask) -> Result<Option<Task>, StoreError>;

    async fn delete(&self, id: Uuid) -> Result<bool, StoreError>;

    /// Filtered page of tasks, newest first
    async fn list(&self, filter: &TaskFilter, page: PageRequest) -> Result<Page<Task>, StoreError>;

    /// Aggregate counts, optionally restricted to one owner
    async fn stats(&self, owner_id: Option<Uuid>, now: DateTime<Utc>) -> Result<TaskStats, StoreError>;
}
