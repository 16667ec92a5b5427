//! Where a user's task collection lives.
//!
//! Free users keep their tasks in a per-user JSON file. Premium users keep them
//! in the `tasks` table. Both backends load and rewrite the whole collection.

use async_trait::async_trait;
use cozy_task_core::{TaskCollection, TaskError};

pub mod local;
pub mod remote;
pub mod selector;

pub use local::LocalTaskStore;
pub use remote::RemoteTaskStore;
pub use selector::TaskStoreSelector;

/// Key the local store files are named after.
pub const LOCAL_STORAGE_KEY: &str = "cozy-tasks";

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    Local,
    Remote,
}

/// Error type for TaskStore operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskStoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// The stored document could not be read back as a task list.
    #[error("Malformed task data: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    /// A stored row holds a value the task model does not accept.
    #[error("Invalid stored task: {0}")]
    InvalidRow(#[from] TaskError),
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Loads the user's whole collection. A user with nothing stored gets an empty one.
    async fn load(&self, user_id: &str) -> Result<TaskCollection, TaskStoreError>;

    /// Replaces the user's stored collection with `tasks`.
    async fn save(&self, user_id: &str, tasks: &TaskCollection) -> Result<(), TaskStoreError>;

    fn kind(&self) -> StorageKind;
}
