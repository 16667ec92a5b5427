use super::{LOCAL_STORAGE_KEY, StorageKind, TaskStore, TaskStoreError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use cozy_task_core::{Task, TaskCollection};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// File-backed store: `<root>/<sha256 of user id>/cozy-tasks.json`, one JSON array per user.
pub struct LocalTaskStore {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl LocalTaskStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of the file holding `user_id`'s tasks.
    pub fn path_for(&self, user_id: &str) -> PathBuf {
        self.root
            .join(user_dir_name(user_id))
            .join(format!("{}.json", LOCAL_STORAGE_KEY))
    }
}

#[async_trait]
impl TaskStore for LocalTaskStore {
    #[tracing::instrument(skip(self))]
    async fn load(&self, user_id: &str) -> Result<TaskCollection, TaskStoreError> {
        let path = self.path_for(user_id);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(TaskCollection::new());
            }
            Err(err) => return Err(err.into()),
        };
        if contents.trim().is_empty() {
            return Ok(TaskCollection::new());
        }
        let tasks: Vec<Task> = serde_json::from_str(&contents)?;
        Ok(TaskCollection::from_tasks(tasks))
    }

    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    async fn save(&self, user_id: &str, tasks: &TaskCollection) -> Result<(), TaskStoreError> {
        let path = self.path_for(user_id);
        let json = serde_json::to_vec(tasks.tasks())?;

        let _guard = self.write_lock.lock().await;
        if let Some(dir) = path.parent() {
            tokio::fs::create_dir_all(dir).await?;
        }
        let staging = path.with_extension("json.tmp");
        tokio::fs::write(&staging, &json).await?;
        tokio::fs::rename(&staging, &path).await?;
        tracing::debug!("Saved tasks to {}", path.display());
        Ok(())
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Local
    }
}

/// Maps a user id onto a single safe path segment, distinct for every id.
fn user_dir_name(user_id: &str) -> String {
    hex::encode(Sha256::digest(user_id.as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use cozy_task_core::{NewTask, TaskPriority, TaskStatus};

    fn now() -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 2, 3, 10, 30, 0).unwrap()
    }

    #[tokio::test]
    async fn can_load_empty_collection_when_nothing_saved() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTaskStore::new(dir.path());

        let loaded = store.load("nobody").await.unwrap();

        assert!(loaded.is_empty());
    }

    #[tokio::test]
    async fn can_reload_saved_collection_with_typed_fields() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTaskStore::new(dir.path());
        let input = NewTask {
            title: "Water plants".to_string(),
            priority: TaskPriority::High,
            due_date: Some(now() + chrono::Duration::days(2)),
            tags: vec!["home".to_string(), "garden".to_string()],
            ..Default::default()
        };
        let (collection, _) = TaskCollection::new().add(input, now()).unwrap();
        let (collection, _) = collection
            .add(NewTask::titled("Call mum"), now())
            .unwrap();
        let first_id = collection.tasks()[0].id().to_string();
        let (collection, _) = collection.toggle_status(&first_id, now()).unwrap();

        store.save("user-1", &collection).await.unwrap();
        let reloaded = store.load("user-1").await.unwrap();

        assert_eq!(reloaded, collection);
        assert_eq!(reloaded.tasks()[0].status(), TaskStatus::Completed);
        assert_eq!(
            reloaded.tasks()[0].due_date(),
            Some(now() + chrono::Duration::days(2))
        );
    }

    #[tokio::test]
    async fn can_keep_users_apart() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTaskStore::new(dir.path());
        let (collection, _) = TaskCollection::new()
            .add(NewTask::titled("Mine"), now())
            .unwrap();

        store.save("alice", &collection).await.unwrap();

        assert_eq!(store.load("alice").await.unwrap().len(), 1);
        assert!(store.load("bob").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn can_report_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTaskStore::new(dir.path());
        let path = store.path_for("user-1");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "{not json").unwrap();

        let result = store.load("user-1").await;

        assert!(matches!(result, Err(TaskStoreError::Malformed(_))));
    }

    #[tokio::test]
    async fn can_keep_ids_with_similar_characters_apart() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalTaskStore::new(dir.path());
        let (collection, _) = TaskCollection::new()
            .add(NewTask::titled("Alice private"), now())
            .unwrap();

        store.save("alice@example.com", &collection).await.unwrap();

        assert!(store.load("alice_example_com").await.unwrap().is_empty());
        assert_eq!(store.load("alice@example.com").await.unwrap().len(), 1);
    }

    #[test]
    fn can_map_user_ids_into_one_segment() {
        let traversal = user_dir_name("../../etc");

        assert_eq!(traversal.len(), 64);
        assert!(traversal.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(user_dir_name(""), user_dir_name("_"));
    }
}
