use crate::storage::{TaskStore, TaskStoreError};
use crate::web::api::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::{DateTime, NaiveDate, Utc};
use cozy_task_core::{
    NewTask, Task, TaskCollection, TaskError, TaskFilter, TaskPatch, TaskSort,
};
use std::sync::Arc;

pub mod api;

/// Error type for TaskService operations.
#[derive(Debug, thiserror::Error)]
pub enum TaskServiceError {
    #[error(transparent)]
    Task(#[from] TaskError),
    #[error("Task storage failed: {0}")]
    Store(#[from] TaskStoreError),
}

impl IntoResponse for TaskServiceError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            TaskServiceError::Task(TaskError::TaskNotFound(_)) => (
                StatusCode::NOT_FOUND,
                ErrorResponse::new("TASK_NOT_FOUND", self.to_string()),
            ),
            TaskServiceError::Task(_) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                ErrorResponse::new("VALIDATION_ERROR", self.to_string()),
            ),
            TaskServiceError::Store(err) => {
                tracing::error!("Task storage failure: {}", err);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorResponse::new("STORAGE_ERROR", "Failed to access your tasks"),
                )
            }
        };
        (status, Json(body)).into_response()
    }
}

/// Loads a user's collection, applies one operation, and writes the result back.
pub struct TaskService {
    store: Arc<dyn TaskStore>,
    user_id: String,
}

impl TaskService {
    pub fn new(store: Arc<dyn TaskStore>, user_id: impl Into<String>) -> Self {
        Self {
            store,
            user_id: user_id.into(),
        }
    }

    /// The user's current collection.
    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn snapshot(&self) -> Result<TaskCollection, TaskServiceError> {
        Ok(self.store.load(&self.user_id).await?)
    }

    /// Lists tasks for display.
    ///
    /// # Arguments
    ///
    /// * `filter` - Which tasks to keep.
    /// * `sort` - How to order them.
    /// * `now` - The instant overdue is judged against.
    ///
    /// # Returns
    ///
    /// The matching tasks and the tags available across the whole collection.
    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn list(
        &self,
        filter: TaskFilter,
        sort: TaskSort,
        now: DateTime<Utc>,
    ) -> Result<(Vec<Task>, Vec<String>), TaskServiceError> {
        let collection = self.snapshot().await?;
        Ok((
            collection.filtered_and_sorted(filter, sort, now),
            collection.available_tags(),
        ))
    }

    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn tags(&self) -> Result<Vec<String>, TaskServiceError> {
        Ok(self.snapshot().await?.available_tags())
    }

    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn add(&self, input: NewTask, now: DateTime<Utc>) -> Result<Task, TaskServiceError> {
        let task = self
            .apply(|collection| collection.add(input, now))
            .await?;
        tracing::info!("Added task {}", task.id());
        Ok(task)
    }

    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn update(
        &self,
        id: &str,
        patch: TaskPatch,
        now: DateTime<Utc>,
    ) -> Result<Task, TaskServiceError> {
        self.apply(|collection| collection.update(id, patch, now))
            .await
    }

    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn toggle(&self, id: &str, now: DateTime<Utc>) -> Result<Task, TaskServiceError> {
        self.apply(|collection| collection.toggle_status(id, now))
            .await
    }

    /// Moves a task to midnight (UTC) of `date`.
    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn reschedule(
        &self,
        id: &str,
        date: NaiveDate,
        now: DateTime<Utc>,
    ) -> Result<Task, TaskServiceError> {
        self.apply(|collection| collection.reschedule(id, date, now))
            .await
    }

    /// Deletes a task and returns it.
    #[tracing::instrument(skip(self), fields(user_id = %self.user_id))]
    pub async fn delete(&self, id: &str) -> Result<Task, TaskServiceError> {
        let task = self.apply(|collection| collection.delete(id)).await?;
        tracing::info!("Deleted task {}", task.id());
        Ok(task)
    }

    async fn apply<F>(&self, operation: F) -> Result<Task, TaskServiceError>
    where
        F: FnOnce(&TaskCollection) -> Result<(TaskCollection, Task), TaskError>,
    {
        let current = self.store.load(&self.user_id).await?;
        let (next, task) = operation(&current)?;
        self.store.save(&self.user_id, &next).await?;
        Ok(task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{MockTaskStore, StorageKind};
    use chrono::TimeZone;
    use cozy_task_core::{TaskPriority, TaskStatus};
    use std::sync::Mutex;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).unwrap()
    }

    /// A mock store backed by an in-memory collection so saves are visible to later loads.
    fn memory_store(initial: TaskCollection) -> (Arc<dyn TaskStore>, Arc<Mutex<TaskCollection>>) {
        let shared = Arc::new(Mutex::new(initial));
        let mut store = MockTaskStore::new();
        let for_load = shared.clone();
        store
            .expect_load()
            .returning(move |_| Ok(for_load.lock().unwrap().clone()));
        let for_save = shared.clone();
        store.expect_save().returning(move |_, tasks| {
            *for_save.lock().unwrap() = tasks.clone();
            Ok(())
        });
        store.expect_kind().return_const(StorageKind::Local);
        (Arc::new(store), shared)
    }

    #[tokio::test]
    async fn can_add_task_and_persist_collection() {
        let (store, saved) = memory_store(TaskCollection::new());
        let service = TaskService::new(store, "user-1");

        let task = service
            .add(NewTask::titled("Water the plants"), now())
            .await
            .unwrap();

        assert_eq!(task.title(), "Water the plants");
        assert_eq!(task.created_at(), task.updated_at());
        assert_eq!(saved.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn can_toggle_twice_to_restore_status() {
        let (store, _) = memory_store(TaskCollection::new());
        let service = TaskService::new(store, "user-1");
        let task = service.add(NewTask::titled("Stretch"), now()).await.unwrap();

        let once = service
            .toggle(task.id(), now() + chrono::Duration::minutes(1))
            .await
            .unwrap();
        let twice = service
            .toggle(task.id(), now() + chrono::Duration::minutes(2))
            .await
            .unwrap();

        assert_eq!(once.status(), TaskStatus::Completed);
        assert_eq!(twice.status(), TaskStatus::Pending);
        assert!(twice.updated_at() > once.updated_at());
    }

    #[tokio::test]
    async fn can_reject_unknown_task_without_saving() {
        let mut store = MockTaskStore::new();
        store
            .expect_load()
            .returning(|_| Ok(TaskCollection::new()));
        store.expect_save().never();
        let service = TaskService::new(Arc::new(store), "user-1");

        let result = service.delete("missing").await;

        assert!(matches!(
            result,
            Err(TaskServiceError::Task(TaskError::TaskNotFound(_)))
        ));
    }

    #[tokio::test]
    async fn can_list_filtered_tasks_with_all_tags() {
        let (store, _) = memory_store(TaskCollection::new());
        let service = TaskService::new(store, "user-1");
        service
            .add(
                NewTask {
                    tags: vec!["home".to_string()],
                    priority: TaskPriority::Low,
                    ..NewTask::titled("Dust shelves")
                },
                now(),
            )
            .await
            .unwrap();
        let done = service
            .add(
                NewTask {
                    tags: vec!["work".to_string()],
                    ..NewTask::titled("Send report")
                },
                now(),
            )
            .await
            .unwrap();
        service.toggle(done.id(), now()).await.unwrap();

        let (tasks, tags) = service
            .list(TaskFilter::Pending, TaskSort::Date, now())
            .await
            .unwrap();

        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].title(), "Dust shelves");
        assert_eq!(tags, vec!["home".to_string(), "work".to_string()]);
    }

    #[tokio::test]
    async fn can_map_errors_to_status_codes() {
        let not_found =
            TaskServiceError::Task(TaskError::TaskNotFound("t1".to_string())).into_response();
        let invalid = TaskServiceError::Task(TaskError::EmptyTitle).into_response();
        let storage = TaskServiceError::Store(TaskStoreError::Io(std::io::Error::other("disk")))
            .into_response();

        assert_eq!(not_found.status(), StatusCode::NOT_FOUND);
        assert_eq!(invalid.status(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(storage.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = axum::body::to_bytes(storage.into_body(), usize::MAX)
            .await
            .unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "STORAGE_ERROR");
    }
}
