use crate::auth::CurrentUser;
use crate::storage::TaskStoreSelector;
use crate::task::{TaskService, TaskServiceError};
use crate::web::api::{ApiQuery, ErrorResponse};
use axum::{
    Router,
    extract::{Extension, Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch, post},
};
use chrono::{DateTime, Utc};
use cozy_task_core::task::present_or_null;
use cozy_task_core::{NewTask, Task, TaskFilter, TaskPatch, TaskPriority, TaskSort, TaskStatus, TaskView};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub mod analytics;
pub mod calendar;

pub struct TaskState {
    pub selector: TaskStoreSelector,
}

impl TaskState {
    /// A service bound to the store the user's tier selects.
    pub async fn service_for(&self, user: &CurrentUser) -> TaskService {
        let store = self.selector.select(&user.user_id).await;
        TaskService::new(store, user.user_id.clone())
    }

    /// Like [`TaskState::service_for`], for a caller whose tier is already resolved.
    pub fn service_for_tier(&self, user: &CurrentUser, premium: bool) -> TaskService {
        TaskService::new(self.selector.store_for(premium), user.user_id.clone())
    }
}

/// JSON representation of a Task for API responses.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskJson {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// `pending` or `completed`
    #[schema(value_type = String, example = "pending")]
    pub status: TaskStatus,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    /// `low`, `medium` or `high`
    #[schema(value_type = String, example = "medium")]
    pub priority: TaskPriority,
    pub tags: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskJson {
    fn from(task: Task) -> Self {
        Self {
            id: task.id().to_string(),
            title: task.title().to_string(),
            description: task.description().map(str::to_string),
            status: task.status(),
            due_date: task.due_date(),
            priority: task.priority(),
            tags: task.tags().to_vec(),
            created_at: task.created_at(),
            updated_at: task.updated_at(),
        }
    }
}

/// Request body for adding a task.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub status: Option<TaskStatus>,
    #[serde(default)]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl From<CreateTaskRequest> for NewTask {
    fn from(request: CreateTaskRequest) -> Self {
        NewTask {
            title: request.title,
            description: request.description,
            status: request.status.unwrap_or_default(),
            due_date: request.due_date,
            priority: request.priority.unwrap_or_default(),
            tags: request.tags,
        }
    }
}

/// Request body for a partial update. Absent fields are kept; `null` clears
/// `description` and `dueDate`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub status: Option<TaskStatus>,
    #[serde(default, deserialize_with = "present_or_null")]
    #[schema(value_type = Option<DateTime<Utc>>)]
    pub due_date: Option<Option<DateTime<Utc>>>,
    #[serde(default)]
    #[schema(value_type = Option<String>)]
    pub priority: Option<TaskPriority>,
    #[serde(default)]
    pub tags: Option<Vec<String>>,
}

impl From<UpdateTaskRequest> for TaskPatch {
    fn from(request: UpdateTaskRequest) -> Self {
        TaskPatch {
            title: request.title,
            description: request.description,
            status: request.status,
            due_date: request.due_date,
            priority: request.priority,
            tags: request.tags,
        }
    }
}

/// Query parameters for listing tasks.
#[derive(Debug, Default, Deserialize)]
pub struct TasksQuery {
    #[serde(default)]
    filter: Option<TaskFilter>,
    #[serde(default)]
    sort: Option<TaskSort>,
    #[serde(default)]
    view: Option<TaskView>,
}

/// API response for listing tasks.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TasksResponse {
    pub tasks: Vec<TaskJson>,
    pub count: usize,
    pub available_tags: Vec<String>,
    /// Echo of the requested view mode, `list` or `grid`
    #[schema(value_type = String)]
    pub view: TaskView,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TagsResponse {
    pub tags: Vec<String>,
}

/// Handler for GET /api/v1/tasks - Returns the caller's tasks, filtered and sorted.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tasks",
    params(
        ("filter" = Option<String>, Query, description = "all, completed, pending or overdue"),
        ("sort" = Option<String>, Query, description = "date, priority or alphabetical"),
        ("view" = Option<String>, Query, description = "list or grid; echoed back")
    ),
    responses(
        (status = 200, description = "Successfully retrieved tasks", body = TasksResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 500, description = "Task storage failure", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tasks_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<TasksQuery>,
) -> Result<Json<TasksResponse>, TaskServiceError> {
    let (tasks, available_tags) = state
        .service_for(&user)
        .await
        .list(
            query.filter.unwrap_or_default(),
            query.sort.unwrap_or_default(),
            Utc::now(),
        )
        .await?;
    let tasks: Vec<TaskJson> = tasks.into_iter().map(TaskJson::from).collect();
    let count = tasks.len();

    Ok(Json(TasksResponse {
        tasks,
        count,
        available_tags,
        view: query.view.unwrap_or_default(),
    }))
}

/// Handler for POST /api/v1/tasks - Adds a task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/tasks",
    request_body = CreateTaskRequest,
    responses(
        (status = 201, description = "Task created", body = TaskJson),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Empty title", body = ErrorResponse),
        (status = 500, description = "Task storage failure", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn create_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskJson>), TaskServiceError> {
    let task = state
        .service_for(&user)
        .await
        .add(request.into(), Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

/// Handler for PATCH /api/v1/tasks/{id} - Applies a partial update.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    patch,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    request_body = UpdateTaskRequest,
    responses(
        (status = 200, description = "Task updated", body = TaskJson),
        (status = 404, description = "Unknown task", body = ErrorResponse),
        (status = 422, description = "Empty title", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn update_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
    Json(request): Json<UpdateTaskRequest>,
) -> Result<Json<TaskJson>, TaskServiceError> {
    let task = state
        .service_for(&user)
        .await
        .update(&id, request.into(), Utc::now())
        .await?;
    Ok(Json(task.into()))
}

/// Handler for DELETE /api/v1/tasks/{id} - Deletes a task and returns it.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    delete,
    path = "/api/v1/tasks/{id}",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task deleted", body = TaskJson),
        (status = 404, description = "Unknown task", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn delete_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<TaskJson>, TaskServiceError> {
    let task = state.service_for(&user).await.delete(&id).await?;
    Ok(Json(task.into()))
}

/// Handler for POST /api/v1/tasks/{id}/toggle - Flips pending/completed.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/tasks/{id}/toggle",
    params(("id" = String, Path, description = "Task id")),
    responses(
        (status = 200, description = "Task toggled", body = TaskJson),
        (status = 404, description = "Unknown task", body = ErrorResponse)
    ),
    tag = "Tasks"
)]
pub async fn toggle_task_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<String>,
) -> Result<Json<TaskJson>, TaskServiceError> {
    let task = state
        .service_for(&user)
        .await
        .toggle(&id, Utc::now())
        .await?;
    Ok(Json(task.into()))
}

/// Handler for GET /api/v1/tags - Tags used across the caller's tasks.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/tags",
    responses(
        (status = 200, description = "Available tags in first-seen order", body = TagsResponse)
    ),
    tag = "Tasks"
)]
pub async fn list_tags_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<TagsResponse>, TaskServiceError> {
    let tags = state.service_for(&user).await.tags().await?;
    Ok(Json(TagsResponse { tags }))
}

/// Creates the tasks, calendar and analytics router.
pub fn create_api_router(state: Arc<TaskState>) -> Router {
    Router::new()
        .route("/tasks", get(list_tasks_handler).post(create_task_handler))
        .route(
            "/tasks/{id}",
            patch(update_task_handler).delete(delete_task_handler),
        )
        .route("/tasks/{id}/toggle", post(toggle_task_handler))
        .route("/tags", get(list_tags_handler))
        .route("/calendar/month", get(calendar::month_handler))
        .route("/calendar/week", get(calendar::week_handler))
        .route("/calendar/day", get(calendar::day_handler))
        .route("/calendar/reschedule", post(calendar::reschedule_handler))
        .route("/analytics", get(analytics::analytics_handler))
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_tell_absent_from_null_in_update_request() {
        let absent: UpdateTaskRequest = serde_json::from_str(r#"{"title":"New"}"#).unwrap();
        let cleared: UpdateTaskRequest =
            serde_json::from_str(r#"{"dueDate":null,"description":null}"#).unwrap();

        let absent = TaskPatch::from(absent);
        let cleared = TaskPatch::from(cleared);

        assert_eq!(absent.title.as_deref(), Some("New"));
        assert_eq!(absent.due_date, None);
        assert_eq!(cleared.due_date, Some(None));
        assert_eq!(cleared.description, Some(None));
    }

    #[test]
    fn can_default_create_request_fields() {
        let request: CreateTaskRequest = serde_json::from_str(r#"{"title":"Read"}"#).unwrap();

        let input = NewTask::from(request);

        assert_eq!(input.status, TaskStatus::Pending);
        assert_eq!(input.priority, TaskPriority::Medium);
        assert!(input.tags.is_empty());
    }
}
