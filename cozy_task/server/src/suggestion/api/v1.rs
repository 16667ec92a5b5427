use crate::auth::CurrentUser;
use crate::routine::RoutineService;
use crate::subscription::SubscriptionGate;
use crate::suggestion::SuggestionService;
use crate::task::TaskServiceError;
use crate::task::api::v1::{TaskJson, TaskState};
use crate::web::api::{ApiError, ErrorResponse, api_error};
use axum::{
    Router,
    extract::{Extension, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use cozy_task_core::{SuggestionOutcome, TaskPriority, TaskSuggestion};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub struct SuggestionState {
    pub gate: Arc<SubscriptionGate>,
    pub suggestions: Arc<SuggestionService>,
    pub tasks: Arc<TaskState>,
    pub db: Arc<DatabaseConnection>,
}

/// JSON representation of an AI suggestion.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct TaskSuggestionJson {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub due_date: DateTime<Utc>,
    #[schema(value_type = String, example = "medium")]
    pub priority: TaskPriority,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub is_premium: bool,
}

impl From<TaskSuggestion> for TaskSuggestionJson {
    fn from(suggestion: TaskSuggestion) -> Self {
        Self {
            id: suggestion.id,
            title: suggestion.title,
            description: suggestion.description,
            due_date: suggestion.due_date,
            priority: suggestion.priority,
            tags: suggestion.tags,
            is_premium: suggestion.is_premium,
        }
    }
}

impl From<TaskSuggestionJson> for TaskSuggestion {
    fn from(json: TaskSuggestionJson) -> Self {
        TaskSuggestion {
            id: json.id,
            title: json.title,
            description: json.description,
            due_date: json.due_date,
            priority: json.priority,
            tags: json.tags,
            is_premium: json.is_premium,
        }
    }
}

/// API response for the suggestions endpoint.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SuggestionsResponse {
    pub suggestions: Vec<TaskSuggestionJson>,
    /// `generated` when the model answered, `default` for the canned fallback
    pub source: String,
}

impl From<SuggestionOutcome> for SuggestionsResponse {
    fn from(outcome: SuggestionOutcome) -> Self {
        let source = if outcome.is_fallback() {
            "default"
        } else {
            "generated"
        };
        Self {
            source: source.to_string(),
            suggestions: outcome
                .into_suggestions()
                .into_iter()
                .map(TaskSuggestionJson::from)
                .collect(),
        }
    }
}

/// Handler for GET /api/v1/suggestions - AI suggestions for premium users.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/suggestions",
    responses(
        (status = 200, description = "Suggestions, generated or default", body = SuggestionsResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 403, description = "Subscription not active", body = ErrorResponse),
        (status = 500, description = "Task storage failure", body = ErrorResponse)
    ),
    tag = "Suggestions"
)]
pub async fn get_suggestions_handler(
    State(state): State<Arc<SuggestionState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<SuggestionsResponse>, axum::response::Response> {
    if !state.gate.is_active(Some(&user.user_id)).await {
        return Err(premium_required().into_response());
    }

    let collection = state
        .tasks
        .service_for_tier(&user, true)
        .snapshot()
        .await
        .map_err(IntoResponse::into_response)?;

    let routines = match RoutineService::new(&state.db).get(&user.user_id).await {
        Ok(Some(routine)) if !routine.is_empty() => vec![routine],
        Ok(_) => Vec::new(),
        Err(err) => {
            tracing::warn!("Ignoring routine for {}: {}", user.user_id, err);
            Vec::new()
        }
    };

    let outcome = state
        .suggestions
        .suggest(collection.tasks(), &routines, Utc::now())
        .await;
    Ok(Json(outcome.into()))
}

/// Handler for POST /api/v1/suggestions/accept - Adds a suggestion as a pending task.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/suggestions/accept",
    request_body = TaskSuggestionJson,
    responses(
        (status = 201, description = "Task created from the suggestion", body = TaskJson),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "Empty title", body = ErrorResponse)
    ),
    tag = "Suggestions"
)]
pub async fn accept_suggestion_handler(
    State(state): State<Arc<SuggestionState>>,
    Extension(user): Extension<CurrentUser>,
    Json(suggestion): Json<TaskSuggestionJson>,
) -> Result<(StatusCode, Json<TaskJson>), TaskServiceError> {
    let input = TaskSuggestion::from(suggestion).into_new_task();
    let task = state
        .tasks
        .service_for(&user)
        .await
        .add(input, Utc::now())
        .await?;
    Ok((StatusCode::CREATED, Json(task.into())))
}

fn premium_required() -> ApiError {
    api_error(
        StatusCode::FORBIDDEN,
        "PREMIUM_REQUIRED",
        "AI suggestions require an active subscription",
    )
}

/// Creates the suggestions API router.
pub fn create_api_router(state: Arc<SuggestionState>) -> Router {
    Router::new()
        .route("/suggestions", get(get_suggestions_handler))
        .route("/suggestions/accept", post(accept_suggestion_handler))
        .with_state(state)
}
