use crate::auth::CurrentUser;
use crate::routine::{RoutineService, RoutineServiceError};
use crate::web::api::ErrorResponse;
use axum::{
    Router,
    extract::{Extension, State},
    response::Json,
    routing::get,
};
use cozy_task_core::Routine;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub struct RoutineState {
    pub db: Arc<DatabaseConnection>,
}

/// JSON representation of a daily routine. Times are `HH:MM`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RoutineJson {
    #[serde(default)]
    pub wake_up_time: Option<String>,
    #[serde(default)]
    pub sleep_time: Option<String>,
    #[serde(default)]
    pub breakfast_time: Option<String>,
    #[serde(default)]
    pub lunch_time: Option<String>,
    #[serde(default)]
    pub dinner_time: Option<String>,
    #[serde(default)]
    pub work_start_time: Option<String>,
    #[serde(default)]
    pub work_end_time: Option<String>,
    #[serde(default)]
    pub exercise_time: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<Routine> for RoutineJson {
    fn from(routine: Routine) -> Self {
        Self {
            wake_up_time: routine.wake_up_time,
            sleep_time: routine.sleep_time,
            breakfast_time: routine.breakfast_time,
            lunch_time: routine.lunch_time,
            dinner_time: routine.dinner_time,
            work_start_time: routine.work_start_time,
            work_end_time: routine.work_end_time,
            exercise_time: routine.exercise_time,
            notes: routine.notes,
        }
    }
}

impl From<RoutineJson> for Routine {
    fn from(json: RoutineJson) -> Self {
        Routine {
            wake_up_time: json.wake_up_time,
            sleep_time: json.sleep_time,
            breakfast_time: json.breakfast_time,
            lunch_time: json.lunch_time,
            dinner_time: json.dinner_time,
            work_start_time: json.work_start_time,
            work_end_time: json.work_end_time,
            exercise_time: json.exercise_time,
            notes: json.notes,
        }
    }
}

/// Handler for GET /api/v1/routines - The caller's routine, empty if never saved.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/routines",
    responses(
        (status = 200, description = "The caller's routine", body = RoutineJson),
        (status = 500, description = "Routine storage failure", body = ErrorResponse)
    ),
    tag = "Routines"
)]
pub async fn get_routine_handler(
    State(state): State<Arc<RoutineState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<RoutineJson>, RoutineServiceError> {
    let routine = RoutineService::new(&state.db)
        .get(&user.user_id)
        .await?
        .unwrap_or_default();
    Ok(Json(routine.into()))
}

/// Handler for PUT /api/v1/routines - Replaces the caller's routine.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    put,
    path = "/api/v1/routines",
    request_body = RoutineJson,
    responses(
        (status = 200, description = "Routine saved", body = RoutineJson),
        (status = 500, description = "Routine storage failure", body = ErrorResponse)
    ),
    tag = "Routines"
)]
pub async fn put_routine_handler(
    State(state): State<Arc<RoutineState>>,
    Extension(user): Extension<CurrentUser>,
    Json(routine): Json<RoutineJson>,
) -> Result<Json<RoutineJson>, RoutineServiceError> {
    let saved = RoutineService::new(&state.db)
        .put(&user.user_id, routine.into())
        .await?;
    Ok(Json(saved.into()))
}

/// Creates the routines API router.
pub fn create_api_router(state: Arc<RoutineState>) -> Router {
    Router::new()
        .route("/routines", get(get_routine_handler).put(put_routine_handler))
        .with_state(state)
}
