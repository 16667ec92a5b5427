//! Calendar views over the caller's tasks. Days are UTC calendar dates.

use super::{TaskJson, TaskState};
use crate::auth::CurrentUser;
use crate::task::TaskServiceError;
use crate::web::api::{ApiQuery, ErrorResponse};
use axum::{
    extract::{Extension, State},
    response::Json,
};
use chrono::{Datelike, NaiveDate, Utc};
use cozy_task_core::calendar::{self, DayAgenda, MonthGrid, YearMonth};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

#[derive(Debug, Default, Deserialize)]
pub struct MonthQuery {
    #[serde(default)]
    year: Option<i32>,
    #[serde(default)]
    month: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DateQuery {
    /// `YYYY-MM-DD`; today when absent.
    #[serde(default)]
    date: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct WeekResponse {
    pub days: Vec<DayAgenda>,
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RescheduleRequest {
    pub task_id: String,
    /// Destination day, `YYYY-MM-DD`
    #[schema(value_type = String, example = "2025-03-14")]
    pub date: NaiveDate,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RescheduleResponse {
    pub task: TaskJson,
    /// e.g. "Task moved to Friday, March 14"
    pub message: String,
}

/// Handler for GET /api/v1/calendar/month - Six-week grid for a month.
/// Missing `year`/`month` fall back to the current month.
#[tracing::instrument(skip(state))]
pub async fn month_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<MonthQuery>,
) -> Result<Json<MonthGrid>, TaskServiceError> {
    let today = Utc::now().date_naive();
    let month = YearMonth::new(
        query.year.unwrap_or(today.year()),
        query.month.unwrap_or(today.month()),
    )?;
    let collection = state.service_for(&user).await.snapshot().await?;
    Ok(Json(calendar::month_grid(collection.tasks(), month, today)?))
}

/// Handler for GET /api/v1/calendar/week - Agenda for each day of the week (Sunday first).
#[tracing::instrument(skip(state))]
pub async fn week_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<WeekResponse>, TaskServiceError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let collection = state.service_for(&user).await.snapshot().await?;
    let days = calendar::week_of(date)?
        .into_iter()
        .map(|day| calendar::day_agenda(collection.tasks(), day))
        .collect();
    Ok(Json(WeekResponse { days }))
}

/// Handler for GET /api/v1/calendar/day - Every task due on one day.
#[tracing::instrument(skip(state))]
pub async fn day_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    ApiQuery(query): ApiQuery<DateQuery>,
) -> Result<Json<DayAgenda>, TaskServiceError> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let collection = state.service_for(&user).await.snapshot().await?;
    Ok(Json(calendar::day_agenda(collection.tasks(), date)))
}

/// Handler for POST /api/v1/calendar/reschedule - Moves a task to another day.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/calendar/reschedule",
    request_body = RescheduleRequest,
    responses(
        (status = 200, description = "Task moved", body = RescheduleResponse),
        (status = 404, description = "Unknown task", body = ErrorResponse)
    ),
    tag = "Calendar"
)]
pub async fn reschedule_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<RescheduleRequest>,
) -> Result<Json<RescheduleResponse>, TaskServiceError> {
    let task = state
        .service_for(&user)
        .await
        .reschedule(&request.task_id, request.date, Utc::now())
        .await?;
    Ok(Json(RescheduleResponse {
        task: task.into(),
        message: calendar::reschedule_message(request.date),
    }))
}
