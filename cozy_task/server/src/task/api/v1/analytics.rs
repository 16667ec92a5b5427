use super::TaskState;
use crate::auth::CurrentUser;
use crate::task::TaskServiceError;
use axum::{
    extract::{Extension, State},
    response::Json,
};
use chrono::Utc;
use cozy_task_core::analytics::AnalyticsReport;
use std::sync::Arc;

/// Handler for GET /api/v1/analytics - Productivity report over all of the caller's tasks.
#[tracing::instrument(skip(state))]
pub async fn analytics_handler(
    State(state): State<Arc<TaskState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<AnalyticsReport>, TaskServiceError> {
    let collection = state.service_for(&user).await.snapshot().await?;
    Ok(Json(AnalyticsReport::compute(collection.tasks(), Utc::now())))
}
