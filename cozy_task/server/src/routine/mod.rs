use crate::entities::*;
use crate::web::api::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use chrono::Utc;
use cozy_task_core::Routine;
use sea_orm::sea_query::OnConflict;
use sea_orm::*;

pub mod api;

/// Error type for RoutineService operations.
#[derive(Debug, thiserror::Error)]
pub enum RoutineServiceError {
    #[error("Database error: {0}")]
    Database(#[from] DbErr),
}

impl IntoResponse for RoutineServiceError {
    fn into_response(self) -> Response {
        tracing::error!("Routine storage failure: {}", self);
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse::new(
                "STORAGE_ERROR",
                "Failed to access your routine",
            )),
        )
            .into_response()
    }
}

impl From<routine::Model> for Routine {
    fn from(model: routine::Model) -> Self {
        Routine {
            wake_up_time: model.wake_up_time,
            sleep_time: model.sleep_time,
            breakfast_time: model.breakfast_time,
            lunch_time: model.lunch_time,
            dinner_time: model.dinner_time,
            work_start_time: model.work_start_time,
            work_end_time: model.work_end_time,
            exercise_time: model.exercise_time,
            notes: model.notes,
        }
    }
}

/// Reads and writes the one routine row each user may have.
pub struct RoutineService<'a> {
    db: &'a DatabaseConnection,
}

impl RoutineService<'_> {
    pub fn new(db: &DatabaseConnection) -> RoutineService<'_> {
        RoutineService { db }
    }

    /// Retrieves the user's routine.
    ///
    /// # Returns
    ///
    /// `None` if the user never saved one.
    #[tracing::instrument(skip(self))]
    pub async fn get(&self, user_id: &str) -> Result<Option<Routine>, RoutineServiceError> {
        let row = routine::Entity::find_by_id(user_id.to_string())
            .one(self.db)
            .await?;
        Ok(row.map(Routine::from))
    }

    /// Replaces the user's routine.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The owner of the routine.
    /// * `routine` - The full routine; fields left empty are cleared.
    #[tracing::instrument(skip(self))]
    pub async fn put(&self, user_id: &str, routine: Routine) -> Result<Routine, RoutineServiceError> {
        let row = routine::ActiveModel {
            user_id: ActiveValue::Set(user_id.to_string()),
            wake_up_time: ActiveValue::Set(routine.wake_up_time.clone()),
            sleep_time: ActiveValue::Set(routine.sleep_time.clone()),
            breakfast_time: ActiveValue::Set(routine.breakfast_time.clone()),
            lunch_time: ActiveValue::Set(routine.lunch_time.clone()),
            dinner_time: ActiveValue::Set(routine.dinner_time.clone()),
            work_start_time: ActiveValue::Set(routine.work_start_time.clone()),
            work_end_time: ActiveValue::Set(routine.work_end_time.clone()),
            exercise_time: ActiveValue::Set(routine.exercise_time.clone()),
            notes: ActiveValue::Set(routine.notes.clone()),
            updated_at: ActiveValue::Set(Utc::now()),
        };
        routine::Entity::insert(row)
            .on_conflict(
                OnConflict::column(routine::Column::UserId)
                    .update_columns([
                        routine::Column::WakeUpTime,
                        routine::Column::SleepTime,
                        routine::Column::BreakfastTime,
                        routine::Column::LunchTime,
                        routine::Column::DinnerTime,
                        routine::Column::WorkStartTime,
                        routine::Column::WorkEndTime,
                        routine::Column::ExerciseTime,
                        routine::Column::Notes,
                        routine::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self.db)
            .await?;
        Ok(routine)
    }
}
