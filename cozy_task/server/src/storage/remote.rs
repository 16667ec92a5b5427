use super::{StorageKind, TaskStore, TaskStoreError};
use crate::entities::task;
use async_trait::async_trait;
use cozy_task_core::{Task, TaskCollection, TaskPriority};
use sea_orm::sea_query::OnConflict;
use sea_orm::*;
use std::sync::Arc;

/// Hosted store backed by the `tasks` table.
pub struct RemoteTaskStore {
    db: Arc<DatabaseConnection>,
}

impl RemoteTaskStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

impl TryFrom<task::Model> for Task {
    type Error = TaskStoreError;

    fn try_from(model: task::Model) -> Result<Self, Self::Error> {
        let tags: Vec<String> = serde_json::from_value(model.tags)?;
        Ok(Task::from_parts(
            model.id,
            model.title,
            model.description,
            model.status.parse()?,
            model.due_date,
            TaskPriority::from_label(&model.priority),
            tags,
            model.created_at,
            model.updated_at,
        ))
    }
}

fn to_active_model(user_id: &str, task: &Task) -> task::ActiveModel {
    task::ActiveModel {
        id: ActiveValue::Set(task.id().to_string()),
        user_id: ActiveValue::Set(user_id.to_string()),
        title: ActiveValue::Set(task.title().to_string()),
        description: ActiveValue::Set(task.description().map(str::to_string)),
        status: ActiveValue::Set(task.status().as_str().to_string()),
        due_date: ActiveValue::Set(task.due_date()),
        priority: ActiveValue::Set(task.priority().as_str().to_string()),
        tags: ActiveValue::Set(serde_json::Value::from(task.tags().to_vec())),
        created_at: ActiveValue::Set(task.created_at()),
        updated_at: ActiveValue::Set(task.updated_at()),
    }
}

#[async_trait]
impl TaskStore for RemoteTaskStore {
    #[tracing::instrument(skip(self))]
    async fn load(&self, user_id: &str) -> Result<TaskCollection, TaskStoreError> {
        let tasks = task::Entity::find()
            .filter(task::Column::UserId.eq(user_id))
            .order_by_asc(task::Column::CreatedAt)
            .order_by_asc(task::Column::Id)
            .all(self.db.as_ref())
            .await?
            .into_iter()
            .map(Task::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(TaskCollection::from_tasks(tasks))
    }

    /// Rewrites the user's rows in one transaction: rows missing from `tasks`
    /// are deleted, the rest are upserted.
    #[tracing::instrument(skip(self, tasks), fields(count = tasks.len()))]
    async fn save(&self, user_id: &str, tasks: &TaskCollection) -> Result<(), TaskStoreError> {
        let ids: Vec<String> = tasks.tasks().iter().map(|t| t.id().to_string()).collect();
        let txn = self.db.begin().await?;

        let mut stale = task::Entity::delete_many().filter(task::Column::UserId.eq(user_id));
        if !ids.is_empty() {
            stale = stale.filter(task::Column::Id.is_not_in(ids.clone()));
        }
        stale.exec(&txn).await?;

        if !ids.is_empty() {
            let models = tasks.tasks().iter().map(|t| to_active_model(user_id, t));
            task::Entity::insert_many(models)
                .on_conflict(
                    OnConflict::column(task::Column::Id)
                        .update_columns([
                            task::Column::Title,
                            task::Column::Description,
                            task::Column::Status,
                            task::Column::DueDate,
                            task::Column::Priority,
                            task::Column::Tags,
                            task::Column::UpdatedAt,
                        ])
                        .to_owned(),
                )
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        Ok(())
    }

    fn kind(&self) -> StorageKind {
        StorageKind::Remote
    }
}
