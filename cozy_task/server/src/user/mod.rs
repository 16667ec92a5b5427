use crate::entities::*;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::*;

/// Billing columns written after a subscription change.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BillingUpdate {
    pub is_paid_user: bool,
    pub subscription_id: Option<String>,
    pub subscription_status: Option<String>,
    pub plan: Option<String>,
}

/// Reads and writes the `users` table.
pub struct UserService<'a> {
    db: &'a DatabaseConnection,
}

impl UserService<'_> {
    pub fn new(db: &DatabaseConnection) -> UserService<'_> {
        UserService { db }
    }

    #[tracing::instrument(skip(self))]
    pub async fn find(&self, user_id: &str) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find_by_id(user_id.to_string())
            .one(self.db)
            .await
    }

    #[tracing::instrument(skip(self))]
    pub async fn find_by_customer(&self, customer_id: &str) -> Result<Option<user::Model>, DbErr> {
        user::Entity::find()
            .filter(user::Column::StripeCustomerId.eq(customer_id))
            .one(self.db)
            .await
    }

    /// Records the processor customer for a user, creating the row if needed.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The user the customer belongs to.
    /// * `email` - The user's email, stored when the row is created.
    /// * `customer_id` - The processor's customer id.
    #[tracing::instrument(skip(self))]
    pub async fn upsert_customer(
        &self,
        user_id: &str,
        email: Option<&str>,
        customer_id: &str,
    ) -> Result<(), DbErr> {
        let now = Utc::now();
        let row = user::ActiveModel {
            user_id: ActiveValue::Set(user_id.to_string()),
            email: ActiveValue::Set(email.map(str::to_string)),
            is_paid_user: ActiveValue::Set(false),
            stripe_customer_id: ActiveValue::Set(Some(customer_id.to_string())),
            stripe_subscription_id: ActiveValue::Set(None),
            subscription_status: ActiveValue::Set(None),
            plan: ActiveValue::Set(None),
            created_at: ActiveValue::Set(now),
            updated_at: ActiveValue::Set(now),
        };
        user::Entity::insert(row)
            .on_conflict(
                OnConflict::column(user::Column::UserId)
                    .update_columns([user::Column::StripeCustomerId, user::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(self.db)
            .await?;
        Ok(())
    }

    /// Sets only the paid flag. Returns false if the user has no row.
    #[tracing::instrument(skip(self))]
    pub async fn set_paid(&self, user_id: &str, is_paid_user: bool) -> Result<bool, DbErr> {
        let result = user::Entity::update_many()
            .col_expr(user::Column::IsPaidUser, Expr::value(is_paid_user))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(user::Column::UserId.eq(user_id))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }

    /// Writes the billing columns; `None` fields keep their stored value.
    /// Returns false if the user has no row.
    #[tracing::instrument(skip(self))]
    pub async fn update_billing(&self, user_id: &str, update: BillingUpdate) -> Result<bool, DbErr> {
        let mut query = user::Entity::update_many()
            .col_expr(user::Column::IsPaidUser, Expr::value(update.is_paid_user))
            .col_expr(user::Column::UpdatedAt, Expr::value(Utc::now()));
        if let Some(subscription_id) = update.subscription_id {
            query = query.col_expr(
                user::Column::StripeSubscriptionId,
                Expr::value(subscription_id),
            );
        }
        if let Some(status) = update.subscription_status {
            query = query.col_expr(user::Column::SubscriptionStatus, Expr::value(status));
        }
        if let Some(plan) = update.plan {
            query = query.col_expr(user::Column::Plan, Expr::value(plan));
        }
        let result = query
            .filter(user::Column::UserId.eq(user_id))
            .exec(self.db)
            .await?;
        Ok(result.rows_affected > 0)
    }
}
