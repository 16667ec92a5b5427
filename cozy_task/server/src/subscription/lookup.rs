use super::SubscriptionLookup;
use crate::entities::user_profile;
use crate::user::UserService;
use async_trait::async_trait;
use cozy_task_core::subscription::{BillingRecord, ProfileRecord};
use sea_orm::{DatabaseConnection, DbErr, EntityTrait};
use std::sync::Arc;

/// Subscription lookups against the `users` and `user_profiles` tables.
pub struct DbSubscriptionLookup {
    db: Arc<DatabaseConnection>,
}

impl DbSubscriptionLookup {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl SubscriptionLookup for DbSubscriptionLookup {
    async fn billing_record(&self, user_id: &str) -> Result<Option<BillingRecord>, DbErr> {
        let row = UserService::new(&self.db).find(user_id).await?;
        Ok(row.map(|user| BillingRecord {
            is_paid_user: user.is_paid_user,
            stripe_customer_id: user.stripe_customer_id,
            stripe_subscription_id: user.stripe_subscription_id,
        }))
    }

    async fn profile_record(&self, user_id: &str) -> Result<Option<ProfileRecord>, DbErr> {
        let row = user_profile::Entity::find_by_id(user_id.to_string())
            .one(self.db.as_ref())
            .await?;
        Ok(row.map(|profile| ProfileRecord {
            subscription_status: profile.subscription_status,
            plan: profile.plan,
        }))
    }
}
