use crate::payment::PaymentProcessor;
use async_trait::async_trait;
use cozy_task_core::Subscription;
use cozy_task_core::subscription::{BillingRecord, ProfileRecord};
use std::sync::Arc;

pub mod api;
pub mod lookup;

pub use lookup::DbSubscriptionLookup;

/// Reads the rows the subscription gate consults.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionLookup: Send + Sync {
    /// Billing columns of the user's `users` row, if the row exists.
    async fn billing_record(&self, user_id: &str) -> Result<Option<BillingRecord>, sea_orm::DbErr>;

    /// The user's legacy `user_profiles` row, if it exists.
    async fn profile_record(&self, user_id: &str) -> Result<Option<ProfileRecord>, sea_orm::DbErr>;
}

/// Decides whether a user's subscription is active.
///
/// Never fails: every lookup error is logged and treated as "not active".
pub struct SubscriptionGate {
    lookup: Arc<dyn SubscriptionLookup>,
    processor: Arc<dyn PaymentProcessor>,
}

impl SubscriptionGate {
    pub fn new(lookup: Arc<dyn SubscriptionLookup>, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self { lookup, processor }
    }

    /// Resolves the subscription for `user_id`.
    ///
    /// # Arguments
    ///
    /// * `user_id` - The authenticated user, or `None` for anonymous requests.
    ///
    /// # Returns
    ///
    /// The resolved `Subscription`; inactive when nothing says otherwise.
    #[tracing::instrument(skip(self))]
    pub async fn resolve(&self, user_id: Option<&str>) -> Subscription {
        let Some(user_id) = user_id else {
            return Subscription::inactive();
        };

        let billing = match self.lookup.billing_record(user_id).await {
            Ok(Some(billing)) => billing,
            Ok(None) => {
                tracing::debug!("No users row for {}", user_id);
                return Subscription::inactive();
            }
            Err(err) => {
                tracing::warn!("Failed to read users row for {}: {}", user_id, err);
                return Subscription::inactive();
            }
        };

        if let Some(customer_id) = billing.processor_customer() {
            match self.processor.active_subscription(customer_id).await {
                Ok(Some(found)) => {
                    if let Some(active) = Subscription::from_processor(&found.status, found.plan) {
                        return active;
                    }
                }
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!("Payment processor lookup failed for {}: {}", user_id, err)
                }
            }
        }

        if let Some(paid) = Subscription::from_billing(&billing) {
            return paid;
        }

        match self.lookup.profile_record(user_id).await {
            Ok(Some(profile)) => Subscription::from_profile(&profile, &billing),
            Ok(None) => Subscription::inactive(),
            Err(err) => {
                tracing::warn!("Failed to read profile row for {}: {}", user_id, err);
                Subscription::inactive()
            }
        }
    }

    pub async fn is_active(&self, user_id: Option<&str>) -> bool {
        self.resolve(user_id).await.is_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::{MockPaymentProcessor, PaymentError, ProcessorSubscription};
    use cozy_task_core::SubscriptionStatus;
    use mockall::predicate::eq;

    fn subscribed_billing() -> BillingRecord {
        BillingRecord {
            is_paid_user: false,
            stripe_customer_id: Some("cus_1".to_string()),
            stripe_subscription_id: Some("sub_1".to_string()),
        }
    }

    fn lookup_with(billing: Result<Option<BillingRecord>, sea_orm::DbErr>) -> MockSubscriptionLookup {
        let mut lookup = MockSubscriptionLookup::new();
        lookup.expect_billing_record().return_once(move |_| billing);
        lookup.expect_profile_record().returning(|_| Ok(None));
        lookup
    }

    #[tokio::test]
    async fn can_resolve_anonymous_user_as_inactive() {
        let gate = SubscriptionGate::new(
            Arc::new(MockSubscriptionLookup::new()),
            Arc::new(MockPaymentProcessor::new()),
        );

        assert_eq!(gate.resolve(None).await, Subscription::inactive());
    }

    #[tokio::test]
    async fn can_resolve_processor_active_user() {
        let mut processor = MockPaymentProcessor::new();
        processor
            .expect_active_subscription()
            .with(eq("cus_1"))
            .returning(|_| {
                Ok(Some(ProcessorSubscription {
                    id: "sub_1".to_string(),
                    status: "active".to_string(),
                    plan: Some("yearly".to_string()),
                    current_period_end: None,
                }))
            });
        let gate = SubscriptionGate::new(
            Arc::new(lookup_with(Ok(Some(subscribed_billing())))),
            Arc::new(processor),
        );

        let resolved = gate.resolve(Some("user-1")).await;

        assert!(resolved.is_active());
        assert_eq!(resolved.plan.as_deref(), Some("yearly"));
    }

    #[tokio::test]
    async fn can_fall_back_to_paid_flag_when_processor_fails() {
        let mut processor = MockPaymentProcessor::new();
        processor
            .expect_active_subscription()
            .returning(|_| Err(PaymentError::Processor("stripe is down".to_string())));
        let billing = BillingRecord {
            is_paid_user: true,
            ..subscribed_billing()
        };
        let gate = SubscriptionGate::new(Arc::new(lookup_with(Ok(Some(billing)))), Arc::new(processor));

        let resolved = gate.resolve(Some("user-1")).await;

        assert!(resolved.is_active());
        assert_eq!(resolved.plan.as_deref(), Some("premium"));
    }

    #[tokio::test]
    async fn can_resolve_failing_users_lookup_as_inactive() {
        let lookup = lookup_with(Err(sea_orm::DbErr::Custom("connection reset".to_string())));
        let gate = SubscriptionGate::new(Arc::new(lookup), Arc::new(MockPaymentProcessor::new()));

        assert!(!gate.is_active(Some("user-1")).await);
    }

    #[tokio::test]
    async fn can_resolve_missing_user_as_inactive() {
        let gate = SubscriptionGate::new(
            Arc::new(lookup_with(Ok(None))),
            Arc::new(MockPaymentProcessor::new()),
        );

        assert!(!gate.is_active(Some("ghost")).await);
    }

    #[tokio::test]
    async fn can_fall_back_to_profile_row() {
        let mut lookup = MockSubscriptionLookup::new();
        lookup
            .expect_billing_record()
            .returning(|_| Ok(Some(BillingRecord::default())));
        lookup.expect_profile_record().returning(|_| {
            Ok(Some(ProfileRecord {
                subscription_status: Some("active".to_string()),
                plan: Some("monthly".to_string()),
            }))
        });
        let gate = SubscriptionGate::new(Arc::new(lookup), Arc::new(MockPaymentProcessor::new()));

        let resolved = gate.resolve(Some("legacy")).await;

        assert_eq!(resolved.status, SubscriptionStatus::Active);
        assert_eq!(resolved.plan.as_deref(), Some("monthly"));
        assert!(!resolved.is_paid_user);
    }
}
