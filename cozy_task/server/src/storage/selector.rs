use super::TaskStore;
use crate::subscription::SubscriptionGate;
use std::sync::Arc;

/// Picks the backend for a request: premium users get the hosted store,
/// everyone else the local one.
#[derive(Clone)]
pub struct TaskStoreSelector {
    gate: Arc<SubscriptionGate>,
    local: Arc<dyn TaskStore>,
    remote: Arc<dyn TaskStore>,
}

impl TaskStoreSelector {
    pub fn new(
        gate: Arc<SubscriptionGate>,
        local: Arc<dyn TaskStore>,
        remote: Arc<dyn TaskStore>,
    ) -> Self {
        Self {
            gate,
            local,
            remote,
        }
    }

    #[tracing::instrument(skip(self))]
    pub async fn select(&self, user_id: &str) -> Arc<dyn TaskStore> {
        self.store_for(self.gate.is_active(Some(user_id)).await)
    }

    /// The store for a tier the caller has already resolved.
    pub fn store_for(&self, premium: bool) -> Arc<dyn TaskStore> {
        if premium {
            self.remote.clone()
        } else {
            self.local.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payment::MockPaymentProcessor;
    use crate::storage::{MockTaskStore, StorageKind};
    use crate::subscription::MockSubscriptionLookup;
    use cozy_task_core::subscription::{BillingRecord, ProfileRecord};

    fn store(kind: StorageKind) -> Arc<dyn TaskStore> {
        let mut store = MockTaskStore::new();
        store.expect_kind().return_const(kind);
        Arc::new(store)
    }

    fn selector(is_paid_user: bool) -> TaskStoreSelector {
        let mut lookup = MockSubscriptionLookup::new();
        lookup.expect_billing_record().returning(move |_| {
            Ok(Some(BillingRecord {
                is_paid_user,
                ..Default::default()
            }))
        });
        lookup
            .expect_profile_record()
            .returning(|_| Ok(Some(ProfileRecord::default())));
        let gate = SubscriptionGate::new(Arc::new(lookup), Arc::new(MockPaymentProcessor::new()));
        TaskStoreSelector::new(
            Arc::new(gate),
            store(StorageKind::Local),
            store(StorageKind::Remote),
        )
    }

    #[tokio::test]
    async fn can_select_remote_store_for_premium_user() {
        let chosen = selector(true).select("user-1").await;
        assert_eq!(chosen.kind(), StorageKind::Remote);
    }

    #[tokio::test]
    async fn can_select_local_store_for_free_user() {
        let chosen = selector(false).select("user-1").await;
        assert_eq!(chosen.kind(), StorageKind::Local);
    }

    #[test]
    fn can_pick_store_for_known_tier_without_lookup() {
        let gate = SubscriptionGate::new(
            Arc::new(MockSubscriptionLookup::new()),
            Arc::new(MockPaymentProcessor::new()),
        );
        let selector = TaskStoreSelector::new(
            Arc::new(gate),
            store(StorageKind::Local),
            store(StorageKind::Remote),
        );

        assert_eq!(selector.store_for(true).kind(), StorageKind::Remote);
        assert_eq!(selector.store_for(false).kind(), StorageKind::Local);
    }
}
