use cozy_task_core::SubscriptionStatus;
use cozy_task_server::entities::user_profile;
use cozy_task_server::subscription::{DbSubscriptionLookup, SubscriptionGate};
use cozy_task_server::user::{BillingUpdate, UserService};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;
use testcontainers_modules::{postgres, testcontainers};

mod common;

/// Test context for subscription gate tests.
pub struct TestContext {
    #[allow(dead_code)] // container is kept to ensure it's not dropped
    pub container: testcontainers::ContainerAsync<postgres::Postgres>,
    pub db: Arc<DatabaseConnection>,
    pub gate: SubscriptionGate,
}

async fn setup() -> anyhow::Result<TestContext> {
    // Allow multiple calls to init for tests.
    let _ = tracing_subscriber::fmt().try_init();
    let container = common::setup_container().await?;
    let db = Arc::new(common::setup_db(&container).await?);
    let gate = SubscriptionGate::new(
        Arc::new(DbSubscriptionLookup::new(db.clone())),
        Arc::new(common::OfflineProcessor),
    );
    Ok(TestContext { container, db, gate })
}

#[tokio::test]
async fn can_resolve_missing_user_as_inactive() {
    let ctx = setup().await.unwrap();

    let subscription = ctx.gate.resolve(Some("ghost")).await;

    assert_eq!(subscription.status, SubscriptionStatus::Inactive);
}

#[tokio::test]
async fn can_resolve_paid_flag_as_active() {
    let ctx = setup().await.unwrap();
    let users = UserService::new(&ctx.db);
    users.upsert_customer("paid", None, "cus_paid").await.unwrap();
    users.set_paid("paid", true).await.unwrap();

    let subscription = ctx.gate.resolve(Some("paid")).await;

    assert!(subscription.is_active());
    assert_eq!(subscription.plan.as_deref(), Some("premium"));
}

#[tokio::test]
async fn can_fall_back_to_profile_row() {
    let ctx = setup().await.unwrap();
    UserService::new(&ctx.db)
        .upsert_customer("legacy", None, "cus_legacy")
        .await
        .unwrap();
    user_profile::ActiveModel {
        id: Set("legacy".to_string()),
        subscription_status: Set(Some("active".to_string())),
        plan: Set(Some("yearly".to_string())),
    }
    .insert(ctx.db.as_ref())
    .await
    .unwrap();

    let subscription = ctx.gate.resolve(Some("legacy")).await;

    assert!(subscription.is_active());
    assert_eq!(subscription.plan.as_deref(), Some("yearly"));
}

#[tokio::test]
async fn can_keep_unset_billing_fields() {
    let ctx = setup().await.unwrap();
    let users = UserService::new(&ctx.db);
    users.upsert_customer("u1", None, "cus_1").await.unwrap();
    users
        .update_billing(
            "u1",
            BillingUpdate {
                is_paid_user: true,
                subscription_id: Some("sub_1".to_string()),
                subscription_status: Some("active".to_string()),
                plan: Some("monthly".to_string()),
            },
        )
        .await
        .unwrap();

    users
        .update_billing(
            "u1",
            BillingUpdate {
                is_paid_user: false,
                subscription_status: Some("inactive".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let row = users.find("u1").await.unwrap().unwrap();
    assert!(!row.is_paid_user);
    assert_eq!(row.subscription_status.as_deref(), Some("inactive"));
    assert_eq!(row.stripe_subscription_id.as_deref(), Some("sub_1"));
    assert_eq!(row.plan.as_deref(), Some("monthly"));
}
