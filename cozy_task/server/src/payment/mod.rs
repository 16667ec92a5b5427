use crate::auth::CurrentUser;
use crate::config::Config;
use crate::user::{BillingUpdate, UserService};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use cozy_task_core::subscription::{PLAN_MONTHLY, PLAN_YEARLY};
use cozy_task_core::SubscriptionStatus;
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub mod api;
pub mod stripe;
pub mod webhook;

pub use stripe::StripeClient;
pub use webhook::WebhookHandler;

/// Metadata key linking processor objects back to our user id.
pub const USER_ID_METADATA_KEY: &str = "supabaseUserId";

/// Error type for payment operations.
#[derive(Debug, thiserror::Error)]
pub enum PaymentError {
    #[error("Payment processor request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The processor answered with an error.
    #[error("Payment processor error: {0}")]
    Processor(String),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("No price configured for plan '{0}'")]
    UnknownPlan(String),
    #[error("User has no billing account")]
    NoCustomer,
}

/// A subscription as reported by the processor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessorSubscription {
    pub id: String,
    pub status: String,
    /// `monthly` or `yearly`, derived from the product name.
    pub plan: Option<String>,
    /// Unix seconds.
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCustomer {
    pub user_id: String,
    pub email: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSessionRequest {
    pub user_id: String,
    pub customer_id: String,
    pub price_id: String,
    pub success_url: String,
    pub cancel_url: String,
}

/// Outbound calls to the payment processor.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PaymentProcessor: Send + Sync {
    /// Creates a customer and returns its id.
    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, PaymentError>;

    /// Creates a subscription-mode checkout session and returns its id.
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<String, PaymentError>;

    /// Creates a billing portal session and returns its URL.
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, PaymentError>;

    /// The customer's first active subscription, with its plan resolved.
    async fn active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<ProcessorSubscription>, PaymentError>;

    /// Plan name for a product id.
    async fn product_plan(&self, product_id: &str) -> Result<String, PaymentError>;
}

/// Request body for starting a checkout.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutOptions {
    /// Explicit processor price id. Takes precedence over `plan`.
    #[serde(default)]
    pub price_id: Option<String>,
    /// `monthly` or `yearly`.
    #[serde(default)]
    pub plan: Option<String>,
    #[serde(default)]
    pub success_url: Option<String>,
    #[serde(default)]
    pub cancel_url: Option<String>,
}

/// Processor-side view of a user's subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionDetails {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subscription_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_period_end: Option<DateTime<Utc>>,
}

impl SubscriptionDetails {
    pub fn inactive() -> Self {
        Self {
            status: SubscriptionStatus::Inactive.as_str().to_string(),
            plan: None,
            subscription_id: None,
            current_period_end: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub public_url: String,
    pub monthly_price_id: Option<String>,
    pub yearly_price_id: Option<String>,
}

impl PaymentSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            public_url: config.public_url.trim_end_matches('/').to_string(),
            monthly_price_id: config.stripe_monthly_price_id.clone(),
            yearly_price_id: config.stripe_yearly_price_id.clone(),
        }
    }

    fn price_for_plan(&self, plan: &str) -> Option<&str> {
        match plan {
            PLAN_MONTHLY => self.monthly_price_id.as_deref(),
            PLAN_YEARLY => self.yearly_price_id.as_deref(),
            _ => None,
        }
    }
}

/// Checkout, portal and subscription-detail flows for the current user.
pub struct PaymentService {
    db: Arc<DatabaseConnection>,
    processor: Arc<dyn PaymentProcessor>,
    settings: PaymentSettings,
}

impl PaymentService {
    pub fn new(
        db: Arc<DatabaseConnection>,
        processor: Arc<dyn PaymentProcessor>,
        settings: PaymentSettings,
    ) -> Self {
        Self {
            db,
            processor,
            settings,
        }
    }

    /// Starts a subscription checkout, creating the processor customer on first use.
    ///
    /// # Arguments
    ///
    /// * `user` - The authenticated user.
    /// * `options` - Price or plan, plus optional redirect URLs.
    ///
    /// # Returns
    ///
    /// The checkout session id.
    #[tracing::instrument(skip(self))]
    pub async fn create_checkout_session(
        &self,
        user: &CurrentUser,
        options: CheckoutOptions,
    ) -> Result<String, PaymentError> {
        let price_id = match (options.price_id, options.plan) {
            (Some(price_id), _) => price_id,
            (None, Some(plan)) => self
                .settings
                .price_for_plan(&plan)
                .map(str::to_string)
                .ok_or(PaymentError::UnknownPlan(plan))?,
            (None, None) => self
                .settings
                .price_for_plan(PLAN_MONTHLY)
                .map(str::to_string)
                .ok_or_else(|| PaymentError::UnknownPlan(PLAN_MONTHLY.to_string()))?,
        };

        let customer_id = self.ensure_customer(user).await?;
        let request = CheckoutSessionRequest {
            user_id: user.user_id.clone(),
            customer_id,
            price_id,
            success_url: options.success_url.unwrap_or_else(|| {
                format!("{}/settings?subscription=success", self.settings.public_url)
            }),
            cancel_url: options.cancel_url.unwrap_or_else(|| {
                format!("{}/settings?subscription=cancelled", self.settings.public_url)
            }),
        };
        let session_id = self.processor.create_checkout_session(&request).await?;
        tracing::info!("Created checkout session {} for {}", session_id, user.user_id);
        Ok(session_id)
    }

    /// Opens the processor's billing portal for an existing customer.
    #[tracing::instrument(skip(self))]
    pub async fn create_portal_session(
        &self,
        user: &CurrentUser,
        return_url: Option<String>,
    ) -> Result<String, PaymentError> {
        let customer_id = UserService::new(&self.db)
            .find(&user.user_id)
            .await?
            .and_then(|row| row.stripe_customer_id)
            .ok_or(PaymentError::NoCustomer)?;
        let return_url =
            return_url.unwrap_or_else(|| format!("{}/settings", self.settings.public_url));
        self.processor
            .create_portal_session(&customer_id, &return_url)
            .await
    }

    /// Asks the processor for the user's subscription and caches the answer on the users row.
    #[tracing::instrument(skip(self))]
    pub async fn subscription_details(
        &self,
        user_id: &str,
    ) -> Result<SubscriptionDetails, PaymentError> {
        let users = UserService::new(&self.db);
        let Some(customer_id) = users
            .find(user_id)
            .await?
            .and_then(|row| row.stripe_customer_id)
        else {
            return Ok(SubscriptionDetails::inactive());
        };

        let Some(subscription) = self.processor.active_subscription(&customer_id).await? else {
            users.set_paid(user_id, false).await?;
            return Ok(SubscriptionDetails::inactive());
        };

        let is_active = SubscriptionStatus::from_label(&subscription.status)
            == SubscriptionStatus::Active;
        users
            .update_billing(
                user_id,
                BillingUpdate {
                    is_paid_user: is_active,
                    subscription_id: Some(subscription.id.clone()),
                    subscription_status: Some(subscription.status.clone()),
                    plan: subscription.plan.clone(),
                },
            )
            .await?;

        Ok(SubscriptionDetails {
            status: subscription.status,
            plan: subscription.plan,
            subscription_id: Some(subscription.id),
            current_period_end: subscription
                .current_period_end
                .and_then(|secs| DateTime::from_timestamp(secs, 0)),
        })
    }

    async fn ensure_customer(&self, user: &CurrentUser) -> Result<String, PaymentError> {
        let users = UserService::new(&self.db);
        if let Some(existing) = users
            .find(&user.user_id)
            .await?
            .and_then(|row| row.stripe_customer_id)
        {
            return Ok(existing);
        }

        let customer_id = self
            .processor
            .create_customer(&NewCustomer {
                user_id: user.user_id.clone(),
                email: user.email.clone(),
            })
            .await?;
        users
            .upsert_customer(&user.user_id, user.email.as_deref(), &customer_id)
            .await?;
        tracing::info!("Created processor customer {} for {}", customer_id, user.user_id);
        Ok(customer_id)
    }
}
