//! Stripe webhook verification and subscription lifecycle handling.

use super::stripe::StripeSubscription;
use super::{PaymentError, PaymentProcessor, USER_ID_METADATA_KEY};
use crate::user::{BillingUpdate, UserService};
use cozy_task_core::SubscriptionStatus;
use hmac::{Hmac, Mac};
use sea_orm::DatabaseConnection;
use serde::Deserialize;
use sha2::Sha256;
use std::collections::HashMap;
use std::sync::Arc;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Maximum age of a signed payload, in seconds.
pub const SIGNATURE_TOLERANCE_SECS: i64 = 300;

pub const CHECKOUT_SESSION_COMPLETED: &str = "checkout.session.completed";
pub const SUBSCRIPTION_CREATED: &str = "customer.subscription.created";
pub const SUBSCRIPTION_UPDATED: &str = "customer.subscription.updated";
pub const SUBSCRIPTION_DELETED: &str = "customer.subscription.deleted";

#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Missing Stripe-Signature header")]
    MissingSignature,
    #[error("Malformed Stripe-Signature header")]
    MalformedSignature,
    #[error("Signature timestamp is outside the tolerance window")]
    Expired,
    #[error("No signature matches the payload")]
    SignatureMismatch,
    #[error("Webhook secret is not configured")]
    NotConfigured,
    #[error("Invalid webhook secret: {0}")]
    InvalidSecret(String),
    #[error("Invalid event payload: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error(transparent)]
    Payment(#[from] PaymentError),
}

fn mac_for(secret: &str, timestamp: i64, payload: &[u8]) -> Result<HmacSha256, WebhookError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|err| WebhookError::InvalidSecret(err.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac)
}

/// Builds a `Stripe-Signature` header value for `payload`.
pub fn sign_payload(payload: &[u8], secret: &str, timestamp: i64) -> Result<String, WebhookError> {
    let digest = mac_for(secret, timestamp, payload)?.finalize().into_bytes();
    Ok(format!("t={},v1={}", timestamp, hex::encode(digest)))
}

/// Checks a `Stripe-Signature` header (`t=<unix>,v1=<hex>[,v1=...]`) against `payload`.
pub fn verify_signature(
    payload: &[u8],
    header: &str,
    secret: &str,
    now: i64,
) -> Result<(), WebhookError> {
    let mut timestamp = None;
    let mut signatures = Vec::new();
    for part in header.split(',') {
        match part.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(
                    value
                        .parse::<i64>()
                        .map_err(|_| WebhookError::MalformedSignature)?,
                )
            }
            Some(("v1", value)) => signatures.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp.ok_or(WebhookError::MalformedSignature)?;
    if signatures.is_empty() {
        return Err(WebhookError::MalformedSignature);
    }
    let age = now
        .checked_sub(timestamp)
        .map(i64::unsigned_abs)
        .ok_or(WebhookError::Expired)?;
    if age > SIGNATURE_TOLERANCE_SECS.unsigned_abs() {
        return Err(WebhookError::Expired);
    }

    let expected = mac_for(secret, timestamp, payload)?.finalize().into_bytes();
    let matched = signatures
        .iter()
        .filter_map(|candidate| hex::decode(candidate).ok())
        .any(|candidate| bool::from(candidate.as_slice().ct_eq(expected.as_slice())));
    if matched {
        Ok(())
    } else {
        Err(WebhookError::SignatureMismatch)
    }
}

#[derive(Debug, Deserialize)]
pub struct WebhookEvent {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub data: EventData,
}

#[derive(Debug, Deserialize)]
pub struct EventData {
    pub object: serde_json::Value,
}

#[derive(Debug, Deserialize)]
struct CheckoutSession {
    #[serde(default)]
    metadata: HashMap<String, String>,
}

/// Applies subscription lifecycle events to the `users` table.
pub struct WebhookHandler {
    db: Arc<DatabaseConnection>,
    processor: Arc<dyn PaymentProcessor>,
}

impl WebhookHandler {
    pub fn new(db: Arc<DatabaseConnection>, processor: Arc<dyn PaymentProcessor>) -> Self {
        Self { db, processor }
    }

    /// Handles a verified event. Unknown event types are ignored.
    #[tracing::instrument(skip(self, event), fields(id = %event.id, event_type = %event.event_type))]
    pub async fn handle(&self, event: WebhookEvent) -> Result<(), WebhookError> {
        match event.event_type.as_str() {
            CHECKOUT_SESSION_COMPLETED => {
                let session: CheckoutSession = serde_json::from_value(event.data.object)?;
                self.checkout_completed(session).await
            }
            SUBSCRIPTION_CREATED | SUBSCRIPTION_UPDATED => {
                let subscription: StripeSubscription = serde_json::from_value(event.data.object)?;
                self.subscription_changed(subscription).await
            }
            SUBSCRIPTION_DELETED => {
                let subscription: StripeSubscription = serde_json::from_value(event.data.object)?;
                self.subscription_deleted(subscription).await
            }
            other => {
                tracing::debug!("Ignoring webhook event type {}", other);
                Ok(())
            }
        }
    }

    async fn checkout_completed(&self, session: CheckoutSession) -> Result<(), WebhookError> {
        let Some(user_id) = session.metadata.get(USER_ID_METADATA_KEY) else {
            tracing::warn!("Checkout session without {} metadata", USER_ID_METADATA_KEY);
            return Ok(());
        };
        if !UserService::new(&self.db).set_paid(user_id, true).await? {
            tracing::warn!("Checkout completed for unknown user {}", user_id);
        }
        Ok(())
    }

    async fn subscription_changed(
        &self,
        subscription: StripeSubscription,
    ) -> Result<(), WebhookError> {
        let Some(user_id) = self.user_for(&subscription).await? else {
            return Ok(());
        };
        let plan = match subscription.product_id() {
            Some(product_id) => Some(self.processor.product_plan(product_id).await?),
            None => None,
        };
        let is_active =
            SubscriptionStatus::from_label(&subscription.status) == SubscriptionStatus::Active;
        UserService::new(&self.db)
            .update_billing(
                &user_id,
                BillingUpdate {
                    is_paid_user: is_active,
                    subscription_id: Some(subscription.id),
                    subscription_status: Some(subscription.status),
                    plan,
                },
            )
            .await?;
        Ok(())
    }

    async fn subscription_deleted(
        &self,
        subscription: StripeSubscription,
    ) -> Result<(), WebhookError> {
        let Some(user_id) = self.user_for(&subscription).await? else {
            return Ok(());
        };
        UserService::new(&self.db)
            .update_billing(
                &user_id,
                BillingUpdate {
                    is_paid_user: false,
                    subscription_status: Some(SubscriptionStatus::Inactive.as_str().to_string()),
                    ..Default::default()
                },
            )
            .await?;
        Ok(())
    }

    async fn user_for(
        &self,
        subscription: &StripeSubscription,
    ) -> Result<Option<String>, WebhookError> {
        let Some(customer_id) = subscription.customer.as_deref() else {
            tracing::warn!("Subscription {} has no customer", subscription.id);
            return Ok(None);
        };
        let user = UserService::new(&self.db)
            .find_by_customer(customer_id)
            .await?;
        if user.is_none() {
            tracing::warn!("No user for customer {}", customer_id);
        }
        Ok(user.map(|u| u.user_id))
    }
}
