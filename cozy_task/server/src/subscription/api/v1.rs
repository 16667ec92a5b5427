use crate::auth::CurrentUser;
use crate::payment::api::v1::payment_error_response;
use crate::payment::{PaymentService, SubscriptionDetails};
use crate::subscription::SubscriptionGate;
use crate::web::api::{ApiError, ErrorResponse};
use axum::{
    Router,
    extract::{Extension, State},
    response::Json,
    routing::get,
};
use cozy_task_core::Subscription;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub struct SubscriptionState {
    pub gate: Arc<SubscriptionGate>,
    pub payments: Arc<PaymentService>,
}

/// JSON representation of a resolved subscription.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionJson {
    /// `active` or `inactive`
    status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    plan: Option<String>,
    is_paid_user: bool,
    is_active: bool,
}

impl From<Subscription> for SubscriptionJson {
    fn from(subscription: Subscription) -> Self {
        Self {
            is_active: subscription.is_active(),
            status: subscription.status.as_str().to_string(),
            plan: subscription.plan,
            is_paid_user: subscription.is_paid_user,
        }
    }
}

/// Handler for GET /api/v1/subscription - Resolves the caller's subscription.
/// Anonymous callers get an inactive subscription.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/subscription",
    responses(
        (status = 200, description = "Resolved subscription", body = SubscriptionJson)
    ),
    tag = "Subscription"
)]
pub async fn get_subscription_handler(
    State(state): State<Arc<SubscriptionState>>,
    current_user: Option<Extension<CurrentUser>>,
) -> Json<SubscriptionJson> {
    let user_id = current_user.as_ref().map(|Extension(user)| user.user_id.as_str());
    Json(state.gate.resolve(user_id).await.into())
}

/// Handler for GET /api/v1/subscription/details - Asks the processor and refreshes the cached row.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    get,
    path = "/api/v1/subscription/details",
    responses(
        (status = 200, description = "Processor-side subscription", body = SubscriptionDetails),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 502, description = "Payment processor failure", body = ErrorResponse)
    ),
    tag = "Subscription"
)]
pub async fn get_subscription_details_handler(
    State(state): State<Arc<SubscriptionState>>,
    Extension(user): Extension<CurrentUser>,
) -> Result<Json<SubscriptionDetails>, ApiError> {
    state
        .payments
        .subscription_details(&user.user_id)
        .await
        .map(Json)
        .map_err(payment_error_response)
}

/// Routes open to anonymous callers.
pub fn create_public_router(state: Arc<SubscriptionState>) -> Router {
    Router::new()
        .route("/subscription", get(get_subscription_handler))
        .with_state(state)
}

pub fn create_protected_router(state: Arc<SubscriptionState>) -> Router {
    Router::new()
        .route("/subscription/details", get(get_subscription_details_handler))
        .with_state(state)
}
