use crate::auth::CurrentUser;
use crate::payment::webhook::{self, WebhookError, WebhookEvent};
use crate::payment::{CheckoutOptions, PaymentError, PaymentService, WebhookHandler};
use crate::web::api::{ApiError, ErrorResponse, api_error};
use axum::{
    Router,
    body::Bytes,
    extract::{Extension, State},
    http::{HeaderMap, StatusCode},
    response::Json,
    routing::post,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

pub const STRIPE_SIGNATURE_HEADER: &str = "stripe-signature";

pub struct PaymentState {
    pub payments: Arc<PaymentService>,
    pub webhooks: Arc<WebhookHandler>,
    /// Signing secret for webhook payloads. Webhooks are rejected while unset.
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutSessionResponse {
    pub session_id: String,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PortalRequest {
    /// Where the portal sends the user back to. Defaults to the settings page.
    #[serde(default)]
    pub return_url: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PortalSessionResponse {
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookReceived {
    pub received: bool,
}

/// Webhook failures use a bare `{error}` body.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookErrorResponse {
    pub error: String,
}

pub(crate) fn payment_error_response(err: PaymentError) -> ApiError {
    match err {
        PaymentError::UnknownPlan(_) => {
            api_error(StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR", err.to_string())
        }
        PaymentError::NoCustomer => {
            api_error(StatusCode::BAD_REQUEST, "NO_CUSTOMER", err.to_string())
        }
        PaymentError::Database(_) => {
            tracing::error!("Billing storage failure: {}", err);
            api_error(
                StatusCode::INTERNAL_SERVER_ERROR,
                "STORAGE_ERROR",
                "Failed to access billing records",
            )
        }
        PaymentError::Http(_) | PaymentError::Processor(_) => {
            tracing::error!("Payment processor failure: {}", err);
            api_error(StatusCode::BAD_GATEWAY, "PAYMENT_ERROR", err.to_string())
        }
    }
}

/// Handler for POST /api/v1/payments/checkout - Starts a subscription checkout.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/payments/checkout",
    request_body = CheckoutOptions,
    responses(
        (status = 200, description = "Checkout session created", body = CheckoutSessionResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 422, description = "No price for the requested plan", body = ErrorResponse),
        (status = 502, description = "Payment processor failure", body = ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_checkout_handler(
    State(state): State<Arc<PaymentState>>,
    Extension(user): Extension<CurrentUser>,
    Json(options): Json<CheckoutOptions>,
) -> Result<Json<CheckoutSessionResponse>, ApiError> {
    let session_id = state
        .payments
        .create_checkout_session(&user, options)
        .await
        .map_err(payment_error_response)?;
    Ok(Json(CheckoutSessionResponse { session_id }))
}

/// Handler for POST /api/v1/payments/portal - Opens the billing portal.
#[tracing::instrument(skip(state))]
#[utoipa::path(
    post,
    path = "/api/v1/payments/portal",
    request_body = PortalRequest,
    responses(
        (status = 200, description = "Portal session created", body = PortalSessionResponse),
        (status = 400, description = "User has never checked out", body = ErrorResponse),
        (status = 401, description = "Not authenticated", body = ErrorResponse),
        (status = 502, description = "Payment processor failure", body = ErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn create_portal_handler(
    State(state): State<Arc<PaymentState>>,
    Extension(user): Extension<CurrentUser>,
    Json(request): Json<PortalRequest>,
) -> Result<Json<PortalSessionResponse>, ApiError> {
    let url = state
        .payments
        .create_portal_session(&user, request.return_url)
        .await
        .map_err(payment_error_response)?;
    Ok(Json(PortalSessionResponse { url }))
}

/// Handler for POST /api/v1/webhooks/stripe - Applies subscription lifecycle events.
#[tracing::instrument(skip(state, headers, body))]
#[utoipa::path(
    post,
    path = "/api/v1/webhooks/stripe",
    request_body(content = String, content_type = "application/json", description = "Raw event payload, signed in the `stripe-signature` header"),
    responses(
        (status = 200, description = "Event accepted", body = WebhookReceived),
        (status = 400, description = "Bad signature or payload", body = WebhookErrorResponse),
        (status = 500, description = "Event could not be applied", body = WebhookErrorResponse)
    ),
    tag = "Payments"
)]
pub async fn stripe_webhook_handler(
    State(state): State<Arc<PaymentState>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookReceived>, (StatusCode, Json<WebhookErrorResponse>)> {
    match receive_event(&state, &headers, &body).await {
        Ok(()) => Ok(Json(WebhookReceived { received: true })),
        Err(err) => {
            let status = match err {
                WebhookError::MissingSignature
                | WebhookError::MalformedSignature
                | WebhookError::Expired
                | WebhookError::SignatureMismatch
                | WebhookError::Payload(_) => StatusCode::BAD_REQUEST,
                WebhookError::NotConfigured
                | WebhookError::InvalidSecret(_)
                | WebhookError::Database(_)
                | WebhookError::Payment(_) => StatusCode::INTERNAL_SERVER_ERROR,
            };
            tracing::warn!("Rejected webhook: {}", err);
            Err((
                status,
                Json(WebhookErrorResponse {
                    error: format!("Webhook Error: {}", err),
                }),
            ))
        }
    }
}

async fn receive_event(
    state: &PaymentState,
    headers: &HeaderMap,
    body: &[u8],
) -> Result<(), WebhookError> {
    let secret = state
        .webhook_secret
        .as_deref()
        .ok_or(WebhookError::NotConfigured)?;
    let signature = headers
        .get(STRIPE_SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok())
        .ok_or(WebhookError::MissingSignature)?;
    webhook::verify_signature(body, signature, secret, chrono::Utc::now().timestamp())?;

    let event: WebhookEvent = serde_json::from_slice(body)?;
    state.webhooks.handle(event).await
}

/// Creates the authenticated payments router.
pub fn create_api_router(state: Arc<PaymentState>) -> Router {
    Router::new()
        .route("/payments/checkout", post(create_checkout_handler))
        .route("/payments/portal", post(create_portal_handler))
        .with_state(state)
}

/// Creates the webhook router. Requests authenticate by signature, not by token.
pub fn create_webhook_router(state: Arc<PaymentState>) -> Router {
    Router::new()
        .route("/webhooks/stripe", post(stripe_webhook_handler))
        .with_state(state)
}
