use std::sync::Arc;

use crate::{
    auth::{self, AuthState},
    payment::api::v1::PaymentState,
    routine::api::v1::RoutineState,
    subscription::api::v1::SubscriptionState,
    suggestion::api::v1::SuggestionState,
    task::api::v1::TaskState,
};

use axum::{
    Json, Router,
    extract::{FromRequestParts, Query},
    http::{StatusCode, request::Parts},
    middleware::{from_fn, from_fn_with_state},
};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tower::ServiceBuilder;
use utoipa::ToSchema;

/// JSON error body shared by every API endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Machine-readable error code, e.g. `TASK_NOT_FOUND`
    pub error: String,
    /// Human-readable description
    pub message: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            message: message.into(),
        }
    }
}

/// Error half of every handler's return type.
pub type ApiError = (StatusCode, Json<ErrorResponse>);

pub fn api_error(status: StatusCode, code: &str, message: impl Into<String>) -> ApiError {
    (status, Json(ErrorResponse::new(code, message)))
}

/// Query string extractor that rejects unparseable parameters with a JSON
/// `VALIDATION_ERROR` body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApiQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match Query::<T>::from_request_parts(parts, state).await {
            Ok(Query(value)) => Ok(ApiQuery(value)),
            Err(rejection) => {
                tracing::debug!("Rejected query string: {}", rejection.body_text());
                Err(api_error(
                    StatusCode::UNPROCESSABLE_ENTITY,
                    "VALIDATION_ERROR",
                    rejection.body_text(),
                ))
            }
        }
    }
}

/// Per-feature states the API routers are built from.
#[derive(Clone)]
pub struct ApiStates {
    pub auth: Arc<AuthState>,
    pub tasks: Arc<TaskState>,
    pub suggestions: Arc<SuggestionState>,
    pub routines: Arc<RoutineState>,
    pub subscription: Arc<SubscriptionState>,
    pub payments: Arc<PaymentState>,
}

/// Creates the API routes for JSON API endpoints.
pub fn create_api_router(states: ApiStates) -> Router {
    let protected_routes = Router::new()
        .merge(crate::task::api::v1::create_api_router(states.tasks))
        .merge(crate::suggestion::api::v1::create_api_router(states.suggestions))
        .merge(crate::routine::api::v1::create_api_router(states.routines))
        .merge(crate::subscription::api::v1::create_protected_router(
            states.subscription.clone(),
        ))
        .merge(crate::payment::api::v1::create_api_router(states.payments.clone()))
        .layer(ServiceBuilder::new().layer(from_fn(auth::api::v1::require_auth_middleware)));

    let public_routes = Router::new()
        .merge(crate::subscription::api::v1::create_public_router(
            states.subscription,
        ))
        .merge(crate::payment::api::v1::create_webhook_router(states.payments));

    let api_routes = public_routes.merge(protected_routes);
    Router::new()
        .nest("/api/v1", api_routes)
        .layer(ServiceBuilder::new().layer(from_fn_with_state(
            states.auth,
            auth::api::v1::auth_user_middleware,
        )))
}
