use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Form, Json, Router};
use cozy_task_core::suggestion::GenerationSettings;
use cozy_task_server::payment::{
    CheckoutSessionRequest, NewCustomer, PaymentError, PaymentProcessor, StripeClient,
};
use cozy_task_server::suggestion::{GeminiClient, GenerationError, TextGenerator};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

mod common;

type Captured = Arc<Mutex<Vec<(String, HashMap<String, String>)>>>;

fn stripe_stub(captured: Captured) -> Router {
    Router::new()
        .route(
            "/v1/customers",
            post(
                |State(captured): State<Captured>,
                 headers: HeaderMap,
                 Form(form): Form<HashMap<String, String>>| async move {
                    let auth = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .unwrap_or_default()
                        .to_string();
                    captured.lock().unwrap().push((auth, form));
                    Json(json!({"id": "cus_123"}))
                },
            ),
        )
        .route(
            "/v1/checkout/sessions",
            post(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({"error": {"message": "No such price: 'price_missing'"}})),
                )
            }),
        )
        .route(
            "/v1/subscriptions",
            get(|Query(query): Query<HashMap<String, String>>| async move {
                if query.get("customer").map(String::as_str) != Some("cus_123") {
                    return Json(json!({"data": []}));
                }
                Json(json!({"data": [{
                    "id": "sub_9",
                    "status": "active",
                    "customer": "cus_123",
                    "items": {"data": [{
                        "price": {"product": "prod_y"},
                        "current_period_end": 1767225600
                    }]}
                }]}))
            }),
        )
        .route(
            "/v1/products/{id}",
            get(|Path(id): Path<String>| async move {
                Json(json!({"id": id, "name": "Cozy Premium Yearly"}))
            }),
        )
        .with_state(captured)
}

#[tokio::test]
async fn can_create_customer_with_user_metadata() {
    let captured = Captured::default();
    let base = common::spawn_stub(stripe_stub(captured.clone())).await;
    let client = StripeClient::new(base, "sk_test");

    let id = client
        .create_customer(&NewCustomer {
            user_id: "user-1".to_string(),
            email: Some("user-1@example.com".to_string()),
        })
        .await
        .unwrap();

    assert_eq!(id, "cus_123");
    let calls = captured.lock().unwrap();
    let (auth, form) = &calls[0];
    assert_eq!(auth, "Bearer sk_test");
    assert_eq!(form["email"], "user-1@example.com");
    assert_eq!(form["metadata[supabaseUserId]"], "user-1");
}

#[tokio::test]
async fn can_resolve_active_subscription_plan_from_product() {
    let base = common::spawn_stub(stripe_stub(Captured::default())).await;
    let client = StripeClient::new(base, "sk_test");

    let subscription = client.active_subscription("cus_123").await.unwrap().unwrap();
    let none = client.active_subscription("cus_other").await.unwrap();

    assert_eq!(subscription.id, "sub_9");
    assert_eq!(subscription.plan.as_deref(), Some("yearly"));
    assert_eq!(subscription.current_period_end, Some(1_767_225_600));
    assert!(none.is_none());
}

#[tokio::test]
async fn can_surface_processor_error_message() {
    let base = common::spawn_stub(stripe_stub(Captured::default())).await;
    let client = StripeClient::new(base, "sk_test");

    let result = client
        .create_checkout_session(&CheckoutSessionRequest {
            user_id: "user-1".to_string(),
            customer_id: "cus_123".to_string(),
            price_id: "price_missing".to_string(),
            success_url: "http://localhost/ok".to_string(),
            cancel_url: "http://localhost/cancel".to_string(),
        })
        .await;

    match result {
        Err(PaymentError::Processor(message)) => assert!(message.contains("No such price")),
        other => panic!("expected processor error, got {:?}", other),
    }
}

fn gemini_stub() -> Router {
    Router::new().route(
        "/v1beta/models/{call}",
        post(
            |Path(call): Path<String>,
             Query(query): Query<HashMap<String, String>>,
             Json(body): Json<Value>| async move {
                if query.get("key").map(String::as_str) != Some("test-key") {
                    return (
                        StatusCode::FORBIDDEN,
                        Json(json!({"error": {"message": "API key not valid"}})),
                    );
                }
                let echoed = format!(
                    "{} topK={}",
                    call, body["generationConfig"]["topK"]
                );
                (
                    StatusCode::OK,
                    Json(json!({"candidates": [{"content": {"parts": [{"text": echoed}]}}]})),
                )
            },
        ),
    )
}

#[tokio::test]
async fn can_call_generate_content_for_model() {
    let base = common::spawn_stub(gemini_stub()).await;
    let client = GeminiClient::new(base, Some("test-key".to_string()));

    let text = client
        .generate(GenerationSettings::PRIMARY_MODEL, "Suggest tasks")
        .await
        .unwrap();

    assert_eq!(text, "gemini-2.0-flash-lite:generateContent topK=40");
}

#[tokio::test]
async fn can_report_api_error_status() {
    let base = common::spawn_stub(gemini_stub()).await;
    let client = GeminiClient::new(base, Some("wrong-key".to_string()));

    let result = client
        .generate(GenerationSettings::FALLBACK_MODEL, "Suggest tasks")
        .await;

    match result {
        Err(GenerationError::Api { status, message }) => {
            assert_eq!(status, 403);
            assert_eq!(message, "API key not valid");
        }
        other => panic!("expected API error, got {:?}", other),
    }
}
