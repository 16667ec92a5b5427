use axum::Router;
use axum::http::header;
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::sensitive_headers::SetSensitiveRequestHeadersLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::auth::AuthState;
use crate::config::{self, Config};
use crate::payment::api::v1::PaymentState;
use crate::payment::{PaymentProcessor, PaymentService, PaymentSettings, StripeClient, WebhookHandler};
use crate::routine::api::v1::RoutineState;
use crate::storage::{LocalTaskStore, RemoteTaskStore, TaskStoreSelector};
use crate::subscription::api::v1::SubscriptionState;
use crate::subscription::{DbSubscriptionLookup, SubscriptionGate};
use crate::suggestion::api::v1::SuggestionState;
use crate::suggestion::{GeminiClient, SuggestionService, TextGenerator};
use crate::task::api::v1::TaskState;

pub mod api;

use api::ApiStates;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::task::api::v1::list_tasks_handler,
        crate::task::api::v1::create_task_handler,
        crate::task::api::v1::update_task_handler,
        crate::task::api::v1::delete_task_handler,
        crate::task::api::v1::toggle_task_handler,
        crate::task::api::v1::list_tags_handler,
        crate::task::api::v1::calendar::reschedule_handler,
        crate::suggestion::api::v1::get_suggestions_handler,
        crate::suggestion::api::v1::accept_suggestion_handler,
        crate::routine::api::v1::get_routine_handler,
        crate::routine::api::v1::put_routine_handler,
        crate::subscription::api::v1::get_subscription_handler,
        crate::subscription::api::v1::get_subscription_details_handler,
        crate::payment::api::v1::create_checkout_handler,
        crate::payment::api::v1::create_portal_handler,
        crate::payment::api::v1::stripe_webhook_handler,
    ),
    tags(
        (name = "Tasks", description = "Task list operations"),
        (name = "Calendar", description = "Calendar scheduling"),
        (name = "Suggestions", description = "Premium AI task suggestions"),
        (name = "Routines", description = "Daily routine used as suggestion context"),
        (name = "Subscription", description = "Subscription status"),
        (name = "Payments", description = "Checkout, billing portal and webhooks")
    )
)]
pub struct ApiDoc;

/// Wires stores, clients and services for every API feature.
pub fn build_api_states(config: &Config, db: Arc<DatabaseConnection>) -> ApiStates {
    let stripe: Arc<dyn PaymentProcessor> = Arc::new(StripeClient::new(
        &config.stripe_base_url,
        &config.stripe_secret_key,
    ));
    let gemini: Arc<dyn TextGenerator> = Arc::new(GeminiClient::new(
        &config.gemini_base_url,
        config.gemini_api_key.clone(),
    ));
    build_api_states_with(config, db, stripe, gemini)
}

/// Like [`build_api_states`], with the outbound clients supplied by the caller.
pub fn build_api_states_with(
    config: &Config,
    db: Arc<DatabaseConnection>,
    processor: Arc<dyn PaymentProcessor>,
    generator: Arc<dyn TextGenerator>,
) -> ApiStates {
    let gate = Arc::new(SubscriptionGate::new(
        Arc::new(DbSubscriptionLookup::new(db.clone())),
        processor.clone(),
    ));
    let selector = TaskStoreSelector::new(
        gate.clone(),
        Arc::new(LocalTaskStore::new(&config.local_store_dir)),
        Arc::new(RemoteTaskStore::new(db.clone())),
    );
    let payments = Arc::new(PaymentService::new(
        db.clone(),
        processor.clone(),
        PaymentSettings::from_config(config),
    ));
    let tasks = Arc::new(TaskState { selector });

    ApiStates {
        auth: Arc::new(AuthState::from_config(config)),
        tasks: tasks.clone(),
        suggestions: Arc::new(SuggestionState {
            gate: gate.clone(),
            suggestions: Arc::new(SuggestionService::new(generator)),
            tasks,
            db: db.clone(),
        }),
        routines: Arc::new(RoutineState { db: db.clone() }),
        subscription: Arc::new(SubscriptionState {
            gate,
            payments: payments.clone(),
        }),
        payments: Arc::new(PaymentState {
            payments,
            webhooks: Arc::new(WebhookHandler::new(db, processor)),
            webhook_secret: config.stripe_webhook_secret.clone(),
        }),
    }
}

/// The full application router: health check, API, docs and HTTP layers.
pub fn create_app(states: ApiStates) -> Router {
    Router::new()
        .route("/health", axum::routing::get(health_check_handler))
        .merge(api::create_api_router(states))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(
            ServiceBuilder::new()
                .layer(SetSensitiveRequestHeadersLayer::new(std::iter::once(
                    header::AUTHORIZATION,
                )))
                .layer(TraceLayer::new_for_http())
                .layer(CorsLayer::permissive()),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: config::Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!("Web server running on http://{}", server_address);

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    if config.stripe_webhook_secret.is_none() {
        tracing::warn!("STRIPE_WEBHOOK_SECRET is not set; webhooks will be rejected");
    }
    if config.gemini_api_key.is_none() {
        tracing::warn!("GEMINI_API_KEY is not set; suggestions will use the defaults");
    }

    let app = create_app(build_api_states(&config, Arc::new(db)));

    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}
