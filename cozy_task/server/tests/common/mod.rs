#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use cozy_task_server::config::Config;
use cozy_task_server::payment::{
    CheckoutSessionRequest, NewCustomer, PaymentError, PaymentProcessor, ProcessorSubscription,
};
use cozy_task_server::suggestion::{GenerationError, TextGenerator};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use testcontainers_modules::testcontainers::runners::AsyncRunner;
use testcontainers_modules::{postgres, testcontainers};

pub const JWT_SECRET: &str = "test_secret";
pub const WEBHOOK_SECRET: &str = "whsec_test";

pub async fn setup_container() -> anyhow::Result<testcontainers::ContainerAsync<postgres::Postgres>>
{
    let container = postgres::Postgres::default().start().await?;
    Ok(container)
}

pub async fn setup_db(
    container: &testcontainers::ContainerAsync<postgres::Postgres>,
) -> anyhow::Result<DatabaseConnection> {
    let host = container.get_host().await?;
    let port = container.get_host_port_ipv4(5432).await?;
    let db_url = format!("postgres://postgres:postgres@{}:{}/postgres", host, port);
    let db = Database::connect(&db_url).await?;
    migration::Migrator::up(&db, None).await?;
    Ok(db)
}

/// Config pointing the local store at `local_store_dir`; outbound URLs are unused placeholders.
pub fn test_config(local_store_dir: &std::path::Path) -> Config {
    Config {
        db_url: "".to_string(),
        port: 8080,
        jwt_secret: JWT_SECRET.to_string(),
        public_url: "http://localhost:3000".to_string(),
        local_store_dir: local_store_dir.to_string_lossy().to_string(),
        gemini_api_key: None,
        gemini_base_url: "http://127.0.0.1:9".to_string(),
        stripe_secret_key: "sk_test".to_string(),
        stripe_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        stripe_base_url: "http://127.0.0.1:9".to_string(),
        stripe_monthly_price_id: Some("price_monthly".to_string()),
        stripe_yearly_price_id: Some("price_yearly".to_string()),
    }
}

pub async fn bearer_token(user_id: &str) -> String {
    let token = cozy_task_server::auth::encode_jwt(
        user_id.to_string(),
        Some(format!("{}@example.com", user_id)),
        JWT_SECRET,
    )
    .await
    .unwrap();
    format!("Bearer {}", token)
}

/// Serves `router` on an ephemeral local port and returns its base URL.
pub async fn spawn_stub(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", address)
}

/// Payment processor that knows no subscriptions and names every product "Monthly".
pub struct OfflineProcessor;

#[async_trait]
impl PaymentProcessor for OfflineProcessor {
    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, PaymentError> {
        Ok(format!("cus_{}", customer.user_id))
    }

    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<String, PaymentError> {
        Ok(format!("cs_{}", request.price_id))
    }

    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, PaymentError> {
        Ok(format!("https://billing.example.com/{}?return={}", customer_id, return_url))
    }

    async fn active_subscription(
        &self,
        _customer_id: &str,
    ) -> Result<Option<ProcessorSubscription>, PaymentError> {
        Ok(None)
    }

    async fn product_plan(&self, _product_id: &str) -> Result<String, PaymentError> {
        Ok("monthly".to_string())
    }
}

/// Generator that always answers with the same text.
pub struct CannedGenerator(pub &'static str);

#[async_trait]
impl TextGenerator for CannedGenerator {
    async fn generate(&self, _model: &str, _prompt: &str) -> Result<String, GenerationError> {
        Ok(self.0.to_string())
    }
}
