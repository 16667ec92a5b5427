use super::{
    CheckoutSessionRequest, NewCustomer, PaymentError, PaymentProcessor, ProcessorSubscription,
    USER_ID_METADATA_KEY,
};
use async_trait::async_trait;
use cozy_task_core::subscription::plan_from_product_name;
use serde::Deserialize;
use serde::de::DeserializeOwned;

#[derive(Debug, Deserialize)]
struct Created {
    id: String,
}

#[derive(Debug, Deserialize)]
struct PortalSession {
    url: String,
}

#[derive(Debug, Deserialize)]
pub struct List<T> {
    pub data: Vec<T>,
}

/// Subset of a Stripe subscription object.
#[derive(Debug, Deserialize)]
pub struct StripeSubscription {
    pub id: String,
    pub status: String,
    #[serde(default)]
    pub customer: Option<String>,
    #[serde(default)]
    pub current_period_end: Option<i64>,
    pub items: List<SubscriptionItem>,
}

#[derive(Debug, Deserialize)]
pub struct SubscriptionItem {
    pub price: Price,
    #[serde(default)]
    pub current_period_end: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct Price {
    pub product: String,
}

impl StripeSubscription {
    pub fn product_id(&self) -> Option<&str> {
        self.items.data.first().map(|item| item.price.product.as_str())
    }

    /// Newer API versions report the period end per item.
    pub fn period_end(&self) -> Option<i64> {
        self.current_period_end
            .or_else(|| self.items.data.first().and_then(|i| i.current_period_end))
    }
}

#[derive(Debug, Deserialize)]
struct Product {
    name: String,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

/// Stripe REST client. Requests are form-encoded and authenticated with the secret key.
pub struct StripeClient {
    http: reqwest::Client,
    base_url: String,
    secret_key: String,
}

impl StripeClient {
    pub fn new(base_url: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            secret_key: secret_key.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.base_url, path)
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: reqwest::RequestBuilder,
    ) -> Result<T, PaymentError> {
        let response = request.bearer_auth(&self.secret_key).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.error.message)
                .unwrap_or_else(|| format!("Stripe responded with {}", status));
            return Err(PaymentError::Processor(message));
        }
        Ok(response.json::<T>().await?)
    }
}

#[async_trait]
impl PaymentProcessor for StripeClient {
    #[tracing::instrument(skip(self))]
    async fn create_customer(&self, customer: &NewCustomer) -> Result<String, PaymentError> {
        let mut form = vec![(
            format!("metadata[{}]", USER_ID_METADATA_KEY),
            customer.user_id.clone(),
        )];
        if let Some(email) = &customer.email {
            form.push(("email".to_string(), email.clone()));
        }
        let created: Created = self
            .send(self.http.post(self.url("customers")).form(&form))
            .await?;
        Ok(created.id)
    }

    #[tracing::instrument(skip(self))]
    async fn create_checkout_session(
        &self,
        request: &CheckoutSessionRequest,
    ) -> Result<String, PaymentError> {
        let metadata_key = format!("metadata[{}]", USER_ID_METADATA_KEY);
        let form = [
            ("customer", request.customer_id.as_str()),
            ("mode", "subscription"),
            ("line_items[0][price]", request.price_id.as_str()),
            ("line_items[0][quantity]", "1"),
            ("success_url", request.success_url.as_str()),
            ("cancel_url", request.cancel_url.as_str()),
            ("allow_promotion_codes", "true"),
            ("billing_address_collection", "auto"),
            (metadata_key.as_str(), request.user_id.as_str()),
        ];
        let created: Created = self
            .send(self.http.post(self.url("checkout/sessions")).form(&form))
            .await?;
        Ok(created.id)
    }

    #[tracing::instrument(skip(self))]
    async fn create_portal_session(
        &self,
        customer_id: &str,
        return_url: &str,
    ) -> Result<String, PaymentError> {
        let form = [("customer", customer_id), ("return_url", return_url)];
        let session: PortalSession = self
            .send(self.http.post(self.url("billing_portal/sessions")).form(&form))
            .await?;
        Ok(session.url)
    }

    #[tracing::instrument(skip(self))]
    async fn active_subscription(
        &self,
        customer_id: &str,
    ) -> Result<Option<ProcessorSubscription>, PaymentError> {
        let query = [
            ("customer", customer_id),
            ("status", "active"),
            ("limit", "1"),
        ];
        let subscriptions: List<StripeSubscription> = self
            .send(self.http.get(self.url("subscriptions")).query(&query))
            .await?;
        let Some(subscription) = subscriptions.data.into_iter().next() else {
            return Ok(None);
        };

        let plan = match subscription.product_id() {
            Some(product_id) => Some(self.product_plan(product_id).await?),
            None => None,
        };
        Ok(Some(ProcessorSubscription {
            current_period_end: subscription.period_end(),
            id: subscription.id,
            status: subscription.status,
            plan,
        }))
    }

    #[tracing::instrument(skip(self))]
    async fn product_plan(&self, product_id: &str) -> Result<String, PaymentError> {
        let product: Product = self
            .send(self.http.get(self.url(&format!("products/{}", product_id))))
            .await?;
        Ok(plan_from_product_name(&product.name).to_string())
    }
}
