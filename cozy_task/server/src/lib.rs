pub mod config {
    use serde::Deserialize;

    #[derive(Deserialize, Debug, Clone)]
    pub struct Config {
        pub db_url: String,
        #[serde(default = "default_port")]
        pub port: u16,
        pub jwt_secret: String,
        /// Base URL the front end is served from, used for payment redirects.
        #[serde(default = "default_public_url")]
        pub public_url: String,
        #[serde(default = "default_local_store_dir")]
        pub local_store_dir: String,
        #[serde(default)]
        pub gemini_api_key: Option<String>,
        #[serde(default = "default_gemini_base_url")]
        pub gemini_base_url: String,
        #[serde(default)]
        pub stripe_secret_key: String,
        #[serde(default)]
        pub stripe_webhook_secret: Option<String>,
        #[serde(default = "default_stripe_base_url")]
        pub stripe_base_url: String,
        #[serde(default)]
        pub stripe_monthly_price_id: Option<String>,
        #[serde(default)]
        pub stripe_yearly_price_id: Option<String>,
    }

    impl Config {
        /// Loads configuration from environment variables.
        pub fn from_env() -> anyhow::Result<Self> {
            let settings = config::Config::builder()
                .add_source(config::Environment::default())
                .build()?;

            let config: Config = settings.try_deserialize()?;
            Ok(config)
        }
    }

    fn default_port() -> u16 {
        8080
    }

    fn default_public_url() -> String {
        "http://localhost:8080".to_string()
    }

    fn default_local_store_dir() -> String {
        "data".to_string()
    }

    fn default_gemini_base_url() -> String {
        "https://generativelanguage.googleapis.com".to_string()
    }

    fn default_stripe_base_url() -> String {
        "https://api.stripe.com".to_string()
    }
}

pub mod auth;
pub mod entities;
pub mod payment;
pub mod routine;
pub mod storage;
pub mod subscription;
pub mod suggestion;
pub mod task;
pub mod user;
pub mod web;
