use jsonwebtoken::encode;

use crate::config::Config;

pub mod api;

/// Represents the currently authenticated user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: Option<String>,
}

impl CurrentUser {
    /// Creates a new CurrentUser instance.
    pub fn new(user_id: String, email: Option<String>) -> Self {
        Self { user_id, email }
    }
}

/// Authentication state holding the secret the identity provider signs tokens with.
#[derive(Clone)]
pub struct AuthState {
    pub jwt_secret: String,
}

impl AuthState {
    /// Creates a new AuthState from the application config.
    pub fn from_config(config: &Config) -> Self {
        Self {
            jwt_secret: config.jwt_secret.clone(),
        }
    }
}

#[derive(serde::Serialize, serde::Deserialize, Debug)]
pub struct Claims {
    pub sub: String, // User id assigned by the identity provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    pub exp: usize, // Expiry time of the token
    pub iat: usize, // Issued at time of the token
}

impl From<Claims> for CurrentUser {
    fn from(claims: Claims) -> Self {
        CurrentUser::new(claims.sub, claims.email)
    }
}

pub async fn encode_jwt(
    user_id: String,
    email: Option<String>,
    jwt_secret: &str,
) -> anyhow::Result<String> {
    let now = chrono::Utc::now();
    let expire = chrono::Duration::hours(24);
    let exp = (now + expire).timestamp() as usize;
    let iat = now.timestamp() as usize;
    let claims = Claims {
        sub: user_id,
        email,
        exp,
        iat,
    };
    let jwt = encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(jwt_secret.as_bytes()),
    )?;
    Ok(jwt)
}

/// Verifies an HS256 token. The audience claim is not checked.
pub async fn decode_jwt(token: &str, jwt_secret: &str) -> anyhow::Result<Claims> {
    let mut validation = jsonwebtoken::Validation::default();
    validation.validate_aud = false;
    let token_data = jsonwebtoken::decode(
        token,
        &jsonwebtoken::DecodingKey::from_secret(jwt_secret.as_bytes()),
        &validation,
    )?;
    Ok(token_data.claims)
}
