//! Social sign-in providers.

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use thiserror::Error;

use crate::config::OAuthClientConfig;

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://openidconnect.googleapis.com/v1/userinfo";

#[derive(Debug, Clone)]
pub struct OAuthUserInfo {
    pub provider: String,
    pub email: String,
    pub email_verified: bool,
    pub display_name: Option<String>,
    pub avatar_url: Option<String>,
}

#[derive(Debug, Error)]
pub enum OAuthError {
    #[error("Failed to exchange token: {0}")]
    TokenExchange(String),

    #[error("Failed to fetch user info: {0}")]
    UserInfoFetch(String),
}

#[async_trait]
pub trait OAuthProvider: Send + Sync {
    /// Consent screen URL carrying the given `state`
    fn authorization_url(&self, state: &str) -> String;

    /// Exchange an authorization code for the user's identity
    async fn exchange_code(&self, code: &str) -> Result<OAuthUserInfo, OAuthError>;

    fn provider_name(&self) -> &str;
}

#[derive(Debug, Deserialize)]
struct GoogleTokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct GoogleUserInfo {
    email: String,
    #[serde(default)]
    email_verified: bool,
    name: Option<String>,
    picture: Option<String>,
}

pub struct GoogleOAuthProvider {
    client_id: String,
    client_secret: SecretString,
    redirect_uri: String,
    http_client: Client,
}

impl GoogleOAuthProvider {
    pub fn new(config: &OAuthClientConfig, redirect_uri: String) -> Self {
        Self {
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_uri,
            http_client: Client::new(),
        }
    }
}

#[async_trait]
impl OAuthProvider for GoogleOAuthProvider {
    fn authorization_url(&self, state: &str) -> String {
        format!(
            "{}?client_id={}&redirect_uri={}&response_type=code&scope=openid%20email%20profile&state={}",
            GOOGLE_AUTH_URL,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(&self.redirect_uri),
            urlencoding::encode(state)
        )
    }

    async fn exchange_code(&self, code: &str) -> Result<OAuthUserInfo, OAuthError> {
        let token_response = self
            .http_client
            .post(GOOGLE_TOKEN_URL)
            .form(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose_secret()),
                ("code", code),
                ("grant_type", "authorization_code"),
                ("redirect_uri", self.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("HTTP error: {}", e)))?
            .error_for_status()
            .map_err(|e| OAuthError::TokenExchange(e.to_string()))?
            .json::<GoogleTokenResponse>()
            .await
            .map_err(|e| OAuthError::TokenExchange(format!("JSON parse error: {}", e)))?;

        let user_info = self
            .http_client
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(&token_response.access_token)
            .send()
            .await
            .map_err(|e| OAuthError::UserInfoFetch(format!("HTTP error: {}", e)))?
            .json::<GoogleUserInfo>()
            .await
            .map_err(|e| OAuthError::UserInfoFetch(format!("JSON parse error: {}", e)))?;

        Ok(OAuthUserInfo {
            provider: "google".to_string(),
            email: user_info.email,
            email_verified: user_info.email_verified,
            display_name: user_info.name,
            avatar_url: user_info.picture,
        })
    }

    fn provider_name(&self) -> &str {
        "google"
    }
}
