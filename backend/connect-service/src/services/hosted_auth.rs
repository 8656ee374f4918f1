//! Client for the hosted authentication service (Stack Auth).
//!
//! The service owns the user's credentials; we resolve an access token to the hosted user
//! with server credentials and mirror that user locally.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

use crate::config::HostedAuthConfig;

#[derive(Debug, Error)]
pub enum HostedAuthError {
    #[error("Access token rejected")]
    Rejected,

    #[error("Hosted auth request failed: {0}")]
    Network(String),

    #[error("Unexpected hosted auth response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct HostedUser {
    pub id: String,
    pub primary_email: Option<String>,
    #[serde(default)]
    pub primary_email_verified: bool,
    pub display_name: Option<String>,
    pub profile_image_url: Option<String>,
}

#[async_trait]
pub trait HostedAuthProvider: Send + Sync {
    /// Resolve an access token to the hosted user it belongs to.
    async fn current_user(&self, access_token: &str) -> Result<HostedUser, HostedAuthError>;

    /// Fetch the project's signing keys; used as a reachability probe.
    async fn check_jwks(&self) -> Result<(), HostedAuthError>;
}

pub struct StackAuthClient {
    config: HostedAuthConfig,
    http_client: Client,
}

impl StackAuthClient {
    pub fn new(config: HostedAuthConfig) -> Self {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(5))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            config,
            http_client,
        }
    }

    fn jwks_url(&self) -> String {
        format!(
            "{}/api/v1/projects/{}/.well-known/jwks.json",
            self.config.api_url,
            urlencoding::encode(&self.config.project_id)
        )
    }
}

#[async_trait]
impl HostedAuthProvider for StackAuthClient {
    async fn current_user(&self, access_token: &str) -> Result<HostedUser, HostedAuthError> {
        let response = self
            .http_client
            .get(format!("{}/api/v1/users/me", self.config.api_url))
            .header("x-stack-access-type", "server")
            .header("x-stack-project-id", &self.config.project_id)
            .header(
                "x-stack-secret-server-key",
                self.config.secret_server_key.expose_secret(),
            )
            .header("x-stack-access-token", access_token)
            .send()
            .await
            .map_err(|e| HostedAuthError::Network(e.to_string()))?;

        match response.status() {
            status if status.is_success() => response
                .json::<HostedUser>()
                .await
                .map_err(|e| HostedAuthError::InvalidResponse(e.to_string())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                Err(HostedAuthError::Rejected)
            }
            status => Err(HostedAuthError::InvalidResponse(format!("HTTP {}", status))),
        }
    }

    async fn check_jwks(&self) -> Result<(), HostedAuthError> {
        let response = self
            .http_client
            .get(self.jwks_url())
            .send()
            .await
            .map_err(|e| HostedAuthError::Network(e.to_string()))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(HostedAuthError::InvalidResponse(format!(
                "HTTP {}",
                response.status()
            )))
        }
    }
}
