use std::collections::HashMap;
use std::sync::Arc;

use secrecy::ExposeSecret;
use sqlx::PgPool;

use crate::config::Config;
use crate::db::Repositories;
use crate::error::Result;
use crate::health::{
    AuthProbe, DatabaseProbe, EmailProbe, HealthProbe, HealthService, HostedAuthProbe,
    StorageProbe,
};
use crate::security::SessionManager;
use crate::services::{
    GoogleOAuthProvider, HostedAuthProvider, Mailer, OAuthProvider, SmtpMailer, StackAuthClient,
};

/// Shared state handed to every handler through `web::Data`.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub repos: Repositories,
    pub sessions: Arc<SessionManager>,
    pub mailer: Arc<dyn Mailer>,
    /// Social sign-in providers keyed by the name used in `/auth/signin/{provider}`
    pub oauth: Arc<HashMap<&'static str, Arc<dyn OAuthProvider>>>,
    pub hosted_auth: Option<Arc<dyn HostedAuthProvider>>,
    pub health: Arc<HealthService>,
}

impl AppState {
    /// Wire the state from its parts. Google sign-in is registered when social login is on
    /// and Google credentials are configured.
    pub fn new(
        config: Config,
        repos: Repositories,
        mailer: Arc<dyn Mailer>,
        hosted_auth: Option<Arc<dyn HostedAuthProvider>>,
        health: HealthService,
    ) -> Self {
        let sessions = SessionManager::new(&config.auth.secret, config.auth.session_max_age_secs);

        let mut oauth: HashMap<&'static str, Arc<dyn OAuthProvider>> = HashMap::new();
        if config.features.social_login {
            if let Some(google) = &config.oauth.google {
                let redirect_uri =
                    format!("{}/api/auth/callback/google", config.app.base_url());
                oauth.insert("google", Arc::new(GoogleOAuthProvider::new(google, redirect_uri)));
            }
        }

        Self {
            config: Arc::new(config),
            repos,
            sessions: Arc::new(sessions),
            mailer,
            oauth: Arc::new(oauth),
            hosted_auth,
            health: Arc::new(health),
        }
    }

    /// Production wiring: Postgres repositories, SMTP, Stack Auth and the full probe set.
    pub fn from_pool(config: Config, pool: PgPool) -> Result<Self> {
        let mailer: Arc<dyn Mailer> = Arc::new(SmtpMailer::new(&config.email)?);
        let hosted_auth: Option<Arc<dyn HostedAuthProvider>> = config
            .hosted_auth
            .clone()
            .map(|hosted| Arc::new(StackAuthClient::new(hosted)) as Arc<dyn HostedAuthProvider>);

        let probes: Vec<Arc<dyn HealthProbe>> = vec![
            Arc::new(DatabaseProbe::new(pool.clone())),
            Arc::new(AuthProbe::new(!config.auth.secret.expose_secret().is_empty())),
            Arc::new(HostedAuthProbe::new(hosted_auth.clone())),
            Arc::new(EmailProbe::new(mailer.clone())),
            Arc::new(StorageProbe::new(&config.storage)),
        ];

        Ok(Self::new(
            config,
            Repositories::postgres(pool),
            mailer,
            hosted_auth,
            HealthService::new(probes),
        ))
    }

    /// Replace or add a social sign-in provider.
    pub fn with_oauth_provider(
        mut self,
        name: &'static str,
        provider: Arc<dyn OAuthProvider>,
    ) -> Self {
        let mut providers = (*self.oauth).clone();
        providers.insert(name, provider);
        self.oauth = Arc::new(providers);
        self
    }

    pub fn oauth_provider(&self, name: &str) -> Option<&Arc<dyn OAuthProvider>> {
        if !self.config.features.social_login {
            return None;
        }
        self.oauth.get(name)
    }
}
