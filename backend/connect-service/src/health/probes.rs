use async_trait::async_trait;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use secrecy::ExposeSecret;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Instant;

use super::{HealthProbe, ProbeReport};
use crate::config::{S3StorageConfig, StorageConfig};
use crate::services::{HostedAuthProvider, Mailer};

/// `SELECT 1` round trip against the pool
pub struct DatabaseProbe {
    pool: PgPool,
}

impl DatabaseProbe {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl HealthProbe for DatabaseProbe {
    fn name(&self) -> &'static str {
        "database"
    }

    fn critical(&self) -> bool {
        true
    }

    async fn check(&self) -> ProbeReport {
        let health = db_pool::check_health(&self.pool).await;
        if health.connected {
            ProbeReport::healthy(health.latency_ms)
        } else {
            ProbeReport::unhealthy(
                health
                    .error
                    .unwrap_or_else(|| "Database connection failed".to_string()),
            )
        }
    }
}

/// Session signing is possible only with a non-empty secret
pub struct AuthProbe {
    signing_key_present: bool,
}

impl AuthProbe {
    pub fn new(signing_key_present: bool) -> Self {
        Self {
            signing_key_present,
        }
    }
}

#[async_trait]
impl HealthProbe for AuthProbe {
    fn name(&self) -> &'static str {
        "auth"
    }

    fn critical(&self) -> bool {
        true
    }

    async fn check(&self) -> ProbeReport {
        if self.signing_key_present {
            ProbeReport::healthy(None).with_message("Session signing key configured")
        } else {
            ProbeReport::unhealthy("AUTH_SECRET is not set")
        }
    }
}

/// Hosted auth reachability; only critical when the service is configured
pub struct HostedAuthProbe {
    client: Option<Arc<dyn HostedAuthProvider>>,
}

impl HostedAuthProbe {
    pub fn new(client: Option<Arc<dyn HostedAuthProvider>>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HealthProbe for HostedAuthProbe {
    fn name(&self) -> &'static str {
        "hosted_auth"
    }

    fn critical(&self) -> bool {
        self.client.is_some()
    }

    async fn check(&self) -> ProbeReport {
        let Some(client) = &self.client else {
            return ProbeReport::not_configured("Hosted auth keys not set");
        };

        let start = Instant::now();
        match client.check_jwks().await {
            Ok(()) => ProbeReport::healthy(Some(start.elapsed().as_millis() as u64)),
            Err(e) => ProbeReport::unhealthy(e.to_string()),
        }
    }
}

pub struct EmailProbe {
    mailer: Arc<dyn Mailer>,
}

impl EmailProbe {
    pub fn new(mailer: Arc<dyn Mailer>) -> Self {
        Self { mailer }
    }
}

#[async_trait]
impl HealthProbe for EmailProbe {
    fn name(&self) -> &'static str {
        "email"
    }

    fn critical(&self) -> bool {
        false
    }

    async fn check(&self) -> ProbeReport {
        if !self.mailer.is_enabled() {
            return ProbeReport::not_configured("SMTP not configured");
        }

        let start = Instant::now();
        match self.mailer.test_connection().await {
            Ok(()) => ProbeReport::healthy(Some(start.elapsed().as_millis() as u64)),
            Err(e) => ProbeReport::unhealthy(e),
        }
    }
}

/// S3 `HeadBucket` when AWS storage is configured, else UploadThing presence
pub struct StorageProbe {
    s3: Option<(aws_sdk_s3::Client, String)>,
    uploadthing_configured: bool,
}

impl StorageProbe {
    pub fn new(config: &StorageConfig) -> Self {
        Self {
            s3: config.s3.as_ref().map(|s3| (s3_client(s3), s3.bucket.clone())),
            uploadthing_configured: config.uploadthing.is_some(),
        }
    }
}

fn s3_client(config: &S3StorageConfig) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        config.access_key_id.clone(),
        config.secret_access_key.expose_secret().to_string(),
        None,
        None,
        "connect-service",
    );

    let conf = aws_sdk_s3::Config::builder()
        .behavior_version(BehaviorVersion::latest())
        .region(Region::new(config.region.clone()))
        .credentials_provider(credentials)
        .build();

    aws_sdk_s3::Client::from_conf(conf)
}

#[async_trait]
impl HealthProbe for StorageProbe {
    fn name(&self) -> &'static str {
        "storage"
    }

    fn critical(&self) -> bool {
        false
    }

    async fn check(&self) -> ProbeReport {
        match &self.s3 {
            Some((client, bucket)) => {
                let start = Instant::now();
                match client.head_bucket().bucket(bucket).send().await {
                    Ok(_) => ProbeReport::healthy(Some(start.elapsed().as_millis() as u64))
                        .with_message(format!("S3 bucket {} reachable", bucket)),
                    Err(e) => ProbeReport::unhealthy(format!("S3 HeadBucket failed: {}", e)),
                }
            }
            None if self.uploadthing_configured => {
                ProbeReport::healthy(None).with_message("UploadThing configured")
            }
            None => ProbeReport::not_configured("No file storage configured"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::ProbeStatus;

    #[tokio::test]
    async fn test_auth_probe() {
        assert_eq!(AuthProbe::new(true).check().await.status, ProbeStatus::Healthy);
        assert_eq!(AuthProbe::new(false).check().await.status, ProbeStatus::Unhealthy);
    }

    #[tokio::test]
    async fn test_hosted_auth_probe_not_configured_is_not_critical() {
        let probe = HostedAuthProbe::new(None);
        assert!(!probe.critical());
        assert_eq!(probe.check().await.status, ProbeStatus::NotConfigured);
    }

    #[tokio::test]
    async fn test_storage_probe_without_storage() {
        let probe = StorageProbe::new(&StorageConfig {
            s3: None,
            uploadthing: None,
            max_file_size: 10,
            allowed_file_types: vec![],
        });
        assert_eq!(probe.check().await.status, ProbeStatus::NotConfigured);
    }
}
