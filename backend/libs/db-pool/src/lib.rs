//! Database connection pool management
//!
//! Provides pool creation, connect-with-retry and a lightweight health probe
//! for the Postgres-compatible database behind AlHaqq Connect.

use serde::Serialize;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Database connection pool configuration
#[derive(Clone)]
pub struct DbConfig {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Maximum number of connections
    pub max_connections: u32,
    /// Minimum number of connections
    pub min_connections: u32,
    /// Connection creation timeout (new connection to PostgreSQL)
    pub connect_timeout_secs: u64,
    /// Connection acquisition timeout (get connection from pool)
    pub acquire_timeout_secs: u64,
    /// Connection idle timeout
    pub idle_timeout_secs: u64,
    /// Connection maximum lifetime
    pub max_lifetime_secs: u64,
}

impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("database_url", &"[REDACTED]")
            .field("max_connections", &self.max_connections)
            .field("min_connections", &self.min_connections)
            .field("connect_timeout_secs", &self.connect_timeout_secs)
            .field("acquire_timeout_secs", &self.acquire_timeout_secs)
            .field("idle_timeout_secs", &self.idle_timeout_secs)
            .field("max_lifetime_secs", &self.max_lifetime_secs)
            .finish()
    }
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            database_url: String::new(),
            max_connections: 10,
            min_connections: 0,
            connect_timeout_secs: 30,
            acquire_timeout_secs: 10,
            idle_timeout_secs: 600,
            max_lifetime_secs: 1800,
        }
    }
}

impl DbConfig {
    pub fn new(database_url: impl Into<String>) -> Self {
        Self {
            database_url: database_url.into(),
            ..Self::default()
        }
    }

    /// Log pool configuration details
    pub fn log_config(&self) {
        info!(
            target: "db",
            "Database Pool Configuration: \
             max_connections={}, min_connections={}, \
             connect_timeout={}s, acquire_timeout={}s, idle_timeout={}s, max_lifetime={}s",
            self.max_connections,
            self.min_connections,
            self.connect_timeout_secs,
            self.acquire_timeout_secs,
            self.idle_timeout_secs,
            self.max_lifetime_secs
        );
    }

    fn pool_options(&self) -> PgPoolOptions {
        PgPoolOptions::new()
            .max_connections(self.max_connections)
            .min_connections(self.min_connections)
            .acquire_timeout(Duration::from_secs(self.acquire_timeout_secs))
            .idle_timeout(Duration::from_secs(self.idle_timeout_secs))
            .max_lifetime(Duration::from_secs(self.max_lifetime_secs))
            .test_before_acquire(true)
    }
}

/// Exponential backoff used while waiting for the database to come up
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub initial_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(1000),
        }
    }
}

impl RetryPolicy {
    /// Delays slept between consecutive attempts (one fewer than attempts).
    pub fn delays(&self) -> Vec<Duration> {
        let mut delays = Vec::new();
        let mut delay = self.initial_delay;
        for _ in 1..self.max_attempts {
            delays.push(delay);
            delay *= 2;
        }
        delays
    }
}

/// Create a PostgreSQL connection pool and verify it with `SELECT 1`
pub async fn create_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    debug!(
        target: "db",
        "Creating database pool: max={}, min={}, acquire_timeout={}s, verify_timeout={}s",
        config.max_connections,
        config.min_connections,
        config.acquire_timeout_secs,
        config.connect_timeout_secs,
    );

    let pool = config.pool_options().connect(&config.database_url).await?;

    match tokio::time::timeout(
        Duration::from_secs(config.connect_timeout_secs),
        sqlx::query("SELECT 1").execute(&pool),
    )
    .await
    {
        Ok(Ok(_)) => {
            info!(target: "db", "Database pool created and verified successfully");
            Ok(pool)
        }
        Ok(Err(e)) => {
            error!(target: "db", error = %e, "Database connection verification failed");
            Err(e)
        }
        Err(_) => {
            error!(
                target: "db",
                timeout_secs = config.connect_timeout_secs,
                "Database connection verification timeout"
            );
            Err(sqlx::Error::Io(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                "Database verification timeout",
            )))
        }
    }
}

/// Create a pool that connects on first use.
///
/// Used when the service must start even though the database is not reachable yet;
/// the health endpoint reports the outage.
pub fn create_lazy_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    config.pool_options().connect_lazy(&config.database_url)
}

/// Try [`create_pool`] up to `policy.max_attempts` times with doubling delays
pub async fn connect_with_retry(
    config: &DbConfig,
    policy: RetryPolicy,
) -> Result<PgPool, sqlx::Error> {
    let mut delays = policy.delays().into_iter();
    let mut attempt = 1;

    loop {
        match create_pool(config).await {
            Ok(pool) => {
                info!(target: "db", "Database connected successfully on attempt {}", attempt);
                return Ok(pool);
            }
            Err(e) => {
                warn!(target: "db", error = %e, "Database connection attempt {} failed", attempt);
                match delays.next() {
                    Some(delay) => {
                        info!(
                            target: "db",
                            "Retrying database connection in {}ms...",
                            delay.as_millis()
                        );
                        tokio::time::sleep(delay).await;
                        attempt += 1;
                    }
                    None => {
                        error!(
                            target: "db",
                            "Failed to connect to database after {} attempts", policy.max_attempts
                        );
                        return Err(e);
                    }
                }
            }
        }
    }
}

/// Result of a database round-trip check
#[derive(Debug, Clone, Serialize)]
pub struct DbHealth {
    pub connected: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Run `SELECT 1 as health_check` and measure the latency
pub async fn check_health(pool: &PgPool) -> DbHealth {
    let start = Instant::now();
    match sqlx::query("SELECT 1 as health_check").execute(pool).await {
        Ok(_) => DbHealth {
            connected: true,
            latency_ms: Some(start.elapsed().as_millis() as u64),
            error: None,
        },
        Err(e) => {
            error!(target: "db", error = %e, "Database health check failed");
            DbHealth {
                connected: false,
                latency_ms: None,
                error: Some(e.to_string()),
            }
        }
    }
}
