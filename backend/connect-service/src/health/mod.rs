//! Dependency health checks.
//!
//! Every dependency is a [`HealthProbe`]. [`HealthService`] runs them concurrently, each under a
//! timeout, and reports `healthy` only when every critical probe is healthy.

pub mod probes;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub use probes::{AuthProbe, DatabaseProbe, EmailProbe, HostedAuthProbe, StorageProbe};

pub const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ProbeStatus {
    Healthy,
    Unhealthy,
    NotConfigured,
}

#[derive(Serialize, Debug, Clone)]
pub struct ProbeReport {
    pub status: ProbeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl ProbeReport {
    pub fn healthy(latency_ms: Option<u64>) -> Self {
        Self {
            status: ProbeStatus::Healthy,
            latency_ms,
            message: None,
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::Unhealthy,
            latency_ms: None,
            message: Some(message.into()),
        }
    }

    pub fn not_configured(message: impl Into<String>) -> Self {
        Self {
            status: ProbeStatus::NotConfigured,
            latency_ms: None,
            message: Some(message.into()),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

#[async_trait]
pub trait HealthProbe: Send + Sync {
    fn name(&self) -> &'static str;

    /// Critical probes decide the overall status
    fn critical(&self) -> bool;

    async fn check(&self) -> ProbeReport;
}

#[derive(Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum OverallStatus {
    Healthy,
    Degraded,
}

#[derive(Serialize, Debug, Clone)]
pub struct HealthReport {
    pub status: OverallStatus,
    pub timestamp: DateTime<Utc>,
    pub services: BTreeMap<&'static str, ProbeReport>,
}

impl HealthReport {
    pub fn is_healthy(&self) -> bool {
        self.status == OverallStatus::Healthy
    }
}

pub struct HealthService {
    probes: Vec<Arc<dyn HealthProbe>>,
    timeout: Duration,
}

impl HealthService {
    pub fn new(probes: Vec<Arc<dyn HealthProbe>>) -> Self {
        Self {
            probes,
            timeout: PROBE_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub async fn check(&self) -> HealthReport {
        let timeout = self.timeout;
        let results = join_all(self.probes.iter().map(|probe| async move {
            let report = match tokio::time::timeout(timeout, probe.check()).await {
                Ok(report) => report,
                Err(_) => ProbeReport::unhealthy(format!(
                    "Health check timed out after {}ms",
                    timeout.as_millis()
                )),
            };
            (probe.name(), probe.critical(), report)
        }))
        .await;

        let healthy = results
            .iter()
            .filter(|(_, critical, _)| *critical)
            .all(|(_, _, report)| report.status == ProbeStatus::Healthy);

        if !healthy {
            tracing::warn!(target: "api", "Health check degraded");
        }

        HealthReport {
            status: if healthy {
                OverallStatus::Healthy
            } else {
                OverallStatus::Degraded
            },
            timestamp: Utc::now(),
            services: results
                .into_iter()
                .map(|(name, _, report)| (name, report))
                .collect(),
        }
    }
}
