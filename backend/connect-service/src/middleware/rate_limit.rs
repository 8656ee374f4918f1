//! Per-client rate limiting.
//!
//! A `governor` token bucket keyed by client IP: `max_requests` tokens, refilled evenly across
//! `window_ms`. The client IP is the first `X-Forwarded-For` entry, falling back to the peer
//! address. Requests over budget get 429 with `Retry-After`. Every [`PRUNE_EVERY`] checks the
//! keys whose buckets have fully refilled are dropped, so rotating client IPs cannot grow the
//! key map without bound.

use actix_web::{
    body::{BoxBody, MessageBody},
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    Error, ResponseError,
};
use futures::future::LocalBoxFuture;
use governor::{
    clock::{Clock, DefaultClock},
    DefaultKeyedRateLimiter, Quota, RateLimiter,
};
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

use crate::config::RateLimitConfig;
use crate::error::AppError;

/// Paths never counted against the budget
const EXEMPT_PATHS: &[&str] = &["/api/health"];

/// Checks between two sweeps of idle keys
pub const PRUNE_EVERY: u64 = 1024;

#[derive(Clone)]
pub struct RateLimitMiddleware {
    limiter: Arc<DefaultKeyedRateLimiter<String>>,
    clock: DefaultClock,
    checks: Arc<AtomicU64>,
}

impl RateLimitMiddleware {
    pub fn new(config: RateLimitConfig) -> Self {
        let burst = NonZeroU32::new(config.max_requests).unwrap_or(NonZeroU32::MIN);
        let period = Duration::from_millis(config.window_ms) / burst.get();
        let quota = Quota::with_period(period)
            .unwrap_or_else(|| Quota::per_second(burst))
            .allow_burst(burst);

        Self {
            limiter: Arc::new(RateLimiter::keyed(quota)),
            clock: DefaultClock::default(),
            checks: Arc::new(AtomicU64::new(0)),
        }
    }

    /// `Ok(())` when the request may proceed, otherwise the wait before the next token.
    fn check(&self, client: &str) -> Result<(), Duration> {
        let count = self.checks.fetch_add(1, Ordering::Relaxed) + 1;
        if count % PRUNE_EVERY == 0 {
            self.prune();
        }

        self.limiter
            .check_key(&client.to_string())
            .map_err(|not_until| not_until.wait_time_from(self.clock.now()))
    }

    /// Drop clients whose bucket is full again; they are indistinguishable from new ones.
    fn prune(&self) {
        let before = self.limiter.len();
        self.limiter.retain_recent();
        self.limiter.shrink_to_fit();
        tracing::debug!(
            target: "security",
            before,
            after = self.limiter.len(),
            "Pruned idle rate limit keys"
        );
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.limiter.len()
    }
}

fn client_ip(req: &ServiceRequest) -> String {
    req.headers()
        .get("X-Forwarded-For")
        .and_then(|h| h.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .or_else(|| req.peer_addr().map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

impl<S, B> Transform<S, ServiceRequest> for RateLimitMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type InitError = ();
    type Transform = RateLimitMiddlewareService<S>;
    type Future = std::future::Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        std::future::ready(Ok(RateLimitMiddlewareService {
            service: Arc::new(service),
            state: self.clone(),
        }))
    }
}

pub struct RateLimitMiddlewareService<S> {
    service: Arc<S>,
    state: RateLimitMiddleware,
}

impl<S, B> Service<ServiceRequest> for RateLimitMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: MessageBody + 'static,
{
    type Response = ServiceResponse<BoxBody>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();

        if !EXEMPT_PATHS.contains(&req.path()) {
            let ip = client_ip(&req);
            if let Err(wait) = self.state.check(&ip) {
                warn!(target: "security", client_ip = %ip, path = %req.path(), "Rate limit exceeded");
                let retry_after = wait.as_secs_f64().ceil().max(1.0) as u64;
                let mut response = AppError::RateLimitExceeded.error_response();
                response.headers_mut().insert(
                    actix_web::http::header::RETRY_AFTER,
                    actix_web::http::header::HeaderValue::from(retry_after),
                );
                return Box::pin(async move { Ok(req.into_response(response)) });
            }
        }

        Box::pin(async move {
            let res = service.call(req).await?;
            Ok(res.map_into_boxed_body())
        })
    }
}
