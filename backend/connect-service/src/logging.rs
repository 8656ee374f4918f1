//! Tracing subscriber setup.
//!
//! `RUST_LOG` wins when set; otherwise `LOG_LEVEL` (`error|warn|info|debug`) is the default
//! directive. Production logs are JSON lines.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::RawEnv;

pub fn init(raw: &RawEnv) {
    let level = raw.log_level();
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},actix_web=info,sqlx=warn")));

    let registry = tracing_subscriber::registry().with(env_filter);

    if raw.is_production() {
        registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_target(true),
            )
            .init();
    } else {
        registry.with(fmt::layer().with_target(true)).init();
    }
}
