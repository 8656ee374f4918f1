use std::io;

use actix_web::{web, App, HttpServer};
use tracing::{error, info, warn};
use tracing_actix_web::TracingLogger;

use connect_service::cli::{self, Command};
use connect_service::config::{Config, RawEnv};
use connect_service::middleware::{cors, MaintenanceMode, RateLimitMiddleware, SessionMiddleware};
use connect_service::{db, logging, routes, AppState};

fn other_error(message: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::Other, message.into())
}

#[actix_web::main]
async fn main() -> io::Result<()> {
    dotenvy::dotenv().ok();
    let command = Command::from_args(std::env::args()).map_err(other_error)?;
    let raw = RawEnv::from_env()
        .map_err(|e| other_error(format!("Failed to read environment: {}", e)))?
        .normalized();

    match command {
        Command::ValidateEnv => {
            if cli::validate_env(&raw) {
                return Ok(());
            }
            return Err(other_error("environment validation failed"));
        }
        Command::Healthcheck => return cli::healthcheck(&raw).await,
        Command::Serve => {}
    }

    logging::init(&raw);

    let config = Config::from_raw(raw).map_err(|e| {
        error!("Invalid configuration: {}", e);
        other_error(format!("Invalid configuration: {}", e))
    })?;

    if config.used_fallback() {
        warn!(
            generated = ?config.generated_secrets,
            "Using generated fallback values; set them explicitly before deploying"
        );
    }

    info!(
        "Starting {} connect-service v{} ({})",
        config.app.name,
        env!("CARGO_PKG_VERSION"),
        config.app.env.as_str()
    );

    let pool_config = config.database.pool_config();
    pool_config.log_config();
    let pool = match db_pool::connect_with_retry(&pool_config, db_pool::RetryPolicy::default())
        .await
    {
        Ok(pool) => {
            if let Err(e) = db::run_migrations(&pool).await {
                error!(target: "db", "Failed to run migrations: {}", e);
                return Err(other_error(format!("Failed to run migrations: {}", e)));
            }
            info!(target: "db", "Database migrations completed");
            pool
        }
        Err(e) if !config.is_production() => {
            warn!(
                target: "db",
                "Database unavailable ({}); continuing with a lazy pool, migrations pending", e
            );
            let pool = db_pool::create_lazy_pool(&pool_config)
                .map_err(|e| other_error(format!("Invalid database URL: {}", e)))?;
            let pending = pool.clone();
            tokio::spawn(async move {
                db::retry_migrations(db::PENDING_MIGRATION_RETRY, || db::run_migrations(&pending))
                    .await;
            });
            pool
        }
        Err(e) => {
            error!(target: "db", "Failed to connect to database: {}", e);
            return Err(other_error(format!("Failed to connect to database: {}", e)));
        }
    };

    let bind_address = format!("{}:{}", config.app.host, config.app.port);
    let cors_origin = config.app.cors_origin.clone();
    let rate_limit = RateLimitMiddleware::new(config.rate_limit);
    let maintenance = config.features.maintenance_mode;

    let state = AppState::from_pool(config, pool.clone())
        .map_err(|e| other_error(format!("Failed to initialize services: {}", e)))?;
    info!(
        oauth_providers = state.oauth.len(),
        hosted_auth = state.hosted_auth.is_some(),
        "Auth configured"
    );

    let sessions = state.sessions.clone();
    let state = web::Data::new(state);

    info!("Starting HTTP server on {}", bind_address);

    let server = HttpServer::new(move || {
        App::new()
            .app_data(state.clone())
            .wrap(SessionMiddleware::new(sessions.clone()))
            .wrap(rate_limit.clone())
            .wrap(MaintenanceMode::new(maintenance))
            .wrap(cors(cors_origin.as_deref()))
            .wrap(TracingLogger::default())
            .configure(routes::configure)
    })
    .bind(&bind_address)?
    .run();

    let result = server.await;

    info!("Shutting down; closing database pool");
    pool.close().await;
    result
}
