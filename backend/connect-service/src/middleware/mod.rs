pub mod maintenance;
pub mod rate_limit;
pub mod session;

pub use maintenance::MaintenanceMode;
pub use rate_limit::RateLimitMiddleware;
pub use session::{AuthenticatedUser, SessionMiddleware};

use actix_cors::Cors;
use actix_web::http::header;

/// CORS policy: `CORS_ORIGIN` when set (comma separated), otherwise any origin.
pub fn cors(origin: Option<&str>) -> Cors {
    let mut cors = Cors::default();
    match origin {
        Some(origins) if origins.trim() != "*" => {
            for origin in origins.split(',').map(str::trim).filter(|o| !o.is_empty()) {
                cors = cors.allowed_origin(origin);
            }
        }
        _ => cors = cors.allow_any_origin(),
    }

    cors.allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::CONTENT_TYPE, header::AUTHORIZATION])
        .max_age(3600)
}
