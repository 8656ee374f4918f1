/// Route table
use actix_web::{error, web, HttpRequest};

use crate::error::AppError;
use crate::handlers::{
    auth, features, health, likes, market_data, notifications, portfolios, posts, strategies,
    users,
};

fn json_error(err: error::JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid JSON body: {}", err)).into()
}

fn query_error(err: error::QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    AppError::BadRequest(format!("Invalid query string: {}", err)).into()
}

fn path_error(_err: error::PathError, _req: &HttpRequest) -> actix_web::Error {
    AppError::NotFound("Resource not found".to_string()).into()
}

/// Register every route on the app or scope it is given.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.app_data(web::JsonConfig::default().error_handler(json_error))
        .app_data(web::QueryConfig::default().error_handler(query_error))
        .app_data(web::PathConfig::default().error_handler(path_error))
        .route("/maintenance", web::get().to(features::maintenance_notice))
        .service(
            web::scope("/api")
                .route("/health", web::get().to(health::health))
                .route("/features", web::get().to(features::list))
                .route("/signup", web::post().to(auth::signup))
                .service(
                    web::scope("/auth")
                        .route("/signin", web::post().to(auth::signin))
                        .route("/session", web::get().to(auth::session))
                        .route("/signout", web::post().to(auth::signout))
                        .route("/providers", web::get().to(auth::providers))
                        .route("/verify-email", web::get().to(auth::verify_email))
                        .route("/hosted/session", web::post().to(auth::hosted_session))
                        .route("/signin/{provider}", web::get().to(auth::oauth_signin))
                        .route("/callback/{provider}", web::get().to(auth::oauth_callback)),
                )
                .service(
                    web::scope("/users")
                        .route("", web::get().to(users::lookup))
                        .route("", web::post().to(users::create))
                        .route("/{id}", web::get().to(users::profile))
                        .route("/{id}/follow", web::post().to(users::follow))
                        .route("/{id}/follow", web::delete().to(users::unfollow))
                        .route("/{id}/follow", web::get().to(users::follow_status)),
                )
                .service(
                    web::scope("/posts")
                        .route("", web::get().to(posts::list))
                        .route("", web::post().to(posts::create))
                        .route("/{id}", web::get().to(posts::get))
                        .route("/{id}/like", web::post().to(likes::like))
                        .route("/{id}/like", web::delete().to(likes::unlike)),
                )
                .service(
                    web::scope("/portfolios")
                        .route("", web::get().to(portfolios::list))
                        .route("", web::post().to(portfolios::create))
                        .route("/{id}", web::get().to(portfolios::get))
                        .route("/{id}/holdings", web::post().to(portfolios::upsert_holding)),
                )
                .service(
                    web::scope("/market-data")
                        .route("", web::get().to(market_data::list))
                        .route("", web::post().to(market_data::upsert)),
                )
                .service(
                    web::scope("/notifications")
                        .route("", web::get().to(notifications::list))
                        .route("/{id}/read", web::post().to(notifications::mark_read)),
                )
                .route("/strategies", web::get().to(strategies::list)),
        );
}
