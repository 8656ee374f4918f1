use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::app_state::AppState;

/// GET /api/features
pub async fn list(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({ "features": state.config.features }))
}

/// GET /maintenance
pub async fn maintenance_notice(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "maintenance": state.config.features.maintenance_mode,
        "message": format!(
            "{} is undergoing scheduled maintenance. Please check back shortly.",
            state.config.app.name
        ),
    }))
}
