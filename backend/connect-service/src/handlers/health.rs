use actix_web::{web, HttpResponse};

use crate::app_state::AppState;

/// GET /api/health: 200 when every critical dependency is healthy, 503 otherwise
pub async fn health(state: web::Data<AppState>) -> HttpResponse {
    let report = state.health.check().await;
    if report.is_healthy() {
        HttpResponse::Ok().json(report)
    } else {
        HttpResponse::ServiceUnavailable().json(report)
    }
}
