use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::app_state::AppState;
use crate::error::Result;

/// GET /api/strategies
pub async fn list(state: web::Data<AppState>) -> Result<HttpResponse> {
    let strategies = state.repos.strategies.list_active().await?;
    Ok(HttpResponse::Ok().json(json!({ "strategies": strategies })))
}
