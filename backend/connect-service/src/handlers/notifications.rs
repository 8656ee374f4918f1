/// Notification inbox
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;

fn default_limit() -> i64 {
    20
}

#[derive(Debug, Deserialize, Validate)]
pub struct NotificationQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
}

/// GET /api/notifications?limit
pub async fn list(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    query: web::Query<NotificationQuery>,
) -> Result<HttpResponse> {
    query.validate()?;
    let notifications = state
        .repos
        .notifications
        .list_for_user(caller.user_id, query.limit)
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "notifications": notifications })))
}

/// POST /api/notifications/{id}/read
pub async fn mark_read(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let id = path.into_inner();
    if !state.repos.notifications.mark_read(id, caller.user_id).await? {
        return Err(AppError::NotFound("Notification not found".to_string()));
    }
    Ok(HttpResponse::Ok().json(json!({ "id": id, "is_read": true })))
}
