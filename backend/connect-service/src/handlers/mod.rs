pub mod auth;
pub mod features;
pub mod health;
pub mod likes;
pub mod market_data;
pub mod notifications;
pub mod portfolios;
pub mod posts;
pub mod strategies;
pub mod users;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::models::NewNotification;

/// Investment routes disappear entirely when tracking is switched off.
pub(crate) fn require_investment_tracking(state: &AppState) -> Result<()> {
    if state.config.features.investment_tracking {
        Ok(())
    } else {
        Err(AppError::NotFound("Not found".to_string()))
    }
}

/// Notifications are a side effect; a failed insert never fails the request.
pub(crate) async fn notify(state: &AppState, notification: NewNotification) {
    let user_id = notification.user_id;
    let kind = notification.notification_type.clone();
    if let Err(e) = state.repos.notifications.create(notification).await {
        tracing::warn!(target: "db", %user_id, kind = %kind, error = %e, "Failed to create notification");
    }
}
