use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DbResult, NotificationRepository};
use crate::models::{NewNotification, Notification};

pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn create(&self, notification: NewNotification) -> DbResult<Notification> {
        sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, type, title, message, data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, type, title, message, data, is_read, created_at
            "#,
        )
        .bind(notification.user_id)
        .bind(notification.notification_type)
        .bind(notification.title)
        .bind(notification.message)
        .bind(notification.data)
        .fetch_one(&self.pool)
        .await
    }

    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> DbResult<Vec<Notification>> {
        sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, type, title, message, data, is_read, created_at
            FROM notifications
            WHERE user_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await
    }

    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> DbResult<bool> {
        let result =
            sqlx::query("UPDATE notifications SET is_read = true WHERE id = $1 AND user_id = $2")
                .bind(id)
                .bind(user_id)
                .execute(&self.pool)
                .await?;

        Ok(result.rows_affected() > 0)
    }
}
