/// User repository - handles all database operations for users
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DbResult, UserRepository};
use crate::models::{NewUser, User, UserProfile};

const USER_COLUMNS: &str = "u.id, u.email, u.username, u.password_hash, u.full_name, u.avatar_url, \
     u.stack_user_id, u.email_verified, u.is_verified, u.created_at, u.updated_at";

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, user: NewUser) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, password_hash, full_name, avatar_url, stack_user_id, email_verified)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING id, email, username, password_hash, full_name, avatar_url, stack_user_id,
                      email_verified, is_verified, created_at, updated_at
            "#,
        )
        .bind(user.email.to_lowercase())
        .bind(user.username)
        .bind(user.password_hash)
        .bind(user.full_name)
        .bind(user.avatar_url)
        .bind(user.stack_user_id)
        .bind(user.email_verified)
        .fetch_one(&self.pool)
        .await
    }

    async fn find_by_email(&self, email: &str) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users u WHERE u.email = $1",
            USER_COLUMNS
        ))
        .bind(email.to_lowercase())
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users u WHERE u.id = $1",
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_profile(&self, id: Uuid) -> DbResult<Option<UserProfile>> {
        sqlx::query_as::<_, UserProfile>(&format!(
            r#"
            SELECT {},
                   up.bio, up.location, up.website_url, up.occupation, up.cover_image_url,
                   us.post_count, us.follower_count, us.following_count, us.portfolio_count,
                   us.total_portfolio_value
            FROM users u
            LEFT JOIN user_profiles up ON u.id = up.user_id
            LEFT JOIN user_stats us ON u.id = us.id
            WHERE u.id = $1
            "#,
            USER_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn find_by_hosted_id(&self, stack_user_id: &str) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>(&format!(
            "SELECT {} FROM users u WHERE u.stack_user_id = $1",
            USER_COLUMNS
        ))
        .bind(stack_user_id)
        .fetch_optional(&self.pool)
        .await
    }

    async fn link_hosted_account(&self, id: Uuid, stack_user_id: &str) -> DbResult<User> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET stack_user_id = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, username, password_hash, full_name, avatar_url, stack_user_id,
                      email_verified, is_verified, created_at, updated_at
            "#,
        )
        .bind(id)
        .bind(stack_user_id)
        .fetch_one(&self.pool)
        .await
    }

    async fn mark_email_verified(&self, id: Uuid) -> DbResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET email_verified = true, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, username, password_hash, full_name, avatar_url, stack_user_id,
                      email_verified, is_verified, created_at, updated_at
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
    }
}
