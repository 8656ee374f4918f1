use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DbResult, PostRepository};
use crate::models::{FeedPost, LikeOutcome, NewPost, Post};

const FEED_SELECT: &str = r#"
    SELECT p.id, p.user_id, p.content, p.images, p.post_type, p.tags, p.like_count,
           p.comment_count, p.is_public, p.created_at, p.updated_at,
           u.full_name, u.username, u.avatar_url, u.is_verified
    FROM posts p
    JOIN users u ON p.user_id = u.id
"#;

pub struct PgPostRepository {
    pool: PgPool,
}

impl PgPostRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Recount likes for a post inside the caller's transaction and return the stored count.
async fn recount_likes(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    post_id: Uuid,
) -> DbResult<i32> {
    sqlx::query_scalar::<_, i32>(
        r#"
        UPDATE posts
        SET like_count = (SELECT COUNT(*) FROM post_likes WHERE post_id = $1)
        WHERE id = $1
        RETURNING like_count
        "#,
    )
    .bind(post_id)
    .fetch_one(&mut **tx)
    .await
}

#[async_trait]
impl PostRepository for PgPostRepository {
    async fn create(&self, post: NewPost) -> DbResult<Post> {
        sqlx::query_as::<_, Post>(
            r#"
            INSERT INTO posts (user_id, content, images, post_type, tags)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, user_id, content, images, post_type, tags, like_count, comment_count,
                      is_public, created_at, updated_at
            "#,
        )
        .bind(post.user_id)
        .bind(post.content)
        .bind(post.images)
        .bind(post.post_type)
        .bind(post.tags)
        .fetch_one(&self.pool)
        .await
    }

    async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<FeedPost>> {
        sqlx::query_as::<_, FeedPost>(&format!(
            "{} WHERE p.is_public = true ORDER BY p.created_at DESC LIMIT $1 OFFSET $2",
            FEED_SELECT
        ))
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
    }

    async fn find(&self, id: Uuid) -> DbResult<Option<FeedPost>> {
        sqlx::query_as::<_, FeedPost>(&format!("{} WHERE p.id = $1", FEED_SELECT))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
    }

    async fn like(&self, post_id: Uuid, user_id: Uuid) -> DbResult<LikeOutcome> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT INTO post_likes (post_id, user_id)
            VALUES ($1, $2)
            ON CONFLICT (post_id, user_id) DO NOTHING
            "#,
        )
        .bind(post_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let like_count = recount_likes(&mut tx, post_id).await?;
        tx.commit().await?;

        Ok(LikeOutcome {
            like_count,
            changed: inserted > 0,
        })
    }

    async fn unlike(&self, post_id: Uuid, user_id: Uuid) -> DbResult<LikeOutcome> {
        let mut tx = self.pool.begin().await?;

        let removed = sqlx::query("DELETE FROM post_likes WHERE post_id = $1 AND user_id = $2")
            .bind(post_id)
            .bind(user_id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        let like_count = recount_likes(&mut tx, post_id).await?;
        tx.commit().await?;

        Ok(LikeOutcome {
            like_count,
            changed: removed > 0,
        })
    }
}
