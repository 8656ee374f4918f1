/// Feed and post handlers
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::NewPost;

pub const DEFAULT_FEED_LIMIT: i64 = 20;

fn default_limit() -> i64 {
    DEFAULT_FEED_LIMIT
}

#[derive(Debug, Deserialize, Validate)]
pub struct FeedQuery {
    #[serde(default = "default_limit")]
    #[validate(range(min = 1, max = 100, message = "limit must be between 1 and 100"))]
    pub limit: i64,
    #[serde(default)]
    #[validate(range(min = 0, message = "offset must not be negative"))]
    pub offset: i64,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePostRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 5000, message = "Content must be 1-5000 characters"))]
    pub content: String,
    pub images: Option<Vec<String>>,
    #[serde(alias = "postType")]
    #[validate(length(min = 1, max = 50, message = "Post type must be 1-50 characters"))]
    pub post_type: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// GET /api/posts?limit&offset
pub async fn list(
    state: web::Data<AppState>,
    query: web::Query<FeedQuery>,
) -> Result<HttpResponse> {
    query.validate()?;
    let posts = state.repos.posts.list(query.limit, query.offset).await?;
    Ok(HttpResponse::Ok().json(json!({ "posts": posts })))
}

/// POST /api/posts
pub async fn create(
    state: web::Data<AppState>,
    author: AuthenticatedUser,
    payload: web::Json<CreatePostRequest>,
) -> Result<HttpResponse> {
    let payload = payload.into_inner();
    let req = CreatePostRequest {
        content: payload.content.trim().to_string(),
        ..payload
    };
    req.validate()?;

    let post = state
        .repos
        .posts
        .create(NewPost {
            user_id: author.user_id,
            content: req.content,
            images: req.images.unwrap_or_default(),
            post_type: req.post_type.unwrap_or_else(|| "general".to_string()),
            tags: req.tags.unwrap_or_default(),
        })
        .await?;

    info!(target: "api", post_id = %post.id, user_id = %author.user_id, "Post created");
    Ok(HttpResponse::Created().json(json!({ "post": post })))
}

/// GET /api/posts/{id}
pub async fn get(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse> {
    let post = state
        .repos
        .posts
        .find(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({ "post": post })))
}
