/// Post likes
use actix_web::{web, HttpResponse};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::handlers::notify;
use crate::middleware::AuthenticatedUser;
use crate::models::{FeedPost, NewNotification};

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub post_id: Uuid,
    pub like_count: i32,
    pub liked: bool,
}

async fn existing_post(state: &AppState, post_id: Uuid) -> Result<FeedPost> {
    state
        .repos
        .posts
        .find(post_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Post not found".to_string()))
}

/// POST /api/posts/{id}/like
pub async fn like(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    let post = existing_post(&state, post_id).await?;

    let outcome = state.repos.posts.like(post_id, caller.user_id).await?;

    let author_id = post.post.user_id;
    if outcome.changed && author_id != caller.user_id {
        let liker = caller.name.clone().unwrap_or_else(|| caller.email.clone());
        notify(
            &state,
            NewNotification {
                user_id: author_id,
                notification_type: "like".to_string(),
                title: "New like".to_string(),
                message: format!("{} liked your post", liker),
                data: Some(json!({ "post_id": post_id, "user_id": caller.user_id })),
            },
        )
        .await;
    }

    Ok(HttpResponse::Ok().json(LikeResponse {
        post_id,
        like_count: outcome.like_count,
        liked: true,
    }))
}

/// DELETE /api/posts/{id}/like
pub async fn unlike(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let post_id = path.into_inner();
    existing_post(&state, post_id).await?;

    let outcome = state.repos.posts.unlike(post_id, caller.user_id).await?;
    Ok(HttpResponse::Ok().json(LikeResponse {
        post_id,
        like_count: outcome.like_count,
        liked: false,
    }))
}
