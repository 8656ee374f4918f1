/// User lookup, creation, profiles and follows
use actix_web::{web, HttpResponse};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::handlers::notify;
use crate::middleware::AuthenticatedUser;
use crate::models::NewNotification;
use crate::services::{accounts, Registration};

#[derive(Debug, Deserialize)]
pub struct UserLookupQuery {
    pub email: Option<String>,
    pub id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[serde(default)]
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(min = 3, max = 50, message = "Username must be 3-50 characters"))]
    pub username: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// GET /api/users?email= or ?id=
pub async fn lookup(
    state: web::Data<AppState>,
    query: web::Query<UserLookupQuery>,
) -> Result<HttpResponse> {
    let users = &state.repos.users;
    let user = match (&query.email, query.id) {
        (Some(email), _) => users.find_by_email(&accounts::normalize_email(email)).await?,
        (None, Some(id)) => users.find_by_id(id).await?,
        (None, None) => {
            return Err(AppError::BadRequest(
                "Email or ID parameter required".to_string(),
            ))
        }
    };

    let user = user.ok_or_else(|| AppError::NotFound("User not found".to_string()))?;
    Ok(HttpResponse::Ok().json(json!({ "user": user })))
}

/// POST /api/users
pub async fn create(
    state: web::Data<AppState>,
    payload: web::Json<CreateUserRequest>,
) -> Result<HttpResponse> {
    let req = CreateUserRequest {
        email: payload.email.trim().to_string(),
        name: payload.name.trim().to_string(),
        username: payload.username.trim().to_string(),
        password: payload.password.clone(),
    };
    req.validate()?;

    let user = accounts::register_with_password(
        &state,
        Registration {
            email: req.email,
            password: req.password,
            full_name: Some(req.name),
            username: Some(req.username),
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "user": {
            "id": user.id,
            "email": user.email,
            "name": user.full_name,
            "username": user.username,
        }
    })))
}

/// GET /api/users/{id}: profile with stats
pub async fn profile(state: web::Data<AppState>, path: web::Path<Uuid>) -> Result<HttpResponse> {
    let profile = state
        .repos
        .users
        .find_profile(path.into_inner())
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    Ok(HttpResponse::Ok().json(json!({ "user": profile })))
}

/// POST /api/users/{id}/follow
pub async fn follow(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let target_id = path.into_inner();
    if target_id == caller.user_id {
        return Err(AppError::BadRequest("Cannot follow yourself".to_string()));
    }

    if state.repos.users.find_by_id(target_id).await?.is_none() {
        return Err(AppError::NotFound("User not found".to_string()));
    }

    let created = state.repos.social.follow(caller.user_id, target_id).await?;
    if created {
        let follower = caller.name.clone().unwrap_or_else(|| caller.email.clone());
        notify(
            &state,
            NewNotification {
                user_id: target_id,
                notification_type: "follow".to_string(),
                title: "New follower".to_string(),
                message: format!("{} started following you", follower),
                data: Some(json!({ "follower_id": caller.user_id })),
            },
        )
        .await;
    }

    Ok(HttpResponse::Ok().json(json!({ "following": true })))
}

/// DELETE /api/users/{id}/follow
pub async fn unfollow(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    state
        .repos
        .social
        .unfollow(caller.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "following": false })))
}

/// GET /api/users/{id}/follow
pub async fn follow_status(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    let following = state
        .repos
        .social
        .is_following(caller.user_id, path.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({ "following": following })))
}
