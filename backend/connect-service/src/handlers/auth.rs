/// Sign-up, sign-in and session handlers
use actix_web::cookie::{time::Duration as CookieDuration, Cookie, SameSite};
use actix_web::{http::header, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{info, warn};
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::middleware::AuthenticatedUser;
use crate::models::User;
use crate::security::{IssuedSession, SESSION_COOKIE};
use crate::services::{accounts, HostedAuthError, Registration};

/// Field-level renames so validation details name the fields the client sent.
#[derive(Debug, Deserialize, Validate)]
pub struct SignupRequest {
    #[serde(default, rename = "firstName")]
    #[validate(length(min = 1, message = "First name is required"))]
    pub first_name: String,
    #[serde(default, rename = "lastName")]
    #[validate(length(min = 1, message = "Last name is required"))]
    pub last_name: String,
    #[serde(default)]
    #[validate(email(message = "A valid email address is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct SigninRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Email is required"))]
    pub email: String,
    #[serde(default)]
    #[validate(length(min = 1, message = "Password is required"))]
    pub password: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct HostedSessionRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Access token is required"))]
    pub access_token: String,
}

#[derive(Debug, Deserialize)]
pub struct OAuthCallbackQuery {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailQuery {
    pub token: String,
}

#[derive(Debug, Serialize)]
struct ProviderInfo {
    id: String,
    name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    signin_url: Option<String>,
}

fn session_cookie(state: &AppState, issued: &IssuedSession) -> Cookie<'static> {
    Cookie::build(SESSION_COOKIE, issued.token.clone())
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(state.config.is_production())
        .max_age(CookieDuration::seconds(state.sessions.max_age_secs()))
        .finish()
}

/// Issue a session for `user` and answer with the token, also set as the session cookie.
fn signed_in(state: &AppState, user: &User, provider: &str) -> Result<HttpResponse> {
    let issued = state.sessions.issue(user, provider)?;
    info!(target: "auth", user_id = %user.id, provider, "User signed in");

    Ok(HttpResponse::Ok()
        .cookie(session_cookie(state, &issued))
        .json(json!({
            "token": issued.token,
            "expires_at": issued.expires_at,
            "user": user,
        })))
}

/// POST /api/signup
pub async fn signup(
    state: web::Data<AppState>,
    payload: web::Json<SignupRequest>,
) -> Result<HttpResponse> {
    let req = SignupRequest {
        first_name: payload.first_name.trim().to_string(),
        last_name: payload.last_name.trim().to_string(),
        email: payload.email.trim().to_string(),
        password: payload.password.clone(),
    };
    req.validate()?;

    let user = accounts::register_with_password(
        &state,
        Registration {
            full_name: Some(format!("{} {}", req.first_name, req.last_name)),
            email: req.email,
            password: req.password,
            username: None,
        },
    )
    .await?;

    Ok(HttpResponse::Created().json(json!({
        "message": "User created successfully",
        "user": user,
    })))
}

/// POST /api/auth/signin
pub async fn signin(
    state: web::Data<AppState>,
    payload: web::Json<SigninRequest>,
) -> Result<HttpResponse> {
    payload.validate()?;
    let user = accounts::authenticate(&state, &payload.email, &payload.password).await?;
    signed_in(&state, &user, "credentials")
}

/// GET /api/auth/session
pub async fn session(user: AuthenticatedUser) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "user": {
            "id": user.user_id,
            "email": user.email,
            "name": user.name,
        },
        "provider": user.provider,
        "expires": user.expires_at,
    }))
}

/// POST /api/auth/signout
pub async fn signout() -> HttpResponse {
    let mut cookie = Cookie::build(SESSION_COOKIE, "").path("/").finish();
    cookie.make_removal();
    HttpResponse::Ok()
        .cookie(cookie)
        .json(json!({ "success": true }))
}

/// GET /api/auth/providers
pub async fn providers(state: web::Data<AppState>) -> HttpResponse {
    let mut providers = vec![ProviderInfo {
        id: "credentials".to_string(),
        name: "Email".to_string(),
        signin_url: Some("/api/auth/signin".to_string()),
    }];

    if state.config.features.social_login {
        let mut names: Vec<&str> = state.oauth.keys().copied().collect();
        names.sort_unstable();
        providers.extend(names.into_iter().map(|id| ProviderInfo {
            id: id.to_string(),
            name: display_name(id),
            signin_url: Some(format!("/api/auth/signin/{}", id)),
        }));
    }

    if state.hosted_auth.is_some() {
        providers.push(ProviderInfo {
            id: "hosted".to_string(),
            name: "Stack Auth".to_string(),
            signin_url: Some("/api/auth/hosted/session".to_string()),
        });
    }

    HttpResponse::Ok().json(json!({ "providers": providers }))
}

fn display_name(provider: &str) -> String {
    match provider {
        "google" => "Google".to_string(),
        "facebook" => "Facebook".to_string(),
        "twitter" => "Twitter".to_string(),
        other => other.to_string(),
    }
}

/// GET /api/auth/signin/{provider}: redirect to the provider's consent screen
pub async fn oauth_signin(
    state: web::Data<AppState>,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let name = path.into_inner();
    let provider = state
        .oauth_provider(&name)
        .ok_or_else(|| AppError::NotFound("Sign-in provider not available".to_string()))?;

    let oauth_state = state.sessions.issue_oauth_state(&name)?;
    Ok(HttpResponse::Found()
        .insert_header((header::LOCATION, provider.authorization_url(&oauth_state)))
        .finish())
}

/// GET /api/auth/callback/{provider}
pub async fn oauth_callback(
    state: web::Data<AppState>,
    path: web::Path<String>,
    query: web::Query<OAuthCallbackQuery>,
) -> Result<HttpResponse> {
    let name = path.into_inner();
    let provider = state
        .oauth_provider(&name)
        .ok_or_else(|| AppError::NotFound("Sign-in provider not available".to_string()))?
        .clone();

    if let Some(error) = &query.error {
        warn!(target: "auth", provider = %name, error = %error, "Provider returned an error");
        return Err(AppError::Authentication("Sign-in was not completed".to_string()));
    }

    let oauth_state = query
        .state
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing OAuth state".to_string()))?;
    state.sessions.verify_oauth_state(oauth_state, &name)?;

    let code = query
        .code
        .as_deref()
        .ok_or_else(|| AppError::BadRequest("Missing authorization code".to_string()))?;

    let info = provider.exchange_code(code).await.map_err(|e| {
        warn!(target: "auth", provider = %name, error = %e, "Code exchange failed");
        AppError::Authentication("Sign-in failed".to_string())
    })?;

    let user = accounts::find_or_create_oauth_user(&state, info).await?;
    signed_in(&state, &user, provider.provider_name())
}

/// POST /api/auth/hosted/session
pub async fn hosted_session(
    state: web::Data<AppState>,
    payload: web::Json<HostedSessionRequest>,
) -> Result<HttpResponse> {
    let hosted_auth = state
        .hosted_auth
        .clone()
        .ok_or_else(|| AppError::NotFound("Hosted auth is not configured".to_string()))?;
    payload.validate()?;

    let hosted_user = hosted_auth
        .current_user(payload.access_token.trim())
        .await
        .map_err(|e| match e {
            HostedAuthError::Rejected => AppError::Authentication("Invalid access token".to_string()),
            other => {
                warn!(target: "auth", error = %other, "Hosted auth lookup failed");
                AppError::ServiceUnavailable("Hosted auth service unavailable".to_string())
            }
        })?;

    let user = accounts::find_or_create_hosted_user(&state, hosted_user).await?;
    signed_in(&state, &user, "hosted")
}

/// GET /api/auth/verify-email?token=
pub async fn verify_email(
    state: web::Data<AppState>,
    query: web::Query<VerifyEmailQuery>,
) -> Result<HttpResponse> {
    let user_id = state.sessions.verify_email_token(&query.token)?;
    let user = state
        .repos
        .users
        .mark_email_verified(user_id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".to_string()))?;

    info!(target: "auth", user_id = %user.id, "Email verified");
    Ok(HttpResponse::Ok().json(json!({
        "message": "Email verified",
        "user": user,
    })))
}
