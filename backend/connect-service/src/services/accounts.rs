//! Account lifecycle shared by the credential, OAuth and hosted-auth sign-in paths.

use tracing::{info, warn};

use crate::app_state::AppState;
use crate::error::{AppError, Result};
use crate::models::{NewUser, User};
use crate::security::{hash_password, verify_password};
use crate::services::{HostedUser, OAuthUserInfo};

/// Input for a credential (email + password) account.
#[derive(Debug, Clone)]
pub struct Registration {
    pub email: String,
    pub password: String,
    pub full_name: Option<String>,
    pub username: Option<String>,
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Create a credential account. With email verification on, the user starts unverified
/// and gets a verification link when SMTP is configured.
pub async fn register_with_password(state: &AppState, registration: Registration) -> Result<User> {
    let email = normalize_email(&registration.email);

    if state.repos.users.find_by_email(&email).await?.is_some() {
        warn!(target: "auth", "Signup rejected: email already registered");
        return Err(AppError::Conflict("User already exists".to_string()));
    }

    let password_hash = hash_password(&registration.password)?;
    let verification_required = state.config.features.email_verification;

    let user = state
        .repos
        .users
        .create(NewUser {
            email,
            username: registration.username,
            password_hash: Some(password_hash),
            full_name: registration.full_name,
            avatar_url: None,
            stack_user_id: None,
            email_verified: !verification_required,
        })
        .await?;

    info!(target: "auth", user_id = %user.id, "User registered");

    if verification_required {
        send_verification(state, &user).await;
    }

    Ok(user)
}

/// Failures are logged; the account stays usable and the link can be re-sent later.
async fn send_verification(state: &AppState, user: &User) {
    if !state.mailer.is_enabled() {
        info!(target: "auth", user_id = %user.id, "SMTP not configured; verification email skipped");
        return;
    }

    let token = match state.sessions.issue_email_verification(user.id, &user.email) {
        Ok(token) => token,
        Err(e) => {
            warn!(target: "auth", user_id = %user.id, error = %e, "Failed to sign verification token");
            return;
        }
    };

    let link = format!(
        "{}/api/auth/verify-email?token={}",
        state.config.app.base_url(),
        urlencoding::encode(&token)
    );

    if let Err(e) = state.mailer.send_verification_email(&user.email, &link).await {
        warn!(target: "auth", user_id = %user.id, error = %e, "Failed to send verification email");
    }
}

/// Check email and password; unknown email and wrong password are indistinguishable.
pub async fn authenticate(state: &AppState, email: &str, password: &str) -> Result<User> {
    let invalid = || AppError::Authentication("Invalid email or password".to_string());

    let user = state
        .repos
        .users
        .find_by_email(&normalize_email(email))
        .await?
        .ok_or_else(invalid)?;

    let Some(password_hash) = user.password_hash.as_deref() else {
        return Err(invalid());
    };

    if !verify_password(password, password_hash)? {
        warn!(target: "security", user_id = %user.id, "Failed sign-in attempt");
        return Err(invalid());
    }

    Ok(user)
}

fn unverified_match() -> AppError {
    AppError::Conflict(
        "An account with this email already exists; sign in with it first".to_string(),
    )
}

/// Sign-in through a social provider: existing accounts are matched by email, and only
/// when the provider has verified that email.
pub async fn find_or_create_oauth_user(state: &AppState, info: OAuthUserInfo) -> Result<User> {
    let email = normalize_email(&info.email);

    if let Some(user) = state.repos.users.find_by_email(&email).await? {
        if !info.email_verified {
            warn!(
                target: "security",
                user_id = %user.id,
                provider = %info.provider,
                "Social sign-in refused: unverified email matches an existing account"
            );
            return Err(unverified_match());
        }
        if !user.email_verified {
            if let Some(verified) = state.repos.users.mark_email_verified(user.id).await? {
                return Ok(verified);
            }
        }
        return Ok(user);
    }

    let user = state
        .repos
        .users
        .create(NewUser {
            email,
            username: None,
            password_hash: None,
            full_name: info.display_name,
            avatar_url: info.avatar_url,
            stack_user_id: None,
            email_verified: info.email_verified,
        })
        .await?;

    info!(target: "auth", user_id = %user.id, provider = %info.provider, "User created from social sign-in");
    Ok(user)
}

/// Mirror a hosted-auth user locally: by hosted id, then by verified email (linking),
/// else create.
pub async fn find_or_create_hosted_user(state: &AppState, hosted: HostedUser) -> Result<User> {
    let users = &state.repos.users;

    if let Some(user) = users.find_by_hosted_id(&hosted.id).await? {
        return Ok(user);
    }

    let email = hosted
        .primary_email
        .as_deref()
        .map(normalize_email)
        .ok_or_else(|| AppError::BadRequest("Hosted account has no primary email".to_string()))?;

    if let Some(user) = users.find_by_email(&email).await? {
        if !hosted.primary_email_verified {
            warn!(
                target: "security",
                user_id = %user.id,
                "Hosted sign-in refused: unverified email matches an existing account"
            );
            return Err(unverified_match());
        }
        info!(target: "auth", user_id = %user.id, "Linking hosted account to existing user");
        return Ok(users.link_hosted_account(user.id, &hosted.id).await?);
    }

    let user = users
        .create(NewUser {
            email,
            username: None,
            password_hash: None,
            full_name: hosted.display_name,
            avatar_url: hosted.profile_image_url,
            stack_user_id: Some(hosted.id),
            email_verified: hosted.primary_email_verified,
        })
        .await?;

    info!(target: "auth", user_id = %user.id, "User created from hosted auth");
    Ok(user)
}
