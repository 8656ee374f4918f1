//! Signed session tokens (HS256) and the short-lived tokens that ride on the same key:
//! OAuth `state` values and email verification links.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand::RngCore;
use secrecy::{ExposeSecret, SecretString};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{AppError, Result};
use crate::models::User;

pub const SESSION_COOKIE: &str = "session-token";
const OAUTH_STATE_TTL_MINUTES: i64 = 10;
const EMAIL_VERIFICATION_TTL_HOURS: i64 = 24;

const PURPOSE_SESSION: &str = "session";
const PURPOSE_OAUTH_STATE: &str = "oauth_state";
const PURPOSE_EMAIL_VERIFICATION: &str = "email_verification";

/// Session JWT claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    /// Subject (user ID)
    pub sub: String,
    pub email: String,
    pub name: Option<String>,
    /// Sign-in method: credentials, google, hosted
    pub provider: String,
    pub iat: i64,
    pub exp: i64,
    pub purpose: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct StateClaims {
    provider: String,
    nonce: String,
    iat: i64,
    exp: i64,
    purpose: String,
}

#[derive(Debug, Serialize, Deserialize)]
struct VerificationClaims {
    sub: String,
    email: String,
    iat: i64,
    exp: i64,
    purpose: String,
}

/// Authenticated session, stored in request extensions by the session middleware.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub user_id: Uuid,
    pub email: String,
    pub name: Option<String>,
    pub provider: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize)]
pub struct IssuedSession {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct SessionManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    max_age: Duration,
}

impl SessionManager {
    pub fn new(secret: &SecretString, max_age_secs: i64) -> Self {
        let bytes = secret.expose_secret().as_bytes();
        Self {
            encoding_key: EncodingKey::from_secret(bytes),
            decoding_key: DecodingKey::from_secret(bytes),
            max_age: Duration::seconds(max_age_secs),
        }
    }

    pub fn max_age_secs(&self) -> i64 {
        self.max_age.num_seconds()
    }

    fn sign<T: Serialize>(&self, claims: &T) -> Result<String> {
        Ok(encode(&Header::new(Algorithm::HS256), claims, &self.encoding_key)?)
    }

    fn open<T: DeserializeOwned>(&self, token: &str) -> Option<T> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        match decode::<T>(token, &self.decoding_key, &validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                tracing::debug!(target: "auth", "Token validation failed: {}", e);
                None
            }
        }
    }

    pub fn issue(&self, user: &User, provider: &str) -> Result<IssuedSession> {
        let now = Utc::now();
        let expires_at = now + self.max_age;
        let claims = SessionClaims {
            sub: user.id.to_string(),
            email: user.email.clone(),
            name: user.full_name.clone().or_else(|| user.username.clone()),
            provider: provider.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
            purpose: PURPOSE_SESSION.to_string(),
        };

        Ok(IssuedSession {
            token: self.sign(&claims)?,
            expires_at,
        })
    }

    /// Decode a session token; `None` for anything expired, tampered or of another purpose.
    pub fn verify(&self, token: &str) -> Option<Session> {
        let claims: SessionClaims = self.open(token)?;
        if claims.purpose != PURPOSE_SESSION {
            return None;
        }
        Some(Session {
            user_id: Uuid::parse_str(&claims.sub).ok()?,
            email: claims.email,
            name: claims.name,
            provider: claims.provider,
            expires_at: DateTime::from_timestamp(claims.exp, 0)?,
        })
    }

    pub fn issue_oauth_state(&self, provider: &str) -> Result<String> {
        let now = Utc::now();
        let mut nonce = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut nonce);

        self.sign(&StateClaims {
            provider: provider.to_string(),
            nonce: hex::encode(nonce),
            iat: now.timestamp(),
            exp: (now + Duration::minutes(OAUTH_STATE_TTL_MINUTES)).timestamp(),
            purpose: PURPOSE_OAUTH_STATE.to_string(),
        })
    }

    pub fn verify_oauth_state(&self, state: &str, provider: &str) -> Result<()> {
        match self.open::<StateClaims>(state) {
            Some(claims) if claims.purpose == PURPOSE_OAUTH_STATE && claims.provider == provider => {
                Ok(())
            }
            _ => Err(AppError::BadRequest("Invalid OAuth state".to_string())),
        }
    }

    pub fn issue_email_verification(&self, user_id: Uuid, email: &str) -> Result<String> {
        let now = Utc::now();
        self.sign(&VerificationClaims {
            sub: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + Duration::hours(EMAIL_VERIFICATION_TTL_HOURS)).timestamp(),
            purpose: PURPOSE_EMAIL_VERIFICATION.to_string(),
        })
    }

    pub fn verify_email_token(&self, token: &str) -> Result<Uuid> {
        self.open::<VerificationClaims>(token)
            .filter(|claims| claims.purpose == PURPOSE_EMAIL_VERIFICATION)
            .and_then(|claims| Uuid::parse_str(&claims.sub).ok())
            .ok_or_else(|| AppError::BadRequest("Invalid or expired verification token".to_string()))
    }
}
