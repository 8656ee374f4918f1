use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub username: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    #[serde(skip_serializing, default)]
    pub stack_user_id: Option<String>,
    pub email_verified: bool,
    pub is_verified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub username: Option<String>,
    pub password_hash: Option<String>,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub stack_user_id: Option<String>,
    pub email_verified: bool,
}

/// User joined with profile fields and aggregate counters.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct UserProfile {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub user: User,
    pub bio: Option<String>,
    pub location: Option<String>,
    pub website_url: Option<String>,
    pub occupation: Option<String>,
    pub cover_image_url: Option<String>,
    pub post_count: Option<i64>,
    pub follower_count: Option<i64>,
    pub following_count: Option<i64>,
    pub portfolio_count: Option<i64>,
    pub total_portfolio_value: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Post {
    pub id: Uuid,
    pub user_id: Uuid,
    pub content: String,
    pub images: Vec<String>,
    pub post_type: String,
    pub tags: Vec<String>,
    pub like_count: i32,
    pub comment_count: i32,
    pub is_public: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Post with the author's public identity, as shown in the feed.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FeedPost {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub post: Post,
    pub full_name: Option<String>,
    pub username: Option<String>,
    pub avatar_url: Option<String>,
    pub is_verified: bool,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub user_id: Uuid,
    pub content: String,
    pub images: Vec<String>,
    pub post_type: String,
    pub tags: Vec<String>,
}

/// Result of a like or unlike.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LikeOutcome {
    pub like_count: i32,
    /// Whether a like row was actually inserted or removed.
    pub changed: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Portfolio {
    pub id: Uuid,
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub portfolio_type: String,
    pub risk_level: String,
    pub is_public: bool,
    pub total_value: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PortfolioSummary {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub portfolio: Portfolio,
    pub holding_count: Option<i64>,
    pub avg_holding_return: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct PortfolioDetail {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub portfolio: Portfolio,
    pub owner_name: Option<String>,
    pub owner_username: Option<String>,
    #[sqlx(skip)]
    pub holdings: Vec<Holding>,
}

#[derive(Debug, Clone)]
pub struct NewPortfolio {
    pub user_id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub portfolio_type: String,
    pub risk_level: String,
    pub is_public: bool,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Holding {
    pub id: Uuid,
    pub portfolio_id: Uuid,
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
    pub current_price: Option<Decimal>,
    pub market_value: Option<Decimal>,
    #[sqlx(default)]
    pub change_24h: Option<Decimal>,
    #[sqlx(default)]
    pub change_percentage_24h: Option<Decimal>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewHolding {
    pub symbol: String,
    pub quantity: Decimal,
    pub average_price: Decimal,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct MarketData {
    pub symbol: String,
    pub name: Option<String>,
    pub current_price: Decimal,
    pub change_24h: Option<Decimal>,
    pub change_percentage_24h: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub high_24h: Option<Decimal>,
    pub low_24h: Option<Decimal>,
    pub asset_type: Option<String>,
    pub last_updated: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct MarketDataUpdate {
    pub symbol: String,
    pub name: Option<String>,
    pub current_price: Decimal,
    pub change_24h: Option<Decimal>,
    pub change_percentage_24h: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub high_24h: Option<Decimal>,
    pub low_24h: Option<Decimal>,
    pub asset_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: Uuid,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub data: Option<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct InvestmentStrategy {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub risk_level: String,
    pub expected_return: Option<Decimal>,
    pub created_by: Option<Uuid>,
    pub created_by_name: Option<String>,
    pub created_by_username: Option<String>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}
