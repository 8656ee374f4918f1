//! Data access layer.
//!
//! Each aggregate has a repository trait and a Postgres implementation. Handlers only see the
//! traits through [`Repositories`], so tests can swap in in-memory versions.

pub mod market_data_repo;
pub mod notification_repo;
pub mod portfolio_repo;
pub mod post_repo;
pub mod social_repo;
pub mod strategy_repo;
pub mod user_repo;

use async_trait::async_trait;
use sqlx::PgPool;
use std::fmt::Display;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{
    FeedPost, Holding, InvestmentStrategy, LikeOutcome, MarketData, MarketDataUpdate, NewHolding,
    NewNotification, NewPortfolio, NewPost, NewUser, Notification, Portfolio, PortfolioDetail,
    PortfolioSummary, Post, User, UserProfile,
};

pub use market_data_repo::PgMarketDataRepository;
pub use notification_repo::PgNotificationRepository;
pub use portfolio_repo::PgPortfolioRepository;
pub use post_repo::PgPostRepository;
pub use social_repo::PgSocialRepository;
pub use strategy_repo::PgStrategyRepository;
pub use user_repo::PgUserRepository;

pub type DbResult<T> = Result<T, sqlx::Error>;

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: NewUser) -> DbResult<User>;
    async fn find_by_email(&self, email: &str) -> DbResult<Option<User>>;
    async fn find_by_id(&self, id: Uuid) -> DbResult<Option<User>>;
    async fn find_profile(&self, id: Uuid) -> DbResult<Option<UserProfile>>;
    async fn find_by_hosted_id(&self, stack_user_id: &str) -> DbResult<Option<User>>;
    async fn link_hosted_account(&self, id: Uuid, stack_user_id: &str) -> DbResult<User>;
    async fn mark_email_verified(&self, id: Uuid) -> DbResult<Option<User>>;
}

#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn create(&self, post: NewPost) -> DbResult<Post>;
    async fn list(&self, limit: i64, offset: i64) -> DbResult<Vec<FeedPost>>;
    async fn find(&self, id: Uuid) -> DbResult<Option<FeedPost>>;
    /// Idempotent; `like_count` is recounted inside the same transaction.
    async fn like(&self, post_id: Uuid, user_id: Uuid) -> DbResult<LikeOutcome>;
    async fn unlike(&self, post_id: Uuid, user_id: Uuid) -> DbResult<LikeOutcome>;
}

#[async_trait]
pub trait PortfolioRepository: Send + Sync {
    async fn list_for_user(&self, user_id: Uuid) -> DbResult<Vec<PortfolioSummary>>;
    async fn find_detail(&self, id: Uuid) -> DbResult<Option<PortfolioDetail>>;
    async fn create(&self, portfolio: NewPortfolio) -> DbResult<Portfolio>;
    async fn upsert_holding(&self, portfolio_id: Uuid, holding: NewHolding) -> DbResult<Holding>;
}

#[async_trait]
pub trait MarketDataRepository: Send + Sync {
    async fn upsert(&self, update: MarketDataUpdate) -> DbResult<MarketData>;
    /// Filtered by symbol when given, otherwise the top 50 by market cap.
    async fn list(&self, symbols: Option<&[String]>) -> DbResult<Vec<MarketData>>;
}

#[async_trait]
pub trait SocialRepository: Send + Sync {
    /// Returns false when the follow already existed.
    async fn follow(&self, follower_id: Uuid, following_id: Uuid) -> DbResult<bool>;
    async fn unfollow(&self, follower_id: Uuid, following_id: Uuid) -> DbResult<bool>;
    async fn is_following(&self, follower_id: Uuid, following_id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn create(&self, notification: NewNotification) -> DbResult<Notification>;
    async fn list_for_user(&self, user_id: Uuid, limit: i64) -> DbResult<Vec<Notification>>;
    /// Returns false when no notification with that id belongs to the user.
    async fn mark_read(&self, id: Uuid, user_id: Uuid) -> DbResult<bool>;
}

#[async_trait]
pub trait StrategyRepository: Send + Sync {
    async fn list_active(&self) -> DbResult<Vec<InvestmentStrategy>>;
}

/// All repositories used by the HTTP layer.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub posts: Arc<dyn PostRepository>,
    pub portfolios: Arc<dyn PortfolioRepository>,
    pub market_data: Arc<dyn MarketDataRepository>,
    pub social: Arc<dyn SocialRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
    pub strategies: Arc<dyn StrategyRepository>,
}

impl Repositories {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            posts: Arc::new(PgPostRepository::new(pool.clone())),
            portfolios: Arc::new(PgPortfolioRepository::new(pool.clone())),
            market_data: Arc::new(PgMarketDataRepository::new(pool.clone())),
            social: Arc::new(PgSocialRepository::new(pool.clone())),
            notifications: Arc::new(PgNotificationRepository::new(pool.clone())),
            strategies: Arc::new(PgStrategyRepository::new(pool)),
        }
    }
}

/// Run database migrations
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("../migrations").run(pool).await
}

/// Interval between migration attempts while the database is still unreachable
pub const PENDING_MIGRATION_RETRY: Duration = Duration::from_secs(15);

/// Keep calling `migrate` every `interval` until it succeeds; returns the number of attempts.
///
/// Used when the service started on a lazy pool: the schema is applied as soon as the
/// database becomes reachable.
pub async fn retry_migrations<F, Fut, E>(interval: Duration, mut migrate: F) -> u32
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    let mut attempt = 1;
    loop {
        match migrate().await {
            Ok(()) => {
                info!(target: "db", attempt, "Pending database migrations completed");
                return attempt;
            }
            Err(e) => {
                warn!(
                    target: "db",
                    attempt,
                    error = %e,
                    "Database migrations still pending; retrying in {}s",
                    interval.as_secs()
                );
                tokio::time::sleep(interval).await;
                attempt += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_retry_migrations_until_database_is_up() {
        let calls = AtomicU32::new(0);
        let attempts = retry_migrations(Duration::from_millis(1), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move {
                if n < 3 {
                    Err("connection refused")
                } else {
                    Ok(())
                }
            }
        })
        .await;

        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_retry_migrations_stops_after_first_success() {
        let attempts =
            retry_migrations(Duration::from_secs(3600), || async { Ok::<(), String>(()) }).await;
        assert_eq!(attempts, 1);
    }
}
