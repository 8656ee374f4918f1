use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use super::{DbResult, PortfolioRepository};
use crate::models::{Holding, NewHolding, NewPortfolio, Portfolio, PortfolioDetail, PortfolioSummary};

const PORTFOLIO_COLUMNS: &str = "p.id, p.user_id, p.name, p.description, p.portfolio_type, \
     p.risk_level, p.is_public, p.total_value, p.created_at, p.updated_at";

pub struct PgPortfolioRepository {
    pool: PgPool,
}

impl PgPortfolioRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn holdings(&self, portfolio_id: Uuid) -> DbResult<Vec<Holding>> {
        sqlx::query_as::<_, Holding>(
            r#"
            SELECT h.id, h.portfolio_id, h.symbol, h.quantity, h.average_price, h.current_price,
                   h.market_value, md.change_24h, md.change_percentage_24h, h.created_at, h.updated_at
            FROM holdings h
            LEFT JOIN market_data md ON h.symbol = md.symbol
            WHERE h.portfolio_id = $1
            ORDER BY h.market_value DESC NULLS LAST
            "#,
        )
        .bind(portfolio_id)
        .fetch_all(&self.pool)
        .await
    }
}

#[async_trait]
impl PortfolioRepository for PgPortfolioRepository {
    async fn list_for_user(&self, user_id: Uuid) -> DbResult<Vec<PortfolioSummary>> {
        sqlx::query_as::<_, PortfolioSummary>(&format!(
            r#"
            SELECT {}, pp.holding_count, pp.avg_holding_return
            FROM portfolios p
            LEFT JOIN portfolio_performance pp ON p.id = pp.id
            WHERE p.user_id = $1
            ORDER BY p.created_at DESC
            "#,
            PORTFOLIO_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
    }

    async fn find_detail(&self, id: Uuid) -> DbResult<Option<PortfolioDetail>> {
        let detail = sqlx::query_as::<_, PortfolioDetail>(&format!(
            r#"
            SELECT {}, u.full_name AS owner_name, u.username AS owner_username
            FROM portfolios p
            JOIN users u ON p.user_id = u.id
            WHERE p.id = $1
            "#,
            PORTFOLIO_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match detail {
            Some(mut detail) => {
                detail.holdings = self.holdings(id).await?;
                Ok(Some(detail))
            }
            None => Ok(None),
        }
    }

    async fn create(&self, portfolio: NewPortfolio) -> DbResult<Portfolio> {
        sqlx::query_as::<_, Portfolio>(
            r#"
            INSERT INTO portfolios (user_id, name, description, portfolio_type, risk_level, is_public)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id, user_id, name, description, portfolio_type, risk_level, is_public,
                      total_value, created_at, updated_at
            "#,
        )
        .bind(portfolio.user_id)
        .bind(portfolio.name)
        .bind(portfolio.description)
        .bind(portfolio.portfolio_type)
        .bind(portfolio.risk_level)
        .bind(portfolio.is_public)
        .fetch_one(&self.pool)
        .await
    }

    async fn upsert_holding(&self, portfolio_id: Uuid, holding: NewHolding) -> DbResult<Holding> {
        let mut tx = self.pool.begin().await?;

        // Price from market data when known, otherwise the cost basis
        let saved = sqlx::query_as::<_, Holding>(
            r#"
            INSERT INTO holdings (portfolio_id, symbol, quantity, average_price, current_price, market_value)
            SELECT $1, $2, $3, $4, md.current_price, $3 * COALESCE(md.current_price, $4)
            FROM (SELECT 1) AS seed
            LEFT JOIN market_data md ON md.symbol = $2
            ON CONFLICT (portfolio_id, symbol) DO UPDATE SET
                quantity = EXCLUDED.quantity,
                average_price = EXCLUDED.average_price,
                current_price = EXCLUDED.current_price,
                market_value = EXCLUDED.market_value,
                updated_at = NOW()
            RETURNING id, portfolio_id, symbol, quantity, average_price, current_price,
                      market_value, created_at, updated_at
            "#,
        )
        .bind(portfolio_id)
        .bind(&holding.symbol)
        .bind(holding.quantity)
        .bind(holding.average_price)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            UPDATE portfolios
            SET total_value = COALESCE((SELECT SUM(market_value) FROM holdings WHERE portfolio_id = $1), 0),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(portfolio_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(saved)
    }
}
