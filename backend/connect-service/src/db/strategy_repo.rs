use async_trait::async_trait;
use sqlx::PgPool;

use super::{DbResult, StrategyRepository};
use crate::models::InvestmentStrategy;

pub struct PgStrategyRepository {
    pool: PgPool,
}

impl PgStrategyRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl StrategyRepository for PgStrategyRepository {
    async fn list_active(&self) -> DbResult<Vec<InvestmentStrategy>> {
        sqlx::query_as::<_, InvestmentStrategy>(
            r#"
            SELECT s.id, s.name, s.description, s.risk_level, s.expected_return, s.created_by,
                   u.full_name AS created_by_name, u.username AS created_by_username,
                   s.is_active, s.created_at
            FROM investment_strategies s
            LEFT JOIN users u ON s.created_by = u.id
            WHERE s.is_active = true
            ORDER BY s.created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await
    }
}
