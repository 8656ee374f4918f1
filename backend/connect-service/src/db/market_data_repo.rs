use async_trait::async_trait;
use sqlx::PgPool;

use super::{DbResult, MarketDataRepository};
use crate::models::{MarketData, MarketDataUpdate};

const MARKET_COLUMNS: &str = "symbol, name, current_price, change_24h, change_percentage_24h, \
     market_cap, volume_24h, high_24h, low_24h, asset_type, last_updated";

pub struct PgMarketDataRepository {
    pool: PgPool,
}

impl PgMarketDataRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MarketDataRepository for PgMarketDataRepository {
    async fn upsert(&self, update: MarketDataUpdate) -> DbResult<MarketData> {
        sqlx::query_as::<_, MarketData>(&format!(
            r#"
            INSERT INTO market_data (symbol, name, current_price, change_24h, change_percentage_24h,
                                     market_cap, volume_24h, high_24h, low_24h, asset_type, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, NOW())
            ON CONFLICT (symbol) DO UPDATE SET
                current_price = EXCLUDED.current_price,
                change_24h = EXCLUDED.change_24h,
                change_percentage_24h = EXCLUDED.change_percentage_24h,
                market_cap = EXCLUDED.market_cap,
                volume_24h = EXCLUDED.volume_24h,
                high_24h = EXCLUDED.high_24h,
                low_24h = EXCLUDED.low_24h,
                last_updated = NOW()
            RETURNING {}
            "#,
            MARKET_COLUMNS
        ))
        .bind(update.symbol)
        .bind(update.name)
        .bind(update.current_price)
        .bind(update.change_24h)
        .bind(update.change_percentage_24h)
        .bind(update.market_cap)
        .bind(update.volume_24h)
        .bind(update.high_24h)
        .bind(update.low_24h)
        .bind(update.asset_type)
        .fetch_one(&self.pool)
        .await
    }

    async fn list(&self, symbols: Option<&[String]>) -> DbResult<Vec<MarketData>> {
        match symbols {
            Some(symbols) if !symbols.is_empty() => {
                sqlx::query_as::<_, MarketData>(&format!(
                    "SELECT {} FROM market_data WHERE symbol = ANY($1) ORDER BY symbol",
                    MARKET_COLUMNS
                ))
                .bind(symbols)
                .fetch_all(&self.pool)
                .await
            }
            _ => {
                sqlx::query_as::<_, MarketData>(&format!(
                    "SELECT {} FROM market_data ORDER BY market_cap DESC NULLS LAST LIMIT 50",
                    MARKET_COLUMNS
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
    }
}
