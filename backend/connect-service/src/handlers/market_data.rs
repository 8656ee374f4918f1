/// Market quotes
use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::app_state::AppState;
use crate::error::{AppError, FieldError, Result};
use crate::handlers::require_investment_tracking;
use crate::middleware::AuthenticatedUser;
use crate::models::MarketDataUpdate;

#[derive(Debug, Deserialize)]
pub struct MarketDataQuery {
    /// Comma separated symbols
    pub symbols: Option<String>,
}

impl MarketDataQuery {
    fn symbols(&self) -> Option<Vec<String>> {
        let symbols: Vec<String> = self
            .symbols
            .as_deref()?
            .split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .collect();
        (!symbols.is_empty()).then_some(symbols)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketDataRequest {
    pub symbol: Option<String>,
    pub name: Option<String>,
    pub current_price: Option<Decimal>,
    pub change_24h: Option<Decimal>,
    pub change_percentage_24h: Option<Decimal>,
    pub market_cap: Option<Decimal>,
    pub volume_24h: Option<Decimal>,
    pub high_24h: Option<Decimal>,
    pub low_24h: Option<Decimal>,
    pub asset_type: Option<String>,
}

impl MarketDataRequest {
    fn into_update(self) -> Result<MarketDataUpdate> {
        let symbol = self
            .symbol
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty());

        let (symbol, current_price) = match (symbol, self.current_price) {
            (Some(symbol), Some(price)) => (symbol, price),
            (symbol, price) => {
                let mut errors = Vec::new();
                if symbol.is_none() {
                    errors.push(FieldError::new("symbol", "Symbol is required"));
                }
                if price.is_none() {
                    errors.push(FieldError::new("currentPrice", "Current price is required"));
                }
                return Err(AppError::Validation(errors));
            }
        };

        Ok(MarketDataUpdate {
            symbol,
            name: self.name,
            current_price,
            change_24h: self.change_24h,
            change_percentage_24h: self.change_percentage_24h,
            market_cap: self.market_cap,
            volume_24h: self.volume_24h,
            high_24h: self.high_24h,
            low_24h: self.low_24h,
            asset_type: self.asset_type,
        })
    }
}

/// GET /api/market-data?symbols=A,B
pub async fn list(
    state: web::Data<AppState>,
    query: web::Query<MarketDataQuery>,
) -> Result<HttpResponse> {
    require_investment_tracking(&state)?;
    let symbols = query.symbols();
    let data = state.repos.market_data.list(symbols.as_deref()).await?;
    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}

/// POST /api/market-data
pub async fn upsert(
    state: web::Data<AppState>,
    caller: AuthenticatedUser,
    payload: web::Json<MarketDataRequest>,
) -> Result<HttpResponse> {
    require_investment_tracking(&state)?;
    let update = payload.into_inner().into_update()?;
    let data = state.repos.market_data.upsert(update).await?;

    info!(target: "api", symbol = %data.symbol, user_id = %caller.user_id, "Market data updated");
    Ok(HttpResponse::Ok().json(json!({ "data": data })))
}
