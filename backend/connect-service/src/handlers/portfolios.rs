/// Portfolio and holding handlers
use actix_web::{web, HttpResponse};
use rust_decimal::Decimal;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app_state::AppState;
use crate::error::{AppError, FieldError, Result};
use crate::handlers::require_investment_tracking;
use crate::middleware::AuthenticatedUser;
use crate::models::{NewHolding, NewPortfolio};

#[derive(Debug, Deserialize)]
pub struct PortfolioListQuery {
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePortfolioRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = 255, message = "Name must be 1-255 characters"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(alias = "portfolioType")]
    #[validate(length(min = 1, max = 50, message = "Portfolio type must be 1-50 characters"))]
    pub portfolio_type: Option<String>,
    #[serde(alias = "riskLevel")]
    #[validate(length(min = 1, max = 50, message = "Risk level must be 1-50 characters"))]
    pub risk_level: Option<String>,
    #[serde(alias = "isPublic")]
    pub is_public: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct UpsertHoldingRequest {
    pub symbol: Option<String>,
    pub quantity: Option<Decimal>,
    #[serde(alias = "averagePrice")]
    pub average_price: Option<Decimal>,
}

impl UpsertHoldingRequest {
    fn into_holding(self) -> Result<NewHolding> {
        let mut errors = Vec::new();

        let symbol = self
            .symbol
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty() && s.len() <= 20);
        if symbol.is_none() {
            errors.push(FieldError::new("symbol", "Symbol is required"));
        }

        let quantity = self.quantity.filter(|q| *q > Decimal::ZERO);
        if quantity.is_none() {
            errors.push(FieldError::new("quantity", "Quantity must be greater than zero"));
        }

        let average_price = self.average_price.filter(|p| *p >= Decimal::ZERO);
        if average_price.is_none() {
            errors.push(FieldError::new("average_price", "Average price must not be negative"));
        }

        match (symbol, quantity, average_price) {
            (Some(symbol), Some(quantity), Some(average_price)) => Ok(NewHolding {
                symbol,
                quantity,
                average_price,
            }),
            _ => Err(AppError::Validation(errors)),
        }
    }
}

/// GET /api/portfolios?user_id=
pub async fn list(
    state: web::Data<AppState>,
    query: web::Query<PortfolioListQuery>,
) -> Result<HttpResponse> {
    require_investment_tracking(&state)?;
    let user_id = query
        .user_id
        .ok_or_else(|| AppError::BadRequest("User ID parameter required".to_string()))?;

    let portfolios = state.repos.portfolios.list_for_user(user_id).await?;
    Ok(HttpResponse::Ok().json(json!({ "portfolios": portfolios })))
}

/// POST /api/portfolios
pub async fn create(
    state: web::Data<AppState>,
    owner: AuthenticatedUser,
    payload: web::Json<CreatePortfolioRequest>,
) -> Result<HttpResponse> {
    require_investment_tracking(&state)?;
    let payload = payload.into_inner();
    let req = CreatePortfolioRequest {
        name: payload.name.trim().to_string(),
        ..payload
    };
    req.validate()?;

    let portfolio = state
        .repos
        .portfolios
        .create(NewPortfolio {
            user_id: owner.user_id,
            name: req.name,
            description: req.description,
            portfolio_type: req.portfolio_type.unwrap_or_else(|| "personal".to_string()),
            risk_level: req.risk_level.unwrap_or_else(|| "moderate".to_string()),
            is_public: req.is_public.unwrap_or(false),
        })
        .await?;

    info!(target: "api", portfolio_id = %portfolio.id, user_id = %owner.user_id, "Portfolio created");
    Ok(HttpResponse::Created().json(json!({ "portfolio": portfolio })))
}

/// GET /api/portfolios/{id}: private portfolios are only visible to their owner
pub async fn get(
    state: web::Data<AppState>,
    caller: Option<AuthenticatedUser>,
    path: web::Path<Uuid>,
) -> Result<HttpResponse> {
    require_investment_tracking(&state)?;
    let not_found = || AppError::NotFound("Portfolio not found".to_string());

    let detail = state
        .repos
        .portfolios
        .find_detail(path.into_inner())
        .await?
        .ok_or_else(not_found)?;

    let is_owner = caller.is_some_and(|c| c.user_id == detail.portfolio.user_id);
    if !detail.portfolio.is_public && !is_owner {
        return Err(not_found());
    }

    Ok(HttpResponse::Ok().json(json!({ "portfolio": detail })))
}

/// POST /api/portfolios/{id}/holdings
pub async fn upsert_holding(
    state: web::Data<AppState>,
    owner: AuthenticatedUser,
    path: web::Path<Uuid>,
    payload: web::Json<UpsertHoldingRequest>,
) -> Result<HttpResponse> {
    require_investment_tracking(&state)?;
    let portfolio_id = path.into_inner();

    let detail = state
        .repos
        .portfolios
        .find_detail(portfolio_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Portfolio not found".to_string()))?;

    if detail.portfolio.user_id != owner.user_id {
        return Err(AppError::Authorization(
            "Only the portfolio owner can change holdings".to_string(),
        ));
    }

    let holding = payload.into_inner().into_holding()?;
    let holding = state
        .repos
        .portfolios
        .upsert_holding(portfolio_id, holding)
        .await?;

    Ok(HttpResponse::Ok().json(json!({ "holding": holding })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_holding_request_normalizes_symbol() {
        let holding = UpsertHoldingRequest {
            symbol: Some(" aapl ".to_string()),
            quantity: Some(Decimal::new(15, 1)),
            average_price: Some(Decimal::new(18950, 2)),
        }
        .into_holding()
        .expect("valid holding");

        assert_eq!(holding.symbol, "AAPL");
        assert_eq!(holding.quantity, Decimal::new(15, 1));
    }

    #[test]
    fn test_holding_request_reports_every_bad_field() {
        let err = UpsertHoldingRequest {
            symbol: None,
            quantity: Some(Decimal::ZERO),
            average_price: Some(Decimal::new(-1, 0)),
        }
        .into_holding()
        .unwrap_err();

        match err {
            AppError::Validation(fields) => {
                let names: Vec<_> = fields.iter().map(|f| f.field.as_str()).collect();
                assert_eq!(names, vec!["symbol", "quantity", "average_price"]);
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
