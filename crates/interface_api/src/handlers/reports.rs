//! Financial report handlers

use axum::{
    extract::{Query, State},
    Json,
};

use domain_ledger::reporting::{BalanceSheet, HealthReport, ProfitAndLoss, TrialBalance};

use crate::dto::query::{AsOfQuery, PeriodQuery};
use crate::{error::ApiError, AppState};

pub async fn trial_balance(
    State(state): State<AppState>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<TrialBalance>, ApiError> {
    Ok(Json(state.ledger.get_trial_balance(query.as_of).await?))
}

pub async fn profit_and_loss(
    State(state): State<AppState>,
    Query(period): Query<PeriodQuery>,
) -> Result<Json<ProfitAndLoss>, ApiError> {
    Ok(Json(state.ledger.get_profit_and_loss(period.from, period.to).await?))
}

pub async fn balance_sheet(
    State(state): State<AppState>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<BalanceSheet>, ApiError> {
    Ok(Json(state.ledger.get_balance_sheet(query.as_of).await?))
}

/// Global debit/credit totals and any batch whose entries disagree
pub async fn ledger_health(State(state): State<AppState>) -> Result<Json<HealthReport>, ApiError> {
    Ok(Json(state.ledger.health_check().await?))
}
