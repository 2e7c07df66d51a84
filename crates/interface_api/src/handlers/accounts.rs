//! Chart of accounts and balance handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use validator::Validate;

use core_kernel::{AccountId, PartyId};
use domain_ledger::ports::AccountFilter;
use domain_ledger::reporting::{AccountBalance, AccountLedger, PartyBalance};
use domain_ledger::Account;

use crate::dto::account::*;
use crate::dto::query::{AsOfQuery, LedgerRangeQuery};
use crate::{error::ApiError, AppState};

/// Creates the standard chart; safe to call repeatedly
pub async fn initialize_chart(
    State(state): State<AppState>,
) -> Result<Json<ChartInitResponse>, ApiError> {
    let report = state.ledger.initialize_chart_of_accounts().await?;
    Ok(Json(report.into()))
}

/// Lists accounts, optionally by `account_type` and `is_active`
pub async fn list_accounts(
    State(state): State<AppState>,
    Query(filter): Query<AccountFilter>,
) -> Result<Json<Vec<Account>>, ApiError> {
    Ok(Json(state.ledger.list_accounts(&filter).await?))
}

pub async fn create_account(
    State(state): State<AppState>,
    Json(request): Json<CreateAccountRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    request.validate()?;
    let account = state.ledger.create_account(request.into()).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

pub async fn get_account(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(state.ledger.get_account(id).await?))
}

pub async fn get_account_by_code(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(state.ledger.get_account_by_code(&code).await?))
}

pub async fn get_account_balance(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<AccountBalance>, ApiError> {
    Ok(Json(state.ledger.get_account_balance(id, query.as_of).await?))
}

/// Entries of one account with a running balance
pub async fn get_account_ledger(
    State(state): State<AppState>,
    Path(id): Path<AccountId>,
    Query(range): Query<LedgerRangeQuery>,
) -> Result<Json<AccountLedger>, ApiError> {
    Ok(Json(state.ledger.get_account_ledger(id, range.from, range.to).await?))
}

pub async fn open_customer_account(
    State(state): State<AppState>,
    Path(customer_id): Path<PartyId>,
    Json(request): Json<PartyAccountRequest>,
) -> Result<Json<Account>, ApiError> {
    request.validate()?;
    let account = state
        .ledger
        .get_or_create_customer_account(customer_id, request.name.trim())
        .await?;
    Ok(Json(account))
}

pub async fn open_supplier_account(
    State(state): State<AppState>,
    Path(supplier_id): Path<PartyId>,
    Json(request): Json<PartyAccountRequest>,
) -> Result<Json<Account>, ApiError> {
    request.validate()?;
    let account = state
        .ledger
        .get_or_create_supplier_account(supplier_id, request.name.trim())
        .await?;
    Ok(Json(account))
}

/// Amount the customer owes; zero when no sub-account exists yet
pub async fn get_customer_balance(
    State(state): State<AppState>,
    Path(customer_id): Path<PartyId>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<PartyBalance>, ApiError> {
    Ok(Json(state.ledger.get_customer_ledger_balance(customer_id, query.as_of).await?))
}

/// Amount owed to the supplier; zero when no sub-account exists yet
pub async fn get_supplier_balance(
    State(state): State<AppState>,
    Path(supplier_id): Path<PartyId>,
    Query(query): Query<AsOfQuery>,
) -> Result<Json<PartyBalance>, ApiError> {
    Ok(Json(state.ledger.get_supplier_ledger_balance(supplier_id, query.as_of).await?))
}
