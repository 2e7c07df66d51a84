//! Business event handlers
//!
//! Each request is its own unit of work: the event is posted inside a fresh
//! ledger transaction that commits only when the adapter succeeds.

use axum::{
    extract::{Path, State},
    Json,
};
use validator::Validate;

use core_kernel::{OrderId, PaymentId, PurchaseBillId};
use domain_ledger::posting::{InvoiceEvent, PaymentEvent, PaymentToggleEvent, PurchaseEvent};
use domain_ledger::PostingOutcome;

use crate::dto::posting::DocumentDeletedRequest;
use crate::{error::ApiError, AppState};

pub async fn post_invoice(
    State(state): State<AppState>,
    Json(event): Json<InvoiceEvent>,
) -> Result<Json<PostingOutcome>, ApiError> {
    let mut tx = state.ledger.begin().await?;
    let outcome = state.ledger.post_invoice(tx.as_mut(), &event).await?;
    tx.commit().await?;
    Ok(Json(outcome))
}

/// Routes to the customer or supplier side by `party_type`
pub async fn post_payment(
    State(state): State<AppState>,
    Json(event): Json<PaymentEvent>,
) -> Result<Json<PostingOutcome>, ApiError> {
    let mut tx = state.ledger.begin().await?;
    let outcome = state.ledger.post_payment(tx.as_mut(), &event).await?;
    tx.commit().await?;
    Ok(Json(outcome))
}

pub async fn post_purchase(
    State(state): State<AppState>,
    Json(event): Json<PurchaseEvent>,
) -> Result<Json<PostingOutcome>, ApiError> {
    let mut tx = state.ledger.begin().await?;
    let outcome = state.ledger.post_purchase(tx.as_mut(), &event).await?;
    tx.commit().await?;
    Ok(Json(outcome))
}

/// Invoice marked paid or unpaid at the counter
pub async fn post_payment_toggle(
    State(state): State<AppState>,
    Json(event): Json<PaymentToggleEvent>,
) -> Result<Json<PostingOutcome>, ApiError> {
    let mut tx = state.ledger.begin().await?;
    let outcome = state.ledger.post_payment_toggle(tx.as_mut(), &event).await?;
    tx.commit().await?;
    Ok(Json(outcome))
}

pub async fn reverse_invoice(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
    Json(request): Json<DocumentDeletedRequest>,
) -> Result<Json<PostingOutcome>, ApiError> {
    request.validate()?;
    let mut tx = state.ledger.begin().await?;
    let outcome = state
        .ledger
        .reverse_invoice(tx.as_mut(), order_id, &request.number)
        .await?;
    tx.commit().await?;
    Ok(Json(outcome))
}

pub async fn reverse_payment(
    State(state): State<AppState>,
    Path(payment_id): Path<PaymentId>,
    Json(request): Json<DocumentDeletedRequest>,
) -> Result<Json<PostingOutcome>, ApiError> {
    request.validate()?;
    let mut tx = state.ledger.begin().await?;
    let outcome = state
        .ledger
        .reverse_payment(tx.as_mut(), payment_id, &request.number)
        .await?;
    tx.commit().await?;
    Ok(Json(outcome))
}

pub async fn reverse_purchase(
    State(state): State<AppState>,
    Path(bill_id): Path<PurchaseBillId>,
    Json(request): Json<DocumentDeletedRequest>,
) -> Result<Json<PostingOutcome>, ApiError> {
    request.validate()?;
    let mut tx = state.ledger.begin().await?;
    let outcome = state
        .ledger
        .reverse_purchase(tx.as_mut(), bill_id, &request.number)
        .await?;
    tx.commit().await?;
    Ok(Json(outcome))
}
