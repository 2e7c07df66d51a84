//! Journal batch handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracing::info;
use validator::Validate;

use core_kernel::BatchId;
use domain_ledger::{JournalBatch, PostedBatch};

use crate::dto::batch::*;
use crate::{error::ApiError, AppState};

/// Posts a manual batch; validation failures come back as 422
pub async fn create_batch(
    State(state): State<AppState>,
    Json(request): Json<CreateBatchRequest>,
) -> Result<(StatusCode, Json<PostedBatch>), ApiError> {
    request.validate()?;
    let posted = state.ledger.create_journal_batch(request.into()).await?;
    Ok((StatusCode::CREATED, Json(posted)))
}

/// Batch with its entries in line order
pub async fn get_batch(
    State(state): State<AppState>,
    Path(id): Path<BatchId>,
) -> Result<Json<PostedBatch>, ApiError> {
    Ok(Json(state.ledger.get_batch(id).await?))
}

/// Every batch recorded against a business reference, reversals included
pub async fn find_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchLookupQuery>,
) -> Result<Json<Vec<JournalBatch>>, ApiError> {
    let batches = state
        .ledger
        .find_batches_by_reference(query.reference_type, query.reference_id)
        .await?;
    Ok(Json(batches))
}

pub async fn reverse_batch(
    State(state): State<AppState>,
    Path(id): Path<BatchId>,
    Json(request): Json<ReverseBatchRequest>,
) -> Result<(StatusCode, Json<PostedBatch>), ApiError> {
    request.validate()?;
    let reversal = state.ledger.reverse_journal_batch(id, &request.reason).await?;
    info!(
        batch_id = %id,
        reversal_number = %reversal.batch.batch_number,
        "Batch reversed over the API"
    );
    Ok((StatusCode::CREATED, Json(reversal)))
}
