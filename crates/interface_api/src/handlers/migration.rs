//! Migration, reconciliation and drift handlers

use axum::{extract::State, Json};
use tracing::{info, warn};

use domain_ledger::drift::DriftReport;
use domain_ledger::migration::{MigrationReport, ReconciliationReport};
use domain_ledger::ports::PurgeCounts;

use crate::{error::ApiError, AppState};

/// Replays the legacy books into the ledger; already-migrated records are skipped
pub async fn run_migration(State(state): State<AppState>) -> Result<Json<MigrationReport>, ApiError> {
    let report = state.ledger.run_full_migration().await?;
    info!(
        orders = report.orders.migrated,
        payments = report.payments.migrated,
        purchases = report.purchases.migrated,
        mismatched = report.reconciliation.summary.mismatched,
        "Migration run finished"
    );
    Ok(Json(report))
}

pub async fn reconciliation(
    State(state): State<AppState>,
) -> Result<Json<ReconciliationReport>, ApiError> {
    Ok(Json(state.ledger.run_reconciliation().await?))
}

/// Removes migration-created batches so the migration can be rerun
pub async fn clear_migration(State(state): State<AppState>) -> Result<Json<PurgeCounts>, ApiError> {
    let purged = state.ledger.clear_migration_data().await?;
    warn!(batches = purged.batches, entries = purged.entries, "Migration data cleared");
    Ok(Json(purged))
}

pub async fn drift_check(State(state): State<AppState>) -> Result<Json<DriftReport>, ApiError> {
    Ok(Json(state.ledger.daily_drift_check().await?))
}
