//! Daily drift check
//!
//! Read-only comparison of the shop application's running counters against
//! the ledger, meant to catch a divergence early while both systems run side
//! by side.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{error, info, warn};

use core_kernel::amount::{round_amount, within_tolerance};
use core_kernel::PartyId;
use crate::account::PartyRef;
use crate::error::LedgerError;
use crate::migration::{system_totals, TotalComparison};
use crate::ports::{LedgerStore, LegacyBooks};
use crate::reporting::ReportingEngine;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DriftStatus {
    Ok,
    DriftDetected,
}

/// A customer whose legacy outstanding balance disagrees with the ledger
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerDrift {
    pub customer_id: PartyId,
    pub customer_name: String,
    pub legacy_outstanding: Decimal,
    pub ledger_balance: Decimal,
    pub difference: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriftTotals {
    pub sales: TotalComparison,
    /// Customer payments plus amounts paid on invoices, against Cash debits
    pub payments: TotalComparison,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftReport {
    pub status: DriftStatus,
    pub timestamp: DateTime<Utc>,
    pub customers_checked: usize,
    pub customer_drift: Vec<CustomerDrift>,
    pub system_totals: DriftTotals,
}

impl DriftReport {
    pub fn has_drift(&self) -> bool {
        self.status == DriftStatus::DriftDetected
    }
}

#[derive(Clone)]
pub struct DriftChecker {
    store: Arc<dyn LedgerStore>,
    legacy: Arc<dyn LegacyBooks>,
    reporting: ReportingEngine,
}

impl DriftChecker {
    pub fn new(store: Arc<dyn LedgerStore>, legacy: Arc<dyn LegacyBooks>, reporting: ReportingEngine) -> Self {
        Self { store, legacy, reporting }
    }

    /// Compares per-customer outstanding balances and the sales and payment
    /// totals. Writes nothing.
    pub async fn daily_drift_check(&self) -> Result<DriftReport, LedgerError> {
        let customers = self.legacy.customers().await?;
        let legacy_totals = self.legacy.totals().await?;

        let mut tx = self.store.begin().await?;
        let mut customer_drift = Vec::new();
        for customer in &customers {
            let ledger = self
                .reporting
                .party_balance(tx.as_mut(), PartyRef::customer(customer.id), None)
                .await?;
            let legacy_outstanding = round_amount(customer.current_balance);
            let ledger_balance = round_amount(ledger.balance);
            if !within_tolerance(legacy_outstanding, ledger_balance) {
                customer_drift.push(CustomerDrift {
                    customer_id: customer.id,
                    customer_name: customer.name.clone(),
                    legacy_outstanding,
                    ledger_balance,
                    difference: legacy_outstanding - ledger_balance,
                });
            }
        }

        let totals = system_totals(&self.reporting, tx.as_mut(), &legacy_totals).await?;
        // read-only; dropping rolls back
        drop(tx);

        let payments = TotalComparison::new(
            totals.payments.legacy_payments + totals.payments.legacy_inline_paid,
            totals.payments.ledger_cash_debit,
        );
        let system_totals = DriftTotals { sales: totals.sales, payments };

        let status = if customer_drift.is_empty() && system_totals.sales.is_matched && payments.is_matched {
            DriftStatus::Ok
        } else {
            DriftStatus::DriftDetected
        };

        Ok(DriftReport {
            status,
            timestamp: Utc::now(),
            customers_checked: customers.len(),
            customer_drift,
            system_totals,
        })
    }

    /// Entry point for the external daily timer. Never fails; the outcome
    /// only reaches the logs.
    pub async fn run_scheduled_drift_check(&self) -> Option<DriftReport> {
        match self.daily_drift_check().await {
            Ok(report) if report.has_drift() => {
                warn!(
                    drifted_customers = report.customer_drift.len(),
                    sales_matched = report.system_totals.sales.is_matched,
                    sales_difference = %report.system_totals.sales.difference,
                    payments_matched = report.system_totals.payments.is_matched,
                    payments_difference = %report.system_totals.payments.difference,
                    "Ledger drift detected"
                );
                for drift in &report.customer_drift {
                    warn!(
                        customer_id = %drift.customer_id,
                        customer_name = %drift.customer_name,
                        legacy = %drift.legacy_outstanding,
                        ledger = %drift.ledger_balance,
                        difference = %drift.difference,
                        "Customer balance drifted"
                    );
                }
                Some(report)
            }
            Ok(report) => {
                info!(customers_checked = report.customers_checked, "Daily drift check OK");
                Some(report)
            }
            Err(e) => {
                error!(error = %e, "Scheduled drift check failed");
                None
            }
        }
    }
}
