//! Custom Test Assertions
//!
//! Assertion helpers for ledger reports that print the figures involved
//! when they fail.

use domain_ledger::migration::ReconciliationReport;
use domain_ledger::reporting::{BalanceSheet, HealthReport, TrialBalance};
use domain_ledger::{JournalBatch, LedgerEntry};
use rust_decimal::Decimal;

/// Asserts that two amounts agree to the paisa
pub fn assert_amount_eq(actual: Decimal, expected: Decimal) {
    assert_eq!(
        actual.round_dp(2),
        expected.round_dp(2),
        "Amounts differ: actual={}, expected={}",
        actual,
        expected
    );
}

/// Asserts that a trial balance balances and its lines add up to its totals
pub fn assert_trial_balanced(trial: &TrialBalance) {
    let debit: Decimal = trial.lines.iter().map(|l| l.total_debit).sum();
    let credit: Decimal = trial.lines.iter().map(|l| l.total_credit).sum();

    assert!(
        trial.is_balanced,
        "Trial balance as of {} is off: debit={}, credit={}, difference={}",
        trial.as_of, trial.total_debit, trial.total_credit, trial.difference
    );
    assert_eq!(debit, trial.total_debit, "Debit column does not add up");
    assert_eq!(credit, trial.total_credit, "Credit column does not add up");
}

/// Asserts the accounting equation on a balance sheet
pub fn assert_sheet_balanced(sheet: &BalanceSheet) {
    assert!(
        sheet.is_balanced,
        "Balance sheet as of {} is off: assets={}, liabilities+equity={}",
        sheet.as_of, sheet.assets.total, sheet.total_liabilities_and_equity
    );
}

/// Asserts that no effective batch is unbalanced
pub fn assert_ledger_healthy(health: &HealthReport) {
    assert!(
        health.is_balanced && health.unbalanced_batches.is_empty(),
        "Ledger unhealthy: difference={}, unbalanced batches={:?}",
        health.difference,
        health.unbalanced_batches.iter().map(|b| &b.batch_number).collect::<Vec<_>>()
    );
}

/// Asserts that a stored batch header agrees with its entries
pub fn assert_batch_consistent(batch: &JournalBatch, entries: &[LedgerEntry]) {
    let debit: Decimal = entries.iter().map(|e| e.debit).sum();
    let credit: Decimal = entries.iter().map(|e| e.credit).sum();

    assert!(entries.iter().all(|e| e.batch_id == batch.id), "Entry from another batch");
    assert_eq!(batch.total_debit, debit, "{}: header debit differs from entries", batch.batch_number);
    assert_eq!(batch.total_credit, credit, "{}: header credit differs from entries", batch.batch_number);
    assert!(batch.is_balanced, "{} is not flagged balanced", batch.batch_number);
}

/// Asserts that every party reconciled and the system totals agree
pub fn assert_fully_reconciled(report: &ReconciliationReport) {
    let off: Vec<String> = report
        .customers
        .iter()
        .chain(report.suppliers.iter())
        .filter(|p| !p.is_matched)
        .map(|p| format!("{} (legacy {}, ledger {})", p.name, p.legacy_balance, p.ledger_balance))
        .collect();

    assert!(off.is_empty(), "Parties not reconciled: {}", off.join(", "));
    assert!(report.system_totals.sales.is_matched, "Sales totals differ: {:?}", report.system_totals.sales);
    assert!(
        report.system_totals.receivables.is_matched,
        "Receivable totals differ: {:?}",
        report.system_totals.receivables
    );
}
