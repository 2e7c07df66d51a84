//! Migration and reconciliation engine
//!
//! One-time backfill of the ledger from the shop application's records,
//! followed by a per-party comparison of the legacy figures against the
//! computed ledger balances. Every migrated record runs in its own
//! transaction so one bad record does not block the rest; failures are
//! collected into the report instead of aborting the run.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use core_kernel::amount::{round_amount, within_tolerance};
use core_kernel::Timezone;
use crate::account::{codes, AccountType, PartyRef, PartyType};
use crate::batch::{BatchRequest, ReferenceType};
use crate::config::LedgerConfig;
use crate::engine::BatchEngine;
use crate::error::LedgerError;
use crate::ports::{
    AccountFilter, ActivityWindow, LedgerStore, LedgerTx, LegacyBooks, LegacyCustomer,
    LegacyOrder, LegacyPayment, LegacyPurchaseBill, LegacyTotals, PurgeCounts,
};
use crate::registry::{AccountRegistry, ChartInitReport};
use crate::reporting::{AccountLedgerLine, HealthReport, ReportingEngine};

const UNKNOWN_CUSTOMER: &str = "Unknown Customer";
const UNKNOWN_SUPPLIER: &str = "Unknown Supplier";

/// A record the migration could not post
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationIssue {
    pub record_id: Uuid,
    pub label: String,
    pub error: String,
}

/// Tally for one migration step
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StepReport {
    pub migrated: u32,
    pub skipped: u32,
    pub errors: Vec<MigrationIssue>,
}

impl StepReport {
    fn record(&mut self, record_id: Uuid, label: &str, result: Result<RecordOutcome, LedgerError>) {
        match result {
            Ok(RecordOutcome::Migrated) => self.migrated += 1,
            Ok(RecordOutcome::Skipped) => self.skipped += 1,
            Err(error) => {
                warn!(record_id = %record_id, label, error = %error, "Record failed to migrate");
                self.errors.push(MigrationIssue {
                    record_id,
                    label: label.to_string(),
                    error: error.to_string(),
                });
            }
        }
    }
}

/// What happened to a single source record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordOutcome {
    Migrated,
    /// Already migrated, or nothing to post
    Skipped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MigrationReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub chart: ChartInitReport,
    pub customers: StepReport,
    pub suppliers: StepReport,
    pub opening_balances: StepReport,
    pub orders: StepReport,
    pub payments: StepReport,
    pub purchases: StepReport,
    pub reconciliation: ReconciliationReport,
}

/// A legacy document behind a party balance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyDocument {
    pub id: Uuid,
    pub number: String,
    pub total: Decimal,
    pub paid_amount: Decimal,
    pub due_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyReconciliation {
    pub party: PartyRef,
    pub name: String,
    pub opening_balance: Decimal,
    /// Opening balance plus Σ due of the party's open documents
    pub legacy_balance: Decimal,
    pub ledger_balance: Decimal,
    pub difference: Decimal,
    pub is_matched: bool,
    pub has_ledger_account: bool,
    pub document_count: usize,
}

/// Side-by-side detail for a mismatched party
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MismatchDetail {
    pub party: PartyRef,
    pub name: String,
    pub difference: Decimal,
    pub legacy_documents: Vec<LegacyDocument>,
    pub ledger_lines: Vec<AccountLedgerLine>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalComparison {
    pub legacy: Decimal,
    pub ledger: Decimal,
    pub difference: Decimal,
    pub is_matched: bool,
}

impl TotalComparison {
    pub fn new(legacy: Decimal, ledger: Decimal) -> Self {
        let legacy = round_amount(legacy);
        let ledger = round_amount(ledger);
        Self {
            legacy,
            ledger,
            difference: legacy - ledger,
            is_matched: within_tolerance(legacy, ledger),
        }
    }
}

/// Money received: legacy payments table plus amounts paid on invoices,
/// against the debit side of Cash
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentComparison {
    pub legacy_payments: Decimal,
    pub legacy_inline_paid: Decimal,
    pub ledger_cash_debit: Decimal,
    pub ledger_cash_balance: Decimal,
    pub difference: Decimal,
    pub is_matched: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemTotals {
    pub sales: TotalComparison,
    pub payments: PaymentComparison,
    pub receivables: TotalComparison,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub total_customers: usize,
    pub total_suppliers: usize,
    pub matched: usize,
    pub mismatched: usize,
    pub total_legacy_receivable: Decimal,
    pub total_ledger_receivable: Decimal,
    pub overall_difference: Decimal,
    pub sales_matched: bool,
    pub receivables_matched: bool,
    pub ledger_balanced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconciliationReport {
    pub generated_at: DateTime<Utc>,
    pub customers: Vec<PartyReconciliation>,
    pub suppliers: Vec<PartyReconciliation>,
    pub mismatches: Vec<MismatchDetail>,
    pub system_totals: SystemTotals,
    pub health: HealthReport,
    pub summary: ReconciliationSummary,
}

#[derive(Clone)]
pub struct MigrationEngine {
    store: Arc<dyn LedgerStore>,
    legacy: Arc<dyn LegacyBooks>,
    registry: AccountRegistry,
    engine: BatchEngine,
    reporting: ReportingEngine,
    timezone: Timezone,
}

impl MigrationEngine {
    pub fn new(
        store: Arc<dyn LedgerStore>,
        legacy: Arc<dyn LegacyBooks>,
        config: &LedgerConfig,
        registry: AccountRegistry,
        engine: BatchEngine,
        reporting: ReportingEngine,
    ) -> Self {
        Self { store, legacy, registry, engine, reporting, timezone: config.timezone }
    }

    /// Migrates every legacy record, then reconciles
    ///
    /// Steps: chart of accounts, customer and supplier sub-accounts, opening
    /// balances, orders, payments, purchase bills. Re-running is safe; records
    /// that already have their migration batch are skipped.
    pub async fn run_full_migration(&self) -> Result<MigrationReport, LedgerError> {
        let started_at = Utc::now();
        info!("Ledger migration started");

        let mut tx = self.store.begin().await?;
        let chart = self.registry.initialize_chart(tx.as_mut()).await?;
        tx.commit().await?;

        let customers = self.legacy.customers().await?;
        let suppliers = self.legacy.suppliers().await?;

        let mut customer_step = StepReport::default();
        for customer in &customers {
            let party = PartyRef::customer(customer.id);
            let result = self.ensure_party_account(party, &customer.name).await;
            customer_step.record(customer.id.into(), &customer.name, result);
        }

        let mut supplier_step = StepReport::default();
        for supplier in &suppliers {
            let party = PartyRef::supplier(supplier.id);
            let result = self.ensure_party_account(party, &supplier.name).await;
            supplier_step.record(supplier.id.into(), &supplier.name, result);
        }

        let mut opening_step = StepReport::default();
        for customer in &customers {
            let party = PartyRef::customer(customer.id);
            let result = self
                .migrate_opening_balance(party, &customer.name, customer.opening_balance, customer.created_at)
                .await;
            opening_step.record(customer.id.into(), &customer.name, result);
        }
        for supplier in &suppliers {
            let party = PartyRef::supplier(supplier.id);
            let result = self
                .migrate_opening_balance(party, &supplier.name, supplier.opening_balance, supplier.created_at)
                .await;
            opening_step.record(supplier.id.into(), &supplier.name, result);
        }

        let mut order_step = StepReport::default();
        for order in self.legacy.orders().await? {
            let result = self.migrate_order(&order).await;
            order_step.record(order.id.into(), &order.order_number, result);
        }

        let mut payment_step = StepReport::default();
        for payment in self.legacy.payments().await? {
            let result = self.migrate_payment(&payment).await;
            payment_step.record(payment.id.into(), &payment.payment_number, result);
        }

        let mut purchase_step = StepReport::default();
        for bill in self.legacy.purchase_bills().await? {
            let result = self.migrate_purchase(&bill).await;
            purchase_step.record(bill.id.into(), &bill.bill_number, result);
        }

        let reconciliation = self.run_reconciliation().await?;

        info!(
            orders = order_step.migrated,
            payments = payment_step.migrated,
            purchases = purchase_step.migrated,
            matched = reconciliation.summary.matched,
            mismatched = reconciliation.summary.mismatched,
            "Ledger migration finished"
        );

        Ok(MigrationReport {
            started_at,
            finished_at: Utc::now(),
            chart,
            customers: customer_step,
            suppliers: supplier_step,
            opening_balances: opening_step,
            orders: order_step,
            payments: payment_step,
            purchases: purchase_step,
            reconciliation,
        })
    }

    async fn ensure_party_account(&self, party: PartyRef, name: &str) -> Result<RecordOutcome, LedgerError> {
        let mut tx = self.store.begin().await?;
        if tx.find_party_account(party).await?.is_some() {
            return Ok(RecordOutcome::Skipped);
        }
        self.registry.get_or_create_party_account(tx.as_mut(), party, name).await?;
        tx.commit().await?;
        Ok(RecordOutcome::Migrated)
    }

    async fn already_migrated(
        &self,
        tx: &mut dyn LedgerTx,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<bool, LedgerError> {
        Ok(!tx.find_batches_by_reference(reference_type, reference_id).await?.is_empty())
    }

    /// Posts a party's opening balance against Opening Balance Equity
    ///
    /// A positive opening balance increases the party account in its normal
    /// direction: a customer owes us, we owe a supplier.
    pub async fn migrate_opening_balance(
        &self,
        party: PartyRef,
        name: &str,
        opening_balance: Decimal,
        created_at: DateTime<Utc>,
    ) -> Result<RecordOutcome, LedgerError> {
        let amount = round_amount(opening_balance);
        if amount.is_zero() {
            return Ok(RecordOutcome::Skipped);
        }

        let mut tx = self.store.begin().await?;
        let reference_id = Uuid::from(party.party_id);
        if self.already_migrated(tx.as_mut(), ReferenceType::Opening, reference_id).await? {
            return Ok(RecordOutcome::Skipped);
        }

        let account = self.registry.get_or_create_party_account(tx.as_mut(), party, name).await?;
        let equity = self
            .registry
            .require_system_account(tx.as_mut(), codes::OPENING_BALANCE_EQUITY)
            .await?;

        let absolute = amount.abs();
        let debit_party = amount.is_sign_positive() == party.party_type.account_type().is_debit_normal();
        let (debit_account, credit_account) = if debit_party {
            (account.id, equity.id)
        } else {
            (equity.id, account.id)
        };
        let narration = format!("Opening balance - {}", name);

        let request = BatchRequest::new(ReferenceType::Opening)
            .with_reference(reference_id)
            .with_description(format!("Opening balance for {} {}", party.party_type, name))
            .dated(self.timezone.accounting_date(created_at))
            .debit(debit_account, absolute, narration.clone())
            .credit(credit_account, absolute, narration);
        self.engine.post(tx.as_mut(), request).await?;
        tx.commit().await?;

        Ok(RecordOutcome::Migrated)
    }

    /// Migrates an order: the sale, plus the amount paid on it if any
    pub async fn migrate_order(&self, order: &LegacyOrder) -> Result<RecordOutcome, LedgerError> {
        let mut tx = self.store.begin().await?;
        let reference_id = Uuid::from(order.id);
        if self.already_migrated(tx.as_mut(), ReferenceType::Migration, reference_id).await? {
            return Ok(RecordOutcome::Skipped);
        }
        if order.total <= Decimal::ZERO {
            return Ok(RecordOutcome::Skipped);
        }

        let customer = match (order.customer_id, order.customer_name.as_deref()) {
            (Some(customer_id), name) => {
                let name = name.filter(|n| !n.trim().is_empty()).unwrap_or(UNKNOWN_CUSTOMER);
                self.registry
                    .get_or_create_customer_account(tx.as_mut(), customer_id, name)
                    .await?
            }
            (None, Some(name)) => match self.legacy.find_customer_by_name(name).await? {
                Some(found) => {
                    self.registry
                        .get_or_create_customer_account(tx.as_mut(), found.id, &found.name)
                        .await?
                }
                None => {
                    return Err(LedgerError::validation(format!(
                        "Could not determine customer account for order {}",
                        order.order_number
                    )))
                }
            },
            (None, None) => {
                return Err(LedgerError::validation(format!(
                    "Order {} has no customer",
                    order.order_number
                )))
            }
        };

        let sales = self.registry.require_system_account(tx.as_mut(), codes::SALES_REVENUE).await?;
        let date = self.timezone.accounting_date(order.created_at);
        let narration = format!("Invoice {}", order.order_number);

        let request = BatchRequest::new(ReferenceType::Migration)
            .with_reference(reference_id)
            .with_description(format!("Migration: Invoice {}", order.order_number))
            .dated(date)
            .debit(customer.id, order.total, narration.clone())
            .credit(sales.id, order.total, narration);
        self.engine.post(tx.as_mut(), request).await?;

        if order.paid_amount > Decimal::ZERO {
            let cash = self.registry.require_system_account(tx.as_mut(), codes::CASH).await?;
            let narration = format!("Payment received for {}", order.order_number);
            let request = BatchRequest::new(ReferenceType::Migration)
                .with_reference(reference_id)
                .with_description(format!("Migration: Payment for Invoice {}", order.order_number))
                .dated(date)
                .debit(cash.id, order.paid_amount, narration.clone())
                .credit(customer.id, order.paid_amount, narration);
            self.engine.post(tx.as_mut(), request).await?;
        }

        tx.commit().await?;
        Ok(RecordOutcome::Migrated)
    }

    /// Migrates a payment against the party's existing sub-account
    pub async fn migrate_payment(&self, payment: &LegacyPayment) -> Result<RecordOutcome, LedgerError> {
        let mut tx = self.store.begin().await?;
        let reference_id = Uuid::from(payment.id);
        if self.already_migrated(tx.as_mut(), ReferenceType::Migration, reference_id).await? {
            return Ok(RecordOutcome::Skipped);
        }
        if payment.amount <= Decimal::ZERO {
            return Ok(RecordOutcome::Skipped);
        }

        let party = PartyRef { party_id: payment.party_id, party_type: payment.party_type };
        let account = tx.find_party_account(party).await?.ok_or_else(|| {
            LedgerError::AccountNotFound(format!(
                "{} account for {} ({})",
                payment.party_type, payment.party_name, payment.party_id
            ))
        })?;
        let cash = self.registry.require_system_account(tx.as_mut(), codes::CASH).await?;

        let request = match payment.party_type {
            PartyType::Customer => {
                let narration = format!("Receipt {}", payment.payment_number);
                BatchRequest::new(ReferenceType::Migration)
                    .with_description(format!("Migration: Receipt {}", payment.payment_number))
                    .debit(cash.id, payment.amount, narration.clone())
                    .credit(account.id, payment.amount, narration)
            }
            PartyType::Supplier => {
                let narration = format!("Payment {} to {}", payment.payment_number, payment.party_name);
                BatchRequest::new(ReferenceType::Migration)
                    .with_description(format!("Migration: Payment {} to {}", payment.payment_number, payment.party_name))
                    .debit(account.id, payment.amount, narration.clone())
                    .credit(cash.id, payment.amount, narration)
            }
        }
        .with_reference(reference_id)
        .dated(self.timezone.accounting_date(payment.created_at));

        self.engine.post(tx.as_mut(), request).await?;
        tx.commit().await?;
        Ok(RecordOutcome::Migrated)
    }

    /// Migrates a purchase bill, plus the amount paid on it if any
    pub async fn migrate_purchase(&self, bill: &LegacyPurchaseBill) -> Result<RecordOutcome, LedgerError> {
        let mut tx = self.store.begin().await?;
        let reference_id = Uuid::from(bill.id);
        if self.already_migrated(tx.as_mut(), ReferenceType::Migration, reference_id).await? {
            return Ok(RecordOutcome::Skipped);
        }
        if bill.total <= Decimal::ZERO {
            return Ok(RecordOutcome::Skipped);
        }

        let name = bill
            .supplier_name
            .as_deref()
            .filter(|n| !n.trim().is_empty())
            .unwrap_or(UNKNOWN_SUPPLIER);
        let supplier = self
            .registry
            .get_or_create_supplier_account(tx.as_mut(), bill.supplier_id, name)
            .await?;
        let purchases = self
            .registry
            .require_system_account(tx.as_mut(), codes::PURCHASE_EXPENSES)
            .await?;
        let date = self.timezone.accounting_date(bill.created_at);
        let narration = format!("Purchase {}", bill.bill_number);

        let request = BatchRequest::new(ReferenceType::Migration)
            .with_reference(reference_id)
            .with_description(format!("Migration: Purchase {}", bill.bill_number))
            .dated(date)
            .debit(purchases.id, bill.total, narration.clone())
            .credit(supplier.id, bill.total, narration);
        self.engine.post(tx.as_mut(), request).await?;

        if bill.paid_amount > Decimal::ZERO {
            let cash = self.registry.require_system_account(tx.as_mut(), codes::CASH).await?;
            let narration = format!("Payment for purchase {}", bill.bill_number);
            let request = BatchRequest::new(ReferenceType::Migration)
                .with_reference(reference_id)
                .with_description(format!("Migration: Payment for Purchase {}", bill.bill_number))
                .dated(date)
                .debit(supplier.id, bill.paid_amount, narration.clone())
                .credit(cash.id, bill.paid_amount, narration);
            self.engine.post(tx.as_mut(), request).await?;
        }

        tx.commit().await?;
        Ok(RecordOutcome::Migrated)
    }

    /// Compares every customer and supplier against the ledger
    ///
    /// Legacy customer balance = opening balance + Σ due of the customer's
    /// orders (orders without a customer id are matched by name). Legacy
    /// supplier balance = opening balance + Σ due of the supplier's bills.
    pub async fn run_reconciliation(&self) -> Result<ReconciliationReport, LedgerError> {
        let customers = self.legacy.customers().await?;
        let suppliers = self.legacy.suppliers().await?;
        let orders = self.legacy.orders().await?;
        let bills = self.legacy.purchase_bills().await?;
        let legacy_totals = self.legacy.totals().await?;

        let mut tx = self.store.begin().await?;
        let mut customer_rows = Vec::with_capacity(customers.len());
        let mut supplier_rows = Vec::with_capacity(suppliers.len());
        let mut mismatches = Vec::new();

        for customer in &customers {
            let documents: Vec<LegacyDocument> = orders
                .iter()
                .filter(|o| order_belongs_to(o, customer))
                .map(|o| LegacyDocument {
                    id: o.id.into(),
                    number: o.order_number.clone(),
                    total: o.total,
                    paid_amount: o.paid_amount,
                    due_amount: o.due_amount,
                    created_at: o.created_at,
                })
                .collect();
            let row = self
                .reconcile_party(tx.as_mut(), PartyRef::customer(customer.id), &customer.name, customer.opening_balance, documents, &mut mismatches)
                .await?;
            customer_rows.push(row);
        }

        for supplier in &suppliers {
            let documents: Vec<LegacyDocument> = bills
                .iter()
                .filter(|b| b.supplier_id == supplier.id)
                .map(|b| LegacyDocument {
                    id: b.id.into(),
                    number: b.bill_number.clone(),
                    total: b.total,
                    paid_amount: b.paid_amount,
                    due_amount: b.due_amount,
                    created_at: b.created_at,
                })
                .collect();
            let row = self
                .reconcile_party(tx.as_mut(), PartyRef::supplier(supplier.id), &supplier.name, supplier.opening_balance, documents, &mut mismatches)
                .await?;
            supplier_rows.push(row);
        }

        let system_totals = system_totals(&self.reporting, tx.as_mut(), &legacy_totals).await?;
        let health = self.reporting.health_check(tx.as_mut()).await?;
        tx.commit().await?;

        let matched = customer_rows.iter().chain(&supplier_rows).filter(|r| r.is_matched).count();
        let total_legacy_receivable: Decimal = customer_rows.iter().map(|r| r.legacy_balance).sum();
        let total_ledger_receivable: Decimal = customer_rows.iter().map(|r| r.ledger_balance).sum();

        let summary = ReconciliationSummary {
            total_customers: customer_rows.len(),
            total_suppliers: supplier_rows.len(),
            matched,
            mismatched: customer_rows.len() + supplier_rows.len() - matched,
            total_legacy_receivable,
            total_ledger_receivable,
            overall_difference: total_legacy_receivable - total_ledger_receivable,
            sales_matched: system_totals.sales.is_matched,
            receivables_matched: system_totals.receivables.is_matched,
            ledger_balanced: health.is_balanced,
        };

        info!(
            matched = summary.matched,
            mismatched = summary.mismatched,
            ledger_balanced = summary.ledger_balanced,
            "Reconciliation complete"
        );

        Ok(ReconciliationReport {
            generated_at: Utc::now(),
            customers: customer_rows,
            suppliers: supplier_rows,
            mismatches,
            system_totals,
            health,
            summary,
        })
    }

    async fn reconcile_party(
        &self,
        tx: &mut dyn LedgerTx,
        party: PartyRef,
        name: &str,
        opening_balance: Decimal,
        documents: Vec<LegacyDocument>,
        mismatches: &mut Vec<MismatchDetail>,
    ) -> Result<PartyReconciliation, LedgerError> {
        let due: Decimal = documents.iter().map(|d| d.due_amount).sum();
        let legacy_balance = round_amount(opening_balance + due);
        let ledger = self.reporting.party_balance(tx, party, None).await?;
        let ledger_balance = round_amount(ledger.balance);
        let difference = legacy_balance - ledger_balance;
        let is_matched = within_tolerance(legacy_balance, ledger_balance);

        let row = PartyReconciliation {
            party,
            name: name.to_string(),
            opening_balance,
            legacy_balance,
            ledger_balance,
            difference,
            is_matched,
            has_ledger_account: ledger.has_ledger_account,
            document_count: documents.len(),
        };

        if !is_matched {
            let ledger_lines = match ledger.account_id {
                Some(account_id) => self.reporting.account_ledger(tx, account_id, None, None).await?.lines,
                None => Vec::new(),
            };
            mismatches.push(MismatchDetail {
                party,
                name: name.to_string(),
                difference,
                legacy_documents: documents,
                ledger_lines,
            });
        }

        Ok(row)
    }

    /// Deletes every `Migration` batch and its entries in one transaction
    ///
    /// Reversals of deleted batches go with them; each such pair nets to zero,
    /// so no other balance moves.
    pub async fn clear_migration_data(&self) -> Result<PurgeCounts, LedgerError> {
        let mut tx = self.store.begin().await?;
        let counts = tx.delete_batches_of_type(ReferenceType::Migration).await?;
        tx.commit().await?;
        warn!(batches = counts.batches, entries = counts.entries, "Migration data cleared");
        Ok(counts)
    }
}

fn order_belongs_to(order: &LegacyOrder, customer: &LegacyCustomer) -> bool {
    match order.customer_id {
        Some(id) => id == customer.id,
        None => order.customer_name.as_deref() == Some(customer.name.as_str()),
    }
}

/// Compares legacy system-wide totals with the ledger's Sales, Cash and
/// receivable accounts. Missing system accounts read as zero.
pub(crate) async fn system_totals(
    reporting: &ReportingEngine,
    tx: &mut dyn LedgerTx,
    legacy: &LegacyTotals,
) -> Result<SystemTotals, LedgerError> {
    let sales_credit = match tx.find_account_by_code(codes::SALES_REVENUE).await? {
        Some(sales) => reporting.account_balance(tx, sales.id, None).await?.total_credit,
        None => Decimal::ZERO,
    };

    let (cash_debit, cash_balance) = match tx.find_account_by_code(codes::CASH).await? {
        Some(cash) => {
            let balance = reporting.account_balance(tx, cash.id, None).await?;
            (balance.total_debit, balance.balance)
        }
        None => (Decimal::ZERO, Decimal::ZERO),
    };

    let receivable_prefix = format!("{}-", codes::ACCOUNTS_RECEIVABLE);
    let filter = AccountFilter { account_type: Some(AccountType::Asset), is_active: None };
    let mut ledger_receivable = Decimal::ZERO;
    for account in tx.list_accounts(&filter).await? {
        if account.code == codes::ACCOUNTS_RECEIVABLE || account.code.starts_with(&receivable_prefix) {
            let activity = tx
                .account_activity(&ActivityWindow::default().for_account(account.id))
                .await?;
            for a in activity {
                ledger_receivable += account.normal_balance(a.total_debit, a.total_credit);
            }
        }
    }

    let legacy_received = round_amount(legacy.customer_payments + legacy.inline_paid);
    let ledger_cash_debit = round_amount(cash_debit);

    Ok(SystemTotals {
        sales: TotalComparison::new(legacy.total_sales, sales_credit),
        payments: PaymentComparison {
            legacy_payments: round_amount(legacy.customer_payments),
            legacy_inline_paid: round_amount(legacy.inline_paid),
            ledger_cash_debit,
            ledger_cash_balance: round_amount(cash_balance),
            difference: legacy_received - ledger_cash_debit,
            is_matched: within_tolerance(legacy_received, ledger_cash_debit),
        },
        receivables: TotalComparison::new(legacy.receivable_due, ledger_receivable),
    })
}
