//! Ledger service facade
//!
//! The in-process surface the shop application and the HTTP layer call.
//! Operations that own their unit of work open and commit a transaction;
//! the `_in` variants and the posting adapters run inside a transaction the
//! caller already holds.

use std::sync::Arc;

use chrono::NaiveDate;
use uuid::Uuid;

use core_kernel::{AccountId, BatchId, DateRange, OrderId, PartyId, PaymentId, PurchaseBillId};
use crate::account::{Account, PartyRef};
use crate::batch::{BatchRequest, JournalBatch, PostedBatch, ReferenceType};
use crate::config::LedgerConfig;
use crate::drift::{DriftChecker, DriftReport};
use crate::engine::BatchEngine;
use crate::error::LedgerError;
use crate::migration::{MigrationEngine, MigrationReport, ReconciliationReport};
use crate::ports::{AccountFilter, LedgerStore, LedgerTx, LegacyBooks, PurgeCounts};
use crate::posting::{
    InvoiceEvent, PaymentEvent, PaymentToggleEvent, PostingAdapters, PostingOutcome, PurchaseEvent,
};
use crate::registry::{AccountRegistry, ChartInitReport, NewAccount};
use crate::reporting::{
    AccountBalance, AccountLedger, BalanceSheet, HealthReport, PartyBalance, ProfitAndLoss,
    ReportingEngine, TrialBalance,
};

/// Service for every ledger operation
///
/// Cheap to clone; the stores are shared behind `Arc`.
///
/// # Example
///
/// ```rust,ignore
/// let service = LedgerService::new(store, legacy, LedgerConfig::default());
/// service.initialize_chart_of_accounts().await?;
///
/// let trial = service.get_trial_balance(None).await?;
/// assert!(trial.is_balanced);
/// ```
#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn LedgerStore>,
    config: LedgerConfig,
    registry: AccountRegistry,
    engine: BatchEngine,
    reporting: ReportingEngine,
    adapters: PostingAdapters,
    migration: MigrationEngine,
    drift: DriftChecker,
}

impl LedgerService {
    pub fn new(store: Arc<dyn LedgerStore>, legacy: Arc<dyn LegacyBooks>, config: LedgerConfig) -> Self {
        let registry = AccountRegistry::new(&config);
        let engine = BatchEngine::new(&config);
        let reporting = ReportingEngine::new(&config);
        let adapters = PostingAdapters::new(&config, registry.clone(), engine.clone());
        let migration = MigrationEngine::new(
            Arc::clone(&store),
            Arc::clone(&legacy),
            &config,
            registry.clone(),
            engine.clone(),
            reporting.clone(),
        );
        let drift = DriftChecker::new(Arc::clone(&store), legacy, reporting.clone());

        Self { store, config, registry, engine, reporting, adapters, migration, drift }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Opens a transaction for the `_in` operations and the posting adapters
    pub async fn begin(&self) -> Result<Box<dyn LedgerTx>, LedgerError> {
        Ok(self.store.begin().await?)
    }

    // ------------------------------------------------------------------
    // Chart of accounts
    // ------------------------------------------------------------------

    pub async fn initialize_chart_of_accounts(&self) -> Result<ChartInitReport, LedgerError> {
        let mut tx = self.begin().await?;
        let report = self.registry.initialize_chart(tx.as_mut()).await?;
        tx.commit().await?;
        Ok(report)
    }

    pub async fn create_account(&self, request: NewAccount) -> Result<Account, LedgerError> {
        let mut tx = self.begin().await?;
        let account = self.registry.create_account(tx.as_mut(), request).await?;
        tx.commit().await?;
        Ok(account)
    }

    pub async fn get_or_create_customer_account(&self, customer_id: PartyId, name: &str) -> Result<Account, LedgerError> {
        let mut tx = self.begin().await?;
        let account = self
            .registry
            .get_or_create_customer_account(tx.as_mut(), customer_id, name)
            .await?;
        tx.commit().await?;
        Ok(account)
    }

    pub async fn get_or_create_supplier_account(&self, supplier_id: PartyId, name: &str) -> Result<Account, LedgerError> {
        let mut tx = self.begin().await?;
        let account = self
            .registry
            .get_or_create_supplier_account(tx.as_mut(), supplier_id, name)
            .await?;
        tx.commit().await?;
        Ok(account)
    }

    pub async fn list_accounts(&self, filter: &AccountFilter) -> Result<Vec<Account>, LedgerError> {
        let mut tx = self.begin().await?;
        self.registry.list_accounts(tx.as_mut(), filter).await
    }

    pub async fn get_account(&self, id: AccountId) -> Result<Account, LedgerError> {
        let mut tx = self.begin().await?;
        self.registry.get_account(tx.as_mut(), id).await
    }

    pub async fn get_account_by_code(&self, code: &str) -> Result<Account, LedgerError> {
        let mut tx = self.begin().await?;
        self.registry.get_account_by_code(tx.as_mut(), code).await
    }

    // ------------------------------------------------------------------
    // Journal batches
    // ------------------------------------------------------------------

    /// Posts a batch in its own transaction
    pub async fn create_journal_batch(&self, request: BatchRequest) -> Result<PostedBatch, LedgerError> {
        let mut tx = self.begin().await?;
        let posted = self.engine.post(tx.as_mut(), request).await?;
        tx.commit().await?;
        Ok(posted)
    }

    pub async fn create_journal_batch_in(
        &self,
        tx: &mut dyn LedgerTx,
        request: BatchRequest,
    ) -> Result<PostedBatch, LedgerError> {
        self.engine.post(tx, request).await
    }

    pub async fn reverse_journal_batch(&self, batch_id: BatchId, reason: &str) -> Result<PostedBatch, LedgerError> {
        let mut tx = self.begin().await?;
        let reversal = self.engine.reverse(tx.as_mut(), batch_id, reason).await?;
        tx.commit().await?;
        Ok(reversal)
    }

    pub async fn reverse_journal_batch_in(
        &self,
        tx: &mut dyn LedgerTx,
        batch_id: BatchId,
        reason: &str,
    ) -> Result<PostedBatch, LedgerError> {
        self.engine.reverse(tx, batch_id, reason).await
    }

    pub async fn get_batch(&self, batch_id: BatchId) -> Result<PostedBatch, LedgerError> {
        let mut tx = self.begin().await?;
        self.engine.get_batch(tx.as_mut(), batch_id).await
    }

    pub async fn find_batches_by_reference(
        &self,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<Vec<JournalBatch>, LedgerError> {
        let mut tx = self.begin().await?;
        self.engine
            .find_batches_by_reference(tx.as_mut(), reference_type, reference_id)
            .await
    }

    // ------------------------------------------------------------------
    // Balances and reports
    // ------------------------------------------------------------------

    pub async fn get_account_balance(
        &self,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<AccountBalance, LedgerError> {
        let mut tx = self.begin().await?;
        self.reporting.account_balance(tx.as_mut(), account_id, as_of).await
    }

    pub async fn get_customer_ledger_balance(
        &self,
        customer_id: PartyId,
        as_of: Option<NaiveDate>,
    ) -> Result<PartyBalance, LedgerError> {
        let mut tx = self.begin().await?;
        self.reporting
            .party_balance(tx.as_mut(), PartyRef::customer(customer_id), as_of)
            .await
    }

    pub async fn get_supplier_ledger_balance(
        &self,
        supplier_id: PartyId,
        as_of: Option<NaiveDate>,
    ) -> Result<PartyBalance, LedgerError> {
        let mut tx = self.begin().await?;
        self.reporting
            .party_balance(tx.as_mut(), PartyRef::supplier(supplier_id), as_of)
            .await
    }

    pub async fn get_trial_balance(&self, as_of: Option<NaiveDate>) -> Result<TrialBalance, LedgerError> {
        let mut tx = self.begin().await?;
        self.reporting.trial_balance(tx.as_mut(), as_of).await
    }

    /// Income and expenses between two dates, both inclusive
    pub async fn get_profit_and_loss(&self, from: NaiveDate, to: NaiveDate) -> Result<ProfitAndLoss, LedgerError> {
        let period = DateRange::new(from, to).map_err(|e| LedgerError::validation(e.to_string()))?;
        let mut tx = self.begin().await?;
        self.reporting.profit_and_loss(tx.as_mut(), period).await
    }

    pub async fn get_balance_sheet(&self, as_of: Option<NaiveDate>) -> Result<BalanceSheet, LedgerError> {
        let mut tx = self.begin().await?;
        self.reporting.balance_sheet(tx.as_mut(), as_of).await
    }

    pub async fn get_account_ledger(
        &self,
        account_id: AccountId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AccountLedger, LedgerError> {
        let mut tx = self.begin().await?;
        self.reporting.account_ledger(tx.as_mut(), account_id, from, to).await
    }

    pub async fn health_check(&self) -> Result<HealthReport, LedgerError> {
        let mut tx = self.begin().await?;
        self.reporting.health_check(tx.as_mut()).await
    }

    // ------------------------------------------------------------------
    // Real-time posting, inside the caller's transaction
    // ------------------------------------------------------------------

    pub async fn post_invoice(&self, tx: &mut dyn LedgerTx, event: &InvoiceEvent) -> Result<PostingOutcome, LedgerError> {
        self.adapters.post_invoice(tx, event).await
    }

    pub async fn post_payment(&self, tx: &mut dyn LedgerTx, event: &PaymentEvent) -> Result<PostingOutcome, LedgerError> {
        self.adapters.post_payment(tx, event).await
    }

    pub async fn post_customer_payment(
        &self,
        tx: &mut dyn LedgerTx,
        event: &PaymentEvent,
    ) -> Result<PostingOutcome, LedgerError> {
        self.adapters.post_customer_payment(tx, event).await
    }

    pub async fn post_supplier_payment(
        &self,
        tx: &mut dyn LedgerTx,
        event: &PaymentEvent,
    ) -> Result<PostingOutcome, LedgerError> {
        self.adapters.post_supplier_payment(tx, event).await
    }

    pub async fn post_purchase(&self, tx: &mut dyn LedgerTx, event: &PurchaseEvent) -> Result<PostingOutcome, LedgerError> {
        self.adapters.post_purchase(tx, event).await
    }

    pub async fn post_payment_toggle(
        &self,
        tx: &mut dyn LedgerTx,
        event: &PaymentToggleEvent,
    ) -> Result<PostingOutcome, LedgerError> {
        self.adapters.post_payment_toggle(tx, event).await
    }

    pub async fn reverse_invoice(
        &self,
        tx: &mut dyn LedgerTx,
        order_id: OrderId,
        order_number: &str,
    ) -> Result<PostingOutcome, LedgerError> {
        self.adapters.reverse_invoice(tx, order_id, order_number).await
    }

    pub async fn reverse_payment(
        &self,
        tx: &mut dyn LedgerTx,
        payment_id: PaymentId,
        payment_number: &str,
    ) -> Result<PostingOutcome, LedgerError> {
        self.adapters.reverse_payment(tx, payment_id, payment_number).await
    }

    pub async fn reverse_purchase(
        &self,
        tx: &mut dyn LedgerTx,
        bill_id: PurchaseBillId,
        bill_number: &str,
    ) -> Result<PostingOutcome, LedgerError> {
        self.adapters.reverse_purchase(tx, bill_id, bill_number).await
    }

    // ------------------------------------------------------------------
    // Migration, reconciliation, drift
    // ------------------------------------------------------------------

    pub async fn run_full_migration(&self) -> Result<MigrationReport, LedgerError> {
        self.migration.run_full_migration().await
    }

    pub async fn run_reconciliation(&self) -> Result<ReconciliationReport, LedgerError> {
        self.migration.run_reconciliation().await
    }

    pub async fn clear_migration_data(&self) -> Result<PurgeCounts, LedgerError> {
        self.migration.clear_migration_data().await
    }

    pub async fn daily_drift_check(&self) -> Result<DriftReport, LedgerError> {
        self.drift.daily_drift_check().await
    }

    /// For the external daily timer; never fails
    pub async fn run_scheduled_drift_check(&self) -> Option<DriftReport> {
        self.drift.run_scheduled_drift_check().await
    }
}
