//! Storage ports
//!
//! The ledger core talks to storage through two traits:
//!
//! - [`LedgerStore`] / [`LedgerTx`]: the ledger's own tables. Every read and
//!   write happens inside an explicit transaction object; dropping a `LedgerTx`
//!   without calling [`LedgerTx::commit`] rolls it back.
//! - [`LegacyBooks`]: read-only access to the shop application's records
//!   (customers, suppliers, orders, payments, purchase bills).
//!
//! ```text
//!   posting adapters ─┐
//!   migration ────────┼──► BatchEngine ──► &mut dyn LedgerTx ──► Postgres / memory
//!   reporting ────────┘
//!   drift check ───────────────────────► LegacyBooks (read-only)
//! ```

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::{AccountId, BatchId, DateRange, OrderId, PartyId, PaymentId, PurchaseBillId};
use crate::account::{Account, AccountType, PartyRef, PartyType};
use crate::batch::{JournalBatch, LedgerEntry, ReferenceType};
use crate::error::StoreError;

/// Factory for ledger transactions
#[async_trait]
pub trait LedgerStore: Send + Sync {
    /// Opens a new transaction
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError>;
}

/// Filter for account listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountFilter {
    pub account_type: Option<AccountType>,
    pub is_active: Option<bool>,
}

impl AccountFilter {
    pub fn matches(&self, account: &Account) -> bool {
        self.account_type.map_or(true, |t| account.account_type == t)
            && self.is_active.map_or(true, |a| account.is_active == a)
    }
}

/// Filter for batch listings
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchFilter {
    pub reference_type: Option<ReferenceType>,
    /// Restrict to effective batches (posted, not reversed, not a reversal)
    pub effective_only: bool,
}

impl BatchFilter {
    pub fn effective() -> Self {
        Self { reference_type: None, effective_only: true }
    }

    pub fn of_type(reference_type: ReferenceType) -> Self {
        Self { reference_type: Some(reference_type), effective_only: false }
    }

    pub fn matches(&self, batch: &JournalBatch) -> bool {
        self.reference_type.map_or(true, |t| batch.reference_type == t)
            && (!self.effective_only || batch.is_effective())
    }
}

/// Date window (inclusive on both ends) and optional account restriction for
/// activity queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivityWindow {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub account_id: Option<AccountId>,
}

impl ActivityWindow {
    /// Everything posted on or before `date`
    pub fn up_to(date: NaiveDate) -> Self {
        Self { from: None, to: Some(date), account_id: None }
    }

    pub fn within(range: DateRange) -> Self {
        Self { from: Some(range.start), to: Some(range.end), account_id: None }
    }

    pub fn for_account(mut self, account_id: AccountId) -> Self {
        self.account_id = Some(account_id);
        self
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |f| date >= f) && self.to.map_or(true, |t| date <= t)
    }
}

/// Debit and credit totals of one account over effective batches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountActivity {
    pub account_id: AccountId,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

/// An entry joined with the batch it belongs to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedLine {
    pub entry: LedgerEntry,
    pub batch_number: String,
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    pub transaction_date: NaiveDate,
    pub batch_created_at: DateTime<Utc>,
}

/// Rows removed by a bulk purge
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurgeCounts {
    pub batches: u64,
    pub entries: u64,
}

/// One open ledger transaction
///
/// All methods see the transaction's own uncommitted writes.
#[async_trait]
pub trait LedgerTx: Send {
    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError>;

    async fn find_account_by_code(&mut self, code: &str) -> Result<Option<Account>, StoreError>;

    async fn find_party_account(&mut self, party: PartyRef) -> Result<Option<Account>, StoreError>;

    /// Accounts matching the filter, ordered by code
    async fn list_accounts(&mut self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError>;

    /// Codes of all existing sub-accounts of the given party type
    async fn party_account_codes(&mut self, party_type: PartyType) -> Result<Vec<String>, StoreError>;

    /// Inserts an account; `StoreError::Conflict` if the code or party is taken
    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError>;

    /// Inserts an account unless its code or party is already taken.
    ///
    /// Returns false on a uniqueness conflict without poisoning the
    /// transaction.
    async fn insert_account_if_absent(&mut self, account: &Account) -> Result<bool, StoreError>;

    async fn set_account_parent(&mut self, id: AccountId, parent_id: AccountId) -> Result<(), StoreError>;

    /// Inserts a batch header; `StoreError::Conflict` on a duplicate batch
    /// number or a duplicate unique `(reference_type, reference_id)`
    async fn insert_batch(&mut self, batch: &JournalBatch) -> Result<(), StoreError>;

    async fn insert_entries(&mut self, entries: &[LedgerEntry]) -> Result<(), StoreError>;

    async fn find_batch(&mut self, id: BatchId) -> Result<Option<JournalBatch>, StoreError>;

    /// Entries of a batch in line order
    async fn batch_entries(&mut self, id: BatchId) -> Result<Vec<LedgerEntry>, StoreError>;

    /// Batches for a business record, oldest first
    async fn find_batches_by_reference(
        &mut self,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<Vec<JournalBatch>, StoreError>;

    async fn list_batches(&mut self, filter: &BatchFilter) -> Result<Vec<JournalBatch>, StoreError>;

    /// Sets the reversal link. `StoreError::Conflict` if the batch is already
    /// reversed, `StoreError::NotFound` if it does not exist.
    async fn mark_batch_reversed(&mut self, id: BatchId, reversal_id: BatchId) -> Result<(), StoreError>;

    /// Per-account totals over effective batches dated inside the window.
    /// Accounts without activity are omitted.
    async fn account_activity(&mut self, window: &ActivityWindow) -> Result<Vec<AccountActivity>, StoreError>;

    /// Effective lines inside the window ordered by transaction date, batch
    /// creation time, then line number
    async fn posted_lines(&mut self, window: &ActivityWindow) -> Result<Vec<PostedLine>, StoreError>;

    /// Deletes every batch of the given type together with its entries
    async fn delete_batches_of_type(&mut self, reference_type: ReferenceType) -> Result<PurgeCounts, StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}

/// A customer as kept by the shop application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyCustomer {
    pub id: PartyId,
    pub name: String,
    pub opening_balance: Decimal,
    /// The application's running balance counter
    pub current_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A supplier as kept by the shop application
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacySupplier {
    pub id: PartyId,
    pub name: String,
    pub opening_balance: Decimal,
    pub current_balance: Decimal,
    pub created_at: DateTime<Utc>,
}

/// A sales invoice
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyOrder {
    pub id: OrderId,
    pub order_number: String,
    /// Walk-in sales may carry only a name
    pub customer_id: Option<PartyId>,
    pub customer_name: Option<String>,
    pub total: Decimal,
    pub paid_amount: Decimal,
    pub due_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// What a legacy payment was recorded against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentReference {
    Order,
    Purchase,
    Advance,
}

/// A payment received from a customer or made to a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyPayment {
    pub id: PaymentId,
    pub payment_number: String,
    pub party_type: PartyType,
    pub party_id: PartyId,
    pub party_name: String,
    pub amount: Decimal,
    pub reference: PaymentReference,
    pub reference_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A supplier purchase bill
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegacyPurchaseBill {
    pub id: PurchaseBillId,
    pub bill_number: String,
    pub supplier_id: PartyId,
    pub supplier_name: Option<String>,
    pub total: Decimal,
    pub paid_amount: Decimal,
    pub due_amount: Decimal,
    pub created_at: DateTime<Utc>,
}

/// System-wide aggregates over the legacy records
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LegacyTotals {
    /// Σ total of non-deleted orders
    pub total_sales: Decimal,
    /// Σ amount of customer payments
    pub customer_payments: Decimal,
    /// Σ paid amount recorded on non-deleted orders
    pub inline_paid: Decimal,
    /// Σ due amount of non-deleted orders
    pub receivable_due: Decimal,
}

/// Read-only view of the shop application's books
#[async_trait]
pub trait LegacyBooks: Send + Sync {
    /// All customers ordered by name
    async fn customers(&self) -> Result<Vec<LegacyCustomer>, StoreError>;

    /// All suppliers ordered by name
    async fn suppliers(&self) -> Result<Vec<LegacySupplier>, StoreError>;

    /// Non-deleted orders, oldest first
    async fn orders(&self) -> Result<Vec<LegacyOrder>, StoreError>;

    /// All payments, oldest first
    async fn payments(&self) -> Result<Vec<LegacyPayment>, StoreError>;

    /// Non-deleted purchase bills, oldest first
    async fn purchase_bills(&self) -> Result<Vec<LegacyPurchaseBill>, StoreError>;

    async fn find_customer_by_name(&self, name: &str) -> Result<Option<LegacyCustomer>, StoreError>;

    async fn totals(&self) -> Result<LegacyTotals, StoreError>;
}
