//! Shared setup for the ledger integration tests

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use uuid::Uuid;

use core_kernel::{AccountId, BatchId};
use domain_ledger::memory::{InMemoryLedgerStore, InMemoryLegacyBooks};
use domain_ledger::ports::{
    AccountActivity, AccountFilter, ActivityWindow, BatchFilter, PostedLine, PurgeCounts,
};
use domain_ledger::{
    Account, JournalBatch, LedgerConfig, LedgerEntry, LedgerService, LedgerTx, PartyRef, PartyType,
    ReferenceType, StoreError,
};

pub struct Harness {
    pub service: LedgerService,
    pub store: InMemoryLedgerStore,
    pub legacy: Arc<InMemoryLegacyBooks>,
}

impl Harness {
    pub async fn account(&self, code: &str) -> Account {
        self.service.get_account_by_code(code).await.unwrap()
    }
}

/// Service over empty stores, chart not yet initialized
pub fn bare(config: LedgerConfig) -> Harness {
    with_books(InMemoryLegacyBooks::new(), config)
}

pub fn with_books(books: InMemoryLegacyBooks, config: LedgerConfig) -> Harness {
    let store = InMemoryLedgerStore::new();
    let legacy = Arc::new(books);
    let service = LedgerService::new(Arc::new(store.clone()), legacy.clone(), config);
    Harness { service, store, legacy }
}

/// Service with the standard chart in place
pub async fn ready() -> Harness {
    let harness = bare(LedgerConfig::default());
    harness.service.initialize_chart_of_accounts().await.unwrap();
    harness
}

pub fn date(year: i32, month: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, day).unwrap()
}

/// 06:00 UTC, the same calendar day in Asia/Kolkata
pub fn at(year: i32, month: u32, day: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(year, month, day, 6, 0, 0).unwrap()
}

/// A transaction whose first lookups miss rows that are already committed
///
/// Stands in for a second caller that read before the first one committed:
/// the hidden lookups return nothing, every write still hits the real store
/// and its uniqueness rules.
pub struct LaggingTx {
    inner: Box<dyn LedgerTx>,
    stale_party_lookups: usize,
    stale_reference_lookups: usize,
}

impl LaggingTx {
    pub fn new(inner: Box<dyn LedgerTx>) -> Self {
        Self { inner, stale_party_lookups: 0, stale_reference_lookups: 0 }
    }

    pub fn missing_party_accounts(mut self, lookups: usize) -> Self {
        self.stale_party_lookups = lookups;
        self
    }

    pub fn missing_batches(mut self, lookups: usize) -> Self {
        self.stale_reference_lookups = lookups;
        self
    }

    /// Commits the wrapped transaction
    pub async fn finish(self) {
        self.inner.commit().await.unwrap();
    }
}

#[async_trait]
impl LedgerTx for LaggingTx {
    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        self.inner.find_account(id).await
    }

    async fn find_account_by_code(&mut self, code: &str) -> Result<Option<Account>, StoreError> {
        self.inner.find_account_by_code(code).await
    }

    async fn find_party_account(&mut self, party: PartyRef) -> Result<Option<Account>, StoreError> {
        if self.stale_party_lookups > 0 {
            self.stale_party_lookups -= 1;
            return Ok(None);
        }
        self.inner.find_party_account(party).await
    }

    async fn list_accounts(&mut self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError> {
        self.inner.list_accounts(filter).await
    }

    async fn party_account_codes(&mut self, party_type: PartyType) -> Result<Vec<String>, StoreError> {
        self.inner.party_account_codes(party_type).await
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.inner.insert_account(account).await
    }

    async fn insert_account_if_absent(&mut self, account: &Account) -> Result<bool, StoreError> {
        self.inner.insert_account_if_absent(account).await
    }

    async fn set_account_parent(&mut self, id: AccountId, parent_id: AccountId) -> Result<(), StoreError> {
        self.inner.set_account_parent(id, parent_id).await
    }

    async fn insert_batch(&mut self, batch: &JournalBatch) -> Result<(), StoreError> {
        self.inner.insert_batch(batch).await
    }

    async fn insert_entries(&mut self, entries: &[LedgerEntry]) -> Result<(), StoreError> {
        self.inner.insert_entries(entries).await
    }

    async fn find_batch(&mut self, id: BatchId) -> Result<Option<JournalBatch>, StoreError> {
        self.inner.find_batch(id).await
    }

    async fn batch_entries(&mut self, id: BatchId) -> Result<Vec<LedgerEntry>, StoreError> {
        self.inner.batch_entries(id).await
    }

    async fn find_batches_by_reference(
        &mut self,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<Vec<JournalBatch>, StoreError> {
        if self.stale_reference_lookups > 0 {
            self.stale_reference_lookups -= 1;
            return Ok(Vec::new());
        }
        self.inner.find_batches_by_reference(reference_type, reference_id).await
    }

    async fn list_batches(&mut self, filter: &BatchFilter) -> Result<Vec<JournalBatch>, StoreError> {
        self.inner.list_batches(filter).await
    }

    async fn mark_batch_reversed(&mut self, id: BatchId, reversal_id: BatchId) -> Result<(), StoreError> {
        self.inner.mark_batch_reversed(id, reversal_id).await
    }

    async fn account_activity(&mut self, window: &ActivityWindow) -> Result<Vec<AccountActivity>, StoreError> {
        self.inner.account_activity(window).await
    }

    async fn posted_lines(&mut self, window: &ActivityWindow) -> Result<Vec<PostedLine>, StoreError> {
        self.inner.posted_lines(window).await
    }

    async fn delete_batches_of_type(&mut self, reference_type: ReferenceType) -> Result<PurgeCounts, StoreError> {
        self.inner.delete_batches_of_type(reference_type).await
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.inner.commit().await
    }
}
