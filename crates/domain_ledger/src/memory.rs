//! In-process storage adapters
//!
//! [`InMemoryLedgerStore`] keeps the ledger tables behind one async mutex. A
//! transaction holds the lock for its whole life and works on a private copy
//! of the state; `commit` writes the copy back, dropping discards it. The
//! uniqueness and reference rules match the Postgres schema, so code tested
//! against this store sees the same conflicts it would in production.
//!
//! Transactions are serialized: a task must not open a second transaction
//! while it still holds one.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use uuid::Uuid;

use core_kernel::{AccountId, BatchId, OrderId, PartyId};
use crate::account::{Account, PartyRef, PartyType};
use crate::batch::{JournalBatch, LedgerEntry, ReferenceType};
use crate::error::StoreError;
use crate::ports::{
    AccountActivity, AccountFilter, ActivityWindow, BatchFilter, LedgerStore, LedgerTx,
    LegacyBooks, LegacyCustomer, LegacyOrder, LegacyPayment, LegacyPurchaseBill, LegacySupplier,
    LegacyTotals, PostedLine, PurgeCounts,
};

#[derive(Debug, Clone, Default)]
struct LedgerState {
    accounts: Vec<Account>,
    batches: Vec<JournalBatch>,
    entries: Vec<LedgerEntry>,
}

impl LedgerState {
    fn code_taken(&self, code: &str) -> bool {
        self.accounts.iter().any(|a| a.code == code)
    }

    fn party_taken(&self, party: Option<PartyRef>) -> bool {
        party.is_some() && self.accounts.iter().any(|a| a.party == party)
    }

    fn batch_mut(&mut self, id: BatchId) -> Option<&mut JournalBatch> {
        self.batches.iter_mut().find(|b| b.id == id)
    }

    fn effective_batches(&self) -> HashMap<BatchId, &JournalBatch> {
        self.batches
            .iter()
            .filter(|b| b.is_effective())
            .map(|b| (b.id, b))
            .collect()
    }
}

/// Ledger store kept in process memory
#[derive(Debug, Clone, Default)]
pub struct InMemoryLedgerStore {
    state: Arc<Mutex<LedgerState>>,
}

impl InMemoryLedgerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Committed batch count
    pub async fn batch_count(&self) -> usize {
        self.state.lock().await.batches.len()
    }

    /// Committed entry count
    pub async fn entry_count(&self) -> usize {
        self.state.lock().await.entries.len()
    }

    pub async fn account_count(&self) -> usize {
        self.state.lock().await.accounts.len()
    }
}

#[async_trait]
impl LedgerStore for InMemoryLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(InMemoryLedgerTx { guard, working }))
    }
}

struct InMemoryLedgerTx {
    guard: OwnedMutexGuard<LedgerState>,
    working: LedgerState,
}

#[async_trait]
impl LedgerTx for InMemoryLedgerTx {
    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        Ok(self.working.accounts.iter().find(|a| a.id == id).cloned())
    }

    async fn find_account_by_code(&mut self, code: &str) -> Result<Option<Account>, StoreError> {
        Ok(self.working.accounts.iter().find(|a| a.code == code).cloned())
    }

    async fn find_party_account(&mut self, party: PartyRef) -> Result<Option<Account>, StoreError> {
        Ok(self
            .working
            .accounts
            .iter()
            .find(|a| a.party == Some(party))
            .cloned())
    }

    async fn list_accounts(&mut self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError> {
        let mut accounts: Vec<Account> = self
            .working
            .accounts
            .iter()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();
        accounts.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(accounts)
    }

    async fn party_account_codes(&mut self, party_type: PartyType) -> Result<Vec<String>, StoreError> {
        Ok(self
            .working
            .accounts
            .iter()
            .filter(|a| a.party.map(|p| p.party_type) == Some(party_type))
            .map(|a| a.code.clone())
            .collect())
    }

    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        if self.working.code_taken(&account.code) {
            return Err(StoreError::Conflict(format!("account code {} already exists", account.code)));
        }
        if self.working.party_taken(account.party) {
            return Err(StoreError::Conflict("party already has an account".to_string()));
        }
        self.working.accounts.push(account.clone());
        Ok(())
    }

    async fn insert_account_if_absent(&mut self, account: &Account) -> Result<bool, StoreError> {
        if self.working.code_taken(&account.code) || self.working.party_taken(account.party) {
            return Ok(false);
        }
        self.working.accounts.push(account.clone());
        Ok(true)
    }

    async fn set_account_parent(&mut self, id: AccountId, parent_id: AccountId) -> Result<(), StoreError> {
        let account = self
            .working
            .accounts
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        account.parent_id = Some(parent_id);
        Ok(())
    }

    async fn insert_batch(&mut self, batch: &JournalBatch) -> Result<(), StoreError> {
        if self.working.batches.iter().any(|b| b.batch_number == batch.batch_number) {
            return Err(StoreError::Conflict(format!("batch number {} already exists", batch.batch_number)));
        }
        if batch.reference_type.is_unique_per_reference() && batch.reference_id.is_some() {
            let duplicate = self.working.batches.iter().any(|b| {
                b.reference_type == batch.reference_type && b.reference_id == batch.reference_id
            });
            if duplicate {
                return Err(StoreError::Conflict(format!(
                    "{} batch already exists for reference",
                    batch.reference_type
                )));
            }
        }
        self.working.batches.push(batch.clone());
        Ok(())
    }

    async fn insert_entries(&mut self, entries: &[LedgerEntry]) -> Result<(), StoreError> {
        for entry in entries {
            if !self.working.batches.iter().any(|b| b.id == entry.batch_id) {
                return Err(StoreError::Conflict(format!("unknown batch {}", entry.batch_id)));
            }
            if !self.working.accounts.iter().any(|a| a.id == entry.account_id) {
                return Err(StoreError::Conflict(format!("unknown account {}", entry.account_id)));
            }
        }
        self.working.entries.extend_from_slice(entries);
        Ok(())
    }

    async fn find_batch(&mut self, id: BatchId) -> Result<Option<JournalBatch>, StoreError> {
        Ok(self.working.batches.iter().find(|b| b.id == id).cloned())
    }

    async fn batch_entries(&mut self, id: BatchId) -> Result<Vec<LedgerEntry>, StoreError> {
        let mut entries: Vec<LedgerEntry> = self
            .working
            .entries
            .iter()
            .filter(|e| e.batch_id == id)
            .cloned()
            .collect();
        entries.sort_by_key(|e| e.line_no);
        Ok(entries)
    }

    async fn find_batches_by_reference(
        &mut self,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<Vec<JournalBatch>, StoreError> {
        let mut batches: Vec<JournalBatch> = self
            .working
            .batches
            .iter()
            .filter(|b| b.reference_type == reference_type && b.reference_id == Some(reference_id))
            .cloned()
            .collect();
        batches.sort_by_key(|b| b.created_at);
        Ok(batches)
    }

    async fn list_batches(&mut self, filter: &BatchFilter) -> Result<Vec<JournalBatch>, StoreError> {
        let mut batches: Vec<JournalBatch> = self
            .working
            .batches
            .iter()
            .filter(|b| filter.matches(b))
            .cloned()
            .collect();
        batches.sort_by_key(|b| (b.transaction_date, b.created_at));
        Ok(batches)
    }

    async fn mark_batch_reversed(&mut self, id: BatchId, reversal_id: BatchId) -> Result<(), StoreError> {
        let batch = self
            .working
            .batch_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if batch.is_reversed {
            return Err(StoreError::Conflict(format!("batch {} already reversed", batch.batch_number)));
        }
        batch.is_reversed = true;
        batch.reversed_batch_id = Some(reversal_id);
        Ok(())
    }

    async fn account_activity(&mut self, window: &ActivityWindow) -> Result<Vec<AccountActivity>, StoreError> {
        let effective = self.working.effective_batches();
        let mut order: Vec<AccountId> = Vec::new();
        let mut totals: HashMap<AccountId, (Decimal, Decimal)> = HashMap::new();

        for entry in &self.working.entries {
            if window.account_id.is_some_and(|id| id != entry.account_id) {
                continue;
            }
            let Some(batch) = effective.get(&entry.batch_id) else {
                continue;
            };
            if !window.contains(batch.transaction_date) {
                continue;
            }
            let slot = totals.entry(entry.account_id).or_insert_with(|| {
                order.push(entry.account_id);
                (Decimal::ZERO, Decimal::ZERO)
            });
            slot.0 += entry.debit;
            slot.1 += entry.credit;
        }

        Ok(order
            .into_iter()
            .filter_map(|account_id| {
                totals.get(&account_id).map(|&(total_debit, total_credit)| AccountActivity {
                    account_id,
                    total_debit,
                    total_credit,
                })
            })
            .collect())
    }

    async fn posted_lines(&mut self, window: &ActivityWindow) -> Result<Vec<PostedLine>, StoreError> {
        let effective = self.working.effective_batches();
        let mut lines: Vec<PostedLine> = self
            .working
            .entries
            .iter()
            .filter(|e| window.account_id.map_or(true, |id| id == e.account_id))
            .filter_map(|entry| {
                let batch = effective.get(&entry.batch_id)?;
                window.contains(batch.transaction_date).then(|| PostedLine {
                    entry: entry.clone(),
                    batch_number: batch.batch_number.clone(),
                    reference_type: batch.reference_type,
                    reference_id: batch.reference_id,
                    description: batch.description.clone(),
                    transaction_date: batch.transaction_date,
                    batch_created_at: batch.created_at,
                })
            })
            .collect();
        lines.sort_by_key(|l| (l.transaction_date, l.batch_created_at, l.entry.line_no));
        Ok(lines)
    }

    async fn delete_batches_of_type(&mut self, reference_type: ReferenceType) -> Result<PurgeCounts, StoreError> {
        let mut doomed: HashSet<BatchId> = self
            .working
            .batches
            .iter()
            .filter(|b| b.reference_type == reference_type)
            .map(|b| b.id)
            .collect();
        // reversals of purged batches go too
        let reversals: Vec<BatchId> = self
            .working
            .batches
            .iter()
            .filter(|b| b.reversal_of.is_some_and(|id| doomed.contains(&id)))
            .map(|b| b.id)
            .collect();
        doomed.extend(reversals);

        let batches_before = self.working.batches.len();
        let entries_before = self.working.entries.len();
        self.working.batches.retain(|b| !doomed.contains(&b.id));
        self.working.entries.retain(|e| !doomed.contains(&e.batch_id));

        Ok(PurgeCounts {
            batches: (batches_before - self.working.batches.len()) as u64,
            entries: (entries_before - self.working.entries.len()) as u64,
        })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let InMemoryLedgerTx { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
struct LegacyData {
    customers: Vec<LegacyCustomer>,
    suppliers: Vec<LegacySupplier>,
    orders: Vec<LegacyOrder>,
    deleted_orders: HashSet<OrderId>,
    payments: Vec<LegacyPayment>,
    purchase_bills: Vec<LegacyPurchaseBill>,
}

impl LegacyData {
    fn live_orders(&self) -> impl Iterator<Item = &LegacyOrder> {
        self.orders.iter().filter(|o| !self.deleted_orders.contains(&o.id))
    }
}

/// Legacy books held in memory, for tests and local runs
#[derive(Debug, Default)]
pub struct InMemoryLegacyBooks {
    data: RwLock<LegacyData>,
}

impl InMemoryLegacyBooks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_customer(mut self, customer: LegacyCustomer) -> Self {
        self.data.get_mut().customers.push(customer);
        self
    }

    pub fn with_supplier(mut self, supplier: LegacySupplier) -> Self {
        self.data.get_mut().suppliers.push(supplier);
        self
    }

    pub fn with_order(mut self, order: LegacyOrder) -> Self {
        self.data.get_mut().orders.push(order);
        self
    }

    pub fn with_payment(mut self, payment: LegacyPayment) -> Self {
        self.data.get_mut().payments.push(payment);
        self
    }

    pub fn with_purchase_bill(mut self, bill: LegacyPurchaseBill) -> Self {
        self.data.get_mut().purchase_bills.push(bill);
        self
    }

    pub async fn add_order(&self, order: LegacyOrder) {
        self.data.write().await.orders.push(order);
    }

    pub async fn add_payment(&self, payment: LegacyPayment) {
        self.data.write().await.payments.push(payment);
    }

    /// Soft-deletes an order; it disappears from listings and totals
    pub async fn delete_order(&self, order_id: OrderId) {
        self.data.write().await.deleted_orders.insert(order_id);
    }

    /// Overwrites a customer's running balance counter
    pub async fn set_customer_balance(&self, customer_id: PartyId, current_balance: Decimal) -> bool {
        let mut data = self.data.write().await;
        match data.customers.iter_mut().find(|c| c.id == customer_id) {
            Some(customer) => {
                customer.current_balance = current_balance;
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl LegacyBooks for InMemoryLegacyBooks {
    async fn customers(&self) -> Result<Vec<LegacyCustomer>, StoreError> {
        let mut customers = self.data.read().await.customers.clone();
        customers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(customers)
    }

    async fn suppliers(&self) -> Result<Vec<LegacySupplier>, StoreError> {
        let mut suppliers = self.data.read().await.suppliers.clone();
        suppliers.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(suppliers)
    }

    async fn orders(&self) -> Result<Vec<LegacyOrder>, StoreError> {
        let data = self.data.read().await;
        let mut orders: Vec<LegacyOrder> = data.live_orders().cloned().collect();
        orders.sort_by_key(|o| o.created_at);
        Ok(orders)
    }

    async fn payments(&self) -> Result<Vec<LegacyPayment>, StoreError> {
        let mut payments = self.data.read().await.payments.clone();
        payments.sort_by_key(|p| p.created_at);
        Ok(payments)
    }

    async fn purchase_bills(&self) -> Result<Vec<LegacyPurchaseBill>, StoreError> {
        let mut bills = self.data.read().await.purchase_bills.clone();
        bills.sort_by_key(|b| b.created_at);
        Ok(bills)
    }

    async fn find_customer_by_name(&self, name: &str) -> Result<Option<LegacyCustomer>, StoreError> {
        let name = name.trim();
        Ok(self
            .data
            .read()
            .await
            .customers
            .iter()
            .find(|c| c.name.trim().eq_ignore_ascii_case(name))
            .cloned())
    }

    async fn totals(&self) -> Result<LegacyTotals, StoreError> {
        let data = self.data.read().await;
        let mut totals = LegacyTotals::default();
        for order in data.live_orders() {
            totals.total_sales += order.total;
            totals.inline_paid += order.paid_amount;
            totals.receivable_due += order.due_amount;
        }
        totals.customer_payments = data
            .payments
            .iter()
            .filter(|p| p.party_type == PartyType::Customer)
            .map(|p| p.amount)
            .sum();
        Ok(totals)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::account::AccountType;

    #[tokio::test]
    async fn test_dropped_transaction_discards_writes() {
        let store = InMemoryLedgerStore::new();

        let mut tx = store.begin().await.unwrap();
        tx.insert_account(&Account::new("9000", "Scratch", AccountType::Asset))
            .await
            .unwrap();
        drop(tx);
        assert_eq!(store.account_count().await, 0);

        let mut tx = store.begin().await.unwrap();
        tx.insert_account(&Account::new("9000", "Scratch", AccountType::Asset))
            .await
            .unwrap();
        tx.commit().await.unwrap();
        assert_eq!(store.account_count().await, 1);
    }

    #[tokio::test]
    async fn test_duplicate_code_is_a_conflict() {
        let store = InMemoryLedgerStore::new();
        let mut tx = store.begin().await.unwrap();
        tx.insert_account(&Account::new("9000", "One", AccountType::Asset))
            .await
            .unwrap();

        let err = tx
            .insert_account(&Account::new("9000", "Two", AccountType::Asset))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Conflict(_)));

        let inserted = tx
            .insert_account_if_absent(&Account::new("9000", "Three", AccountType::Asset))
            .await
            .unwrap();
        assert!(!inserted);
    }

    #[tokio::test]
    async fn test_deleted_orders_leave_totals() {
        let customer_id = PartyId::new();
        let order = LegacyOrder {
            id: OrderId::new(),
            order_number: "INV-1".to_string(),
            customer_id: Some(customer_id),
            customer_name: Some("Asha".to_string()),
            total: Decimal::new(1000, 0),
            paid_amount: Decimal::new(400, 0),
            due_amount: Decimal::new(600, 0),
            created_at: chrono::Utc::now(),
        };
        let order_id = order.id;
        let books = InMemoryLegacyBooks::new().with_order(order);

        assert_eq!(books.totals().await.unwrap().total_sales, Decimal::new(1000, 0));

        books.delete_order(order_id).await;
        let totals = books.totals().await.unwrap();
        assert_eq!(totals.total_sales, Decimal::ZERO);
        assert_eq!(totals.receivable_due, Decimal::ZERO);
        assert!(books.orders().await.unwrap().is_empty());
    }
}
