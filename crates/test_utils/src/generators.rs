//! Property-Based Test Generators
//!
//! Proptest strategies for ledger amounts and balanced entry sets, plus fake
//! party names for seeding legacy books.

use core_kernel::AccountId;
use domain_ledger::NewEntry;
use fake::faker::company::en::CompanyName;
use fake::faker::name::en::Name;
use fake::Fake;
use proptest::prelude::*;
use rust_decimal::Decimal;

/// Positive amounts at ledger scale, 0.01 to 100,000.00
pub fn amount_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..10_000_000i64).prop_map(|paise| Decimal::new(paise, 2))
}

/// A balanced set of entries over the given accounts
///
/// Debit legs are random; the same total is spread across one to three
/// credit legs, the last leg taking the remainder.
pub fn balanced_entries_strategy(accounts: Vec<AccountId>) -> impl Strategy<Value = Vec<NewEntry>> {
    let n = accounts.len();
    (
        prop::collection::vec((0..n, amount_strategy()), 1..4),
        prop::collection::vec(0..n, 1..4),
    )
        .prop_map(move |(debits, credit_accounts)| {
            let total: Decimal = debits.iter().map(|(_, a)| *a).sum();
            let share = (total / Decimal::from(credit_accounts.len() as i64)).round_dp(2);

            let mut entries: Vec<NewEntry> = debits
                .iter()
                .map(|(i, a)| NewEntry::debit(accounts[*i], *a))
                .collect();
            let mut remaining = total;
            for (k, i) in credit_accounts.iter().enumerate() {
                let leg = if k + 1 == credit_accounts.len() { remaining } else { share };
                remaining -= leg;
                entries.push(NewEntry::credit(accounts[*i], leg));
            }
            entries
        })
        .prop_filter("every leg positive", |entries| {
            entries.iter().all(|e| e.debit > Decimal::ZERO || e.credit > Decimal::ZERO)
        })
}

/// A plausible customer name
pub fn fake_customer_name() -> String {
    Name().fake()
}

/// A plausible supplier name
pub fn fake_supplier_name() -> String {
    CompanyName().fake()
}
