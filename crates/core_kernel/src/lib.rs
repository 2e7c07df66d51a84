//! Core Kernel - Foundational types shared by the ledger crates
//!
//! This crate provides the building blocks used across the workspace:
//! - Typed identifiers for accounts, batches, entries and the legacy records
//! - Amount helpers with the ledger's rounding and balance tolerance
//! - Accounting-date handling in the shop's configured timezone

pub mod amount;
pub mod temporal;
pub mod identifiers;

pub use amount::{AmountError, BALANCE_TOLERANCE};
pub use temporal::{DateRange, TemporalError, Timezone};
pub use identifiers::{
    AccountId, BatchId, EntryId, PartyId, OrderId, PaymentId, PurchaseBillId,
};
