//! Repository implementations for the ledger's storage ports
//!
//! - [`ledger`]: the ledger's own tables (accounts, journal batches, entries)
//! - [`legacy`]: read-only queries over the shop application's tables

pub mod ledger;
pub mod legacy;

pub use ledger::{PgLedgerStore, PgLedgerTx};
pub use legacy::PgLegacyBooks;
