//! Ledger Domain - Double-Entry Journal for the Shop
//!
//! This crate is the accounting core of the shop application. Business events
//! recorded by the surrounding application (invoices, payments, purchase bills)
//! are turned into balanced journal batches; balances and statements are always
//! computed by replaying posted entries, never read from a stored counter.
//!
//! # Components
//!
//! - [`registry::AccountRegistry`]: chart of accounts and per-party sub-accounts
//! - [`engine::BatchEngine`]: the only write path; validates and persists batches,
//!   performs reversals
//! - [`reporting::ReportingEngine`]: balances, trial balance, P&L, balance sheet,
//!   account ledger, health check
//! - [`posting::PostingAdapters`]: real-time posting of invoices, payments and
//!   purchases inside the caller's transaction
//! - [`migration::MigrationEngine`]: bulk migration of legacy records and
//!   reconciliation against the legacy counters
//! - [`drift::DriftChecker`]: periodic comparison of legacy totals with the ledger
//!
//! Storage is reached through the [`ports::LedgerStore`] and
//! [`ports::LegacyBooks`] traits; [`memory`] provides in-process adapters.
//!
//! # Example
//!
//! ```rust,ignore
//! use domain_ledger::{LedgerService, LedgerConfig};
//!
//! let service = LedgerService::new(store, legacy, LedgerConfig::default());
//! service.initialize_chart_of_accounts().await?;
//!
//! let mut tx = service.begin().await?;
//! service.post_invoice(tx.as_mut(), invoice_event).await?;
//! tx.commit().await?;
//! ```

pub mod account;
pub mod batch;
pub mod config;
pub mod error;
pub mod ports;
pub mod registry;
pub mod engine;
pub mod reporting;
pub mod posting;
pub mod migration;
pub mod drift;
pub mod memory;
pub mod service;

pub use account::{Account, AccountSubType, AccountType, PartyRef, PartyType};
pub use batch::{BatchRequest, JournalBatch, LedgerEntry, NewEntry, PostedBatch, ReferenceType};
pub use config::LedgerConfig;
pub use error::{LedgerError, StoreError};
pub use ports::{LedgerStore, LedgerTx, LegacyBooks};
pub use posting::{PostingOutcome, SkipReason};
pub use service::LedgerService;
