//! Test Utilities Crate
//!
//! Shared test infrastructure for the shop ledger test suite.
//!
//! # Modules
//!
//! - `fixtures`: fixed dates, identifiers and a small legacy shop
//! - `builders`: builders for legacy records and posting events
//! - `database`: PostgreSQL test containers with the ledger schema applied
//! - `assertions`: assertion helpers for ledger reports
//! - `generators`: proptest strategies and fake names

pub mod fixtures;
pub mod builders;
pub mod database;
pub mod assertions;
pub mod generators;

pub use fixtures::*;
pub use builders::*;
pub use database::*;
pub use assertions::*;
pub use generators::*;
