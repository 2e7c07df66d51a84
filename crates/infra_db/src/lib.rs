//! Infrastructure Database Layer
//!
//! PostgreSQL adapters for the ledger's storage ports, built on SQLx.
//!
//! # Architecture
//!
//! - [`repositories::PgLedgerStore`] implements `LedgerStore`; each
//!   `begin()` opens a database transaction that the ledger core drives
//!   through the `LedgerTx` trait.
//! - [`repositories::PgLegacyBooks`] implements `LegacyBooks` over the shop
//!   application's own tables. Those tables keep amounts as double
//!   precision; every figure is rounded into a `Decimal` on the way in.
//!
//! The schema lives in `migrations/` at the workspace root and is applied
//! with [`run_migrations`].
//!
//! # Example
//!
//! ```rust,ignore
//! use infra_db::{create_pool, DatabaseConfig, PgLedgerStore, PgLegacyBooks};
//!
//! let pool = create_pool(DatabaseConfig::new("postgres://localhost/shop_ledger")).await?;
//! let store = PgLedgerStore::new(pool.clone());
//! let legacy = PgLegacyBooks::new(pool);
//! ```

pub mod pool;
pub mod error;
pub mod repositories;

pub use pool::{DatabasePool, create_pool, create_pool_from_url, run_migrations, DatabaseConfig};
pub use error::DatabaseError;
pub use repositories::{PgLedgerStore, PgLegacyBooks};
