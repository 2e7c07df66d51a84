//! Ledger domain errors

use rust_decimal::Decimal;
use thiserror::Error;

/// Errors raised by a ledger storage adapter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The row addressed by an update does not exist
    #[error("Record not found: {0}")]
    NotFound(String),

    /// A uniqueness or state guard rejected the write
    #[error("Conflict: {0}")]
    Conflict(String),

    /// The backend failed (connection, query, decoding)
    #[error("Storage backend error: {0}")]
    Backend(String),

    /// Commit or rollback failed
    #[error("Transaction failed: {0}")]
    TransactionFailed(String),
}

/// Errors that can occur in the ledger domain
#[derive(Debug, Error)]
pub enum LedgerError {
    /// A batch was submitted with no entries at all
    #[error("Journal batch has no entries")]
    EmptyBatch,

    /// A batch needs a debit side and a credit side
    #[error("Journal batch needs at least 2 entries, got {count}")]
    InsufficientEntries { count: usize },

    /// An entry carries a negative amount or has nothing on either side
    #[error("Invalid amount on entry {line}: {reason}")]
    InvalidAmount { line: usize, reason: String },

    /// Total debit and total credit are both zero
    #[error("Journal batch has zero total value")]
    ZeroValueBatch,

    /// Malformed input outside batch validation
    #[error("Validation error: {0}")]
    Validation(String),

    /// Debits and credits differ by at least the balance tolerance
    #[error("Journal batch is not balanced. Debit: {debit:.2}, Credit: {credit:.2}, Difference: {difference:.2}")]
    UnbalancedBatch {
        debit: Decimal,
        credit: Decimal,
        difference: Decimal,
    },

    /// Account not found
    #[error("Account not found: {0}")]
    AccountNotFound(String),

    /// Journal batch not found
    #[error("Journal batch not found: {0}")]
    BatchNotFound(String),

    /// A standard chart account the operation depends on is missing
    #[error("System account {0} not found; initialize the chart of accounts")]
    SystemAccountMissing(String),

    /// Account code already taken
    #[error("Account already exists: {0}")]
    AccountAlreadyExists(String),

    /// The event was already posted by a concurrent caller
    #[error("Already processed: {0}")]
    AlreadyProcessed(String),

    /// The batch already has a reversal
    #[error("Journal batch {0} is already reversed")]
    AlreadyReversed(String),

    /// The batch is itself a reversal; post a fresh batch instead
    #[error("Journal batch {0} is a reversal and cannot be reversed")]
    CannotReverseReversal(String),

    /// Storage failure
    #[error("Storage error: {0}")]
    Store(#[from] StoreError),
}

impl LedgerError {
    pub fn validation(message: impl Into<String>) -> Self {
        LedgerError::Validation(message.into())
    }

    /// Returns true for errors caused by malformed input
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            LedgerError::EmptyBatch
                | LedgerError::InsufficientEntries { .. }
                | LedgerError::InvalidAmount { .. }
                | LedgerError::ZeroValueBatch
                | LedgerError::Validation(_)
                | LedgerError::UnbalancedBatch { .. }
        )
    }

    /// Returns true when a referenced account, batch or system account is missing
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountNotFound(_)
                | LedgerError::BatchNotFound(_)
                | LedgerError::SystemAccountMissing(_)
                | LedgerError::Store(StoreError::NotFound(_))
        )
    }

    /// Returns true when the request repeats work that was already done
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            LedgerError::AccountAlreadyExists(_)
                | LedgerError::AlreadyProcessed(_)
                | LedgerError::AlreadyReversed(_)
                | LedgerError::CannotReverseReversal(_)
                | LedgerError::Store(StoreError::Conflict(_))
        )
    }
}
