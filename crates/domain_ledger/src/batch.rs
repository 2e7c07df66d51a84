//! Journal batches and their entries
//!
//! A batch is the unit of posting: a set of debit and credit lines that must
//! balance. Once persisted a batch is immutable apart from the one-time
//! reversal link.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use core_kernel::amount::within_tolerance;
use core_kernel::{AccountId, BatchId, EntryId};
use crate::error::LedgerError;

/// What kind of business event a batch records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReferenceType {
    Invoice,
    InvoiceCash,
    Payment,
    PaymentToggle,
    Purchase,
    Expense,
    Migration,
    Adjustment,
    Opening,
}

impl ReferenceType {
    pub const ALL: [ReferenceType; 9] = [
        ReferenceType::Invoice,
        ReferenceType::InvoiceCash,
        ReferenceType::Payment,
        ReferenceType::PaymentToggle,
        ReferenceType::Purchase,
        ReferenceType::Expense,
        ReferenceType::Migration,
        ReferenceType::Adjustment,
        ReferenceType::Opening,
    ];

    /// Batch number prefix
    pub fn prefix(&self) -> &'static str {
        match self {
            ReferenceType::Invoice => "JV-INV",
            ReferenceType::InvoiceCash => "JV-INC",
            ReferenceType::Payment => "JV-PAY",
            ReferenceType::PaymentToggle => "JV-TGL",
            ReferenceType::Purchase => "JV-PUR",
            ReferenceType::Expense => "JV-EXP",
            ReferenceType::Migration => "JV-MIG",
            ReferenceType::Adjustment => "JV-ADJ",
            ReferenceType::Opening => "JV-OPN",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferenceType::Invoice => "INVOICE",
            ReferenceType::InvoiceCash => "INVOICE_CASH",
            ReferenceType::Payment => "PAYMENT",
            ReferenceType::PaymentToggle => "PAYMENT_TOGGLE",
            ReferenceType::Purchase => "PURCHASE",
            ReferenceType::Expense => "EXPENSE",
            ReferenceType::Migration => "MIGRATION",
            ReferenceType::Adjustment => "ADJUSTMENT",
            ReferenceType::Opening => "OPENING",
        }
    }

    /// Whether the store allows at most one batch per `(type, reference_id)`.
    ///
    /// Migration batches share the source id between the invoice and its
    /// inline payment, and toggles may be posted again after being reversed.
    pub fn is_unique_per_reference(&self) -> bool {
        matches!(
            self,
            ReferenceType::Invoice
                | ReferenceType::InvoiceCash
                | ReferenceType::Payment
                | ReferenceType::Purchase
                | ReferenceType::Expense
        )
    }
}

impl fmt::Display for ReferenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReferenceType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ReferenceType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LedgerError::validation(format!("Unknown reference type: {}", s)))
    }
}

/// A persisted journal batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JournalBatch {
    pub id: BatchId,
    /// Human-readable number, `{prefix}-{yyyymmdd}-{XXXXXX}`
    pub batch_number: String,
    pub reference_type: ReferenceType,
    /// Originating business record, if any
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    /// Accounting date, distinct from `created_at`
    pub transaction_date: NaiveDate,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub is_balanced: bool,
    pub is_posted: bool,
    pub is_reversed: bool,
    /// The reversal this batch spawned
    pub reversed_batch_id: Option<BatchId>,
    /// The batch this one reverses
    pub reversal_of: Option<BatchId>,
    pub created_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl JournalBatch {
    /// Whether the batch counts toward balances and reports.
    ///
    /// A reversed original and its reversal both drop out, so the pair nets
    /// to zero without either one being counted against the other.
    pub fn is_effective(&self) -> bool {
        self.is_posted && !self.is_reversed && self.reversal_of.is_none()
    }

    pub fn is_reversal(&self) -> bool {
        self.reversal_of.is_some()
    }
}

/// A persisted debit/credit line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    pub id: EntryId,
    pub batch_id: BatchId,
    pub account_id: AccountId,
    pub debit: Decimal,
    pub credit: Decimal,
    pub narration: Option<String>,
    /// 1-based position within the batch
    pub line_no: i32,
    pub created_at: DateTime<Utc>,
}

/// A line submitted for posting
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewEntry {
    pub account_id: AccountId,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
    #[serde(default)]
    pub narration: Option<String>,
}

impl NewEntry {
    /// Creates a debit line
    pub fn debit(account_id: AccountId, amount: Decimal) -> Self {
        Self { account_id, debit: amount, credit: Decimal::ZERO, narration: None }
    }

    /// Creates a credit line
    pub fn credit(account_id: AccountId, amount: Decimal) -> Self {
        Self { account_id, debit: Decimal::ZERO, credit: amount, narration: None }
    }

    /// Adds a narration to the line
    pub fn with_narration(mut self, narration: impl Into<String>) -> Self {
        self.narration = Some(narration.into());
        self
    }

    /// The same line with debit and credit swapped
    pub fn swapped(&self) -> Self {
        Self {
            account_id: self.account_id,
            debit: self.credit,
            credit: self.debit,
            narration: self.narration.clone(),
        }
    }
}

impl From<&LedgerEntry> for NewEntry {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            account_id: entry.account_id,
            debit: entry.debit,
            credit: entry.credit,
            narration: entry.narration.clone(),
        }
    }
}

/// A request to post a batch
///
/// # Example
///
/// ```rust,ignore
/// let request = BatchRequest::new(ReferenceType::Payment)
///     .with_reference(payment_id)
///     .with_description("Payment PAY-0042")
///     .debit(cash.id, dec!(250), "Cash received")
///     .credit(customer.id, dec!(250), "Payment from Asha");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchRequest {
    pub reference_type: ReferenceType,
    #[serde(default)]
    pub reference_id: Option<Uuid>,
    #[serde(default)]
    pub description: Option<String>,
    /// Defaults to today in the ledger's timezone
    #[serde(default)]
    pub transaction_date: Option<NaiveDate>,
    #[serde(default)]
    pub created_by: Option<String>,
    pub entries: Vec<NewEntry>,
    #[serde(skip)]
    pub(crate) reversal_of: Option<BatchId>,
}

impl BatchRequest {
    pub fn new(reference_type: ReferenceType) -> Self {
        Self {
            reference_type,
            reference_id: None,
            description: None,
            transaction_date: None,
            created_by: None,
            entries: Vec::new(),
            reversal_of: None,
        }
    }

    /// Links the batch to its originating business record
    pub fn with_reference(mut self, reference_id: impl Into<Uuid>) -> Self {
        self.reference_id = Some(reference_id.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the accounting date
    pub fn dated(mut self, date: NaiveDate) -> Self {
        self.transaction_date = Some(date);
        self
    }

    pub fn created_by(mut self, user: impl Into<String>) -> Self {
        self.created_by = Some(user.into());
        self
    }

    /// Adds a debit line with narration
    pub fn debit(self, account_id: AccountId, amount: Decimal, narration: impl Into<String>) -> Self {
        self.entry(NewEntry::debit(account_id, amount).with_narration(narration))
    }

    /// Adds a credit line with narration
    pub fn credit(self, account_id: AccountId, amount: Decimal, narration: impl Into<String>) -> Self {
        self.entry(NewEntry::credit(account_id, amount).with_narration(narration))
    }

    pub fn entry(mut self, entry: NewEntry) -> Self {
        self.entries.push(entry);
        self
    }
}

/// Debit and credit totals of a validated batch
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchTotals {
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

impl BatchTotals {
    pub fn difference(&self) -> Decimal {
        (self.total_debit - self.total_credit).abs()
    }

    pub fn is_balanced(&self) -> bool {
        within_tolerance(self.total_debit, self.total_credit)
    }
}

/// Validates the lines of a batch and returns their totals.
///
/// Checks run in a fixed order so the first failing rule is the one reported:
/// no entries, fewer than two entries, a negative or empty line, a zero-value
/// batch, then the balance check.
///
/// # Errors
///
/// - `EmptyBatch` / `InsufficientEntries` for too few lines
/// - `InvalidAmount` naming the 1-based line
/// - `ZeroValueBatch` when both totals are zero
/// - `UnbalancedBatch` when the totals differ by at least 0.01
pub fn validate_entries(entries: &[NewEntry]) -> Result<BatchTotals, LedgerError> {
    if entries.is_empty() {
        return Err(LedgerError::EmptyBatch);
    }
    if entries.len() < 2 {
        return Err(LedgerError::InsufficientEntries { count: entries.len() });
    }

    for (index, entry) in entries.iter().enumerate() {
        let line = index + 1;
        if entry.debit < Decimal::ZERO || entry.credit < Decimal::ZERO {
            return Err(LedgerError::InvalidAmount {
                line,
                reason: "amounts must not be negative".to_string(),
            });
        }
        if entry.debit.is_zero() && entry.credit.is_zero() {
            return Err(LedgerError::InvalidAmount {
                line,
                reason: "debit and credit are both zero".to_string(),
            });
        }
    }

    let totals = BatchTotals {
        total_debit: entries.iter().map(|e| e.debit).sum(),
        total_credit: entries.iter().map(|e| e.credit).sum(),
    };

    if totals.total_debit.is_zero() && totals.total_credit.is_zero() {
        return Err(LedgerError::ZeroValueBatch);
    }

    if !totals.is_balanced() {
        return Err(LedgerError::UnbalancedBatch {
            debit: totals.total_debit,
            credit: totals.total_credit,
            difference: totals.difference(),
        });
    }

    Ok(totals)
}

/// Generates a batch number such as `JV-INV-20240401-3FA9C2`
pub fn generate_batch_number(reference_type: ReferenceType, date: NaiveDate) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        reference_type.prefix(),
        date.format("%Y%m%d"),
        random[..6].to_ascii_uppercase()
    )
}

/// A batch together with its entries in line order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PostedBatch {
    pub batch: JournalBatch,
    pub entries: Vec<LedgerEntry>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_batch_number_format() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 1).unwrap();
        let number = generate_batch_number(ReferenceType::InvoiceCash, date);
        assert!(number.starts_with("JV-INC-20240401-"));
        let suffix = number.rsplit('-').next().unwrap();
        assert_eq!(suffix.len(), 6);
        assert!(suffix.chars().all(|c| c.is_ascii_digit() || c.is_ascii_uppercase()));
    }

    #[test]
    fn test_negative_zero_is_not_negative() {
        let a = AccountId::new();
        let b = AccountId::new();
        let entries = vec![
            NewEntry { account_id: a, debit: dec!(10), credit: -Decimal::ZERO, narration: None },
            NewEntry::credit(b, dec!(10)),
        ];
        assert!(validate_entries(&entries).is_ok());
    }

    #[test]
    fn test_stored_entry_swaps_into_inverse_line() {
        let entry = LedgerEntry {
            id: EntryId::new(),
            batch_id: BatchId::new(),
            account_id: AccountId::new(),
            debit: dec!(250),
            credit: Decimal::ZERO,
            narration: Some("Counter sale".to_string()),
            line_no: 1,
            created_at: Utc::now(),
        };

        let inverse = NewEntry::from(&entry).swapped();
        assert_eq!(inverse.account_id, entry.account_id);
        assert_eq!(inverse.debit, Decimal::ZERO);
        assert_eq!(inverse.credit, dec!(250));
        assert_eq!(inverse.narration.as_deref(), Some("Counter sale"));
    }

    #[test]
    fn test_reference_types_parse_from_storage_names() {
        for reference_type in ReferenceType::ALL {
            assert_eq!(reference_type.as_str().parse::<ReferenceType>().unwrap(), reference_type);
        }
        assert!("REVERSAL".parse::<ReferenceType>().is_err());
    }
}
