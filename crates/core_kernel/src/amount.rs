//! Amount helpers with the ledger's precision rules
//!
//! Ledger amounts are plain `rust_decimal::Decimal` values stored as
//! `NUMERIC(15,2)`. The shop application keeps its own figures as double
//! precision floats, so every value crossing from the legacy books into the
//! ledger passes through [`from_legacy`].

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use thiserror::Error;

/// Number of decimal places kept on every ledger amount.
pub const AMOUNT_SCALE: u32 = 2;

/// Two figures closer than this are treated as equal.
///
/// Used for batch balance, trial balance, balance-sheet identity and
/// reconciliation matching alike.
pub const BALANCE_TOLERANCE: Decimal = dec!(0.01);

/// Errors raised when converting external figures into ledger amounts
#[derive(Debug, Error, PartialEq, Eq)]
pub enum AmountError {
    #[error("Amount is not a finite number: {0}")]
    NotFinite(String),

    #[error("Amount out of range: {0}")]
    OutOfRange(String),
}

/// Rounds to the ledger scale, half away from zero.
pub fn round_amount(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(AMOUNT_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Returns true when `a` and `b` differ by less than [`BALANCE_TOLERANCE`].
pub fn within_tolerance(a: Decimal, b: Decimal) -> bool {
    (a - b).abs() < BALANCE_TOLERANCE
}

/// Converts a legacy double-precision figure into a rounded ledger amount.
///
/// # Errors
///
/// Returns `AmountError::NotFinite` for NaN or infinite input and
/// `AmountError::OutOfRange` when the value does not fit a `Decimal`.
pub fn from_legacy(value: f64) -> Result<Decimal, AmountError> {
    if !value.is_finite() {
        return Err(AmountError::NotFinite(value.to_string()));
    }
    Decimal::from_f64(value)
        .map(round_amount)
        .ok_or_else(|| AmountError::OutOfRange(value.to_string()))
}

/// Same as [`from_legacy`] for nullable legacy columns; `None` reads as zero.
pub fn from_legacy_opt(value: Option<f64>) -> Result<Decimal, AmountError> {
    value.map_or(Ok(Decimal::ZERO), from_legacy)
}
