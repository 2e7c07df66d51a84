//! Business event DTOs
//!
//! Invoice, payment, purchase and toggle events are accepted in their domain
//! shape; only deletions need a body of their own.

use serde::{Deserialize, Serialize};
use validator::Validate;

/// Deletion of an invoice, payment or purchase bill
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct DocumentDeletedRequest {
    /// Document number used in the reversal narration, e.g. `INV-1`
    #[validate(length(min = 1, max = 50))]
    pub number: String,
}
