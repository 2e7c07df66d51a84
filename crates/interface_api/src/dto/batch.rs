//! Journal batch DTOs

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use core_kernel::AccountId;
use domain_ledger::{BatchRequest, NewEntry, ReferenceType};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateBatchRequest {
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
    /// Defaults to today in the shop's timezone
    pub transaction_date: Option<NaiveDate>,
    #[validate(length(max = 255))]
    pub created_by: Option<String>,
    #[serde(default)]
    #[validate(nested)]
    pub entries: Vec<EntryRequest>,
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct EntryRequest {
    pub account_id: AccountId,
    #[serde(default)]
    pub debit: Decimal,
    #[serde(default)]
    pub credit: Decimal,
    #[validate(length(max = 1000))]
    pub narration: Option<String>,
}

impl From<CreateBatchRequest> for BatchRequest {
    fn from(request: CreateBatchRequest) -> Self {
        let mut batch = BatchRequest::new(request.reference_type);
        batch.reference_id = request.reference_id;
        batch.description = request.description;
        batch.transaction_date = request.transaction_date;
        batch.created_by = request.created_by;
        batch.entries = request
            .entries
            .into_iter()
            .map(|e| NewEntry {
                account_id: e.account_id,
                debit: e.debit,
                credit: e.credit,
                narration: e.narration,
            })
            .collect();
        batch
    }
}

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct ReverseBatchRequest {
    #[validate(length(min = 1, max = 1000))]
    pub reason: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct BatchLookupQuery {
    pub reference_type: ReferenceType,
    pub reference_id: Uuid,
}
