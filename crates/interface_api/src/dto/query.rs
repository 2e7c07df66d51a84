//! Query-string parameters shared by report endpoints

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AsOfQuery {
    pub as_of: Option<NaiveDate>,
}

/// Both dates inclusive
#[derive(Debug, Serialize, Deserialize)]
pub struct PeriodQuery {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct LedgerRangeQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}
