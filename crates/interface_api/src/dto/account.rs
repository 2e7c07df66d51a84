//! Account DTOs

use serde::{Deserialize, Serialize};
use validator::Validate;

use core_kernel::AccountId;
use domain_ledger::registry::{ChartInitReport, NewAccount};
use domain_ledger::{AccountSubType, AccountType};

#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct CreateAccountRequest {
    #[validate(length(min = 1, max = 20))]
    pub code: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    pub account_type: AccountType,
    pub sub_type: Option<AccountSubType>,
    pub parent_id: Option<AccountId>,
    #[validate(length(max = 1000))]
    pub description: Option<String>,
}

impl From<CreateAccountRequest> for NewAccount {
    fn from(request: CreateAccountRequest) -> Self {
        NewAccount {
            code: request.code.trim().to_string(),
            name: request.name.trim().to_string(),
            account_type: request.account_type,
            sub_type: request.sub_type,
            parent_id: request.parent_id,
            description: request.description,
        }
    }
}

/// Body for opening (or fetching) a customer or supplier sub-account
#[derive(Debug, Serialize, Deserialize, Validate)]
pub struct PartyAccountRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChartInitResponse {
    pub created: u32,
    pub existing: u32,
}

impl From<ChartInitReport> for ChartInitResponse {
    fn from(report: ChartInitReport) -> Self {
        Self {
            created: report.created,
            existing: report.existing,
        }
    }
}
