//! Account registry
//!
//! Owns the chart of accounts: seeding the standard chart, ad-hoc accounts,
//! and the per-party sub-accounts that are created lazily on first posting.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use core_kernel::{AccountId, PartyId};
use crate::account::{Account, AccountSubType, AccountType, PartyRef, PartyType, STANDARD_CHART};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, StoreError};
use crate::ports::{AccountFilter, LedgerTx};

/// Outcome of seeding the standard chart
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChartInitReport {
    pub created: u32,
    pub existing: u32,
}

/// Input for a manually created account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAccount {
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    #[serde(default)]
    pub sub_type: Option<AccountSubType>,
    #[serde(default)]
    pub parent_id: Option<AccountId>,
    #[serde(default)]
    pub description: Option<String>,
}

impl NewAccount {
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            account_type,
            sub_type: None,
            parent_id: None,
            description: None,
        }
    }

    pub fn with_parent(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    pub fn with_sub_type(mut self, sub_type: AccountSubType) -> Self {
        self.sub_type = Some(sub_type);
        self
    }
}

/// Chart-of-accounts operations, all run inside the caller's transaction
#[derive(Debug, Clone)]
pub struct AccountRegistry {
    party_code_retry_limit: u32,
}

impl AccountRegistry {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            party_code_retry_limit: config.party_code_retry_limit.max(1),
        }
    }

    /// Creates any missing standard accounts, then wires parents by code.
    ///
    /// Safe to run repeatedly; existing accounts are counted, not touched
    /// (apart from a missing parent link).
    pub async fn initialize_chart(&self, tx: &mut dyn LedgerTx) -> Result<ChartInitReport, LedgerError> {
        let mut report = ChartInitReport::default();

        for template in STANDARD_CHART.iter() {
            if tx.find_account_by_code(template.code).await?.is_some() {
                report.existing += 1;
                continue;
            }
            tx.insert_account(&template.to_account()).await?;
            report.created += 1;
        }

        for template in STANDARD_CHART.iter() {
            let Some(parent_code) = template.parent_code else {
                continue;
            };
            let account = tx.find_account_by_code(template.code).await?;
            let parent = tx.find_account_by_code(parent_code).await?;
            if let (Some(account), Some(parent)) = (account, parent) {
                if account.parent_id != Some(parent.id) {
                    tx.set_account_parent(account.id, parent.id).await?;
                }
            }
        }

        info!(created = report.created, existing = report.existing, "Chart of accounts initialized");
        Ok(report)
    }

    /// Creates a non-system account
    ///
    /// # Errors
    ///
    /// - `Validation` for a blank code or name
    /// - `AccountAlreadyExists` if the code is taken
    /// - `AccountNotFound` if the parent does not exist
    pub async fn create_account(&self, tx: &mut dyn LedgerTx, request: NewAccount) -> Result<Account, LedgerError> {
        let code = request.code.trim();
        let name = request.name.trim();
        if code.is_empty() || name.is_empty() {
            return Err(LedgerError::validation("Account code and name are required"));
        }
        if tx.find_account_by_code(code).await?.is_some() {
            return Err(LedgerError::AccountAlreadyExists(code.to_string()));
        }

        let mut account = Account::new(code, name, request.account_type);
        if let Some(parent_id) = request.parent_id {
            if tx.find_account(parent_id).await?.is_none() {
                return Err(LedgerError::AccountNotFound(parent_id.to_string()));
            }
            account = account.with_parent(parent_id);
        }
        if let Some(sub_type) = request.sub_type {
            account = account.with_sub_type(sub_type);
        }
        if let Some(description) = request.description {
            account = account.with_description(description);
        }

        tx.insert_account(&account).await.map_err(|e| match e {
            StoreError::Conflict(_) => LedgerError::AccountAlreadyExists(account.code.clone()),
            other => other.into(),
        })?;

        info!(account_code = %account.code, account_type = %account.account_type, "Account created");
        Ok(account)
    }

    pub async fn get_or_create_customer_account(
        &self,
        tx: &mut dyn LedgerTx,
        customer_id: PartyId,
        name: &str,
    ) -> Result<Account, LedgerError> {
        self.get_or_create_party_account(tx, PartyRef::customer(customer_id), name).await
    }

    pub async fn get_or_create_supplier_account(
        &self,
        tx: &mut dyn LedgerTx,
        supplier_id: PartyId,
        name: &str,
    ) -> Result<Account, LedgerError> {
        self.get_or_create_party_account(tx, PartyRef::supplier(supplier_id), name).await
    }

    /// Returns the party's sub-account, creating it on first use.
    ///
    /// The store's uniqueness constraints on code and party arbitrate
    /// concurrent callers: a rejected insert means either another caller
    /// created the party's account (re-fetch it) or took the code (try the
    /// next one).
    pub async fn get_or_create_party_account(
        &self,
        tx: &mut dyn LedgerTx,
        party: PartyRef,
        name: &str,
    ) -> Result<Account, LedgerError> {
        if let Some(existing) = tx.find_party_account(party).await? {
            return Ok(existing);
        }

        let party_type = party.party_type;
        let control = tx.find_account_by_code(party_type.control_code()).await?;
        let mut suffix = self.next_suffix(tx, party_type).await?;

        for attempt in 1..=self.party_code_retry_limit {
            let mut account = Account::for_party(party, party_type.account_code(suffix), name);
            if let Some(control) = &control {
                account = account.with_parent(control.id);
            }

            if tx.insert_account_if_absent(&account).await? {
                info!(
                    account_code = %account.code,
                    party_id = %party.party_id,
                    party_type = %party_type,
                    "Party sub-account created"
                );
                return Ok(account);
            }

            if let Some(existing) = tx.find_party_account(party).await? {
                debug!(account_code = %existing.code, "Party sub-account created concurrently");
                return Ok(existing);
            }

            debug!(attempt, code = %account.code, "Party account code taken, retrying");
            suffix = self.next_suffix(tx, party_type).await?.max(suffix + 1);
        }

        Err(StoreError::Conflict(format!(
            "could not allocate a {} account code for {} after {} attempts",
            party_type, party.party_id, self.party_code_retry_limit
        ))
        .into())
    }

    async fn next_suffix(&self, tx: &mut dyn LedgerTx, party_type: PartyType) -> Result<u32, LedgerError> {
        let highest = tx
            .party_account_codes(party_type)
            .await?
            .iter()
            .filter_map(|code| party_type.code_suffix(code))
            .max()
            .unwrap_or(0);
        Ok(highest + 1)
    }

    /// Accounts ordered by code
    pub async fn list_accounts(&self, tx: &mut dyn LedgerTx, filter: &AccountFilter) -> Result<Vec<Account>, LedgerError> {
        Ok(tx.list_accounts(filter).await?)
    }

    pub async fn get_account(&self, tx: &mut dyn LedgerTx, id: AccountId) -> Result<Account, LedgerError> {
        tx.find_account(id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    pub async fn get_account_by_code(&self, tx: &mut dyn LedgerTx, code: &str) -> Result<Account, LedgerError> {
        tx.find_account_by_code(code)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(code.to_string()))
    }

    /// Fetches a standard chart account the caller cannot work without
    pub async fn require_system_account(&self, tx: &mut dyn LedgerTx, code: &str) -> Result<Account, LedgerError> {
        tx.find_account_by_code(code)
            .await?
            .ok_or_else(|| LedgerError::SystemAccountMissing(code.to_string()))
    }
}
