//! Account types for the chart of accounts
//!
//! The shop's chart is a fixed set of system accounts plus one sub-account per
//! customer (under Accounts Receivable) and per supplier (under Accounts
//! Payable). Party sub-accounts carry codes like `1300-007`.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use core_kernel::{AccountId, PartyId};
use crate::error::LedgerError;

/// Types of accounts in the chart of accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountType {
    /// Asset accounts (debit normal balance)
    Asset,
    /// Liability accounts (credit normal balance)
    Liability,
    /// Equity accounts (credit normal balance)
    Equity,
    /// Income accounts (credit normal balance)
    Income,
    /// Expense accounts (debit normal balance)
    Expense,
}

impl AccountType {
    pub const ALL: [AccountType; 5] = [
        AccountType::Asset,
        AccountType::Liability,
        AccountType::Equity,
        AccountType::Income,
        AccountType::Expense,
    ];

    /// Returns true if this account type has a debit normal balance
    pub fn is_debit_normal(&self) -> bool {
        matches!(self, AccountType::Asset | AccountType::Expense)
    }

    /// Signed balance from debit and credit totals, positive in the normal direction
    pub fn normal_balance(&self, total_debit: Decimal, total_credit: Decimal) -> Decimal {
        if self.is_debit_normal() {
            total_debit - total_credit
        } else {
            total_credit - total_debit
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Asset => "ASSET",
            AccountType::Liability => "LIABILITY",
            AccountType::Equity => "EQUITY",
            AccountType::Income => "INCOME",
            AccountType::Expense => "EXPENSE",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LedgerError::validation(format!("Unknown account type: {}", s)))
    }
}

/// Finer classification used to locate well-known accounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AccountSubType {
    Cash,
    Bank,
    Receivable,
    Inventory,
    Payable,
    Tax,
    Sales,
    Cogs,
    Purchase,
}

impl AccountSubType {
    pub const ALL: [AccountSubType; 9] = [
        AccountSubType::Cash,
        AccountSubType::Bank,
        AccountSubType::Receivable,
        AccountSubType::Inventory,
        AccountSubType::Payable,
        AccountSubType::Tax,
        AccountSubType::Sales,
        AccountSubType::Cogs,
        AccountSubType::Purchase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AccountSubType::Cash => "CASH",
            AccountSubType::Bank => "BANK",
            AccountSubType::Receivable => "RECEIVABLE",
            AccountSubType::Inventory => "INVENTORY",
            AccountSubType::Payable => "PAYABLE",
            AccountSubType::Tax => "TAX",
            AccountSubType::Sales => "SALES",
            AccountSubType::Cogs => "COGS",
            AccountSubType::Purchase => "PURCHASE",
        }
    }
}

impl FromStr for AccountSubType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        AccountSubType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LedgerError::validation(format!("Unknown account sub-type: {}", s)))
    }
}

/// The kind of legacy party a sub-account belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PartyType {
    Customer,
    Supplier,
}

impl PartyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PartyType::Customer => "customer",
            PartyType::Supplier => "supplier",
        }
    }

    /// Code of the control account party sub-accounts hang under
    pub fn control_code(&self) -> &'static str {
        match self {
            PartyType::Customer => codes::ACCOUNTS_RECEIVABLE,
            PartyType::Supplier => codes::ACCOUNTS_PAYABLE,
        }
    }

    pub fn account_type(&self) -> AccountType {
        match self {
            PartyType::Customer => AccountType::Asset,
            PartyType::Supplier => AccountType::Liability,
        }
    }

    pub fn sub_type(&self) -> AccountSubType {
        match self {
            PartyType::Customer => AccountSubType::Receivable,
            PartyType::Supplier => AccountSubType::Payable,
        }
    }

    /// Sub-account code for the given sequence number, e.g. `1300-001`
    pub fn account_code(&self, suffix: u32) -> String {
        format!("{}-{:03}", self.control_code(), suffix)
    }

    /// Sequence number of a party sub-account code, if it is one of ours
    pub fn code_suffix(&self, code: &str) -> Option<u32> {
        code.strip_prefix(self.control_code())
            .and_then(|rest| rest.strip_prefix('-'))
            .and_then(|digits| digits.parse().ok())
    }
}

impl fmt::Display for PartyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PartyType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "customer" => Ok(PartyType::Customer),
            "supplier" => Ok(PartyType::Supplier),
            other => Err(LedgerError::validation(format!("Unknown party type: {}", other))),
        }
    }
}

/// Link from a sub-account to the legacy customer or supplier it tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PartyRef {
    pub party_id: PartyId,
    pub party_type: PartyType,
}

impl PartyRef {
    pub fn customer(party_id: PartyId) -> Self {
        Self { party_id, party_type: PartyType::Customer }
    }

    pub fn supplier(party_id: PartyId) -> Self {
        Self { party_id, party_type: PartyType::Supplier }
    }
}

/// An account in the chart of accounts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    /// Unique identifier
    pub id: AccountId,
    /// Account code (e.g., "1100" or "1300-004")
    pub code: String,
    /// Account name
    pub name: String,
    /// Account type
    pub account_type: AccountType,
    /// Optional finer classification
    pub sub_type: Option<AccountSubType>,
    /// Parent account ID (for hierarchical charts)
    pub parent_id: Option<AccountId>,
    /// Owning customer or supplier, for party sub-accounts
    pub party: Option<PartyRef>,
    /// Description
    pub description: Option<String>,
    /// Part of the standard chart
    pub is_system_account: bool,
    /// Whether account is active
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Creates a new active, non-system account
    ///
    /// # Arguments
    ///
    /// * `code` - Account code
    /// * `name` - Account name
    /// * `account_type` - Type of account
    pub fn new(code: impl Into<String>, name: impl Into<String>, account_type: AccountType) -> Self {
        Self {
            id: AccountId::new_v7(),
            code: code.into(),
            name: name.into(),
            account_type,
            sub_type: None,
            parent_id: None,
            party: None,
            description: None,
            is_system_account: false,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    /// Creates the sub-account for a customer or supplier
    pub fn for_party(party: PartyRef, code: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(code, name, party.party_type.account_type())
            .with_sub_type(party.party_type.sub_type())
            .with_party(party)
    }

    /// Sets the sub-type
    pub fn with_sub_type(mut self, sub_type: AccountSubType) -> Self {
        self.sub_type = Some(sub_type);
        self
    }

    /// Sets the parent account
    pub fn with_parent(mut self, parent_id: AccountId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    /// Links the account to a party
    pub fn with_party(mut self, party: PartyRef) -> Self {
        self.party = Some(party);
        self
    }

    /// Sets the description
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Marks the account as part of the standard chart
    pub fn as_system(mut self) -> Self {
        self.is_system_account = true;
        self
    }

    pub fn normal_balance(&self, total_debit: Decimal, total_credit: Decimal) -> Decimal {
        self.account_type.normal_balance(total_debit, total_credit)
    }
}

/// Codes of the standard chart
pub mod codes {
    pub const ASSETS: &str = "1000";
    pub const CASH: &str = "1100";
    pub const BANK: &str = "1200";
    pub const ACCOUNTS_RECEIVABLE: &str = "1300";
    pub const INVENTORY: &str = "1400";
    pub const LIABILITIES: &str = "2000";
    pub const ACCOUNTS_PAYABLE: &str = "2100";
    pub const GST_PAYABLE: &str = "2200";
    pub const EQUITY: &str = "3000";
    pub const OWNERS_CAPITAL: &str = "3100";
    pub const RETAINED_EARNINGS: &str = "3200";
    pub const OPENING_BALANCE_EQUITY: &str = "3300";
    pub const INCOME: &str = "4000";
    pub const SALES_REVENUE: &str = "4100";
    pub const OTHER_INCOME: &str = "4200";
    pub const EXPENSES: &str = "5000";
    pub const COST_OF_GOODS_SOLD: &str = "5100";
    pub const OPERATING_EXPENSES: &str = "5200";
    pub const PURCHASE_EXPENSES: &str = "5300";
}

/// One row of the standard chart
#[derive(Debug, Clone, Copy)]
pub struct ChartTemplate {
    pub code: &'static str,
    pub name: &'static str,
    pub account_type: AccountType,
    pub sub_type: Option<AccountSubType>,
    pub parent_code: Option<&'static str>,
}

impl ChartTemplate {
    const fn new(
        code: &'static str,
        name: &'static str,
        account_type: AccountType,
        sub_type: Option<AccountSubType>,
        parent_code: Option<&'static str>,
    ) -> Self {
        Self { code, name, account_type, sub_type, parent_code }
    }

    /// Builds the system account for this row (parent wired separately)
    pub fn to_account(&self) -> Account {
        let account = Account::new(self.code, self.name, self.account_type).as_system();
        match self.sub_type {
            Some(sub_type) => account.with_sub_type(sub_type),
            None => account,
        }
    }
}

/// Standard chart of accounts for the shop
pub static STANDARD_CHART: [ChartTemplate; 19] = [
    ChartTemplate::new(codes::ASSETS, "Assets", AccountType::Asset, None, None),
    ChartTemplate::new(codes::CASH, "Cash", AccountType::Asset, Some(AccountSubType::Cash), Some(codes::ASSETS)),
    ChartTemplate::new(codes::BANK, "Bank", AccountType::Asset, Some(AccountSubType::Bank), Some(codes::ASSETS)),
    ChartTemplate::new(codes::ACCOUNTS_RECEIVABLE, "Accounts Receivable", AccountType::Asset, Some(AccountSubType::Receivable), Some(codes::ASSETS)),
    ChartTemplate::new(codes::INVENTORY, "Inventory", AccountType::Asset, Some(AccountSubType::Inventory), Some(codes::ASSETS)),
    ChartTemplate::new(codes::LIABILITIES, "Liabilities", AccountType::Liability, None, None),
    ChartTemplate::new(codes::ACCOUNTS_PAYABLE, "Accounts Payable", AccountType::Liability, Some(AccountSubType::Payable), Some(codes::LIABILITIES)),
    ChartTemplate::new(codes::GST_PAYABLE, "GST Payable", AccountType::Liability, Some(AccountSubType::Tax), Some(codes::LIABILITIES)),
    ChartTemplate::new(codes::EQUITY, "Equity", AccountType::Equity, None, None),
    ChartTemplate::new(codes::OWNERS_CAPITAL, "Owner's Capital", AccountType::Equity, None, Some(codes::EQUITY)),
    ChartTemplate::new(codes::RETAINED_EARNINGS, "Retained Earnings", AccountType::Equity, None, Some(codes::EQUITY)),
    ChartTemplate::new(codes::OPENING_BALANCE_EQUITY, "Opening Balance Equity", AccountType::Equity, None, Some(codes::EQUITY)),
    ChartTemplate::new(codes::INCOME, "Income", AccountType::Income, None, None),
    ChartTemplate::new(codes::SALES_REVENUE, "Sales Revenue", AccountType::Income, Some(AccountSubType::Sales), Some(codes::INCOME)),
    ChartTemplate::new(codes::OTHER_INCOME, "Other Income", AccountType::Income, None, Some(codes::INCOME)),
    ChartTemplate::new(codes::EXPENSES, "Expenses", AccountType::Expense, None, None),
    ChartTemplate::new(codes::COST_OF_GOODS_SOLD, "Cost of Goods Sold", AccountType::Expense, Some(AccountSubType::Cogs), Some(codes::EXPENSES)),
    ChartTemplate::new(codes::OPERATING_EXPENSES, "Operating Expenses", AccountType::Expense, None, Some(codes::EXPENSES)),
    ChartTemplate::new(codes::PURCHASE_EXPENSES, "Purchase Expenses", AccountType::Expense, Some(AccountSubType::Purchase), Some(codes::EXPENSES)),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_party_code_round_trip() {
        assert_eq!(PartyType::Customer.account_code(7), "1300-007");
        assert_eq!(PartyType::Supplier.account_code(1234), "2100-1234");
        assert_eq!(PartyType::Customer.code_suffix("1300-042"), Some(42));
        assert_eq!(PartyType::Customer.code_suffix("2100-042"), None);
        assert_eq!(PartyType::Customer.code_suffix("1300"), None);
    }

    #[test]
    fn test_every_parent_code_is_in_chart() {
        for template in STANDARD_CHART.iter() {
            if let Some(parent) = template.parent_code {
                assert!(
                    STANDARD_CHART.iter().any(|t| t.code == parent),
                    "{} has unknown parent",
                    template.code
                );
            }
        }
    }
}
