//! Balance and reporting engine
//!
//! Every figure here is folded from effective posted entries at query time.
//! Nothing is cached between calls.

use std::collections::HashMap;

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use core_kernel::amount::within_tolerance;
use core_kernel::{AccountId, BatchId, DateRange, Timezone};
use crate::account::{Account, AccountType, PartyRef};
use crate::batch::ReferenceType;
use crate::config::LedgerConfig;
use crate::error::LedgerError;
use crate::ports::{AccountActivity, AccountFilter, ActivityWindow, BatchFilter, LedgerTx};

/// Balance of a single account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountBalance {
    pub account_id: AccountId,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub as_of: NaiveDate,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    /// Positive in the account's normal direction
    pub balance: Decimal,
}

/// Balance of a customer or supplier sub-account
///
/// Customer balances are receivable (positive: they owe us); supplier
/// balances are payable (positive: we owe them).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PartyBalance {
    pub party: PartyRef,
    pub has_ledger_account: bool,
    pub account_id: Option<AccountId>,
    pub account_code: Option<String>,
    pub as_of: NaiveDate,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalanceLine {
    pub account_id: AccountId,
    pub code: String,
    pub name: String,
    pub account_type: AccountType,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub balance: Decimal,
}

/// Trial balance; `is_balanced == false` indicates a ledger defect
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrialBalance {
    pub as_of: NaiveDate,
    pub lines: Vec<TrialBalanceLine>,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub difference: Decimal,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatementLine {
    pub account_id: AccountId,
    pub code: String,
    pub name: String,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementSection {
    pub lines: Vec<StatementLine>,
    pub total: Decimal,
}

impl StatementSection {
    fn push(&mut self, account: &Account, amount: Decimal) {
        self.total += amount;
        self.lines.push(StatementLine {
            account_id: account.id,
            code: account.code.clone(),
            name: account.name.clone(),
            amount,
        });
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfitAndLoss {
    pub period: DateRange,
    pub income: StatementSection,
    pub expenses: StatementSection,
    pub net_profit: Decimal,
}

/// Balance sheet as of a date
///
/// Income and expenses are never closed into equity by a batch, so equity
/// carries `current_earnings` (income minus expenses to date) alongside the
/// equity accounts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalanceSheet {
    pub as_of: NaiveDate,
    pub assets: StatementSection,
    pub liabilities: StatementSection,
    pub equity: StatementSection,
    pub current_earnings: Decimal,
    pub total_equity: Decimal,
    pub total_liabilities_and_equity: Decimal,
    pub difference: Decimal,
    pub is_balanced: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLedgerLine {
    pub transaction_date: NaiveDate,
    pub batch_id: BatchId,
    pub batch_number: String,
    pub reference_type: ReferenceType,
    pub reference_id: Option<Uuid>,
    pub description: Option<String>,
    pub narration: Option<String>,
    pub debit: Decimal,
    pub credit: Decimal,
    pub running_balance: Decimal,
}

/// Chronological statement of one account
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountLedger {
    pub account: Account,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    /// Balance carried in from before `from`
    pub opening_balance: Decimal,
    pub lines: Vec<AccountLedgerLine>,
    pub closing_balance: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnbalancedBatch {
    pub batch_id: BatchId,
    pub batch_number: String,
    pub total_debit: Decimal,
    pub total_credit: Decimal,
}

/// Global integrity check over effective batches
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthReport {
    pub total_debit: Decimal,
    pub total_credit: Decimal,
    pub difference: Decimal,
    pub batch_count: usize,
    pub unbalanced_batches: Vec<UnbalancedBatch>,
    pub is_balanced: bool,
}

#[derive(Debug, Clone)]
pub struct ReportingEngine {
    timezone: Timezone,
}

impl ReportingEngine {
    pub fn new(config: &LedgerConfig) -> Self {
        Self { timezone: config.timezone }
    }

    fn cutoff(&self, as_of: Option<NaiveDate>) -> NaiveDate {
        as_of.unwrap_or_else(|| self.timezone.today())
    }

    /// Debit/credit totals and normal-direction balance of one account
    pub async fn account_balance(
        &self,
        tx: &mut dyn LedgerTx,
        account_id: AccountId,
        as_of: Option<NaiveDate>,
    ) -> Result<AccountBalance, LedgerError> {
        let account = tx
            .find_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;
        let as_of = self.cutoff(as_of);
        let (total_debit, total_credit) = self
            .account_totals(tx, ActivityWindow::up_to(as_of).for_account(account_id))
            .await?;

        Ok(AccountBalance {
            account_id,
            balance: account.normal_balance(total_debit, total_credit),
            code: account.code,
            name: account.name,
            account_type: account.account_type,
            as_of,
            total_debit,
            total_credit,
        })
    }

    /// Balance of a party's sub-account; a party without one reads as zero
    pub async fn party_balance(
        &self,
        tx: &mut dyn LedgerTx,
        party: PartyRef,
        as_of: Option<NaiveDate>,
    ) -> Result<PartyBalance, LedgerError> {
        let as_of = self.cutoff(as_of);
        let Some(account) = tx.find_party_account(party).await? else {
            return Ok(PartyBalance {
                party,
                has_ledger_account: false,
                account_id: None,
                account_code: None,
                as_of,
                total_debit: Decimal::ZERO,
                total_credit: Decimal::ZERO,
                balance: Decimal::ZERO,
            });
        };

        let (total_debit, total_credit) = self
            .account_totals(tx, ActivityWindow::up_to(as_of).for_account(account.id))
            .await?;

        Ok(PartyBalance {
            party,
            has_ledger_account: true,
            account_id: Some(account.id),
            balance: account.normal_balance(total_debit, total_credit),
            account_code: Some(account.code),
            as_of,
            total_debit,
            total_credit,
        })
    }

    async fn account_totals(
        &self,
        tx: &mut dyn LedgerTx,
        window: ActivityWindow,
    ) -> Result<(Decimal, Decimal), LedgerError> {
        let activity = tx.account_activity(&window).await?;
        Ok(activity.iter().fold((Decimal::ZERO, Decimal::ZERO), |(d, c), a| {
            (d + a.total_debit, c + a.total_credit)
        }))
    }

    /// Every account with activity up to `as_of`, ordered by code
    pub async fn trial_balance(&self, tx: &mut dyn LedgerTx, as_of: Option<NaiveDate>) -> Result<TrialBalance, LedgerError> {
        let as_of = self.cutoff(as_of);
        let accounts = tx.list_accounts(&AccountFilter::default()).await?;
        let activity = index_activity(tx.account_activity(&ActivityWindow::up_to(as_of)).await?);

        let mut lines = Vec::new();
        let mut total_debit = Decimal::ZERO;
        let mut total_credit = Decimal::ZERO;

        for account in &accounts {
            let Some(a) = activity.get(&account.id) else {
                continue;
            };
            if a.total_debit.is_zero() && a.total_credit.is_zero() {
                continue;
            }
            total_debit += a.total_debit;
            total_credit += a.total_credit;
            lines.push(TrialBalanceLine {
                account_id: account.id,
                code: account.code.clone(),
                name: account.name.clone(),
                account_type: account.account_type,
                total_debit: a.total_debit,
                total_credit: a.total_credit,
                balance: account.normal_balance(a.total_debit, a.total_credit),
            });
        }

        Ok(TrialBalance {
            as_of,
            lines,
            total_debit,
            total_credit,
            difference: (total_debit - total_credit).abs(),
            is_balanced: within_tolerance(total_debit, total_credit),
        })
    }

    /// Income and expenses for an inclusive date range
    pub async fn profit_and_loss(&self, tx: &mut dyn LedgerTx, period: DateRange) -> Result<ProfitAndLoss, LedgerError> {
        let accounts = tx.list_accounts(&AccountFilter::default()).await?;
        let activity = index_activity(tx.account_activity(&ActivityWindow::within(period)).await?);

        let mut income = StatementSection::default();
        let mut expenses = StatementSection::default();

        for account in &accounts {
            let Some(a) = activity.get(&account.id) else {
                continue;
            };
            let amount = account.normal_balance(a.total_debit, a.total_credit);
            match account.account_type {
                AccountType::Income => income.push(account, amount),
                AccountType::Expense => expenses.push(account, amount),
                _ => {}
            }
        }

        Ok(ProfitAndLoss {
            period,
            net_profit: income.total - expenses.total,
            income,
            expenses,
        })
    }

    /// Assets, liabilities and equity as of a date
    pub async fn balance_sheet(&self, tx: &mut dyn LedgerTx, as_of: Option<NaiveDate>) -> Result<BalanceSheet, LedgerError> {
        let as_of = self.cutoff(as_of);
        let accounts = tx.list_accounts(&AccountFilter::default()).await?;
        let activity = index_activity(tx.account_activity(&ActivityWindow::up_to(as_of)).await?);

        let mut assets = StatementSection::default();
        let mut liabilities = StatementSection::default();
        let mut equity = StatementSection::default();
        let mut current_earnings = Decimal::ZERO;

        for account in &accounts {
            let Some(a) = activity.get(&account.id) else {
                continue;
            };
            let amount = account.normal_balance(a.total_debit, a.total_credit);
            match account.account_type {
                AccountType::Asset => assets.push(account, amount),
                AccountType::Liability => liabilities.push(account, amount),
                AccountType::Equity => equity.push(account, amount),
                AccountType::Income => current_earnings += amount,
                AccountType::Expense => current_earnings -= amount,
            }
        }

        let total_equity = equity.total + current_earnings;
        let total_liabilities_and_equity = liabilities.total + total_equity;
        let difference = (assets.total - total_liabilities_and_equity).abs();

        Ok(BalanceSheet {
            as_of,
            is_balanced: within_tolerance(assets.total, total_liabilities_and_equity),
            assets,
            liabilities,
            equity,
            current_earnings,
            total_equity,
            total_liabilities_and_equity,
            difference,
        })
    }

    /// Chronological lines of one account with a running balance
    pub async fn account_ledger(
        &self,
        tx: &mut dyn LedgerTx,
        account_id: AccountId,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<AccountLedger, LedgerError> {
        if let (Some(from), Some(to)) = (from, to) {
            DateRange::new(from, to).map_err(|e| LedgerError::validation(e.to_string()))?;
        }
        let account = tx
            .find_account(account_id)
            .await?
            .ok_or_else(|| LedgerError::AccountNotFound(account_id.to_string()))?;

        let opening_balance = match from.and_then(|f| f.checked_sub_days(Days::new(1))) {
            Some(day_before) => {
                let (d, c) = self
                    .account_totals(tx, ActivityWindow::up_to(day_before).for_account(account_id))
                    .await?;
                account.normal_balance(d, c)
            }
            None => Decimal::ZERO,
        };

        let window = ActivityWindow { from, to, account_id: Some(account_id) };
        let mut running_balance = opening_balance;
        let lines = tx
            .posted_lines(&window)
            .await?
            .into_iter()
            .map(|line| {
                running_balance += account.normal_balance(line.entry.debit, line.entry.credit);
                AccountLedgerLine {
                    transaction_date: line.transaction_date,
                    batch_id: line.entry.batch_id,
                    batch_number: line.batch_number,
                    reference_type: line.reference_type,
                    reference_id: line.reference_id,
                    description: line.description,
                    narration: line.entry.narration,
                    debit: line.entry.debit,
                    credit: line.entry.credit,
                    running_balance,
                }
            })
            .collect();

        Ok(AccountLedger {
            account,
            from,
            to,
            opening_balance,
            lines,
            closing_balance: running_balance,
        })
    }

    /// Sums every effective batch and flags any whose stored totals disagree
    pub async fn health_check(&self, tx: &mut dyn LedgerTx) -> Result<HealthReport, LedgerError> {
        let batches = tx.list_batches(&BatchFilter::effective()).await?;
        let unbalanced_batches: Vec<UnbalancedBatch> = batches
            .iter()
            .filter(|b| !within_tolerance(b.total_debit, b.total_credit))
            .map(|b| UnbalancedBatch {
                batch_id: b.id,
                batch_number: b.batch_number.clone(),
                total_debit: b.total_debit,
                total_credit: b.total_credit,
            })
            .collect();

        let (total_debit, total_credit) = self.account_totals(tx, ActivityWindow::default()).await?;

        Ok(HealthReport {
            total_debit,
            total_credit,
            difference: (total_debit - total_credit).abs(),
            batch_count: batches.len(),
            is_balanced: within_tolerance(total_debit, total_credit) && unbalanced_batches.is_empty(),
            unbalanced_batches,
        })
    }
}

fn index_activity(activity: Vec<AccountActivity>) -> HashMap<AccountId, AccountActivity> {
    activity.into_iter().map(|a| (a.account_id, a)).collect()
}
