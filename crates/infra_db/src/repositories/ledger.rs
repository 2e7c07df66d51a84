//! PostgreSQL ledger store
//!
//! [`PgLedgerStore`] hands out [`PgLedgerTx`] values, each wrapping one SQLx
//! transaction. Dropping a `PgLedgerTx` without committing rolls it back.
//!
//! Writes that can hit a uniqueness guard (accounts, batch headers, entries)
//! run under a savepoint. A duplicate posting therefore surfaces as
//! `StoreError::Conflict` and leaves the surrounding transaction usable.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool, Postgres, QueryBuilder, Transaction};
use tracing::{debug, instrument};
use uuid::Uuid;

use core_kernel::{AccountId, BatchId, EntryId, PartyId};
use domain_ledger::ports::{
    AccountActivity, AccountFilter, ActivityWindow, BatchFilter, LedgerStore, LedgerTx, PostedLine,
    PurgeCounts,
};
use domain_ledger::{
    Account, AccountSubType, AccountType, JournalBatch, LedgerEntry, PartyRef, PartyType,
    ReferenceType, StoreError,
};

use crate::error::{store_err, DatabaseError};

const ACCOUNT_COLUMNS: &str = "id, code, name, account_type, sub_type, parent_id, party_type, \
     party_id, description, is_system_account, is_active, created_at";

const BATCH_COLUMNS: &str = "id, batch_number, reference_type, reference_id, description, \
     transaction_date, total_debit, total_credit, is_balanced, is_posted, is_reversed, \
     reversed_batch_id, reversal_of, created_by, created_at";

const ENTRY_COLUMNS: &str = "id, batch_id, account_id, debit, credit, narration, line_no, created_at";

const EFFECTIVE: &str = "b.is_posted AND NOT b.is_reversed AND b.reversal_of IS NULL";

/// Ledger store backed by a PostgreSQL pool
#[derive(Debug, Clone)]
pub struct PgLedgerStore {
    pool: PgPool,
}

impl PgLedgerStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl LedgerStore for PgLedgerStore {
    async fn begin(&self) -> Result<Box<dyn LedgerTx>, StoreError> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))?;
        Ok(Box::new(PgLedgerTx { tx }))
    }
}

/// One open ledger transaction
pub struct PgLedgerTx {
    tx: Transaction<'static, Postgres>,
}

impl PgLedgerTx {
    async fn savepoint(&mut self) -> Result<(), StoreError> {
        sqlx::query("SAVEPOINT ledger_write")
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(())
    }

    /// Releases the savepoint on success, rolls back to it on failure, then
    /// hands the original outcome back
    async fn settle<T>(&mut self, outcome: Result<T, sqlx::Error>) -> Result<T, StoreError> {
        let statement = if outcome.is_ok() {
            "RELEASE SAVEPOINT ledger_write"
        } else {
            "ROLLBACK TO SAVEPOINT ledger_write"
        };
        sqlx::query(statement)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        outcome.map_err(store_err)
    }
}

#[async_trait]
impl LedgerTx for PgLedgerTx {
    async fn find_account(&mut self, id: AccountId) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE id = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        row.map(Account::try_from).transpose()
    }

    async fn find_account_by_code(&mut self, code: &str) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE code = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(code)
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        row.map(Account::try_from).transpose()
    }

    async fn find_party_account(&mut self, party: PartyRef) -> Result<Option<Account>, StoreError> {
        let sql = format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE party_type = $1 AND party_id = $2");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(party.party_type.as_str())
            .bind(Uuid::from(party.party_id))
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        row.map(Account::try_from).transpose()
    }

    async fn list_accounts(&mut self, filter: &AccountFilter) -> Result<Vec<Account>, StoreError> {
        let sql = format!(
            "SELECT {ACCOUNT_COLUMNS} FROM accounts \
             WHERE ($1::varchar IS NULL OR account_type = $1) \
               AND ($2::boolean IS NULL OR is_active = $2) \
             ORDER BY code"
        );
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(filter.account_type.map(|t| t.as_str()))
            .bind(filter.is_active)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(Account::try_from).collect()
    }

    async fn party_account_codes(&mut self, party_type: PartyType) -> Result<Vec<String>, StoreError> {
        sqlx::query_scalar::<_, String>("SELECT code FROM accounts WHERE party_type = $1")
            .bind(party_type.as_str())
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)
    }

    #[instrument(skip(self, account), fields(code = %account.code))]
    async fn insert_account(&mut self, account: &Account) -> Result<(), StoreError> {
        self.savepoint().await?;
        let outcome = insert_account_query(account, false).execute(&mut *self.tx).await;
        self.settle(outcome).await?;
        debug!("Account inserted");
        Ok(())
    }

    async fn insert_account_if_absent(&mut self, account: &Account) -> Result<bool, StoreError> {
        let result = insert_account_query(account, true)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(result.rows_affected() == 1)
    }

    async fn set_account_parent(&mut self, id: AccountId, parent_id: AccountId) -> Result<(), StoreError> {
        let result = sqlx::query("UPDATE accounts SET parent_id = $2 WHERE id = $1")
            .bind(Uuid::from(id))
            .bind(Uuid::from(parent_id))
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?;
        if result.rows_affected() == 0 {
            return Err(DatabaseError::not_found("Account", id).into());
        }
        Ok(())
    }

    #[instrument(skip(self, batch), fields(batch_number = %batch.batch_number))]
    async fn insert_batch(&mut self, batch: &JournalBatch) -> Result<(), StoreError> {
        self.savepoint().await?;
        let outcome = sqlx::query(
            r#"
            INSERT INTO journal_batches (
                id, batch_number, reference_type, reference_id, description,
                transaction_date, total_debit, total_credit, is_balanced, is_posted,
                is_reversed, reversed_batch_id, reversal_of, created_by, created_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(Uuid::from(batch.id))
        .bind(&batch.batch_number)
        .bind(batch.reference_type.as_str())
        .bind(batch.reference_id)
        .bind(&batch.description)
        .bind(batch.transaction_date)
        .bind(batch.total_debit)
        .bind(batch.total_credit)
        .bind(batch.is_balanced)
        .bind(batch.is_posted)
        .bind(batch.is_reversed)
        .bind(batch.reversed_batch_id.map(Uuid::from))
        .bind(batch.reversal_of.map(Uuid::from))
        .bind(&batch.created_by)
        .bind(batch.created_at)
        .execute(&mut *self.tx)
        .await;
        self.settle(outcome).await?;
        Ok(())
    }

    async fn insert_entries(&mut self, entries: &[LedgerEntry]) -> Result<(), StoreError> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO ledger_entries \
             (id, batch_id, account_id, debit, credit, narration, line_no, created_at) ",
        );
        builder.push_values(entries, |mut row, entry| {
            row.push_bind(Uuid::from(entry.id))
                .push_bind(Uuid::from(entry.batch_id))
                .push_bind(Uuid::from(entry.account_id))
                .push_bind(entry.debit)
                .push_bind(entry.credit)
                .push_bind(entry.narration.clone())
                .push_bind(entry.line_no)
                .push_bind(entry.created_at);
        });

        self.savepoint().await?;
        let outcome = builder.build().execute(&mut *self.tx).await;
        self.settle(outcome).await?;
        Ok(())
    }

    async fn find_batch(&mut self, id: BatchId) -> Result<Option<JournalBatch>, StoreError> {
        let sql = format!("SELECT {BATCH_COLUMNS} FROM journal_batches WHERE id = $1");
        let row = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(store_err)?;
        row.map(JournalBatch::try_from).transpose()
    }

    async fn batch_entries(&mut self, id: BatchId) -> Result<Vec<LedgerEntry>, StoreError> {
        let sql = format!("SELECT {ENTRY_COLUMNS} FROM ledger_entries WHERE batch_id = $1 ORDER BY line_no");
        let rows = sqlx::query_as::<_, EntryRow>(&sql)
            .bind(Uuid::from(id))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(rows.into_iter().map(LedgerEntry::from).collect())
    }

    async fn find_batches_by_reference(
        &mut self,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<Vec<JournalBatch>, StoreError> {
        let sql = format!(
            "SELECT {BATCH_COLUMNS} FROM journal_batches \
             WHERE reference_type = $1 AND reference_id = $2 \
             ORDER BY created_at"
        );
        let rows = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(reference_type.as_str())
            .bind(reference_id)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(JournalBatch::try_from).collect()
    }

    async fn list_batches(&mut self, filter: &BatchFilter) -> Result<Vec<JournalBatch>, StoreError> {
        let sql = format!(
            "SELECT {BATCH_COLUMNS} FROM journal_batches b \
             WHERE ($1::varchar IS NULL OR b.reference_type = $1) \
               AND (NOT $2 OR ({EFFECTIVE})) \
             ORDER BY b.transaction_date, b.created_at"
        );
        let rows = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(filter.reference_type.map(|t| t.as_str()))
            .bind(filter.effective_only)
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(JournalBatch::try_from).collect()
    }

    async fn mark_batch_reversed(&mut self, id: BatchId, reversal_id: BatchId) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE journal_batches SET is_reversed = TRUE, reversed_batch_id = $2 \
             WHERE id = $1 AND NOT is_reversed",
        )
        .bind(Uuid::from(id))
        .bind(Uuid::from(reversal_id))
        .execute(&mut *self.tx)
        .await
        .map_err(store_err)?;

        if result.rows_affected() == 1 {
            return Ok(());
        }

        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM journal_batches WHERE id = $1)")
            .bind(Uuid::from(id))
            .fetch_one(&mut *self.tx)
            .await
            .map_err(store_err)?;
        if exists {
            Err(StoreError::Conflict(format!("batch {} already reversed", id)))
        } else {
            Err(DatabaseError::not_found("Journal batch", id).into())
        }
    }

    async fn account_activity(&mut self, window: &ActivityWindow) -> Result<Vec<AccountActivity>, StoreError> {
        let sql = format!(
            "SELECT e.account_id, \
                    COALESCE(SUM(e.debit), 0) AS total_debit, \
                    COALESCE(SUM(e.credit), 0) AS total_credit \
             FROM ledger_entries e \
             JOIN journal_batches b ON b.id = e.batch_id \
             WHERE {EFFECTIVE} \
               AND ($1::date IS NULL OR b.transaction_date >= $1) \
               AND ($2::date IS NULL OR b.transaction_date <= $2) \
               AND ($3::uuid IS NULL OR e.account_id = $3) \
             GROUP BY e.account_id"
        );
        let rows = sqlx::query_as::<_, ActivityRow>(&sql)
            .bind(window.from)
            .bind(window.to)
            .bind(window.account_id.map(Uuid::from))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)?;
        Ok(rows
            .into_iter()
            .map(|row| AccountActivity {
                account_id: AccountId::from_uuid(row.account_id),
                total_debit: row.total_debit,
                total_credit: row.total_credit,
            })
            .collect())
    }

    async fn posted_lines(&mut self, window: &ActivityWindow) -> Result<Vec<PostedLine>, StoreError> {
        let sql = format!(
            "SELECT e.id, e.batch_id, e.account_id, e.debit, e.credit, e.narration, e.line_no, \
                    e.created_at, b.batch_number, b.reference_type, b.reference_id, b.description, \
                    b.transaction_date, b.created_at AS batch_created_at \
             FROM ledger_entries e \
             JOIN journal_batches b ON b.id = e.batch_id \
             WHERE {EFFECTIVE} \
               AND ($1::date IS NULL OR b.transaction_date >= $1) \
               AND ($2::date IS NULL OR b.transaction_date <= $2) \
               AND ($3::uuid IS NULL OR e.account_id = $3) \
             ORDER BY b.transaction_date, b.created_at, b.id, e.line_no"
        );
        let rows = sqlx::query_as::<_, PostedLineRow>(&sql)
            .bind(window.from)
            .bind(window.to)
            .bind(window.account_id.map(Uuid::from))
            .fetch_all(&mut *self.tx)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(PostedLine::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn delete_batches_of_type(&mut self, reference_type: ReferenceType) -> Result<PurgeCounts, StoreError> {
        // reversals of purged batches go too
        let doomed: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM journal_batches WHERE reference_type = $1 \
             UNION \
             SELECT r.id FROM journal_batches r \
             JOIN journal_batches o ON r.reversal_of = o.id \
             WHERE o.reference_type = $1",
        )
        .bind(reference_type.as_str())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(store_err)?;

        if doomed.is_empty() {
            return Ok(PurgeCounts::default());
        }

        let entries = sqlx::query("DELETE FROM ledger_entries WHERE batch_id = ANY($1)")
            .bind(&doomed)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?
            .rows_affected();
        let batches = sqlx::query("DELETE FROM journal_batches WHERE id = ANY($1)")
            .bind(&doomed)
            .execute(&mut *self.tx)
            .await
            .map_err(store_err)?
            .rows_affected();

        debug!(batches, entries, "Purged batches");
        Ok(PurgeCounts { batches, entries })
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx
            .commit()
            .await
            .map_err(|e| StoreError::TransactionFailed(e.to_string()))
    }
}

fn insert_account_query(account: &Account, skip_conflicts: bool) -> sqlx::query::Query<'_, Postgres, sqlx::postgres::PgArguments> {
    let sql = if skip_conflicts {
        "INSERT INTO accounts (id, code, name, account_type, sub_type, parent_id, party_type, \
         party_id, description, is_system_account, is_active, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12) \
         ON CONFLICT DO NOTHING"
    } else {
        "INSERT INTO accounts (id, code, name, account_type, sub_type, parent_id, party_type, \
         party_id, description, is_system_account, is_active, created_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"
    };
    sqlx::query(sql)
        .bind(Uuid::from(account.id))
        .bind(&account.code)
        .bind(&account.name)
        .bind(account.account_type.as_str())
        .bind(account.sub_type.map(|s| s.as_str()))
        .bind(account.parent_id.map(Uuid::from))
        .bind(account.party.map(|p| p.party_type.as_str()))
        .bind(account.party.map(|p| Uuid::from(p.party_id)))
        .bind(&account.description)
        .bind(account.is_system_account)
        .bind(account.is_active)
        .bind(account.created_at)
}

fn parse_column<T: std::str::FromStr>(column: &str, value: &str) -> Result<T, StoreError>
where
    T::Err: std::fmt::Display,
{
    value
        .parse()
        .map_err(|e| DatabaseError::bad_column(column, e).into())
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct AccountRow {
    id: Uuid,
    code: String,
    name: String,
    account_type: String,
    sub_type: Option<String>,
    parent_id: Option<Uuid>,
    party_type: Option<String>,
    party_id: Option<Uuid>,
    description: Option<String>,
    is_system_account: bool,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<AccountRow> for Account {
    type Error = StoreError;

    fn try_from(row: AccountRow) -> Result<Self, Self::Error> {
        let party = match (row.party_type, row.party_id) {
            (Some(party_type), Some(party_id)) => Some(PartyRef {
                party_id: PartyId::from_uuid(party_id),
                party_type: parse_column::<PartyType>("party_type", &party_type)?,
            }),
            _ => None,
        };

        Ok(Account {
            id: AccountId::from_uuid(row.id),
            code: row.code,
            name: row.name,
            account_type: parse_column::<AccountType>("account_type", &row.account_type)?,
            sub_type: row
                .sub_type
                .as_deref()
                .map(|s| parse_column::<AccountSubType>("sub_type", s))
                .transpose()?,
            parent_id: row.parent_id.map(AccountId::from_uuid),
            party,
            description: row.description,
            is_system_account: row.is_system_account,
            is_active: row.is_active,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    batch_number: String,
    reference_type: String,
    reference_id: Option<Uuid>,
    description: Option<String>,
    transaction_date: NaiveDate,
    total_debit: Decimal,
    total_credit: Decimal,
    is_balanced: bool,
    is_posted: bool,
    is_reversed: bool,
    reversed_batch_id: Option<Uuid>,
    reversal_of: Option<Uuid>,
    created_by: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<BatchRow> for JournalBatch {
    type Error = StoreError;

    fn try_from(row: BatchRow) -> Result<Self, Self::Error> {
        Ok(JournalBatch {
            id: BatchId::from_uuid(row.id),
            batch_number: row.batch_number,
            reference_type: parse_column::<ReferenceType>("reference_type", &row.reference_type)?,
            reference_id: row.reference_id,
            description: row.description,
            transaction_date: row.transaction_date,
            total_debit: row.total_debit,
            total_credit: row.total_credit,
            is_balanced: row.is_balanced,
            is_posted: row.is_posted,
            is_reversed: row.is_reversed,
            reversed_batch_id: row.reversed_batch_id.map(BatchId::from_uuid),
            reversal_of: row.reversal_of.map(BatchId::from_uuid),
            created_by: row.created_by,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: Uuid,
    batch_id: Uuid,
    account_id: Uuid,
    debit: Decimal,
    credit: Decimal,
    narration: Option<String>,
    line_no: i32,
    created_at: DateTime<Utc>,
}

impl From<EntryRow> for LedgerEntry {
    fn from(row: EntryRow) -> Self {
        LedgerEntry {
            id: EntryId::from_uuid(row.id),
            batch_id: BatchId::from_uuid(row.batch_id),
            account_id: AccountId::from_uuid(row.account_id),
            debit: row.debit,
            credit: row.credit,
            narration: row.narration,
            line_no: row.line_no,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct ActivityRow {
    account_id: Uuid,
    total_debit: Decimal,
    total_credit: Decimal,
}

#[derive(Debug, FromRow)]
struct PostedLineRow {
    #[sqlx(flatten)]
    entry: EntryRow,
    batch_number: String,
    reference_type: String,
    reference_id: Option<Uuid>,
    description: Option<String>,
    transaction_date: NaiveDate,
    batch_created_at: DateTime<Utc>,
}

impl TryFrom<PostedLineRow> for PostedLine {
    type Error = StoreError;

    fn try_from(row: PostedLineRow) -> Result<Self, Self::Error> {
        Ok(PostedLine {
            entry: row.entry.into(),
            batch_number: row.batch_number,
            reference_type: parse_column::<ReferenceType>("reference_type", &row.reference_type)?,
            reference_id: row.reference_id,
            description: row.description,
            transaction_date: row.transaction_date,
            batch_created_at: row.batch_created_at,
        })
    }
}
