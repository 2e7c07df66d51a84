//! Journal batch engine
//!
//! The only write path into the ledger. A batch is validated, numbered and
//! persisted together with its entries inside the caller's transaction, so
//! either every row lands or none do.

use std::collections::HashSet;

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use core_kernel::amount::round_amount;
use core_kernel::{BatchId, EntryId, Timezone};
use crate::batch::{
    generate_batch_number, validate_entries, BatchRequest, JournalBatch, LedgerEntry, NewEntry,
    PostedBatch, ReferenceType,
};
use crate::config::LedgerConfig;
use crate::error::{LedgerError, StoreError};
use crate::ports::LedgerTx;

#[derive(Debug, Clone)]
pub struct BatchEngine {
    timezone: Timezone,
    created_by: String,
}

impl BatchEngine {
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            timezone: config.timezone,
            created_by: config.created_by.clone(),
        }
    }

    /// Validates and persists a batch
    ///
    /// Amounts are rounded to two places before validation. The batch header
    /// is written first with its computed totals, then every entry in line
    /// order.
    ///
    /// # Errors
    ///
    /// - Any validation error from [`validate_entries`]
    /// - `AccountNotFound` if an entry references an unknown account
    /// - `AlreadyProcessed` if the store already holds a batch for the same
    ///   real-time reference
    pub async fn post(&self, tx: &mut dyn LedgerTx, mut request: BatchRequest) -> Result<PostedBatch, LedgerError> {
        for entry in request.entries.iter_mut() {
            entry.debit = round_amount(entry.debit);
            entry.credit = round_amount(entry.credit);
        }
        let totals = validate_entries(&request.entries)?;

        let mut checked = HashSet::new();
        for entry in &request.entries {
            if checked.insert(entry.account_id) && tx.find_account(entry.account_id).await?.is_none() {
                return Err(LedgerError::AccountNotFound(entry.account_id.to_string()));
            }
        }

        let transaction_date = request
            .transaction_date
            .unwrap_or_else(|| self.timezone.today());
        let now = Utc::now();

        let batch = JournalBatch {
            id: BatchId::new_v7(),
            batch_number: generate_batch_number(request.reference_type, transaction_date),
            reference_type: request.reference_type,
            reference_id: request.reference_id,
            description: request.description,
            transaction_date,
            total_debit: totals.total_debit,
            total_credit: totals.total_credit,
            is_balanced: true,
            is_posted: true,
            is_reversed: false,
            reversed_batch_id: None,
            reversal_of: request.reversal_of,
            created_by: request.created_by.or_else(|| Some(self.created_by.clone())),
            created_at: now,
        };

        tx.insert_batch(&batch).await.map_err(|e| match e {
            StoreError::Conflict(_) if batch.reference_type.is_unique_per_reference() => {
                LedgerError::AlreadyProcessed(format!(
                    "{} {}",
                    batch.reference_type,
                    batch.reference_id.map(|id| id.to_string()).unwrap_or_default()
                ))
            }
            other => other.into(),
        })?;

        let entries: Vec<LedgerEntry> = request
            .entries
            .into_iter()
            .enumerate()
            .map(|(index, entry)| LedgerEntry {
                id: EntryId::new_v7(),
                batch_id: batch.id,
                account_id: entry.account_id,
                debit: entry.debit,
                credit: entry.credit,
                narration: entry.narration,
                line_no: index as i32 + 1,
                created_at: now,
            })
            .collect();
        tx.insert_entries(&entries).await?;

        info!(
            batch_number = %batch.batch_number,
            reference_type = %batch.reference_type,
            reference_id = ?batch.reference_id,
            total = %batch.total_debit,
            "Journal batch posted"
        );

        Ok(PostedBatch { batch, entries })
    }

    /// Posts the mechanical inverse of a batch and links the two
    ///
    /// The reversal is an `Adjustment` batch dated today, carrying the
    /// original's reference id and every line with debit and credit swapped.
    /// The original is touched only to set its reversal link.
    ///
    /// # Errors
    ///
    /// - `BatchNotFound` if the batch does not exist
    /// - `CannotReverseReversal` if the batch is itself a reversal
    /// - `AlreadyReversed` if the batch already has a reversal
    pub async fn reverse(&self, tx: &mut dyn LedgerTx, batch_id: BatchId, reason: &str) -> Result<PostedBatch, LedgerError> {
        let original = tx
            .find_batch(batch_id)
            .await?
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.to_string()))?;

        if original.is_reversal() {
            return Err(LedgerError::CannotReverseReversal(original.batch_number));
        }
        if original.is_reversed {
            return Err(LedgerError::AlreadyReversed(original.batch_number));
        }

        let entries = tx.batch_entries(batch_id).await?;

        let mut request = BatchRequest::new(ReferenceType::Adjustment)
            .with_description(format!("Reversal of {}: {}", original.batch_number, reason))
            .dated(self.timezone.today());
        request.reference_id = original.reference_id;
        request.reversal_of = Some(original.id);

        for entry in &entries {
            let narration = match &entry.narration {
                Some(narration) => format!("Reversal: {}", narration),
                None => "Reversal".to_string(),
            };
            request = request.entry(NewEntry::from(entry).swapped().with_narration(narration));
        }

        let reversal = self.post(tx, request).await?;

        tx.mark_batch_reversed(original.id, reversal.batch.id)
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => LedgerError::AlreadyReversed(original.batch_number.clone()),
                other => other.into(),
            })?;

        info!(
            batch_number = %original.batch_number,
            reversal_batch_number = %reversal.batch.batch_number,
            reason,
            "Journal batch reversed"
        );

        Ok(reversal)
    }

    /// Loads a batch with its entries
    pub async fn get_batch(&self, tx: &mut dyn LedgerTx, batch_id: BatchId) -> Result<PostedBatch, LedgerError> {
        let batch = tx
            .find_batch(batch_id)
            .await?
            .ok_or_else(|| LedgerError::BatchNotFound(batch_id.to_string()))?;
        let entries = tx.batch_entries(batch_id).await?;
        Ok(PostedBatch { batch, entries })
    }

    pub async fn find_batches_by_reference(
        &self,
        tx: &mut dyn LedgerTx,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<Vec<JournalBatch>, LedgerError> {
        Ok(tx.find_batches_by_reference(reference_type, reference_id).await?)
    }
}
