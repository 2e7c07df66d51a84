//! Real-time posting adapters
//!
//! Called by the shop application inside its own database transaction when a
//! business event is saved. Each adapter is idempotent per
//! `(reference_type, reference_id)`, so upstream retries are harmless, and a
//! degenerate event (zero amount, no party) is skipped rather than failed.
//!
//! Any error returned here must abort the caller's transaction; with
//! `posting_enabled == false` the adapters step aside and the business event
//! commits without ledger rows.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};
use uuid::Uuid;

use core_kernel::{BatchId, OrderId, PartyId, PaymentId, PurchaseBillId};
use crate::account::{codes, Account, PartyRef, PartyType};
use crate::batch::{BatchRequest, JournalBatch, ReferenceType};
use crate::config::LedgerConfig;
use crate::engine::BatchEngine;
use crate::error::LedgerError;
use crate::ports::LedgerTx;
use crate::registry::AccountRegistry;

/// Why an adapter did not post
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Ledger posting is switched off
    PostingDisabled,
    /// The event's amount is zero or negative
    NonPositiveAmount,
    /// The event names no customer or supplier
    MissingParty,
    /// Nothing to reverse for this record
    NoOriginalBatch,
    /// A customer payment was routed to the supplier adapter or vice versa
    PartyTypeMismatch,
}

/// A batch produced by a reversal
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReversedBatch {
    pub original_batch_id: BatchId,
    pub original_batch_number: String,
    pub reversal_batch_id: BatchId,
    pub reversal_batch_number: String,
}

/// Result of a posting adapter call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PostingOutcome {
    Posted { batch_id: BatchId, batch_number: String },
    AlreadyPosted { batch_id: BatchId, batch_number: String },
    Reversed { reversals: Vec<ReversedBatch> },
    Skipped { reason: SkipReason },
}

impl PostingOutcome {
    fn posted(batch: &JournalBatch) -> Self {
        PostingOutcome::Posted { batch_id: batch.id, batch_number: batch.batch_number.clone() }
    }

    fn already_posted(batch: &JournalBatch) -> Self {
        PostingOutcome::AlreadyPosted { batch_id: batch.id, batch_number: batch.batch_number.clone() }
    }

    pub fn is_posted(&self) -> bool {
        matches!(self, PostingOutcome::Posted { .. })
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, PostingOutcome::Skipped { .. })
    }

    pub fn batch_id(&self) -> Option<BatchId> {
        match self {
            PostingOutcome::Posted { batch_id, .. } | PostingOutcome::AlreadyPosted { batch_id, .. } => Some(*batch_id),
            _ => None,
        }
    }
}

/// A sales invoice was saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceEvent {
    pub order_id: OrderId,
    pub order_number: String,
    pub customer_id: Option<PartyId>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub total: Decimal,
    /// Amount collected at the counter when the invoice was raised
    #[serde(default)]
    pub paid_amount: Decimal,
    #[serde(default)]
    pub transaction_date: Option<NaiveDate>,
}

/// A payment was received from a customer or made to a supplier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentEvent {
    pub payment_id: PaymentId,
    pub payment_number: String,
    pub party_type: PartyType,
    pub party_id: Option<PartyId>,
    pub party_name: String,
    pub amount: Decimal,
    #[serde(default)]
    pub transaction_date: Option<NaiveDate>,
}

/// A supplier purchase bill was saved
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PurchaseEvent {
    pub bill_id: PurchaseBillId,
    pub bill_number: String,
    pub supplier_id: Option<PartyId>,
    pub supplier_name: String,
    pub total: Decimal,
    #[serde(default)]
    pub transaction_date: Option<NaiveDate>,
}

/// An invoice was flipped between paid and unpaid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentToggleEvent {
    pub order_id: OrderId,
    pub order_number: String,
    pub customer_id: Option<PartyId>,
    #[serde(default)]
    pub customer_name: Option<String>,
    pub amount: Decimal,
    /// true when marked paid, false when marked unpaid
    pub paid: bool,
    #[serde(default)]
    pub transaction_date: Option<NaiveDate>,
}

const WALK_IN_CUSTOMER: &str = "Walk-in Customer";

#[derive(Debug, Clone)]
pub struct PostingAdapters {
    posting_enabled: bool,
    registry: AccountRegistry,
    engine: BatchEngine,
}

impl PostingAdapters {
    pub fn new(config: &LedgerConfig, registry: AccountRegistry, engine: BatchEngine) -> Self {
        Self {
            posting_enabled: config.posting_enabled,
            registry,
            engine,
        }
    }

    fn disabled(&self, reference_type: ReferenceType, reference_id: Uuid) -> Option<PostingOutcome> {
        if self.posting_enabled {
            return None;
        }
        warn!(
            reference_type = %reference_type,
            reference_id = %reference_id,
            "Ledger posting disabled, event committed without ledger rows"
        );
        Some(PostingOutcome::Skipped { reason: SkipReason::PostingDisabled })
    }

    async fn existing_batch(
        &self,
        tx: &mut dyn LedgerTx,
        reference_type: ReferenceType,
        reference_id: Uuid,
    ) -> Result<Option<JournalBatch>, LedgerError> {
        let existing = tx.find_batches_by_reference(reference_type, reference_id).await?;
        if let Some(batch) = existing.into_iter().next() {
            debug!(
                reference_type = %reference_type,
                reference_id = %reference_id,
                batch_number = %batch.batch_number,
                "Already posted, skipping"
            );
            return Ok(Some(batch));
        }
        Ok(None)
    }

    /// Posts a real-time batch.
    ///
    /// A concurrent caller may commit the same reference between the initial
    /// lookup and the insert; the store then rejects the insert and the
    /// committed batch is returned as already posted.
    async fn post_once(&self, tx: &mut dyn LedgerTx, request: BatchRequest) -> Result<PostingOutcome, LedgerError> {
        let reference_type = request.reference_type;
        let reference_id = request.reference_id;

        match self.engine.post(tx, request).await {
            Ok(posted) => Ok(PostingOutcome::posted(&posted.batch)),
            Err(LedgerError::AlreadyProcessed(detail)) => {
                if let Some(reference_id) = reference_id {
                    if let Some(batch) = self.existing_batch(tx, reference_type, reference_id).await? {
                        return Ok(PostingOutcome::already_posted(&batch));
                    }
                }
                Err(LedgerError::AlreadyProcessed(detail))
            }
            Err(other) => Err(other),
        }
    }

    async fn customer_account(
        &self,
        tx: &mut dyn LedgerTx,
        customer_id: PartyId,
        name: Option<&str>,
    ) -> Result<Account, LedgerError> {
        let name = name.filter(|n| !n.trim().is_empty()).unwrap_or(WALK_IN_CUSTOMER);
        self.registry.get_or_create_customer_account(tx, customer_id, name).await
    }

    /// Invoice: DR customer receivable, CR Sales Revenue for the total.
    ///
    /// An amount collected at the counter is posted as a second
    /// `InvoiceCash` batch: DR Cash, CR customer receivable.
    pub async fn post_invoice(&self, tx: &mut dyn LedgerTx, event: &InvoiceEvent) -> Result<PostingOutcome, LedgerError> {
        let reference_id = Uuid::from(event.order_id);
        if let Some(skipped) = self.disabled(ReferenceType::Invoice, reference_id) {
            return Ok(skipped);
        }
        if let Some(batch) = self.existing_batch(tx, ReferenceType::Invoice, reference_id).await? {
            return Ok(PostingOutcome::already_posted(&batch));
        }
        if event.total <= Decimal::ZERO {
            debug!(order_number = %event.order_number, "Invoice total is not positive, skipping");
            return Ok(PostingOutcome::Skipped { reason: SkipReason::NonPositiveAmount });
        }
        let Some(customer_id) = event.customer_id else {
            debug!(order_number = %event.order_number, "Invoice has no customer, skipping");
            return Ok(PostingOutcome::Skipped { reason: SkipReason::MissingParty });
        };

        let customer = self.customer_account(tx, customer_id, event.customer_name.as_deref()).await?;
        let sales = self.registry.require_system_account(tx, codes::SALES_REVENUE).await?;
        let narration = format!("Invoice {}", event.order_number);

        let mut request = BatchRequest::new(ReferenceType::Invoice)
            .with_reference(reference_id)
            .with_description(format!("Invoice {} - {}", event.order_number, customer.name))
            .debit(customer.id, event.total, narration.clone())
            .credit(sales.id, event.total, narration);
        request.transaction_date = event.transaction_date;
        let invoice = self.post_once(tx, request).await?;
        if !invoice.is_posted() {
            return Ok(invoice);
        }

        if event.paid_amount > Decimal::ZERO
            && self.existing_batch(tx, ReferenceType::InvoiceCash, reference_id).await?.is_none()
        {
            let cash = self.registry.require_system_account(tx, codes::CASH).await?;
            let narration = format!("Payment received for {}", event.order_number);
            let mut request = BatchRequest::new(ReferenceType::InvoiceCash)
                .with_reference(reference_id)
                .with_description(format!("Cash received on invoice {}", event.order_number))
                .debit(cash.id, event.paid_amount, narration.clone())
                .credit(customer.id, event.paid_amount, narration);
            request.transaction_date = event.transaction_date;
            self.post_once(tx, request).await?;
        }

        Ok(invoice)
    }

    /// Routes a payment to the customer or supplier adapter by party type
    pub async fn post_payment(&self, tx: &mut dyn LedgerTx, event: &PaymentEvent) -> Result<PostingOutcome, LedgerError> {
        match event.party_type {
            PartyType::Customer => self.post_customer_payment(tx, event).await,
            PartyType::Supplier => self.post_supplier_payment(tx, event).await,
        }
    }

    /// Customer receipt: DR Cash, CR customer receivable
    pub async fn post_customer_payment(&self, tx: &mut dyn LedgerTx, event: &PaymentEvent) -> Result<PostingOutcome, LedgerError> {
        self.post_party_payment(tx, event, PartyType::Customer).await
    }

    /// Supplier payment: DR supplier payable, CR Cash
    pub async fn post_supplier_payment(&self, tx: &mut dyn LedgerTx, event: &PaymentEvent) -> Result<PostingOutcome, LedgerError> {
        self.post_party_payment(tx, event, PartyType::Supplier).await
    }

    async fn post_party_payment(
        &self,
        tx: &mut dyn LedgerTx,
        event: &PaymentEvent,
        expected: PartyType,
    ) -> Result<PostingOutcome, LedgerError> {
        let reference_id = Uuid::from(event.payment_id);
        if let Some(skipped) = self.disabled(ReferenceType::Payment, reference_id) {
            return Ok(skipped);
        }
        if event.party_type != expected {
            warn!(
                payment_number = %event.payment_number,
                party_type = %event.party_type,
                expected = %expected,
                "Payment routed to the wrong adapter, skipping"
            );
            return Ok(PostingOutcome::Skipped { reason: SkipReason::PartyTypeMismatch });
        }
        if let Some(batch) = self.existing_batch(tx, ReferenceType::Payment, reference_id).await? {
            return Ok(PostingOutcome::already_posted(&batch));
        }
        if event.amount <= Decimal::ZERO {
            debug!(payment_number = %event.payment_number, "Payment amount is not positive, skipping");
            return Ok(PostingOutcome::Skipped { reason: SkipReason::NonPositiveAmount });
        }
        let Some(party_id) = event.party_id else {
            debug!(payment_number = %event.payment_number, "Payment has no party, skipping");
            return Ok(PostingOutcome::Skipped { reason: SkipReason::MissingParty });
        };

        let party = self
            .registry
            .get_or_create_party_account(tx, PartyRef { party_id, party_type: expected }, &event.party_name)
            .await?;
        let cash = self.registry.require_system_account(tx, codes::CASH).await?;

        let request = match expected {
            PartyType::Customer => {
                let narration = format!("Receipt {}", event.payment_number);
                BatchRequest::new(ReferenceType::Payment)
                    .with_description(format!("Receipt {} - {}", event.payment_number, event.party_name))
                    .debit(cash.id, event.amount, narration.clone())
                    .credit(party.id, event.amount, narration)
            }
            PartyType::Supplier => {
                let narration = format!("Payment {} to {}", event.payment_number, event.party_name);
                BatchRequest::new(ReferenceType::Payment)
                    .with_description(format!("Payment to {} - {}", event.party_name, event.payment_number))
                    .debit(party.id, event.amount, narration.clone())
                    .credit(cash.id, event.amount, narration)
            }
        };
        let mut request = request.with_reference(reference_id);
        request.transaction_date = event.transaction_date;

        self.post_once(tx, request).await
    }

    /// Purchase bill: DR Purchase Expenses, CR supplier payable
    pub async fn post_purchase(&self, tx: &mut dyn LedgerTx, event: &PurchaseEvent) -> Result<PostingOutcome, LedgerError> {
        let reference_id = Uuid::from(event.bill_id);
        if let Some(skipped) = self.disabled(ReferenceType::Purchase, reference_id) {
            return Ok(skipped);
        }
        if let Some(batch) = self.existing_batch(tx, ReferenceType::Purchase, reference_id).await? {
            return Ok(PostingOutcome::already_posted(&batch));
        }
        if event.total <= Decimal::ZERO {
            return Ok(PostingOutcome::Skipped { reason: SkipReason::NonPositiveAmount });
        }
        let Some(supplier_id) = event.supplier_id else {
            return Ok(PostingOutcome::Skipped { reason: SkipReason::MissingParty });
        };

        let supplier = self
            .registry
            .get_or_create_supplier_account(tx, supplier_id, &event.supplier_name)
            .await?;
        let purchases = self.registry.require_system_account(tx, codes::PURCHASE_EXPENSES).await?;
        let narration = format!("Purchase {}", event.bill_number);

        let mut request = BatchRequest::new(ReferenceType::Purchase)
            .with_reference(reference_id)
            .with_description(format!("Purchase {} - {}", event.bill_number, event.supplier_name))
            .debit(purchases.id, event.total, narration.clone())
            .credit(supplier.id, event.total, narration);
        request.transaction_date = event.transaction_date;

        self.post_once(tx, request).await
    }

    /// Marking an invoice paid posts DR Cash, CR customer; marking it unpaid
    /// reverses the live toggle batch.
    pub async fn post_payment_toggle(
        &self,
        tx: &mut dyn LedgerTx,
        event: &PaymentToggleEvent,
    ) -> Result<PostingOutcome, LedgerError> {
        let reference_id = Uuid::from(event.order_id);
        if let Some(skipped) = self.disabled(ReferenceType::PaymentToggle, reference_id) {
            return Ok(skipped);
        }

        let live_toggle = tx
            .find_batches_by_reference(ReferenceType::PaymentToggle, reference_id)
            .await?
            .into_iter()
            .find(JournalBatch::is_effective);

        if !event.paid {
            let Some(toggle) = live_toggle else {
                debug!(order_number = %event.order_number, "No payment toggle to undo");
                return Ok(PostingOutcome::Skipped { reason: SkipReason::NoOriginalBatch });
            };
            let reason = format!("Invoice {} marked unpaid", event.order_number);
            let reversal = self.engine.reverse(tx, toggle.id, &reason).await?;
            return Ok(PostingOutcome::Reversed {
                reversals: vec![ReversedBatch {
                    original_batch_id: toggle.id,
                    original_batch_number: toggle.batch_number,
                    reversal_batch_id: reversal.batch.id,
                    reversal_batch_number: reversal.batch.batch_number,
                }],
            });
        }

        if let Some(toggle) = live_toggle {
            debug!(order_number = %event.order_number, batch_number = %toggle.batch_number, "Invoice already marked paid");
            return Ok(PostingOutcome::already_posted(&toggle));
        }
        if event.amount <= Decimal::ZERO {
            return Ok(PostingOutcome::Skipped { reason: SkipReason::NonPositiveAmount });
        }
        let Some(customer_id) = event.customer_id else {
            return Ok(PostingOutcome::Skipped { reason: SkipReason::MissingParty });
        };

        let customer = self.customer_account(tx, customer_id, event.customer_name.as_deref()).await?;
        let cash = self.registry.require_system_account(tx, codes::CASH).await?;
        let narration = format!("Invoice {} marked paid", event.order_number);

        let mut request = BatchRequest::new(ReferenceType::PaymentToggle)
            .with_reference(reference_id)
            .with_description(format!("Payment toggle {} - {}", event.order_number, customer.name))
            .debit(cash.id, event.amount, narration.clone())
            .credit(customer.id, event.amount, narration);
        request.transaction_date = event.transaction_date;

        self.post_once(tx, request).await
    }

    /// Reverses an invoice together with its counter cash and live toggle
    pub async fn reverse_invoice(
        &self,
        tx: &mut dyn LedgerTx,
        order_id: OrderId,
        order_number: &str,
    ) -> Result<PostingOutcome, LedgerError> {
        self.reverse_reference(
            tx,
            &[ReferenceType::Invoice, ReferenceType::InvoiceCash, ReferenceType::PaymentToggle],
            order_id.into(),
            &format!("Invoice {} deleted", order_number),
        )
        .await
    }

    pub async fn reverse_payment(
        &self,
        tx: &mut dyn LedgerTx,
        payment_id: PaymentId,
        payment_number: &str,
    ) -> Result<PostingOutcome, LedgerError> {
        self.reverse_reference(
            tx,
            &[ReferenceType::Payment],
            payment_id.into(),
            &format!("Payment {} deleted", payment_number),
        )
        .await
    }

    pub async fn reverse_purchase(
        &self,
        tx: &mut dyn LedgerTx,
        bill_id: PurchaseBillId,
        bill_number: &str,
    ) -> Result<PostingOutcome, LedgerError> {
        self.reverse_reference(
            tx,
            &[ReferenceType::Purchase],
            bill_id.into(),
            &format!("Purchase {} deleted", bill_number),
        )
        .await
    }

    async fn reverse_reference(
        &self,
        tx: &mut dyn LedgerTx,
        reference_types: &[ReferenceType],
        reference_id: Uuid,
        reason: &str,
    ) -> Result<PostingOutcome, LedgerError> {
        if let Some(skipped) = self.disabled(reference_types[0], reference_id) {
            return Ok(skipped);
        }

        let mut reversals = Vec::new();
        for reference_type in reference_types {
            let live: Vec<JournalBatch> = tx
                .find_batches_by_reference(*reference_type, reference_id)
                .await?
                .into_iter()
                .filter(JournalBatch::is_effective)
                .collect();
            for batch in live {
                let reversal = self.engine.reverse(tx, batch.id, reason).await?;
                reversals.push(ReversedBatch {
                    original_batch_id: batch.id,
                    original_batch_number: batch.batch_number,
                    reversal_batch_id: reversal.batch.id,
                    reversal_batch_number: reversal.batch.batch_number,
                });
            }
        }

        if reversals.is_empty() {
            debug!(reference_id = %reference_id, "Nothing to reverse");
            return Ok(PostingOutcome::Skipped { reason: SkipReason::NoOriginalBatch });
        }
        Ok(PostingOutcome::Reversed { reversals })
    }
}
