//! Read-only access to the shop application's tables
//!
//! The application owns `customers`, `suppliers`, `orders`, `payments` and
//! `"purchaseBills"` with camel-case columns and double-precision amounts.
//! Amounts are rounded to the ledger scale as they are read.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use tracing::instrument;
use uuid::Uuid;

use core_kernel::amount::from_legacy_opt;
use core_kernel::{OrderId, PartyId, PaymentId, PurchaseBillId};
use domain_ledger::ports::{
    LegacyBooks, LegacyCustomer, LegacyOrder, LegacyPayment, LegacyPurchaseBill, LegacySupplier,
    LegacyTotals, PaymentReference,
};
use domain_ledger::{PartyType, StoreError};

use crate::error::{store_err, DatabaseError};

const PARTY_COLUMNS: &str = r#""id", "name", "openingBalance" AS opening_balance,
    "currentBalance" AS current_balance, "createdAt" AS created_at"#;

/// `LegacyBooks` over the shop database
#[derive(Debug, Clone)]
pub struct PgLegacyBooks {
    pool: PgPool,
}

impl PgLegacyBooks {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LegacyBooks for PgLegacyBooks {
    async fn customers(&self) -> Result<Vec<LegacyCustomer>, StoreError> {
        let sql = format!(r#"SELECT {PARTY_COLUMNS} FROM customers ORDER BY "name""#);
        let rows = sqlx::query_as::<_, PartyRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(LegacyCustomer::try_from).collect()
    }

    async fn suppliers(&self) -> Result<Vec<LegacySupplier>, StoreError> {
        let sql = format!(r#"SELECT {PARTY_COLUMNS} FROM suppliers ORDER BY "name""#);
        let rows = sqlx::query_as::<_, PartyRow>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(store_err)?;
        rows.into_iter().map(LegacySupplier::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn orders(&self) -> Result<Vec<LegacyOrder>, StoreError> {
        let rows = sqlx::query_as::<_, OrderRow>(
            r#"
            SELECT "id", "orderNumber" AS order_number, "customerId" AS customer_id,
                   "customerName" AS customer_name, "total", "paidAmount" AS paid_amount,
                   "dueAmount" AS due_amount, "createdAt" AS created_at
            FROM orders
            WHERE NOT COALESCE("isDeleted", FALSE)
            ORDER BY "createdAt"
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(LegacyOrder::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn payments(&self) -> Result<Vec<LegacyPayment>, StoreError> {
        let rows = sqlx::query_as::<_, PaymentRow>(
            r#"
            SELECT "id", "paymentNumber" AS payment_number, "partyType" AS party_type,
                   "partyId" AS party_id, "partyName" AS party_name, "amount",
                   "referenceType" AS reference_type, "referenceId" AS reference_id,
                   "createdAt" AS created_at
            FROM payments
            ORDER BY "createdAt"
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(LegacyPayment::try_from).collect()
    }

    #[instrument(skip(self))]
    async fn purchase_bills(&self) -> Result<Vec<LegacyPurchaseBill>, StoreError> {
        let rows = sqlx::query_as::<_, PurchaseBillRow>(
            r#"
            SELECT p."id", p."billNumber" AS bill_number, p."supplierId" AS supplier_id,
                   s."name" AS supplier_name, p."total", p."paidAmount" AS paid_amount,
                   p."dueAmount" AS due_amount, p."createdAt" AS created_at
            FROM "purchaseBills" p
            LEFT JOIN suppliers s ON s."id" = p."supplierId"
            WHERE NOT COALESCE(p."isDeleted", FALSE)
            ORDER BY p."createdAt"
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(store_err)?;
        rows.into_iter().map(LegacyPurchaseBill::try_from).collect()
    }

    async fn find_customer_by_name(&self, name: &str) -> Result<Option<LegacyCustomer>, StoreError> {
        let sql = format!(
            r#"SELECT {PARTY_COLUMNS} FROM customers
               WHERE LOWER(TRIM("name")) = LOWER(TRIM($1))
               ORDER BY "createdAt"
               LIMIT 1"#
        );
        let row = sqlx::query_as::<_, PartyRow>(&sql)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(store_err)?;
        row.map(LegacyCustomer::try_from).transpose()
    }

    async fn totals(&self) -> Result<LegacyTotals, StoreError> {
        // rounded per row before summing, the same as reading each record
        let row = sqlx::query_as::<_, TotalsRow>(
            r#"
            SELECT
                (SELECT COALESCE(SUM(ROUND(COALESCE("total", 0)::numeric, 2)), 0)
                   FROM orders WHERE NOT COALESCE("isDeleted", FALSE)) AS total_sales,
                (SELECT COALESCE(SUM(ROUND(COALESCE("paidAmount", 0)::numeric, 2)), 0)
                   FROM orders WHERE NOT COALESCE("isDeleted", FALSE)) AS inline_paid,
                (SELECT COALESCE(SUM(ROUND(COALESCE("dueAmount", 0)::numeric, 2)), 0)
                   FROM orders WHERE NOT COALESCE("isDeleted", FALSE)) AS receivable_due,
                (SELECT COALESCE(SUM(ROUND("amount"::numeric, 2)), 0)
                   FROM payments WHERE LOWER("partyType") = 'customer') AS customer_payments
            "#,
        )
        .fetch_one(&self.pool)
        .await
        .map_err(store_err)?;

        Ok(LegacyTotals {
            total_sales: row.total_sales,
            customer_payments: row.customer_payments,
            inline_paid: row.inline_paid,
            receivable_due: row.receivable_due,
        })
    }
}

fn amount(column: &str, value: Option<f64>) -> Result<Decimal, StoreError> {
    from_legacy_opt(value).map_err(|e| DatabaseError::bad_column(column, e).into())
}

fn payment_reference(value: &str) -> Result<PaymentReference, StoreError> {
    match value.to_ascii_lowercase().as_str() {
        "order" => Ok(PaymentReference::Order),
        "purchase" => Ok(PaymentReference::Purchase),
        "advance" => Ok(PaymentReference::Advance),
        other => Err(DatabaseError::bad_column("referenceType", other).into()),
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct PartyRow {
    id: Uuid,
    name: String,
    opening_balance: Option<f64>,
    current_balance: Option<f64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PartyRow> for LegacyCustomer {
    type Error = StoreError;

    fn try_from(row: PartyRow) -> Result<Self, Self::Error> {
        Ok(LegacyCustomer {
            id: PartyId::from_uuid(row.id),
            name: row.name,
            opening_balance: amount("openingBalance", row.opening_balance)?,
            current_balance: amount("currentBalance", row.current_balance)?,
            created_at: row.created_at,
        })
    }
}

impl TryFrom<PartyRow> for LegacySupplier {
    type Error = StoreError;

    fn try_from(row: PartyRow) -> Result<Self, Self::Error> {
        Ok(LegacySupplier {
            id: PartyId::from_uuid(row.id),
            name: row.name,
            opening_balance: amount("openingBalance", row.opening_balance)?,
            current_balance: amount("currentBalance", row.current_balance)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    order_number: String,
    customer_id: Option<Uuid>,
    customer_name: Option<String>,
    total: Option<f64>,
    paid_amount: Option<f64>,
    due_amount: Option<f64>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for LegacyOrder {
    type Error = StoreError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        Ok(LegacyOrder {
            id: OrderId::from_uuid(row.id),
            order_number: row.order_number,
            customer_id: row.customer_id.map(PartyId::from_uuid),
            customer_name: row.customer_name,
            total: amount("total", row.total)?,
            paid_amount: amount("paidAmount", row.paid_amount)?,
            due_amount: amount("dueAmount", row.due_amount)?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PaymentRow {
    id: Uuid,
    payment_number: String,
    party_type: String,
    party_id: Uuid,
    party_name: String,
    amount: f64,
    reference_type: String,
    reference_id: Option<Uuid>,
    created_at: DateTime<Utc>,
}

impl TryFrom<PaymentRow> for LegacyPayment {
    type Error = StoreError;

    fn try_from(row: PaymentRow) -> Result<Self, Self::Error> {
        let party_type: PartyType = row
            .party_type
            .parse()
            .map_err(|e| StoreError::from(DatabaseError::bad_column("partyType", e)))?;

        Ok(LegacyPayment {
            id: PaymentId::from_uuid(row.id),
            payment_number: row.payment_number,
            party_type,
            party_id: PartyId::from_uuid(row.party_id),
            party_name: row.party_name,
            amount: amount("amount", Some(row.amount))?,
            reference: payment_reference(&row.reference_type)?,
            reference_id: row.reference_id,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct PurchaseBillRow {
    id: Uuid,
    bill_number: String,
    supplier_id: Uuid,
    supplier_name: Option<String>,
    total: f64,
    paid_amount: f64,
    due_amount: f64,
    created_at: DateTime<Utc>,
}

impl TryFrom<PurchaseBillRow> for LegacyPurchaseBill {
    type Error = StoreError;

    fn try_from(row: PurchaseBillRow) -> Result<Self, Self::Error> {
        Ok(LegacyPurchaseBill {
            id: PurchaseBillId::from_uuid(row.id),
            bill_number: row.bill_number,
            supplier_id: PartyId::from_uuid(row.supplier_id),
            supplier_name: row.supplier_name,
            total: amount("total", Some(row.total))?,
            paid_amount: amount("paidAmount", Some(row.paid_amount))?,
            due_amount: amount("dueAmount", Some(row.due_amount))?,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct TotalsRow {
    total_sales: Decimal,
    customer_payments: Decimal,
    inline_paid: Decimal,
    receivable_due: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_legacy_amounts_are_rounded() {
        assert_eq!(amount("total", Some(0.1 + 0.2)).unwrap(), Decimal::new(30, 2));
        assert_eq!(amount("total", None).unwrap(), Decimal::ZERO);
        assert!(amount("total", Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_payment_reference_parsing() {
        assert_eq!(payment_reference("order").unwrap(), PaymentReference::Order);
        assert_eq!(payment_reference("ADVANCE").unwrap(), PaymentReference::Advance);
        assert!(matches!(payment_reference("refund"), Err(StoreError::Backend(_))));
    }
}
