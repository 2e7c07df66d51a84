//! Database Test Utilities
//!
//! Starts PostgreSQL in a test container, applies the ledger and shop schema
//! and seeds legacy records for integration tests.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;
use testcontainers::{
    core::{IntoContainerPort, WaitFor},
    runners::AsyncRunner,
    ContainerAsync, GenericImage, ImageExt,
};

use domain_ledger::ports::{LegacyCustomer, LegacyOrder, LegacyPayment, LegacyPurchaseBill, LegacySupplier};
use domain_ledger::ports::PaymentReference;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;

use crate::fixtures::LegacyShop;

/// Default PostgreSQL image for testing
const POSTGRES_IMAGE: &str = "postgres";
const POSTGRES_TAG: &str = "16-alpine";
const POSTGRES_USER: &str = "test_user";
const POSTGRES_PASSWORD: &str = "test_password";
const POSTGRES_DB: &str = "shop_ledger_test";

const LEDGER_SCHEMA: &str = include_str!("../../../migrations/20260101000001_ledger_schema.sql");
const SHOP_SCHEMA: &str = include_str!("../../../migrations/20260101000002_shop_tables.sql");

type TestResult<T> = Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// Configuration for test database
#[derive(Debug, Clone)]
pub struct TestDatabaseConfig {
    pub user: String,
    pub password: String,
    pub database: String,
    pub host: String,
    pub port: u16,
}

impl Default for TestDatabaseConfig {
    fn default() -> Self {
        Self {
            user: POSTGRES_USER.to_string(),
            password: POSTGRES_PASSWORD.to_string(),
            database: POSTGRES_DB.to_string(),
            host: "localhost".to_string(),
            port: 5432,
        }
    }
}

impl TestDatabaseConfig {
    /// Creates the database connection URL
    pub fn connection_url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

/// A wrapper around a PostgreSQL test container
pub struct TestDatabase {
    _container: ContainerAsync<GenericImage>,
    pub config: TestDatabaseConfig,
    pub pool: PgPool,
}

impl TestDatabase {
    /// Starts a new PostgreSQL container with the schema applied
    ///
    /// # Errors
    ///
    /// Returns an error if the container fails to start or the schema fails
    /// to apply
    pub async fn new() -> TestResult<Self> {
        let container = GenericImage::new(POSTGRES_IMAGE, POSTGRES_TAG)
            .with_exposed_port(5432.tcp())
            .with_wait_for(WaitFor::message_on_stderr("database system is ready to accept connections"))
            .with_env_var("POSTGRES_USER", POSTGRES_USER)
            .with_env_var("POSTGRES_PASSWORD", POSTGRES_PASSWORD)
            .with_env_var("POSTGRES_DB", POSTGRES_DB)
            .start()
            .await?;

        let port = container.get_host_port_ipv4(5432).await?;
        let host = container.get_host().await?.to_string();

        let config = TestDatabaseConfig {
            host,
            port,
            ..TestDatabaseConfig::default()
        };

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.connection_url())
            .await?;

        let test_db = Self {
            _container: container,
            config,
            pool,
        };
        test_db.init_schema().await?;

        Ok(test_db)
    }

    async fn init_schema(&self) -> TestResult<()> {
        sqlx::raw_sql(LEDGER_SCHEMA).execute(&self.pool).await?;
        sqlx::raw_sql(SHOP_SCHEMA).execute(&self.pool).await?;
        Ok(())
    }

    /// Returns a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Empties every table while preserving the schema
    pub async fn clear_data(&self) -> TestResult<()> {
        sqlx::raw_sql(
            r#"TRUNCATE TABLE ledger_entries, journal_batches, accounts,
                   customers, suppliers, orders, payments, "purchaseBills" CASCADE"#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Writes a complete legacy shop into the application tables
    pub async fn seed_shop(&self, shop: &LegacyShop) -> TestResult<()> {
        for customer in &shop.customers {
            self.insert_customer(customer).await?;
        }
        for supplier in &shop.suppliers {
            self.insert_supplier(supplier).await?;
        }
        for order in &shop.orders {
            self.insert_order(order).await?;
        }
        for payment in &shop.payments {
            self.insert_payment(payment).await?;
        }
        for bill in &shop.purchase_bills {
            self.insert_purchase_bill(bill).await?;
        }
        Ok(())
    }

    pub async fn insert_customer(&self, customer: &LegacyCustomer) -> TestResult<()> {
        sqlx::query(
            r#"INSERT INTO customers ("id", "name", "openingBalance", "currentBalance", "createdAt")
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(uuid::Uuid::from(customer.id))
        .bind(&customer.name)
        .bind(as_double(customer.opening_balance))
        .bind(as_double(customer.current_balance))
        .bind(customer.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_supplier(&self, supplier: &LegacySupplier) -> TestResult<()> {
        sqlx::query(
            r#"INSERT INTO suppliers ("id", "name", "openingBalance", "currentBalance", "createdAt")
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(uuid::Uuid::from(supplier.id))
        .bind(&supplier.name)
        .bind(as_double(supplier.opening_balance))
        .bind(as_double(supplier.current_balance))
        .bind(supplier.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_order(&self, order: &LegacyOrder) -> TestResult<()> {
        sqlx::query(
            r#"INSERT INTO orders ("id", "orderNumber", "customerId", "customerName", "total",
                                  "paidAmount", "dueAmount", "createdAt")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"#,
        )
        .bind(uuid::Uuid::from(order.id))
        .bind(&order.order_number)
        .bind(order.customer_id.map(uuid::Uuid::from))
        .bind(&order.customer_name)
        .bind(as_double(order.total))
        .bind(as_double(order.paid_amount))
        .bind(as_double(order.due_amount))
        .bind(order.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_payment(&self, payment: &LegacyPayment) -> TestResult<()> {
        let reference = match payment.reference {
            PaymentReference::Order => "order",
            PaymentReference::Purchase => "purchase",
            PaymentReference::Advance => "advance",
        };
        sqlx::query(
            r#"INSERT INTO payments ("id", "paymentNumber", "partyId", "partyName", "partyType",
                                    "amount", "referenceType", "referenceId", "createdAt")
               VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"#,
        )
        .bind(uuid::Uuid::from(payment.id))
        .bind(&payment.payment_number)
        .bind(uuid::Uuid::from(payment.party_id))
        .bind(&payment.party_name)
        .bind(payment.party_type.as_str())
        .bind(as_double(payment.amount))
        .bind(reference)
        .bind(payment.reference_id)
        .bind(payment.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn insert_purchase_bill(&self, bill: &LegacyPurchaseBill) -> TestResult<()> {
        sqlx::query(
            r#"INSERT INTO "purchaseBills" ("id", "billNumber", "supplierId", "total",
                                           "paidAmount", "dueAmount", "createdAt")
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(uuid::Uuid::from(bill.id))
        .bind(&bill.bill_number)
        .bind(uuid::Uuid::from(bill.supplier_id))
        .bind(as_double(bill.total))
        .bind(as_double(bill.paid_amount))
        .bind(as_double(bill.due_amount))
        .bind(bill.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Soft-deletes an order the way the shop application does
    pub async fn soft_delete_order(&self, order: &LegacyOrder) -> TestResult<()> {
        sqlx::query(r#"UPDATE orders SET "isDeleted" = TRUE WHERE "id" = $1"#)
            .bind(uuid::Uuid::from(order.id))
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

/// The shop stores amounts as double precision
fn as_double(amount: Decimal) -> f64 {
    amount.to_f64().unwrap_or_default()
}

/// Creates an isolated test database for a single test
pub async fn create_isolated_test_database() -> TestResult<TestDatabase> {
    TestDatabase::new().await
}
