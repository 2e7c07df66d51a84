//! PostgreSQL adapter tests
//!
//! These start a PostgreSQL container and need a Docker daemon:
//! `cargo test -p infra_db -- --ignored`

use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use uuid::Uuid;

use domain_ledger::account::codes;
use domain_ledger::registry::AccountRegistry;
use domain_ledger::{
    BatchRequest, LedgerConfig, LedgerError, LedgerService, LedgerStore, LegacyBooks, PostingOutcome, ReferenceType,
};
use infra_db::{PgLedgerStore, PgLegacyBooks};
use test_utils::{
    assert_amount_eq, assert_batch_consistent, assert_fully_reconciled, assert_ledger_healthy, assert_trial_balanced,
    create_isolated_test_database, EventBuilder, IdFixtures, ShopFixtures, TestDatabase,
};

async fn service_over(db: &TestDatabase) -> LedgerService {
    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(db.pool().clone()));
    let legacy: Arc<dyn LegacyBooks> = Arc::new(PgLegacyBooks::new(db.pool().clone()));
    let service = LedgerService::new(store, legacy, LedgerConfig::default());
    service.initialize_chart_of_accounts().await.unwrap();
    service
}

// ============================================================================
// Ledger Store Tests
// ============================================================================

mod ledger_store_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_chart_initialization_is_repeatable() {
        let db = create_isolated_test_database().await.unwrap();
        let service = service_over(&db).await;

        let again = service.initialize_chart_of_accounts().await.unwrap();
        assert_eq!(again.created, 0);
        assert_eq!(again.existing, 19);

        let receivable = service.get_account_by_code(codes::ACCOUNTS_RECEIVABLE).await.unwrap();
        let current_assets = service.get_account_by_code(codes::ASSETS).await.unwrap();
        assert_eq!(receivable.parent_id, Some(current_assets.id));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_posted_batch_round_trips_through_postgres() {
        let db = create_isolated_test_database().await.unwrap();
        let service = service_over(&db).await;
        let cash = service.get_account_by_code(codes::CASH).await.unwrap();
        let capital = service.get_account_by_code(codes::OWNERS_CAPITAL).await.unwrap();

        let posted = service
            .create_journal_batch(
                BatchRequest::new(ReferenceType::Adjustment)
                    .with_description("Capital introduced")
                    .debit(cash.id, dec!(10000.00), "Cash in")
                    .credit(capital.id, dec!(10000.00), "Owner"),
            )
            .await
            .unwrap();

        let stored = service.get_batch(posted.batch.id).await.unwrap();
        assert_eq!(stored.batch.batch_number, posted.batch.batch_number);
        assert_eq!(stored.batch.total_debit, dec!(10000.00));
        assert_batch_consistent(&stored.batch, &stored.entries);
        assert_eq!(stored.entries.iter().map(|e| e.line_no).collect::<Vec<_>>(), vec![1, 2]);

        let balance = service.get_account_balance(cash.id, None).await.unwrap();
        assert_eq!(balance.balance, dec!(10000.00));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_duplicate_invoice_leaves_transaction_usable() {
        let db = create_isolated_test_database().await.unwrap();
        let service = service_over(&db).await;
        let customer = service
            .get_or_create_customer_account(IdFixtures::customer_id(), "Asha")
            .await
            .unwrap();
        let sales = service.get_account_by_code(codes::SALES_REVENUE).await.unwrap();
        let cash = service.get_account_by_code(codes::CASH).await.unwrap();

        let invoice = |amount: Decimal| {
            BatchRequest::new(ReferenceType::Invoice)
                .with_reference(IdFixtures::order_id())
                .debit(customer.id, amount, "INV-1")
                .credit(sales.id, amount, "INV-1")
        };

        let mut tx = service.begin().await.unwrap();
        service.create_journal_batch_in(tx.as_mut(), invoice(dec!(250))).await.unwrap();
        let duplicate = service.create_journal_batch_in(tx.as_mut(), invoice(dec!(250))).await;
        assert!(matches!(duplicate, Err(LedgerError::AlreadyProcessed(_))));

        // the savepoint kept the transaction alive
        service
            .create_journal_batch_in(
                tx.as_mut(),
                BatchRequest::new(ReferenceType::Adjustment)
                    .debit(cash.id, dec!(5), "float")
                    .credit(sales.id, dec!(5), "float"),
            )
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let batches = service
            .find_batches_by_reference(ReferenceType::Invoice, IdFixtures::order_id().into())
            .await
            .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(service.get_account_balance(sales.id, None).await.unwrap().balance, dec!(255));
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_uncommitted_posting_is_rolled_back() {
        let db = create_isolated_test_database().await.unwrap();
        let service = service_over(&db).await;
        service
            .get_or_create_customer_account(IdFixtures::customer_id(), "Asha")
            .await
            .unwrap();

        {
            let mut tx = service.begin().await.unwrap();
            let event = EventBuilder::invoice("INV-5", IdFixtures::customer_id(), dec!(900));
            let outcome = service.post_invoice(tx.as_mut(), &event).await.unwrap();
            assert!(outcome.is_posted());
        }

        let balance = service
            .get_customer_ledger_balance(IdFixtures::customer_id(), None)
            .await
            .unwrap();
        assert_eq!(balance.balance, Decimal::ZERO);
        assert_ledger_healthy(&service.health_check().await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_reversal_is_one_time_and_nets_out() {
        let db = create_isolated_test_database().await.unwrap();
        let service = service_over(&db).await;
        service
            .get_or_create_supplier_account(IdFixtures::supplier_id(), "Metro Wholesale")
            .await
            .unwrap();

        let mut tx = service.begin().await.unwrap();
        let event = EventBuilder::purchase("PB-9", IdFixtures::supplier_id(), dec!(1500));
        let outcome = service.post_purchase(tx.as_mut(), &event).await.unwrap();
        tx.commit().await.unwrap();
        let batch_id = outcome.batch_id().unwrap();

        service.reverse_journal_batch(batch_id, "entered twice").await.unwrap();
        let again = service.reverse_journal_batch(batch_id, "entered twice").await;
        assert!(matches!(again, Err(LedgerError::AlreadyReversed(_))));

        let payable = service
            .get_supplier_ledger_balance(IdFixtures::supplier_id(), None)
            .await
            .unwrap();
        assert_eq!(payable.balance, Decimal::ZERO);

        let trial = service.get_trial_balance(None).await.unwrap();
        assert_trial_balanced(&trial);
        assert!(trial.lines.is_empty());
    }
}

// ============================================================================
// Concurrent Writer Tests
// ============================================================================

mod concurrency_tests {
    use super::*;

    async fn party_rows(db: &TestDatabase, party_id: Uuid) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM accounts WHERE party_type = 'customer' AND party_id = $1")
            .bind(party_id)
            .fetch_one(db.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_first_time_callers_share_one_party_account() {
        let db = create_isolated_test_database().await.unwrap();
        let service = service_over(&db).await;
        let registry = AccountRegistry::new(&LedgerConfig::default());
        let customer_id = IdFixtures::customer_id();

        let mut first = service.begin().await.unwrap();
        let mut second = service.begin().await.unwrap();

        let created = registry
            .get_or_create_customer_account(first.as_mut(), customer_id, "Asha")
            .await
            .unwrap();

        // the second insert waits on the first transaction's unique keys
        let (reused, committed) = tokio::join!(
            registry.get_or_create_customer_account(second.as_mut(), customer_id, "Asha"),
            first.commit(),
        );
        committed.unwrap();
        let reused = reused.unwrap();
        second.commit().await.unwrap();

        assert_eq!(reused.id, created.id);
        assert_eq!(reused.code, "1300-001");
        assert_eq!(party_rows(&db, customer_id.into()).await, 1);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_concurrent_invoice_posts_once() {
        let db = create_isolated_test_database().await.unwrap();
        let service = service_over(&db).await;
        let event = EventBuilder::invoice("INV-1", IdFixtures::customer_id(), dec!(750));

        let mut first = service.begin().await.unwrap();
        let mut second = service.begin().await.unwrap();

        let posted = service.post_invoice(first.as_mut(), &event).await.unwrap();
        let (duplicate, committed) = tokio::join!(
            service.post_invoice(second.as_mut(), &event),
            first.commit(),
        );
        committed.unwrap();
        let duplicate = duplicate.unwrap();
        second.commit().await.unwrap();

        assert!(posted.is_posted());
        assert!(matches!(duplicate, PostingOutcome::AlreadyPosted { .. }));
        assert_eq!(duplicate.batch_id(), posted.batch_id());

        let batches = service
            .find_batches_by_reference(ReferenceType::Invoice, event.order_id.into())
            .await
            .unwrap();
        assert_eq!(batches.len(), 1);
        assert_eq!(party_rows(&db, IdFixtures::customer_id().into()).await, 1);
        assert_amount_eq(
            service.get_customer_ledger_balance(IdFixtures::customer_id(), None).await.unwrap().balance,
            dec!(750),
        );
    }
}

// ============================================================================
// Legacy Migration Tests
// ============================================================================

mod migration_tests {
    use super::*;

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_shop_migrates_and_reconciles() {
        let db = create_isolated_test_database().await.unwrap();
        let shop = ShopFixtures::shop();
        db.seed_shop(&shop).await.unwrap();
        let service = service_over(&db).await;

        let report = service.run_full_migration().await.unwrap();
        assert_eq!(report.orders.migrated, 2);
        assert_eq!(report.payments.migrated, 2);
        assert_eq!(report.purchases.migrated, 1);
        assert!(report.orders.errors.is_empty());

        let asha = service
            .get_customer_ledger_balance(ShopFixtures::asha().id, None)
            .await
            .unwrap();
        assert_amount_eq(asha.balance, dec!(400.00));
        let metro = service
            .get_supplier_ledger_balance(ShopFixtures::metro().id, None)
            .await
            .unwrap();
        assert_amount_eq(metro.balance, dec!(2200.00));

        let reconciliation = service.run_reconciliation().await.unwrap();
        assert_fully_reconciled(&reconciliation);
        assert_trial_balanced(&service.get_trial_balance(None).await.unwrap());
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_soft_deleted_orders_stay_out_of_totals() {
        let db = create_isolated_test_database().await.unwrap();
        let shop = ShopFixtures::shop();
        db.seed_shop(&shop).await.unwrap();
        db.soft_delete_order(&shop.orders[1]).await.unwrap();

        let legacy = PgLegacyBooks::new(db.pool().clone());
        let totals = legacy.totals().await.unwrap();
        assert_eq!(totals.total_sales, dec!(1000.00));
        assert_eq!(totals.inline_paid, dec!(400.00));
        assert_eq!(totals.customer_payments, dec!(200.00));
        assert_eq!(legacy.orders().await.unwrap().len(), 1);
    }

    #[tokio::test]
    #[ignore = "requires Docker"]
    async fn test_clear_then_rerun_migration() {
        let db = create_isolated_test_database().await.unwrap();
        db.seed_shop(&ShopFixtures::shop()).await.unwrap();
        let service = service_over(&db).await;

        service.run_full_migration().await.unwrap();
        let purged = service.clear_migration_data().await.unwrap();
        assert!(purged.batches > 0);
        assert_eq!(purged.entries, purged.batches * 2);

        let rerun = service.run_full_migration().await.unwrap();
        assert_eq!(rerun.orders.migrated, 2);
        assert_fully_reconciled(&service.run_reconciliation().await.unwrap());
    }
}
