//! Tests for legacy migration, reconciliation and the drift check

mod common;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use core_kernel::{OrderId, PartyId, PaymentId, PurchaseBillId};
use domain_ledger::account::codes;
use domain_ledger::drift::DriftStatus;
use domain_ledger::memory::InMemoryLegacyBooks;
use domain_ledger::ports::{
    LegacyCustomer, LegacyOrder, LegacyPayment, LegacyPurchaseBill, LegacySupplier, PaymentReference,
};
use domain_ledger::{LedgerConfig, PartyType, ReferenceType};

use common::{at, with_books, Harness};

fn customer(name: &str, opening: Decimal, current: Decimal) -> LegacyCustomer {
    LegacyCustomer {
        id: PartyId::new(),
        name: name.to_string(),
        opening_balance: opening,
        current_balance: current,
        created_at: at(2024, 1, 1),
    }
}

fn supplier(name: &str, opening: Decimal) -> LegacySupplier {
    LegacySupplier {
        id: PartyId::new(),
        name: name.to_string(),
        opening_balance: opening,
        current_balance: opening,
        created_at: at(2024, 1, 1),
    }
}

fn order(number: &str, customer: &LegacyCustomer, total: Decimal, paid: Decimal, due: Decimal) -> LegacyOrder {
    LegacyOrder {
        id: OrderId::new(),
        order_number: number.to_string(),
        customer_id: Some(customer.id),
        customer_name: Some(customer.name.clone()),
        total,
        paid_amount: paid,
        due_amount: due,
        created_at: at(2024, 2, 10),
    }
}

fn customer_payment(number: &str, customer: &LegacyCustomer, amount: Decimal) -> LegacyPayment {
    LegacyPayment {
        id: PaymentId::new(),
        payment_number: number.to_string(),
        party_type: PartyType::Customer,
        party_id: customer.id,
        party_name: customer.name.clone(),
        amount,
        reference: PaymentReference::Order,
        reference_id: None,
        created_at: at(2024, 2, 15),
    }
}

/// Two customers (one reached only by name), one supplier
///
/// Legacy balances agree with what the ledger computes after migration:
/// Asha 400, Bala 300, Metro 2200 payable.
struct Shop {
    asha: LegacyCustomer,
    bala: LegacyCustomer,
    metro: LegacySupplier,
    books: InMemoryLegacyBooks,
}

fn shop() -> Shop {
    let asha = customer("Asha", Decimal::ZERO, dec!(400));
    let bala = customer("Bala Stores", Decimal::ZERO, dec!(300));
    let metro = supplier("Metro Wholesale", dec!(1000));

    let mut by_name = order("INV-2", &bala, dec!(300), Decimal::ZERO, dec!(300));
    by_name.customer_id = None;

    let supplier_payment = LegacyPayment {
        id: PaymentId::new(),
        payment_number: "PAY-S1".to_string(),
        party_type: PartyType::Supplier,
        party_id: metro.id,
        party_name: metro.name.clone(),
        amount: dec!(300),
        reference: PaymentReference::Purchase,
        reference_id: None,
        created_at: at(2024, 3, 5),
    };

    let books = InMemoryLegacyBooks::new()
        .with_customer(asha.clone())
        .with_customer(bala.clone())
        .with_supplier(metro.clone())
        .with_order(order("INV-1", &asha, dec!(1000), dec!(400), dec!(400)))
        .with_order(by_name)
        .with_payment(customer_payment("PAY-1", &asha, dec!(200)))
        .with_payment(supplier_payment)
        .with_purchase_bill(LegacyPurchaseBill {
            id: PurchaseBillId::new(),
            bill_number: "PB-1".to_string(),
            supplier_id: metro.id,
            supplier_name: Some(metro.name.clone()),
            total: dec!(2000),
            paid_amount: dec!(500),
            due_amount: dec!(1200),
            created_at: at(2024, 3, 1),
        });

    Shop { asha, bala, metro, books }
}

fn shop_harness() -> (Harness, LegacyCustomer, LegacyCustomer, LegacySupplier) {
    let Shop { asha, bala, metro, books } = shop();
    (with_books(books, LedgerConfig::default()), asha, bala, metro)
}

// ============================================================================
// Migration Tests
// ============================================================================

mod migration_tests {
    use super::*;

    #[tokio::test]
    async fn test_full_migration_reconciles() {
        let (h, asha, bala, metro) = shop_harness();

        let report = h.service.run_full_migration().await.unwrap();

        assert_eq!(report.chart.created, 19);
        assert_eq!(report.customers.migrated, 2);
        assert_eq!(report.suppliers.migrated, 1);
        assert_eq!(report.opening_balances.migrated, 1);
        assert_eq!(report.orders.migrated, 2);
        assert_eq!(report.payments.migrated, 2);
        assert_eq!(report.purchases.migrated, 1);
        assert!(report.orders.errors.is_empty());
        assert!(report.payments.errors.is_empty());

        let asha_balance = h.service.get_customer_ledger_balance(asha.id, None).await.unwrap();
        let bala_balance = h.service.get_customer_ledger_balance(bala.id, None).await.unwrap();
        let metro_balance = h.service.get_supplier_ledger_balance(metro.id, None).await.unwrap();
        assert_eq!(asha_balance.balance, dec!(400));
        assert_eq!(bala_balance.balance, dec!(300));
        assert_eq!(metro_balance.balance, dec!(2200));

        let recon = &report.reconciliation;
        assert_eq!(recon.summary.total_customers, 2);
        assert_eq!(recon.summary.total_suppliers, 1);
        assert_eq!(recon.summary.mismatched, 0);
        assert!(recon.mismatches.is_empty());
        assert!(recon.system_totals.sales.is_matched);
        assert!(recon.system_totals.payments.is_matched);
        assert!(recon.system_totals.receivables.is_matched);
        assert!(recon.health.is_balanced);
    }

    #[tokio::test]
    async fn test_migration_batches_keep_source_dates() {
        let (h, _, _, _) = shop_harness();
        h.service.run_full_migration().await.unwrap();

        let cash = h.account(codes::CASH).await;
        let ledger = h.service.get_account_ledger(cash.id, None, None).await.unwrap();
        let dates: Vec<_> = ledger.lines.iter().map(|l| l.transaction_date).collect();
        assert!(dates.contains(&common::date(2024, 2, 10)));
        assert!(dates.contains(&common::date(2024, 2, 15)));
        assert!(ledger.lines.iter().all(|l| l.reference_type == ReferenceType::Migration));
        assert!(ledger
            .lines
            .iter()
            .any(|l| l.description.as_deref() == Some("Migration: Payment for Invoice INV-1")));
    }

    #[tokio::test]
    async fn test_second_run_migrates_nothing() {
        let (h, asha, _, metro) = shop_harness();
        h.service.run_full_migration().await.unwrap();
        let batches = h.store.batch_count().await;
        let accounts = h.store.account_count().await;

        let again = h.service.run_full_migration().await.unwrap();

        assert_eq!(again.chart.created, 0);
        assert_eq!(again.customers.migrated, 0);
        assert_eq!(again.opening_balances.migrated, 0);
        assert_eq!(again.orders.migrated, 0);
        assert_eq!(again.orders.skipped, 2);
        assert_eq!(again.payments.migrated, 0);
        assert_eq!(again.purchases.migrated, 0);
        assert_eq!(h.store.batch_count().await, batches);
        assert_eq!(h.store.account_count().await, accounts);

        let asha_balance = h.service.get_customer_ledger_balance(asha.id, None).await.unwrap();
        let metro_balance = h.service.get_supplier_ledger_balance(metro.id, None).await.unwrap();
        assert_eq!(asha_balance.balance, dec!(400));
        assert_eq!(metro_balance.balance, dec!(2200));
    }

    #[tokio::test]
    async fn test_bad_records_are_collected_not_fatal() {
        let Shop { books, .. } = shop();
        let stranger = customer("Nobody Known", Decimal::ZERO, Decimal::ZERO);
        let mut orphan = order("INV-9", &stranger, dec!(50), Decimal::ZERO, dec!(50));
        orphan.customer_id = None;
        let books = books
            .with_order(orphan)
            .with_payment(customer_payment("PAY-9", &stranger, dec!(10)));
        let h = with_books(books, LedgerConfig::default());

        let report = h.service.run_full_migration().await.unwrap();

        assert_eq!(report.orders.migrated, 2);
        assert_eq!(report.orders.errors.len(), 1);
        assert_eq!(report.orders.errors[0].label, "INV-9");
        assert_eq!(report.payments.migrated, 2);
        assert_eq!(report.payments.errors.len(), 1);
        assert!(report.payments.errors[0].error.contains("Account not found"));
    }

    #[tokio::test]
    async fn test_opening_balances_follow_party_direction() {
        let owes_us = customer("Chitra", dec!(250), dec!(250));
        let advance = customer("Dev", dec!(-100), dec!(-100));
        let we_owe = supplier("Ganga Mills", dec!(700));
        let books = InMemoryLegacyBooks::new()
            .with_customer(owes_us.clone())
            .with_customer(advance.clone())
            .with_supplier(we_owe.clone());
        let h = with_books(books, LedgerConfig::default());

        let report = h.service.run_full_migration().await.unwrap();
        assert_eq!(report.opening_balances.migrated, 3);

        let chitra = h.service.get_customer_ledger_balance(owes_us.id, None).await.unwrap();
        let dev = h.service.get_customer_ledger_balance(advance.id, None).await.unwrap();
        let ganga = h.service.get_supplier_ledger_balance(we_owe.id, None).await.unwrap();
        assert_eq!(chitra.balance, dec!(250));
        assert_eq!(dev.balance, dec!(-100));
        assert_eq!(ganga.balance, dec!(700));

        let equity = h.account(codes::OPENING_BALANCE_EQUITY).await;
        let equity = h.service.get_account_balance(equity.id, None).await.unwrap();
        assert_eq!(equity.total_credit, dec!(250));
        assert_eq!(equity.total_debit, dec!(800));
        assert_eq!(equity.balance, dec!(-550));

        let sheet = h.service.get_balance_sheet(None).await.unwrap();
        assert!(sheet.is_balanced);
        assert_eq!(report.reconciliation.summary.mismatched, 0);
    }

    #[tokio::test]
    async fn test_clear_migration_data_keeps_other_batches() {
        let Shop { metro, books, .. } = shop();
        let h = with_books(books, LedgerConfig::default());
        h.service.run_full_migration().await.unwrap();

        let counts = h.service.clear_migration_data().await.unwrap();

        // two per order with cash, one per plain order or payment, two for the paid bill
        assert_eq!(counts.batches, 7);
        assert_eq!(counts.entries, 14);
        assert_eq!(h.store.batch_count().await, 1);
        let opening = h
            .service
            .find_batches_by_reference(ReferenceType::Opening, metro.id.into())
            .await
            .unwrap();
        assert_eq!(opening.len(), 1);
        let trial = h.service.get_trial_balance(None).await.unwrap();
        assert!(trial.is_balanced);

        let rerun = h.service.run_full_migration().await.unwrap();
        assert_eq!(rerun.orders.migrated, 2);
        assert_eq!(rerun.reconciliation.summary.mismatched, 0);
    }
}

// ============================================================================
// Reconciliation Tests
// ============================================================================

mod reconciliation_tests {
    use super::*;

    #[tokio::test]
    async fn test_unmigrated_order_shows_as_mismatch() {
        let Shop { asha, books, .. } = shop();
        let h = with_books(books, LedgerConfig::default());
        h.service.run_full_migration().await.unwrap();

        h.legacy
            .add_order(order("INV-3", &asha, dec!(150), Decimal::ZERO, dec!(150)))
            .await;
        let report = h.service.run_reconciliation().await.unwrap();

        assert_eq!(report.summary.mismatched, 1);
        let row = report.customers.iter().find(|r| r.party.party_id == asha.id).unwrap();
        assert!(!row.is_matched);
        assert_eq!(row.legacy_balance, dec!(550));
        assert_eq!(row.ledger_balance, dec!(400));
        assert_eq!(row.difference, dec!(150));

        let detail = &report.mismatches[0];
        assert_eq!(detail.legacy_documents.len(), 2);
        assert!(!detail.ledger_lines.is_empty());
        assert!(!report.system_totals.sales.is_matched);
        assert_eq!(report.system_totals.sales.difference, dec!(150));
    }

    #[tokio::test]
    async fn test_deleted_orders_are_ignored() {
        let Shop { asha, books, .. } = shop();
        let extra = order("INV-X", &asha, dec!(75), Decimal::ZERO, dec!(75));
        let extra_id = extra.id;
        let h = with_books(books.with_order(extra), LedgerConfig::default());
        h.legacy.delete_order(extra_id).await;

        let report = h.service.run_full_migration().await.unwrap();

        assert_eq!(report.orders.migrated, 2);
        assert_eq!(report.reconciliation.summary.mismatched, 0);
    }
}

// ============================================================================
// Drift Check Tests
// ============================================================================

mod drift_tests {
    use super::*;

    #[tokio::test]
    async fn test_no_drift_after_clean_migration() {
        let (h, _, _, _) = shop_harness();
        h.service.run_full_migration().await.unwrap();

        let report = h.service.daily_drift_check().await.unwrap();

        assert_eq!(report.status, DriftStatus::Ok);
        assert_eq!(report.customers_checked, 2);
        assert!(report.customer_drift.is_empty());
        assert!(report.system_totals.sales.is_matched);
        assert!(report.system_totals.payments.is_matched);
        assert_eq!(report.system_totals.payments.ledger, dec!(600));
    }

    #[tokio::test]
    async fn test_counter_divergence_is_reported() {
        let (h, asha, _, _) = shop_harness();
        h.service.run_full_migration().await.unwrap();
        assert!(h.legacy.set_customer_balance(asha.id, dec!(450)).await);

        let report = h.service.run_scheduled_drift_check().await.unwrap();

        assert_eq!(report.status, DriftStatus::DriftDetected);
        assert_eq!(report.customer_drift.len(), 1);
        let drift = &report.customer_drift[0];
        assert_eq!(drift.customer_id, asha.id);
        assert_eq!(drift.legacy_outstanding, dec!(450));
        assert_eq!(drift.ledger_balance, dec!(400));
        assert_eq!(drift.difference, dec!(50));
    }

    #[tokio::test]
    async fn test_unposted_payment_drifts_system_totals() {
        let (h, asha, _, _) = shop_harness();
        h.service.run_full_migration().await.unwrap();
        h.legacy.add_payment(customer_payment("PAY-2", &asha, dec!(100))).await;

        let report = h.service.daily_drift_check().await.unwrap();

        assert!(report.has_drift());
        assert!(!report.system_totals.payments.is_matched);
        assert_eq!(report.system_totals.payments.difference, dec!(100));
    }
}
