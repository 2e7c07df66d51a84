//! HTTP API tests
//!
//! The router is served by `axum-test` over the in-memory ledger store and
//! the fixture shop's legacy books.

use std::sync::Arc;

use axum::http::StatusCode;
use axum_test::TestServer;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use uuid::Uuid;

use core_kernel::AccountId;
use domain_ledger::account::codes;
use domain_ledger::drift::{DriftReport, DriftStatus};
use domain_ledger::memory::{InMemoryLedgerStore, InMemoryLegacyBooks};
use domain_ledger::migration::{MigrationReport, ReconciliationReport};
use domain_ledger::ports::PurgeCounts;
use domain_ledger::reporting::{AccountBalance, BalanceSheet, PartyBalance, ProfitAndLoss, TrialBalance};
use domain_ledger::{
    Account, AccountType, JournalBatch, LedgerConfig, LedgerService, PostedBatch, PostingOutcome, SkipReason,
};
use interface_api::config::ApiConfig;
use interface_api::create_router;
use interface_api::dto::account::ChartInitResponse;
use interface_api::error::ErrorResponse;
use interface_api::handlers::health::HealthResponse;
use test_utils::{
    assert_fully_reconciled, assert_sheet_balanced, assert_trial_balanced, EventBuilder, IdFixtures,
    ShopFixtures,
};

const API: &str = "/api/v1/ledger";

fn server_over(books: InMemoryLegacyBooks, config: LedgerConfig) -> (TestServer, LedgerService) {
    let ledger = LedgerService::new(Arc::new(InMemoryLedgerStore::new()), Arc::new(books), config);
    let app = create_router(ledger.clone(), ApiConfig::default());
    (TestServer::new(app).unwrap(), ledger)
}

/// Server over the fixture shop with the chart in place
async fn shop_server() -> (TestServer, LedgerService) {
    let (server, ledger) = server_over(ShopFixtures::shop().into_memory_books(), LedgerConfig::default());
    server.post(&format!("{API}/chart/initialize")).await.assert_status_ok();
    (server, ledger)
}

async fn account_id(ledger: &LedgerService, code: &str) -> AccountId {
    ledger.get_account_by_code(code).await.unwrap().id
}

fn two_line_batch(reference_type: &str, debit: AccountId, credit: AccountId, amount: &str) -> Value {
    json!({
        "reference_type": reference_type,
        "description": "Counter sale",
        "entries": [
            { "account_id": debit, "debit": amount, "narration": "sale" },
            { "account_id": credit, "credit": amount, "narration": "sale" }
        ]
    })
}

// ============================================================================
// Health Tests
// ============================================================================

mod health_tests {
    use super::*;

    #[tokio::test]
    async fn test_health_check() {
        let (server, _) = shop_server().await;

        let response = server.get("/health").await;
        response.assert_status_ok();
        assert_eq!(response.json::<HealthResponse>().status, "healthy");
    }

    #[tokio::test]
    async fn test_readiness_opens_ledger_transaction() {
        let (server, _) = shop_server().await;

        let response = server.get("/health/ready").await;
        response.assert_status_ok();
        assert_eq!(response.json::<HealthResponse>().status, "ready");
    }

    #[tokio::test]
    async fn test_responses_carry_request_id() {
        let (server, _) = shop_server().await;

        let response = server.get("/health").await;
        assert!(response.headers().get("x-request-id").is_some());
    }
}

// ============================================================================
// Account Tests
// ============================================================================

mod account_tests {
    use super::*;

    #[tokio::test]
    async fn test_chart_initialization_is_repeatable() {
        let (server, _) = shop_server().await;

        let response = server.post(&format!("{API}/chart/initialize")).await;
        response.assert_status_ok();
        let report = response.json::<ChartInitResponse>();
        assert_eq!(report.created, 0);
        assert_eq!(report.existing, 19);
    }

    #[tokio::test]
    async fn test_list_accounts_by_type() {
        let (server, _) = shop_server().await;

        let response = server
            .get(&format!("{API}/accounts"))
            .add_query_param("account_type", "INCOME")
            .await;
        response.assert_status_ok();
        let accounts = response.json::<Vec<Account>>();
        assert_eq!(accounts.len(), 3);
        assert!(accounts.iter().all(|a| a.account_type == AccountType::Income));
    }

    #[tokio::test]
    async fn test_get_account_by_code() {
        let (server, _) = shop_server().await;

        let response = server.get(&format!("{API}/accounts/code/{}", codes::ACCOUNTS_RECEIVABLE)).await;
        response.assert_status_ok();
        let account = response.json::<Account>();
        assert_eq!(account.code, codes::ACCOUNTS_RECEIVABLE);
        assert!(account.is_system_account);
    }

    #[tokio::test]
    async fn test_unknown_account_is_not_found() {
        let (server, _) = shop_server().await;

        let response = server.get(&format!("{API}/accounts/{}", Uuid::new_v4())).await;
        response.assert_status(StatusCode::NOT_FOUND);
        assert_eq!(response.json::<ErrorResponse>().error, "not_found");
    }

    #[tokio::test]
    async fn test_create_account_then_duplicate_conflicts() {
        let (server, _) = shop_server().await;
        let body = json!({ "code": "5400", "name": "Shop Rent", "account_type": "EXPENSE" });

        let created = server.post(&format!("{API}/accounts")).json(&body).await;
        created.assert_status(StatusCode::CREATED);
        assert_eq!(created.json::<Account>().name, "Shop Rent");

        let duplicate = server.post(&format!("{API}/accounts")).json(&body).await;
        duplicate.assert_status(StatusCode::CONFLICT);
        assert_eq!(duplicate.json::<ErrorResponse>().error, "conflict");
    }

    #[tokio::test]
    async fn test_create_account_requires_name() {
        let (server, _) = shop_server().await;

        let response = server
            .post(&format!("{API}/accounts"))
            .json(&json!({ "code": "5400", "name": "", "account_type": "EXPENSE" }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(response.json::<ErrorResponse>().error, "validation_error");
    }

    #[tokio::test]
    async fn test_customer_account_is_opened_once() {
        let (server, _) = shop_server().await;
        let path = format!("{API}/customers/{}/account", IdFixtures::customer_id().as_uuid());

        let first = server.post(&path).json(&json!({ "name": "Asha" })).await;
        first.assert_status_ok();
        let second = server.post(&path).json(&json!({ "name": "Asha" })).await;
        second.assert_status_ok();

        let first = first.json::<Account>();
        assert_eq!(first.id, second.json::<Account>().id);
        assert!(first.code.starts_with("1300-"));
    }
}

// ============================================================================
// Journal Batch Tests
// ============================================================================

mod batch_tests {
    use super::*;

    #[tokio::test]
    async fn test_post_and_fetch_batch() {
        let (server, ledger) = shop_server().await;
        let cash = account_id(&ledger, codes::CASH).await;
        let capital = account_id(&ledger, codes::OWNERS_CAPITAL).await;

        let response = server
            .post(&format!("{API}/batches"))
            .json(&two_line_batch("ADJUSTMENT", cash, capital, "10000.00"))
            .await;
        response.assert_status(StatusCode::CREATED);
        let posted = response.json::<PostedBatch>();
        assert!(posted.batch.batch_number.starts_with("JV-ADJ"));

        let fetched = server.get(&format!("{API}/batches/{}", posted.batch.id.as_uuid())).await;
        fetched.assert_status_ok();
        let fetched = fetched.json::<PostedBatch>();
        assert_eq!(fetched.entries.len(), 2);
        assert_eq!(fetched.batch.total_debit, dec!(10000.00));

        let balance = server.get(&format!("{API}/accounts/{}/balance", cash.as_uuid())).await;
        balance.assert_status_ok();
        assert_eq!(balance.json::<AccountBalance>().balance, dec!(10000.00));
    }

    #[tokio::test]
    async fn test_unbalanced_batch_cites_difference() {
        let (server, ledger) = shop_server().await;
        let cash = account_id(&ledger, codes::CASH).await;
        let sales = account_id(&ledger, codes::SALES_REVENUE).await;

        let response = server
            .post(&format!("{API}/batches"))
            .json(&json!({
                "reference_type": "ADJUSTMENT",
                "entries": [
                    { "account_id": cash, "debit": "500" },
                    { "account_id": sales, "credit": "499" }
                ]
            }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.json::<ErrorResponse>().message.contains("Difference: 1.00"));

        let trial = server.get(&format!("{API}/reports/trial-balance")).await.json::<TrialBalance>();
        assert!(trial.lines.is_empty());
    }

    #[tokio::test]
    async fn test_batch_without_entries_is_rejected() {
        let (server, _) = shop_server().await;

        let response = server
            .post(&format!("{API}/batches"))
            .json(&json!({ "reference_type": "ADJUSTMENT" }))
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
        assert!(response.json::<ErrorResponse>().message.contains("no entries"));
    }

    #[tokio::test]
    async fn test_unknown_batch_is_not_found() {
        let (server, _) = shop_server().await;

        let response = server.get(&format!("{API}/batches/{}", Uuid::new_v4())).await;
        response.assert_status(StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_reversal_is_one_time() {
        let (server, ledger) = shop_server().await;
        let cash = account_id(&ledger, codes::CASH).await;
        let sales = account_id(&ledger, codes::SALES_REVENUE).await;
        let original = server
            .post(&format!("{API}/batches"))
            .json(&two_line_batch("ADJUSTMENT", cash, sales, "20"))
            .await
            .json::<PostedBatch>();
        let reverse = |id: core_kernel::BatchId| format!("{API}/batches/{}/reverse", id.as_uuid());

        let reversal = server.post(&reverse(original.batch.id)).json(&json!({ "reason": "wrong till" })).await;
        reversal.assert_status(StatusCode::CREATED);
        let reversal = reversal.json::<PostedBatch>();
        assert_eq!(reversal.batch.reversal_of, Some(original.batch.id));

        server
            .post(&reverse(original.batch.id))
            .json(&json!({ "reason": "again" }))
            .await
            .assert_status(StatusCode::CONFLICT);
        server
            .post(&reverse(reversal.batch.id))
            .json(&json!({ "reason": "undo" }))
            .await
            .assert_status(StatusCode::CONFLICT);

        let balance = ledger.get_account_balance(cash, None).await.unwrap();
        assert_eq!(balance.balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_find_batches_by_reference() {
        let (server, ledger) = shop_server().await;
        let cash = account_id(&ledger, codes::CASH).await;
        let expenses = account_id(&ledger, codes::OPERATING_EXPENSES).await;
        let voucher = Uuid::new_v4();

        let mut body = two_line_batch("EXPENSE", expenses, cash, "75");
        body["reference_id"] = json!(voucher);
        server.post(&format!("{API}/batches")).json(&body).await.assert_status(StatusCode::CREATED);

        let response = server
            .get(&format!("{API}/batches"))
            .add_query_param("reference_type", "EXPENSE")
            .add_query_param("reference_id", voucher)
            .await;
        response.assert_status_ok();
        let batches = response.json::<Vec<JournalBatch>>();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].reference_id, Some(voucher));
    }
}

// ============================================================================
// Business Event Tests
// ============================================================================

mod event_tests {
    use super::*;

    #[tokio::test]
    async fn test_invoice_posts_once() {
        let (server, _) = shop_server().await;
        let event = EventBuilder::invoice("INV-9", IdFixtures::customer_id(), dec!(900));

        let first = server.post(&format!("{API}/events/invoices")).json(&event).await;
        first.assert_status_ok();
        let first = first.json::<PostingOutcome>();
        assert!(first.is_posted());

        let replay = server.post(&format!("{API}/events/invoices")).json(&event).await.json::<PostingOutcome>();
        assert!(matches!(replay, PostingOutcome::AlreadyPosted { .. }));
        assert_eq!(replay.batch_id(), first.batch_id());

        let balance = server
            .get(&format!("{API}/customers/{}/balance", IdFixtures::customer_id().as_uuid()))
            .await
            .json::<PartyBalance>();
        assert_eq!(balance.balance, dec!(900));
    }

    #[tokio::test]
    async fn test_deleted_invoice_is_reversed() {
        let (server, ledger) = shop_server().await;
        let event = EventBuilder::invoice("INV-9", IdFixtures::customer_id(), dec!(900));
        server.post(&format!("{API}/events/invoices")).json(&event).await.assert_status_ok();

        let response = server
            .post(&format!("{API}/events/invoices/{}/reverse", event.order_id.as_uuid()))
            .json(&json!({ "number": "INV-9" }))
            .await;
        response.assert_status_ok();
        match response.json::<PostingOutcome>() {
            PostingOutcome::Reversed { reversals } => assert_eq!(reversals.len(), 1),
            other => panic!("expected a reversal, got {other:?}"),
        }

        let balance = ledger
            .get_customer_ledger_balance(IdFixtures::customer_id(), None)
            .await
            .unwrap();
        assert_eq!(balance.balance, Decimal::ZERO);
    }

    #[tokio::test]
    async fn test_purchase_and_supplier_payment() {
        let (server, _) = shop_server().await;
        let supplier = IdFixtures::supplier_id();

        server
            .post(&format!("{API}/events/purchases"))
            .json(&EventBuilder::purchase("PB-9", supplier, dec!(1500)))
            .await
            .assert_status_ok();
        server
            .post(&format!("{API}/events/payments"))
            .json(&EventBuilder::supplier_payment("PAY-S9", supplier, dec!(600)))
            .await
            .assert_status_ok();

        let balance = server
            .get(&format!("{API}/suppliers/{}/balance", supplier.as_uuid()))
            .await
            .json::<PartyBalance>();
        assert_eq!(balance.balance, dec!(900));
    }

    #[tokio::test]
    async fn test_posting_disabled_skips_event() {
        let (server, ledger) = server_over(InMemoryLegacyBooks::new(), LedgerConfig::default().with_posting_enabled(false));
        ledger.initialize_chart_of_accounts().await.unwrap();

        let response = server
            .post(&format!("{API}/events/invoices"))
            .json(&EventBuilder::invoice("INV-9", IdFixtures::customer_id(), dec!(900)))
            .await;
        response.assert_status_ok();
        assert_eq!(
            response.json::<PostingOutcome>(),
            PostingOutcome::Skipped { reason: SkipReason::PostingDisabled }
        );

        let trial = ledger.get_trial_balance(None).await.unwrap();
        assert!(trial.lines.is_empty());
    }
}

// ============================================================================
// Report Tests
// ============================================================================

mod report_tests {
    use super::*;

    #[tokio::test]
    async fn test_reports_balance_after_trading() {
        let (server, _) = shop_server().await;
        let mut invoice = EventBuilder::invoice("INV-9", IdFixtures::customer_id(), dec!(900));
        invoice.paid_amount = dec!(300);
        server.post(&format!("{API}/events/invoices")).json(&invoice).await.assert_status_ok();

        let trial = server.get(&format!("{API}/reports/trial-balance")).await;
        trial.assert_status_ok();
        assert_trial_balanced(&trial.json::<TrialBalance>());

        let sheet = server
            .get(&format!("{API}/reports/balance-sheet"))
            .add_query_param("as_of", "2026-01-31")
            .await;
        sheet.assert_status_ok();
        assert_sheet_balanced(&sheet.json::<BalanceSheet>());

        let pnl = server
            .get(&format!("{API}/reports/profit-and-loss"))
            .add_query_param("from", "2026-01-01")
            .add_query_param("to", "2026-01-31")
            .await;
        pnl.assert_status_ok();
        let pnl = pnl.json::<ProfitAndLoss>();
        assert_eq!(pnl.income.total, dec!(900));
        assert_eq!(pnl.net_profit, dec!(900));
    }

    #[tokio::test]
    async fn test_inverted_period_is_rejected() {
        let (server, _) = shop_server().await;

        let response = server
            .get(&format!("{API}/reports/profit-and-loss"))
            .add_query_param("from", "2026-02-01")
            .add_query_param("to", "2026-01-01")
            .await;
        response.assert_status(StatusCode::UNPROCESSABLE_ENTITY);
    }
}

// ============================================================================
// Migration Tests
// ============================================================================

mod migration_tests {
    use super::*;

    #[tokio::test]
    async fn test_migration_reconciles_the_shop() {
        let (server, _) = shop_server().await;

        let response = server.post(&format!("{API}/migration/run")).await;
        response.assert_status_ok();
        let report = response.json::<MigrationReport>();
        assert_eq!(report.orders.migrated, 2);
        assert_eq!(report.payments.migrated, 2);
        assert_eq!(report.purchases.migrated, 1);

        let reconciliation = server.get(&format!("{API}/migration/reconciliation")).await;
        reconciliation.assert_status_ok();
        assert_fully_reconciled(&reconciliation.json::<ReconciliationReport>());

        let drift = server.post(&format!("{API}/migration/drift-check")).await;
        drift.assert_status_ok();
        assert_eq!(drift.json::<DriftReport>().status, DriftStatus::Ok);
    }

    #[tokio::test]
    async fn test_clear_then_rerun() {
        let (server, _) = shop_server().await;
        server.post(&format!("{API}/migration/run")).await.assert_status_ok();

        let purged = server.delete(&format!("{API}/migration/data")).await;
        purged.assert_status_ok();
        let purged = purged.json::<PurgeCounts>();
        assert!(purged.batches > 0);

        let rerun = server.post(&format!("{API}/migration/run")).await.json::<MigrationReport>();
        assert_eq!(rerun.orders.migrated, 2);
    }
}
