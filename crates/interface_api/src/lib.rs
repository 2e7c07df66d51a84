//! HTTP API Layer
//!
//! This crate provides the REST API for the shop ledger using Axum.
//!
//! # Architecture
//!
//! - **Handlers**: one module per area (accounts, batches, business events,
//!   reports, migration)
//! - **Middleware**: request ids, tracing and request logging
//! - **DTOs**: request bodies and query strings, validated with `validator`
//! - **Error Handling**: ledger errors mapped to consistent JSON responses
//!
//! # Example
//!
//! ```rust,ignore
//! use interface_api::create_router;
//!
//! let app = create_router(ledger, config);
//! axum::serve(listener, app).await?;
//! ```

pub mod config;
pub mod error;
pub mod middleware;
pub mod handlers;
pub mod dto;

use axum::{
    Router,
    routing::{delete, get, post},
    middleware as axum_middleware,
};
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use domain_ledger::LedgerService;

use crate::config::ApiConfig;
use crate::handlers::{accounts, batches, health, migration, posting, reports};
use crate::middleware::request_logging;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub ledger: LedgerService,
    pub config: ApiConfig,
}

/// Creates the main API router
///
/// # Arguments
///
/// * `ledger` - Ledger service over the configured stores
/// * `config` - API configuration
///
/// # Returns
///
/// Configured Axum router with all routes and middleware
pub fn create_router(ledger: LedgerService, config: ApiConfig) -> Router {
    let state = AppState { ledger, config };

    let health_routes = Router::new()
        .route("/health", get(health::health_check))
        .route("/health/ready", get(health::readiness_check));

    let account_routes = Router::new()
        .route("/", get(accounts::list_accounts).post(accounts::create_account))
        .route("/code/:code", get(accounts::get_account_by_code))
        .route("/:id", get(accounts::get_account))
        .route("/:id/balance", get(accounts::get_account_balance))
        .route("/:id/ledger", get(accounts::get_account_ledger));

    let party_routes = Router::new()
        .route("/customers/:id/account", post(accounts::open_customer_account))
        .route("/customers/:id/balance", get(accounts::get_customer_balance))
        .route("/suppliers/:id/account", post(accounts::open_supplier_account))
        .route("/suppliers/:id/balance", get(accounts::get_supplier_balance));

    let batch_routes = Router::new()
        .route("/", get(batches::find_batches).post(batches::create_batch))
        .route("/:id", get(batches::get_batch))
        .route("/:id/reverse", post(batches::reverse_batch));

    let event_routes = Router::new()
        .route("/invoices", post(posting::post_invoice))
        .route("/invoices/:id/reverse", post(posting::reverse_invoice))
        .route("/payments", post(posting::post_payment))
        .route("/payments/:id/reverse", post(posting::reverse_payment))
        .route("/purchases", post(posting::post_purchase))
        .route("/purchases/:id/reverse", post(posting::reverse_purchase))
        .route("/payment-toggles", post(posting::post_payment_toggle));

    let report_routes = Router::new()
        .route("/trial-balance", get(reports::trial_balance))
        .route("/profit-and-loss", get(reports::profit_and_loss))
        .route("/balance-sheet", get(reports::balance_sheet))
        .route("/health", get(reports::ledger_health));

    let migration_routes = Router::new()
        .route("/run", post(migration::run_migration))
        .route("/reconciliation", get(migration::reconciliation))
        .route("/data", delete(migration::clear_migration))
        .route("/drift-check", post(migration::drift_check));

    let ledger_routes = Router::new()
        .route("/chart/initialize", post(accounts::initialize_chart))
        .nest("/accounts", account_routes)
        .merge(party_routes)
        .nest("/batches", batch_routes)
        .nest("/events", event_routes)
        .nest("/reports", report_routes)
        .nest("/migration", migration_routes);

    Router::new()
        .merge(health_routes)
        .nest("/api/v1/ledger", ledger_routes)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(axum_middleware::from_fn(request_logging)),
        )
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
