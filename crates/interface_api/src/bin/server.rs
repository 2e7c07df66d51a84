//! Shop Ledger - API Server Binary
//!
//! Starts the HTTP API over the PostgreSQL ledger store and the shop's legacy
//! tables.
//!
//! # Usage
//!
//! ```bash
//! LEDGER_DATABASE_URL=postgres://... LEDGER_RUN_MIGRATIONS=true cargo run --bin shop-ledger-api
//! ```
//!
//! # Environment Variables
//!
//! * `LEDGER_HOST` - Server host (default: 0.0.0.0)
//! * `LEDGER_PORT` - Server port (default: 8080)
//! * `LEDGER_DATABASE_URL` - PostgreSQL connection string
//! * `LEDGER_MAX_CONNECTIONS` - Pool size (default: 10)
//! * `LEDGER_LOG_LEVEL` - Log level when `RUST_LOG` is unset (default: info)
//! * `LEDGER_RUN_MIGRATIONS` - Apply the schema at startup (default: false)
//! * `LEDGER_POSTING_ENABLED` - Real-time posting switch (default: true)
//! * `LEDGER_TIMEZONE` - Accounting calendar (default: Asia/Kolkata)
//! * `LEDGER_CREATED_BY` - Label on batches the ledger posts itself
//! * `LEDGER_DRIFT_CHECK_INTERVAL_SECS` - Period of the drift timer; unset disables it

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::net::TcpListener;
use tokio::time::MissedTickBehavior;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_ledger::{LedgerService, LedgerStore, LegacyBooks};
use infra_db::{PgLedgerStore, PgLegacyBooks};
use interface_api::{config::ApiConfig, create_router};

/// Shortest period accepted for the drift timer
const MIN_DRIFT_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid LEDGER_ configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        posting_enabled = config.posting_enabled,
        timezone = %config.timezone,
        "Starting Shop Ledger API Server"
    );

    let pool = infra_db::create_pool(config.database_config())
        .await
        .context("failed to connect to the ledger database")?;

    if config.run_migrations {
        tracing::info!("Running database migrations...");
        infra_db::run_migrations(&pool)
            .await
            .context("failed to apply ledger migrations")?;
    }

    let store: Arc<dyn LedgerStore> = Arc::new(PgLedgerStore::new(pool.clone()));
    let legacy: Arc<dyn LegacyBooks> = Arc::new(PgLegacyBooks::new(pool));
    let ledger = LedgerService::new(store, legacy, config.ledger_config());

    let chart = ledger
        .initialize_chart_of_accounts()
        .await
        .context("failed to initialize the chart of accounts")?;
    tracing::info!(created = chart.created, existing = chart.existing, "Chart of accounts ready");

    if let Some(secs) = config.drift_check_interval_secs {
        spawn_drift_checks(ledger.clone(), Duration::from_secs(secs).max(MIN_DRIFT_INTERVAL));
    }

    let app = create_router(ledger, config.clone());

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` wins over the configured level.
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Runs the drift check on a fixed period for the life of the process
fn spawn_drift_checks(ledger: LedgerService, period: Duration) {
    tracing::info!(period_secs = period.as_secs(), "Scheduling drift checks");

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // the first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            if let Some(report) = ledger.run_scheduled_drift_check().await {
                tracing::debug!(
                    status = ?report.status,
                    customers_checked = report.customers_checked,
                    "Scheduled drift check finished"
                );
            }
        }
    });
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received SIGTERM, initiating graceful shutdown");
        }
    }
}
