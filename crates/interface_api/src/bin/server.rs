//! Dynamic Data - API Server Binary
//!
//! This binary starts the HTTP API server over the sample data types.
//!
//! # Usage
//!
//! ```bash
//! # Run with an in-memory store seeded with sample data
//! cargo run --bin dynamic-data-api
//!
//! # Run against PostgreSQL
//! API_STORE=postgres API_DATABASE_URL=postgres://... cargo run --bin dynamic-data-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` - Server host (default: 0.0.0.0)
//! * `API_PORT` - Server port (default: 8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_STORE` - `memory` or `postgres` (default: memory)
//! * `API_DATABASE_URL` - PostgreSQL connection string
//! * `API_DATABASE_MAX_CONNECTIONS` - Pool size of the postgres backend (default: 10)
//! * `API_SEED_SAMPLE_DATA` - Seed an empty store with sample records (default: true)
//! * `API_LOG_LEVEL` - Log level: trace, debug, info, warn, error (default: info)

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use core_kernel::{DataStore, EntityRegistry, SharePort};
use infra_db::{
    create_pool, run_migrations, DataContext, MemoryShareStore, MemoryStore, PgDataStore,
    PgShareStore,
};
use interface_api::config::{ApiConfig, StoreBackend};
use interface_api::{create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = ApiConfig::from_env().context("invalid API_* configuration")?;

    init_tracing(&config.log_level);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        store = ?config.store,
        "Starting Dynamic Data API Server"
    );

    let registry = Arc::new(domain_sample::registry().context("sample registry is inconsistent")?);

    let (store, shares): (Arc<dyn DataStore>, Arc<dyn SharePort>) = match config.store {
        StoreBackend::Memory => (
            Arc::new(MemoryStore::new()),
            Arc::new(MemoryShareStore::new()),
        ),
        StoreBackend::Postgres => {
            let pool = create_pool(config.database_config())
                .await
                .context("failed to connect to the database")?;
            run_migrations(&pool).await.context("failed to run migrations")?;
            (
                Arc::new(PgDataStore::new(pool.clone())),
                Arc::new(PgShareStore::new(pool)),
            )
        }
    };

    if config.seed_sample_data {
        seed(&registry, store.as_ref()).await?;
    }

    let context = DataContext::new(registry, store);
    let app = create_router(AppState::new(context, shares, config.clone()));

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid server address '{}'", config.server_addr()))?;

    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Inserts the sample data set unless the store already holds records
async fn seed(registry: &EntityRegistry, store: &dyn DataStore) -> anyhow::Result<()> {
    for data_type in registry.data_types() {
        if store.count(data_type).await? > 0 {
            tracing::info!("Store already holds data, skipping sample seed");
            return Ok(());
        }
    }

    let items = domain_sample::sample_items();
    let count = items.len();
    for item in items {
        store.insert(item).await?;
    }
    tracing::info!(count, "Seeded sample data");
    Ok(())
}

/// Initializes the tracing subscriber for structured logging.
///
/// # Arguments
///
/// * `log_level` - The minimum log level to output (trace, debug, info, warn, error)
fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
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
