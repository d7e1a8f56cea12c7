//! Cargo Quotes - API Server Binary
//!
//! Starts the HTTP API together with the in-process proposal job worker.
//!
//! # Usage
//!
//! ```bash
//! # Run with default configuration
//! cargo run --bin cargo-quotes-api
//!
//! # Run with environment variables
//! API_PORT=8080 API_DATABASE_URL=postgres://... cargo run --bin cargo-quotes-api
//! ```
//!
//! # Environment Variables
//!
//! * `API_HOST` / `API_PORT` - Listen address (default: 0.0.0.0:8080)
//! * `API_JWT_SECRET` - JWT signing secret (required in production)
//! * `API_JWT_EXPIRATION_SECS` - JWT token expiration in seconds (default: 3600)
//! * `API_DATABASE_URL` - PostgreSQL connection string (`DATABASE_URL` also accepted)
//! * `API_LOG_LEVEL` - Log level or filter directive (default: info; `RUST_LOG` wins)
//! * `API_LOG_JSON` - Emit JSON log lines (default: false)
//! * `API_PROPOSAL_VALIDITY_DAYS`, `API_PROPOSAL_TIMEZONE` - Proposal terms
//! * `API_COMPANY_NAME` - Company name used in client emails
//! * `API_DOCUMENT_DIR` - Where proposal documents are written
//! * `API_DOCUMENT_RETRY_ATTEMPTS`, `API_RETRY_BASE_DELAY_MS`, `API_RETRY_MAX_DELAY_MS`

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use domain_proposal::{spawn_worker, ChannelJobRunner, ProposalJobHandler};
use infra_db::{create_pool, provision, run_migrations, DatabaseConfig, PgAuditLog, PgProposalStore};
use interface_api::sinks::{FileDocumentRenderer, LogNotificationSink};
use interface_api::{config::ApiConfig, create_router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present (useful for local development)
    dotenvy::dotenv().ok();

    let config = load_config()?;
    init_tracing(&config.log_level, config.log_json);

    tracing::info!(
        host = %config.host,
        port = %config.port,
        "Starting cargo quotes API server"
    );

    let pool = create_pool(DatabaseConfig::new(&config.database_url))
        .await
        .context("connecting to the database")?;
    run_migrations(&pool).await.context("running migrations")?;
    let report = provision(&pool).await.context("provisioning reference data")?;
    tracing::info!(inserted = report.total(), "reference data provisioned");

    let (jobs, receiver) = ChannelJobRunner::new(config.job_queue_capacity);
    let handler = ProposalJobHandler::new(
        Arc::new(PgProposalStore::new(pool.clone())),
        Arc::new(FileDocumentRenderer::new(config.document_dir.clone())),
        Arc::new(LogNotificationSink),
        Arc::new(PgAuditLog::new(pool.clone())),
        config.company_name.clone(),
        config.retry_policy(),
    );
    let worker = spawn_worker(receiver, Arc::new(handler));

    let state = AppState::postgres(pool, config.clone(), Arc::new(jobs))
        .context("invalid proposal configuration")?;
    let app = create_router(state);

    let addr: SocketAddr = config
        .server_addr()
        .parse()
        .with_context(|| format!("invalid listen address {}", config.server_addr()))?;
    tracing::info!(%addr, "Server listening");

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // The router held the last job sender; the worker drains and stops
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "job worker terminated abnormally");
    }

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Loads API configuration from environment variables.
///
/// `DATABASE_URL` is honoured when `API_DATABASE_URL` is not set.
fn load_config() -> anyhow::Result<ApiConfig> {
    let mut config = ApiConfig::from_env().context("loading API_* configuration")?;
    if std::env::var("API_DATABASE_URL").is_err() {
        if let Ok(url) = std::env::var("DATABASE_URL") {
            config.database_url = url;
        }
    }
    Ok(config)
}

/// Initializes the tracing subscriber for structured logging.
///
/// # Arguments
///
/// * `log_level` - Filter used when `RUST_LOG` is not set
/// * `json` - Emit JSON lines instead of human-readable output
fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(true))
            .init();
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
///
/// In-flight requests complete before the process exits.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
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
                tracing::error!(error = %e, "failed to install SIGTERM handler");
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
