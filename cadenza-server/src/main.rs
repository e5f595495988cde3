//! Cadenza Server
//!
//! Owns the job store, submits generation requests to the provider, and polls
//! accepted jobs until they finish.
//!
//! Architecture:
//! - Configuration: Load settings from environment or defaults
//! - Repositories: Key-value persistence of jobs and the profile
//! - Scheduler: Per-job status polling loops
//! - Services: Submission, reads and deletion on top of the stores
//! - API: HTTP endpoints for the CLI and other clients

pub mod api;
pub mod config;
pub mod db;
pub mod repository;
pub mod scheduler;
pub mod service;

use anyhow::{Context, Result};
use cadenza_client::{BodyBuilder, ProviderApi, ProviderClient};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api::AppState;
use crate::config::Config;
use crate::repository::{JobStore, KeyValueStore, ProfileStore, SqliteKeyValueStore};
use crate::scheduler::StatusPoller;
use crate::service::JobController;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cadenza_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Cadenza Server...");

    let config = load_config()?;
    info!(
        "Loaded configuration: provider_url={}, model_version={}, database_url={}",
        config.provider_url, config.model_version, config.database_url
    );

    // Persistence
    let pool = db::create_pool(&config.database_url)
        .await
        .context("Failed to create database pool")?;
    db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;

    let kv: Arc<dyn KeyValueStore> = Arc::new(SqliteKeyValueStore::new(pool));
    let store = Arc::new(JobStore::new(kv.clone()));
    let profiles = Arc::new(ProfileStore::new(kv));

    // Provider client
    let http_client = reqwest::Client::builder()
        .timeout(config.provider_timeout)
        .build()
        .context("Failed to build HTTP client")?;
    let provider: Arc<dyn ProviderApi> = Arc::new(ProviderClient::with_client(
        config.provider_url.clone(),
        config.provider_api_key.clone(),
        http_client,
    ));

    let poller = StatusPoller::new(store.clone(), provider.clone(), config.poll_settings());
    info!("Poll settings: {:?}", poller.settings());

    let controller = Arc::new(JobController::new(
        store,
        profiles,
        provider,
        poller.clone(),
        BodyBuilder::new(config.model_version.clone()),
    ));

    let resumed = controller
        .resume()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to resume unfinished jobs: {:?}", e))?;
    if resumed > 0 {
        info!("Resumed polling for {} unfinished job(s)", resumed);
    }

    // Build router with all API endpoints
    let app = api::create_router(AppState { controller });

    info!("Listening on {}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    poller.shutdown();
    info!("Graceful shutdown complete");

    Ok(())
}

/// Loads configuration from environment variables with fallback to defaults
fn load_config() -> Result<Config> {
    match Config::from_env() {
        Ok(config) => {
            config.validate()?;
            Ok(config)
        }
        Err(e) => {
            warn!("{}; using defaults, provider calls will be rejected", e);
            let config = Config::default();
            config.validate()?;
            Ok(config)
        }
    }
}

/// Wait for Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
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
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl-C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}
