//! Process entry point.
//!
//! Wires the pipeline together: one SQLite pool, one connection registry,
//! one ingest service, and (optionally) one change poller, all handed to
//! the Axum router. Runs until Ctrl+C, then stops the poller and drops
//! every observer before exiting.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use dotenvy::dotenv;
use tokio::signal;

use vitals_monitor::api::{self, AppState};
use vitals_monitor::broadcast::ConnectionRegistry;
use vitals_monitor::cli::Cli;
use vitals_monitor::config::Config;
use vitals_monitor::db;
use vitals_monitor::ingest::VitalsIngestService;
use vitals_monitor::logging::init_logging;
use vitals_monitor::metrics::AppMetrics;
use vitals_monitor::poller::VitalsPoller;
use vitals_monitor::repository::VitalsRepository;

#[tokio::main]
async fn main() {
    dotenv().ok();
    init_logging();

    let cli = Cli::parse();
    let mut config = Config::from_env().unwrap_or_else(|err| {
        tracing::error!("Config error: {}", err);
        std::process::exit(1);
    });
    if let Some(url) = cli.database_url {
        config.database_url = url;
    }
    if let Some(addr) = cli.bind_addr {
        config.bind_addr = addr;
    }
    if let Some(interval) = cli.poll_interval {
        config.poll_interval_seconds = interval;
    }
    if cli.enable_poller {
        config.poller_enabled = true;
    }

    let pool = match db::create_pool(&config.database_url).await {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!("Failed to open database {}: {}", config.database_url, err);
            std::process::exit(1);
        }
    };

    let repo = Arc::new(VitalsRepository::new(pool));
    let registry = Arc::new(ConnectionRegistry::new(Duration::from_millis(
        config.send_timeout_ms,
    )));
    let metrics = Arc::new(AppMetrics::new());
    let ingest = Arc::new(VitalsIngestService::new(
        repo.clone(),
        registry.clone(),
        metrics.clone(),
    ));

    let poller = Arc::new(VitalsPoller::new(
        repo.clone(),
        registry.clone(),
        metrics.clone(),
        Duration::from_secs(config.poll_interval_seconds),
    ));
    if config.poller_enabled {
        poller.start().await;
    }

    let state = AppState {
        ingest,
        repo,
        registry: registry.clone(),
        metrics,
    };
    let app = api::router(state);

    let listener = match tokio::net::TcpListener::bind(&config.bind_addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("Failed to bind {}: {}", config.bind_addr, err);
            std::process::exit(1);
        }
    };
    tracing::info!("Listening on {}", config.bind_addr);

    let shutdown_poller = poller.clone();
    let shutdown_registry = registry.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = signal::ctrl_c().await;
            tracing::info!("Shutdown signal received");
            shutdown_poller.stop().await;
            shutdown_registry.disconnect_all().await;
        })
        .await
        .unwrap_or_else(|err| {
            tracing::error!("Server error: {}", err);
            std::process::exit(1);
        });

    tracing::info!("Server stopped cleanly");
}
