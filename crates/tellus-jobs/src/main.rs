// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tellus Jobs Daemon
//!
//! Hosts the autonomous part of the jobs service: database migrations and
//! the deferred-deletion worker. The request-facing operations are embedded
//! into the gateway host; this binary keeps the deletion queue draining
//! even when no gateway is running.

use std::sync::Arc;

use tracing::{error, info, warn};

use tellus_jobs::config::Config;
use tellus_jobs::deletion_worker::{DeletionWorker, DeletionWorkerConfig};
use tellus_jobs::orchestrator::http::HttpOrchestrator;
use tellus_jobs::store::postgres::PostgresJobStore;
use tellus_jobs::workspace::fs::FsWorkspace;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tellus_jobs=info,sqlx=warn".into()),
        )
        .init();

    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        warn!("No .env file loaded: {}", e);
    }

    // Load configuration
    let config = Config::from_env()?;

    info!(
        data_dir = %config.data_dir.display(),
        orchestrator_url = %config.orchestrator_url,
        "Starting Tellus jobs daemon"
    );

    // Connect to database
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await?;
    sqlx::query("SELECT 1").execute(&pool).await?;
    info!("Connected to database");

    tellus_jobs::migrations::run_postgres(&pool).await?;
    info!("Database migrations applied");

    let store = Arc::new(PostgresJobStore::new(pool));
    let workspace = Arc::new(FsWorkspace::from_config(&config));
    let engine = Arc::new(HttpOrchestrator::from_config(&config)?);

    let worker = DeletionWorker::new(
        store,
        workspace,
        engine,
        DeletionWorkerConfig {
            poll_interval: config.purge_poll,
            ..DeletionWorkerConfig::default()
        },
    );
    let worker_shutdown = worker.shutdown_handle();
    let worker_handle = tokio::spawn(async move {
        worker.run().await;
    });

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    worker_shutdown.notify_one();
    if let Err(e) = worker_handle.await {
        error!("Deletion worker task panicked: {}", e);
    }

    info!("Tellus jobs daemon shut down");

    Ok(())
}
