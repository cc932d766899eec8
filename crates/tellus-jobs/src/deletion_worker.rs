// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Background worker draining the deferred-deletion queue.
//!
//! `delete(delayed = true)` and every synchronous run only enqueue the job;
//! its row, workspace and orchestrator units stay alive so result files
//! remain downloadable for the grace period. This worker periodically picks
//! up the due entries and runs the full removal sequence. The queue entry
//! itself is the last thing the purge removes, so a crash mid-purge leaves
//! the entry behind and the next cycle retries it; every removal step is
//! idempotent.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::orchestrator::OrchestratorClient;
use crate::purge;
use crate::store::JobStore;
use crate::workspace::JobWorkspace;

/// Configuration for the deletion worker.
#[derive(Debug, Clone)]
pub struct DeletionWorkerConfig {
    /// How often to look for due entries.
    pub poll_interval: Duration,
    /// Maximum entries purged per cycle.
    pub batch_size: i64,
}

impl Default for DeletionWorkerConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            batch_size: 20,
        }
    }
}

/// Background worker that purges jobs whose deferred deletion is due.
pub struct DeletionWorker {
    config: DeletionWorkerConfig,
    store: Arc<dyn JobStore>,
    workspace: Arc<dyn JobWorkspace>,
    engine: Arc<dyn OrchestratorClient>,
    shutdown: Arc<Notify>,
}

impl DeletionWorker {
    /// Create a new deletion worker.
    pub fn new(
        store: Arc<dyn JobStore>,
        workspace: Arc<dyn JobWorkspace>,
        engine: Arc<dyn OrchestratorClient>,
        config: DeletionWorkerConfig,
    ) -> Self {
        Self {
            config,
            store,
            workspace,
            engine,
            shutdown: Arc::new(Notify::new()),
        }
    }

    /// Get a handle that can be used to signal shutdown.
    pub fn shutdown_handle(&self) -> Arc<Notify> {
        self.shutdown.clone()
    }

    /// Run the worker loop.
    ///
    /// This will periodically drain the due part of the deletion queue.
    /// The loop exits when the shutdown signal is received.
    pub async fn run(&self) {
        info!(
            poll_interval_secs = self.config.poll_interval.as_secs(),
            batch_size = self.config.batch_size,
            "Deletion worker started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.notified() => {
                    info!("Deletion worker received shutdown signal");
                    break;
                }

                _ = tokio::time::sleep(self.config.poll_interval) => {
                    if let Err(e) = self.purge_due().await {
                        error!(error = %e, "Failed to read the deletion queue");
                    }
                }
            }
        }

        info!("Deletion worker stopped");
    }

    /// Drain one batch of due entries. A failed purge keeps its entry
    /// queued for the next cycle.
    pub async fn purge_due(&self) -> Result<()> {
        let due = self.store.due_deletions(Utc::now(), self.config.batch_size).await?;
        if due.is_empty() {
            debug!("No deletions due");
            return Ok(());
        }

        let mut purged = 0u64;
        let mut failures = 0u64;
        for entry in due {
            let outcome = purge::purge_job(
                self.store.as_ref(),
                self.workspace.as_ref(),
                self.engine.as_ref(),
                &entry.user_id,
                &entry.job_id,
            )
            .await;

            match outcome {
                Ok(()) => purged += 1,
                Err(e) => {
                    warn!(
                        job_id = %entry.job_id,
                        error = %e,
                        "Deferred deletion failed, entry kept for retry"
                    );
                    failures += 1;
                }
            }
        }

        info!(purged, failures, "Deletion cycle completed");
        Ok(())
    }
}
