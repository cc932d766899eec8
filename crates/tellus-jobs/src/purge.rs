// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Full removal of one job, shared by immediate deletes and the
//! deferred-deletion worker.
//!
//! Ordering matters: workspace data first, then the published run
//! descriptions, then the orchestrator units, then the row, and the queue
//! entry last. An interrupted purge therefore always leaves an entry behind
//! that re-runs the remaining steps; every step is idempotent.

use tracing::info;

use crate::error::Result;
use crate::orchestrator::{self, OrchestratorClient};
use crate::store::JobStore;
use crate::workspace::JobWorkspace;

/// Remove the job's workspace data, run descriptions, orchestrator units,
/// row and deferred-deletion entry.
///
/// Units of both kinds are removed regardless of the record's flags; an
/// earlier dispatch may have registered units a later modify dropped.
pub(crate) async fn purge_job(
    store: &dyn JobStore,
    workspace: &dyn JobWorkspace,
    engine: &dyn OrchestratorClient,
    user_id: &str,
    job_id: &str,
) -> Result<()> {
    workspace.discard_all(user_id, job_id).await?;
    let unit_ids = orchestrator::all_unit_ids(job_id);
    workspace.retract_run_descriptions(&unit_ids).await?;
    for unit_id in &unit_ids {
        engine.delete_unit(unit_id).await?;
    }
    store.delete_job(job_id).await?;
    store.clear_deletion(job_id).await?;
    info!(job_id, "job purged");
    Ok(())
}
