// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Cooperative stop protocol.
//!
//! Processing runs on workers the service cannot reach directly, so a stop
//! is a request rather than a command: the service drops a stop marker into
//! the job directory and the orchestrator's sensors fail the run the next
//! time they poke. Tasks already on a worker run to completion; only their
//! successors are cut off.

use std::time::Instant;

use tracing::{debug, info};

use tellus_api::JobStatus;

use crate::config::ServiceTiming;
use crate::error::{JobError, Result};
use crate::orchestrator::{unit_id, units_for, OrchestratorClient};
use crate::store::JobRecord;
use crate::workspace::JobWorkspace;

/// Write the stop marker and wait until no execution unit of the job
/// reports `running` anymore.
///
/// The wait is sleep-first: the orchestrator needs at least one sensor poke
/// to observe the marker, so polling immediately would only burn a request.
/// With `timing.stop_timeout` unset the wait is unbounded; confirmation at
/// the deadline still wins because the poll runs before the deadline check.
pub(crate) async fn halt(
    engine: &dyn OrchestratorClient,
    workspace: &dyn JobWorkspace,
    record: &JobRecord,
    timing: &ServiceTiming,
) -> Result<()> {
    workspace.write_stop_marker(&record.user_id, &record.id).await?;
    info!(job_id = %record.id, "stop marker written, waiting for units to halt");

    let units: Vec<String> = units_for(record)
        .into_iter()
        .map(|kind| unit_id(&record.id, kind))
        .collect();
    let started = Instant::now();

    loop {
        tokio::time::sleep(timing.stop_poll).await;

        let mut still_running = false;
        for unit in &units {
            let observation = engine.unit_state(unit).await?;
            if observation.status == Some(JobStatus::Running) {
                debug!(job_id = %record.id, unit_id = %unit, "unit still running");
                still_running = true;
                break;
            }
        }

        if !still_running {
            info!(job_id = %record.id, "all units halted");
            return Ok(());
        }

        if let Some(deadline) = timing.stop_timeout {
            let waited = started.elapsed();
            if waited >= deadline {
                return Err(JobError::DeadlineExceeded {
                    operation: "stop".to_string(),
                    waited_secs: waited.as_secs(),
                });
            }
        }
    }
}
