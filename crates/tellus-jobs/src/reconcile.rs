// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Status reconciliation: merge the engine's run observations into the
//! stored job status.
//!
//! The engine is the source of truth for execution progress, but not
//! unconditionally: a canceled or finished job stays put unless a unit shows
//! a run *newer* than the stored status change. Without that freshness rule
//! a cancel would be immediately overwritten, because the engine records the
//! killed run as failed.

use chrono::{DateTime, Utc};
use tellus_api::JobStatus;
use tracing::{debug, instrument};

use crate::error::{JobError, Result};
use crate::orchestrator::{self, OrchestratorClient, UnitObservation};
use crate::store::{JobRecord, JobStore};

/// A unit observation that is allowed to influence the stored status.
#[derive(Debug, Clone, PartialEq)]
struct Candidate {
    unit_id: String,
    status: JobStatus,
    last_run_at: Option<DateTime<Utc>>,
}

/// Decide whether a unit observation counts.
///
/// An observation with no status never counts. One with a status counts when
/// the stored status is still in flight (`created`, `queued`, `running`,
/// `error`), or when the observed run started after the stored status was
/// last written.
fn consider(record: &JobRecord, unit_id: String, observation: UnitObservation) -> Option<Candidate> {
    let status = observation.status?;
    let fresh = matches!(
        record.status,
        JobStatus::Created | JobStatus::Queued | JobStatus::Running | JobStatus::Error
    ) || observation.last_run_at.is_some_and(|at| at > record.status_updated_at);
    fresh.then(|| Candidate { unit_id, status, last_run_at: observation.last_run_at })
}

/// Pick the winning candidate: unanimous status short-circuits, otherwise
/// the latest run wins (a missing run time sorts lowest).
fn merge(candidates: &[Candidate]) -> Option<&Candidate> {
    let first = candidates.first()?;
    if candidates.iter().all(|candidate| candidate.status == first.status) {
        return Some(first);
    }
    candidates.iter().max_by_key(|candidate| candidate.last_run_at)
}

/// Reconcile one job against the engine and return the (possibly refreshed)
/// record.
///
/// When any candidate exists the store is updated even if the winning status
/// equals the stored one, so `status_updated_at` reflects the newest
/// evidence. A transition into `error` stores a detail naming the failing
/// unit; [`crate::service::JobService::get_results`] surfaces it.
#[instrument(skip_all, fields(job_id = %record.id))]
pub(crate) async fn refresh(
    store: &dyn JobStore,
    engine: &dyn OrchestratorClient,
    record: JobRecord,
) -> Result<JobRecord> {
    let mut candidates = Vec::new();
    for kind in orchestrator::units_for(&record) {
        let unit_id = orchestrator::unit_id(&record.id, kind);
        let observation = engine.unit_state(&unit_id).await?;
        if let Some(candidate) = consider(&record, unit_id, observation) {
            candidates.push(candidate);
        }
    }

    let Some(winner) = merge(&candidates) else {
        debug!(status = %record.status, "No fresher execution evidence");
        return Ok(record);
    };

    let error_detail = (winner.status == JobStatus::Error && record.status != JobStatus::Error)
        .then(|| format!("Execution of unit '{}' failed.", winner.unit_id));
    store.update_status(&record.id, winner.status, error_detail.as_deref()).await?;

    // Reload so the caller sees the stored timestamp and error detail.
    let refreshed = store
        .get_job(&record.id)
        .await?
        .ok_or(JobError::JobNotFound { job_id: record.id.clone() })?;
    debug!(status = %refreshed.status, "Job status reconciled");
    Ok(refreshed)
}
