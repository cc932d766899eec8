// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Boundary to the external DAG orchestrator.
//!
//! Each job maps to a fixed set of execution units the orchestrator knows by
//! id: a preparation unit that always runs, and an optional parallelised unit
//! chained behind it. The service never talks to the engine in any other
//! vocabulary than these unit ids; the naming scheme lives here so it exists
//! in exactly one place.
//!
//! [`OrchestratorClient`] is the consumed trait; [`http::HttpOrchestrator`]
//! implements it over the engine's REST API.

pub mod http;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tellus_api::JobStatus;

use crate::error::Result;
use crate::store::JobRecord;

/// The execution units a job decomposes into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitKind {
    /// Always present; prepares inputs and runs the graph end to end.
    Preparation,
    /// Optional; fans the sensor-level work out, chained by the engine
    /// behind the preparation unit.
    Parallel,
}

impl UnitKind {
    /// Every unit kind, in dispatch order.
    pub const ALL: [UnitKind; 2] = [UnitKind::Preparation, UnitKind::Parallel];

    /// The id suffix the orchestrator knows this unit by.
    pub fn suffix(self) -> &'static str {
        match self {
            UnitKind::Preparation => "prep",
            UnitKind::Parallel => "parallel",
        }
    }
}

/// Orchestrator-side id of one unit of a job.
pub fn unit_id(job_id: &str, kind: UnitKind) -> String {
    format!("{}_{}", job_id, kind.suffix())
}

/// The units this job dispatches: preparation always, parallel when the
/// record asks for it.
pub fn units_for(record: &JobRecord) -> Vec<UnitKind> {
    if record.parallel_sensor {
        vec![UnitKind::Preparation, UnitKind::Parallel]
    } else {
        vec![UnitKind::Preparation]
    }
}

/// Unit ids of every kind, regardless of the record's flags.
///
/// Cleanup paths use this: a job may have been re-dispatched with different
/// flags, so deletion must cover units an earlier run registered.
pub fn all_unit_ids(job_id: &str) -> Vec<String> {
    UnitKind::ALL.iter().map(|kind| unit_id(job_id, *kind)).collect()
}

/// What the orchestrator reports about one unit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UnitObservation {
    /// Lifecycle state mapped from the engine's run state; `None` when the
    /// unit is unknown or has never run.
    pub status: Option<JobStatus>,
    /// Start time of the latest run, when the engine reports one.
    pub last_run_at: Option<DateTime<Utc>>,
}

impl UnitObservation {
    /// An observation of a unit the engine knows nothing about.
    pub fn empty() -> Self {
        UnitObservation::default()
    }

    /// An observation carrying a state and optionally a run time.
    pub fn observed(status: JobStatus, last_run_at: Option<DateTime<Utc>>) -> Self {
        UnitObservation { status: Some(status), last_run_at }
    }
}

/// Client half of the orchestrator boundary.
///
/// Implementations must make `delete_unit` and `set_unit_paused` idempotent;
/// the cleanup paths call them without checking whether the unit exists.
#[async_trait]
pub trait OrchestratorClient: Send + Sync {
    /// Latest observed state of one unit. Unknown units yield
    /// [`UnitObservation::empty`], not an error.
    async fn unit_state(&self, unit_id: &str) -> Result<UnitObservation>;

    /// Ask the engine to start the unit. `Ok(false)` means the engine
    /// refused the trigger (unit not registered yet, engine draining).
    async fn trigger_unit(&self, unit_id: &str) -> Result<bool>;

    /// Remove the unit and its run history from the engine. Idempotent.
    async fn delete_unit(&self, unit_id: &str) -> Result<()>;

    /// Pause or unpause the unit's scheduling.
    async fn set_unit_paused(&self, unit_id: &str, paused: bool) -> Result<()>;
}
