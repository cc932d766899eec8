// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Dispatch: turn a job into run descriptions and hand it to the engine.
//!
//! The engine never sees the jobs database. Everything a unit needs at
//! execution time is embedded into its [`RunDescription`] and dropped into
//! the shared descriptions directory; afterwards only the preparation unit is
//! triggered (the parallel unit is chained by the engine itself).

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tellus_api::ProcessGraph;
use tracing::{debug, info, instrument};

use crate::catalog::CollectionCatalog;
use crate::error::{JobError, Result};
use crate::graphs::ProcessGraphStore;
use crate::orchestrator::{self, OrchestratorClient, UnitKind};
use crate::store::JobRecord;
use crate::workspace::{JobDirs, JobWorkspace};

/// Self-contained execution description for one unit, as the engine reads it
/// from the drop directory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDescription {
    /// Job this unit belongs to.
    pub job_id: String,
    /// Owning user.
    pub user_id: String,
    /// Unit suffix (`prep` or `parallel`).
    pub unit: String,
    /// Absolute path of the job working area.
    pub job_dir: String,
    /// Absolute path of the result directory.
    pub result_dir: String,
    /// Keep only intermediate (virtual) artifacts.
    pub vrt_only: bool,
    /// Whether the parallel unit is attached.
    pub parallel_sensor: bool,
    /// The graph to execute.
    pub process_graph: ProcessGraph,
    /// Predefined backend process definitions, embedded verbatim.
    pub process_defs: serde_json::Value,
    /// Resolved input files per `load_collection` node.
    pub in_filepaths: BTreeMap<String, Vec<String>>,
    /// Interval at which the unit's monitoring polls the stop marker. Must
    /// not be shorter than the service's own stop-confirmation poll.
    pub stop_poll_secs: u64,
}

impl RunDescription {
    fn new(
        record: &JobRecord,
        kind: UnitKind,
        dirs: &JobDirs,
        graph: &ProcessGraph,
        process_defs: &serde_json::Value,
        in_filepaths: &BTreeMap<String, Vec<String>>,
        stop_poll: Duration,
    ) -> Self {
        RunDescription {
            job_id: record.id.clone(),
            user_id: record.user_id.clone(),
            unit: kind.suffix().to_string(),
            job_dir: dirs.job.to_string_lossy().into_owned(),
            result_dir: dirs.result.to_string_lossy().into_owned(),
            vrt_only: record.vrt_only,
            parallel_sensor: record.parallel_sensor,
            process_graph: graph.clone(),
            process_defs: process_defs.clone(),
            in_filepaths: in_filepaths.clone(),
            stop_poll_secs: stop_poll.as_secs(),
        }
    }
}

/// Resolve the input files of every `load_collection` node.
///
/// Catalog failures short-circuit verbatim; a malformed node aborts before
/// any lookup for it is made.
pub(crate) async fn resolve_inputs(
    catalog: &dyn CollectionCatalog,
    graph: &ProcessGraph,
) -> Result<BTreeMap<String, Vec<String>>> {
    let mut inputs = BTreeMap::new();
    for load in graph.data_loads()? {
        let paths = catalog
            .resolve_paths(&load.collection_id, load.spatial_extent, &load.temporal_interval)
            .await?;
        debug!(node = %load.node, files = paths.len(), "Resolved input files");
        inputs.insert(load.node, paths);
    }
    Ok(inputs)
}

/// Publish run descriptions for every unit of the job and trigger the
/// preparation unit.
#[instrument(skip_all, fields(job_id = %record.id, user_id = %record.user_id))]
pub(crate) async fn submit(
    record: &JobRecord,
    workspace: &dyn JobWorkspace,
    graphs: &dyn ProcessGraphStore,
    catalog: &dyn CollectionCatalog,
    engine: &dyn OrchestratorClient,
    stop_poll: Duration,
) -> Result<()> {
    let dirs = workspace.ensure_result_dir(&record.user_id, &record.id).await?;
    // A marker left behind by an earlier cancel would kill the new run on
    // its first poke.
    workspace.clear_stop_marker(&record.user_id, &record.id).await?;

    let payload = graphs.get_user_defined(&record.user_id, &record.process_graph_id).await?;
    let process_defs = graphs.list_predefined().await?;
    let in_filepaths = resolve_inputs(catalog, &payload.process_graph).await?;

    for kind in orchestrator::units_for(record) {
        let unit_id = orchestrator::unit_id(&record.id, kind);
        let description = RunDescription::new(
            record,
            kind,
            &dirs,
            &payload.process_graph,
            &process_defs,
            &in_filepaths,
            stop_poll,
        );
        workspace.publish_run_description(&unit_id, &description).await?;
    }

    let prep = orchestrator::unit_id(&record.id, UnitKind::Preparation);
    if !engine.trigger_unit(&prep).await? {
        return Err(JobError::TriggerRejected { job_id: record.id.clone() });
    }

    info!("Dispatched job to the orchestrator");
    Ok(())
}
