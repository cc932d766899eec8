// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Common test infrastructure for tellus-jobs service tests.
//!
//! Provides in-memory fakes for every collaborator plus a TestContext that
//! wires them into a JobService over a temp-dir workspace.

#![allow(dead_code)]

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::json;
use tempfile::TempDir;

use tellus_api::{
    JobStatus, JobSubmission, ProcessGraph, ProcessPayload, SpatialExtent, TemporalInterval,
};
use tellus_jobs::catalog::CollectionCatalog;
use tellus_jobs::config::ServiceTiming;
use tellus_jobs::error::{JobError, Result};
use tellus_jobs::graphs::ProcessGraphStore;
use tellus_jobs::orchestrator::{all_unit_ids, OrchestratorClient, UnitObservation};
use tellus_jobs::service::JobService;
use tellus_jobs::store::{JobPatch, JobRecord, JobStore, PendingDeletion};
use tellus_jobs::workspace::fs::FsWorkspace;

// ============================================================================
// Test Context
// ============================================================================

/// A JobService over in-memory fakes and a temp-dir workspace.
pub struct TestContext {
    pub service: Arc<JobService>,
    pub store: Arc<MockJobStore>,
    pub engine: Arc<MockOrchestrator>,
    pub graphs: Arc<MockGraphStore>,
    pub catalog: Arc<MockCatalog>,
    pub workspace: Arc<FsWorkspace>,
    pub data_dir: PathBuf,
    pub descriptions_dir: PathBuf,
    _temp_dir: TempDir,
}

impl TestContext {
    /// Context with millisecond poll intervals so stop and sync waits finish
    /// quickly.
    pub fn new() -> Self {
        Self::with_timing(fast_timing())
    }

    /// Context with explicit timing.
    pub fn with_timing(timing: ServiceTiming) -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let data_dir = temp_dir.path().to_path_buf();
        let descriptions_dir = temp_dir.path().join("descriptions");
        let workspace = Arc::new(FsWorkspace::new(data_dir.clone(), descriptions_dir.clone()));
        let store = Arc::new(MockJobStore::new());
        let engine = Arc::new(MockOrchestrator::new());
        let graphs = Arc::new(MockGraphStore::new());
        let catalog = Arc::new(MockCatalog::new());
        let service = Arc::new(JobService::new(
            store.clone(),
            engine.clone(),
            workspace.clone(),
            catalog.clone(),
            graphs.clone(),
            timing,
            "https://tellus.example.com/v1",
        ));
        Self {
            service,
            store,
            engine,
            graphs,
            catalog,
            workspace,
            data_dir,
            descriptions_dir,
            _temp_dir: temp_dir,
        }
    }

    /// Drop a result file into the job's result directory.
    pub async fn write_result_file(&self, user_id: &str, job_id: &str, name: &str) {
        let dir = self.data_dir.join(user_id).join("jobs").join(job_id).join("result");
        tokio::fs::create_dir_all(&dir).await.expect("result dir");
        tokio::fs::write(dir.join(name), b"raster bytes").await.expect("result file");
    }

    /// Drop a scratch (non-result) file into the job directory.
    pub async fn write_scratch_file(&self, user_id: &str, job_id: &str, name: &str) {
        let dir = self.data_dir.join(user_id).join("jobs").join(job_id);
        tokio::fs::create_dir_all(&dir).await.expect("job dir");
        tokio::fs::write(dir.join(name), b"scratch").await.expect("scratch file");
    }

    /// Whether the job directory still exists on disk.
    pub fn job_dir_exists(&self, user_id: &str, job_id: &str) -> bool {
        self.data_dir.join(user_id).join("jobs").join(job_id).exists()
    }
}

/// Wait until a job reaches `queued`, as `process_sync` leaves it while
/// polling.
async fn wait_for_dispatch(store: &MockJobStore) -> String {
    loop {
        let queued = store
            .job_ids()
            .into_iter()
            .find(|job_id| store.record(job_id).status == JobStatus::Queued);
        if let Some(job_id) = queued {
            return job_id;
        }
        tokio::time::sleep(Duration::from_millis(2)).await;
    }
}

/// Play the engine for a synchronous run: once the job is dispatched, drop
/// the given files into its result dir and report the preparation unit
/// finished. Returns the job id.
///
/// Runs as a task because `process_sync` creates the job itself; the id is
/// only observable while it polls.
pub fn finish_first_job(
    ctx: &TestContext,
    files: &'static [&'static str],
) -> tokio::task::JoinHandle<String> {
    let store = ctx.store.clone();
    let engine = ctx.engine.clone();
    let data_dir = ctx.data_dir.clone();
    tokio::spawn(async move {
        let job_id = wait_for_dispatch(&store).await;
        let record = store.record(&job_id);
        let result_dir = data_dir.join(&record.user_id).join("jobs").join(&job_id).join("result");
        tokio::fs::create_dir_all(&result_dir).await.expect("result dir");
        for name in files {
            tokio::fs::write(result_dir.join(name), b"raster bytes").await.expect("result file");
        }
        engine.set_state(
            &format!("{job_id}_prep"),
            UnitObservation::observed(JobStatus::Finished, Some(Utc::now())),
        );
        job_id
    })
}

/// Play the engine failing a synchronous run: once the job is dispatched,
/// report the preparation unit as errored. Returns the job id.
pub fn fail_first_job(ctx: &TestContext) -> tokio::task::JoinHandle<String> {
    let store = ctx.store.clone();
    let engine = ctx.engine.clone();
    tokio::spawn(async move {
        let job_id = wait_for_dispatch(&store).await;
        engine.set_state(
            &format!("{job_id}_prep"),
            UnitObservation::observed(JobStatus::Error, Some(Utc::now())),
        );
        job_id
    })
}

/// Millisecond intervals with deadlines, for tests.
pub fn fast_timing() -> ServiceTiming {
    ServiceTiming {
        stop_poll: Duration::from_millis(5),
        stop_timeout: Some(Duration::from_millis(500)),
        sync_poll: Duration::from_millis(5),
        sync_timeout: Some(Duration::from_millis(1000)),
        purge_delay: Duration::from_millis(10),
    }
}

/// The NDVI example graph: one `load_collection` node plus a reduction.
pub fn ndvi_graph() -> ProcessGraph {
    serde_json::from_value(json!({
        "loadco1": {
            "process_id": "load_collection",
            "arguments": {
                "id": "s2a_prd_msil1c",
                "spatial_extent": {"south": 46.46, "east": 11.96, "north": 46.76, "west": 11.36},
                "temporal_extent": ["2018-06-04", "2018-06-23"]
            }
        },
        "ndvi1": {
            "process_id": "ndvi",
            "arguments": {"data": {"from_node": "loadco1"}},
            "result": true
        }
    }))
    .expect("ndvi graph")
}

/// A process payload without a client-chosen id.
pub fn ndvi_payload() -> ProcessPayload {
    ProcessPayload { id: None, process_graph: ndvi_graph() }
}

/// A submission carrying the NDVI payload.
pub fn submission() -> JobSubmission {
    JobSubmission {
        title: Some("NDVI composite".to_string()),
        process: Some(ndvi_payload()),
        ..JobSubmission::default()
    }
}

// ============================================================================
// Mock Job Store
// ============================================================================

/// In-memory job store with the same guard semantics as the PostgreSQL
/// implementation.
#[derive(Default)]
pub struct MockJobStore {
    jobs: Mutex<HashMap<String, JobRecord>>,
    queue: Mutex<HashMap<String, PendingDeletion>>,
    cas_rejections: Mutex<u32>,
}

impl MockJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` guarded writes report a version clash, as a
    /// concurrent writer would cause.
    pub fn reject_next_cas(&self, count: u32) {
        *self.cas_rejections.lock().unwrap() = count;
    }

    fn cas_rejected(&self) -> bool {
        let mut rejections = self.cas_rejections.lock().unwrap();
        if *rejections > 0 {
            *rejections -= 1;
            true
        } else {
            false
        }
    }

    /// Direct record access for assertions. Panics when the job is gone.
    pub fn record(&self, job_id: &str) -> JobRecord {
        self.jobs.lock().unwrap().get(job_id).cloned().expect("job record")
    }

    /// The deferred-deletion entry of a job, when one exists.
    pub fn pending_deletion(&self, job_id: &str) -> Option<PendingDeletion> {
        self.queue.lock().unwrap().get(job_id).cloned()
    }

    pub fn job_count(&self) -> usize {
        self.jobs.lock().unwrap().len()
    }

    pub fn job_ids(&self) -> Vec<String> {
        self.jobs.lock().unwrap().keys().cloned().collect()
    }
}

#[async_trait]
impl JobStore for MockJobStore {
    async fn insert_job(&self, record: &JobRecord) -> Result<()> {
        self.jobs.lock().unwrap().insert(record.id.clone(), record.clone());
        Ok(())
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        Ok(self.jobs.lock().unwrap().get(job_id).cloned())
    }

    async fn list_jobs(&self, user_id: &str) -> Result<Vec<JobRecord>> {
        let mut records: Vec<JobRecord> = self
            .jobs
            .lock()
            .unwrap()
            .values()
            .filter(|record| record.user_id == user_id)
            .cloned()
            .collect();
        records.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Ok(records)
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<()> {
        let mut jobs = self.jobs.lock().unwrap();
        let record = jobs
            .get_mut(job_id)
            .ok_or_else(|| JobError::JobNotFound { job_id: job_id.to_string() })?;
        record.status = status;
        record.status_updated_at = Utc::now();
        if let Some(detail) = error_detail {
            record.error = Some(detail.to_string());
        }
        Ok(())
    }

    async fn update_metadata(
        &self,
        job_id: &str,
        expected_version: i64,
        patch: &JobPatch,
    ) -> Result<bool> {
        if self.cas_rejected() {
            return Ok(false);
        }
        let mut jobs = self.jobs.lock().unwrap();
        let Some(record) = jobs.get_mut(job_id) else { return Ok(false) };
        if record.lock_version != expected_version || record.status.is_active() {
            return Ok(false);
        }
        if let Some(title) = &patch.title {
            record.title = Some(title.clone());
        }
        if let Some(description) = &patch.description {
            record.description = Some(description.clone());
        }
        if let Some(plan) = &patch.plan {
            record.plan = Some(plan.clone());
        }
        if let Some(budget_cents) = patch.budget_cents {
            record.budget_cents = Some(budget_cents);
        }
        if let Some(graph_id) = &patch.process_graph_id {
            record.process_graph_id = graph_id.clone();
        }
        record.lock_version += 1;
        Ok(true)
    }

    async fn claim_for_dispatch(&self, job_id: &str, expected_version: i64) -> Result<bool> {
        if self.cas_rejected() {
            return Ok(false);
        }
        let mut jobs = self.jobs.lock().unwrap();
        let Some(record) = jobs.get_mut(job_id) else { return Ok(false) };
        if record.lock_version != expected_version || record.status.is_active() {
            return Ok(false);
        }
        record.lock_version += 1;
        Ok(true)
    }

    async fn delete_job(&self, job_id: &str) -> Result<()> {
        self.jobs.lock().unwrap().remove(job_id);
        Ok(())
    }

    async fn schedule_deletion(
        &self,
        job_id: &str,
        user_id: &str,
        purge_at: DateTime<Utc>,
    ) -> Result<()> {
        self.queue.lock().unwrap().insert(
            job_id.to_string(),
            PendingDeletion {
                job_id: job_id.to_string(),
                user_id: user_id.to_string(),
                purge_at,
                created_at: Utc::now(),
            },
        );
        Ok(())
    }

    async fn due_deletions(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<PendingDeletion>> {
        let mut due: Vec<PendingDeletion> = self
            .queue
            .lock()
            .unwrap()
            .values()
            .filter(|entry| entry.purge_at <= now)
            .cloned()
            .collect();
        due.sort_by(|a, b| a.purge_at.cmp(&b.purge_at));
        due.truncate(limit as usize);
        Ok(due)
    }

    async fn clear_deletion(&self, job_id: &str) -> Result<()> {
        self.queue.lock().unwrap().remove(job_id);
        Ok(())
    }
}

// ============================================================================
// Mock Orchestrator
// ============================================================================

/// Scriptable orchestrator: per-unit observation sequences plus recorded
/// calls.
pub struct MockOrchestrator {
    states: Mutex<HashMap<String, Vec<UnitObservation>>>,
    pub triggered: Mutex<Vec<String>>,
    pub deleted: Mutex<Vec<String>>,
    pub paused: Mutex<Vec<(String, bool)>>,
    trigger_ok: Mutex<bool>,
    failing_deletes: Mutex<u32>,
}

impl MockOrchestrator {
    pub fn new() -> Self {
        Self {
            states: Mutex::new(HashMap::new()),
            triggered: Mutex::new(Vec::new()),
            deleted: Mutex::new(Vec::new()),
            paused: Mutex::new(Vec::new()),
            trigger_ok: Mutex::new(true),
            failing_deletes: Mutex::new(0),
        }
    }

    /// Pin a unit to one stable observation.
    pub fn set_state(&self, unit_id: &str, observation: UnitObservation) {
        self.states.lock().unwrap().insert(unit_id.to_string(), vec![observation]);
    }

    /// Script a sequence of observations for a unit; the last one repeats.
    pub fn script_states(&self, unit_id: &str, observations: Vec<UnitObservation>) {
        self.states.lock().unwrap().insert(unit_id.to_string(), observations);
    }

    /// Make every unit of the job report the same state, as a fresh run.
    pub fn set_job_state(&self, job_id: &str, status: JobStatus) {
        for unit_id in all_unit_ids(job_id) {
            self.set_state(&unit_id, UnitObservation::observed(status, Some(Utc::now())));
        }
    }

    /// Refuse upcoming trigger calls.
    pub fn reject_triggers(&self) {
        *self.trigger_ok.lock().unwrap() = false;
    }

    /// Fail the next `count` delete calls.
    pub fn fail_deletes(&self, count: u32) {
        *self.failing_deletes.lock().unwrap() = count;
    }
}

#[async_trait]
impl OrchestratorClient for MockOrchestrator {
    async fn unit_state(&self, unit_id: &str) -> Result<UnitObservation> {
        let mut states = self.states.lock().unwrap();
        let Some(script) = states.get_mut(unit_id) else {
            return Ok(UnitObservation::empty());
        };
        if script.len() > 1 {
            Ok(script.remove(0))
        } else {
            Ok(script.first().cloned().unwrap_or_else(UnitObservation::empty))
        }
    }

    async fn trigger_unit(&self, unit_id: &str) -> Result<bool> {
        self.triggered.lock().unwrap().push(unit_id.to_string());
        Ok(*self.trigger_ok.lock().unwrap())
    }

    async fn delete_unit(&self, unit_id: &str) -> Result<()> {
        {
            let mut failing = self.failing_deletes.lock().unwrap();
            if *failing > 0 {
                *failing -= 1;
                return Err(JobError::Upstream {
                    service: "orchestrator".to_string(),
                    code: 502,
                    msg: "engine unavailable".to_string(),
                    internal: true,
                    links: Vec::new(),
                });
            }
        }
        self.deleted.lock().unwrap().push(unit_id.to_string());
        Ok(())
    }

    async fn set_unit_paused(&self, unit_id: &str, paused: bool) -> Result<()> {
        self.paused.lock().unwrap().push((unit_id.to_string(), paused));
        Ok(())
    }
}

// ============================================================================
// Mock Process-Graph Store
// ============================================================================

/// In-memory process-graph store.
pub struct MockGraphStore {
    graphs: Mutex<HashMap<(String, String), ProcessPayload>>,
    predefined: serde_json::Value,
}

impl MockGraphStore {
    pub fn new() -> Self {
        Self {
            graphs: Mutex::new(HashMap::new()),
            predefined: json!({"processes": [{"id": "load_collection"}, {"id": "ndvi"}]}),
        }
    }

    /// The stored payload of one graph, when it exists.
    pub fn stored(&self, user_id: &str, graph_id: &str) -> Option<ProcessPayload> {
        self.graphs.lock().unwrap().get(&(user_id.to_string(), graph_id.to_string())).cloned()
    }

    pub fn graph_count(&self) -> usize {
        self.graphs.lock().unwrap().len()
    }
}

#[async_trait]
impl ProcessGraphStore for MockGraphStore {
    async fn get_user_defined(&self, user_id: &str, graph_id: &str) -> Result<ProcessPayload> {
        self.graphs
            .lock()
            .unwrap()
            .get(&(user_id.to_string(), graph_id.to_string()))
            .cloned()
            .ok_or_else(|| JobError::Upstream {
                service: "processes".to_string(),
                code: 404,
                msg: format!("process graph '{graph_id}' does not exist"),
                internal: false,
                links: Vec::new(),
            })
    }

    async fn put_user_defined(
        &self,
        user_id: &str,
        graph_id: &str,
        payload: &ProcessPayload,
    ) -> Result<()> {
        self.graphs
            .lock()
            .unwrap()
            .insert((user_id.to_string(), graph_id.to_string()), payload.clone());
        Ok(())
    }

    async fn list_predefined(&self) -> Result<serde_json::Value> {
        Ok(self.predefined.clone())
    }
}

// ============================================================================
// Mock Collection Catalog
// ============================================================================

/// Catalog answering with configured paths per collection.
pub struct MockCatalog {
    paths: Mutex<HashMap<String, Vec<String>>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        let catalog = Self { paths: Mutex::new(HashMap::new()) };
        catalog.put(
            "s2a_prd_msil1c",
            vec![
                "/rasters/s2a/2018/06/04/tile1.tif".to_string(),
                "/rasters/s2a/2018/06/23/tile2.tif".to_string(),
            ],
        );
        catalog
    }

    /// Configure the paths a collection resolves to.
    pub fn put(&self, collection_id: &str, paths: Vec<String>) {
        self.paths.lock().unwrap().insert(collection_id.to_string(), paths);
    }
}

#[async_trait]
impl CollectionCatalog for MockCatalog {
    async fn resolve_paths(
        &self,
        collection_id: &str,
        _extent: SpatialExtent,
        _interval: &TemporalInterval,
    ) -> Result<Vec<String>> {
        Ok(self.paths.lock().unwrap().get(collection_id).cloned().unwrap_or_default())
    }
}
