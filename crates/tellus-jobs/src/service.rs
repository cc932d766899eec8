// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job lifecycle operations.
//!
//! [`JobService`] is the single entry point of this crate: the gateway maps
//! each REST route onto one method here and turns the returned
//! [`JobError`] into a response envelope. All collaborators are injected as
//! trait objects, so every operation can be exercised against in-memory
//! fakes.
//!
//! Status handling follows one rule throughout: a job's stored status is a
//! cache of what the orchestrator last reported, so every operation
//! re-reads the record and reconciles it against the engine before acting
//! on it.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tracing::{info, instrument};

use tellus_api::{
    CostEstimate, JobDetails, JobResultsDoc, JobStatus, JobSubmission, JobSummary, ResultAsset,
};

use crate::catalog::CollectionCatalog;
use crate::config::ServiceTiming;
use crate::dispatch;
use crate::error::{JobError, Result};
use crate::graphs::{self, ProcessGraphStore};
use crate::orchestrator::{self, OrchestratorClient, UnitKind};
use crate::purge;
use crate::reconcile;
use crate::stop;
use crate::store::{JobPatch, JobRecord, JobStore};
use crate::sync::{OutputFormat, SyncOutcome};
use crate::workspace::JobWorkspace;

/// The jobs service.
pub struct JobService {
    store: Arc<dyn JobStore>,
    engine: Arc<dyn OrchestratorClient>,
    workspace: Arc<dyn JobWorkspace>,
    catalog: Arc<dyn CollectionCatalog>,
    graphs: Arc<dyn ProcessGraphStore>,
    timing: ServiceTiming,
    public_url: String,
}

impl JobService {
    /// Build a service over the given collaborators.
    ///
    /// `public_url` is the externally reachable base under which result
    /// files are served; download links are built as
    /// `{public_url}/downloads/{path}`.
    pub fn new(
        store: Arc<dyn JobStore>,
        engine: Arc<dyn OrchestratorClient>,
        workspace: Arc<dyn JobWorkspace>,
        catalog: Arc<dyn CollectionCatalog>,
        graphs: Arc<dyn ProcessGraphStore>,
        timing: ServiceTiming,
        public_url: impl Into<String>,
    ) -> Self {
        JobService {
            store,
            engine,
            workspace,
            catalog,
            graphs,
            timing,
            public_url: public_url.into(),
        }
    }

    // ========================================================================
    // Operations
    // ========================================================================

    /// Store a new job in status `created`.
    ///
    /// The process payload is stored first, under the client-chosen graph id
    /// or a generated one; the record then references it by id.
    #[instrument(skip(self, submission), fields(user_id = %user_id))]
    pub async fn create(&self, user_id: &str, submission: JobSubmission) -> Result<JobRecord> {
        let process = submission.process.clone().ok_or_else(|| JobError::InvalidProcess {
            details: "a process payload is required".to_string(),
        })?;
        let graph_id = process.id.clone().unwrap_or_else(graphs::new_graph_id);
        self.graphs.put_user_defined(user_id, &graph_id, &process).await?;

        let record = JobRecord::new(user_id, graph_id, &submission);
        self.store.insert_job(&record).await?;
        info!(job_id = %record.id, "job created");
        Ok(record)
    }

    /// Full view of one job, status reconciled against the orchestrator.
    #[instrument(skip(self))]
    pub async fn get(&self, user_id: &str, job_id: &str) -> Result<JobDetails> {
        let record = self.authorize(user_id, job_id).await?;
        let record = self.refresh(record).await?;
        let process = self.graphs.get_user_defined(user_id, &record.process_graph_id).await?;
        Ok(JobDetails { summary: record.to_summary(), process })
    }

    /// All jobs of one user, oldest first, each status reconciled.
    #[instrument(skip(self))]
    pub async fn get_all(&self, user_id: &str) -> Result<Vec<JobSummary>> {
        let records = self.store.list_jobs(user_id).await?;
        let mut summaries = Vec::with_capacity(records.len());
        for record in records {
            let record = self.refresh(record).await?;
            summaries.push(record.to_summary());
        }
        Ok(summaries)
    }

    /// Patch a job's metadata and, optionally, its process.
    ///
    /// Active jobs are locked. A replaced process is stored under a fresh
    /// graph id; runs already dispatched keep the graph they were built
    /// from. The write is guarded by the record's lock version, so a
    /// concurrent mutation yields [`JobError::Conflict`].
    #[instrument(skip(self, submission), fields(user_id = %user_id, job_id = %job_id))]
    pub async fn modify(
        &self,
        user_id: &str,
        job_id: &str,
        submission: JobSubmission,
    ) -> Result<()> {
        let record = self.authorize(user_id, job_id).await?;
        let record = self.refresh(record).await?;
        if record.status.is_active() {
            return Err(JobError::Locked { job_id: record.id, status: record.status });
        }

        let mut patch = JobPatch::from_submission(&submission);
        if let Some(process) = submission.process {
            let graph_id = graphs::new_graph_id();
            self.graphs.put_user_defined(user_id, &graph_id, &process).await?;
            patch.process_graph_id = Some(graph_id);
        }
        if patch.is_empty() {
            return Ok(());
        }

        let updated = self.store.update_metadata(&record.id, record.lock_version, &patch).await?;
        if !updated {
            return Err(JobError::Conflict { job_id: record.id });
        }
        info!(job_id = %record.id, "job metadata updated");
        Ok(())
    }

    /// Delete a job, either immediately or via the deferred-deletion queue.
    ///
    /// An active job is halted first. With `delayed` the job is only
    /// enqueued; row, workspace and orchestrator units survive until the
    /// deletion worker picks the entry up, so result files stay
    /// downloadable for the grace period.
    #[instrument(skip(self))]
    pub async fn delete(&self, user_id: &str, job_id: &str, delayed: bool) -> Result<()> {
        let record = self.authorize(user_id, job_id).await?;
        let record = self.refresh(record).await?;
        if record.status.is_active() {
            stop::halt(self.engine.as_ref(), self.workspace.as_ref(), &record, &self.timing)
                .await?;
        }

        if delayed {
            let purge_at =
                Utc::now() + chrono::Duration::seconds(self.timing.purge_delay.as_secs() as i64);
            self.store.schedule_deletion(&record.id, &record.user_id, purge_at).await?;
            info!(job_id = %record.id, %purge_at, "job queued for deferred deletion");
            return Ok(());
        }

        purge::purge_job(
            self.store.as_ref(),
            self.workspace.as_ref(),
            self.engine.as_ref(),
            &record.user_id,
            &record.id,
        )
        .await
    }

    /// Hand the job to the orchestrator for batch execution.
    ///
    /// The record is claimed through the optimistic guard before anything
    /// is published, so two concurrent `process` calls cannot both trigger.
    #[instrument(skip(self))]
    pub async fn process(&self, user_id: &str, job_id: &str) -> Result<()> {
        let record = self.authorize(user_id, job_id).await?;
        let record = self.refresh(record).await?;
        if record.status.is_active() {
            return Err(JobError::ProcessingActive { job_id: record.id, status: record.status });
        }

        let claimed = self.store.claim_for_dispatch(&record.id, record.lock_version).await?;
        if !claimed {
            return Err(JobError::Conflict { job_id: record.id });
        }

        dispatch::submit(
            &record,
            self.workspace.as_ref(),
            self.graphs.as_ref(),
            self.catalog.as_ref(),
            self.engine.as_ref(),
            self.timing.stop_poll,
        )
        .await?;

        self.store.update_status(&record.id, JobStatus::Queued, None).await?;
        info!(job_id = %record.id, "job dispatched");
        Ok(())
    }

    /// Run a job to completion inside one request and hand back the first
    /// result file.
    ///
    /// The job is created with both execution flags forced off, processed,
    /// polled until it settles and finally queued for deferred deletion so
    /// the caller has time to download the file.
    #[instrument(skip(self, submission), fields(user_id = %user_id))]
    pub async fn process_sync(
        &self,
        user_id: &str,
        mut submission: JobSubmission,
    ) -> Result<SyncOutcome> {
        submission.vrt_only = false;
        submission.parallel_sensor = false;

        let created = self.create(user_id, submission).await?;
        let job_id = created.id;
        self.process(user_id, &job_id).await?;

        let started = Instant::now();
        let mut record = self.refreshed(&job_id).await?;
        while record.status.is_active() {
            if let Some(deadline) = self.timing.sync_timeout {
                let waited = started.elapsed();
                if waited >= deadline {
                    return Err(JobError::DeadlineExceeded {
                        operation: "sync".to_string(),
                        waited_secs: waited.as_secs(),
                    });
                }
            }
            tokio::time::sleep(self.timing.sync_poll).await;
            record = self.refreshed(&job_id).await?;
        }

        if matches!(record.status, JobStatus::Error | JobStatus::Canceled) {
            let detail = record
                .error
                .clone()
                .unwrap_or_else(|| format!("Job {} has status: {}.", record.id, record.status));
            return Err(JobError::ExecutionFailed { job_id: record.id, detail });
        }

        // Hide the one-shot run from the orchestrator's default unit view.
        let prep = orchestrator::unit_id(&record.id, UnitKind::Preparation);
        self.engine.set_unit_paused(&prep, true).await?;

        let outputs = self.workspace.list_outputs(&record.user_id, &record.id).await?;
        let Some(first) = outputs.into_iter().next() else {
            return Err(JobError::Storage {
                operation: "list_outputs".to_string(),
                details: format!("job {} produced no output files", record.id),
            });
        };
        let extension = first.name.rsplit('.').next().unwrap_or_default();
        let format = OutputFormat::from_extension(extension)?;

        self.delete(user_id, &record.id, true).await?;

        info!(job_id = %record.id, file = %first.path, "synchronous run finished");
        Ok(SyncOutcome { job_id: record.id, file: first.path, content_type: format.content_type() })
    }

    /// Stop an active job cooperatively.
    ///
    /// A noop on inactive jobs. The final status depends on what the stop
    /// left behind: `canceled` when the job was already running and partial
    /// results survive, `created` otherwise, so a job stopped while still
    /// queued can simply be triggered again.
    #[instrument(skip(self))]
    pub async fn cancel_processing(&self, user_id: &str, job_id: &str) -> Result<()> {
        let record = self.authorize(user_id, job_id).await?;
        let record = self.refresh(record).await?;
        if !record.status.is_active() {
            return Ok(());
        }
        let was_running = record.status == JobStatus::Running;

        stop::halt(self.engine.as_ref(), self.workspace.as_ref(), &record, &self.timing).await?;
        let results_exist = self.workspace.discard_scratch(&record.user_id, &record.id).await?;

        let final_status = if was_running && results_exist {
            JobStatus::Canceled
        } else {
            JobStatus::Created
        };
        self.store.update_status(&record.id, final_status, None).await?;
        info!(job_id = %record.id, status = %final_status, "processing canceled");
        Ok(())
    }

    /// Result document of a finished job.
    ///
    /// Failed jobs surface the failure detail stored at the transition into
    /// `error`; canceled and unfinished jobs get their own errors so the
    /// gateway can answer with the matching code.
    #[instrument(skip(self))]
    pub async fn get_results(&self, user_id: &str, job_id: &str) -> Result<JobResultsDoc> {
        let record = self.authorize(user_id, job_id).await?;
        let record = self.refresh(record).await?;

        match record.status {
            JobStatus::Error => {
                let detail = record
                    .error
                    .clone()
                    .unwrap_or_else(|| format!("Job {} failed.", record.id));
                Err(JobError::ExecutionFailed { job_id: record.id, detail })
            }
            JobStatus::Canceled => Err(JobError::WasCanceled { job_id: record.id }),
            JobStatus::Finished => {
                let outputs = self.workspace.list_outputs(&record.user_id, &record.id).await?;
                if outputs.is_empty() {
                    return Err(JobError::Storage {
                        operation: "list_outputs".to_string(),
                        details: format!("job {} has no output files", record.id),
                    });
                }
                let assets = outputs
                    .into_iter()
                    .map(|file| ResultAsset {
                        href: format!("{}/downloads/{}", self.public_url, file.path),
                        name: file.name,
                    })
                    .collect();
                Ok(JobResultsDoc {
                    id: record.id,
                    title: record.title,
                    status: record.status,
                    assets,
                    links: Vec::new(),
                })
            }
            status => Err(JobError::NotFinished { job_id: record.id, status }),
        }
    }

    /// Cost estimate for a job. Without a billing engine this is the free
    /// default.
    #[instrument(skip(self))]
    pub async fn estimate(&self, user_id: &str, job_id: &str) -> Result<CostEstimate> {
        self.authorize(user_id, job_id).await?;
        Ok(CostEstimate::default())
    }

    // ========================================================================
    // Internals
    // ========================================================================

    /// Fetch the record and check ownership. Every operation starts here.
    async fn authorize(&self, user_id: &str, job_id: &str) -> Result<JobRecord> {
        let record = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| JobError::JobNotFound { job_id: job_id.to_string() })?;
        if record.user_id != user_id {
            return Err(JobError::NotOwner {
                user_id: user_id.to_string(),
                job_id: job_id.to_string(),
            });
        }
        Ok(record)
    }

    /// Reconcile the record's status against the orchestrator.
    async fn refresh(&self, record: JobRecord) -> Result<JobRecord> {
        reconcile::refresh(self.store.as_ref(), self.engine.as_ref(), record).await
    }

    /// Re-fetch and reconcile; used after writes that invalidate the
    /// in-hand record.
    async fn refreshed(&self, job_id: &str) -> Result<JobRecord> {
        let record = self
            .store
            .get_job(job_id)
            .await?
            .ok_or_else(|| JobError::JobNotFound { job_id: job_id.to_string() })?;
        self.refresh(record).await
    }
}
