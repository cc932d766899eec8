// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Persistence layer for jobs and the deferred-deletion queue.
//!
//! The [`JobStore`] trait is the only way job rows are read or written; the
//! service consumes it as `Arc<dyn JobStore>` so tests can substitute an
//! in-memory implementation. The Postgres implementation lives in
//! [`postgres`].
//!
//! Two invariants are enforced at this boundary:
//!
//! - `status` and `status_updated_at` only change together, in one UPDATE
//!   ([`JobStore::update_status`]);
//! - metadata writes and dispatch claims are guarded by an optimistic
//!   `lock_version` compare-and-swap, so two callers racing the same
//!   check-then-act window cannot both win.

pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tellus_api::{JobStatus, JobSubmission, JobSummary};

use crate::error::Result;

/// One row of the `jobs` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct JobRecord {
    /// Job identifier.
    pub id: String,
    /// Owning user.
    pub user_id: String,
    /// Identifier of the stored process graph this job executes.
    pub process_graph_id: String,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// When the status last changed.
    pub status_updated_at: DateTime<Utc>,
    /// Optimistic guard version, bumped by every guarded write.
    pub lock_version: i64,
    /// Optional title.
    pub title: Option<String>,
    /// Optional description.
    pub description: Option<String>,
    /// Optional billing plan name.
    pub plan: Option<String>,
    /// Maximum spend in euro cents.
    pub budget_cents: Option<i64>,
    /// Keep only intermediate (virtual) artifacts.
    pub vrt_only: bool,
    /// Attach the parallelised execution unit.
    pub parallel_sensor: bool,
    /// Failure detail, stored at the transition into `error`.
    pub error: Option<String>,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
}

impl JobRecord {
    /// Build a fresh record in status `created` from a submission.
    ///
    /// `process_graph_id` must already point at the stored graph.
    pub fn new(user_id: &str, process_graph_id: String, submission: &JobSubmission) -> Self {
        let now = Utc::now();
        JobRecord {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: user_id.to_string(),
            process_graph_id,
            status: JobStatus::Created,
            status_updated_at: now,
            lock_version: 0,
            title: submission.title.clone(),
            description: submission.description.clone(),
            plan: submission.plan.clone(),
            budget_cents: submission.budget.map(budget_to_cents),
            vrt_only: submission.vrt_only,
            parallel_sensor: submission.parallel_sensor,
            error: None,
            created_at: now,
        }
    }

    /// Budget in euros, converted back from the stored cents.
    pub fn budget_euros(&self) -> Option<f64> {
        self.budget_cents.map(|cents| cents as f64 / 100.0)
    }

    /// The list/detail view of this record.
    pub fn to_summary(&self) -> JobSummary {
        JobSummary {
            id: self.id.clone(),
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status,
            created_at: self.created_at,
            status_updated_at: self.status_updated_at,
            plan: self.plan.clone(),
            budget: self.budget_euros(),
        }
    }
}

/// Budgets are stored in euro cents to keep the column integral.
pub fn budget_to_cents(euros: f64) -> i64 {
    (euros * 100.0).round() as i64
}

/// Partial metadata update applied by `modify`. `None` keeps the stored
/// value.
#[derive(Debug, Clone, Default)]
pub struct JobPatch {
    /// New title.
    pub title: Option<String>,
    /// New description.
    pub description: Option<String>,
    /// New billing plan.
    pub plan: Option<String>,
    /// New budget in euro cents.
    pub budget_cents: Option<i64>,
    /// New process graph reference (set after the graph itself is stored).
    pub process_graph_id: Option<String>,
}

impl JobPatch {
    /// The metadata part of a submission. The process payload is handled
    /// separately because storing it yields the new graph id.
    pub fn from_submission(submission: &JobSubmission) -> Self {
        JobPatch {
            title: submission.title.clone(),
            description: submission.description.clone(),
            plan: submission.plan.clone(),
            budget_cents: submission.budget.map(budget_to_cents),
            process_graph_id: None,
        }
    }

    /// Whether the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.plan.is_none()
            && self.budget_cents.is_none()
            && self.process_graph_id.is_none()
    }
}

/// One row of the deferred-deletion queue.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct PendingDeletion {
    /// Job to purge.
    pub job_id: String,
    /// Owning user (needed to locate the workspace after the job row is
    /// gone).
    pub user_id: String,
    /// When the deletion becomes due.
    pub purge_at: DateTime<Utc>,
    /// When the deletion was scheduled.
    pub created_at: DateTime<Utc>,
}

/// Persistence operations for jobs and the deferred-deletion queue.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert a freshly created job row.
    async fn insert_job(&self, record: &JobRecord) -> Result<()>;

    /// Fetch one job by id.
    async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>>;

    /// All jobs of one user, oldest first.
    async fn list_jobs(&self, user_id: &str) -> Result<Vec<JobRecord>>;

    /// Set the status, refreshing `status_updated_at` in the same write.
    /// `error_detail` is stored alongside when given (transition into
    /// `error`).
    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<()>;

    /// Apply a metadata patch iff the version matches and the job is not
    /// active. Returns false when the guard rejected the write.
    async fn update_metadata(
        &self,
        job_id: &str,
        expected_version: i64,
        patch: &JobPatch,
    ) -> Result<bool>;

    /// Bump the version iff it matches and the job is not active; used by
    /// `process` to serialise concurrent dispatch attempts. Returns false
    /// when the guard rejected the claim.
    async fn claim_for_dispatch(&self, job_id: &str, expected_version: i64) -> Result<bool>;

    /// Delete the job row. Idempotent.
    async fn delete_job(&self, job_id: &str) -> Result<()>;

    /// Schedule (or reschedule) a deferred deletion.
    async fn schedule_deletion(
        &self,
        job_id: &str,
        user_id: &str,
        purge_at: DateTime<Utc>,
    ) -> Result<()>;

    /// Queue entries due at `now`, oldest due first, at most `limit`.
    async fn due_deletions(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<PendingDeletion>>;

    /// Drop a queue entry. Idempotent.
    async fn clear_deletion(&self, job_id: &str) -> Result<()>;
}
