// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Postgres implementation of the job store.
//!
//! All SQL lives here as free functions over a [`PgPool`]; the trait impl at
//! the bottom only delegates. The optimistic guards are plain conditional
//! UPDATEs: the caller learns from `rows_affected` whether its snapshot was
//! still current.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use tellus_api::JobStatus;

use super::{JobPatch, JobRecord, JobStore, PendingDeletion};
use crate::error::{JobError, Result};

/// PostgreSQL-backed job store.
#[derive(Clone)]
pub struct PostgresJobStore {
    pool: PgPool,
}

impl PostgresJobStore {
    /// Create a new Postgres-backed job store.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// ============================================================================
// Job Operations
// ============================================================================

/// Insert a freshly created job row.
pub async fn insert_job(pool: &PgPool, record: &JobRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO jobs (id, user_id, process_graph_id, status, status_updated_at,
                          lock_version, title, description, plan, budget_cents,
                          vrt_only, parallel_sensor, error, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(&record.id)
    .bind(&record.user_id)
    .bind(&record.process_graph_id)
    .bind(record.status)
    .bind(record.status_updated_at)
    .bind(record.lock_version)
    .bind(&record.title)
    .bind(&record.description)
    .bind(&record.plan)
    .bind(record.budget_cents)
    .bind(record.vrt_only)
    .bind(record.parallel_sensor)
    .bind(&record.error)
    .bind(record.created_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Get a job by id.
pub async fn get_job(pool: &PgPool, job_id: &str) -> Result<Option<JobRecord>> {
    let record = sqlx::query_as::<_, JobRecord>(
        r#"
        SELECT id, user_id, process_graph_id, status, status_updated_at, lock_version,
               title, description, plan, budget_cents, vrt_only, parallel_sensor,
               error, created_at
        FROM jobs
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .fetch_optional(pool)
    .await?;

    Ok(record)
}

/// All jobs of a user, oldest first.
pub async fn list_jobs(pool: &PgPool, user_id: &str) -> Result<Vec<JobRecord>> {
    let records = sqlx::query_as::<_, JobRecord>(
        r#"
        SELECT id, user_id, process_graph_id, status, status_updated_at, lock_version,
               title, description, plan, budget_cents, vrt_only, parallel_sensor,
               error, created_at
        FROM jobs
        WHERE user_id = $1
        ORDER BY created_at ASC
        "#,
    )
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(records)
}

/// Set the status and refresh `status_updated_at` in the same UPDATE.
pub async fn update_status(
    pool: &PgPool,
    job_id: &str,
    status: JobStatus,
    error_detail: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET status = $2,
            status_updated_at = NOW(),
            error = COALESCE($3, error)
        WHERE id = $1
        "#,
    )
    .bind(job_id)
    .bind(status)
    .bind(error_detail)
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(JobError::JobNotFound { job_id: job_id.to_string() });
    }

    Ok(())
}

/// Apply a metadata patch behind the optimistic guard.
pub async fn update_metadata(
    pool: &PgPool,
    job_id: &str,
    expected_version: i64,
    patch: &JobPatch,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET title = COALESCE($3, title),
            description = COALESCE($4, description),
            plan = COALESCE($5, plan),
            budget_cents = COALESCE($6, budget_cents),
            process_graph_id = COALESCE($7, process_graph_id),
            lock_version = lock_version + 1
        WHERE id = $1
          AND lock_version = $2
          AND status::text NOT IN ('queued', 'running')
        "#,
    )
    .bind(job_id)
    .bind(expected_version)
    .bind(&patch.title)
    .bind(&patch.description)
    .bind(&patch.plan)
    .bind(patch.budget_cents)
    .bind(&patch.process_graph_id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Bump the version behind the optimistic guard, claiming the dispatch.
pub async fn claim_for_dispatch(
    pool: &PgPool,
    job_id: &str,
    expected_version: i64,
) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE jobs
        SET lock_version = lock_version + 1
        WHERE id = $1
          AND lock_version = $2
          AND status::text NOT IN ('queued', 'running')
        "#,
    )
    .bind(job_id)
    .bind(expected_version)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Delete a job row. Idempotent; the queue entry is cleared separately.
pub async fn delete_job(pool: &PgPool, job_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM jobs WHERE id = $1").bind(job_id).execute(pool).await?;
    Ok(())
}

// ============================================================================
// Deferred-Deletion Queue
// ============================================================================

/// Schedule (or reschedule) a deferred deletion.
pub async fn schedule_deletion(
    pool: &PgPool,
    job_id: &str,
    user_id: &str,
    purge_at: DateTime<Utc>,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO job_deletion_queue (job_id, user_id, purge_at, created_at)
        VALUES ($1, $2, $3, NOW())
        ON CONFLICT (job_id) DO UPDATE SET purge_at = EXCLUDED.purge_at
        "#,
    )
    .bind(job_id)
    .bind(user_id)
    .bind(purge_at)
    .execute(pool)
    .await?;

    Ok(())
}

/// Queue entries due at `now`, oldest due first.
pub async fn due_deletions(
    pool: &PgPool,
    now: DateTime<Utc>,
    limit: i64,
) -> Result<Vec<PendingDeletion>> {
    let entries = sqlx::query_as::<_, PendingDeletion>(
        r#"
        SELECT job_id, user_id, purge_at, created_at
        FROM job_deletion_queue
        WHERE purge_at <= $1
        ORDER BY purge_at ASC
        LIMIT $2
        "#,
    )
    .bind(now)
    .bind(limit)
    .fetch_all(pool)
    .await?;

    Ok(entries)
}

/// Drop a queue entry.
pub async fn clear_deletion(pool: &PgPool, job_id: &str) -> Result<()> {
    sqlx::query("DELETE FROM job_deletion_queue WHERE job_id = $1")
        .bind(job_id)
        .execute(pool)
        .await?;
    Ok(())
}

// ============================================================================
// Trait Implementation
// ============================================================================

#[async_trait]
impl JobStore for PostgresJobStore {
    async fn insert_job(&self, record: &JobRecord) -> Result<()> {
        insert_job(&self.pool, record).await
    }

    async fn get_job(&self, job_id: &str) -> Result<Option<JobRecord>> {
        get_job(&self.pool, job_id).await
    }

    async fn list_jobs(&self, user_id: &str) -> Result<Vec<JobRecord>> {
        list_jobs(&self.pool, user_id).await
    }

    async fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        error_detail: Option<&str>,
    ) -> Result<()> {
        update_status(&self.pool, job_id, status, error_detail).await
    }

    async fn update_metadata(
        &self,
        job_id: &str,
        expected_version: i64,
        patch: &JobPatch,
    ) -> Result<bool> {
        update_metadata(&self.pool, job_id, expected_version, patch).await
    }

    async fn claim_for_dispatch(&self, job_id: &str, expected_version: i64) -> Result<bool> {
        claim_for_dispatch(&self.pool, job_id, expected_version).await
    }

    async fn delete_job(&self, job_id: &str) -> Result<()> {
        delete_job(&self.pool, job_id).await
    }

    async fn schedule_deletion(
        &self,
        job_id: &str,
        user_id: &str,
        purge_at: DateTime<Utc>,
    ) -> Result<()> {
        schedule_deletion(&self.pool, job_id, user_id, purge_at).await
    }

    async fn due_deletions(&self, now: DateTime<Utc>, limit: i64) -> Result<Vec<PendingDeletion>> {
        due_deletions(&self.pool, now, limit).await
    }

    async fn clear_deletion(&self, job_id: &str) -> Result<()> {
        clear_deletion(&self.pool, job_id).await
    }
}
