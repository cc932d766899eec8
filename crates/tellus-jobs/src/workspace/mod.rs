// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared-filesystem workspace the jobs and the orchestrator both see.
//!
//! Layout under the data root:
//!
//! ```text
//! {data_dir}/{user_id}/jobs/{job_id}/          job working area
//! {data_dir}/{user_id}/jobs/{job_id}/result/   downloadable outputs
//! {data_dir}/{user_id}/jobs/{job_id}/STOP      cooperative stop marker
//! {descriptions_dir}/{unit_id}.json            run descriptions the engine polls
//! ```
//!
//! The trait exists so the service and its tests never touch paths directly;
//! [`fs::FsWorkspace`] is the production implementation.

pub mod fs;

use std::path::PathBuf;

use async_trait::async_trait;

use crate::dispatch::RunDescription;
use crate::error::Result;

/// Directories of one job inside the workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobDirs {
    /// Root of the job's working area.
    pub job: PathBuf,
    /// Where the execution writes result files.
    pub result: PathBuf,
}

/// One downloadable result file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    /// Path relative to the workspace root, `/`-separated, usable in a
    /// download URL.
    pub path: String,
    /// Bare file name.
    pub name: String,
}

/// File-storage operations for job artifacts.
///
/// All removal operations are idempotent: a missing directory or file is a
/// success, so cleanup paths can be retried.
#[async_trait]
pub trait JobWorkspace: Send + Sync {
    /// Create the job's directory hierarchy including the result dir.
    async fn ensure_result_dir(&self, user_id: &str, job_id: &str) -> Result<JobDirs>;

    /// Result files of the job, sorted by name. Empty when the job never
    /// produced output (or its directory is gone).
    async fn list_outputs(&self, user_id: &str, job_id: &str) -> Result<Vec<OutputFile>>;

    /// Remove the whole job working area.
    async fn discard_all(&self, user_id: &str, job_id: &str) -> Result<()>;

    /// Remove everything except the result dir; reports whether any result
    /// files survive.
    async fn discard_scratch(&self, user_id: &str, job_id: &str) -> Result<bool>;

    /// Create the stop marker the engine's monitoring polls for.
    async fn write_stop_marker(&self, user_id: &str, job_id: &str) -> Result<()>;

    /// Remove the stop marker, so a re-dispatch is not killed by a stale one.
    async fn clear_stop_marker(&self, user_id: &str, job_id: &str) -> Result<()>;

    /// Serialise a run description into the engine's drop directory.
    async fn publish_run_description(
        &self,
        unit_id: &str,
        description: &RunDescription,
    ) -> Result<()>;

    /// Remove run descriptions from the drop directory.
    async fn retract_run_descriptions(&self, unit_ids: &[String]) -> Result<()>;
}
