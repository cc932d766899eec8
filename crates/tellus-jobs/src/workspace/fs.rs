// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Shared-filesystem implementation of the workspace.

use std::io;
use std::path::PathBuf;

use async_trait::async_trait;
use tokio::fs;
use tracing::{debug, instrument};

use super::{JobDirs, JobWorkspace, OutputFile};
use crate::config::Config;
use crate::dispatch::RunDescription;
use crate::error::Result;

/// Marker file the engine's monitoring polls for.
const STOP_MARKER: &str = "STOP";
/// Subdirectory that survives scratch cleanup.
const RESULT_DIR: &str = "result";

/// Workspace over a directory tree both this service and the engine mount.
pub struct FsWorkspace {
    data_dir: PathBuf,
    descriptions_dir: PathBuf,
}

impl FsWorkspace {
    /// Create a workspace rooted at `data_dir`, with run descriptions going
    /// to `descriptions_dir`.
    pub fn new(data_dir: impl Into<PathBuf>, descriptions_dir: impl Into<PathBuf>) -> Self {
        FsWorkspace { data_dir: data_dir.into(), descriptions_dir: descriptions_dir.into() }
    }

    /// Create a workspace from the service configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.data_dir.clone(), config.descriptions_dir.clone())
    }

    fn job_dir(&self, user_id: &str, job_id: &str) -> PathBuf {
        self.data_dir.join(user_id).join("jobs").join(job_id)
    }

    fn description_file(&self, unit_id: &str) -> PathBuf {
        self.descriptions_dir.join(format!("{}.json", unit_id))
    }
}

async fn remove_if_present(path: &std::path::Path) -> Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(err) => Err(err.into()),
    }
}

#[async_trait]
impl JobWorkspace for FsWorkspace {
    async fn ensure_result_dir(&self, user_id: &str, job_id: &str) -> Result<JobDirs> {
        let job = self.job_dir(user_id, job_id);
        let result = job.join(RESULT_DIR);
        fs::create_dir_all(&result).await?;
        Ok(JobDirs { job, result })
    }

    async fn list_outputs(&self, user_id: &str, job_id: &str) -> Result<Vec<OutputFile>> {
        let result_dir = self.job_dir(user_id, job_id).join(RESULT_DIR);
        let mut entries = match fs::read_dir(&result_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut outputs = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_file() {
                continue;
            }
            let name = entry.file_name().to_string_lossy().into_owned();
            outputs.push(OutputFile {
                path: format!("{}/jobs/{}/{}/{}", user_id, job_id, RESULT_DIR, name),
                name,
            });
        }
        outputs.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(outputs)
    }

    #[instrument(skip(self), fields(user_id = %user_id, job_id = %job_id))]
    async fn discard_all(&self, user_id: &str, job_id: &str) -> Result<()> {
        match fs::remove_dir_all(self.job_dir(user_id, job_id)).await {
            Ok(()) => {
                debug!("Removed job working area");
                Ok(())
            }
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }

    #[instrument(skip(self), fields(user_id = %user_id, job_id = %job_id))]
    async fn discard_scratch(&self, user_id: &str, job_id: &str) -> Result<bool> {
        let job_dir = self.job_dir(user_id, job_id);
        let mut entries = match fs::read_dir(&job_dir).await {
            Ok(entries) => entries,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(false),
            Err(err) => return Err(err.into()),
        };

        while let Some(entry) = entries.next_entry().await? {
            if entry.file_name() == RESULT_DIR {
                continue;
            }
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                fs::remove_dir_all(&path).await?;
            } else {
                fs::remove_file(&path).await?;
            }
        }

        let results_exist = !self.list_outputs(user_id, job_id).await?.is_empty();
        debug!(results_exist, "Removed scratch artifacts");
        Ok(results_exist)
    }

    async fn write_stop_marker(&self, user_id: &str, job_id: &str) -> Result<()> {
        let job_dir = self.job_dir(user_id, job_id);
        fs::create_dir_all(&job_dir).await?;
        fs::write(job_dir.join(STOP_MARKER), b"").await?;
        Ok(())
    }

    async fn clear_stop_marker(&self, user_id: &str, job_id: &str) -> Result<()> {
        remove_if_present(&self.job_dir(user_id, job_id).join(STOP_MARKER)).await
    }

    async fn publish_run_description(
        &self,
        unit_id: &str,
        description: &RunDescription,
    ) -> Result<()> {
        fs::create_dir_all(&self.descriptions_dir).await?;
        let body = serde_json::to_vec_pretty(description)?;
        fs::write(self.description_file(unit_id), body).await?;
        Ok(())
    }

    async fn retract_run_descriptions(&self, unit_ids: &[String]) -> Result<()> {
        for unit_id in unit_ids {
            remove_if_present(&self.description_file(unit_id)).await?;
        }
        Ok(())
    }
}
