// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Configuration loading from environment variables.

use std::path::PathBuf;
use std::time::Duration;

/// Jobs service configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// PostgreSQL connection URL
    pub database_url: String,
    /// Root of the shared job workspace
    pub data_dir: PathBuf,
    /// Drop directory the orchestrator polls for run descriptions
    pub descriptions_dir: PathBuf,
    /// Orchestrator REST base URL
    pub orchestrator_url: String,
    /// Optional bearer token for the orchestrator API
    pub orchestrator_token: Option<String>,
    /// Public base URL used to build result download links
    pub public_url: String,
    /// Poll intervals and deadlines of the service operations
    pub timing: ServiceTiming,
    /// Deletion-worker poll interval
    pub purge_poll: Duration,
}

/// Poll intervals and deadlines used by the stop protocol, the synchronous
/// wrapper and deferred deletion.
///
/// `stop_poll` must not exceed the poke interval of the orchestrator's stop
/// sensors, otherwise a stop confirmation can lag a full sensor cycle behind.
#[derive(Debug, Clone)]
pub struct ServiceTiming {
    /// Interval between stop-confirmation polls
    pub stop_poll: Duration,
    /// Optional deadline for stop confirmation (unbounded when unset)
    pub stop_timeout: Option<Duration>,
    /// Interval between synchronous-run status polls
    pub sync_poll: Duration,
    /// Optional deadline for a synchronous run (unbounded when unset)
    pub sync_timeout: Option<Duration>,
    /// Delay before a deferred deletion becomes due
    pub purge_delay: Duration,
}

impl Default for ServiceTiming {
    fn default() -> Self {
        ServiceTiming {
            stop_poll: Duration::from_secs(5),
            stop_timeout: None,
            sync_poll: Duration::from_secs(10),
            sync_timeout: None,
            purge_delay: Duration::from_secs(300),
        }
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `TELLUS_DATABASE_URL`: PostgreSQL connection string
    /// - `TELLUS_ORCHESTRATOR_URL`: orchestrator REST base URL
    ///
    /// Optional (with defaults):
    /// - `TELLUS_DATA_DIR`: workspace root (default: `./data`)
    /// - `TELLUS_DESCRIPTIONS_DIR`: run-description drop dir (default: `<data>/descriptions`)
    /// - `TELLUS_ORCHESTRATOR_TOKEN`: bearer token (default: none)
    /// - `TELLUS_PUBLIC_URL`: download link base (default: `http://localhost:3000`)
    /// - `TELLUS_STOP_POLL_SECS`: stop poll interval (default: 5)
    /// - `TELLUS_STOP_TIMEOUT_SECS`: stop deadline (default: unbounded)
    /// - `TELLUS_SYNC_POLL_SECS`: sync poll interval (default: 10)
    /// - `TELLUS_SYNC_TIMEOUT_SECS`: sync deadline (default: unbounded)
    /// - `TELLUS_PURGE_DELAY_SECS`: deferred-deletion delay (default: 300)
    /// - `TELLUS_PURGE_POLL_SECS`: deletion-worker poll interval (default: 30)
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = std::env::var("TELLUS_DATABASE_URL")
            .map_err(|_| ConfigError::Missing("TELLUS_DATABASE_URL"))?;

        let orchestrator_url = std::env::var("TELLUS_ORCHESTRATOR_URL")
            .map_err(|_| ConfigError::Missing("TELLUS_ORCHESTRATOR_URL"))?;

        let data_dir =
            PathBuf::from(std::env::var("TELLUS_DATA_DIR").unwrap_or_else(|_| "./data".to_string()));

        let descriptions_dir = std::env::var("TELLUS_DESCRIPTIONS_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| data_dir.join("descriptions"));

        let orchestrator_token = std::env::var("TELLUS_ORCHESTRATOR_TOKEN").ok();

        let public_url = std::env::var("TELLUS_PUBLIC_URL")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .trim_end_matches('/')
            .to_string();

        let timing = ServiceTiming {
            stop_poll: env_secs("TELLUS_STOP_POLL_SECS", 5)?,
            stop_timeout: env_opt_secs("TELLUS_STOP_TIMEOUT_SECS")?,
            sync_poll: env_secs("TELLUS_SYNC_POLL_SECS", 10)?,
            sync_timeout: env_opt_secs("TELLUS_SYNC_TIMEOUT_SECS")?,
            purge_delay: env_secs("TELLUS_PURGE_DELAY_SECS", 300)?,
        };

        let purge_poll = env_secs("TELLUS_PURGE_POLL_SECS", 30)?;

        Ok(Self {
            database_url,
            data_dir,
            descriptions_dir,
            orchestrator_url,
            orchestrator_token,
            public_url,
            timing,
            purge_poll,
        })
    }
}

fn env_secs(name: &'static str, default: u64) -> Result<Duration, ConfigError> {
    let secs: u64 = std::env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .parse()
        .map_err(|_| ConfigError::Invalid(name, "must be a number of seconds"))?;
    Ok(Duration::from_secs(secs))
}

fn env_opt_secs(name: &'static str) -> Result<Option<Duration>, ConfigError> {
    match std::env::var(name) {
        Err(_) => Ok(None),
        Ok(raw) => {
            let secs: u64 = raw
                .parse()
                .map_err(|_| ConfigError::Invalid(name, "must be a number of seconds"))?;
            Ok(Some(Duration::from_secs(secs)))
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is missing.
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),

    /// An environment variable has an invalid value.
    #[error("invalid value for {0}: {1}")]
    Invalid(&'static str, &'static str),
}
