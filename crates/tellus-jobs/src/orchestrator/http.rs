// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! REST adapter for the orchestrator boundary.
//!
//! Speaks the engine's unit API: latest-run lookup, trigger, delete, pause.
//! Engine faults surface as [`JobError::Upstream`] with `service:
//! "orchestrator"` carrying the upstream status code and body text; a 404 on
//! the latest-run endpoint is a valid "never ran" answer, not a fault.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use tellus_api::JobStatus;
use tracing::{debug, info, instrument, warn};

use super::{OrchestratorClient, UnitObservation};
use crate::config::Config;
use crate::error::{JobError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Orchestrator client over the engine's REST API.
pub struct HttpOrchestrator {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

/// Latest-run document returned by the engine.
#[derive(Debug, Deserialize)]
struct LatestRun {
    state: Option<String>,
    execution_time: Option<DateTime<Utc>>,
}

#[derive(Debug, serde::Serialize)]
struct PausedBody {
    paused: bool,
}

impl HttpOrchestrator {
    /// Create a client for the engine at `base_url`, optionally sending a
    /// bearer token with every request.
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|err| JobError::Internal {
                msg: format!("failed to build orchestrator HTTP client: {}", err),
            })?;

        Ok(HttpOrchestrator {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    /// Create a client from the service configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.orchestrator_url.clone(), config.orchestrator_token.clone())
    }

    fn request(&self, method: Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self.client.request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        let response = builder.send().await.map_err(|err| JobError::Upstream {
            service: "orchestrator".to_string(),
            code: 502,
            msg: format!("orchestrator unreachable: {}", err),
            internal: true,
            links: Vec::new(),
        })?;
        Ok(response)
    }

    async fn reject(response: reqwest::Response) -> JobError {
        let code = response.status().as_u16();
        let msg = response.text().await.unwrap_or_default();
        JobError::Upstream {
            service: "orchestrator".to_string(),
            code,
            msg,
            internal: true,
            links: Vec::new(),
        }
    }
}

/// Map the engine's run state onto the job lifecycle. Unknown states are
/// treated as "nothing observed" rather than failing reconciliation.
fn map_run_state(state: Option<&str>) -> Option<JobStatus> {
    match state {
        Some("queued") => Some(JobStatus::Queued),
        Some("running") => Some(JobStatus::Running),
        Some("success") => Some(JobStatus::Finished),
        Some("failed") => Some(JobStatus::Error),
        _ => None,
    }
}

#[async_trait]
impl OrchestratorClient for HttpOrchestrator {
    #[instrument(skip(self), fields(unit_id = %unit_id))]
    async fn unit_state(&self, unit_id: &str) -> Result<UnitObservation> {
        debug!("Fetching latest run state");

        let response = self
            .send(self.request(Method::GET, &format!("/units/{}/runs/latest", unit_id)))
            .await?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(UnitObservation::empty());
        }
        if !response.status().is_success() {
            return Err(Self::reject(response).await);
        }

        let run: LatestRun = response.json().await.map_err(|err| JobError::Upstream {
            service: "orchestrator".to_string(),
            code: 502,
            msg: format!("malformed latest-run document: {}", err),
            internal: true,
            links: Vec::new(),
        })?;

        Ok(UnitObservation {
            status: map_run_state(run.state.as_deref()),
            last_run_at: run.execution_time,
        })
    }

    #[instrument(skip(self), fields(unit_id = %unit_id))]
    async fn trigger_unit(&self, unit_id: &str) -> Result<bool> {
        info!("Triggering unit");

        let response = self
            .send(self.request(Method::POST, &format!("/units/{}/trigger", unit_id)))
            .await?;

        if response.status().is_success() {
            return Ok(true);
        }
        if response.status() == StatusCode::CONFLICT {
            warn!("Engine refused the trigger");
            return Ok(false);
        }
        Err(Self::reject(response).await)
    }

    #[instrument(skip(self), fields(unit_id = %unit_id))]
    async fn delete_unit(&self, unit_id: &str) -> Result<()> {
        info!("Deleting unit");

        let response =
            self.send(self.request(Method::DELETE, &format!("/units/{}", unit_id))).await?;

        // Already-gone units count as deleted.
        if response.status().is_success() || response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Err(Self::reject(response).await)
    }

    #[instrument(skip(self), fields(unit_id = %unit_id, paused = paused))]
    async fn set_unit_paused(&self, unit_id: &str, paused: bool) -> Result<()> {
        info!("Setting unit paused flag");

        let response = self
            .send(
                self.request(Method::POST, &format!("/units/{}/paused", unit_id))
                    .json(&PausedBody { paused }),
            )
            .await?;

        if response.status().is_success() {
            return Ok(());
        }
        Err(Self::reject(response).await)
    }
}
