// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job documents exchanged between the gateway and the jobs service.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::graph::ProcessGraph;
use crate::status::JobStatus;

/// List view of a job, one entry of `get_all`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSummary {
    /// Job identifier.
    pub id: String,
    /// Optional human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Optional free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Current lifecycle state.
    pub status: JobStatus,
    /// When the job was created.
    pub created_at: DateTime<Utc>,
    /// When the status last changed.
    pub status_updated_at: DateTime<Utc>,
    /// Billing plan name, when one was chosen.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    /// Maximum spend in euros, when one was set.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
}

/// Full view of a job, returned by `get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobDetails {
    /// The summary fields, flattened into the same object.
    #[serde(flatten)]
    pub summary: JobSummary,
    /// The process the job executes.
    pub process: ProcessPayload,
}

/// A user-defined process: an optional client-chosen identifier plus the
/// graph itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessPayload {
    /// Client-chosen graph identifier; the service generates one when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// The process graph.
    pub process_graph: ProcessGraph,
}

/// Payload of `create` and `modify`.
///
/// All fields are optional on modify (patch semantics); `create` requires
/// `process`. The two execution flags default to the batch behavior and are
/// forced off by the synchronous wrapper.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSubmission {
    /// Human-readable title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Free-text description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Billing plan name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    /// Maximum spend in euros.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub budget: Option<f64>,
    /// Keep only intermediate (virtual) artifacts instead of full rasters.
    #[serde(default = "default_flag")]
    pub vrt_only: bool,
    /// Attach the parallelised execution unit alongside the preparation one.
    #[serde(default = "default_flag")]
    pub parallel_sensor: bool,
    /// The process to execute. Required on create.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub process: Option<ProcessPayload>,
}

fn default_flag() -> bool {
    true
}

impl Default for JobSubmission {
    fn default() -> Self {
        JobSubmission {
            title: None,
            description: None,
            plan: None,
            budget: None,
            vrt_only: true,
            parallel_sensor: true,
            process: None,
        }
    }
}

/// One downloadable result file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultAsset {
    /// Absolute download URL.
    pub href: String,
    /// File name.
    pub name: String,
}

/// Result document returned by `get_results` for a finished job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobResultsDoc {
    /// Job identifier.
    pub id: String,
    /// Title, when the job has one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Lifecycle state (always `finished` when this document is produced).
    pub status: JobStatus,
    /// The downloadable result files.
    pub assets: Vec<ResultAsset>,
    /// Related links.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

/// Cost estimate for running a job. Without a billing engine the estimate is
/// the free default.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostEstimate {
    /// Estimated cost in euros.
    pub costs: f64,
}

impl Default for CostEstimate {
    fn default() -> Self {
        CostEstimate { costs: 0.0 }
    }
}
