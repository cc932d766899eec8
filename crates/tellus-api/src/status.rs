// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Job lifecycle states.
//!
//! The lifecycle is a small state machine driven by the orchestrator:
//!
//! ```text
//!                      ┌──────────── cancel (no results) ───────────┐
//!                      ▼                                            │
//!   created ──────▶ queued ──────▶ running ──────▶ finished         │
//!      ▲               │              │    └─────▶ error            │
//!      │               │              └──── cancel (results) ──▶ canceled
//!      └───────────────┴── cancel ◀───┘                             │
//!                                                                   │
//!                     re-trigger ◀──────────────────────────────────┘
//! ```
//!
//! `error` and `finished` are terminal. `canceled` is semi-terminal: it is
//! only left behind when a fresher execution run is observed, so a canceled
//! job can be processed again.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Lifecycle state of a batch job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(type_name = "job_status", rename_all = "lowercase"))]
pub enum JobStatus {
    /// Stored but never handed to the orchestrator (or reset by a cancel).
    Created,
    /// Accepted by the orchestrator, waiting for a worker slot.
    Queued,
    /// At least one execution unit is actively running.
    Running,
    /// Stopped cooperatively while partial results already existed.
    Canceled,
    /// Execution failed. Terminal.
    Error,
    /// All execution units completed and results are available. Terminal.
    Finished,
}

impl JobStatus {
    /// All states, in lifecycle order.
    pub const ALL: [JobStatus; 6] = [
        JobStatus::Created,
        JobStatus::Queued,
        JobStatus::Running,
        JobStatus::Canceled,
        JobStatus::Error,
        JobStatus::Finished,
    ];

    /// Lowercase wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Created => "created",
            JobStatus::Queued => "queued",
            JobStatus::Running => "running",
            JobStatus::Canceled => "canceled",
            JobStatus::Error => "error",
            JobStatus::Finished => "finished",
        }
    }

    /// Whether the job can never move again by itself (`error`, `finished`).
    ///
    /// `canceled` is not terminal: a fresher orchestrator run moves it, and
    /// a canceled job may be re-triggered.
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Error | JobStatus::Finished)
    }

    /// Whether the job currently occupies the orchestrator (`queued`,
    /// `running`). Active jobs reject modification and re-triggering.
    pub fn is_active(&self) -> bool {
        matches!(self, JobStatus::Queued | JobStatus::Running)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for JobStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(JobStatus::Created),
            "queued" => Ok(JobStatus::Queued),
            "running" => Ok(JobStatus::Running),
            "canceled" => Ok(JobStatus::Canceled),
            "error" => Ok(JobStatus::Error),
            "finished" => Ok(JobStatus::Finished),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Returned when parsing a string that names no known job state.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown job status '{0}'")]
pub struct UnknownStatus(pub String);
