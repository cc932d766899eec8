// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Error types for the jobs service.
//!
//! Provides a single closed error type that maps to the wire error body.
//! Collaborator failures arrive as [`JobError::Upstream`] and keep their
//! originating service, code and links when serialised; everything raised
//! locally carries `service: "jobs"`.

use std::fmt;

use tellus_api::{ErrorBody, JobStatus};

/// Result type using JobError.
pub type Result<T> = std::result::Result<T, JobError>;

/// Name this service reports in error bodies.
pub const SERVICE_NAME: &str = "jobs";

/// Errors raised by job operations.
#[derive(Debug, Clone)]
#[non_exhaustive]
pub enum JobError {
    /// No job with the given id exists.
    JobNotFound {
        /// The job id that was not found.
        job_id: String,
    },

    /// The job exists but belongs to a different user.
    NotOwner {
        /// The requesting user.
        user_id: String,
        /// The job id.
        job_id: String,
    },

    /// The job is queued or running and cannot be modified.
    Locked {
        /// The job id.
        job_id: String,
        /// The active status blocking the mutation.
        status: JobStatus,
    },

    /// The job is queued or running and cannot be re-triggered.
    ProcessingActive {
        /// The job id.
        job_id: String,
        /// The active status blocking the trigger.
        status: JobStatus,
    },

    /// The job changed concurrently; the optimistic guard rejected the write.
    Conflict {
        /// The job id.
        job_id: String,
    },

    /// Results were requested before the job finished.
    NotFinished {
        /// The job id.
        job_id: String,
        /// The current status.
        status: JobStatus,
    },

    /// Results were requested for a canceled job.
    WasCanceled {
        /// The job id.
        job_id: String,
    },

    /// Execution failed on the orchestrator; surfaced on results and
    /// synchronous runs.
    ExecutionFailed {
        /// The job id.
        job_id: String,
        /// Failure detail stored at the transition into `error`.
        detail: String,
    },

    /// The orchestrator refused to start the preparation execution unit.
    TriggerRejected {
        /// The job id.
        job_id: String,
    },

    /// The submitted process payload is missing or malformed.
    InvalidProcess {
        /// What is wrong with it.
        details: String,
    },

    /// A result file has an extension outside the supported format table.
    UnsupportedFormat {
        /// The offending file extension.
        extension: String,
    },

    /// A bounded wait (stop confirmation, synchronous run) ran out of time.
    DeadlineExceeded {
        /// The wait that expired (`stop` or `sync`).
        operation: String,
        /// Seconds waited before giving up.
        waited_secs: u64,
    },

    /// A collaborator failed; its error body is passed through unmodified.
    Upstream {
        /// Service that raised the error.
        service: String,
        /// HTTP status code reported by that service.
        code: u16,
        /// Its error message.
        msg: String,
        /// Whether that service marked the fault internal.
        internal: bool,
        /// Links it attached.
        links: Vec<String>,
    },

    /// Database operation failed.
    Database {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// Workspace filesystem operation failed.
    Storage {
        /// The operation that failed.
        operation: String,
        /// Error details.
        details: String,
    },

    /// Any other internal fault.
    Internal {
        /// Error details.
        msg: String,
    },
}

impl JobError {
    /// Get the error code string for this error type.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::JobNotFound { .. } => "JOB_NOT_FOUND",
            Self::NotOwner { .. } => "NOT_OWNER",
            Self::Locked { .. } => "JOB_LOCKED",
            Self::ProcessingActive { .. } => "PROCESSING_ACTIVE",
            Self::Conflict { .. } => "VERSION_CONFLICT",
            Self::NotFinished { .. } => "JOB_NOT_FINISHED",
            Self::WasCanceled { .. } => "JOB_CANCELED",
            Self::ExecutionFailed { .. } => "EXECUTION_FAILED",
            Self::TriggerRejected { .. } => "TRIGGER_REJECTED",
            Self::InvalidProcess { .. } => "INVALID_PROCESS",
            Self::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            Self::DeadlineExceeded { .. } => "DEADLINE_EXCEEDED",
            Self::Upstream { .. } => "UPSTREAM_FAILURE",
            Self::Database { .. } => "DATABASE_ERROR",
            Self::Storage { .. } => "STORAGE_ERROR",
            Self::Internal { .. } => "INTERNAL_ERROR",
        }
    }

    /// HTTP status code the gateway should answer with.
    pub fn http_code(&self) -> u16 {
        match self {
            Self::JobNotFound { .. }
            | Self::Locked { .. }
            | Self::ProcessingActive { .. }
            | Self::NotFinished { .. }
            | Self::WasCanceled { .. }
            | Self::InvalidProcess { .. } => 400,
            Self::NotOwner { .. } => 401,
            Self::Conflict { .. } => 409,
            Self::ExecutionFailed { .. } => 424,
            Self::Upstream { code, .. } => *code,
            Self::TriggerRejected { .. }
            | Self::UnsupportedFormat { .. }
            | Self::DeadlineExceeded { .. }
            | Self::Database { .. }
            | Self::Storage { .. }
            | Self::Internal { .. } => 500,
        }
    }

    /// Whether the fault is internal (not actionable by the caller).
    pub fn is_internal(&self) -> bool {
        match self {
            Self::JobNotFound { .. }
            | Self::NotOwner { .. }
            | Self::Locked { .. }
            | Self::ProcessingActive { .. }
            | Self::Conflict { .. }
            | Self::NotFinished { .. }
            | Self::WasCanceled { .. }
            | Self::ExecutionFailed { .. }
            | Self::InvalidProcess { .. } => false,
            Self::Upstream { internal, .. } => *internal,
            Self::TriggerRejected { .. }
            | Self::UnsupportedFormat { .. }
            | Self::DeadlineExceeded { .. }
            | Self::Database { .. }
            | Self::Storage { .. }
            | Self::Internal { .. } => true,
        }
    }

    /// Convert this error to the wire error body.
    ///
    /// [`JobError::Upstream`] keeps the originating service, code, internal
    /// flag and links untouched; everything else reports `service: "jobs"`.
    pub fn to_body(&self, user_id: Option<&str>) -> ErrorBody {
        let (service, links) = match self {
            Self::Upstream { service, links, .. } => (service.clone(), links.clone()),
            _ => (SERVICE_NAME.to_string(), Vec::new()),
        };
        ErrorBody {
            status: tellus_api::ReplyStatus::Error,
            service,
            code: self.http_code(),
            user_id: user_id.map(str::to_string),
            msg: self.to_string(),
            internal: self.is_internal(),
            links,
        }
    }
}

impl fmt::Display for JobError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::JobNotFound { job_id } => {
                write!(f, "The job with id '{}' does not exist.", job_id)
            }
            Self::NotOwner { job_id, .. } => {
                write!(f, "You are not allowed to access the job {}.", job_id)
            }
            Self::Locked { job_id, status } => {
                write!(f, "Job {} is currently {} and cannot be modified", job_id, status)
            }
            Self::ProcessingActive { job_id, status } => {
                write!(
                    f,
                    "Job {} is already {}. Processing must be canceled before restart.",
                    job_id, status
                )
            }
            Self::Conflict { job_id } => {
                write!(f, "Job {} was modified concurrently, retry the request.", job_id)
            }
            Self::NotFinished { job_id, status } => {
                write!(f, "Job {} is not finished. Status: {}.", job_id, status)
            }
            Self::WasCanceled { job_id } => {
                write!(f, "Job {} was canceled.", job_id)
            }
            Self::ExecutionFailed { detail, .. } => f.write_str(detail),
            Self::TriggerRejected { job_id } => {
                write!(f, "Job {} could not be started.", job_id)
            }
            Self::InvalidProcess { details } => {
                write!(f, "Invalid process description: {}", details)
            }
            Self::UnsupportedFormat { extension } => {
                write!(f, "Output format '{}' is not supported", extension)
            }
            Self::DeadlineExceeded { operation, waited_secs } => {
                write!(f, "The {} wait gave up after {} seconds", operation, waited_secs)
            }
            Self::Upstream { msg, .. } => f.write_str(msg),
            Self::Database { operation, details } => {
                write!(f, "Database error during '{}': {}", operation, details)
            }
            Self::Storage { operation, details } => {
                write!(f, "Storage error during '{}': {}", operation, details)
            }
            Self::Internal { msg } => f.write_str(msg),
        }
    }
}

impl std::error::Error for JobError {}

impl From<sqlx::Error> for JobError {
    fn from(err: sqlx::Error) -> Self {
        JobError::Database { operation: "query".to_string(), details: err.to_string() }
    }
}

impl From<std::io::Error> for JobError {
    fn from(err: std::io::Error) -> Self {
        JobError::Storage { operation: "io".to_string(), details: err.to_string() }
    }
}

impl From<serde_json::Error> for JobError {
    fn from(err: serde_json::Error) -> Self {
        JobError::Internal { msg: format!("JSON serialisation failed: {err}") }
    }
}

impl From<tellus_api::GraphDefect> for JobError {
    fn from(defect: tellus_api::GraphDefect) -> Self {
        JobError::InvalidProcess { details: defect.to_string() }
    }
}
