// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Vocabulary of the synchronous execution wrapper.
//!
//! A synchronous run is a regular job driven to completion inside one
//! request: the service creates it, starts it, polls until it settles and
//! answers with the first result file. The job itself is throwaway; its
//! data is queued for deferred deletion as soon as the file is picked so
//! the caller has time to download it.

use crate::error::{JobError, Result};

/// Result formats the synchronous endpoint can answer with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// GeoTIFF raster output.
    GTiff,
    /// PNG preview output.
    Png,
    /// JPEG preview output.
    Jpeg,
}

impl OutputFormat {
    /// Resolve a file extension or format synonym to a format.
    ///
    /// The table is exact-match, no case folding: `PNG` is rejected even
    /// though `png` is not.
    pub fn from_extension(extension: &str) -> Result<Self> {
        match extension {
            "Gtiff" | "GTiff" | "tif" | "tiff" => Ok(OutputFormat::GTiff),
            "jpg" | "jpeg" => Ok(OutputFormat::Jpeg),
            "png" => Ok(OutputFormat::Png),
            other => Err(JobError::UnsupportedFormat { extension: other.to_string() }),
        }
    }

    /// Canonical file extension of the format.
    pub fn extension(self) -> &'static str {
        match self {
            OutputFormat::GTiff => "tif",
            OutputFormat::Png => "png",
            OutputFormat::Jpeg => "jpeg",
        }
    }

    /// MIME type for the `Content-Type` response header.
    pub fn content_type(self) -> &'static str {
        match self {
            OutputFormat::GTiff => "image/tiff",
            OutputFormat::Png => "image/png",
            OutputFormat::Jpeg => "image/jpeg",
        }
    }
}

/// What a finished synchronous run hands back: the file to stream and the
/// header to stream it under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Id of the short-lived job that produced the file.
    pub job_id: String,
    /// Workspace-relative path of the result file.
    pub file: String,
    /// MIME type matching the file's format.
    pub content_type: &'static str,
}
