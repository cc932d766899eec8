// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Data-catalog collaborator.
//!
//! Input rasters live behind the platform's data service; dispatch asks it
//! which files cover a `load_collection` node's bounds. The catalog's own
//! errors (unknown collection, empty coverage) pass through to the caller as
//! [`crate::error::JobError::Upstream`].

use async_trait::async_trait;
use tellus_api::{SpatialExtent, TemporalInterval};

use crate::error::Result;

/// Resolves which stored files a collection query covers.
#[async_trait]
pub trait CollectionCatalog: Send + Sync {
    /// File paths of `collection_id` within the given bounds, as workers can
    /// open them.
    async fn resolve_paths(
        &self,
        collection_id: &str,
        extent: SpatialExtent,
        interval: &TemporalInterval,
    ) -> Result<Vec<String>>;
}
