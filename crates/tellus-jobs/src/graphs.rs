// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process-graph store collaborator.
//!
//! User-defined graphs live in the process service; jobs only hold the graph
//! id. The store also serves the predefined backend process definitions that
//! get embedded into every run description, so workers resolve process ids
//! without a network dependency at execution time.

use async_trait::async_trait;
use rand::{Rng, distr::Alphanumeric};
use tellus_api::ProcessPayload;

use crate::error::Result;

/// Length of service-generated graph ids.
const GRAPH_ID_LEN: usize = 16;

/// Access to stored process graphs and the predefined process definitions.
///
/// Failures of the peer pass through as [`crate::error::JobError::Upstream`]
/// with the peer's own error body, including its not-found answer for an
/// unknown graph id.
#[async_trait]
pub trait ProcessGraphStore: Send + Sync {
    /// Fetch a user-defined graph.
    async fn get_user_defined(&self, user_id: &str, graph_id: &str) -> Result<ProcessPayload>;

    /// Store (or replace) a user-defined graph under the given id.
    async fn put_user_defined(
        &self,
        user_id: &str,
        graph_id: &str,
        payload: &ProcessPayload,
    ) -> Result<()>;

    /// The predefined backend process definitions, as served to workers.
    async fn list_predefined(&self) -> Result<serde_json::Value>;
}

/// A fresh 16-character alphanumeric graph id for payloads the client did not
/// name.
pub fn new_graph_id() -> String {
    rand::rng().sample_iter(&Alphanumeric).take(GRAPH_ID_LEN).map(char::from).collect()
}
