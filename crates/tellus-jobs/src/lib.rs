// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tellus Jobs - Batch Job Lifecycle Service
//!
//! This crate implements the jobs service of the Tellus platform: it owns
//! the lifecycle of geospatial batch jobs from submission to deletion and
//! drives their execution on an external DAG orchestrator.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         API Gateway                          │
//! │           (REST routes, auth, response envelopes)            │
//! └─────────────────────────────────────────────────────────────┘
//!                    │ one service method per route
//!                    ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   tellus-jobs (This Crate)                   │
//! │  ┌───────────┐ ┌───────────┐ ┌───────────┐ ┌─────────────┐  │
//! │  │ Lifecycle │ │  Status   │ │ Dispatch  │ │  Deletion   │  │
//! │  │    Ops    │ │ Reconcile │ │  + Stop   │ │   Worker    │  │
//! │  └───────────┘ └───────────┘ └───────────┘ └─────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//!        │                  │                     │
//!        ▼                  ▼                     ▼
//! ┌────────────┐  ┌──────────────────┐  ┌───────────────────────┐
//! │ PostgreSQL │  │ DAG Orchestrator │  │   Shared Workspace    │
//! │  (jobs +   │  │  (REST API, one  │  │ (results, stop marker,│
//! │   queue)   │  │  unit per stage) │  │   run descriptions)   │
//! └────────────┘  └──────────────────┘  └───────────────────────┘
//! ```
//!
//! Two further collaborators are RPC peers reached through the gateway and
//! appear here only as traits: the process-graph store
//! ([`graphs::ProcessGraphStore`]) and the collection catalog
//! ([`catalog::CollectionCatalog`]).
//!
//! # Operations
//!
//! | Operation | Description |
//! |-----------|-------------|
//! | `create` | Store a job in status `created` |
//! | `get` / `get_all` | Read views, status reconciled against the orchestrator |
//! | `modify` | Patch metadata and process of an inactive job |
//! | `process` | Claim the job and dispatch it to the orchestrator |
//! | `process_sync` | Run a throwaway job to completion inside one request |
//! | `cancel_processing` | Cooperative stop via the workspace marker file |
//! | `delete` | Immediate purge, or deferred through the durable queue |
//! | `get_results` | Download document for a finished job |
//! | `estimate` | Cost estimate (free default) |
//!
//! # Status handling
//!
//! The stored status is a cache of what the orchestrator last reported.
//! Every operation re-reads the record and reconciles it against the
//! engine's per-unit run states before acting; the lifecycle itself is
//! documented on [`tellus_api::JobStatus`].

#![deny(missing_docs)]

pub mod migrations;

pub mod config;
pub mod error;

pub mod catalog;
pub mod dispatch;
pub mod graphs;
pub mod orchestrator;
pub mod store;
pub mod workspace;

pub mod deletion_worker;
pub mod service;
pub mod sync;

mod purge;
mod reconcile;
mod stop;

pub use config::Config;
pub use error::{JobError, Result};
pub use service::JobService;
