// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Tellus API - shared wire types for the tellus service mesh
//!
//! This crate carries the types both sides of the internal RPC boundary agree
//! on: the gateway serialises them onto HTTP, the services produce and consume
//! them. It contains no transport and no service logic.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                        tellus-api                           │
//! ├─────────────────────────────────────────────────────────────┤
//! │  reply:  success envelope + error body                      │
//! ├─────────────────────────────────────────────────────────────┤
//! │  status: job lifecycle states + predicates                  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  job:    job documents (summary, details, submission, ...)  │
//! ├─────────────────────────────────────────────────────────────┤
//! │  graph:  process graphs + data-load extraction              │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Reply contract
//!
//! Every service operation resolves to one of two wire shapes:
//!
//! - [`reply::Reply`]: `{"status": "success", "code": ..., "data": ...,
//!   "headers": ...}` where `data` and `headers` are optional,
//! - [`reply::ErrorBody`]: `{"status": "error", "service": ..., "code": ...,
//!   "user_id": ..., "msg": ..., "internal": ..., "links": [...]}`.
//!
//! Services themselves return `Result<T, E>`; the conversion into these
//! shapes happens once, at the gateway boundary.
//!
//! # Features
//!
//! - `sqlx`: derives `sqlx::Type` on [`status::JobStatus`] so service crates
//!   can bind it to the `job_status` Postgres enum directly.

pub mod graph;
pub mod job;
pub mod reply;
pub mod status;

pub use graph::{DataLoad, GraphDefect, GraphNode, ProcessGraph, SpatialExtent, TemporalInterval};
pub use job::{
    CostEstimate, JobDetails, JobResultsDoc, JobSubmission, JobSummary, ProcessPayload,
    ResultAsset,
};
pub use reply::{ErrorBody, Reply, ReplyStatus};
pub use status::JobStatus;
