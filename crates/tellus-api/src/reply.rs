// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Wire envelopes shared by every service operation.
//!
//! A successful operation serialises to a [`Reply`], a failed one to an
//! [`ErrorBody`]. Both carry a `status` discriminator so the gateway (and any
//! client reading the raw payload) can tell them apart without guessing.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Discriminator field shared by both envelope shapes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReplyStatus {
    /// The operation completed; the envelope is a [`Reply`].
    Success,
    /// The operation failed; the envelope is an [`ErrorBody`].
    Error,
}

/// Success envelope: `{"status": "success", "code": ..., "data": ...,
/// "headers": ...}`.
///
/// `code` is the HTTP status the gateway should answer with. `headers` are
/// extra response headers (e.g. `Location` after a create).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reply<T> {
    /// Always [`ReplyStatus::Success`].
    pub status: ReplyStatus,
    /// HTTP status code for the gateway response.
    pub code: u16,
    /// Operation payload, omitted for bodyless replies (202/204).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    /// Extra response headers, omitted when empty.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<BTreeMap<String, String>>,
}

impl<T> Reply<T> {
    /// `200 OK` with a payload.
    pub fn ok(data: T) -> Self {
        Self::with_code(200, Some(data))
    }

    /// `201 Created` with a payload.
    pub fn created(data: T) -> Self {
        Self::with_code(201, Some(data))
    }

    /// Arbitrary code and optional payload.
    pub fn with_code(code: u16, data: Option<T>) -> Self {
        Reply { status: ReplyStatus::Success, code, data, headers: None }
    }

    /// Attach a response header, keeping earlier ones.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.get_or_insert_with(BTreeMap::new).insert(name.into(), value.into());
        self
    }
}

impl Reply<()> {
    /// `202 Accepted`, no payload.
    pub fn accepted() -> Self {
        Self::with_code(202, None)
    }

    /// `204 No Content`, no payload.
    pub fn no_content() -> Self {
        Self::with_code(204, None)
    }
}

/// Error envelope carried across service boundaries unmodified.
///
/// `service` names the component that raised the error, so a failure in a
/// collaborator keeps its origin even when relayed by another service.
/// `internal` marks faults that are not actionable by the caller; the gateway
/// hides `msg` for those and logs it instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Always [`ReplyStatus::Error`].
    pub status: ReplyStatus,
    /// Component that raised the error (e.g. `jobs`, `orchestrator`).
    pub service: String,
    /// HTTP status code for the gateway response.
    pub code: u16,
    /// User the failed request belonged to, when known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Human-readable description. Never contains secrets.
    pub msg: String,
    /// Whether the fault is internal (not actionable by the caller).
    pub internal: bool,
    /// Documentation links offered to the caller.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,
}

impl ErrorBody {
    /// Build an error body for `service` with the given code and message.
    pub fn new(service: impl Into<String>, code: u16, msg: impl Into<String>) -> Self {
        ErrorBody {
            status: ReplyStatus::Error,
            service: service.into(),
            code,
            user_id: None,
            msg: msg.into(),
            internal: true,
            links: Vec::new(),
        }
    }

    /// Attach the user the request belonged to.
    pub fn for_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }

    /// Mark the fault caller-actionable (`internal = false`).
    pub fn user_facing(mut self) -> Self {
        self.internal = false;
        self
    }
}
