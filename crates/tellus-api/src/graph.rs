// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Process graphs and the data-load extraction used to resolve input files.
//!
//! A process graph is a map of named nodes, each referencing a process and
//! its arguments. The jobs service only interprets `load_collection` nodes
//! (to resolve input file paths before triggering execution); everything else
//! is opaque and handed to the workers untouched.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Process identifier of the node kind the jobs service interprets.
pub const LOAD_COLLECTION: &str = "load_collection";

/// A process graph: named nodes in deterministic (sorted) order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProcessGraph(pub BTreeMap<String, GraphNode>);

/// One node of a process graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// The process this node invokes.
    pub process_id: String,
    /// Process arguments, opaque except for `load_collection`.
    #[serde(default)]
    pub arguments: Value,
    /// Any further node fields (`result`, `description`, ...), kept verbatim.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Bounding box of a `load_collection` node.
///
/// The graph carries it as an object; the data lookup takes it as the
/// 4-element array `[south, east, north, west]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpatialExtent {
    /// Southern latitude bound.
    pub south: f64,
    /// Eastern longitude bound.
    pub east: f64,
    /// Northern latitude bound.
    pub north: f64,
    /// Western longitude bound.
    pub west: f64,
}

impl SpatialExtent {
    /// The `[south, east, north, west]` array form the data lookup expects.
    pub fn as_bounds(&self) -> [f64; 4] {
        [self.south, self.east, self.north, self.west]
    }
}

/// Temporal bounds of a `load_collection` node; either end may be open.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TemporalInterval {
    /// Inclusive start, as given in the graph (e.g. `2018-01-01`).
    pub start: Option<String>,
    /// Exclusive end, as given in the graph.
    pub end: Option<String>,
}

impl TemporalInterval {
    /// Parse the graph's `[start, end]` array form, where each entry is a
    /// string or null and the whole array may be shorter.
    pub fn from_extent_value(value: &Value) -> Result<Self, String> {
        let items = value.as_array().ok_or("temporal_extent must be an array")?;
        if items.len() > 2 {
            return Err(format!("temporal_extent has {} entries, expected at most 2", items.len()));
        }
        let bound = |idx: usize| -> Result<Option<String>, String> {
            match items.get(idx) {
                None | Some(Value::Null) => Ok(None),
                Some(Value::String(s)) => Ok(Some(s.clone())),
                Some(other) => Err(format!("temporal_extent[{idx}] is not a string: {other}")),
            }
        };
        Ok(TemporalInterval { start: bound(0)?, end: bound(1)? })
    }
}

/// A fully parsed `load_collection` node.
#[derive(Debug, Clone, PartialEq)]
pub struct DataLoad {
    /// Name of the graph node.
    pub node: String,
    /// Collection to load.
    pub collection_id: String,
    /// Bounding box to load.
    pub spatial_extent: SpatialExtent,
    /// Temporal bounds to load.
    pub temporal_interval: TemporalInterval,
}

/// A `load_collection` node whose arguments do not have the expected shape.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("node '{node}': {details}")]
pub struct GraphDefect {
    /// Name of the offending node.
    pub node: String,
    /// What is wrong with it.
    pub details: String,
}

impl ProcessGraph {
    /// Whether the graph has no nodes.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// All `load_collection` nodes, parsed. The first malformed node aborts
    /// with a [`GraphDefect`] so nothing is resolved for a broken graph.
    pub fn data_loads(&self) -> Result<Vec<DataLoad>, GraphDefect> {
        let mut loads = Vec::new();
        for (name, node) in &self.0 {
            if node.process_id != LOAD_COLLECTION {
                continue;
            }
            loads.push(parse_data_load(name, node)?);
        }
        Ok(loads)
    }
}

fn parse_data_load(name: &str, node: &GraphNode) -> Result<DataLoad, GraphDefect> {
    let defect = |details: String| GraphDefect { node: name.to_string(), details };
    let args = node
        .arguments
        .as_object()
        .ok_or_else(|| defect("arguments must be an object".to_string()))?;
    let collection_id = args
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| defect("missing collection id".to_string()))?
        .to_string();
    let spatial_extent: SpatialExtent = args
        .get("spatial_extent")
        .cloned()
        .ok_or_else(|| defect("missing spatial_extent".to_string()))
        .and_then(|v| {
            serde_json::from_value(v).map_err(|e| defect(format!("invalid spatial_extent: {e}")))
        })?;
    let temporal_interval = args
        .get("temporal_extent")
        .ok_or_else(|| defect("missing temporal_extent".to_string()))
        .and_then(|v| TemporalInterval::from_extent_value(v).map_err(|e| defect(e)))?;
    Ok(DataLoad { node: name.to_string(), collection_id, spatial_extent, temporal_interval })
}
