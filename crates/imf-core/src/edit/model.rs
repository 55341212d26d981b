//! Patch payloads and edit results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ImfError, ImfResult};
use crate::graph::model::{Edge, EdgeKind, NodeMeta};
use crate::relations::{DanglingReference, RelationOutcome};
use crate::remote::RemoteFailure;

/// Partial update to a node's descriptive data.
///
/// Only the listed keys are accepted; anything else is rejected when the
/// patch is parsed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct NodePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub aspect: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl NodePatch {
    pub fn from_json(value: &Value) -> ImfResult<Self> {
        serde_json::from_value(value.clone()).map_err(|e| ImfError::invalid_patch(e.to_string()))
    }

    pub fn is_empty(&self) -> bool {
        self.label.is_none()
            && self.custom_name.is_none()
            && self.aspect.is_none()
            && self.description.is_none()
    }

    /// Write the present keys into `meta`.
    pub fn apply(&self, meta: &mut NodeMeta) {
        let pairs = [
            (&self.label, &mut meta.label),
            (&self.custom_name, &mut meta.custom_name),
            (&self.aspect, &mut meta.aspect),
            (&self.description, &mut meta.description),
        ];
        for (value, slot) in pairs {
            if let Some(value) = value {
                slot.clone_from(value);
            }
        }
    }
}

/// Partial update to an edge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EdgePatch {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<EdgeKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lock_connection: Option<bool>,
}

impl EdgePatch {
    pub fn from_json(value: &Value) -> ImfResult<Self> {
        serde_json::from_value(value.clone()).map_err(|e| ImfError::invalid_patch(e.to_string()))
    }

    pub fn retype(kind: EdgeKind) -> Self {
        Self {
            kind: Some(kind),
            ..Self::default()
        }
    }

    /// Whether applying the patch moves or retypes the edge.
    pub fn rewires(&self) -> bool {
        self.kind.is_some() || self.source.is_some() || self.target.is_some()
    }

    /// The edge as it looks after the patch.
    pub fn apply(&self, edge: &Edge) -> Edge {
        let mut next = edge.clone();
        if let Some(kind) = self.kind {
            next.kind = kind;
        }
        if let Some(source) = &self.source {
            next.source.clone_from(source);
        }
        if let Some(target) = &self.target {
            next.target.clone_from(target);
        }
        if let Some(handle) = &self.source_handle {
            next.source_handle.clone_from(handle);
        }
        if let Some(handle) = &self.target_handle {
            next.target_handle.clone_from(handle);
        }
        if let Some(label) = &self.label {
            next.data.label.clone_from(label);
        }
        if let Some(lock) = self.lock_connection {
            next.data.lock_connection = lock;
        }
        next
    }
}

/// Result of creating, updating or deleting one edge.
#[derive(Debug, Clone, PartialEq)]
pub struct EdgeChange {
    /// The edge as stored after the change, or as it was before deletion.
    pub edge: Edge,
    pub outcome: RelationOutcome,
    /// Best-effort remote calls that failed.
    pub failures: Vec<RemoteFailure>,
}

impl EdgeChange {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Result of loading a document into the graph.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub nodes: usize,
    pub edges: usize,
    /// Sizes filled in from kind defaults.
    pub defaulted: usize,
    pub dangling: Vec<DanglingReference>,
    /// Whether the local graph was replaced by a fresh remote fetch.
    pub refreshed: bool,
}
