//! Validation result types.

use std::fmt;

use thiserror::Error;

use crate::graph::model::NodeKind;
use crate::graph::Graph;
use crate::relations::DanglingReference;

/// Placeholder shown when an entity has no usable id.
pub const MISSING_ID: &str = "<missing id>";

/// The kind of entity a violation is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    /// A node whose `type` tag could not be read.
    Node,
    Typed(NodeKind),
    Edge,
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => f.write_str("Node"),
            Self::Typed(kind) => f.write_str(kind.label()),
            Self::Edge => f.write_str("Edge"),
        }
    }
}

/// A reason an imported document was rejected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("Invalid file: Missing or incorrect \"{collection}\" array")]
    DocumentShape { collection: &'static str },

    #[error("{kind} {node_id} is missing relation field `{field}`")]
    MissingRelationField {
        node_id: String,
        kind: NodeKind,
        field: &'static str,
    },

    #[error("{entity} {id} is missing required field `{field}`")]
    MissingRequiredField {
        entity: Entity,
        id: String,
        field: &'static str,
    },

    #[error("{entity} {id} has an invalid `{field}`: {reason}")]
    InvalidField {
        entity: Entity,
        id: String,
        field: &'static str,
        reason: String,
    },

    #[error("{entity} id {id} appears more than once")]
    DuplicateId { entity: Entity, id: String },
}

impl Violation {
    /// Id of the offending entity, when the violation is about one.
    pub fn entity_id(&self) -> Option<&str> {
        match self {
            Self::DocumentShape { .. } => None,
            Self::MissingRelationField { node_id, .. } => Some(node_id),
            Self::MissingRequiredField { id, .. }
            | Self::InvalidField { id, .. }
            | Self::DuplicateId { id, .. } => Some(id),
        }
    }

    /// Offending field name, when the violation is about one.
    pub fn field(&self) -> Option<&str> {
        match self {
            Self::MissingRelationField { field, .. }
            | Self::MissingRequiredField { field, .. }
            | Self::InvalidField { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// A document that passed validation, normalized and ready to load.
#[derive(Debug, Clone, PartialEq)]
pub struct Validated {
    pub graph: Graph,
    /// References to ids absent from the document; the caller decides
    /// whether to reject or ignore them.
    pub dangling: Vec<DanglingReference>,
    /// Number of width/height values filled in from kind defaults.
    pub defaulted: usize,
}
