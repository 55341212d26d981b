//! Relation-field contracts for each node variant and edge kind.

use std::fmt;

use super::model::{EdgeKind, NodeKind};

/// Whether a relation field holds many ids or one reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Empty means an empty set.
    Set,
    /// Empty means the `"none"` sentinel.
    Single,
}

/// A relation field carried in node data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RelationField {
    Parent,
    Children,
    Terminals,
    FulfilledBy,
    Fulfills,
    DirectParts,
    DirectPartOf,
    ConnectedTo,
    ConnectedBy,
    TerminalOf,
    TransfersTo,
    TransferedBy,
}

impl RelationField {
    /// Key of the field inside the node's `data` object.
    pub fn wire_name(&self) -> &'static str {
        match self {
            Self::Parent => "parent",
            Self::Children => "children",
            Self::Terminals => "terminals",
            Self::FulfilledBy => "fulfilledBy",
            Self::Fulfills => "fulfills",
            Self::DirectParts => "directParts",
            Self::DirectPartOf => "directPartOf",
            Self::ConnectedTo => "connectedTo",
            Self::ConnectedBy => "connectedBy",
            Self::TerminalOf => "terminalOf",
            Self::TransfersTo => "transfersTo",
            Self::TransferedBy => "transferedBy",
        }
    }

    pub fn cardinality(&self) -> Cardinality {
        match self {
            Self::Parent | Self::DirectPartOf | Self::TerminalOf => Cardinality::Single,
            _ => Cardinality::Set,
        }
    }
}

impl fmt::Display for RelationField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

const BLOCK_FIELDS: &[RelationField] = &[
    RelationField::Parent,
    RelationField::Children,
    RelationField::Terminals,
    RelationField::FulfilledBy,
    RelationField::Fulfills,
    RelationField::DirectParts,
    RelationField::ConnectedTo,
    RelationField::ConnectedBy,
    RelationField::DirectPartOf,
];

const CONNECTOR_FIELDS: &[RelationField] = &[RelationField::ConnectedTo, RelationField::ConnectedBy];

const TERMINAL_FIELDS: &[RelationField] = &[
    RelationField::TerminalOf,
    RelationField::ConnectedTo,
    RelationField::ConnectedBy,
    RelationField::TransfersTo,
    RelationField::TransferedBy,
];

/// Default node geometry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl NodeKind {
    /// Relation fields a node of this kind must carry, in validation order.
    pub fn relation_fields(&self) -> &'static [RelationField] {
        match self {
            Self::Block => BLOCK_FIELDS,
            Self::Connector => CONNECTOR_FIELDS,
            Self::Terminal => TERMINAL_FIELDS,
        }
    }

    pub fn default_size(&self) -> Size {
        match self {
            Self::Block => Size { width: 96.0, height: 48.0 },
            Self::Connector => Size { width: 32.0, height: 32.0 },
            Self::Terminal => Size { width: 22.0, height: 22.0 },
        }
    }
}

/// Source-side and target-side fields an edge keeps in sync.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mirror {
    pub source: RelationField,
    pub target: RelationField,
}

impl EdgeKind {
    /// Whether edges of this kind are mirrored into node data at all.
    pub fn is_mirrored(&self) -> bool {
        matches!(
            self,
            Self::Connected | Self::Fulfilled | Self::Part | Self::Transfer | Self::Topology
        )
    }

    /// The mirrored field pair for an edge of this kind.
    ///
    /// Topology is the only kind whose fields depend on an endpoint: a
    /// Terminal target is recorded in the source's `terminals` and points
    /// back through `terminalOf`, anything else goes through
    /// `children`/`parent`. An endpoint whose variant lacks the field is
    /// left untouched.
    pub fn mirror(&self, target: Option<NodeKind>) -> Option<Mirror> {
        use RelationField as F;
        let (source, target) = match self {
            Self::Connected => (F::ConnectedTo, F::ConnectedBy),
            Self::Fulfilled => (F::Fulfills, F::FulfilledBy),
            Self::Part => (F::DirectParts, F::DirectPartOf),
            Self::Transfer => (F::TransfersTo, F::TransferedBy),
            Self::Topology => match target {
                Some(NodeKind::Terminal) => (F::Terminals, F::TerminalOf),
                _ => (F::Children, F::Parent),
            },
            Self::Specialization | Self::Proxy | Self::Projection | Self::Equality => return None,
        };
        Some(Mirror { source, target })
    }
}
