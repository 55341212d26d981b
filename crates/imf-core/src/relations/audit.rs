//! Consistency audit between node relation fields and the edge list.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::graph::schema::RelationField;
use crate::graph::Graph;

/// A disagreement between a node's relation fields and the edges present.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inconsistency {
    /// An edge whose endpoint does not record it.
    MissingMirror {
        edge_id: String,
        node_id: String,
        field: String,
        other: String,
    },
    /// A relation entry with no edge behind it.
    OrphanEntry {
        node_id: String,
        field: String,
        other: String,
    },
}

impl fmt::Display for Inconsistency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingMirror {
                edge_id,
                node_id,
                field,
                other,
            } => write!(f, "edge {} expects {}.{} to contain {}", edge_id, node_id, field, other),
            Self::OrphanEntry {
                node_id,
                field,
                other,
            } => write!(f, "{}.{} references {} but no edge backs it", node_id, field, other),
        }
    }
}

/// Check every mirrored edge against its endpoints, and every relation
/// entry against the edge list.
pub fn audit(graph: &Graph) -> Vec<Inconsistency> {
    let mut expected: HashSet<(&str, RelationField, &str)> = HashSet::new();
    let mut found = Vec::new();

    for edge in &graph.edges {
        let target_kind = graph.node(&edge.target).map(|n| n.kind());
        let Some(mirror) = edge.kind.mirror(target_kind) else {
            continue;
        };

        for (node_id, field, other) in [
            (edge.source.as_str(), mirror.source, edge.target.as_str()),
            (edge.target.as_str(), mirror.target, edge.source.as_str()),
        ] {
            let Some(node) = graph.node(node_id) else {
                continue;
            };
            if !node.data.has_field(field) {
                continue;
            }
            expected.insert((node_id, field, other));
            if !node.related_ids(field).contains(&other) {
                found.push(Inconsistency::MissingMirror {
                    edge_id: edge.id.clone(),
                    node_id: node_id.to_string(),
                    field: field.wire_name().to_string(),
                    other: other.to_string(),
                });
            }
        }
    }

    for node in &graph.nodes {
        for field in node.kind().relation_fields() {
            for other in node.related_ids(*field) {
                if !expected.contains(&(node.id.as_str(), *field, other)) {
                    found.push(Inconsistency::OrphanEntry {
                        node_id: node.id.clone(),
                        field: field.wire_name().to_string(),
                        other: other.to_string(),
                    });
                }
            }
        }
    }

    found
}
