//! Relation maintenance.
//!
//! Keeps node-local relation fields in step with edge lifecycle events. An
//! edge update is expressed as [`apply_edge_removed`] on the old edge
//! followed by [`apply_edge_created`] on the new one.

pub mod audit;

use std::fmt;

use serde::Serialize;
use tracing::{debug, warn};

use crate::graph::model::Edge;
use crate::graph::schema::{Cardinality, RelationField};
use crate::graph::Graph;
pub use audit::{audit, Inconsistency};

/// A reference from an entity to a node id absent from the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DanglingReference {
    /// Edge or node holding the reference.
    pub entity_id: String,
    /// Field holding the reference (`source`, `target`, `directPartOf`, ...).
    pub field: &'static str,
    /// The id that could not be resolved.
    pub missing: String,
}

impl DanglingReference {
    pub fn new(entity_id: &str, field: &'static str, missing: &str) -> Self {
        Self {
            entity_id: entity_id.to_string(),
            field,
            missing: missing.to_string(),
        }
    }
}

impl fmt::Display for DanglingReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{} -> {}", self.entity_id, self.field, self.missing)
    }
}

/// What a single edge event changed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RelationOutcome {
    /// Ids of nodes whose relation fields changed, source side first.
    pub touched: Vec<String>,
    /// Endpoints that could not be found in the graph.
    pub dangling: Vec<DanglingReference>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    Attach,
    Detach,
}

/// Mirror a newly created edge into its endpoints' relation fields.
///
/// Idempotent: ids already present are not added twice.
pub fn apply_edge_created(graph: &mut Graph, edge: &Edge) -> RelationOutcome {
    mirror(graph, edge, Action::Attach, None)
}

/// Undo the mirror of a removed edge.
///
/// `deleting` names a node that is about to be removed as a whole; its own
/// fields are left alone. Single references are reset to `"none"` only when
/// they still point at the other endpoint.
pub fn apply_edge_removed(graph: &mut Graph, edge: &Edge, deleting: Option<&str>) -> RelationOutcome {
    mirror(graph, edge, Action::Detach, deleting)
}

/// Remove an edge from the edge list after undoing its mirror.
pub fn unlink_edge(graph: &mut Graph, edge: &Edge, deleting: Option<&str>) -> RelationOutcome {
    let outcome = apply_edge_removed(graph, edge, deleting);
    graph.remove_edge(&edge.id);
    outcome
}

/// One endpoint's share of an edge event, resolved before anything changes.
struct Side<'a> {
    node_id: &'a str,
    field: RelationField,
    other: &'a str,
}

fn mirror(graph: &mut Graph, edge: &Edge, action: Action, deleting: Option<&str>) -> RelationOutcome {
    let mut outcome = RelationOutcome::default();

    let source_kind = graph.node(&edge.source).map(|n| n.kind());
    let target_kind = graph.node(&edge.target).map(|n| n.kind());
    if source_kind.is_none() {
        outcome
            .dangling
            .push(DanglingReference::new(&edge.id, "source", &edge.source));
    }
    if target_kind.is_none() {
        outcome
            .dangling
            .push(DanglingReference::new(&edge.id, "target", &edge.target));
    }
    for reference in &outcome.dangling {
        warn!(edge_id = %edge.id, missing = %reference.missing, "Edge endpoint not in graph");
    }

    let Some(mirror) = edge.kind.mirror(target_kind) else {
        debug!(edge_id = %edge.id, kind = %edge.kind, "Pass-through edge, no relation fields");
        return outcome;
    };

    // Both sides are resolved first so the two writes below cannot fail
    // halfway through.
    let sides: Vec<Side> = [
        Side {
            node_id: &edge.source,
            field: mirror.source,
            other: &edge.target,
        },
        Side {
            node_id: &edge.target,
            field: mirror.target,
            other: &edge.source,
        },
    ]
    .into_iter()
    .filter(|side| deleting != Some(side.node_id))
    .filter(|side| {
        let carries = graph
            .node(side.node_id)
            .is_some_and(|n| n.data.has_field(side.field));
        if !carries && graph.contains_node(side.node_id) {
            debug!(node_id = side.node_id, field = %side.field, "Node has no such field, side skipped");
        }
        carries
    })
    .filter(|side| {
        if action == Action::Attach || !held_by_other_edge(graph, edge, side) {
            return true;
        }
        debug!(node_id = side.node_id, field = %side.field, "Relation still held by a parallel edge, side skipped");
        false
    })
    .collect();

    for side in sides {
        if write_side(graph, &side, action) && !outcome.touched.iter().any(|id| id == side.node_id) {
            outcome.touched.push(side.node_id.to_string());
        }
    }

    outcome
}

/// Whether an edge other than `edge` mirrors onto the same node, field and
/// counterpart as `side`.
fn held_by_other_edge(graph: &Graph, edge: &Edge, side: &Side) -> bool {
    graph.edges.iter().filter(|other| other.id != edge.id).any(|other| {
        let target_kind = graph.node(&other.target).map(|n| n.kind());
        let Some(mirror) = other.kind.mirror(target_kind) else {
            return false;
        };
        (other.source == side.node_id && other.target == side.other && mirror.source == side.field)
            || (other.target == side.node_id
                && other.source == side.other
                && mirror.target == side.field)
    })
}

/// Apply one side of an edge event; returns whether the node changed.
fn write_side(graph: &mut Graph, side: &Side, action: Action) -> bool {
    let Some(node) = graph.node_mut(side.node_id) else {
        return false;
    };

    let changed = match (side.field.cardinality(), action) {
        (Cardinality::Set, Action::Attach) => node
            .data
            .relation_set_mut(side.field)
            .is_some_and(|set| set.insert(side.other)),
        (Cardinality::Set, Action::Detach) => node
            .data
            .relation_set_mut(side.field)
            .is_some_and(|set| set.remove(side.other)),
        (Cardinality::Single, Action::Attach) => match node.data.reference_mut(side.field) {
            Some(reference) if !reference.points_to(side.other) => {
                *reference = side.other.into();
                true
            }
            _ => false,
        },
        (Cardinality::Single, Action::Detach) => match node.data.reference_mut(side.field) {
            Some(reference) if reference.points_to(side.other) => {
                *reference = Default::default();
                true
            }
            _ => false,
        },
    };

    if changed {
        debug!(
            node_id = side.node_id,
            field = %side.field,
            other = side.other,
            action = ?action,
            "Relation field updated"
        );
    }
    changed
}
