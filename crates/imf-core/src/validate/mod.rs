//! Import validation.
//!
//! Checks an untrusted `{ nodes, edges }` document for structural
//! completeness, fills in kind-specific sizes, and decodes it into a
//! [`Graph`]. Only presence is checked here: whether relation fields agree
//! with the edge list is the concern of [`crate::relations::audit`].

pub mod model;

use std::collections::HashSet;

use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use crate::graph::model::{Edge, EdgeKind, Node, NodeKind};
use crate::graph::schema::{Cardinality, RelationField};
use crate::graph::Graph;
use crate::relations::DanglingReference;
pub use model::{Entity, Validated, Violation, MISSING_ID};

/// Validate a document, stopping at the first violation.
pub fn validate(document: &Value) -> Result<Validated, Violation> {
    run(document, Mode::FailFast).map_err(|mut found| found.remove(0))
}

/// Validate a document, collecting every per-entity violation in the order
/// they are encountered. A malformed top-level shape still aborts with a
/// single violation.
pub fn validate_all(document: &Value) -> Result<Validated, Vec<Violation>> {
    run(document, Mode::Aggregate)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    FailFast,
    Aggregate,
}

/// Returned by a check when validation must stop.
struct Halt;

type Step = Result<(), Halt>;

struct Sink {
    mode: Mode,
    found: Vec<Violation>,
}

impl Sink {
    fn push(&mut self, violation: Violation) -> Step {
        self.found.push(violation);
        match self.mode {
            Mode::FailFast => Err(Halt),
            Mode::Aggregate => Ok(()),
        }
    }
}

fn run(document: &Value, mode: Mode) -> Result<Validated, Vec<Violation>> {
    let mut nodes = collection(document, "nodes")?;
    let edges = collection(document, "edges")?;

    let mut sink = Sink { mode, found: Vec::new() };
    let mut defaulted = 0;

    let checked = check_all(&mut nodes, &edges, &mut sink, &mut defaulted);
    if checked.is_err() || !sink.found.is_empty() {
        warn!(violations = sink.found.len(), "Document rejected");
        return Err(sink.found);
    }

    let graph = match decode(nodes, edges, &mut sink) {
        Ok(graph) if sink.found.is_empty() => graph,
        _ => {
            warn!(violations = sink.found.len(), "Document rejected");
            return Err(sink.found);
        }
    };
    if check_unique(&graph, &mut sink).is_err() || !sink.found.is_empty() {
        warn!(violations = sink.found.len(), "Document rejected");
        return Err(sink.found);
    }

    let dangling = find_dangling(&graph);
    for reference in &dangling {
        warn!(
            entity = %reference.entity_id,
            field = reference.field,
            missing = %reference.missing,
            "Dangling reference in document"
        );
    }

    info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        defaulted,
        "Document validated"
    );

    Ok(Validated {
        graph,
        dangling,
        defaulted,
    })
}

/// Take a top-level array, or fail the whole document.
fn collection(document: &Value, name: &'static str) -> Result<Vec<Value>, Vec<Violation>> {
    match document.get(name) {
        Some(Value::Array(items)) => Ok(items.clone()),
        _ => Err(vec![Violation::DocumentShape { collection: name }]),
    }
}

fn check_all(
    nodes: &mut [Value],
    edges: &[Value],
    sink: &mut Sink,
    defaulted: &mut usize,
) -> Step {
    for node in nodes.iter_mut() {
        check_node(node, sink, defaulted)?;
    }
    for edge in edges.iter() {
        check_edge(edge, sink)?;
    }
    Ok(())
}

fn id_of(entity: &Value) -> String {
    match entity.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => MISSING_ID.to_string(),
    }
}

fn is_present_str(value: Option<&Value>) -> bool {
    matches!(value, Some(Value::String(s)) if !s.is_empty())
}

fn check_node(node: &mut Value, sink: &mut Sink, defaulted: &mut usize) -> Step {
    let id = id_of(node);
    let Some(object) = node.as_object_mut() else {
        return sink.push(Violation::InvalidField {
            entity: Entity::Node,
            id,
            field: "node",
            reason: "expected an object".to_string(),
        });
    };

    let kind = match object.get("type").and_then(Value::as_str) {
        Some(tag) => match NodeKind::parse(tag) {
            Some(kind) => kind,
            None => {
                return sink.push(Violation::InvalidField {
                    entity: Entity::Node,
                    id,
                    field: "type",
                    reason: format!("unknown node type '{}'", tag),
                })
            }
        },
        None => {
            return sink.push(Violation::MissingRequiredField {
                entity: Entity::Node,
                id,
                field: "type",
            })
        }
    };
    let entity = Entity::Typed(kind);

    match object.get("data") {
        Some(Value::Object(data)) => {
            for field in kind.relation_fields() {
                check_relation_field(data, kind, *field, &id, sink)?;
            }
        }
        _ => {
            return sink.push(Violation::MissingRequiredField {
                entity,
                id,
                field: "data",
            })
        }
    }

    // Height is filled before width; both may be defaulted in one pass.
    let size = kind.default_size();
    for (key, default) in [("height", size.height), ("width", size.width)] {
        match object.get(key) {
            None | Some(Value::Null) => {}
            Some(Value::Number(n)) if n.as_f64() != Some(0.0) => continue,
            Some(Value::Number(_)) => {}
            Some(_) => {
                sink.push(Violation::InvalidField {
                    entity,
                    id: id.clone(),
                    field: key,
                    reason: "expected a number".to_string(),
                })?;
                continue;
            }
        }
        object.insert(key.to_string(), Value::from(default));
        *defaulted += 1;
        debug!(node_id = %id, key, default, "Applied default size");
    }

    let position = object.get("position");
    for (axis, field) in [("x", "position.x"), ("y", "position.y")] {
        match position.and_then(|p| p.get(axis)) {
            Some(Value::Number(_)) => {}
            None | Some(Value::Null) => sink.push(Violation::MissingRequiredField {
                entity,
                id: id.clone(),
                field,
            })?,
            Some(_) => sink.push(Violation::InvalidField {
                entity,
                id: id.clone(),
                field,
                reason: "expected a number".to_string(),
            })?,
        }
    }

    if !is_present_str(object.get("id")) {
        sink.push(Violation::MissingRequiredField {
            entity,
            id,
            field: "id",
        })?;
    }

    Ok(())
}

fn check_relation_field(
    data: &Map<String, Value>,
    kind: NodeKind,
    field: RelationField,
    id: &str,
    sink: &mut Sink,
) -> Step {
    let missing = || Violation::MissingRelationField {
        node_id: id.to_string(),
        kind,
        field: field.wire_name(),
    };
    let invalid = |reason: &str| Violation::InvalidField {
        entity: Entity::Typed(kind),
        id: id.to_string(),
        field: field.wire_name(),
        reason: reason.to_string(),
    };

    match (field.cardinality(), data.get(field.wire_name())) {
        (_, None) | (_, Some(Value::Null)) => sink.push(missing()),
        (Cardinality::Set, Some(Value::Array(items))) => {
            if items.iter().all(Value::is_string) {
                Ok(())
            } else {
                sink.push(invalid("expected an array of node ids"))
            }
        }
        (Cardinality::Set, Some(_)) => sink.push(invalid("expected an array of node ids")),
        // `parent` must name something, even if only the sentinel.
        (Cardinality::Single, Some(Value::String(s)))
            if s.is_empty() && field == RelationField::Parent =>
        {
            sink.push(missing())
        }
        (Cardinality::Single, Some(Value::String(_))) => Ok(()),
        (Cardinality::Single, Some(_)) => sink.push(invalid("expected a node id or \"none\"")),
    }
}

fn check_edge(edge: &Value, sink: &mut Sink) -> Step {
    let id = id_of(edge);
    let missing = |field: &'static str| Violation::MissingRequiredField {
        entity: Entity::Edge,
        id: id.clone(),
        field,
    };

    if !edge.is_object() {
        return sink.push(Violation::InvalidField {
            entity: Entity::Edge,
            id: id.clone(),
            field: "edge",
            reason: "expected an object".to_string(),
        });
    }

    for field in ["source", "target"] {
        if !is_present_str(edge.get(field)) {
            sink.push(missing(field))?;
        }
    }
    if id == MISSING_ID {
        sink.push(missing("id"))?;
    }

    match edge.get("type").and_then(Value::as_str) {
        Some(tag) if !tag.is_empty() => {
            if EdgeKind::parse(tag).is_none() {
                sink.push(Violation::InvalidField {
                    entity: Entity::Edge,
                    id: id.clone(),
                    field: "type",
                    reason: format!("unknown edge type '{}'", tag),
                })?;
            }
        }
        _ => sink.push(missing("type"))?,
    }

    for field in ["sourceHandle", "targetHandle"] {
        if !is_present_str(edge.get(field)) {
            sink.push(missing(field))?;
        }
    }

    let Some(data) = edge.get("data").and_then(Value::as_object) else {
        return sink.push(missing("data"));
    };

    for (key, field) in [("createdAt", "data.createdAt"), ("updatedAt", "data.updatedAt")] {
        let stamped = data
            .get(key)
            .and_then(Value::as_f64)
            .is_some_and(|ms| ms != 0.0);
        if !stamped {
            sink.push(missing(field))?;
        }
    }
    if !is_present_str(data.get("createdBy")) {
        sink.push(missing("data.createdBy"))?;
    }
    if !is_present_str(data.get("label")) {
        sink.push(missing("data.label"))?;
    }
    match data.get("lockConnection") {
        Some(Value::Bool(_)) => {}
        None | Some(Value::Null) => sink.push(missing("data.lockConnection"))?,
        Some(_) => sink.push(Violation::InvalidField {
            entity: Entity::Edge,
            id: id.clone(),
            field: "data.lockConnection",
            reason: "expected a boolean".to_string(),
        })?,
    }

    Ok(())
}

/// Decode checked entities into typed values.
fn decode(nodes: Vec<Value>, edges: Vec<Value>, sink: &mut Sink) -> Result<Graph, Halt> {
    let mut graph = Graph::new();

    for raw in nodes {
        let id = id_of(&raw);
        let entity = raw
            .get("type")
            .and_then(Value::as_str)
            .and_then(NodeKind::parse)
            .map_or(Entity::Node, Entity::Typed);
        match serde_json::from_value::<Node>(raw) {
            Ok(node) => graph.nodes.push(node),
            Err(e) => sink.push(Violation::InvalidField {
                entity,
                id,
                field: "data",
                reason: e.to_string(),
            })?,
        }
    }

    for raw in edges {
        let id = id_of(&raw);
        match serde_json::from_value::<Edge>(raw) {
            Ok(edge) => graph.edges.push(edge),
            Err(e) => sink.push(Violation::InvalidField {
                entity: Entity::Edge,
                id,
                field: "data",
                reason: e.to_string(),
            })?,
        }
    }

    Ok(graph)
}

fn check_unique(graph: &Graph, sink: &mut Sink) -> Step {
    let mut seen = HashSet::new();
    for node in &graph.nodes {
        if !seen.insert(node.id.as_str()) {
            sink.push(Violation::DuplicateId {
                entity: Entity::Typed(node.kind()),
                id: node.id.clone(),
            })?;
        }
    }

    let mut seen = HashSet::new();
    for edge in &graph.edges {
        if !seen.insert(edge.id.as_str()) {
            sink.push(Violation::DuplicateId {
                entity: Entity::Edge,
                id: edge.id.clone(),
            })?;
        }
    }

    Ok(())
}

/// References from edges and single-reference fields to absent node ids.
pub fn find_dangling(graph: &Graph) -> Vec<DanglingReference> {
    let ids: HashSet<&str> = graph.nodes.iter().map(|n| n.id.as_str()).collect();
    let mut dangling = Vec::new();

    for edge in &graph.edges {
        for (field, endpoint) in [("source", &edge.source), ("target", &edge.target)] {
            if !ids.contains(endpoint.as_str()) {
                dangling.push(DanglingReference::new(&edge.id, field, endpoint));
            }
        }
    }

    for node in &graph.nodes {
        for field in [RelationField::Parent, RelationField::DirectPartOf, RelationField::TerminalOf] {
            if let Some(target) = node.data.reference(field).and_then(|r| r.node_id()) {
                if !ids.contains(target) {
                    dangling.push(DanglingReference::new(&node.id, field.wire_name(), target));
                }
            }
        }
    }

    dangling
}
