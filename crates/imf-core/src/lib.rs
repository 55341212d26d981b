//! IMF Core - Relational graph integrity engine for IMF diagrams.
//!
//! Nodes carry their relations twice: once in the edge list and once in
//! node-local relation fields. This crate keeps the two in agreement through
//! validation, edge lifecycle events and cascading node deletion.

pub mod cascade;
pub mod document;
pub mod edit;
pub mod error;
pub mod graph;
pub mod relations;
pub mod remote;
pub mod validate;

pub use cascade::{delete_node, delete_node_local, CascadeReport};
pub use error::{ImfError, ImfResult};
pub use graph::model::{
    Edge, EdgeData, EdgeKind, Node, NodeData, NodeKind, NodeMeta, Position, Reference, RelationSet,
};
pub use graph::schema::{Cardinality, RelationField};
pub use graph::Graph;
pub use relations::{
    apply_edge_created, apply_edge_removed, audit, DanglingReference, Inconsistency,
    RelationOutcome,
};
pub use remote::{Detached, MemoryRemote, RemoteFailure, RemoteOperation, RemoteStore};
pub use validate::{validate, validate_all, Validated, Violation};

#[cfg(test)]
pub(crate) mod testing {
    use crate::graph::model::{Edge, EdgeData, EdgeKind, Node, NodeKind, Position};

    pub fn block(id: &str) -> Node {
        Node::new(id, NodeKind::Block, Position::default())
    }

    pub fn connector(id: &str) -> Node {
        Node::new(id, NodeKind::Connector, Position::default())
    }

    pub fn terminal(id: &str) -> Node {
        Node::new(id, NodeKind::Terminal, Position::default())
    }

    pub fn edge(id: &str, source: &str, target: &str, kind: EdgeKind) -> Edge {
        Edge {
            id: id.to_string(),
            source: source.to_string(),
            source_handle: "out".to_string(),
            target: target.to_string(),
            target_handle: "in".to_string(),
            kind,
            data: EdgeData {
                id: id.to_string(),
                created_at: 1,
                updated_at: 1,
                lock_connection: false,
                label: kind.to_string(),
                created_by: "tester".to_string(),
            },
        }
    }
}
