//! The diagram graph: the caller-owned node and edge collections.

pub mod model;
pub mod schema;

use serde::{Deserialize, Serialize};

use crate::error::{ImfError, ImfResult};
use model::{Edge, Node};

/// A diagram graph in document form.
///
/// The surrounding application holds the single authoritative value and
/// threads it through every engine operation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_parts(nodes: Vec<Node>, edges: Vec<Edge>) -> Self {
        Self { nodes, edges }
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn node_mut(&mut self, id: &str) -> Option<&mut Node> {
        self.nodes.iter_mut().find(|n| n.id == id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.node(id).is_some()
    }

    pub fn edge(&self, id: &str) -> Option<&Edge> {
        self.edges.iter().find(|e| e.id == id)
    }

    /// Every edge with `node_id` as source or target, in edge-list order.
    pub fn connected_edges(&self, node_id: &str) -> Vec<Edge> {
        self.edges
            .iter()
            .filter(|e| e.touches(node_id))
            .cloned()
            .collect()
    }

    /// Add a node, rejecting a duplicate id.
    pub fn insert_node(&mut self, node: Node) -> ImfResult<()> {
        if self.contains_node(&node.id) {
            return Err(ImfError::DuplicateNode(node.id));
        }
        self.nodes.push(node);
        Ok(())
    }

    /// Add an edge, rejecting a duplicate id.
    pub fn insert_edge(&mut self, edge: Edge) -> ImfResult<()> {
        if self.edge(&edge.id).is_some() {
            return Err(ImfError::DuplicateEdge(edge.id));
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Replace the node with the same id; returns the previous value.
    pub fn replace_node(&mut self, node: Node) -> Option<Node> {
        let slot = self.node_mut(&node.id)?;
        Some(std::mem::replace(slot, node))
    }

    /// Replace the edge with id `id`; the new edge may carry a new id.
    pub fn replace_edge(&mut self, id: &str, edge: Edge) -> Option<Edge> {
        let slot = self.edges.iter_mut().find(|e| e.id == id)?;
        Some(std::mem::replace(slot, edge))
    }

    pub fn remove_node(&mut self, id: &str) -> Option<Node> {
        let index = self.nodes.iter().position(|n| n.id == id)?;
        Some(self.nodes.remove(index))
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<Edge> {
        let index = self.edges.iter().position(|e| e.id == id)?;
        Some(self.edges.remove(index))
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{block, edge};
    use model::EdgeKind;

    #[test]
    fn test_connected_edges_keeps_list_order() {
        let graph = Graph::from_parts(
            vec![block("a"), block("b"), block("c")],
            vec![
                edge("e1", "b", "a", EdgeKind::Connected),
                edge("e2", "b", "c", EdgeKind::Part),
                edge("e3", "a", "c", EdgeKind::Fulfilled),
            ],
        );
        let ids: Vec<_> = graph.connected_edges("a").into_iter().map(|e| e.id).collect();
        assert_eq!(ids, vec!["e1", "e3"]);
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let mut graph = Graph::new();
        graph.insert_node(block("a")).unwrap();
        assert!(matches!(
            graph.insert_node(block("a")),
            Err(ImfError::DuplicateNode(id)) if id == "a"
        ));

        graph.insert_edge(edge("e1", "a", "a", EdgeKind::Proxy)).unwrap();
        assert!(graph.insert_edge(edge("e1", "a", "a", EdgeKind::Proxy)).is_err());
    }

    #[test]
    fn test_remove_returns_record() {
        let mut graph = Graph::from_parts(vec![block("a")], vec![]);
        assert_eq!(graph.remove_node("a").map(|n| n.id), Some("a".to_string()));
        assert!(graph.remove_node("a").is_none());
        assert!(graph.is_empty());
    }
}
