//! Cascade deletion of a node and every edge touching it.

use serde::Serialize;
use tracing::{info, warn};

use crate::edit::{sync_touched, EdgeChange};
use crate::error::{ImfError, ImfResult};
use crate::graph::model::Edge;
use crate::graph::Graph;
use crate::relations::{unlink_edge, DanglingReference};
use crate::remote::{RemoteFailure, RemoteStore};

/// Outcome of a cascading node deletion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CascadeReport {
    pub node_id: String,
    /// Connected edges removed, in processing order.
    pub deleted_edges: Vec<String>,
    /// Remote calls that failed along the way; local cleanup ran regardless.
    #[serde(skip)]
    pub failures: Vec<RemoteFailure>,
    pub dangling: Vec<DanglingReference>,
}

impl CascadeReport {
    /// Whether every remote call succeeded.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Delete a node after driving each connected edge through edge deletion.
///
/// Edges are processed one at a time in edge-list order. A failed remote
/// call is recorded and the cascade moves on; the node is removed locally
/// even if its own remote delete fails.
pub async fn delete_node(
    graph: &mut Graph,
    remote: &dyn RemoteStore,
    node_id: &str,
) -> ImfResult<CascadeReport> {
    if !graph.contains_node(node_id) {
        return Err(ImfError::NodeNotFound(node_id.to_string()));
    }

    let connected = graph.connected_edges(node_id);
    info!(node_id, edges = connected.len(), "Deleting node");

    let mut report = CascadeReport {
        node_id: node_id.to_string(),
        ..CascadeReport::default()
    };

    for edge in &connected {
        let deletion = drop_edge(graph, remote, edge, Some(node_id)).await;
        report.deleted_edges.push(deletion.edge.id);
        report.failures.extend(deletion.failures);
        report.dangling.extend(deletion.outcome.dangling);
    }

    if let Err(failure) = remote.delete_node(node_id).await {
        warn!(node_id, error = %failure, "Remote node delete failed");
        report.failures.push(failure);
    }
    graph.remove_node(node_id);

    info!(
        node_id,
        deleted_edges = report.deleted_edges.len(),
        failures = report.failures.len(),
        "Node deleted"
    );
    Ok(report)
}

/// Delete a node and its connected edges without any remote calls.
///
/// Returns the ids of the removed edges.
pub fn delete_node_local(graph: &mut Graph, node_id: &str) -> ImfResult<Vec<String>> {
    if !graph.contains_node(node_id) {
        return Err(ImfError::NodeNotFound(node_id.to_string()));
    }

    let mut deleted = Vec::new();
    for edge in graph.connected_edges(node_id) {
        unlink_edge(graph, &edge, Some(node_id));
        deleted.push(edge.id);
    }
    graph.remove_node(node_id);
    Ok(deleted)
}

/// The single-edge deletion path shared by edge and node deletion.
///
/// The remote delete is attempted first. Relation cleanup and removal from
/// the edge list always follow, then changed nodes are pushed remotely.
pub(crate) async fn drop_edge(
    graph: &mut Graph,
    remote: &dyn RemoteStore,
    edge: &Edge,
    deleting: Option<&str>,
) -> EdgeChange {
    let mut failures = Vec::new();
    if let Err(failure) = remote.delete_edge(&edge.id).await {
        warn!(edge_id = %edge.id, error = %failure, "Remote edge delete failed, cleaning up locally");
        failures.push(failure);
    }

    let outcome = unlink_edge(graph, edge, deleting);
    failures.extend(sync_touched(graph, remote, &outcome.touched).await);

    EdgeChange {
        edge: edge.clone(),
        outcome,
        failures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::EdgeKind;
    use crate::graph::schema::RelationField;
    use crate::relations::{apply_edge_created, audit};
    use crate::remote::{MemoryRemote, RemoteOperation};
    use crate::testing::{block, edge, terminal};

    fn wired(nodes: Vec<crate::graph::model::Node>, edges: Vec<Edge>) -> Graph {
        let mut graph = Graph::from_parts(nodes, vec![]);
        for e in edges {
            apply_edge_created(&mut graph, &e);
            graph.insert_edge(e).unwrap();
        }
        graph
    }

    fn star() -> Graph {
        wired(
            vec![block("a"), block("b"), block("c"), terminal("t")],
            vec![
                edge("e1", "a", "b", EdgeKind::Connected),
                edge("e2", "c", "a", EdgeKind::Fulfilled),
                edge("e3", "b", "c", EdgeKind::Part),
                edge("e4", "a", "t", EdgeKind::Topology),
                edge("e5", "b", "a", EdgeKind::Part),
            ],
        )
    }

    #[tokio::test]
    async fn test_cascade_removes_every_trace_of_node() {
        let mut graph = star();
        let remote = MemoryRemote::with_graph(graph.clone());

        let report = delete_node(&mut graph, &remote, "a").await.unwrap();

        assert_eq!(report.deleted_edges, vec!["e1", "e2", "e4", "e5"]);
        assert!(report.is_clean());
        assert!(graph.node("a").is_none());
        assert!(graph.edges.iter().all(|e| !e.touches("a")));
        for node in &graph.nodes {
            for field in node.kind().relation_fields() {
                assert!(!node.related_ids(*field).contains(&"a"), "{}.{}", node.id, field);
            }
        }
        assert!(audit(&graph).is_empty());
        assert_eq!(remote.snapshot().nodes.len(), 3);
    }

    #[tokio::test]
    async fn test_cascade_continues_past_remote_failure() {
        let mut graph = star();
        let remote = MemoryRemote::with_graph(graph.clone());
        remote.fail_on(RemoteOperation::DeleteEdge, "e2");
        remote.fail_all(RemoteOperation::DeleteNode);

        let report = delete_node(&mut graph, &remote, "a").await.unwrap();

        assert_eq!(report.deleted_edges.len(), 4);
        assert_eq!(report.failures.len(), 2);
        assert_eq!(report.failures[0].id.as_deref(), Some("e2"));
        assert!(graph.edge("e2").is_none());
        assert!(graph.node("c").unwrap().related_ids(RelationField::Fulfills).is_empty());
        assert!(graph.node("a").is_none());
    }

    #[tokio::test]
    async fn test_unknown_node_leaves_graph_untouched() {
        let mut graph = star();
        let before = graph.clone();
        let remote = MemoryRemote::new();

        let err = delete_node(&mut graph, &remote, "ghost").await.unwrap_err();
        assert!(matches!(err, ImfError::NodeNotFound(id) if id == "ghost"));
        assert_eq!(graph, before);
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_touched_nodes_pushed_remotely() {
        let mut graph = wired(
            vec![block("a"), block("b")],
            vec![edge("e1", "a", "b", EdgeKind::Connected)],
        );
        let remote = MemoryRemote::with_graph(graph.clone());

        delete_node(&mut graph, &remote, "a").await.unwrap();

        let pushed = remote.snapshot();
        let b = pushed.node("b").unwrap();
        assert!(b.related_ids(RelationField::ConnectedBy).is_empty());
    }

    #[test]
    fn test_local_cascade() {
        let mut graph = star();
        let deleted = delete_node_local(&mut graph, "b").unwrap();

        assert_eq!(deleted, vec!["e1", "e3", "e5"]);
        assert!(graph.node("b").is_none());
        assert!(graph.node("a").unwrap().related_ids(RelationField::ConnectedTo).is_empty());
        assert!(graph.node("a").unwrap().related_ids(RelationField::DirectPartOf).is_empty());
        assert!(audit(&graph).is_empty());
    }
}
