//! Edit operations on the caller-owned graph.
//!
//! Each operation goes through the [`RemoteStore`] first and only then
//! commits locally, except deletion, where local cleanup always runs.

pub mod model;

use serde_json::Value;
use tracing::{info, warn};

use crate::cascade::drop_edge;
use crate::error::{ImfError, ImfResult};
use crate::graph::model::{now_millis, Edge, Node};
use crate::graph::Graph;
use crate::relations::{apply_edge_created, apply_edge_removed, DanglingReference, RelationOutcome};
use crate::remote::{RemoteFailure, RemoteStore};
use crate::validate::{self, Entity, Violation};
pub use model::{EdgeChange, EdgePatch, ImportReport, NodePatch};

/// Create a node remotely, then add the stored copy to the graph.
pub async fn create_node(graph: &mut Graph, remote: &dyn RemoteStore, mut node: Node) -> ImfResult<Node> {
    if graph.contains_node(&node.id) {
        return Err(ImfError::DuplicateNode(node.id));
    }

    let meta = node.data.meta_mut();
    if meta.created_at == 0 {
        meta.created_at = now_millis();
    }
    meta.updated_at = meta.created_at;

    let stored = remote.create_node(&node).await?;
    graph.insert_node(stored.clone())?;
    info!(node_id = %stored.id, kind = %stored.kind(), "Node created");
    Ok(stored)
}

/// Apply a patch to a node's descriptive data and stamp `updatedAt`.
pub async fn update_node(
    graph: &mut Graph,
    remote: &dyn RemoteStore,
    node_id: &str,
    patch: &NodePatch,
) -> ImfResult<Node> {
    let mut node = graph
        .node(node_id)
        .cloned()
        .ok_or_else(|| ImfError::NodeNotFound(node_id.to_string()))?;

    let meta = node.data.meta_mut();
    patch.apply(meta);
    meta.updated_at = now_millis();

    let stored = remote.update_node(&node).await?;
    graph.replace_node(stored.clone());
    info!(node_id, "Node updated");
    Ok(stored)
}

/// Create an edge remotely, then record it and mirror it into its endpoints.
pub async fn create_edge(graph: &mut Graph, remote: &dyn RemoteStore, edge: Edge) -> ImfResult<EdgeChange> {
    if graph.edge(&edge.id).is_some() {
        return Err(ImfError::DuplicateEdge(edge.id));
    }
    check_edge(graph, &edge)?;

    let stored = remote.create_edge(&edge).await?;
    graph.insert_edge(stored.clone())?;
    let outcome = apply_edge_created(graph, &stored);
    let failures = sync_touched(graph, remote, &outcome.touched).await;

    info!(
        edge_id = %stored.id,
        kind = %stored.kind,
        source = %stored.source,
        target = %stored.target,
        "Edge created"
    );
    Ok(EdgeChange {
        edge: stored,
        outcome,
        failures,
    })
}

/// Update an edge; a retype or move is the old edge removed and the new one
/// created.
pub async fn update_edge(
    graph: &mut Graph,
    remote: &dyn RemoteStore,
    edge_id: &str,
    patch: &EdgePatch,
) -> ImfResult<EdgeChange> {
    let old = graph
        .edge(edge_id)
        .cloned()
        .ok_or_else(|| ImfError::EdgeNotFound(edge_id.to_string()))?;

    let mut next = patch.apply(&old);
    next.data.updated_at = now_millis();
    check_edge(graph, &next)?;

    let stored = remote.update_edge(&next).await?;

    let removed = apply_edge_removed(graph, &old, None);
    graph.replace_edge(edge_id, stored.clone());
    let created = apply_edge_created(graph, &stored);
    let outcome = merge(removed, created);
    let failures = sync_touched(graph, remote, &outcome.touched).await;

    info!(edge_id, kind = %stored.kind, rewired = patch.rewires(), "Edge updated");
    Ok(EdgeChange {
        edge: stored,
        outcome,
        failures,
    })
}

/// Delete an edge. Relation cleanup runs whether or not the remote delete
/// succeeds; a failure is reported in the result.
pub async fn delete_edge(graph: &mut Graph, remote: &dyn RemoteStore, edge_id: &str) -> ImfResult<EdgeChange> {
    let edge = graph
        .edge(edge_id)
        .cloned()
        .ok_or_else(|| ImfError::EdgeNotFound(edge_id.to_string()))?;

    let change = drop_edge(graph, remote, &edge, None).await;
    info!(edge_id, failures = change.failures.len(), "Edge deleted");
    Ok(change)
}

/// Validate a document, upload it, then refresh the graph from the remote.
///
/// If the refresh fails the validated nodes and edges are merged into the
/// local graph instead, replacing any with the same id.
pub async fn import_document(
    graph: &mut Graph,
    remote: &dyn RemoteStore,
    document: &Value,
) -> ImfResult<ImportReport> {
    let validated = validate::validate(document)?;
    let imported = validated.graph;

    remote.upload_nodes(&imported.nodes).await?;
    remote.upload_edges(&imported.edges).await?;

    let mut report = ImportReport {
        nodes: imported.nodes.len(),
        edges: imported.edges.len(),
        defaulted: validated.defaulted,
        dangling: validated.dangling,
        refreshed: false,
    };

    match remote.fetch_graph().await {
        Ok(fetched) => {
            *graph = fetched;
            report.refreshed = true;
        }
        Err(failure) => {
            warn!(error = %failure, "Refresh after import failed, merging locally");
            merge_into(graph, imported);
        }
    }

    info!(
        nodes = report.nodes,
        edges = report.edges,
        defaulted = report.defaulted,
        dangling = report.dangling.len(),
        "Document imported"
    );
    Ok(report)
}

/// Delete every node and edge remotely. Each local collection is cleared
/// only when its remote call succeeds.
pub async fn reset(graph: &mut Graph, remote: &dyn RemoteStore) -> Vec<RemoteFailure> {
    let mut failures = Vec::new();

    match remote.delete_all_nodes().await {
        Ok(()) => graph.nodes.clear(),
        Err(failure) => failures.push(failure),
    }
    match remote.delete_all_edges().await {
        Ok(()) => graph.edges.clear(),
        Err(failure) => failures.push(failure),
    }

    for failure in &failures {
        warn!(error = %failure, "Reset incomplete");
    }
    info!(
        nodes = graph.nodes.len(),
        edges = graph.edges.len(),
        "Graph reset"
    );
    failures
}

/// Push nodes whose relation fields changed. Failures are collected, not
/// raised.
pub(crate) async fn sync_touched(
    graph: &Graph,
    remote: &dyn RemoteStore,
    touched: &[String],
) -> Vec<RemoteFailure> {
    let mut failures = Vec::new();
    for id in touched {
        let Some(node) = graph.node(id) else {
            continue;
        };
        if let Err(failure) = remote.update_node(node).await {
            warn!(node_id = %id, error = %failure, "Remote relation update failed");
            failures.push(failure);
        }
    }
    failures
}

/// Endpoints must exist and handles must be named.
fn check_edge(graph: &Graph, edge: &Edge) -> ImfResult<()> {
    for (field, handle) in [
        ("sourceHandle", &edge.source_handle),
        ("targetHandle", &edge.target_handle),
    ] {
        if handle.is_empty() {
            return Err(Violation::MissingRequiredField {
                entity: Entity::Edge,
                id: edge.id.clone(),
                field,
            }
            .into());
        }
    }
    for (field, node_id) in [("source", &edge.source), ("target", &edge.target)] {
        if !graph.contains_node(node_id) {
            return Err(ImfError::Dangling(DanglingReference::new(&edge.id, field, node_id)));
        }
    }
    Ok(())
}

fn merge(mut first: RelationOutcome, second: RelationOutcome) -> RelationOutcome {
    for id in second.touched {
        if !first.touched.contains(&id) {
            first.touched.push(id);
        }
    }
    first.dangling.extend(second.dangling);
    first
}

fn merge_into(graph: &mut Graph, imported: Graph) {
    for node in imported.nodes {
        if graph.replace_node(node.clone()).is_none() {
            graph.nodes.push(node);
        }
    }
    for edge in imported.edges {
        let id = edge.id.clone();
        if graph.replace_edge(&id, edge.clone()).is_none() {
            graph.edges.push(edge);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::model::{EdgeKind, NodeKind, Reference};
    use crate::graph::schema::RelationField;
    use crate::relations::audit;
    use crate::remote::{Detached, MemoryRemote, RemoteOperation};
    use crate::testing::{block, edge, terminal};
    use serde_json::json;

    async fn seeded(remote: &dyn RemoteStore) -> Graph {
        let mut graph = Graph::new();
        for id in ["a", "b"] {
            create_node(&mut graph, remote, block(id)).await.unwrap();
        }
        graph
    }

    #[tokio::test]
    async fn test_create_node_stamps_and_rejects_duplicates() {
        let remote = MemoryRemote::new();
        let mut graph = seeded(&remote).await;

        let a = graph.node("a").unwrap();
        assert!(a.meta().created_at > 0);
        assert_eq!(a.meta().created_at, a.meta().updated_at);

        let err = create_node(&mut graph, &remote, block("a")).await.unwrap_err();
        assert!(matches!(err, ImfError::DuplicateNode(_)));
    }

    #[tokio::test]
    async fn test_create_node_remote_failure_commits_nothing() {
        let remote = MemoryRemote::new();
        remote.fail_all(RemoteOperation::CreateNode);
        let mut graph = Graph::new();

        let err = create_node(&mut graph, &remote, block("a")).await.unwrap_err();
        assert!(matches!(err, ImfError::Remote(f) if f.operation == RemoteOperation::CreateNode));
        assert!(graph.is_empty());
    }

    #[tokio::test]
    async fn test_update_node_stamps_updated_at() {
        let remote = MemoryRemote::new();
        let mut graph = seeded(&remote).await;
        graph.node_mut("a").unwrap().data.meta_mut().updated_at = 1;

        let patch = NodePatch {
            label: Some("Tank".to_string()),
            ..NodePatch::default()
        };
        let stored = update_node(&mut graph, &remote, "a", &patch).await.unwrap();

        assert_eq!(stored.meta().label, "Tank");
        assert!(stored.meta().updated_at > 1);
        assert_eq!(graph.node("a").unwrap().meta().label, "Tank");
        assert_eq!(remote.snapshot().node("a").unwrap().meta().label, "Tank");
    }

    #[tokio::test]
    async fn test_create_edge_requires_endpoints() {
        let remote = MemoryRemote::new();
        let mut graph = seeded(&remote).await;

        let err = create_edge(&mut graph, &remote, edge("e1", "a", "ghost", EdgeKind::Connected))
            .await
            .unwrap_err();
        assert!(matches!(err, ImfError::Dangling(d) if d.field == "target" && d.missing == "ghost"));

        let mut unnamed = edge("e2", "a", "b", EdgeKind::Connected);
        unnamed.source_handle.clear();
        let err = create_edge(&mut graph, &remote, unnamed).await.unwrap_err();
        assert!(matches!(err, ImfError::Validation(v) if v.field() == Some("sourceHandle")));
        assert!(graph.edges.is_empty());
    }

    #[tokio::test]
    async fn test_retype_moves_relation_entries() {
        let remote = MemoryRemote::new();
        let mut graph = seeded(&remote).await;
        create_edge(&mut graph, &remote, edge("e1", "a", "b", EdgeKind::Connected))
            .await
            .unwrap();

        let change = update_edge(&mut graph, &remote, "e1", &EdgePatch::retype(EdgeKind::Part))
            .await
            .unwrap();

        assert_eq!(change.edge.kind, EdgeKind::Part);
        assert_eq!(change.outcome.touched, vec!["a", "b"]);
        let a = graph.node("a").unwrap();
        assert!(a.related_ids(RelationField::ConnectedTo).is_empty());
        assert_eq!(a.related_ids(RelationField::DirectParts), vec!["b"]);
        assert!(audit(&graph).is_empty());
    }

    #[tokio::test]
    async fn test_failed_update_edge_leaves_graph_untouched() {
        let remote = MemoryRemote::new();
        let mut graph = seeded(&remote).await;
        create_edge(&mut graph, &remote, edge("e1", "a", "b", EdgeKind::Fulfilled))
            .await
            .unwrap();
        let before = graph.clone();
        remote.fail_all(RemoteOperation::UpdateEdge);

        let err = update_edge(&mut graph, &remote, "e1", &EdgePatch::retype(EdgeKind::Proxy)).await;
        assert!(err.is_err());
        assert_eq!(graph, before);
    }

    #[tokio::test]
    async fn test_delete_edge_keeps_relation_of_parallel_edge() {
        let remote = MemoryRemote::new();
        let mut graph = seeded(&remote).await;
        for (id, handle) in [("e1", "h1"), ("e2", "h2")] {
            let mut e = edge(id, "a", "b", EdgeKind::Connected);
            e.source_handle = handle.to_string();
            create_edge(&mut graph, &remote, e).await.unwrap();
        }

        let change = delete_edge(&mut graph, &remote, "e1").await.unwrap();

        assert!(change.is_clean());
        assert_eq!(graph.edges.len(), 1);
        assert_eq!(graph.node("a").unwrap().related_ids(RelationField::ConnectedTo), vec!["b"]);
        assert!(audit(&graph).is_empty());
    }

    #[tokio::test]
    async fn test_delete_edge_cleans_up_despite_remote_failure() {
        let remote = MemoryRemote::new();
        let mut graph = seeded(&remote).await;
        create_edge(&mut graph, &remote, edge("e1", "a", "b", EdgeKind::Connected))
            .await
            .unwrap();
        remote.fail_all(RemoteOperation::DeleteEdge);

        let change = delete_edge(&mut graph, &remote, "e1").await.unwrap();

        assert!(!change.is_clean());
        assert!(graph.edges.is_empty());
        assert!(graph.node("b").unwrap().related_ids(RelationField::ConnectedBy).is_empty());
        assert!(matches!(
            delete_edge(&mut graph, &remote, "e1").await,
            Err(ImfError::EdgeNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_topology_edge_to_terminal() {
        let remote = Detached;
        let mut graph = seeded(&remote).await;
        create_node(&mut graph, &remote, terminal("t1")).await.unwrap();
        create_edge(&mut graph, &remote, edge("e1", "a", "t1", EdgeKind::Topology))
            .await
            .unwrap();

        match &graph.node("t1").unwrap().data {
            crate::graph::model::NodeData::Terminal(data) => {
                assert_eq!(data.terminal_of, Reference::from("a"))
            }
            other => panic!("unexpected node data {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_import_refreshes_from_remote() {
        let remote = MemoryRemote::new();
        let mut graph = Graph::new();
        let document = json!({
            "nodes": [{
                "id": "c1",
                "type": "connector",
                "position": {"x": 0, "y": 0},
                "data": {"connectedTo": [], "connectedBy": []}
            }],
            "edges": []
        });

        let report = import_document(&mut graph, &remote, &document).await.unwrap();

        assert!(report.refreshed);
        assert_eq!(report.defaulted, 2);
        assert_eq!(graph.node("c1").unwrap().kind(), NodeKind::Connector);
        assert_eq!(graph.node("c1").unwrap().width, 32.0);
    }

    #[tokio::test]
    async fn test_import_merges_locally_when_detached() {
        let mut graph = Graph::from_parts(vec![block("a")], vec![]);
        let document = json!({
            "nodes": [{
                "id": "c1",
                "type": "connector",
                "position": {"x": 1, "y": 2},
                "width": 10,
                "height": 10,
                "data": {"connectedTo": [], "connectedBy": []}
            }],
            "edges": []
        });

        let report = import_document(&mut graph, &Detached, &document).await.unwrap();

        assert!(!report.refreshed);
        assert_eq!(graph.nodes.len(), 2);
    }

    #[tokio::test]
    async fn test_import_rejects_bad_document_before_upload() {
        let remote = MemoryRemote::new();
        let mut graph = Graph::new();

        let err = import_document(&mut graph, &remote, &json!({"nodes": [], "edges": "x"}))
            .await
            .unwrap_err();
        assert!(matches!(err, ImfError::Validation(Violation::DocumentShape { collection: "edges" })));
        assert!(remote.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reset_keeps_collection_whose_delete_failed() {
        let remote = MemoryRemote::new();
        let mut graph = seeded(&remote).await;
        create_edge(&mut graph, &remote, edge("e1", "a", "b", EdgeKind::Proxy))
            .await
            .unwrap();
        remote.fail_all(RemoteOperation::DeleteAllEdges);

        let failures = reset(&mut graph, &remote).await;

        assert_eq!(failures.len(), 1);
        assert!(graph.nodes.is_empty());
        assert_eq!(graph.edges.len(), 1);
    }
}
