//! End-to-end diagram editing scenarios against an in-memory remote.

use imf_core::edit::{self, EdgePatch};
use imf_core::{
    audit, delete_node, validate, Edge, EdgeData, EdgeKind, Graph, ImfError, MemoryRemote, Node,
    NodeData, NodeKind, Position, Reference, RelationField, RemoteOperation, Violation,
};
use serde_json::json;

fn node(id: &str, kind: NodeKind) -> Node {
    Node::new(id, kind, Position { x: 10.0, y: 20.0 })
}

fn link(id: &str, source: &str, target: &str, kind: EdgeKind) -> Edge {
    Edge {
        id: id.to_string(),
        source: source.to_string(),
        source_handle: format!("{}-right", source),
        target: target.to_string(),
        target_handle: format!("{}-left", target),
        kind,
        data: EdgeData {
            id: id.to_string(),
            created_at: 1_700_000_000_000,
            updated_at: 1_700_000_000_000,
            lock_connection: false,
            label: kind.to_string(),
            created_by: "user-1".to_string(),
        },
    }
}

async fn blocks(remote: &MemoryRemote, ids: &[&str]) -> Graph {
    let mut graph = Graph::new();
    for id in ids {
        edit::create_node(&mut graph, remote, node(id, NodeKind::Block))
            .await
            .unwrap();
    }
    graph
}

#[tokio::test]
async fn symmetric_connect() {
    let remote = MemoryRemote::new();
    let mut graph = blocks(&remote, &["A", "B"]).await;

    edit::create_edge(&mut graph, &remote, link("e1", "A", "B", EdgeKind::Connected))
        .await
        .unwrap();

    let a = graph.node("A").unwrap();
    let b = graph.node("B").unwrap();
    assert_eq!(a.related_ids(RelationField::ConnectedTo), vec!["B"]);
    assert_eq!(b.related_ids(RelationField::ConnectedBy), vec!["A"]);
    assert_eq!(remote.snapshot(), graph);
}

#[tokio::test]
async fn delete_with_cascade() {
    let remote = MemoryRemote::new();
    let mut graph = blocks(&remote, &["A", "B"]).await;
    edit::create_edge(&mut graph, &remote, link("e1", "A", "B", EdgeKind::Connected))
        .await
        .unwrap();

    let report = delete_node(&mut graph, &remote, "A").await.unwrap();

    assert_eq!(report.deleted_edges, vec!["e1"]);
    assert!(graph.edges.is_empty());
    assert!(graph.node("A").is_none());
    assert!(graph
        .node("B")
        .unwrap()
        .related_ids(RelationField::ConnectedBy)
        .is_empty());
    assert_eq!(remote.snapshot(), graph);
}

#[tokio::test]
async fn import_rejection_happens_before_entity_checks() {
    let remote = MemoryRemote::new();
    let mut graph = Graph::new();
    let document = json!({
        "nodes": [{ "id": "", "type": "block" }],
        "edges": "not-an-array"
    });

    let err = edit::import_document(&mut graph, &remote, &document)
        .await
        .unwrap_err();

    match err {
        ImfError::Validation(violation) => {
            assert_eq!(violation, Violation::DocumentShape { collection: "edges" });
            assert_eq!(
                violation.to_string(),
                "Invalid file: Missing or incorrect \"edges\" array"
            );
        }
        other => panic!("expected a validation error, got {other}"),
    }
    assert!(remote.calls().is_empty());
}

#[tokio::test]
async fn part_sets_direct_part_of() {
    let remote = MemoryRemote::new();
    let mut graph = blocks(&remote, &["P", "C"]).await;

    edit::create_edge(&mut graph, &remote, link("e1", "P", "C", EdgeKind::Part))
        .await
        .unwrap();

    assert_eq!(
        graph.node("P").unwrap().related_ids(RelationField::DirectParts),
        vec!["C"]
    );
    match &graph.node("C").unwrap().data {
        NodeData::Block(data) => assert_eq!(data.direct_part_of, Reference::from("P")),
        other => panic!("unexpected node data {other:?}"),
    }
}

#[tokio::test]
async fn cascade_over_mixed_graph_leaves_no_trace() {
    let remote = MemoryRemote::new();
    let mut graph = blocks(&remote, &["hub", "b1", "b2"]).await;
    for (id, kind) in [("c1", NodeKind::Connector), ("t1", NodeKind::Terminal)] {
        edit::create_node(&mut graph, &remote, node(id, kind))
            .await
            .unwrap();
    }
    let edges = [
        link("e1", "hub", "b1", EdgeKind::Topology),
        link("e2", "hub", "t1", EdgeKind::Topology),
        link("e3", "b2", "hub", EdgeKind::Fulfilled),
        link("e4", "hub", "c1", EdgeKind::Connected),
        link("e5", "b1", "b2", EdgeKind::Part),
        link("e6", "hub", "b2", EdgeKind::Equality),
    ];
    for e in edges {
        edit::create_edge(&mut graph, &remote, e).await.unwrap();
    }
    assert!(audit(&graph).is_empty());

    let report = delete_node(&mut graph, &remote, "hub").await.unwrap();

    assert_eq!(report.deleted_edges, vec!["e1", "e2", "e3", "e4", "e6"]);
    assert_eq!(graph.edges.len(), 1);
    for n in &graph.nodes {
        for field in n.kind().relation_fields() {
            assert!(!n.related_ids(*field).contains(&"hub"));
        }
    }
    assert!(audit(&graph).is_empty());
    assert_eq!(remote.snapshot(), graph);
}

#[tokio::test]
async fn remote_failure_still_cleans_up_locally() {
    let remote = MemoryRemote::new();
    let mut graph = blocks(&remote, &["A", "B", "C"]).await;
    edit::create_edge(&mut graph, &remote, link("e1", "A", "B", EdgeKind::Connected))
        .await
        .unwrap();
    edit::create_edge(&mut graph, &remote, link("e2", "C", "A", EdgeKind::Fulfilled))
        .await
        .unwrap();
    remote.fail_on(RemoteOperation::DeleteEdge, "e1");

    let report = delete_node(&mut graph, &remote, "A").await.unwrap();

    assert_eq!(report.deleted_edges, vec!["e1", "e2"]);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].operation, RemoteOperation::DeleteEdge);
    assert!(graph.edges.is_empty());
    assert!(audit(&graph).is_empty());
    // The remote still holds the edge it failed to delete.
    assert!(remote.snapshot().edge("e1").is_some());
}

#[tokio::test]
async fn retyping_round_trips_through_validation() {
    let remote = MemoryRemote::new();
    let mut graph = blocks(&remote, &["A", "B"]).await;
    edit::create_edge(&mut graph, &remote, link("e1", "A", "B", EdgeKind::Fulfilled))
        .await
        .unwrap();
    edit::update_edge(&mut graph, &remote, "e1", &EdgePatch::retype(EdgeKind::Transfer))
        .await
        .unwrap();

    // Transfer has no fields on blocks, so both sides end up empty.
    assert!(graph.node("A").unwrap().related_ids(RelationField::Fulfills).is_empty());
    assert!(audit(&graph).is_empty());

    let document = serde_json::to_value(&graph).unwrap();
    let validated = validate(&document).unwrap();
    assert_eq!(validated.graph, graph);
    assert!(validated.dangling.is_empty());
}
