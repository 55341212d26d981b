//! Remote persistence seam.
//!
//! The engine never talks to a server directly: every create, update and
//! delete goes through a [`RemoteStore`]. Each call either succeeds with the
//! echoed entity or fails with a [`RemoteFailure`].

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use thiserror::Error;

use crate::graph::model::{Edge, Node};
use crate::graph::Graph;

/// The collaborator call that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RemoteOperation {
    FetchGraph,
    CreateNode,
    UpdateNode,
    DeleteNode,
    CreateEdge,
    UpdateEdge,
    DeleteEdge,
    UploadNodes,
    UploadEdges,
    DeleteAllNodes,
    DeleteAllEdges,
}

impl RemoteOperation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FetchGraph => "fetching graph",
            Self::CreateNode => "creating node",
            Self::UpdateNode => "updating node",
            Self::DeleteNode => "deleting node",
            Self::CreateEdge => "creating edge",
            Self::UpdateEdge => "updating edge",
            Self::DeleteEdge => "deleting edge",
            Self::UploadNodes => "uploading nodes",
            Self::UploadEdges => "uploading edges",
            Self::DeleteAllNodes => "deleting nodes",
            Self::DeleteAllEdges => "deleting edges",
        }
    }
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed remote call: which operation, on which id, with what status.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct RemoteFailure {
    pub operation: RemoteOperation,
    pub id: Option<String>,
    pub status: Option<u16>,
    pub message: String,
}

impl RemoteFailure {
    pub fn new(operation: RemoteOperation, id: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            operation,
            id: id.map(str::to_string),
            status: None,
            message: message.into(),
        }
    }

    /// A non-success HTTP-style status.
    pub fn status(operation: RemoteOperation, id: Option<&str>, status: u16) -> Self {
        Self {
            status: Some(status),
            ..Self::new(operation, id, format!("Status: {}", status))
        }
    }

    pub fn unauthorized(operation: RemoteOperation, id: Option<&str>) -> Self {
        Self {
            status: Some(401),
            ..Self::new(operation, id, "Unauthorized")
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        self.status == Some(401)
    }
}

impl fmt::Display for RemoteFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Error {}", self.operation)?;
        if let Some(id) = &self.id {
            write!(f, " {}", id)?;
        }
        write!(f, " - {}", self.message)
    }
}

/// Result type for remote calls.
pub type RemoteResult<T> = Result<T, RemoteFailure>;

/// Persistence collaborator for nodes and edges.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetch every node and edge owned by the current user.
    async fn fetch_graph(&self) -> RemoteResult<Graph>;

    async fn create_node(&self, node: &Node) -> RemoteResult<Node>;

    async fn update_node(&self, node: &Node) -> RemoteResult<Node>;

    async fn delete_node(&self, id: &str) -> RemoteResult<()>;

    async fn create_edge(&self, edge: &Edge) -> RemoteResult<Edge>;

    async fn update_edge(&self, edge: &Edge) -> RemoteResult<Edge>;

    async fn delete_edge(&self, id: &str) -> RemoteResult<()>;

    /// Bulk insert used by document import.
    async fn upload_nodes(&self, nodes: &[Node]) -> RemoteResult<()>;

    async fn upload_edges(&self, edges: &[Edge]) -> RemoteResult<()>;

    async fn delete_all_nodes(&self) -> RemoteResult<()>;

    async fn delete_all_edges(&self) -> RemoteResult<()>;
}

/// A store that accepts every call and echoes its input.
///
/// Used when editing a document file with no server behind it.
#[derive(Debug, Clone, Copy, Default)]
pub struct Detached;

#[async_trait]
impl RemoteStore for Detached {
    async fn fetch_graph(&self) -> RemoteResult<Graph> {
        Err(RemoteFailure::new(
            RemoteOperation::FetchGraph,
            None,
            "no remote store configured",
        ))
    }

    async fn create_node(&self, node: &Node) -> RemoteResult<Node> {
        Ok(node.clone())
    }

    async fn update_node(&self, node: &Node) -> RemoteResult<Node> {
        Ok(node.clone())
    }

    async fn delete_node(&self, _id: &str) -> RemoteResult<()> {
        Ok(())
    }

    async fn create_edge(&self, edge: &Edge) -> RemoteResult<Edge> {
        Ok(edge.clone())
    }

    async fn update_edge(&self, edge: &Edge) -> RemoteResult<Edge> {
        Ok(edge.clone())
    }

    async fn delete_edge(&self, _id: &str) -> RemoteResult<()> {
        Ok(())
    }

    async fn upload_nodes(&self, _nodes: &[Node]) -> RemoteResult<()> {
        Ok(())
    }

    async fn upload_edges(&self, _edges: &[Edge]) -> RemoteResult<()> {
        Ok(())
    }

    async fn delete_all_nodes(&self) -> RemoteResult<()> {
        Ok(())
    }

    async fn delete_all_edges(&self) -> RemoteResult<()> {
        Ok(())
    }
}

/// A recorded call against a [`MemoryRemote`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteCall {
    pub operation: RemoteOperation,
    pub id: Option<String>,
}

/// An in-process store holding its own graph copy.
///
/// Calls can be made to fail per operation, or per operation and id, and
/// every call is recorded in order.
#[derive(Debug, Default)]
pub struct MemoryRemote {
    state: Mutex<Graph>,
    failing: Mutex<HashSet<(RemoteOperation, Option<String>)>>,
    calls: Mutex<Vec<RemoteCall>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl MemoryRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// A store already holding `graph`.
    pub fn with_graph(graph: Graph) -> Self {
        Self {
            state: Mutex::new(graph),
            ..Self::default()
        }
    }

    /// Fail every call of `operation`.
    pub fn fail_all(&self, operation: RemoteOperation) {
        lock(&self.failing).insert((operation, None));
    }

    /// Fail calls of `operation` on `id` only.
    pub fn fail_on(&self, operation: RemoteOperation, id: &str) {
        lock(&self.failing).insert((operation, Some(id.to_string())));
    }

    pub fn calls(&self) -> Vec<RemoteCall> {
        lock(&self.calls).clone()
    }

    pub fn snapshot(&self) -> Graph {
        lock(&self.state).clone()
    }

    fn enter(&self, operation: RemoteOperation, id: Option<&str>) -> RemoteResult<()> {
        lock(&self.calls).push(RemoteCall {
            operation,
            id: id.map(str::to_string),
        });

        let failing = lock(&self.failing);
        if failing.contains(&(operation, None))
            || id.is_some_and(|id| failing.contains(&(operation, Some(id.to_string()))))
        {
            return Err(RemoteFailure::status(operation, id, 500));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemote {
    async fn fetch_graph(&self) -> RemoteResult<Graph> {
        self.enter(RemoteOperation::FetchGraph, None)?;
        Ok(self.snapshot())
    }

    async fn create_node(&self, node: &Node) -> RemoteResult<Node> {
        self.enter(RemoteOperation::CreateNode, Some(&node.id))?;
        lock(&self.state).nodes.push(node.clone());
        Ok(node.clone())
    }

    async fn update_node(&self, node: &Node) -> RemoteResult<Node> {
        self.enter(RemoteOperation::UpdateNode, Some(&node.id))?;
        let mut state = lock(&self.state);
        if state.replace_node(node.clone()).is_none() {
            return Err(RemoteFailure::status(RemoteOperation::UpdateNode, Some(&node.id), 404));
        }
        Ok(node.clone())
    }

    async fn delete_node(&self, id: &str) -> RemoteResult<()> {
        self.enter(RemoteOperation::DeleteNode, Some(id))?;
        lock(&self.state).remove_node(id);
        Ok(())
    }

    async fn create_edge(&self, edge: &Edge) -> RemoteResult<Edge> {
        self.enter(RemoteOperation::CreateEdge, Some(&edge.id))?;
        lock(&self.state).edges.push(edge.clone());
        Ok(edge.clone())
    }

    async fn update_edge(&self, edge: &Edge) -> RemoteResult<Edge> {
        self.enter(RemoteOperation::UpdateEdge, Some(&edge.id))?;
        let mut state = lock(&self.state);
        if state.replace_edge(&edge.id, edge.clone()).is_none() {
            return Err(RemoteFailure::status(RemoteOperation::UpdateEdge, Some(&edge.id), 404));
        }
        Ok(edge.clone())
    }

    async fn delete_edge(&self, id: &str) -> RemoteResult<()> {
        self.enter(RemoteOperation::DeleteEdge, Some(id))?;
        lock(&self.state).remove_edge(id);
        Ok(())
    }

    async fn upload_nodes(&self, nodes: &[Node]) -> RemoteResult<()> {
        self.enter(RemoteOperation::UploadNodes, None)?;
        lock(&self.state).nodes.extend_from_slice(nodes);
        Ok(())
    }

    async fn upload_edges(&self, edges: &[Edge]) -> RemoteResult<()> {
        self.enter(RemoteOperation::UploadEdges, None)?;
        lock(&self.state).edges.extend_from_slice(edges);
        Ok(())
    }

    async fn delete_all_nodes(&self) -> RemoteResult<()> {
        self.enter(RemoteOperation::DeleteAllNodes, None)?;
        lock(&self.state).nodes.clear();
        Ok(())
    }

    async fn delete_all_edges(&self) -> RemoteResult<()> {
        self.enter(RemoteOperation::DeleteAllEdges, None)?;
        lock(&self.state).edges.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::block;

    #[tokio::test]
    async fn test_memory_remote_records_and_fails_on_request() {
        let remote = MemoryRemote::new();
        remote.fail_on(RemoteOperation::DeleteNode, "b");

        remote.create_node(&block("a")).await.unwrap();
        assert!(remote.delete_node("a").await.is_ok());
        let failure = remote.delete_node("b").await.unwrap_err();

        assert_eq!(failure.status, Some(500));
        assert_eq!(failure.to_string(), "Error deleting node b - Status: 500");
        assert_eq!(remote.calls().len(), 3);
        assert!(remote.snapshot().nodes.is_empty());
    }

    #[tokio::test]
    async fn test_detached_echoes_input() {
        let node = block("a");
        assert_eq!(Detached.create_node(&node).await.unwrap(), node);
        assert!(Detached.fetch_graph().await.is_err());
    }

    #[test]
    fn test_unauthorized_failure() {
        let failure = RemoteFailure::unauthorized(RemoteOperation::FetchGraph, None);
        assert!(failure.is_unauthorized());
        assert_eq!(failure.to_string(), "Error fetching graph - Unauthorized");
    }
}
