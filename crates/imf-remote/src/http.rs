//! REST client for the diagram API.
//!
//! Nodes live under `/api/nodes` and edges under `/api/edges`. Every request
//! carries the bearer token when one is configured.

use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use imf_core::remote::{RemoteFailure, RemoteOperation, RemoteResult, RemoteStore};
use imf_core::{Edge, Graph, Node};

use crate::config::RemoteConfig;

#[derive(Debug, Clone, Copy)]
enum Collection {
    Nodes,
    Edges,
}

impl Collection {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Nodes => "nodes",
            Self::Edges => "edges",
        }
    }
}

/// HTTP implementation of [`RemoteStore`].
#[derive(Clone)]
pub struct HttpRemote {
    base_url: String,
    token: Option<String>,
    user_id: Option<String>,
    client: Client,
}

impl HttpRemote {
    pub fn new(config: &RemoteConfig) -> Self {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .unwrap_or_default();

        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            user_id: config.user_id.clone(),
            client,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, collection: Collection, suffix: Option<&str>) -> String {
        match suffix {
            Some(suffix) => format!("{}/api/{}/{}", self.base_url, collection.as_str(), suffix),
            None => format!("{}/api/{}", self.base_url, collection.as_str()),
        }
    }

    /// `/api/{collection}/{user}/all`, which needs a configured user.
    fn all_url(&self, collection: Collection, operation: RemoteOperation) -> RemoteResult<String> {
        let user = self.user_id.as_deref().ok_or_else(|| {
            RemoteFailure::new(operation, None, "no user id configured (set IMF_USER_ID)")
        })?;
        Ok(self.url(collection, Some(&format!("{}/all", user))))
    }

    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let builder = self.client.request(method, url);
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn send(
        &self,
        operation: RemoteOperation,
        id: Option<&str>,
        builder: RequestBuilder,
    ) -> RemoteResult<Response> {
        let response = builder.send().await.map_err(|e| {
            warn!(%operation, error = %e, "Request failed");
            RemoteFailure::new(operation, id, e.to_string())
        })?;

        let status = response.status();
        debug!(%operation, id, status = status.as_u16(), "Response received");

        if status == StatusCode::UNAUTHORIZED {
            return Err(RemoteFailure::unauthorized(operation, id));
        }
        if !status.is_success() {
            return Err(RemoteFailure::status(operation, id, status.as_u16()));
        }
        Ok(response)
    }

    async fn decode<T: DeserializeOwned>(
        operation: RemoteOperation,
        id: Option<&str>,
        response: Response,
    ) -> RemoteResult<T> {
        response
            .json()
            .await
            .map_err(|e| RemoteFailure::new(operation, id, format!("invalid response body: {}", e)))
    }

    async fn fetch<T: DeserializeOwned>(&self, collection: Collection) -> RemoteResult<Vec<T>> {
        let operation = RemoteOperation::FetchGraph;
        let url = self.all_url(collection, operation)?;
        let response = self.send(operation, None, self.request(Method::GET, &url)).await?;
        Self::decode(operation, None, response).await
    }
}

#[async_trait]
impl RemoteStore for HttpRemote {
    async fn fetch_graph(&self) -> RemoteResult<Graph> {
        let nodes: Vec<Node> = self.fetch(Collection::Nodes).await?;
        let edges: Vec<Edge> = self.fetch(Collection::Edges).await?;
        debug!(nodes = nodes.len(), edges = edges.len(), "Fetched graph");
        Ok(Graph::from_parts(nodes, edges))
    }

    async fn create_node(&self, node: &Node) -> RemoteResult<Node> {
        let operation = RemoteOperation::CreateNode;
        let id = Some(node.id.as_str());
        let builder = self
            .request(Method::POST, &self.url(Collection::Nodes, None))
            .json(node);
        let response = self.send(operation, id, builder).await?;
        Self::decode(operation, id, response).await
    }

    async fn update_node(&self, node: &Node) -> RemoteResult<Node> {
        let operation = RemoteOperation::UpdateNode;
        let id = Some(node.id.as_str());
        let builder = self
            .request(Method::PUT, &self.url(Collection::Nodes, None))
            .json(node);
        let response = self.send(operation, id, builder).await?;
        Self::decode(operation, id, response).await
    }

    async fn delete_node(&self, id: &str) -> RemoteResult<()> {
        let url = self.url(Collection::Nodes, Some(id));
        self.send(RemoteOperation::DeleteNode, Some(id), self.request(Method::DELETE, &url))
            .await?;
        Ok(())
    }

    async fn create_edge(&self, edge: &Edge) -> RemoteResult<Edge> {
        let operation = RemoteOperation::CreateEdge;
        let id = Some(edge.id.as_str());
        let builder = self
            .request(Method::POST, &self.url(Collection::Edges, None))
            .json(edge);
        let response = self.send(operation, id, builder).await?;
        Self::decode(operation, id, response).await
    }

    async fn update_edge(&self, edge: &Edge) -> RemoteResult<Edge> {
        let operation = RemoteOperation::UpdateEdge;
        let id = Some(edge.id.as_str());
        let builder = self
            .request(Method::PUT, &self.url(Collection::Edges, None))
            .json(edge);
        let response = self.send(operation, id, builder).await?;
        Self::decode(operation, id, response).await
    }

    async fn delete_edge(&self, id: &str) -> RemoteResult<()> {
        let url = self.url(Collection::Edges, Some(id));
        self.send(RemoteOperation::DeleteEdge, Some(id), self.request(Method::DELETE, &url))
            .await?;
        Ok(())
    }

    async fn upload_nodes(&self, nodes: &[Node]) -> RemoteResult<()> {
        let url = self.url(Collection::Nodes, Some("upload"));
        let builder = self.request(Method::POST, &url).json(nodes);
        self.send(RemoteOperation::UploadNodes, None, builder).await?;
        Ok(())
    }

    async fn upload_edges(&self, edges: &[Edge]) -> RemoteResult<()> {
        let url = self.url(Collection::Edges, Some("upload"));
        let builder = self.request(Method::POST, &url).json(edges);
        self.send(RemoteOperation::UploadEdges, None, builder).await?;
        Ok(())
    }

    async fn delete_all_nodes(&self) -> RemoteResult<()> {
        let operation = RemoteOperation::DeleteAllNodes;
        let url = self.all_url(Collection::Nodes, operation)?;
        self.send(operation, None, self.request(Method::DELETE, &url)).await?;
        Ok(())
    }

    async fn delete_all_edges(&self) -> RemoteResult<()> {
        let operation = RemoteOperation::DeleteAllEdges;
        let url = self.all_url(Collection::Edges, operation)?;
        self.send(operation, None, self.request(Method::DELETE, &url)).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned response, returning the request head.
    async fn serve_once(response: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let url = format!("http://{}", listener.local_addr().unwrap());
        let handle = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut buf = vec![0u8; 8192];
            let n = stream.read(&mut buf).await.unwrap();
            stream.write_all(response.as_bytes()).await.unwrap();
            stream.shutdown().await.ok();
            String::from_utf8_lossy(&buf[..n]).to_string()
        });
        (url, handle)
    }

    fn remote(base_url: &str) -> HttpRemote {
        HttpRemote::new(&RemoteConfig {
            base_url: format!("{}/", base_url),
            token: Some("t0k3n".to_string()),
            user_id: Some("u1".to_string()),
            timeout_secs: 5,
        })
    }

    #[tokio::test]
    async fn test_delete_edge_sends_bearer_token() {
        let (url, server) =
            serve_once("HTTP/1.1 200 OK\r\ncontent-length: 0\r\nconnection: close\r\n\r\n").await;

        remote(&url).delete_edge("e1").await.unwrap();

        let head = server.await.unwrap();
        assert!(head.starts_with("DELETE /api/edges/e1 HTTP/1.1"));
        assert!(head.to_lowercase().contains("authorization: bearer t0k3n"));
    }

    #[tokio::test]
    async fn test_unauthorized_status_mapped() {
        let (url, server) = serve_once(
            "HTTP/1.1 401 Unauthorized\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let failure = remote(&url).delete_node("n1").await.unwrap_err();
        server.await.unwrap();

        assert!(failure.is_unauthorized());
        assert_eq!(failure.operation, RemoteOperation::DeleteNode);
        assert_eq!(failure.id.as_deref(), Some("n1"));
    }

    #[tokio::test]
    async fn test_error_status_reported() {
        let (url, server) = serve_once(
            "HTTP/1.1 500 Internal Server Error\r\ncontent-length: 0\r\nconnection: close\r\n\r\n",
        )
        .await;

        let failure = remote(&url).delete_all_edges().await.unwrap_err();
        let head = server.await.unwrap();

        assert!(head.starts_with("DELETE /api/edges/u1/all HTTP/1.1"));
        assert_eq!(failure.to_string(), "Error deleting edges - Status: 500");
    }

    #[tokio::test]
    async fn test_user_scoped_calls_need_user_id() {
        let remote = HttpRemote::new(&RemoteConfig::default());
        let failure = remote.fetch_graph().await.unwrap_err();
        assert_eq!(failure.operation, RemoteOperation::FetchGraph);
        assert!(failure.message.contains("IMF_USER_ID"));
    }
}
