use crate::error::{ClientError, Result};
use crate::traits::{ClusterClient, PodEventStream};
use crate::watch::decode_watch_stream;
use async_trait::async_trait;
use k8s_openapi::api::core::v1::{Binding, Node, ObjectReference, Pod};
use k8s_openapi::apimachinery::pkg::apis::meta::v1::ObjectMeta;
use reqwest::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;
use strew_core::PodRef;
use tracing::debug;

/// HTTP client for the cluster API server
pub struct HttpClusterClient {
    base_url: String,
    client: Client,
    bearer_token: Option<String>,
}

/// Kubernetes-style list envelope; only the items matter here
#[derive(Debug, Deserialize)]
struct ObjectList<T> {
    #[serde(default)]
    items: Vec<T>,
}

impl HttpClusterClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: Client::new(),
            bearer_token: None,
        }
    }

    /// Attach a bearer token sent with every request
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    fn authorize(&self, req: RequestBuilder) -> RequestBuilder {
        match &self.bearer_token {
            Some(token) => req.bearer_auth(token),
            None => req,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl ClusterClient for HttpClusterClient {
    /// GET /api/v1/nodes
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let url = format!("{}/api/v1/nodes", self.base_url);
        debug!("GET {}", url);

        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ClientError::unavailable(format!("HTTP request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(ClientError::unavailable(format!(
                    "GET nodes failed with status {}: {}",
                    status, body
                )));
            }
            return Err(ClientError::unexpected_status(
                status.as_u16(),
                format!("GET nodes failed: {}", body),
            ));
        }

        let list = resp
            .json::<ObjectList<Node>>()
            .await
            .map_err(|e| ClientError::decode(format!("Failed to parse node list: {}", e)))?;
        Ok(list.items)
    }

    /// GET /api/v1/pods
    async fn list_pods(&self) -> Result<Vec<Pod>> {
        let url = format!("{}/api/v1/pods", self.base_url);
        debug!("GET {}", url);

        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ClientError::unavailable(format!("HTTP request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(ClientError::unavailable(format!(
                    "GET pods failed with status {}: {}",
                    status, body
                )));
            }
            return Err(ClientError::unexpected_status(
                status.as_u16(),
                format!("GET pods failed: {}", body),
            ));
        }

        let list = resp
            .json::<ObjectList<Pod>>()
            .await
            .map_err(|e| ClientError::decode(format!("Failed to parse pod list: {}", e)))?;
        Ok(list.items)
    }

    /// GET /api/v1/pods?watch=true
    ///
    /// The request carries no client-side deadline; long-lived watches are
    /// bounded by the inactivity `timeout` applied to the decoded stream.
    async fn watch_pods(&self, timeout: Duration) -> Result<PodEventStream> {
        let url = format!("{}/api/v1/pods?watch=true", self.base_url);
        debug!("GET {}", url);

        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(|e| ClientError::unavailable(format!("HTTP request failed: {}", e)))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(ClientError::unavailable(format!(
                    "GET pod watch failed with status {}: {}",
                    status, body
                )));
            }
            return Err(ClientError::unexpected_status(
                status.as_u16(),
                format!("GET pod watch failed: {}", body),
            ));
        }

        Ok(decode_watch_stream(resp.bytes_stream(), timeout))
    }

    /// POST /api/v1/namespaces/{namespace}/pods/{name}/binding
    async fn bind_pod(&self, pod: &PodRef, node_name: &str) -> Result<()> {
        let url = format!(
            "{}/api/v1/namespaces/{}/pods/{}/binding",
            self.base_url, pod.namespace, pod.name
        );
        debug!("POST {}", url);

        let binding = Binding {
            metadata: ObjectMeta {
                name: Some(pod.name.clone()),
                namespace: Some(pod.namespace.clone()),
                ..Default::default()
            },
            target: ObjectReference {
                api_version: Some("v1".to_string()),
                kind: Some("Node".to_string()),
                name: Some(node_name.to_string()),
                ..Default::default()
            },
        };

        let resp = self
            .authorize(self.client.post(&url).json(&binding))
            .send()
            .await
            .map_err(|e| ClientError::unavailable(format!("HTTP request failed: {}", e)))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }
        let body = resp.text().await.unwrap_or_default();
        // 409 means the pod is already bound; callers treat it as losing a race
        if status == reqwest::StatusCode::CONFLICT {
            return Err(ClientError::conflict(pod.to_string()));
        }
        if status.is_server_error() {
            return Err(ClientError::unavailable(format!(
                "POST binding failed with status {}: {}",
                status, body
            )));
        }
        Err(ClientError::unexpected_status(
            status.as_u16(),
            format!("POST binding failed: {}", body),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{HeaderMap, StatusCode};
    use axum::response::sse::{Event, Sse};
    use axum::routing::{get, post};
    use axum::{Json, Router};
    use futures_util::{stream, StreamExt};
    use serde_json::json;
    use std::convert::Infallible;
    use std::sync::{Arc, Mutex};

    async fn spawn_stub(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    fn watch_frame(event_type: &str, pod_name: &str) -> String {
        json!({
            "type": event_type,
            "object": {"metadata": {"name": pod_name, "namespace": "default"}}
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_list_nodes_decodes_items() {
        let app = Router::new().route(
            "/api/v1/nodes",
            get(|| async {
                Json(json!({
                    "kind": "NodeList",
                    "items": [
                        {"metadata": {"name": "node-a"}},
                        {"metadata": {"name": "node-b"}}
                    ]
                }))
            }),
        );
        let base = spawn_stub(app).await;

        let nodes = HttpClusterClient::new(&base).list_nodes().await.unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].metadata.name.as_deref(), Some("node-a"));
    }

    #[tokio::test]
    async fn test_list_pods_server_error_is_transient() {
        let app = Router::new().route(
            "/api/v1/pods",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = spawn_stub(app).await;

        let err = HttpClusterClient::new(&base).list_pods().await.unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_list_nodes_missing_route_is_unexpected_status() {
        let base = spawn_stub(Router::new()).await;

        let err = HttpClusterClient::new(&base).list_nodes().await.unwrap_err();
        match err {
            ClientError::UnexpectedStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("expected UnexpectedStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_nodes_bad_body_is_decode_error() {
        let app = Router::new().route("/api/v1/nodes", get(|| async { "not json" }));
        let base = spawn_stub(app).await;

        let err = HttpClusterClient::new(&base).list_nodes().await.unwrap_err();
        assert!(matches!(err, ClientError::Decode { .. }));
    }

    #[tokio::test]
    async fn test_bearer_token_is_sent() {
        let seen = Arc::new(Mutex::new(None::<String>));
        let seen_by_handler = seen.clone();
        let app = Router::new().route(
            "/api/v1/nodes",
            get(move |headers: HeaderMap| {
                let seen = seen_by_handler.clone();
                async move {
                    *seen.lock().unwrap() = headers
                        .get("authorization")
                        .and_then(|v| v.to_str().ok())
                        .map(String::from);
                    Json(json!({"items": []}))
                }
            }),
        );
        let base = spawn_stub(app).await;

        HttpClusterClient::new(&base)
            .with_bearer_token("secret")
            .list_nodes()
            .await
            .unwrap();
        assert_eq!(seen.lock().unwrap().as_deref(), Some("Bearer secret"));
    }

    #[tokio::test]
    async fn test_bind_pod_posts_node_target() {
        let body = Arc::new(Mutex::new(None::<serde_json::Value>));
        let body_by_handler = body.clone();
        let app = Router::new().route(
            "/api/v1/namespaces/default/pods/web-1/binding",
            post(move |Json(payload): Json<serde_json::Value>| {
                let body = body_by_handler.clone();
                async move {
                    *body.lock().unwrap() = Some(payload);
                    StatusCode::CREATED
                }
            }),
        );
        let base = spawn_stub(app).await;

        let pod = PodRef::new("default", "web-1");
        HttpClusterClient::new(&base)
            .bind_pod(&pod, "node-a")
            .await
            .unwrap();

        let payload = body.lock().unwrap().clone().unwrap();
        assert_eq!(payload["target"]["kind"], "Node");
        assert_eq!(payload["target"]["name"], "node-a");
        assert_eq!(payload["metadata"]["name"], "web-1");
    }

    #[tokio::test]
    async fn test_bind_pod_conflict_is_conflict_error() {
        let app = Router::new().route(
            "/api/v1/namespaces/default/pods/web-1/binding",
            post(|| async { StatusCode::CONFLICT }),
        );
        let base = spawn_stub(app).await;

        let pod = PodRef::new("default", "web-1");
        let err = HttpClusterClient::new(&base)
            .bind_pod(&pod, "node-a")
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Conflict { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_bind_pod_unknown_pod_is_unexpected_status() {
        let base = spawn_stub(Router::new()).await;

        let pod = PodRef::new("default", "ghost-1");
        let err = HttpClusterClient::new(&base)
            .bind_pod(&pod, "node-a")
            .await
            .unwrap_err();
        assert!(!err.is_transient());
        match err {
            ClientError::UnexpectedStatus { status, .. } => assert_eq!(status, 404),
            other => panic!("expected UnexpectedStatus, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_bind_pod_server_error_is_transient() {
        let app = Router::new().route(
            "/api/v1/namespaces/default/pods/web-1/binding",
            post(|| async { StatusCode::SERVICE_UNAVAILABLE }),
        );
        let base = spawn_stub(app).await;

        let pod = PodRef::new("default", "web-1");
        let err = HttpClusterClient::new(&base)
            .bind_pod(&pod, "node-a")
            .await
            .unwrap_err();
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_watch_pods_decodes_events_until_server_closes() {
        let app = Router::new().route(
            "/api/v1/pods",
            get(|| async {
                let events = stream::iter(vec![
                    Ok::<Event, Infallible>(Event::default().data(watch_frame("ADDED", "web-1"))),
                    Ok(Event::default().data(watch_frame("MODIFIED", "web-2"))),
                ]);
                Sse::new(events)
            }),
        );
        let base = spawn_stub(app).await;

        let mut events = HttpClusterClient::new(&base)
            .watch_pods(Duration::from_secs(300))
            .await
            .unwrap();

        let first = events.next().await.unwrap().unwrap();
        assert_eq!(
            first.object.as_ref().and_then(|p| p.metadata.name.as_deref()),
            Some("web-1")
        );
        let second = events.next().await.unwrap().unwrap();
        assert_eq!(
            second.object.as_ref().and_then(|p| p.metadata.name.as_deref()),
            Some("web-2")
        );
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_watch_pods_ends_after_inactivity() {
        let app = Router::new().route(
            "/api/v1/pods",
            get(|| async {
                Sse::new(stream::pending::<std::result::Result<Event, Infallible>>())
            }),
        );
        let base = spawn_stub(app).await;

        let mut events = HttpClusterClient::new(&base)
            .watch_pods(Duration::from_millis(100))
            .await
            .unwrap();
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn test_watch_pods_establishment_failure() {
        let app = Router::new().route(
            "/api/v1/pods",
            get(|| async { StatusCode::INTERNAL_SERVER_ERROR }),
        );
        let base = spawn_stub(app).await;

        let err = match HttpClusterClient::new(&base)
            .watch_pods(Duration::from_secs(300))
            .await
        {
            Ok(_) => panic!("expected watch establishment to fail"),
            Err(err) => err,
        };
        assert!(err.is_transient());
    }
}
