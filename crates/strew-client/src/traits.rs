use crate::error::Result;
use async_trait::async_trait;
use futures_util::stream::BoxStream;
use std::time::Duration;
use strew_core::{Node, Pod, PodRef, WatchEvent};

/// Stream of pod watch events, ending when the watch window closes
///
/// Individual items may be `Err` when the underlying transport fails
/// mid-stream; the stream ends after yielding such an error.
pub type PodEventStream = BoxStream<'static, Result<WatchEvent<Pod>>>;

/// Trait for cluster API access
///
/// This trait abstracts over the HTTP API server so the scheduling loop
/// can be driven against `MockClusterClient` in tests.
#[async_trait]
pub trait ClusterClient: Send + Sync {
    /// List all nodes in the cluster
    async fn list_nodes(&self) -> Result<Vec<Node>>;

    /// List all pods across all namespaces
    async fn list_pods(&self) -> Result<Vec<Pod>>;

    /// Open a watch over pods across all namespaces
    ///
    /// The returned stream yields events as the server publishes them and
    /// ends once `timeout` passes without activity. Callers are expected
    /// to re-open the watch when the stream ends.
    async fn watch_pods(&self, timeout: Duration) -> Result<PodEventStream>;

    /// Bind a pod to a node
    ///
    /// Fails with [`crate::ClientError::Conflict`] when the pod is
    /// already bound.
    async fn bind_pod(&self, pod: &PodRef, node_name: &str) -> Result<()>;
}
