use crate::error::{ClientError, Result};
use crate::traits::{ClusterClient, PodEventStream};
use async_trait::async_trait;
use futures_util::{stream, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use strew_core::{Node, Pod, PodRef, WatchEvent};
use tokio::sync::RwLock;
use tracing::debug;

/// In-memory cluster state for MockClusterClient
#[derive(Default)]
struct MockState {
    nodes: Vec<Node>,
    pods: Vec<Pod>,
    bind_results: VecDeque<Result<()>>,
    bind_calls: Vec<(PodRef, String)>,
    watch_batches: VecDeque<std::result::Result<Vec<Result<WatchEvent<Pod>>>, ClientError>>,
    list_failures: VecDeque<ClientError>,
}

/// Mock cluster client for testing scheduling logic
///
/// Maintains an in-memory node and pod inventory plus scripted outcomes
/// for watch and bind calls. Unscripted binds behave like the API
/// server: binding an already-bound pod yields a conflict, and a
/// successful binding is applied to the stored pod.
#[derive(Default)]
pub struct MockClusterClient {
    state: Arc<RwLock<MockState>>,
}

impl MockClusterClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_node(&self, node: Node) {
        self.state.write().await.nodes.push(node);
    }

    pub async fn add_pod(&self, pod: Pod) {
        self.state.write().await.pods.push(pod);
    }

    /// Queue a batch of events for the next `watch_pods` call
    ///
    /// The returned stream yields the batch and then ends, like a watch
    /// window expiring.
    pub async fn push_watch_batch(&self, events: Vec<Result<WatchEvent<Pod>>>) {
        self.state.write().await.watch_batches.push_back(Ok(events));
    }

    /// Queue an establishment failure for the next `watch_pods` call
    pub async fn push_watch_failure(&self, error: ClientError) {
        self.state
            .write()
            .await
            .watch_batches
            .push_back(Err(error));
    }

    /// Queue an outcome for the next `bind_pod` call
    pub async fn push_bind_result(&self, result: Result<()>) {
        self.state.write().await.bind_results.push_back(result);
    }

    /// Queue a failure for the next list call
    pub async fn push_list_failure(&self, error: ClientError) {
        self.state.write().await.list_failures.push_back(error);
    }

    /// Every `bind_pod` call made so far, in order
    pub async fn bind_calls(&self) -> Vec<(PodRef, String)> {
        self.state.read().await.bind_calls.clone()
    }
}

#[async_trait]
impl ClusterClient for MockClusterClient {
    async fn list_nodes(&self) -> Result<Vec<Node>> {
        let mut state = self.state.write().await;
        if let Some(err) = state.list_failures.pop_front() {
            return Err(err);
        }
        Ok(state.nodes.clone())
    }

    async fn list_pods(&self) -> Result<Vec<Pod>> {
        let mut state = self.state.write().await;
        if let Some(err) = state.list_failures.pop_front() {
            return Err(err);
        }
        Ok(state.pods.clone())
    }

    async fn watch_pods(&self, _timeout: Duration) -> Result<PodEventStream> {
        let mut state = self.state.write().await;
        match state.watch_batches.pop_front() {
            Some(Ok(events)) => Ok(stream::iter(events).boxed()),
            Some(Err(e)) => Err(e),
            None => Ok(stream::iter(Vec::new()).boxed()),
        }
    }

    async fn bind_pod(&self, pod: &PodRef, node_name: &str) -> Result<()> {
        let mut state = self.state.write().await;
        state.bind_calls.push((pod.clone(), node_name.to_string()));

        if let Some(scripted) = state.bind_results.pop_front() {
            scripted?;
        } else {
            let already_bound = state.pods.iter().any(|p| {
                PodRef::from_pod(p).as_ref() == Some(pod)
                    && p.spec.as_ref().is_some_and(|s| s.node_name.is_some())
            });
            if already_bound {
                return Err(ClientError::conflict(pod.to_string()));
            }
        }

        for p in state.pods.iter_mut() {
            if PodRef::from_pod(p).as_ref() == Some(pod) {
                p.spec.get_or_insert_with(Default::default).node_name =
                    Some(node_name.to_string());
            }
        }
        debug!("Mock: bound pod {} to node {}", pod, node_name);
        Ok(())
    }
}
