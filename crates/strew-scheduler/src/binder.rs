use std::sync::Arc;
use std::time::Duration;
use strew_client::{ClientError, ClusterClient};
use strew_core::PodRef;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Configuration for the binder
#[derive(Debug, Clone)]
pub struct BinderConfig {
    /// Maximum bind attempts per placement, including the first
    pub max_attempts: u32,
    /// Backoff before the second attempt; doubles each retry
    pub base_backoff: Duration,
}

impl Default for BinderConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_backoff: Duration::from_millis(200),
        }
    }
}

/// Outcome of committing a placement decision
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindOutcome {
    /// The binding was accepted by the API server
    Committed,
    /// Another actor bound the pod first; the existing placement stands
    AlreadyBound,
    /// The attempt failed but a retry may succeed
    TransientFailure { message: String },
    /// The attempt failed and retrying is pointless
    FatalFailure { message: String },
}

/// Classify a bind call result into an outcome
pub fn classify(result: strew_client::Result<()>) -> BindOutcome {
    match result {
        Ok(()) => BindOutcome::Committed,
        Err(ClientError::Conflict { .. }) => BindOutcome::AlreadyBound,
        Err(e) if e.is_transient() => BindOutcome::TransientFailure {
            message: e.to_string(),
        },
        Err(e) => BindOutcome::FatalFailure {
            message: e.to_string(),
        },
    }
}

/// Commits placement decisions against the cluster API
pub struct Binder {
    client: Arc<dyn ClusterClient>,
    config: BinderConfig,
}

impl Binder {
    pub fn new(client: Arc<dyn ClusterClient>, config: BinderConfig) -> Self {
        Self { client, config }
    }

    /// Bind a pod to a node, retrying transient failures with doubling backoff
    ///
    /// Returns `Committed`, `AlreadyBound`, or `FatalFailure`; transient
    /// failures are retried until `max_attempts` is exhausted and then
    /// reported as fatal. Cancellation is honored during backoff waits,
    /// never while a bind call is in flight.
    pub async fn commit(
        &self,
        pod: &PodRef,
        node_name: &str,
        token: &CancellationToken,
    ) -> BindOutcome {
        let mut backoff = self.config.base_backoff;

        for attempt in 1..=self.config.max_attempts {
            match classify(self.client.bind_pod(pod, node_name).await) {
                BindOutcome::Committed => {
                    info!("Bound pod {} to node {}", pod, node_name);
                    return BindOutcome::Committed;
                }
                BindOutcome::AlreadyBound => {
                    info!("Pod {} already bound; leaving existing placement", pod);
                    return BindOutcome::AlreadyBound;
                }
                BindOutcome::FatalFailure { message } => {
                    return BindOutcome::FatalFailure { message };
                }
                BindOutcome::TransientFailure { message } => {
                    if attempt == self.config.max_attempts {
                        return BindOutcome::FatalFailure {
                            message: format!("bind failed after {} attempts: {}", attempt, message),
                        };
                    }
                    warn!(
                        "Bind attempt {}/{} for pod {} failed: {}; retrying in {:?}",
                        attempt, self.config.max_attempts, pod, message, backoff
                    );
                    tokio::select! {
                        _ = token.cancelled() => {
                            return BindOutcome::FatalFailure {
                                message: "bind abandoned: scheduler shutting down".to_string(),
                            };
                        }
                        _ = sleep(backoff) => {}
                    }
                    backoff *= 2;
                }
            }
        }

        // Only reachable when max_attempts is 0
        BindOutcome::FatalFailure {
            message: "bind retry loop exhausted".to_string(),
        }
    }
}
