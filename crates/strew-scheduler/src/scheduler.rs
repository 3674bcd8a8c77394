use crate::binder::{BindOutcome, Binder, BinderConfig};
use crate::filter::{default_predicates, eligible_nodes, FilterPredicate};
use crate::score::{select_node, DEFAULT_SPREAD_LABEL};
use crate::types::{ScheduleOutcome, SchedulerStats, SchedulingContext};
use crate::{Result, SchedulerError};
use futures_util::StreamExt;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use strew_client::ClusterClient;
use strew_core::{is_unscheduled, requests_scheduler, Pod, PodRef, WatchEvent};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Consecutive watch establishment failures tolerated before giving up
const MAX_ESTABLISH_FAILURES: u32 = 5;
/// Pause between watch establishment attempts
const ESTABLISH_RETRY_DELAY: Duration = Duration::from_secs(2);

/// Configuration for the scheduler
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Scheduler name claimed from pod spec.schedulerName
    pub scheduler_name: String,
    /// Node labels required of every candidate node
    pub node_label_selector: Option<BTreeMap<String, String>>,
    /// Pod label grouping workloads for spread scoring
    pub spread_label: String,
    /// Watch inactivity window before re-establishing
    pub watch_timeout: Duration,
    /// Binder retry settings
    pub binder: BinderConfig,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            scheduler_name: "strew".to_string(),
            node_label_selector: None,
            spread_label: DEFAULT_SPREAD_LABEL.to_string(),
            watch_timeout: Duration::from_secs(300),
            binder: BinderConfig::default(),
        }
    }
}

/// Event-driven pod scheduler
pub struct Scheduler {
    client: Arc<dyn ClusterClient>,
    config: SchedulerConfig,
    filters: Vec<Box<dyn FilterPredicate>>,
    binder: Binder,
}

impl Scheduler {
    /// Create a new scheduler
    pub fn new(client: Arc<dyn ClusterClient>, config: SchedulerConfig) -> Self {
        let filters = default_predicates(config.node_label_selector.clone());
        let binder = Binder::new(client.clone(), config.binder.clone());
        Self {
            client,
            config,
            filters,
            binder,
        }
    }

    /// Run the scheduling loop until cancelled
    ///
    /// Watches for pod events, schedules each claimed pod to completion
    /// before reading the next event, and re-establishes the watch when
    /// a window expires. Returns an error only when the watch cannot be
    /// established, or kept alive long enough to deliver an event, after
    /// repeated attempts.
    pub async fn run(&self, token: CancellationToken) -> Result<()> {
        info!("Starting scheduler {}", self.config.scheduler_name);

        let mut stats = SchedulerStats::default();
        let mut establish_failures = 0u32;
        let mut result = Ok(());

        'watch: loop {
            if token.is_cancelled() {
                break;
            }

            let mut stream = match self.client.watch_pods(self.config.watch_timeout).await {
                Ok(stream) => stream,
                Err(e) => {
                    establish_failures += 1;
                    if establish_failures >= MAX_ESTABLISH_FAILURES {
                        error!(
                            "Giving up on pod watch after {} failed attempts: {}",
                            establish_failures, e
                        );
                        result = Err(SchedulerError::watch_failed(format!(
                            "failed to establish pod watch after {} attempts: {}",
                            establish_failures, e
                        )));
                        break;
                    }
                    warn!(
                        "Failed to establish pod watch (attempt {}/{}): {}",
                        establish_failures, MAX_ESTABLISH_FAILURES, e
                    );
                    tokio::select! {
                        _ = token.cancelled() => break 'watch,
                        _ = sleep(ESTABLISH_RETRY_DELAY) => {}
                    }
                    continue 'watch;
                }
            };

            let mut delivered_events = false;
            let mut stream_error = None;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break 'watch,
                    event = stream.next() => match event {
                        Some(Ok(event)) => {
                            delivered_events = true;
                            if let Some(pod) = self.claim(event) {
                                self.handle_pod(pod, &token, &mut stats).await;
                            }
                        }
                        Some(Err(e)) => {
                            stream_error = Some(e);
                            break;
                        }
                        None => {
                            debug!("Pod watch window expired; re-establishing");
                            break;
                        }
                    }
                }
            }

            match stream_error {
                // A stream that errors before its first event counts toward
                // the establishment budget and waits out the same delay.
                Some(e) if !delivered_events => {
                    establish_failures += 1;
                    if establish_failures >= MAX_ESTABLISH_FAILURES {
                        error!(
                            "Giving up on pod watch after {} failed attempts: {}",
                            establish_failures, e
                        );
                        result = Err(SchedulerError::watch_failed(format!(
                            "pod watch failed after {} attempts: {}",
                            establish_failures, e
                        )));
                        break;
                    }
                    warn!(
                        "Pod watch failed before delivering events (attempt {}/{}): {}",
                        establish_failures, MAX_ESTABLISH_FAILURES, e
                    );
                    tokio::select! {
                        _ = token.cancelled() => break 'watch,
                        _ = sleep(ESTABLISH_RETRY_DELAY) => {}
                    }
                }
                Some(e) => {
                    warn!("Pod watch stream failed: {}; re-establishing", e);
                    establish_failures = 0;
                }
                None => {
                    establish_failures = 0;
                }
            }
        }

        info!(
            "Scheduler shutting down: {} bound, {} skipped, {} failed",
            stats.bound, stats.skipped, stats.failed
        );
        result
    }

    /// Decide whether a watch event carries a pod this scheduler should place
    fn claim(&self, event: WatchEvent<Pod>) -> Option<Pod> {
        let pod = match event.object {
            Some(pod) => pod,
            None => {
                debug!("Ignoring {:?} event without an object", event.event_type);
                return None;
            }
        };
        let pod_ref = match PodRef::from_pod(&pod) {
            Some(pod_ref) => pod_ref,
            None => {
                debug!("Ignoring pod event without a name");
                return None;
            }
        };
        if !is_unscheduled(&pod) {
            debug!("Pod {} is not awaiting placement", pod_ref);
            return None;
        }
        if !requests_scheduler(&pod, &self.config.scheduler_name) {
            debug!("Pod {} requests a different scheduler", pod_ref);
            return None;
        }
        Some(pod)
    }

    /// Schedule one claimed pod, folding the outcome into the stats
    async fn handle_pod(&self, pod: Pod, token: &CancellationToken, stats: &mut SchedulerStats) {
        let pod_name = pod
            .metadata
            .name
            .as_ref()
            .unwrap_or(&"unknown".to_string())
            .clone();

        match self.schedule_pod(pod, token).await {
            Ok(ScheduleOutcome::Bound { node_name }) => {
                stats.bound += 1;
                info!("Scheduled pod {} to node {}", pod_name, node_name);
            }
            Ok(ScheduleOutcome::Skipped { reason }) => {
                stats.skipped += 1;
                info!("Skipped pod {}: {}", pod_name, reason);
            }
            Err(e) => {
                stats.failed += 1;
                error!("Failed to schedule pod {}: {}", pod_name, e);
            }
        }
    }

    /// Schedule a single pod
    async fn schedule_pod(&self, pod: Pod, token: &CancellationToken) -> Result<ScheduleOutcome> {
        let pod_ref = PodRef::from_pod(&pod)
            .ok_or_else(|| SchedulerError::internal_error("Pod has no name"))?;

        // Fresh snapshots for each placement decision
        let nodes = self.client.list_nodes().await?;
        let pods = self.client.list_pods().await?;

        if nodes.is_empty() {
            return Err(SchedulerError::no_matching_nodes(
                pod_ref.to_string(),
                "EmptyCluster",
            ));
        }

        let context = SchedulingContext::new(pod, pods);

        let eligible = eligible_nodes(&nodes, &context, &self.filters)?;
        info!("Pod {} has {} eligible nodes", pod_ref, eligible.len());

        let node_name = select_node(&eligible, &context, &self.config.spread_label)
            .ok_or_else(|| SchedulerError::internal_error("Filtering left no node to score"))?;

        match self.binder.commit(&pod_ref, &node_name, token).await {
            BindOutcome::Committed => Ok(ScheduleOutcome::Bound { node_name }),
            BindOutcome::AlreadyBound => Ok(ScheduleOutcome::Skipped {
                reason: "already bound by another actor".to_string(),
            }),
            BindOutcome::TransientFailure { message } | BindOutcome::FatalFailure { message } => {
                Err(SchedulerError::bind_failed(pod_ref.to_string(), message))
            }
        }
    }
}
