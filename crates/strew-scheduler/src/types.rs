use strew_core::Pod;

/// Scheduling context for a single placement decision
#[derive(Debug, Clone)]
pub struct SchedulingContext {
    /// Pod to be placed
    pub pod: Pod,
    /// All pods in the cluster, bound and unbound, for spread scoring
    pub pods: Vec<Pod>,
}

impl SchedulingContext {
    /// Create a new scheduling context
    pub fn new(pod: Pod, pods: Vec<Pod>) -> Self {
        Self { pod, pods }
    }
}

/// Result of filtering a node
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Node name
    pub node_name: String,
    /// Whether the node passed the filter
    pub passed: bool,
    /// Reason for failure (if any)
    pub reason: Option<String>,
}

impl FilterResult {
    /// Create a passing filter result
    pub fn pass(node_name: String) -> Self {
        Self {
            node_name,
            passed: true,
            reason: None,
        }
    }

    /// Create a failing filter result
    pub fn fail(node_name: String, reason: String) -> Self {
        Self {
            node_name,
            passed: false,
            reason: Some(reason),
        }
    }
}

/// Result of scoring a node
#[derive(Debug, Clone)]
pub struct ScoreResult {
    /// Node name
    pub node_name: String,
    /// Spread score (lower is better)
    pub score: usize,
}

impl ScoreResult {
    /// Create a new score result
    pub fn new(node_name: String, score: usize) -> Self {
        Self { node_name, score }
    }
}

/// Outcome of handling one claimed pod
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    /// The pod was bound to the named node
    Bound { node_name: String },
    /// The pod needed no action from this scheduler
    Skipped { reason: String },
}

/// Counters reported when the scheduling loop shuts down
#[derive(Debug, Clone, Copy, Default)]
pub struct SchedulerStats {
    /// Pods bound by this scheduler
    pub bound: u64,
    /// Pods claimed but needing no action
    pub skipped: u64,
    /// Pods whose placement failed
    pub failed: u64,
}
