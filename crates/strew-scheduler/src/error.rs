// Allow unused assignments for diagnostic fields - they're used by the macros
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Scheduler error type
#[derive(Error, Debug, Diagnostic)]
pub enum SchedulerError {
    /// Every node was eliminated during filtering
    #[error("No matching nodes for pod {pod_name}: eliminated at {stage}")]
    #[diagnostic(
        code(scheduler::no_matching_nodes),
        help("Check node taints, node labels, and the pod's affinity requirements")
    )]
    NoMatchingNodes { pod_name: String, stage: String },

    /// Cluster API call failed
    #[error("Cluster API error: {0}")]
    #[diagnostic(
        code(scheduler::client_error),
        help("Check that the API server is running and reachable")
    )]
    ClientError(#[from] strew_client::ClientError),

    /// Binding could not be committed
    #[error("Failed to bind pod {pod_name}: {message}")]
    #[diagnostic(
        code(scheduler::bind_failed),
        help("The placement decision was made but could not be committed")
    )]
    BindFailed { pod_name: String, message: String },

    /// The pod watch could not be sustained
    #[error("Pod watch failed: {message}")]
    #[diagnostic(
        code(scheduler::watch_failed),
        help("Check that the API server is running and supports watch requests")
    )]
    WatchFailed { message: String },

    /// Internal error
    #[error("Internal error: {message}")]
    #[diagnostic(
        code(scheduler::internal_error),
        help("This is likely a bug. Please report it")
    )]
    InternalError { message: String },
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

impl SchedulerError {
    /// Create a NoMatchingNodes error
    pub fn no_matching_nodes(pod_name: impl Into<String>, stage: impl Into<String>) -> Self {
        Self::NoMatchingNodes {
            pod_name: pod_name.into(),
            stage: stage.into(),
        }
    }

    /// Create a BindFailed error
    pub fn bind_failed(pod_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::BindFailed {
            pod_name: pod_name.into(),
            message: message.into(),
        }
    }

    /// Create a WatchFailed error
    pub fn watch_failed(message: impl Into<String>) -> Self {
        Self::WatchFailed {
            message: message.into(),
        }
    }

    /// Create an InternalError
    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError {
            message: message.into(),
        }
    }
}
