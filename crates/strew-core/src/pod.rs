use k8s_openapi::api::core::v1::Pod;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Namespaced pod identity
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PodRef {
    pub namespace: String,
    pub name: String,
}

impl PodRef {
    /// Create a new pod reference
    pub fn new(namespace: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            namespace: namespace.into(),
            name: name.into(),
        }
    }

    /// Extract the identity of a pod.
    ///
    /// Returns `None` when the pod carries no name; an absent namespace
    /// falls back to "default".
    pub fn from_pod(pod: &Pod) -> Option<Self> {
        let name = pod.metadata.name.as_deref()?;
        let namespace = pod.metadata.namespace.as_deref().unwrap_or("default");
        Some(Self::new(namespace, name))
    }
}

impl fmt::Display for PodRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.namespace, self.name)
    }
}

/// Whether the pod has not been assigned to a node yet
pub fn is_unscheduled(pod: &Pod) -> bool {
    pod.spec.as_ref().is_some_and(|s| s.node_name.is_none())
}

/// Whether the pod asks for the named scheduler via `spec.schedulerName`
pub fn requests_scheduler(pod: &Pod, scheduler_name: &str) -> bool {
    pod.spec
        .as_ref()
        .and_then(|s| s.scheduler_name.as_deref())
        == Some(scheduler_name)
}

/// Value of the pod's grouping label, if present
pub fn primary_label<'a>(pod: &'a Pod, label_key: &str) -> Option<&'a str> {
    pod.metadata
        .labels
        .as_ref()
        .and_then(|labels| labels.get(label_key))
        .map(String::as_str)
}
