use crate::error::{Result, SchedulerError};
use crate::types::{FilterResult, SchedulingContext};
use k8s_openapi::api::core::v1::{NodeSelectorRequirement, NodeSelectorTerm, Taint, Toleration};
use std::collections::BTreeMap;
use strew_core::{Node, Pod, PodRef};
use tracing::debug;

/// Filter predicate trait
pub trait FilterPredicate: Send + Sync {
    /// Filter a node for the given pod
    fn filter(&self, context: &SchedulingContext, node: &Node) -> FilterResult;

    /// Name of the filter
    fn name(&self) -> &str;
}

/// Filter for the scheduler's node label selector
///
/// Restricts placement to nodes carrying every configured label pair.
/// This is a scheduler-level constraint, not read from the pod.
pub struct NodeLabelSelector {
    selector: BTreeMap<String, String>,
}

impl NodeLabelSelector {
    pub fn new(selector: BTreeMap<String, String>) -> Self {
        Self { selector }
    }
}

impl FilterPredicate for NodeLabelSelector {
    fn filter(&self, _context: &SchedulingContext, node: &Node) -> FilterResult {
        let node_name = node
            .metadata
            .name
            .as_ref()
            .unwrap_or(&"unknown".to_string())
            .clone();

        let node_labels = node.metadata.labels.as_ref();

        for (key, value) in &self.selector {
            let node_value = node_labels.and_then(|labels| labels.get(key));
            if node_value != Some(value) {
                return FilterResult::fail(
                    node_name,
                    format!("Node label selector mismatch: {}={}", key, value),
                );
            }
        }

        FilterResult::pass(node_name)
    }

    fn name(&self) -> &str {
        "NodeLabelSelector"
    }
}

/// Filter for taints and tolerations
pub struct TaintToleration;

impl FilterPredicate for TaintToleration {
    fn filter(&self, context: &SchedulingContext, node: &Node) -> FilterResult {
        let node_name = node
            .metadata
            .name
            .as_ref()
            .unwrap_or(&"unknown".to_string())
            .clone();

        match first_untolerated_taint(&context.pod, node) {
            Some(taint) => FilterResult::fail(
                node_name,
                format!("Pod does not tolerate taint: {}={}", taint.key, taint.effect),
            ),
            None => FilterResult::pass(node_name),
        }
    }

    fn name(&self) -> &str {
        "TaintToleration"
    }
}

/// Filter for required node affinity
pub struct NodeAffinityMatch;

impl FilterPredicate for NodeAffinityMatch {
    fn filter(&self, context: &SchedulingContext, node: &Node) -> FilterResult {
        let node_name = node
            .metadata
            .name
            .as_ref()
            .unwrap_or(&"unknown".to_string())
            .clone();

        if node_matches_affinity(&context.pod, node) {
            FilterResult::pass(node_name)
        } else {
            FilterResult::fail(
                node_name,
                "Node does not satisfy required node affinity".to_string(),
            )
        }
    }

    fn name(&self) -> &str {
        "NodeAffinityMatch"
    }
}

/// Check whether a single toleration matches a taint
///
/// An `Exists` toleration with an empty key tolerates every taint. An
/// absent effect matches any effect, and an absent operator means
/// `Equal`. Operators other than `Exists` and `Equal` match nothing.
pub fn toleration_matches(taint: &Taint, toleration: &Toleration) -> bool {
    let operator = toleration.operator.as_deref();
    if operator == Some("Exists") && toleration.key.as_deref().unwrap_or("").is_empty() {
        return true;
    }
    if toleration.key.as_deref() != Some(taint.key.as_str()) {
        return false;
    }
    if let Some(effect) = toleration.effect.as_deref() {
        if effect != taint.effect {
            return false;
        }
    }
    match operator {
        Some("Exists") => true,
        None | Some("Equal") => toleration.value == taint.value,
        _ => false,
    }
}

/// Find the first taint on the node that no pod toleration matches
pub fn first_untolerated_taint<'a>(pod: &Pod, node: &'a Node) -> Option<&'a Taint> {
    let taints = node.spec.as_ref().and_then(|s| s.taints.as_ref())?;
    let no_tolerations = Vec::new();
    let tolerations = pod
        .spec
        .as_ref()
        .and_then(|s| s.tolerations.as_ref())
        .unwrap_or(&no_tolerations);

    taints
        .iter()
        .find(|taint| !tolerations.iter().any(|tol| toleration_matches(taint, tol)))
}

/// Check whether a node satisfies the pod's required node affinity
///
/// Terms are ORed; expressions within a term are ANDed. A pod without
/// required node affinity matches every node. A required selector with
/// an empty term list matches no node.
pub fn node_matches_affinity(pod: &Pod, node: &Node) -> bool {
    let required = match pod
        .spec
        .as_ref()
        .and_then(|s| s.affinity.as_ref())
        .and_then(|a| a.node_affinity.as_ref())
        .and_then(|na| na.required_during_scheduling_ignored_during_execution.as_ref())
    {
        Some(required) => required,
        None => return true,
    };

    let no_labels = BTreeMap::new();
    let labels = node.metadata.labels.as_ref().unwrap_or(&no_labels);

    required
        .node_selector_terms
        .iter()
        .any(|term| term_matches(term, labels))
}

fn term_matches(term: &NodeSelectorTerm, labels: &BTreeMap<String, String>) -> bool {
    term.match_expressions
        .as_ref()
        .map_or(true, |exprs| exprs.iter().all(|e| expression_matches(e, labels)))
}

fn expression_matches(expr: &NodeSelectorRequirement, labels: &BTreeMap<String, String>) -> bool {
    let values = expr.values.as_deref().unwrap_or(&[]);
    match expr.operator.as_str() {
        "In" => labels.get(&expr.key).map_or(false, |v| values.contains(v)),
        "NotIn" => match labels.get(&expr.key) {
            Some(v) => !values.contains(v),
            None => true,
        },
        "Exists" => labels.contains_key(&expr.key),
        "DoesNotExist" => !labels.contains_key(&expr.key),
        _ => false,
    }
}

/// Apply predicates stage by stage, keeping nodes that pass all of them
///
/// Fails with `NoMatchingNodes` naming the stage at which the candidate
/// set became empty.
pub fn eligible_nodes(
    nodes: &[Node],
    context: &SchedulingContext,
    predicates: &[Box<dyn FilterPredicate>],
) -> Result<Vec<Node>> {
    let mut survivors = nodes.to_vec();

    for predicate in predicates {
        survivors.retain(|node| {
            let result = predicate.filter(context, node);
            if !result.passed {
                debug!(
                    "Node {} filtered out by {}: {}",
                    result.node_name,
                    predicate.name(),
                    result.reason.unwrap_or_default()
                );
                return false;
            }
            true
        });

        if survivors.is_empty() {
            let pod_name = PodRef::from_pod(&context.pod)
                .map(|r| r.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            return Err(SchedulerError::no_matching_nodes(pod_name, predicate.name()));
        }
    }

    Ok(survivors)
}

/// Get default filter predicates
///
/// The node label selector stage runs first when configured; taint and
/// affinity checks always run.
pub fn default_predicates(
    node_label_selector: Option<BTreeMap<String, String>>,
) -> Vec<Box<dyn FilterPredicate>> {
    let mut predicates: Vec<Box<dyn FilterPredicate>> = Vec::new();
    if let Some(selector) = node_label_selector {
        predicates.push(Box::new(NodeLabelSelector::new(selector)));
    }
    predicates.push(Box::new(TaintToleration));
    predicates.push(Box::new(NodeAffinityMatch));
    predicates
}
