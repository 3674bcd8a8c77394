use crate::types::{SchedulingContext, ScoreResult};
use strew_core::{primary_label, Node};
use tracing::debug;

/// Default pod label used to group workloads for spread scoring
pub const DEFAULT_SPREAD_LABEL: &str = "app";

/// Spread score for placing the context's pod on the named node
///
/// One point per pod already assigned to the node, plus two extra
/// points per assigned pod sharing the placed pod's spread label value.
/// Lower is better.
pub fn spread_score(context: &SchedulingContext, node_name: &str, spread_label: &str) -> usize {
    let pod_label = primary_label(&context.pod, spread_label);

    let mut score = 0;
    for other in &context.pods {
        let assigned_here =
            other.spec.as_ref().and_then(|s| s.node_name.as_deref()) == Some(node_name);
        if !assigned_here {
            continue;
        }
        score += 1;
        if let Some(value) = pod_label {
            if primary_label(other, spread_label) == Some(value) {
                score += 2;
            }
        }
    }
    score
}

/// Pick the eligible node with the lowest spread score
///
/// Ties keep the earliest node in list order, so repeated runs over the
/// same snapshot select the same node.
pub fn select_node(
    eligible: &[Node],
    context: &SchedulingContext,
    spread_label: &str,
) -> Option<String> {
    let mut best: Option<ScoreResult> = None;

    for node in eligible {
        let node_name = node
            .metadata
            .name
            .as_ref()
            .unwrap_or(&"unknown".to_string())
            .clone();
        let score = spread_score(context, &node_name, spread_label);
        debug!("Node {} spread score: {}", node_name, score);

        match &best {
            Some(current) if score >= current.score => {}
            _ => best = Some(ScoreResult::new(node_name, score)),
        }
    }

    best.map(|b| b.node_name)
}
