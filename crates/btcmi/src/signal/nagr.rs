use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

use super::numeric::{as_number, clip};

/// Share of the v1 blend taken by the feature score.
pub const V1_BASE_SHARE: f64 = 0.7;
/// Share of the v1 blend taken by the network rating.
pub const V1_NAGR_SHARE: f64 = 0.3;
/// Share of a v2 layer signal taken by the layer's feature score.
pub const LAYER_BASE_SHARE: f64 = 0.8;
/// Share of a v2 layer signal taken by the network rating.
pub const LAYER_NAGR_SHARE: f64 = 0.2;

/// One externally supplied rating node.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NagrNode {
    pub weight: f64,
    pub score: f64,
}

impl NagrNode {
    /// Coerce a raw node, returning `None` when either field is missing or
    /// fails the numeric classifier.
    pub fn from_value(raw: &Value) -> Option<Self> {
        let weight = raw.get("weight").and_then(as_number)?;
        let score = raw.get("score").and_then(as_number)?;
        Some(Self { weight, score })
    }
}

/// Weighted average of node scores, clipped to [-1, 1].
///
/// Malformed nodes are skipped without failing the aggregation.
pub fn nagr(nodes: &[Value]) -> f64 {
    let mut num = 0.0;
    let mut den = 0.0;

    for raw in nodes {
        let Some(node) = NagrNode::from_value(raw) else {
            debug!(node = %raw, "skipping nagr node with non-numeric data");
            continue;
        };
        num += node.weight * node.score;
        den += node.weight.abs();
    }

    if den > 0.0 {
        clip(num / den)
    } else {
        0.0
    }
}

/// v1 blend of the scenario score with the network rating.
pub fn combine(base: f64, nagr: f64) -> f64 {
    clip(V1_BASE_SHARE * base + V1_NAGR_SHARE * nagr)
}

/// v2 per-layer blend of the layer score with the network rating.
pub fn level_signal(base: f64, nagr: f64) -> f64 {
    clip(LAYER_BASE_SHARE * base + LAYER_NAGR_SHARE * nagr)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn empty_and_zero_weight_inputs_score_zero() {
        assert_eq!(nagr(&[]), 0.0);
        assert_eq!(nagr(&[json!({ "weight": 0.0, "score": 1.0 })]), 0.0);
    }

    #[test]
    fn extreme_scores_are_clipped() {
        assert_eq!(nagr(&[json!({ "weight": 1.0, "score": 2.0 })]), 1.0);
        assert_eq!(nagr(&[json!({ "weight": -1.0, "score": 3.0 })]), -1.0);
    }

    #[test]
    fn malformed_nodes_are_skipped() {
        let nodes = vec![
            json!({ "weight": 1.0, "score": 0.5 }),
            json!({ "weight": "bad", "score": 1.0 }),
            json!({ "weight": 1.0, "score": "bad" }),
            json!({ "weight": true, "score": 0.9 }),
            json!({ "weight": 0.5, "score": false }),
            json!({ "score": 0.7 }),
            json!("not a node"),
        ];
        assert!((nagr(&nodes) - 0.5).abs() < 1e-12);
    }

    #[test]
    fn integer_fields_are_accepted() {
        let nodes = vec![
            json!({ "weight": 1, "score": 0.5 }),
            json!({ "weight": 2, "score": 0.25 }),
        ];
        assert!((nagr(&nodes) - (1.0 / 3.0)).abs() < 1e-12);
    }

    #[test]
    fn combine_uses_fixed_v1_split() {
        assert_eq!(combine(0.0, 0.0), 0.0);
        assert_eq!(combine(1.0, 0.0), 0.7);
        assert_eq!(combine(10.0, 10.0), 1.0);
        assert_eq!(combine(-10.0, -10.0), -1.0);
    }

    #[test]
    fn level_signal_uses_fixed_layer_split() {
        assert!((level_signal(0.5, 0.5) - 0.5).abs() < 1e-12);
        assert!((level_signal(1.0, 0.0) - 0.8).abs() < 1e-12);
        assert_eq!(level_signal(5.0, 5.0), 1.0);
    }
}
