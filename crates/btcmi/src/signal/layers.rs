use std::fmt;

use serde::{Deserialize, Serialize};

use super::features::{
    equal_weights, normalize, weighted_score, FeatureMap, RawFeatures, ScaleTable,
};
use super::nagr::level_signal;
use super::profiles::{MACRO_SCALE, MEZO_SCALE, MICRO_SCALE};

/// Feature grouping analysed independently by the layered engines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Layer {
    #[serde(rename = "L1")]
    Micro,
    #[serde(rename = "L2")]
    Mezo,
    #[serde(rename = "L3")]
    Macro,
}

impl Layer {
    pub const ALL: [Self; 3] = [Self::Micro, Self::Mezo, Self::Macro];

    pub const fn label(self) -> &'static str {
        match self {
            Self::Micro => "L1",
            Self::Mezo => "L2",
            Self::Macro => "L3",
        }
    }

    /// Payload key holding the layer's raw features.
    pub const fn payload_key(self) -> &'static str {
        match self {
            Self::Micro => "features_micro",
            Self::Mezo => "features_mezo",
            Self::Macro => "features_macro",
        }
    }

    pub fn scales(self) -> ScaleTable {
        let entries = match self {
            Self::Micro => MICRO_SCALE,
            Self::Mezo => MEZO_SCALE,
            Self::Macro => MACRO_SCALE,
        };
        ScaleTable::from_entries(entries)
    }

    /// Normalize a layer's raw features with its own scale table.
    pub fn normalize(self, features: &RawFeatures) -> FeatureMap {
        normalize(features, &self.scales())
    }
}

impl fmt::Display for Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Outcome of scoring one layer.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerSignal {
    pub layer: Layer,
    pub normalized: FeatureMap,
    /// Equal-weight feature score before the network blend.
    pub base: f64,
    /// Layer signal after blending in the shared network rating.
    pub signal: f64,
    pub contributions: FeatureMap,
}

impl LayerSignal {
    /// Score a layer with equal weights and blend in the shared NAGR score.
    pub fn evaluate(layer: Layer, features: &RawFeatures, nagr_score: f64) -> Self {
        let normalized = layer.normalize(features);
        let weights = equal_weights(&normalized);
        let scored = weighted_score(&normalized, &weights);

        Self {
            layer,
            normalized,
            base: scored.score,
            signal: level_signal(scored.score, nagr_score),
            contributions: scored.contributions,
        }
    }

    pub fn has_features(&self) -> bool {
        !self.normalized.is_empty()
    }
}

/// Equal-weight prediction for a layer, without any network blend.
pub fn layer_prediction(layer: Layer, features: &RawFeatures) -> f64 {
    let normalized = layer.normalize(features);
    let weights = equal_weights(&normalized);
    weighted_score(&normalized, &weights).score
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn features(pairs: &[(&str, Value)]) -> RawFeatures {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn layer_uses_its_own_scale_table() {
        let raw = features(&[("hashrate_trend", json!(0.5))]);
        let macro_norm = Layer::Macro.normalize(&raw);
        let micro_norm = Layer::Micro.normalize(&raw);
        assert!((macro_norm["hashrate_trend"] - 1f64.tanh()).abs() < 1e-12);
        assert!((micro_norm["hashrate_trend"] - 0.5f64.tanh()).abs() < 1e-12);
    }

    #[test]
    fn evaluate_blends_base_with_nagr() {
        let raw = features(&[
            ("oi_term_structure_slope", json!(1e6)),
            ("funding_premium_spread", json!(1e6)),
        ]);
        let signal = LayerSignal::evaluate(Layer::Mezo, &raw, -1.0);
        assert_eq!(signal.base, 1.0);
        assert!((signal.signal - 0.6).abs() < 1e-12);
        assert_eq!(signal.contributions.len(), 2);
    }

    #[test]
    fn empty_layer_scores_only_the_network_share() {
        let signal = LayerSignal::evaluate(Layer::Micro, &RawFeatures::new(), 0.5);
        assert!(!signal.has_features());
        assert_eq!(signal.base, 0.0);
        assert!((signal.signal - 0.1).abs() < 1e-12);
    }

    #[test]
    fn boolean_layer_features_are_ignored() {
        let with_flag = features(&[
            ("price_change_pct", json!(0.5)),
            ("volume_change_pct", json!(false)),
        ]);
        let without_flag = features(&[("price_change_pct", json!(0.5))]);
        assert_eq!(
            Layer::Micro.normalize(&with_flag),
            Layer::Micro.normalize(&without_flag)
        );
        assert_eq!(
            layer_prediction(Layer::Micro, &with_flag),
            layer_prediction(Layer::Micro, &without_flag)
        );
    }
}
