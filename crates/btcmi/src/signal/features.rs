use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::numeric::{as_number, clip};

/// Raw, untrusted feature values as they arrive in a payload.
pub type RawFeatures = BTreeMap<String, Value>;

/// Feature name to numeric value, used for normalized values and contributions.
pub type FeatureMap = BTreeMap<String, f64>;

/// Per-feature tanh steepness. Unknown features fall back to a scale of 1.0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScaleTable(BTreeMap<String, f64>);

impl ScaleTable {
    pub fn from_entries(entries: &[(&str, f64)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(key, scale)| ((*key).to_string(), *scale))
                .collect(),
        )
    }

    pub fn scale_for(&self, key: &str) -> f64 {
        self.0.get(key).copied().unwrap_or(1.0)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Signed weight per feature.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WeightProfile(BTreeMap<String, f64>);

impl WeightProfile {
    pub fn from_entries(entries: &[(&str, f64)]) -> Self {
        Self(
            entries
                .iter()
                .map(|(key, weight)| ((*key).to_string(), *weight))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.0.get(key).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(key, weight)| (key.as_str(), *weight))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, f64)> for WeightProfile {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Compress raw values into (-1, 1) with `tanh(raw / scale)`.
///
/// Keys whose value is not numeric (booleans included) are left out of the
/// result, so the output key set may be smaller than the input's. A zero
/// scale yields `0.0` instead of dividing by zero.
pub fn normalize(features: &RawFeatures, scales: &ScaleTable) -> FeatureMap {
    features
        .iter()
        .filter_map(|(key, raw)| {
            let value = as_number(raw)?;
            Some((key.clone(), tanh_norm(value, scales.scale_for(key))))
        })
        .collect()
}

fn tanh_norm(value: f64, scale: f64) -> f64 {
    if scale == 0.0 {
        0.0
    } else {
        (value / scale).tanh()
    }
}

/// Score plus the per-feature terms that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WeightedScore {
    pub score: f64,
    pub contributions: FeatureMap,
}

/// Weighted average of normalized features, clipped to [-1, 1].
///
/// Only weights whose key is present in `norm` take part; the denominator is
/// the sum of their absolute weights, and an empty overlap scores `0.0`.
pub fn weighted_score(norm: &FeatureMap, weights: &WeightProfile) -> WeightedScore {
    let mut sum = 0.0;
    let mut den = 0.0;
    let mut contributions = FeatureMap::new();

    for (key, weight) in weights.iter() {
        if let Some(value) = norm.get(key) {
            let contribution = value * weight;
            contributions.insert(key.to_string(), contribution);
            sum += contribution;
            den += weight.abs();
        }
    }

    let score = if den > 0.0 { clip(sum / den) } else { 0.0 };
    WeightedScore {
        score,
        contributions,
    }
}

/// Equal `1/n` weight over every key of a normalized layer.
pub fn equal_weights(norm: &FeatureMap) -> WeightProfile {
    if norm.is_empty() {
        return WeightProfile::default();
    }
    let weight = 1.0 / norm.len() as f64;
    norm.keys().map(|key| (key.clone(), weight)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn raw(pairs: &[(&str, Value)]) -> RawFeatures {
        pairs
            .iter()
            .map(|(key, value)| ((*key).to_string(), value.clone()))
            .collect()
    }

    #[test]
    fn normalize_skips_non_numeric_and_saturates_extremes() {
        let scales = ScaleTable::from_entries(&[
            ("price_change_pct", 2.0),
            ("volume_change_pct", 50.0),
        ]);
        let features = raw(&[
            ("price_change_pct", json!(1e6)),
            ("volume_change_pct", json!(-1e6)),
            ("funding_rate_bps", json!("bad")),
            ("extra", json!(123)),
            ("flag", json!(true)),
        ]);

        let norm = normalize(&features, &scales);

        let keys: Vec<_> = norm.keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["extra", "price_change_pct", "volume_change_pct"]);
        assert_eq!(norm["price_change_pct"], 1.0);
        assert_eq!(norm["volume_change_pct"], -1.0);
        assert!((norm["extra"] - 123f64.tanh()).abs() < 1e-12);
    }

    #[test]
    fn normalize_zero_scale_yields_zero() {
        let scales = ScaleTable::from_entries(&[("a", 0.0)]);
        let norm = normalize(&raw(&[("a", json!(5.0))]), &scales);
        assert_eq!(norm["a"], 0.0);
    }

    #[test]
    fn normalize_empty_input() {
        assert!(normalize(&RawFeatures::new(), &ScaleTable::default()).is_empty());
    }

    #[test]
    fn weighted_score_uses_only_overlapping_keys() {
        let weights = WeightProfile::from_entries(&[("a", 0.5), ("b", -0.5), ("c", 1.0)]);
        let norm: FeatureMap = [("a".to_string(), 0.4), ("b".to_string(), -0.2)]
            .into_iter()
            .collect();

        let result = weighted_score(&norm, &weights);

        assert!((result.score - 0.3).abs() < 1e-12);
        assert_eq!(result.contributions.len(), 2);
        assert!(!result.contributions.contains_key("c"));
    }

    #[test]
    fn weighted_score_without_overlap_is_zero() {
        let weights = WeightProfile::from_entries(&[("a", 1.0)]);
        let result = weighted_score(&FeatureMap::new(), &weights);
        assert_eq!(result.score, 0.0);
        assert!(result.contributions.is_empty());
    }

    #[test]
    fn weighted_score_with_zero_weights_is_zero() {
        let weights = WeightProfile::from_entries(&[("a", 0.0)]);
        let norm: FeatureMap = [("a".to_string(), 0.9)].into_iter().collect();
        let result = weighted_score(&norm, &weights);
        assert_eq!(result.score, 0.0);
        assert_eq!(result.contributions["a"], 0.0);
    }

    #[test]
    fn equal_weights_split_evenly() {
        let norm: FeatureMap = [
            ("a".to_string(), 0.1),
            ("b".to_string(), 0.2),
            ("c".to_string(), 0.3),
            ("d".to_string(), 0.4),
        ]
        .into_iter()
        .collect();
        let weights = equal_weights(&norm);
        assert_eq!(weights.len(), 4);
        assert!(weights.iter().all(|(_, weight)| weight == 0.25));
        assert!(equal_weights(&FeatureMap::new()).is_empty());
    }
}
