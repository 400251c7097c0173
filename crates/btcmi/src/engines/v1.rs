use super::envelope::{round_map, round_ratio, round_signal};
use super::{
    completeness_advisories, confidence_from, validate_scenario_window, Diagnostics, Engine,
    EngineError, EngineMode, ResultEnvelope, RunPayload, Scenario, V1Details, V1Report,
    V1Summary,
};
use crate::signal::nagr::{V1_BASE_SHARE, V1_NAGR_SHARE};
use crate::signal::profiles::{norm_scale, scenario_weights, NORM_SCALE};
use crate::signal::{
    combine, is_number, nagr, normalize, weighted_score, FeatureMap, RawFeatures, WeightProfile,
};

/// Scenario-weighted engine reading a single `features` map.
#[derive(Debug, Default, Clone, Copy)]
pub struct V1Engine;

/// Scenario score with the profile and per-feature terms behind it.
#[derive(Debug, Clone, PartialEq)]
pub struct BaseSignal {
    pub score: f64,
    pub weights: WeightProfile,
    pub contributions: FeatureMap,
}

/// Score normalized features with the scenario's weight profile.
pub fn base_signal(scenario: Scenario, norm: &FeatureMap) -> BaseSignal {
    let weights = scenario_weights(scenario);
    let scored = weighted_score(norm, &weights);
    BaseSignal {
        score: scored.score,
        weights,
        contributions: scored.contributions,
    }
}

/// Fraction of expected v1 features that are present and numeric.
pub fn completeness(features: &RawFeatures) -> f64 {
    if NORM_SCALE.is_empty() {
        return 1.0;
    }
    let present = NORM_SCALE
        .iter()
        .filter(|(key, _)| features.get(*key).is_some_and(is_number))
        .count();
    present as f64 / NORM_SCALE.len() as f64
}

impl Engine for V1Engine {
    fn mode(&self) -> EngineMode {
        EngineMode::V1
    }

    fn evaluate(&self, payload: &RunPayload, asof: String) -> Result<ResultEnvelope, EngineError> {
        let (scenario, window) = validate_scenario_window(payload)?;

        let norm = normalize(&payload.features, &norm_scale());
        let base = base_signal(scenario, &norm);
        let nagr_score = nagr(&payload.nagr_nodes);
        let overall = combine(base.score, nagr_score);
        let unclipped = V1_BASE_SHARE * base.score + V1_NAGR_SHARE * nagr_score;

        let completeness = completeness(&payload.features);
        let advisories = completeness_advisories(completeness);

        Ok(V1Report {
            schema_version: payload.schema_version_or_default(),
            lineage: payload.lineage_or_default(),
            asof,
            summary: V1Summary {
                scenario,
                window,
                overall_signal: round_signal(overall),
                confidence: confidence_from(completeness),
                router_path: format!("{scenario}/{}", EngineMode::V1),
                nagr_score: round_signal(nagr_score),
                advisories: advisories.clone(),
            },
            details: V1Details {
                normalized_features: round_map(&norm),
                weights: base.weights,
                contributions: round_map(&base.contributions),
                constraints_applied: unclipped != overall,
                diagnostics: Diagnostics {
                    completeness: round_ratio(completeness),
                    notes: advisories,
                },
            },
        }
        .into())
    }
}
