use tracing::debug;

use super::envelope::{round_map, round_ratio, round_signal};
use super::{
    completeness_advisories, confidence_from, validate_scenario_window, vol_percentile,
    Diagnostics, Engine, EngineError, EngineMode, FractalDetails, FractalReport, FractalSummary,
    ResultEnvelope, RunPayload,
};
use crate::signal::{combine_levels, nagr, router_weights, Layer, LayerSignal};

/// Layered engine: scores micro, mezo and macro features separately and
/// blends them with weights picked by the volatility regime.
#[derive(Debug, Default, Clone, Copy)]
pub struct FractalEngine;

impl Engine for FractalEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::Fractal
    }

    fn evaluate(&self, payload: &RunPayload, asof: String) -> Result<ResultEnvelope, EngineError> {
        let (scenario, window) = validate_scenario_window(payload)?;
        let route = router_weights(vol_percentile(payload.vol_regime_pctl.as_ref())?)?;

        // One node list is shared by all three layers.
        let nagr_score = nagr(&payload.nagr_nodes);
        let [micro, mezo, macro_layer] = Layer::ALL
            .map(|layer| LayerSignal::evaluate(layer, payload.layer_features(layer), nagr_score));

        let overall = combine_levels(
            micro.signal,
            mezo.signal,
            macro_layer.signal,
            &route.weights,
        )?;

        let covered = [&micro, &mezo, &macro_layer]
            .iter()
            .filter(|layer| layer.has_features())
            .count();
        let coverage = covered as f64 / Layer::ALL.len() as f64;
        let advisories = completeness_advisories(coverage);

        debug!(
            regime = %route.regime,
            l1 = micro.signal,
            l2 = mezo.signal,
            l3 = macro_layer.signal,
            "layers combined"
        );

        Ok(FractalReport {
            schema_version: payload.schema_version_or_default(),
            lineage: payload.lineage_or_default(),
            asof,
            summary: FractalSummary {
                scenario,
                window,
                overall_signal: round_signal(overall),
                confidence: confidence_from(coverage),
                router_path: format!("{scenario}/{}", EngineMode::Fractal),
                nagr_score: round_signal(nagr_score),
                advisories: advisories.clone(),
                overall_signal_l1: round_signal(micro.signal),
                overall_signal_l2: round_signal(mezo.signal),
                overall_signal_l3: round_signal(macro_layer.signal),
                level_weights: route.weights,
            },
            details: FractalDetails {
                normalized_micro: round_map(&micro.normalized),
                normalized_mezo: round_map(&mezo.normalized),
                normalized_macro: round_map(&macro_layer.normalized),
                router_regime: route.regime,
                diagnostics: Diagnostics {
                    completeness: round_ratio(coverage),
                    notes: advisories,
                },
            },
        }
        .into())
    }
}
