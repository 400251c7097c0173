use super::envelope::round_signal;
use super::{
    validate_scenario_window, BacktestMetrics, BacktestReport, Engine, EngineError, EngineMode,
    LayerPredictions, ResultEnvelope, RunPayload,
};
use crate::signal::{layer_prediction, Layer, RawFeatures};

/// Prediction/backtest engine over the three layer feature maps.
#[derive(Debug, Default, Clone, Copy)]
pub struct Nf3pEngine;

/// Equal-weight prediction per layer (no network blend) and error metrics
/// measured against a zero baseline.
///
/// There is no ground truth here: `mse` and `mae` describe how far the
/// rounded predictions sit from neutral, which makes them a sanity check on
/// the layer scores rather than a model evaluation.
pub fn predictions_and_backtest(
    micro: &RawFeatures,
    mezo: &RawFeatures,
    macro_features: &RawFeatures,
) -> (LayerPredictions, BacktestMetrics) {
    let predictions = LayerPredictions {
        l1: round_signal(layer_prediction(Layer::Micro, micro)),
        l2: round_signal(layer_prediction(Layer::Mezo, mezo)),
        l3: round_signal(layer_prediction(Layer::Macro, macro_features)),
    };

    let values = predictions.values();
    let count = values.len() as f64;
    let mse = values.iter().map(|p| p * p).sum::<f64>() / count;
    let mae = values.iter().map(|p| p.abs()).sum::<f64>() / count;

    (
        predictions,
        BacktestMetrics {
            mse: round_signal(mse),
            mae: round_signal(mae),
        },
    )
}

impl Engine for Nf3pEngine {
    fn mode(&self) -> EngineMode {
        EngineMode::Nf3p
    }

    fn evaluate(&self, payload: &RunPayload, asof: String) -> Result<ResultEnvelope, EngineError> {
        let (scenario, window) = validate_scenario_window(payload)?;
        let (predictions, backtest) = predictions_and_backtest(
            payload.layer_features(Layer::Micro),
            payload.layer_features(Layer::Mezo),
            payload.layer_features(Layer::Macro),
        );

        Ok(BacktestReport {
            schema_version: payload.schema_version_or_default(),
            lineage: payload.lineage_or_default(),
            asof,
            scenario,
            window,
            predictions,
            backtest,
        }
        .into())
    }
}
