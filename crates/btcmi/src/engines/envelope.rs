use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::{Scenario, Window};
use crate::signal::{round_to, FeatureMap, LevelWeights, Regime, WeightProfile};

/// Decimal places kept for signals, scores and per-feature values.
pub const SIGNAL_PRECISION: i32 = 6;
/// Decimal places kept for confidence and completeness.
pub const RATIO_PRECISION: i32 = 3;

pub(crate) fn round_signal(value: f64) -> f64 {
    round_to(value, SIGNAL_PRECISION)
}

pub(crate) fn round_ratio(value: f64) -> f64 {
    round_to(value, RATIO_PRECISION)
}

pub(crate) fn round_map(values: &FeatureMap) -> FeatureMap {
    values
        .iter()
        .map(|(key, value)| (key.clone(), round_signal(*value)))
        .collect()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostics {
    pub completeness: f64,
    pub notes: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V1Summary {
    pub scenario: Scenario,
    pub window: Window,
    pub overall_signal: f64,
    pub confidence: f64,
    pub router_path: String,
    pub nagr_score: f64,
    pub advisories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V1Details {
    pub normalized_features: FeatureMap,
    pub weights: WeightProfile,
    pub contributions: FeatureMap,
    pub constraints_applied: bool,
    pub diagnostics: Diagnostics,
}

/// Output of the scenario-weighted engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct V1Report {
    pub schema_version: String,
    pub lineage: Map<String, Value>,
    pub asof: String,
    pub summary: V1Summary,
    pub details: V1Details,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalSummary {
    pub scenario: Scenario,
    pub window: Window,
    pub overall_signal: f64,
    pub confidence: f64,
    pub router_path: String,
    pub nagr_score: f64,
    pub advisories: Vec<String>,
    #[serde(rename = "overall_signal_L1")]
    pub overall_signal_l1: f64,
    #[serde(rename = "overall_signal_L2")]
    pub overall_signal_l2: f64,
    #[serde(rename = "overall_signal_L3")]
    pub overall_signal_l3: f64,
    pub level_weights: LevelWeights,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalDetails {
    pub normalized_micro: FeatureMap,
    pub normalized_mezo: FeatureMap,
    pub normalized_macro: FeatureMap,
    pub router_regime: Regime,
    pub diagnostics: Diagnostics,
}

/// Output of the layered, regime-routed engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FractalReport {
    pub schema_version: String,
    pub lineage: Map<String, Value>,
    pub asof: String,
    pub summary: FractalSummary,
    pub details: FractalDetails,
}

/// Equal-weight score per layer.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LayerPredictions {
    #[serde(rename = "L1")]
    pub l1: f64,
    #[serde(rename = "L2")]
    pub l2: f64,
    #[serde(rename = "L3")]
    pub l3: f64,
}

impl LayerPredictions {
    pub fn values(&self) -> [f64; 3] {
        [self.l1, self.l2, self.l3]
    }
}

/// Self-referential error metrics over the layer predictions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BacktestMetrics {
    pub mse: f64,
    pub mae: f64,
}

/// Output of the prediction/backtest engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestReport {
    pub schema_version: String,
    pub lineage: Map<String, Value>,
    pub asof: String,
    pub scenario: Scenario,
    pub window: Window,
    pub predictions: LayerPredictions,
    pub backtest: BacktestMetrics,
}

/// Result produced by any engine. Serialized without a tag so the JSON shape
/// is exactly the engine's report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultEnvelope {
    Fractal(FractalReport),
    V1(V1Report),
    Backtest(BacktestReport),
}

impl ResultEnvelope {
    pub fn asof(&self) -> &str {
        match self {
            Self::Fractal(report) => &report.asof,
            Self::V1(report) => &report.asof,
            Self::Backtest(report) => &report.asof,
        }
    }

    pub fn scenario(&self) -> Scenario {
        match self {
            Self::Fractal(report) => report.summary.scenario,
            Self::V1(report) => report.summary.scenario,
            Self::Backtest(report) => report.scenario,
        }
    }

    /// Headline signal; the backtest report has none.
    pub fn overall_signal(&self) -> Option<f64> {
        match self {
            Self::Fractal(report) => Some(report.summary.overall_signal),
            Self::V1(report) => Some(report.summary.overall_signal),
            Self::Backtest(_) => None,
        }
    }

    pub fn to_value(&self) -> Result<Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

impl From<V1Report> for ResultEnvelope {
    fn from(report: V1Report) -> Self {
        Self::V1(report)
    }
}

impl From<FractalReport> for ResultEnvelope {
    fn from(report: FractalReport) -> Self {
        Self::Fractal(report)
    }
}

impl From<BacktestReport> for ResultEnvelope {
    fn from(report: BacktestReport) -> Self {
        Self::Backtest(report)
    }
}
