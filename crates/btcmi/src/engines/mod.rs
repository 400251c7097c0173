//! Engine generations and the dispatch contract tying them together.
//!
//! Every engine reads a [`RunPayload`], validates `scenario`/`window` before
//! doing anything else, and returns a [`ResultEnvelope`]. The set of engines
//! is closed: [`EngineMode`] enumerates them and [`EngineMode::engine`] is
//! the only lookup.

pub mod envelope;
pub mod fractal;
pub mod nf3p;
pub mod payload;
pub mod registry;
pub mod v1;

#[cfg(test)]
mod tests;

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

use crate::domain::{raw_label, sorted_labels};
use crate::output::PersistenceError;
use crate::signal::{as_number, LevelWeightsError};

pub use crate::domain::{PreconditionError, Scenario, Window};
pub use envelope::{
    BacktestMetrics, BacktestReport, Diagnostics, FractalDetails, FractalReport, FractalSummary,
    LayerPredictions, ResultEnvelope, V1Details, V1Report, V1Summary,
};
pub use fractal::FractalEngine;
pub use nf3p::{predictions_and_backtest, Nf3pEngine};
pub use payload::RunPayload;
pub use registry::EngineRegistry;
pub use v1::V1Engine;

/// `schema_version` stamped on reports when the payload does not carry one.
pub const DEFAULT_SCHEMA_VERSION: &str = "2.0.0";
/// Completeness below this adds the `low_feature_completeness` advisory.
pub const LOW_COMPLETENESS_THRESHOLD: f64 = 0.6;
pub const LOW_COMPLETENESS_ADVISORY: &str = "low_feature_completeness";
/// Volatility percentile assumed when the payload omits one.
pub const DEFAULT_VOL_PERCENTILE: f64 = 0.5;

/// Identifier of an engine generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EngineMode {
    #[default]
    V1,
    Fractal,
    Nf3p,
}

impl EngineMode {
    pub const ALL: [Self; 3] = [Self::V1, Self::Fractal, Self::Nf3p];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::V1 => "v1",
            Self::Fractal => "v2.fractal",
            Self::Nf3p => "v2.nf3p",
        }
    }

    pub fn engine(self) -> &'static dyn Engine {
        match self {
            Self::V1 => &V1Engine,
            Self::Fractal => &FractalEngine,
            Self::Nf3p => &Nf3pEngine,
        }
    }

    pub fn allowed() -> String {
        sorted_labels(Self::ALL.iter().map(|mode| mode.as_str()))
    }
}

impl fmt::Display for EngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineMode {
    type Err = PreconditionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|mode| mode.as_str() == value)
            .ok_or_else(|| PreconditionError::UnknownMode {
                value: value.to_string(),
                allowed: Self::allowed(),
            })
    }
}

/// Shared contract of every engine generation.
pub trait Engine: Send + Sync {
    fn mode(&self) -> EngineMode;

    /// Compute the report for `payload`, stamping it with `asof`.
    fn evaluate(&self, payload: &RunPayload, asof: String) -> Result<ResultEnvelope, EngineError>;
}

#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Precondition(#[from] PreconditionError),
    #[error(transparent)]
    LevelWeights(#[from] LevelWeightsError),
    #[error("failed to serialize report: {0}")]
    Encode(#[from] serde_json::Error),
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

impl EngineError {
    /// Whether the caller caused the failure.
    pub fn is_caller_error(&self) -> bool {
        matches!(self, Self::Precondition(_) | Self::LevelWeights(_))
    }
}

/// Check `scenario` and `window`; the first step of every engine.
pub fn validate_scenario_window(
    payload: &RunPayload,
) -> Result<(Scenario, Window), PreconditionError> {
    let raw_scenario = payload
        .scenario
        .as_ref()
        .ok_or(PreconditionError::MissingField("scenario"))?;
    let scenario = raw_scenario
        .as_str()
        .and_then(Scenario::parse)
        .ok_or_else(|| PreconditionError::InvalidScenario {
            value: raw_label(raw_scenario),
            allowed: Scenario::allowed(),
        })?;

    let raw_window = payload
        .window
        .as_ref()
        .ok_or(PreconditionError::MissingField("window"))?;
    let window = raw_window
        .as_str()
        .and_then(Window::parse)
        .ok_or_else(|| PreconditionError::InvalidWindow {
            value: raw_label(raw_window),
            allowed: Window::allowed(),
        })?;

    Ok((scenario, window))
}

/// Read `vol_regime_pctl`, defaulting to the midpoint only when the key is
/// absent. An explicit `null` is as invalid as any other non-number.
pub(crate) fn vol_percentile(raw: Option<&Value>) -> Result<f64, PreconditionError> {
    match raw {
        None => Ok(DEFAULT_VOL_PERCENTILE),
        Some(value) => {
            as_number(value).ok_or_else(|| PreconditionError::VolPercentile(value.to_string()))
        }
    }
}

pub(crate) fn confidence_from(completeness: f64) -> f64 {
    envelope::round_ratio(0.5 + 0.5 * completeness.clamp(0.0, 1.0))
}

pub(crate) fn completeness_advisories(completeness: f64) -> Vec<String> {
    if completeness < LOW_COMPLETENESS_THRESHOLD {
        vec![LOW_COMPLETENESS_ADVISORY.to_string()]
    } else {
        Vec::new()
    }
}
