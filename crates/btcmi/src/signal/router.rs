use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::numeric::clip;
use crate::domain::PreconditionError;

const LOW_UPPER: f64 = 0.20;
const MID_UPPER: f64 = 0.60;
const SUM_TOLERANCE: f64 = 1e-9;

/// Volatility bucket selecting how the three layers are blended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Regime {
    Low,
    Mid,
    High,
}

impl Regime {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Mid => "mid",
            Self::High => "high",
        }
    }

    /// Fixed layer weights for the regime. Each row sums to 1.
    pub const fn weights(self) -> LevelWeights {
        match self {
            Self::Low => LevelWeights::new(0.15, 0.35, 0.50),
            Self::Mid => LevelWeights::new(0.25, 0.40, 0.35),
            Self::High => LevelWeights::new(0.40, 0.40, 0.20),
        }
    }
}

impl fmt::Display for Regime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Non-negative weights for the micro, mezo and macro layers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LevelWeights {
    #[serde(rename = "L1")]
    pub l1: f64,
    #[serde(rename = "L2")]
    pub l2: f64,
    #[serde(rename = "L3")]
    pub l3: f64,
}

impl LevelWeights {
    pub const KEYS: [&'static str; 3] = ["L1", "L2", "L3"];

    pub const fn new(l1: f64, l2: f64, l3: f64) -> Self {
        Self { l1, l2, l3 }
    }

    /// Build weights from a loosely keyed map, requiring exactly `L1`, `L2`
    /// and `L3`, each non-negative.
    pub fn from_map(map: &BTreeMap<String, f64>) -> Result<Self, LevelWeightsError> {
        let missing: Vec<String> = Self::KEYS
            .iter()
            .filter(|key| !map.contains_key(**key))
            .map(|key| (*key).to_string())
            .collect();
        if !missing.is_empty() {
            return Err(LevelWeightsError::MissingKeys(missing));
        }

        let unexpected: Vec<String> = map
            .keys()
            .filter(|key| !Self::KEYS.contains(&key.as_str()))
            .cloned()
            .collect();
        if !unexpected.is_empty() {
            return Err(LevelWeightsError::UnexpectedKeys(unexpected));
        }

        let weights = Self::new(map["L1"], map["L2"], map["L3"]);
        weights.check_non_negative()?;
        Ok(weights)
    }

    /// NaN counts as negative.
    fn check_non_negative(&self) -> Result<(), LevelWeightsError> {
        let levels = Self::KEYS.into_iter().zip([self.l1, self.l2, self.l3]);
        for (level, value) in levels {
            if value.is_nan() || value < 0.0 {
                return Err(LevelWeightsError::Negative { level, value });
            }
        }
        Ok(())
    }

    pub fn sum(&self) -> f64 {
        self.l1 + self.l2 + self.l3
    }

    /// Scale the weights so they add up to one.
    pub fn normalized(&self) -> Result<Self, LevelWeightsError> {
        self.check_non_negative()?;
        let total = self.sum();
        if total == 0.0 {
            return Err(LevelWeightsError::ZeroSum);
        }
        if (total - 1.0).abs() <= SUM_TOLERANCE {
            return Ok(*self);
        }
        Ok(Self::new(self.l1 / total, self.l2 / total, self.l3 / total))
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LevelWeightsError {
    #[error("level weights missing keys: {}", .0.join(", "))]
    MissingKeys(Vec<String>),
    #[error("level weights contain unexpected keys: {}", .0.join(", "))]
    UnexpectedKeys(Vec<String>),
    #[error("level weights must not sum to zero")]
    ZeroSum,
    #[error("level weight {level} must be non-negative, got {value}")]
    Negative { level: &'static str, value: f64 },
}

/// Regime and layer weights chosen for a volatility percentile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Route {
    pub regime: Regime,
    pub weights: LevelWeights,
}

/// Map a volatility percentile in [0, 1] to its regime.
///
/// Buckets are closed below and open above: 0.20 is `mid`, 0.60 is `high`.
pub fn router_weights(vol_pctl: f64) -> Result<Route, PreconditionError> {
    if !(0.0..=1.0).contains(&vol_pctl) {
        return Err(PreconditionError::VolPercentile(vol_pctl.to_string()));
    }

    let regime = if vol_pctl < LOW_UPPER {
        Regime::Low
    } else if vol_pctl < MID_UPPER {
        Regime::Mid
    } else {
        Regime::High
    };

    Ok(Route {
        regime,
        weights: regime.weights(),
    })
}

/// Blend the three layer signals, re-normalizing weights that do not
/// already sum to one.
pub fn combine_levels(
    l1: f64,
    l2: f64,
    l3: f64,
    weights: &LevelWeights,
) -> Result<f64, LevelWeightsError> {
    let w = weights.normalized()?;
    Ok(clip(w.l1 * l1 + w.l2 * l2 + w.l3 * l3))
}
