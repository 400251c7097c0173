//! Static scale tables and weight profiles for every engine generation.

use super::features::{ScaleTable, WeightProfile};
use crate::domain::Scenario;

const INTRADAY_WEIGHTS: &[(&str, f64)] = &[
    ("price_change_pct", 0.35),
    ("volume_change_pct", 0.25),
    ("funding_rate_bps", -0.10),
    ("oi_change_pct", 0.20),
    ("onchain_active_addrs_change_pct", 0.10),
];

const SCALP_WEIGHTS: &[(&str, f64)] = &[
    ("price_change_pct", 0.45),
    ("volume_change_pct", 0.30),
    ("funding_rate_bps", -0.05),
    ("oi_change_pct", 0.15),
    ("onchain_active_addrs_change_pct", 0.05),
];

const SWING_WEIGHTS: &[(&str, f64)] = &[
    ("price_change_pct", 0.25),
    ("volume_change_pct", 0.15),
    ("funding_rate_bps", -0.10),
    ("oi_change_pct", 0.25),
    ("onchain_active_addrs_change_pct", 0.25),
];

/// Scales for the single feature map read by the v1 engine. The key set
/// doubles as the list of features v1 expects when measuring completeness.
pub const NORM_SCALE: &[(&str, f64)] = &[
    ("price_change_pct", 2.0),
    ("volume_change_pct", 50.0),
    ("funding_rate_bps", 10.0),
    ("oi_change_pct", 20.0),
    ("onchain_active_addrs_change_pct", 20.0),
];

pub(crate) const MICRO_SCALE: &[(&str, f64)] = &[
    ("price_change_pct", 2.0),
    ("volume_change_pct", 50.0),
    ("funding_rate_bps", 10.0),
    ("oi_change_pct", 20.0),
    ("micro_liquidity_gaps", 5.0),
];

pub(crate) const MEZO_SCALE: &[(&str, f64)] = &[
    ("oi_term_structure_slope", 0.5),
    ("funding_premium_spread", 0.5),
    ("net_positioning_index", 0.5),
    ("liquidation_heatmap_entropy", 1.0),
];

pub(crate) const MACRO_SCALE: &[(&str, f64)] = &[
    ("hashrate_trend", 0.5),
    ("active_addrs_trend", 0.5),
    ("supply_in_profit_pct", 0.5),
    ("macro_regime_score", 1.0),
];

/// Weight profile applied by the v1 engine for a scenario.
pub fn scenario_weights(scenario: Scenario) -> WeightProfile {
    let entries = match scenario {
        Scenario::Intraday => INTRADAY_WEIGHTS,
        Scenario::Scalp => SCALP_WEIGHTS,
        Scenario::Swing => SWING_WEIGHTS,
    };
    WeightProfile::from_entries(entries)
}

pub fn norm_scale() -> ScaleTable {
    ScaleTable::from_entries(NORM_SCALE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_scenario_profile_covers_the_expected_features() {
        for scenario in Scenario::ALL {
            let weights = scenario_weights(scenario);
            assert_eq!(weights.len(), NORM_SCALE.len());
            for (key, _) in NORM_SCALE {
                assert!(weights.get(key).is_some(), "{key} missing for {scenario}");
            }
        }
    }

    #[test]
    fn funding_rate_is_a_contrarian_input() {
        for scenario in Scenario::ALL {
            let weights = scenario_weights(scenario);
            assert!(weights.get("funding_rate_bps").unwrap_or_default() < 0.0);
        }
    }
}
