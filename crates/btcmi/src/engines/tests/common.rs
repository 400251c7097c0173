use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::{json, Value};

use crate::clock::FixedClock;
use crate::engines::{EngineRegistry, RunPayload};
use crate::output::{OutputSink, PersistenceError};

pub(super) const FIXED_TS: &str = "2025-01-01T00:00:00Z";

#[derive(Default, Clone)]
pub(super) struct RecordingSink {
    writes: Arc<Mutex<Vec<(Value, PathBuf)>>>,
}

impl OutputSink for RecordingSink {
    fn write(&self, data: &Value, path: &Path) -> Result<(), PersistenceError> {
        let mut guard = self.writes.lock().expect("sink mutex poisoned");
        guard.push((data.clone(), path.to_path_buf()));
        Ok(())
    }
}

impl RecordingSink {
    pub(super) fn writes(&self) -> Vec<(Value, PathBuf)> {
        self.writes.lock().expect("sink mutex poisoned").clone()
    }
}

pub(super) struct FailingSink;

impl OutputSink for FailingSink {
    fn write(&self, _data: &Value, path: &Path) -> Result<(), PersistenceError> {
        Err(PersistenceError::Io {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "mock failure"),
        })
    }
}

pub(super) fn registry_with(sink: Arc<dyn OutputSink>) -> EngineRegistry {
    EngineRegistry::new(Arc::new(FixedClock(FIXED_TS.to_string())), sink)
}

pub(super) fn registry() -> EngineRegistry {
    registry_with(Arc::new(RecordingSink::default()))
}

pub(super) fn payload(value: Value) -> RunPayload {
    RunPayload::from_value(value).expect("fixture payload parses")
}

pub(super) fn intraday_payload() -> RunPayload {
    payload(json!({
        "scenario": "intraday",
        "window": "1h",
        "schema_version": "2.0.0",
        "lineage": { "source": "fixture" },
        "features": {
            "price_change_pct": 1.2,
            "volume_change_pct": 25.0,
            "funding_rate_bps": 5.0,
            "oi_change_pct": 4.0,
            "onchain_active_addrs_change_pct": 2.0
        },
        "nagr_nodes": [
            { "weight": 0.6, "score": 0.3 },
            { "weight": 0.4, "score": -0.1 }
        ]
    }))
}

pub(super) fn layered_payload(mode: &str) -> RunPayload {
    payload(json!({
        "scenario": "swing",
        "window": "1d",
        "mode": mode,
        "features_micro": {
            "price_change_pct": 0.8,
            "volume_change_pct": -12.0,
            "micro_liquidity_gaps": 2.0
        },
        "features_mezo": {
            "oi_term_structure_slope": 0.1,
            "funding_premium_spread": -0.05,
            "net_positioning_index": 0.3
        },
        "features_macro": {
            "hashrate_trend": 0.2,
            "supply_in_profit_pct": 0.4,
            "macro_regime_score": "unknown"
        },
        "nagr_nodes": [{ "weight": 1.0, "score": 0.2 }],
        "vol_regime_pctl": 0.7
    }))
}
