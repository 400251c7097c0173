use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::signal::{Layer, RawFeatures};

/// Request body shared by every engine.
///
/// Recognized keys are typed; anything else lands in `extra` so callers can
/// attach their own metadata without the payload being rejected.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunPayload {
    /// Kept raw so a wrongly typed value still reaches validation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scenario: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub window: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lineage: Option<Map<String, Value>>,
    #[serde(default)]
    pub features: RawFeatures,
    #[serde(default)]
    pub features_micro: RawFeatures,
    #[serde(default)]
    pub features_mezo: RawFeatures,
    #[serde(default)]
    pub features_macro: RawFeatures,
    #[serde(default)]
    pub nagr_nodes: Vec<Value>,
    /// An explicit `null` stays `Some(Value::Null)` and is rejected later;
    /// only an absent key falls back to the default percentile.
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub vol_regime_pctl: Option<Value>,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl RunPayload {
    pub fn new(scenario: impl Into<String>, window: impl Into<String>) -> Self {
        Self {
            scenario: Some(Value::String(scenario.into())),
            window: Some(Value::String(window.into())),
            ..Self::default()
        }
    }

    pub fn from_value(value: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(value)
    }

    pub fn layer_features(&self, layer: Layer) -> &RawFeatures {
        match layer {
            Layer::Micro => &self.features_micro,
            Layer::Mezo => &self.features_mezo,
            Layer::Macro => &self.features_macro,
        }
    }

    pub(crate) fn schema_version_or_default(&self) -> String {
        self.schema_version
            .clone()
            .unwrap_or_else(|| super::DEFAULT_SCHEMA_VERSION.to_string())
    }

    pub(crate) fn lineage_or_default(&self) -> Map<String, Value> {
        self.lineage.clone().unwrap_or_default()
    }
}
