//! Request vocabulary shared by the signal primitives and the engines.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Trading context selecting the v1 weight profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scenario {
    Intraday,
    Scalp,
    Swing,
}

impl Scenario {
    pub const ALL: [Self; 3] = [Self::Intraday, Self::Scalp, Self::Swing];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Intraday => "intraday",
            Self::Scalp => "scalp",
            Self::Swing => "swing",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scenario| scenario.as_str() == value)
    }

    /// Comma separated, sorted list of accepted values.
    pub fn allowed() -> String {
        sorted_labels(Self::ALL.iter().map(|scenario| scenario.as_str()))
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Time horizon carried through to the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Window {
    #[serde(rename = "1h")]
    OneHour,
    #[serde(rename = "1d")]
    OneDay,
}

impl Window {
    pub const ALL: [Self; 2] = [Self::OneHour, Self::OneDay];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::OneHour => "1h",
            Self::OneDay => "1d",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|window| window.as_str() == value)
    }

    pub fn allowed() -> String {
        sorted_labels(Self::ALL.iter().map(|window| window.as_str()))
    }
}

impl fmt::Display for Window {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn sorted_labels<'a>(labels: impl Iterator<Item = &'a str>) -> String {
    let mut labels: Vec<&str> = labels.collect();
    labels.sort_unstable();
    labels.join(", ")
}

/// How a raw request value is quoted in error messages: strings bare,
/// anything else as JSON.
pub(crate) fn raw_label(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Structural problems with the request. Never retried.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreconditionError {
    #[error("{0} field is required")]
    MissingField(&'static str),
    #[error("scenario must be one of: {allowed} (got '{value}')")]
    InvalidScenario { value: String, allowed: String },
    #[error("window must be one of: {allowed} (got '{value}')")]
    InvalidWindow { value: String, allowed: String },
    #[error("unknown mode: {value} (expected one of: {allowed})")]
    UnknownMode { value: String, allowed: String },
    #[error("vol_regime_pctl must be a number in [0, 1], got {0}")]
    VolPercentile(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn allowed_values_are_sorted() {
        assert_eq!(Scenario::allowed(), "intraday, scalp, swing");
        assert_eq!(Window::allowed(), "1d, 1h");
    }

    #[test]
    fn enums_round_trip_through_their_labels() {
        for scenario in Scenario::ALL {
            assert_eq!(Scenario::parse(scenario.as_str()), Some(scenario));
        }
        for window in Window::ALL {
            assert_eq!(Window::parse(window.as_str()), Some(window));
        }
        assert_eq!(Scenario::parse("INTRADAY"), None);
        assert_eq!(
            serde_json::to_value(Window::OneDay).expect("serializes"),
            json!("1d")
        );
    }

    #[test]
    fn raw_labels_quote_only_non_strings() {
        assert_eq!(raw_label(&json!("weekly")), "weekly");
        assert_eq!(raw_label(&json!(5)), "5");
        assert_eq!(raw_label(&json!(["1h"])), "[\"1h\"]");
    }
}
