use serde_json::Value;

/// Returns the value as `f64` when it counts as usable numeric input.
///
/// Only JSON numbers that fit a finite `f64` qualify. Booleans are rejected
/// outright even though they are commonly coerced to `0`/`1`; a `true`
/// feature value is dropped from the pipeline rather than scored as `1.0`.
pub fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Bool(_) => None,
        Value::Number(number) => number.as_f64().filter(|parsed| parsed.is_finite()),
        Value::Null | Value::String(_) | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Predicate gate applied wherever raw input is consumed.
pub fn is_number(value: &Value) -> bool {
    as_number(value).is_some()
}

/// Clamp into the closed signal range.
pub fn clip(value: f64) -> f64 {
    value.clamp(-1.0, 1.0)
}

/// Round half away from zero to `places` decimals.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
