//! Tolerant deserializers for fields the model fills in loosely.

use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Reads a 0-100 score given as an integer, a float or a numeric string.
/// Out-of-range values are clamped; anything unreadable becomes 0.
pub fn score_0_100<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let raw = match &value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().trim_end_matches('%').trim().parse::<f64>().ok(),
        _ => None,
    };
    Ok(raw
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, 100.0) as i32)
        .unwrap_or(0))
}
