//! Display formatting for raw feature values.
//!
//! Feature maps are open and metric-specific; distance/altitude-like keys
//! arrive in whatever unit the exporting device chose. Everything
//! length-like is rendered in kilometers. When the key itself does not name
//! a unit, a magnitude heuristic guesses one; this is a best-effort
//! fallback, not a guarantee, and the `> 10_000` / `> 100` boundaries are
//! an open question until the source service documents its unit contract.

use serde_json::Value;

/// Key fragments treated as length-like when no unit suffix is present
const LENGTH_KEY_HINTS: &[&str] = &["distance", "altitude", "elevation", "ascent", "descent"];

/// Convert one raw feature value into its display string
pub fn format_feature(key: &str, value: &Value) -> String {
    match value {
        Value::Number(n) => {
            let Some(v) = n.as_f64() else {
                return n.to_string();
            };
            match length_unit_for(key, v) {
                Some(unit) => format_km(v * unit.to_km_factor()),
                None => format_number(v),
            }
        }
        Value::String(s) => {
            // Some exporters send numerics as strings
            match s.trim().replace(',', ".").parse::<f64>() {
                Ok(v) if v.is_finite() => format_feature(key, &Value::from(v)),
                _ => s.clone(),
            }
        }
        Value::Bool(b) => b.to_string(),
        Value::Null => "-".to_string(),
        // Structural representation for nested values
        other => other.to_string(),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LengthUnit {
    Millimeters,
    Meters,
    Kilometers,
}

impl LengthUnit {
    fn to_km_factor(self) -> f64 {
        match self {
            LengthUnit::Millimeters => 1e-6,
            LengthUnit::Meters => 1e-3,
            LengthUnit::Kilometers => 1.0,
        }
    }
}

/// Decide whether `key` is length-like and in which unit its value arrives.
/// An explicit suffix always wins; bare length-like keys fall back to the
/// magnitude heuristic.
fn length_unit_for(key: &str, value: f64) -> Option<LengthUnit> {
    let lower = key.to_lowercase();
    let base = lower.trim_end_matches(|c: char| c == ')' || c == ']');

    if base.ends_with("_mm") || base.ends_with("(mm") || base.ends_with("[mm") {
        return Some(LengthUnit::Millimeters);
    }
    if base.ends_with("_km") || base.ends_with("(km") || base.ends_with("[km") {
        return Some(LengthUnit::Kilometers);
    }
    if base.ends_with("_m") || base.ends_with("(m") || base.ends_with("[m") {
        return Some(LengthUnit::Meters);
    }

    if LENGTH_KEY_HINTS.iter().any(|hint| lower.contains(hint)) {
        // Magnitude heuristic for unit-less keys
        return Some(if value.abs() > 10_000.0 {
            LengthUnit::Millimeters
        } else if value.abs() > 100.0 {
            LengthUnit::Meters
        } else {
            LengthUnit::Kilometers
        });
    }

    None
}

fn format_km(km: f64) -> String {
    format!("{} km", trim_trailing_zeros(km, 2))
}

fn format_number(v: f64) -> String {
    trim_trailing_zeros(v, 2)
}

fn trim_trailing_zeros(v: f64, decimals: usize) -> String {
    let s = format!("{:.*}", decimals, v);
    let trimmed = s.trim_end_matches('0').trim_end_matches('.');
    trimmed.to_string()
}
