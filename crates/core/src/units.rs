//! Weight and distance normalization to canonical metric units.
//!
//! Unit matching is case-insensitive on the trimmed string. Unrecognized
//! units pass through unchanged: callers upstream already default to
//! kg/km, and a hard error here would turn a harmless free-text unit
//! variant into a failed comparison.

const LB_TO_KG: f64 = 0.453592;
const MI_TO_KM: f64 = 1.60934;

/// Converts a weight value to kilograms.
pub fn normalize_weight(value: f64, unit: &str) -> f64 {
    match unit.trim().to_ascii_lowercase().as_str() {
        "g" => value / 1000.0,
        "lb" => value * LB_TO_KG,
        "mt" | "ton" => value * 1000.0,
        _ => value,
    }
}

/// Converts a distance value to kilometers. `m` is meters; it must match
/// exactly so it is never confused with `mi` or `km`.
pub fn normalize_distance(value: f64, unit: &str) -> f64 {
    match unit.trim().to_ascii_lowercase().as_str() {
        "mi" => value * MI_TO_KM,
        "m" => value / 1000.0,
        _ => value,
    }
}

/// Rounds to `places` decimal places, half away from zero.
pub fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}
