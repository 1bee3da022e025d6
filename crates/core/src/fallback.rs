//! Static-factor emissions estimates for when the authoritative API is
//! unreachable, errored, or budget-exhausted.

use crate::domain::emissions::{EmissionsResult, EmissionsSource};
use crate::errors::FallbackError;
use crate::units::{normalize_distance, normalize_weight, round_to};

/// Emission factors in kg CO2e per tonne-kilometer, from ECTA, CN Rail,
/// and IPCC reference figures.
pub const FALLBACK_EMISSION_FACTORS: &[(&str, f64)] = &[
    ("plane", 0.602),
    ("air", 0.602),
    ("truck", 0.062),
    ("train", 0.022),
    ("ship", 0.008),
    ("ocean container", 0.008),
];

/// Looks up the static factor for a method, case-insensitively.
pub fn emission_factor(method: &str) -> Option<f64> {
    let normalized = method.trim().to_lowercase();
    FALLBACK_EMISSION_FACTORS
        .iter()
        .find(|(name, _)| *name == normalized)
        .map(|(_, factor)| *factor)
}

/// Computes an approximate emissions figure from the static factor table.
///
/// Inputs are normalized to kilograms/kilometers first; the estimate is
/// `tonnes * km * factor`, rounded to 2 decimals. Unknown methods return
/// an explicit error rather than a zero.
pub fn estimate_fallback(
    weight: f64,
    distance: f64,
    method: &str,
    weight_unit: &str,
    distance_unit: &str,
) -> Result<EmissionsResult, FallbackError> {
    let Some(factor) = emission_factor(method) else {
        return Err(FallbackError::UnsupportedMethod { method: method.to_string() });
    };

    let weight_kg = normalize_weight(weight, weight_unit);
    let distance_km = normalize_distance(distance, distance_unit);
    let emissions_kg = round_to((weight_kg / 1000.0) * (distance_km * factor), 2);

    let note = format!(
        "Static-factor estimate: {weight}{weight_unit} over {distance}{distance_unit} \
         by {method} using ECTA, CN Rail, and IPCC factors"
    );

    Ok(EmissionsResult::from_kilograms(method, emissions_kg, EmissionsSource::Fallback, Some(note)))
}
