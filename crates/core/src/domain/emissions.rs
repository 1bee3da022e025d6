use serde::{Deserialize, Serialize};

use crate::units::round_to;

/// Where an emissions figure came from. Cached entries keep the source of
/// their first computation; a cache hit never changes it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmissionsSource {
    Api,
    Fallback,
}

impl EmissionsSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Api => "api",
            Self::Fallback => "fallback",
        }
    }
}

/// A single per-method emissions figure. Immutable once created; stored in
/// the cache keyed by fingerprint and re-read (not recomputed) on a hit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EmissionsResult {
    pub method: String,
    pub emissions_kg: f64,
    pub emissions_tonnes: f64,
    pub source: EmissionsSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EmissionsResult {
    /// Builds a result with tonnes derived from kilograms (3-decimal
    /// rounding) when the caller has no authoritative tonnes figure.
    pub fn from_kilograms(
        method: &str,
        emissions_kg: f64,
        source: EmissionsSource,
        note: Option<String>,
    ) -> Self {
        Self {
            method: method.to_string(),
            emissions_kg,
            emissions_tonnes: round_to(emissions_kg / 1000.0, 3),
            source,
            note,
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::{EmissionsResult, EmissionsSource};

    #[test]
    fn tonnes_are_derived_from_kilograms_at_three_decimals() {
        let result =
            EmissionsResult::from_kilograms("truck", 1234.5678, EmissionsSource::Fallback, None);
        assert_eq!(result.emissions_tonnes, 1.235);
    }

    #[test]
    fn source_tags_serialize_to_lowercase() {
        assert_eq!(EmissionsSource::Api.as_str(), "api");
        assert_eq!(EmissionsSource::Fallback.as_str(), "fallback");
        let json = serde_json::to_string(&EmissionsSource::Fallback).expect("serialize");
        assert_eq!(json, "\"fallback\"");
    }
}
