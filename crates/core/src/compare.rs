//! Per-method emissions comparison with cache-first lookup, a bounded
//! API-call budget, and deterministic ranking.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::cache::EmissionsCache;
use crate::domain::emissions::EmissionsResult;
use crate::domain::shipment::ShipmentRequest;
use crate::errors::{ApiError, CompareError, ResolutionError};
use crate::estimate::EstimationClient;
use crate::fallback::estimate_fallback;
use crate::fingerprint::fingerprint;
use crate::resolve::DistanceResolver;
use crate::units::{normalize_distance, normalize_weight, round_to};

/// Paid estimation calls permitted within one comparison request. The
/// counter tracks attempted calls, not successes: a flapping endpoint must
/// not be retried past the budget.
pub const DEFAULT_API_CALL_BUDGET: u32 = 3;

/// Outcome for one compared method. A method the fallback table does not
/// know becomes an inline error entry; it never aborts the other methods.
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MethodOutcome {
    Estimated(EmissionsResult),
    Unsupported { detail: String },
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct MethodEntry {
    pub method: String,
    #[serde(flatten)]
    pub outcome: MethodOutcome,
}

/// Per-method outcomes in input order, plus the generated summary.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ComparisonResult {
    pub entries: Vec<MethodEntry>,
    pub summary: String,
}

impl ComparisonResult {
    pub fn outcome(&self, method: &str) -> Option<&MethodOutcome> {
        self.entries
            .iter()
            .find(|entry| entry.method.eq_ignore_ascii_case(method))
            .map(|entry| &entry.outcome)
    }

    /// The lowest-footprint method: minimum `emissions_kg` among estimated
    /// entries, ties broken by first occurrence in input order.
    pub fn lowest(&self) -> Option<&MethodEntry> {
        let method = lowest_method(&self.entries)?;
        self.entries.iter().find(|entry| entry.method == method)
    }
}

/// Orchestrates a comparison across transport methods: resolve distance,
/// consult the cache, spend the API budget, fall back to static factors,
/// and rank the outcomes.
///
/// Methods are processed strictly in input order, one at a time: whether a
/// later method may still call the paid API depends on how many calls
/// earlier methods consumed.
pub struct ComparisonEngine {
    cache: Arc<EmissionsCache>,
    estimator: Arc<dyn EstimationClient>,
    resolver: Arc<dyn DistanceResolver>,
    api_call_budget: u32,
}

impl ComparisonEngine {
    pub fn new(
        cache: Arc<EmissionsCache>,
        estimator: Arc<dyn EstimationClient>,
        resolver: Arc<dyn DistanceResolver>,
    ) -> Self {
        Self { cache, estimator, resolver, api_call_budget: DEFAULT_API_CALL_BUDGET }
    }

    pub fn with_api_call_budget(mut self, api_call_budget: u32) -> Self {
        self.api_call_budget = api_call_budget;
        self
    }

    pub fn cache(&self) -> &EmissionsCache {
        &self.cache
    }

    /// Compares every requested transport method for one shipment.
    pub async fn compare(
        &self,
        request: &ShipmentRequest,
    ) -> Result<ComparisonResult, CompareError> {
        if request.transport_methods.is_empty() {
            return Err(CompareError::EmptyMethods);
        }

        let (distance_value, distance_unit) = self.resolve_distance(request).await?;

        let weight_kg = round_to(normalize_weight(request.weight_value, &request.weight_unit), 1);
        let distance_km = round_to(normalize_distance(distance_value, &distance_unit), 1);

        let mut entries = Vec::with_capacity(request.transport_methods.len());
        let mut api_calls = 0u32;

        for method in &request.transport_methods {
            let outcome = self
                .estimate_method(weight_kg, distance_km, method, &mut api_calls)
                .await;
            entries.push(MethodEntry { method: method.clone(), outcome });
        }

        let summary = build_summary(
            &entries,
            request.weight_value,
            &request.weight_unit,
            distance_value,
            &distance_unit,
            request.origin.as_deref(),
            request.destination.as_deref(),
        );

        Ok(ComparisonResult { entries, summary })
    }

    /// Single-method estimate: cache-first, then the paid API. Unlike a
    /// comparison, an [`ApiError`] here surfaces to the caller directly —
    /// there is no automatic fallback.
    pub async fn estimate_single(
        &self,
        weight_value: f64,
        distance_value: f64,
        method: &str,
        weight_unit: &str,
        distance_unit: &str,
    ) -> Result<EmissionsResult, ApiError> {
        let weight_kg = round_to(normalize_weight(weight_value, weight_unit), 1);
        let distance_km = round_to(normalize_distance(distance_value, distance_unit), 1);
        let key = fingerprint(weight_kg, distance_km, method);

        if let Some(cached) = self.cache.get(key) {
            debug!(event_name = "compare.cache_hit", method, "serving cached estimate");
            return Ok(recalled(cached, self.cache.provenance(key).map(|record| record.note)));
        }

        let result = self.estimator.estimate(weight_kg, distance_km, method).await?;
        self.cache.put(key, result.clone(), api_provenance(weight_kg, distance_km, method));
        Ok(result)
    }

    async fn resolve_distance(
        &self,
        request: &ShipmentRequest,
    ) -> Result<(f64, String), CompareError> {
        if let Some(distance_value) = request.distance_value {
            return Ok((distance_value, request.distance_unit.clone()));
        }

        match (&request.origin, &request.destination) {
            (Some(origin), Some(destination)) => {
                let resolved = self.resolver.resolve(origin, destination).await?;
                Ok((resolved.distance_km, "km".to_string()))
            }
            _ => Err(ResolutionError::MissingDistance.into()),
        }
    }

    async fn estimate_method(
        &self,
        weight_kg: f64,
        distance_km: f64,
        method: &str,
        api_calls: &mut u32,
    ) -> MethodOutcome {
        let key = fingerprint(weight_kg, distance_km, method);

        if let Some(cached) = self.cache.get(key) {
            debug!(event_name = "compare.cache_hit", method, "reusing cached result");
            let note = self.cache.provenance(key).map(|record| record.note);
            return MethodOutcome::Estimated(recalled(cached, note));
        }

        if *api_calls < self.api_call_budget {
            *api_calls += 1;
            match self.estimator.estimate(weight_kg, distance_km, method).await {
                Ok(result) => {
                    self.cache.put(
                        key,
                        result.clone(),
                        api_provenance(weight_kg, distance_km, method),
                    );
                    return MethodOutcome::Estimated(result);
                }
                Err(error) => {
                    warn!(
                        event_name = "compare.api_error",
                        method,
                        error = %error,
                        "estimation api failed, using static factors"
                    );
                }
            }
        } else {
            debug!(
                event_name = "compare.budget_exhausted",
                method,
                budget = self.api_call_budget,
                "api budget spent, using static factors"
            );
        }

        match estimate_fallback(weight_kg, distance_km, method, "kg", "km") {
            Ok(result) => {
                let note = result.note.clone().unwrap_or_else(|| "static-factor estimate".to_string());
                self.cache.put(key, result.clone(), note);
                MethodOutcome::Estimated(result)
            }
            Err(error) => MethodOutcome::Unsupported { detail: error.to_string() },
        }
    }
}

/// A cached value re-served to the caller, with its provenance surfaced so
/// repeated answers are traceable to their first computation.
fn recalled(result: EmissionsResult, note: Option<String>) -> EmissionsResult {
    match note {
        Some(note) => result.with_note(format!("As mentioned earlier: {note}.")),
        None => result,
    }
}

fn api_provenance(weight_kg: f64, distance_km: f64, method: &str) -> String {
    format!("API estimate: {weight_kg}kg over {distance_km}km by {method}")
}

fn build_summary(
    entries: &[MethodEntry],
    weight_value: f64,
    weight_unit: &str,
    distance_value: f64,
    distance_unit: &str,
    origin: Option<&str>,
    destination: Option<&str>,
) -> String {
    let location_part = match (origin, destination) {
        (Some(origin), Some(destination)) => format!(" from {origin} to {destination}"),
        _ => String::new(),
    };
    let shipment_desc =
        format!("{weight_value}{weight_unit} shipment{location_part} over {distance_value}{distance_unit}");

    let mut lines = Vec::with_capacity(entries.len());
    let mut ranked_parts = Vec::new();

    for entry in entries {
        match &entry.outcome {
            MethodOutcome::Estimated(result) => {
                let kg = round_to(result.emissions_kg, 2);
                let tonnes = round_to(result.emissions_tonnes, 2);
                let mut line = format!("- {}: {kg} kg CO₂e ({tonnes} tonnes)", entry.method);
                if let Some(note) = &result.note {
                    line.push_str(&format!(" | {note}"));
                }
                lines.push(line);
                ranked_parts.push(format!("{}: {kg} kg CO₂e ({tonnes} t)", capitalize(&entry.method)));
            }
            MethodOutcome::Unsupported { detail } => {
                lines.push(format!("- {}: {detail}", entry.method));
            }
        }
    }

    let mut summary = lines.join("\n");
    summary.push_str(&format!(
        "\nFor a {shipment_desc}, emissions are: {}.",
        ranked_parts.join("; ")
    ));

    let lowest = lowest_method(entries);
    if let Some(method) = lowest {
        summary.push_str(&format!(" {} has the lowest footprint.", capitalize(method)));
    }

    summary
}

fn lowest_method(entries: &[MethodEntry]) -> Option<&str> {
    let mut lowest: Option<(&str, f64)> = None;
    for entry in entries {
        let MethodOutcome::Estimated(result) = &entry.outcome else {
            continue;
        };
        let beats_current = match lowest {
            Some((_, best_kg)) => result.emissions_kg < best_kg,
            None => true,
        };
        if beats_current {
            lowest = Some((entry.method.as_str(), result.emissions_kg));
        }
    }
    lowest.map(|(method, _)| method)
}

fn capitalize(method: &str) -> String {
    let mut chars = method.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    use async_trait::async_trait;

    use crate::cache::EmissionsCache;
    use crate::domain::emissions::{EmissionsResult, EmissionsSource};
    use crate::domain::shipment::ShipmentRequest;
    use crate::errors::{ApiError, CompareError, ResolutionError};
    use crate::estimate::EstimationClient;
    use crate::resolve::{DistanceResolver, ResolvedDistance};

    use super::{ComparisonEngine, MethodOutcome};

    /// Deterministic stand-in for the paid API: emissions proportional to
    /// weight, distance, and a per-method multiplier; counts invocations.
    struct StubEstimator {
        calls: AtomicU32,
        fail: bool,
    }

    impl StubEstimator {
        fn new() -> Self {
            Self { calls: AtomicU32::new(0), fail: false }
        }

        fn failing() -> Self {
            Self { calls: AtomicU32::new(0), fail: true }
        }

        fn call_count(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl EstimationClient for StubEstimator {
        async fn estimate(
            &self,
            weight_kg: f64,
            distance_km: f64,
            method: &str,
        ) -> Result<EmissionsResult, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ApiError::Status { status: 500, body: "boom".to_string() });
            }

            let multiplier = match method.to_lowercase().as_str() {
                "air" | "plane" => 10.0,
                "truck" => 3.0,
                "train" | "rail" => 2.0,
                _ => 1.0,
            };
            Ok(EmissionsResult::from_kilograms(
                method,
                (weight_kg / 1000.0) * distance_km * multiplier,
                EmissionsSource::Api,
                None,
            ))
        }
    }

    struct StubResolver {
        distance_km: Option<f64>,
    }

    #[async_trait]
    impl DistanceResolver for StubResolver {
        async fn resolve(
            &self,
            origin: &str,
            destination: &str,
        ) -> Result<ResolvedDistance, ResolutionError> {
            match self.distance_km {
                Some(distance_km) => Ok(ResolvedDistance {
                    origin: origin.to_string(),
                    destination: destination.to_string(),
                    distance_km,
                }),
                None => Err(ResolutionError::Geocode { place: origin.to_string() }),
            }
        }
    }

    fn engine_with(
        estimator: Arc<StubEstimator>,
        resolver_distance: Option<f64>,
    ) -> ComparisonEngine {
        ComparisonEngine::new(
            Arc::new(EmissionsCache::new()),
            estimator,
            Arc::new(StubResolver { distance_km: resolver_distance }),
        )
    }

    fn methods(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| (*name).to_string()).collect()
    }

    #[tokio::test]
    async fn second_identical_compare_is_served_entirely_from_cache() {
        let estimator = Arc::new(StubEstimator::new());
        let engine = engine_with(estimator.clone(), None);
        let request =
            ShipmentRequest::new(100.0, methods(&["air", "truck"])).with_distance(500.0);

        let first = engine.compare(&request).await.expect("first comparison");
        let calls_after_first = estimator.call_count();
        let second = engine.compare(&request).await.expect("second comparison");

        assert_eq!(calls_after_first, 2);
        assert_eq!(estimator.call_count(), calls_after_first, "no additional api calls");
        assert_eq!(first.entries.len(), second.entries.len());
        for (a, b) in first.entries.iter().zip(second.entries.iter()) {
            let (MethodOutcome::Estimated(first_result), MethodOutcome::Estimated(second_result)) =
                (&a.outcome, &b.outcome)
            else {
                panic!("both runs should estimate every method");
            };
            assert_eq!(first_result.emissions_kg, second_result.emissions_kg);
            assert_eq!(first_result.source, second_result.source);
        }
        let cached_note = match &second.entries[0].outcome {
            MethodOutcome::Estimated(result) => result.note.clone().expect("cached note"),
            MethodOutcome::Unsupported { .. } => panic!("expected estimate"),
        };
        assert!(cached_note.starts_with("As mentioned earlier:"));
    }

    #[tokio::test]
    async fn requests_differing_in_second_decimal_hit_the_same_entry() {
        let estimator = Arc::new(StubEstimator::new());
        let engine = engine_with(estimator.clone(), None);

        let first = ShipmentRequest::new(100.04, methods(&["Air"])).with_distance(500.02);
        let second = ShipmentRequest::new(100.0, methods(&["air"])).with_distance(500.0);

        engine.compare(&first).await.expect("first comparison");
        engine.compare(&second).await.expect("second comparison");

        assert_eq!(estimator.call_count(), 1, "rounded inputs must share one cache entry");
    }

    #[tokio::test]
    async fn budget_caps_api_calls_and_routes_the_rest_to_fallback() {
        let estimator = Arc::new(StubEstimator::new());
        let engine = engine_with(estimator.clone(), None);
        let request = ShipmentRequest::new(1000.0, methods(&["air", "truck", "train", "ship", "plane"]))
            .with_distance(1000.0);

        let result = engine.compare(&request).await.expect("comparison");

        assert_eq!(estimator.call_count(), 3, "at most three paid calls per request");
        let sources: Vec<_> = result
            .entries
            .iter()
            .map(|entry| match &entry.outcome {
                MethodOutcome::Estimated(result) => result.source,
                MethodOutcome::Unsupported { .. } => panic!("all methods are supported"),
            })
            .collect();
        assert_eq!(
            sources.iter().filter(|source| **source == EmissionsSource::Api).count(),
            3
        );
        assert_eq!(
            sources.iter().filter(|source| **source == EmissionsSource::Fallback).count(),
            2
        );
    }

    #[tokio::test]
    async fn api_failures_fall_back_without_aborting_the_comparison() {
        let estimator = Arc::new(StubEstimator::failing());
        let engine = engine_with(estimator.clone(), None);
        let request =
            ShipmentRequest::new(1000.0, methods(&["truck", "train"])).with_distance(1000.0);

        let result = engine.compare(&request).await.expect("comparison");

        for entry in &result.entries {
            let MethodOutcome::Estimated(estimate) = &entry.outcome else {
                panic!("fallback should cover supported methods");
            };
            assert_eq!(estimate.source, EmissionsSource::Fallback);
        }
        let truck = match result.outcome("truck").expect("truck entry") {
            MethodOutcome::Estimated(estimate) => estimate.emissions_kg,
            MethodOutcome::Unsupported { .. } => panic!("truck is supported"),
        };
        assert_eq!(truck, 62.0);
    }

    #[tokio::test]
    async fn failed_api_attempts_still_consume_budget() {
        let estimator = Arc::new(StubEstimator::failing());
        let engine = engine_with(estimator.clone(), None);
        let request = ShipmentRequest::new(1000.0, methods(&["air", "truck", "train", "ship", "plane"]))
            .with_distance(1000.0);

        engine.compare(&request).await.expect("comparison");

        assert_eq!(estimator.call_count(), 3, "a flapping endpoint must not be retried past the budget");
    }

    #[tokio::test]
    async fn unsupported_method_is_an_inline_entry_not_an_abort() {
        let estimator = Arc::new(StubEstimator::failing());
        let engine = engine_with(estimator.clone(), None).with_api_call_budget(0);
        let request =
            ShipmentRequest::new(100.0, methods(&["rocket", "truck"])).with_distance(100.0);

        let result = engine.compare(&request).await.expect("comparison");

        assert!(matches!(
            result.outcome("rocket"),
            Some(MethodOutcome::Unsupported { detail }) if detail.contains("rocket")
        ));
        assert!(matches!(result.outcome("truck"), Some(MethodOutcome::Estimated(_))));
        assert_eq!(estimator.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_distance_and_route_is_a_resolution_error() {
        let engine = engine_with(Arc::new(StubEstimator::new()), None);
        let request = ShipmentRequest::new(10.0, methods(&["air"]));

        let error = engine.compare(&request).await.expect_err("no distance source");
        assert_eq!(error, CompareError::Resolution(ResolutionError::MissingDistance));
    }

    #[tokio::test]
    async fn route_resolution_failure_propagates() {
        let engine = engine_with(Arc::new(StubEstimator::new()), None);
        let request =
            ShipmentRequest::new(10.0, methods(&["air"])).with_route("Nowhere", "Elsewhere");

        let error = engine.compare(&request).await.expect_err("geocode failure");
        assert!(matches!(
            error,
            CompareError::Resolution(ResolutionError::Geocode { place }) if place == "Nowhere"
        ));
    }

    #[tokio::test]
    async fn resolved_route_distance_feeds_the_comparison() {
        let estimator = Arc::new(StubEstimator::new());
        let engine = engine_with(estimator.clone(), Some(878.4));
        let request =
            ShipmentRequest::new(100.0, methods(&["train"])).with_route("Paris", "Berlin");

        let result = engine.compare(&request).await.expect("comparison");

        let train = match result.outcome("train").expect("train entry") {
            MethodOutcome::Estimated(estimate) => estimate.emissions_kg,
            MethodOutcome::Unsupported { .. } => panic!("train is supported"),
        };
        // 0.1 tonnes * 878.4 km * stub multiplier 2.0
        assert!((train - 175.68).abs() < 1e-9);
        assert!(result.summary.contains("from Paris to Berlin"));
    }

    #[tokio::test]
    async fn empty_method_list_is_rejected() {
        let engine = engine_with(Arc::new(StubEstimator::new()), None);
        let request = ShipmentRequest::new(10.0, Vec::new()).with_distance(100.0);

        let error = engine.compare(&request).await.expect_err("no methods");
        assert_eq!(error, CompareError::EmptyMethods);
    }

    #[tokio::test]
    async fn summary_names_the_lowest_footprint_method() {
        let estimator = Arc::new(StubEstimator::new());
        let engine = engine_with(estimator, None);
        let request = ShipmentRequest::new(1000.0, methods(&["air", "train", "ship"]))
            .with_distance(500.0);

        let result = engine.compare(&request).await.expect("comparison");

        // Stub multipliers: air 10.0, train 2.0, ship 1.0.
        assert!(result.summary.contains("Ship has the lowest footprint."));
        assert_eq!(result.lowest().expect("lowest").method, "ship");
    }

    #[tokio::test]
    async fn ties_resolve_to_first_occurrence_in_input_order() {
        let estimator = Arc::new(StubEstimator::new());
        let engine = engine_with(estimator, None);
        // Stub gives rail and train the same multiplier, so both tie.
        let request =
            ShipmentRequest::new(1000.0, methods(&["rail", "train"])).with_distance(100.0);

        let result = engine.compare(&request).await.expect("comparison");

        assert!(result.summary.contains("Rail has the lowest footprint."));
        assert_eq!(result.lowest().expect("lowest").method, "rail");
    }

    #[tokio::test]
    async fn single_estimate_surfaces_api_errors_directly() {
        let engine = engine_with(Arc::new(StubEstimator::failing()), None);

        let error = engine
            .estimate_single(100.0, 500.0, "air", "kg", "km")
            .await
            .expect_err("api failure should surface");
        assert!(matches!(error, ApiError::Status { status: 500, .. }));
    }

    #[tokio::test]
    async fn single_estimate_reuses_the_shared_cache() {
        let estimator = Arc::new(StubEstimator::new());
        let engine = engine_with(estimator.clone(), None);

        let first = engine
            .estimate_single(100.0, 500.0, "air", "kg", "km")
            .await
            .expect("first estimate");
        let second = engine
            .estimate_single(100.04, 500.02, "Air", "kg", "km")
            .await
            .expect("second estimate");

        assert_eq!(estimator.call_count(), 1);
        assert_eq!(first.emissions_kg, second.emissions_kg);
        assert!(second.note.expect("cached note").starts_with("As mentioned earlier:"));
    }
}
