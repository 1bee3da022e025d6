use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use serde::Serialize;

use freightprint_core::cache::EmissionsCache;
use freightprint_core::config::{AppConfig, LoadOptions};
use freightprint_core::errors::{ApiError, ResolutionError};
use freightprint_core::estimate::EstimationClient;
use freightprint_core::fallback::estimate_fallback;
use freightprint_core::resolve::{DistanceResolver, ResolvedDistance};
use freightprint_core::{
    ComparisonEngine, EmissionsResult, EmissionsSource, MethodOutcome, ShipmentRequest,
};

use crate::commands::CommandResult;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum SmokeStatus {
    Pass,
    Fail,
}

#[derive(Debug, Serialize)]
struct SmokeCheck {
    name: &'static str,
    status: SmokeStatus,
    elapsed_ms: u64,
    message: String,
}

#[derive(Debug, Serialize)]
struct SmokeReport {
    command: &'static str,
    status: SmokeStatus,
    summary: String,
    total_elapsed_ms: u64,
    checks: Vec<SmokeCheck>,
}

/// Deterministic estimator so smoke runs fully offline: emissions scale
/// with tonnage, distance, and a per-method multiplier.
struct SmokeEstimator;

#[async_trait]
impl EstimationClient for SmokeEstimator {
    async fn estimate(
        &self,
        weight_kg: f64,
        distance_km: f64,
        method: &str,
    ) -> Result<EmissionsResult, ApiError> {
        let multiplier = match method.to_lowercase().as_str() {
            "air" | "plane" => 10.0,
            "truck" => 3.0,
            "train" => 2.0,
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

struct SmokeResolver;

#[async_trait]
impl DistanceResolver for SmokeResolver {
    async fn resolve(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<ResolvedDistance, ResolutionError> {
        Ok(ResolvedDistance {
            origin: origin.to_string(),
            destination: destination.to_string(),
            distance_km: 878.4,
        })
    }
}

pub fn run() -> CommandResult {
    let started = Instant::now();
    let mut checks = Vec::new();

    let config_started = Instant::now();
    match AppConfig::load(LoadOptions::default()) {
        Ok(_) => checks.push(SmokeCheck {
            name: "config_validation",
            status: SmokeStatus::Pass,
            elapsed_ms: config_started.elapsed().as_millis() as u64,
            message: "configuration loaded and validated".to_string(),
        }),
        Err(error) => checks.push(SmokeCheck {
            name: "config_validation",
            status: SmokeStatus::Fail,
            elapsed_ms: config_started.elapsed().as_millis() as u64,
            message: error.to_string(),
        }),
    }

    checks.push(fallback_arithmetic_check());

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            checks.push(SmokeCheck {
                name: "engine_comparison",
                status: SmokeStatus::Fail,
                elapsed_ms: 0,
                message: format!("failed to initialize async runtime: {error}"),
            });
            return finalize_report(checks, started.elapsed().as_millis() as u64);
        }
    };

    checks.push(runtime.block_on(engine_comparison_check()));

    finalize_report(checks, started.elapsed().as_millis() as u64)
}

fn fallback_arithmetic_check() -> SmokeCheck {
    let check_started = Instant::now();
    let result = estimate_fallback(1000.0, 1000.0, "truck", "kg", "km");
    let elapsed_ms = check_started.elapsed().as_millis() as u64;

    match result {
        Ok(estimate) if estimate.emissions_kg == 62.0 => SmokeCheck {
            name: "fallback_arithmetic",
            status: SmokeStatus::Pass,
            elapsed_ms,
            message: "static-factor estimate matches reference arithmetic".to_string(),
        },
        Ok(estimate) => SmokeCheck {
            name: "fallback_arithmetic",
            status: SmokeStatus::Fail,
            elapsed_ms,
            message: format!("expected 62.0 kg, got {}", estimate.emissions_kg),
        },
        Err(error) => SmokeCheck {
            name: "fallback_arithmetic",
            status: SmokeStatus::Fail,
            elapsed_ms,
            message: error.to_string(),
        },
    }
}

/// Runs an offline comparison and verifies budget accounting, cache
/// reuse, and ranking in one pass.
async fn engine_comparison_check() -> SmokeCheck {
    let check_started = Instant::now();
    let engine = ComparisonEngine::new(
        Arc::new(EmissionsCache::new()),
        Arc::new(SmokeEstimator),
        Arc::new(SmokeResolver),
    );

    let request = ShipmentRequest::new(
        1000.0,
        vec![
            "air".to_string(),
            "truck".to_string(),
            "train".to_string(),
            "ship".to_string(),
            "plane".to_string(),
        ],
    )
    .with_distance(500.0);

    let outcome = async {
        let first = engine.compare(&request).await.map_err(|error| error.to_string())?;

        let api_estimates = first
            .entries
            .iter()
            .filter(|entry| {
                matches!(&entry.outcome, MethodOutcome::Estimated(result)
                    if result.source == EmissionsSource::Api)
            })
            .count();
        if api_estimates != 3 {
            return Err(format!("expected 3 api-sourced estimates, found {api_estimates}"));
        }

        if !first.summary.contains("lowest footprint") {
            return Err("summary should rank the lowest-footprint method".to_string());
        }

        let cache_entries = engine.cache().len();
        let second = engine.compare(&request).await.map_err(|error| error.to_string())?;
        if engine.cache().len() != cache_entries {
            return Err("second run should be served from cache".to_string());
        }
        if second.entries.len() != first.entries.len() {
            return Err("second run should cover the same methods".to_string());
        }

        Ok(())
    }
    .await;

    let elapsed_ms = check_started.elapsed().as_millis() as u64;
    match outcome {
        Ok(()) => SmokeCheck {
            name: "engine_comparison",
            status: SmokeStatus::Pass,
            elapsed_ms,
            message: "comparison, budget, cache reuse, and ranking verified offline".to_string(),
        },
        Err(message) => SmokeCheck {
            name: "engine_comparison",
            status: SmokeStatus::Fail,
            elapsed_ms,
            message,
        },
    }
}

fn finalize_report(checks: Vec<SmokeCheck>, total_elapsed_ms: u64) -> CommandResult {
    let all_pass = checks.iter().all(|check| check.status == SmokeStatus::Pass);
    let status = if all_pass { SmokeStatus::Pass } else { SmokeStatus::Fail };
    let summary = if all_pass {
        "smoke: all checks passed".to_string()
    } else {
        "smoke: one or more checks failed".to_string()
    };

    let report = SmokeReport { command: "smoke", status, summary, total_elapsed_ms, checks };
    let output = serde_json::to_string_pretty(&report)
        .unwrap_or_else(|error| format!("smoke serialization failed: {error}"));

    CommandResult { exit_code: if all_pass { 0 } else { 1 }, output }
}
