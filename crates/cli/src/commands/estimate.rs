use std::sync::Arc;

use freightprint_core::config::{AppConfig, LoadOptions};
use freightprint_core::{
    CarbonEstimateApi, ComparisonEngine, EmissionsCache, GeocodeDistanceResolver,
};
use serde_json::json;

use crate::commands::CommandResult;

pub struct EstimateArgs {
    pub weight_value: f64,
    pub weight_unit: String,
    pub distance_value: f64,
    pub distance_unit: String,
    pub transport_method: String,
}

/// Runs a single live estimate against the configured estimation API.
pub fn run(args: EstimateArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("estimate", "config", error.to_string(), 2),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "estimate",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };

    let engine = build_engine(&config);
    let result = runtime.block_on(engine.estimate_single(
        args.weight_value,
        args.distance_value,
        &args.transport_method,
        &args.weight_unit,
        &args.distance_unit,
    ));

    match result {
        Ok(estimate) => {
            let payload = json!({
                "command": "estimate",
                "status": "ok",
                "result": estimate,
            });
            CommandResult {
                exit_code: 0,
                output: serde_json::to_string_pretty(&payload)
                    .unwrap_or_else(|error| error.to_string()),
            }
        }
        Err(error) => CommandResult::failure("estimate", "api", error.to_string(), 1),
    }
}

pub(crate) fn build_engine(config: &AppConfig) -> ComparisonEngine {
    ComparisonEngine::new(
        Arc::new(EmissionsCache::with_capacity(config.estimator.cache_capacity)),
        Arc::new(CarbonEstimateApi::new(&config.estimator)),
        Arc::new(GeocodeDistanceResolver::new(&config.geocoder)),
    )
    .with_api_call_budget(config.estimator.api_call_budget)
}
