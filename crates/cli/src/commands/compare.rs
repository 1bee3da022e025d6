use freightprint_core::config::{AppConfig, LoadOptions};
use freightprint_core::ShipmentRequest;
use serde_json::json;

use crate::commands::{estimate::build_engine, CommandResult};

pub struct CompareArgs {
    pub weight_value: f64,
    pub weight_unit: String,
    pub distance_value: Option<f64>,
    pub distance_unit: String,
    pub transport_methods: Vec<String>,
    pub origin: Option<String>,
    pub destination: Option<String>,
}

/// Runs a live comparison across transport methods, resolving the route
/// distance if one was given instead of a distance.
pub fn run(args: CompareArgs) -> CommandResult {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => return CommandResult::failure("compare", "config", error.to_string(), 2),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                "compare",
                "runtime",
                format!("failed to initialize async runtime: {error}"),
                1,
            )
        }
    };

    let mut request = ShipmentRequest::new(args.weight_value, args.transport_methods)
        .with_units(&args.weight_unit, &args.distance_unit);
    request.distance_value = args.distance_value;
    request.origin = args.origin;
    request.destination = args.destination;

    let engine = build_engine(&config);
    match runtime.block_on(engine.compare(&request)) {
        Ok(result) => {
            let payload = json!({
                "command": "compare",
                "status": "ok",
                "summary": result.summary,
                "details": result.entries,
            });
            CommandResult {
                exit_code: 0,
                output: serde_json::to_string_pretty(&payload)
                    .unwrap_or_else(|error| error.to_string()),
            }
        }
        Err(error) => CommandResult::failure("compare", "resolution", error.user_message(), 1),
    }
}
