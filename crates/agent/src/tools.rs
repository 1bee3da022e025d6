//! Typed tools exposed to the conversational layer.
//!
//! Every tool accepts already-structured JSON arguments and returns a
//! structured JSON value. Collaborator failures come back as
//! `{"error": …}` payloads the agent can relay, never as panics; `Err`
//! from `execute` is reserved for malformed arguments.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::info;

use freightprint_core::resolve::DistanceResolver;
use freightprint_core::{ComparisonEngine, ShipmentRequest};

use crate::suppliers::{lowest_emission, SupplierIndex};

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    async fn execute(&self, input: Value) -> Result<Value>;
}

#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
}

impl ToolRegistry {
    pub fn register<T>(&mut self, tool: T)
    where
        T: Tool + 'static,
    {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Name/description pairs in stable order, for prompt assembly.
    pub fn descriptors(&self) -> Vec<(&'static str, &'static str)> {
        let mut descriptors: Vec<_> =
            self.tools.values().map(|tool| (tool.name(), tool.description())).collect();
        descriptors.sort_by_key(|(name, _)| *name);
        descriptors
    }

    pub async fn dispatch(&self, name: &str, input: Value) -> Result<Value> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| anyhow!("unknown tool `{name}`"))?;
        info!(event_name = "agent.tool_dispatch", tool = name, "dispatching tool call");
        tool.execute(input).await
    }
}

fn default_weight_unit() -> String {
    "kg".to_string()
}

fn default_distance_unit() -> String {
    "km".to_string()
}

#[derive(Debug, Deserialize)]
struct EstimateInput {
    weight_value: f64,
    #[serde(default = "default_weight_unit")]
    weight_unit: String,
    distance_value: f64,
    #[serde(default = "default_distance_unit")]
    distance_unit: String,
    transport_method: String,
}

/// Single-method emissions estimate through the core engine.
pub struct EmissionsCalculatorTool {
    engine: Arc<ComparisonEngine>,
}

impl EmissionsCalculatorTool {
    pub fn new(engine: Arc<ComparisonEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for EmissionsCalculatorTool {
    fn name(&self) -> &'static str {
        "emissions_calculator"
    }

    fn description(&self) -> &'static str {
        "Calculate CO2e for one shipment leg. Arguments: weight_value, weight_unit (g|kg|lb|mt), \
         distance_value, distance_unit (km|mi|m), transport_method (ship|train|truck|plane)."
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: EstimateInput =
            serde_json::from_value(input).context("invalid emissions_calculator arguments")?;

        let estimate = self
            .engine
            .estimate_single(
                args.weight_value,
                args.distance_value,
                &args.transport_method,
                &args.weight_unit,
                &args.distance_unit,
            )
            .await;

        match estimate {
            Ok(result) => Ok(serde_json::to_value(result)?),
            Err(error) => Ok(json!({
                "error": error.to_string(),
                "message": "Failed to calculate emissions. Please check the shipment data.",
            })),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CompareInput {
    weight_value: f64,
    #[serde(default = "default_weight_unit")]
    weight_unit: String,
    #[serde(default = "default_distance_unit")]
    distance_unit: String,
    transport_methods: Vec<String>,
    #[serde(default)]
    distance_value: Option<f64>,
    #[serde(default)]
    origin: Option<String>,
    #[serde(default)]
    destination: Option<String>,
}

/// Multi-method comparison through the core engine.
pub struct OptionComparerTool {
    engine: Arc<ComparisonEngine>,
}

impl OptionComparerTool {
    pub fn new(engine: Arc<ComparisonEngine>) -> Self {
        Self { engine }
    }
}

#[async_trait]
impl Tool for OptionComparerTool {
    fn name(&self) -> &'static str {
        "option_comparer"
    }

    fn description(&self) -> &'static str {
        "Compare transport options by CO2e. Arguments: weight_value, weight_unit, \
         transport_methods (list), and either distance_value/distance_unit or \
         origin and destination place names."
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: CompareInput =
            serde_json::from_value(input).context("invalid option_comparer arguments")?;

        let mut request = ShipmentRequest::new(args.weight_value, args.transport_methods)
            .with_units(&args.weight_unit, &args.distance_unit);
        request.distance_value = args.distance_value;
        request.origin = args.origin;
        request.destination = args.destination;

        match self.engine.compare(&request).await {
            Ok(result) => Ok(json!({
                "summary": result.summary,
                "details": result.entries,
            })),
            Err(error) => Ok(json!({
                "error": error.to_string(),
                "message": error.user_message(),
            })),
        }
    }
}

#[derive(Debug, Deserialize)]
struct DistanceInput {
    origin: String,
    destination: String,
}

/// Geographic distance between two place names.
pub struct DistanceResolverTool {
    resolver: Arc<dyn DistanceResolver>,
}

impl DistanceResolverTool {
    pub fn new(resolver: Arc<dyn DistanceResolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl Tool for DistanceResolverTool {
    fn name(&self) -> &'static str {
        "distance_resolver"
    }

    fn description(&self) -> &'static str {
        "Resolve the great-circle distance in km between two cities. \
         Arguments: origin, destination."
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: DistanceInput =
            serde_json::from_value(input).context("invalid distance_resolver arguments")?;

        match self.resolver.resolve(&args.origin, &args.destination).await {
            Ok(resolved) => Ok(serde_json::to_value(resolved)?),
            Err(error) => Ok(json!({
                "error": error.to_string(),
                "message": error.user_message(),
            })),
        }
    }
}

fn default_top_k() -> usize {
    3
}

#[derive(Debug, Deserialize)]
struct SupplierSearchInput {
    query: String,
    #[serde(default)]
    region: Option<String>,
    #[serde(default = "default_top_k")]
    top_k: usize,
}

/// Ranked supplier search; the summary highlights the lowest-emission
/// match among the results.
pub struct SupplierSearchTool {
    index: Arc<dyn SupplierIndex>,
}

impl SupplierSearchTool {
    pub fn new(index: Arc<dyn SupplierIndex>) -> Self {
        Self { index }
    }
}

#[async_trait]
impl Tool for SupplierSearchTool {
    fn name(&self) -> &'static str {
        "supplier_search"
    }

    fn description(&self) -> &'static str {
        "Find suppliers by region, transport mode, certifications, or carbon profile. \
         Arguments: query (natural language), optional region, optional top_k."
    }

    async fn execute(&self, input: Value) -> Result<Value> {
        let args: SupplierSearchInput =
            serde_json::from_value(input).context("invalid supplier_search arguments")?;

        let matches = self.index.query(&args.query, args.region.as_deref(), args.top_k);
        if matches.is_empty() {
            return Ok(json!({ "summary": "No suppliers found matching your query." }));
        }

        let best = lowest_emission(&matches).map(|record| {
            format!(
                "{} emits only {} kg CO₂e per shipment — the lowest among the results.",
                record.name, record.carbon_emissions_per_shipment_kg
            )
        });

        Ok(json!({
            "summary": best,
            "matches": matches,
        }))
    }
}
