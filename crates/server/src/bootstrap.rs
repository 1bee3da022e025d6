use std::sync::Arc;

use freightprint_agent::llm::OpenRouterClient;
use freightprint_agent::runtime::AgentRuntime;
use freightprint_agent::suppliers::{JsonSupplierIndex, SupplierIndex, SupplierIndexError};
use freightprint_agent::tools::{
    DistanceResolverTool, EmissionsCalculatorTool, OptionComparerTool, SupplierSearchTool,
    ToolRegistry,
};
use freightprint_core::config::{AppConfig, ConfigError, LoadOptions};
use freightprint_core::resolve::DistanceResolver;
use freightprint_core::{CarbonEstimateApi, ComparisonEngine, EmissionsCache, GeocodeDistanceResolver};
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub engine: Arc<ComparisonEngine>,
    pub runtime: Arc<AgentRuntime>,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("supplier index failed to load: {0}")]
    SupplierIndex(#[from] SupplierIndexError),
}

pub fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );
    let config = AppConfig::load(options)?;
    bootstrap_with_config(config)
}

pub fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    let cache = Arc::new(EmissionsCache::with_capacity(config.estimator.cache_capacity));
    let estimator = Arc::new(CarbonEstimateApi::new(&config.estimator));
    let resolver: Arc<dyn DistanceResolver> =
        Arc::new(GeocodeDistanceResolver::new(&config.geocoder));

    let engine = Arc::new(
        ComparisonEngine::new(cache, estimator, resolver.clone())
            .with_api_call_budget(config.estimator.api_call_budget),
    );

    let supplier_index: Arc<dyn SupplierIndex> = match &config.suppliers.data_path {
        Some(path) => {
            let index = JsonSupplierIndex::from_path(path)?;
            info!(
                event_name = "system.bootstrap.suppliers_loaded",
                correlation_id = "bootstrap",
                count = index.len(),
                "supplier index loaded"
            );
            Arc::new(index)
        }
        None => Arc::new(JsonSupplierIndex::from_records(Vec::new())),
    };

    let mut registry = ToolRegistry::default();
    registry.register(EmissionsCalculatorTool::new(engine.clone()));
    registry.register(OptionComparerTool::new(engine.clone()));
    registry.register(DistanceResolverTool::new(resolver));
    registry.register(SupplierSearchTool::new(supplier_index));

    let llm = Arc::new(OpenRouterClient::new(&config.llm));
    let runtime = Arc::new(AgentRuntime::new(registry).with_llm(llm));

    info!(
        event_name = "system.bootstrap.ready",
        correlation_id = "bootstrap",
        tool_count = runtime.registry().len(),
        "application bootstrap complete"
    );

    Ok(Application { config, engine, runtime })
}

#[cfg(test)]
mod tests {
    use freightprint_core::config::{ConfigOverrides, LoadOptions};

    use crate::bootstrap::bootstrap;

    fn valid_overrides() -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                estimator_api_key: Some("ci-test-key".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[test]
    fn bootstrap_fails_fast_without_estimator_credentials() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                estimator_api_key: Some("   ".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        });

        let message = match result {
            Ok(_) => panic!("bootstrap should reject a blank estimator key"),
            Err(error) => error.to_string(),
        };
        assert!(message.contains("estimator.api_key"));
    }

    #[test]
    fn bootstrap_registers_the_full_tool_surface() {
        let app = bootstrap(valid_overrides()).expect("bootstrap should succeed");

        let names: Vec<_> =
            app.runtime.registry().descriptors().iter().map(|(name, _)| *name).collect();
        assert_eq!(
            names,
            vec![
                "distance_resolver",
                "emissions_calculator",
                "option_comparer",
                "supplier_search"
            ]
        );
        assert!(app.engine.cache().is_empty());
    }
}
