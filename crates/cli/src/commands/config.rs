use freightprint_core::config::{AppConfig, LoadOptions};
use secrecy::ExposeSecret;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Serialize)]
struct ConfigReport {
    estimator: serde_json::Value,
    geocoder: serde_json::Value,
    llm: serde_json::Value,
    suppliers: serde_json::Value,
    server: serde_json::Value,
    logging: serde_json::Value,
}

/// Renders the effective configuration with secrets redacted.
pub fn run() -> String {
    let config = match AppConfig::load(LoadOptions::default()) {
        Ok(config) => config,
        Err(error) => {
            return serde_json::to_string_pretty(&json!({
                "status": "error",
                "message": error.to_string(),
            }))
            .unwrap_or_else(|_| error.to_string());
        }
    };

    let report = ConfigReport {
        estimator: json!({
            "api_key": redact(!config.estimator.api_key.expose_secret().is_empty()),
            "base_url": config.estimator.base_url,
            "timeout_secs": config.estimator.timeout_secs,
            "api_call_budget": config.estimator.api_call_budget,
            "cache_capacity": config.estimator.cache_capacity,
        }),
        geocoder: json!({
            "base_url": config.geocoder.base_url,
            "user_agent": config.geocoder.user_agent,
            "timeout_secs": config.geocoder.timeout_secs,
        }),
        llm: json!({
            "provider": config.llm.provider,
            "api_key": redact(config.llm.api_key.is_some()),
            "base_url": config.llm.base_url,
            "model": config.llm.model,
            "timeout_secs": config.llm.timeout_secs,
            "max_tokens": config.llm.max_tokens,
        }),
        suppliers: json!({
            "data_path": config.suppliers.data_path,
        }),
        server: json!({
            "bind_address": config.server.bind_address,
            "port": config.server.port,
            "graceful_shutdown_secs": config.server.graceful_shutdown_secs,
        }),
        logging: json!({
            "level": config.logging.level,
            "format": config.logging.format,
        }),
    };

    serde_json::to_string_pretty(&report)
        .unwrap_or_else(|error| format!("config serialization failed: {error}"))
}

fn redact(present: bool) -> &'static str {
    if present {
        "<redacted>"
    } else {
        "<unset>"
    }
}

#[cfg(test)]
mod tests {
    use super::redact;

    #[test]
    fn secrets_render_as_redacted_markers() {
        assert_eq!(redact(true), "<redacted>");
        assert_eq!(redact(false), "<unset>");
    }
}
