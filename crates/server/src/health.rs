use axum::{extract::State, http::StatusCode, routing::get, Json, Router};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::Serialize;

use freightprint_core::config::EstimatorConfig;

#[derive(Clone)]
pub struct HealthState {
    estimator_configured: bool,
    estimator_base_url: String,
}

impl HealthState {
    pub fn from_estimator(config: &EstimatorConfig) -> Self {
        Self {
            estimator_configured: !config.api_key.expose_secret().trim().is_empty(),
            estimator_base_url: config.base_url.clone(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthCheck {
    pub status: &'static str,
    pub detail: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub service: HealthCheck,
    pub estimator: HealthCheck,
    pub checked_at: String,
}

pub fn router(state: HealthState) -> Router {
    Router::new().route("/health", get(health)).with_state(state)
}

pub async fn health(State(state): State<HealthState>) -> (StatusCode, Json<HealthResponse>) {
    let estimator = estimator_check(&state);
    let ready = estimator.status == "ready";

    let payload = HealthResponse {
        status: if ready { "ready" } else { "degraded" },
        service: HealthCheck {
            status: "ready",
            detail: "freightprint-server runtime initialized".to_string(),
        },
        estimator,
        checked_at: Utc::now().to_rfc3339(),
    };

    let status_code = if ready { StatusCode::OK } else { StatusCode::SERVICE_UNAVAILABLE };
    (status_code, Json(payload))
}

fn estimator_check(state: &HealthState) -> HealthCheck {
    if state.estimator_configured {
        HealthCheck {
            status: "ready",
            detail: format!("estimation api configured at {}", state.estimator_base_url),
        }
    } else {
        HealthCheck {
            status: "degraded",
            detail: "estimation api key is missing; only fallback estimates are available"
                .to_string(),
        }
    }
}
