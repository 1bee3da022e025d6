//! Client for the external carbon-estimation API.
//!
//! The remote service signals success exclusively with `201 Created`.
//! Every other status, and every transport-level failure, becomes a
//! structured [`ApiError`] — the client never lets an exception-shaped
//! failure propagate to the caller.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EstimatorConfig;
use crate::domain::emissions::{EmissionsResult, EmissionsSource};
use crate::errors::ApiError;
use crate::units::round_to;

/// Single-leg emissions estimation for one transport method. Weight and
/// distance are already canonical (kilograms / kilometers).
#[async_trait]
pub trait EstimationClient: Send + Sync {
    async fn estimate(
        &self,
        weight_kg: f64,
        distance_km: f64,
        method: &str,
    ) -> Result<EmissionsResult, ApiError>;
}

#[derive(Debug, Serialize)]
struct EstimatePayload<'a> {
    #[serde(rename = "type")]
    shipment_type: &'static str,
    weight_value: f64,
    weight_unit: &'static str,
    distance_value: f64,
    distance_unit: &'static str,
    transport_method: &'a str,
}

#[derive(Debug, Deserialize)]
struct EstimateEnvelope {
    #[serde(default)]
    data: EstimateData,
}

#[derive(Debug, Default, Deserialize)]
struct EstimateData {
    #[serde(default)]
    attributes: EstimateAttributes,
}

#[derive(Debug, Default, Deserialize)]
struct EstimateAttributes {
    transport_method: Option<String>,
    carbon_kg: Option<f64>,
    carbon_mt: Option<f64>,
}

/// Reqwest-backed client for a Carbon-Interface-style estimates endpoint.
pub struct CarbonEstimateApi {
    client: Client,
    base_url: String,
    api_key: SecretString,
    timeout: Duration,
}

impl CarbonEstimateApi {
    pub fn new(config: &EstimatorConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }
}

#[async_trait]
impl EstimationClient for CarbonEstimateApi {
    async fn estimate(
        &self,
        weight_kg: f64,
        distance_km: f64,
        method: &str,
    ) -> Result<EmissionsResult, ApiError> {
        let transport_method = method.trim().to_lowercase();
        let payload = EstimatePayload {
            shipment_type: "shipping",
            weight_value: weight_kg,
            weight_unit: "kg",
            distance_value: distance_km,
            distance_unit: "km",
            transport_method: &transport_method,
        };

        debug!(
            event_name = "estimator.request",
            transport_method = payload.transport_method,
            weight_kg,
            distance_km,
            "sending estimation request"
        );

        let response = self
            .client
            .post(&self.base_url)
            .bearer_auth(self.api_key.expose_secret())
            .timeout(self.timeout)
            .json(&payload)
            .send()
            .await
            .map_err(|error| ApiError::Transport(error.to_string()))?;

        let status = response.status();
        if status != StatusCode::CREATED {
            let body = response.text().await.unwrap_or_else(|_| String::new());
            debug!(
                event_name = "estimator.rejected",
                status = status.as_u16(),
                "estimation request rejected"
            );
            return Err(ApiError::Status { status: status.as_u16(), body });
        }

        let envelope: EstimateEnvelope = response
            .json()
            .await
            .map_err(|error| ApiError::MalformedResponse(error.to_string()))?;

        reshape(envelope.data.attributes, method)
    }
}

/// Reshapes the nested attributes payload into the canonical result. A
/// created response with no carbon-kg figure is unusable and reported as
/// malformed, so callers have a single error arm for "no usable figure".
fn reshape(attributes: EstimateAttributes, requested_method: &str) -> Result<EmissionsResult, ApiError> {
    let Some(carbon_kg) = attributes.carbon_kg else {
        return Err(ApiError::MalformedResponse("response carried no carbon_kg figure".to_string()));
    };

    let method = attributes.transport_method.unwrap_or_else(|| requested_method.to_lowercase());
    let emissions_tonnes =
        attributes.carbon_mt.unwrap_or_else(|| round_to(carbon_kg / 1000.0, 3));

    Ok(EmissionsResult {
        method,
        emissions_kg: carbon_kg,
        emissions_tonnes,
        source: EmissionsSource::Api,
        note: None,
    })
}

#[cfg(test)]
mod tests {
    use crate::domain::emissions::EmissionsSource;
    use crate::errors::ApiError;

    use super::{reshape, EstimateAttributes};

    #[test]
    fn created_payload_reshapes_into_canonical_result() {
        let attributes = EstimateAttributes {
            transport_method: Some("truck".to_string()),
            carbon_kg: Some(123.45),
            carbon_mt: Some(0.123),
        };

        let result = reshape(attributes, "Truck").expect("usable payload");
        assert_eq!(result.method, "truck");
        assert_eq!(result.emissions_kg, 123.45);
        assert_eq!(result.emissions_tonnes, 0.123);
        assert_eq!(result.source, EmissionsSource::Api);
    }

    #[test]
    fn missing_tonnes_figure_is_derived_from_kilograms() {
        let attributes = EstimateAttributes {
            transport_method: None,
            carbon_kg: Some(500.0),
            carbon_mt: None,
        };

        let result = reshape(attributes, "Air").expect("usable payload");
        assert_eq!(result.method, "air");
        assert_eq!(result.emissions_tonnes, 0.5);
    }

    #[test]
    fn missing_carbon_figure_is_malformed_not_zero() {
        let attributes = EstimateAttributes::default();
        let error = reshape(attributes, "train").expect_err("no carbon figure");
        assert!(matches!(error, ApiError::MalformedResponse(_)));
    }
}
