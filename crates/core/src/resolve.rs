//! Great-circle distance resolution between two free-text place names.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::GeocoderConfig;
use crate::errors::ResolutionError;
use crate::units::round_to;

const MEAN_EARTH_RADIUS_KM: f64 = 6371.0088;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ResolvedDistance {
    pub origin: String,
    pub destination: String,
    pub distance_km: f64,
}

#[async_trait]
pub trait DistanceResolver: Send + Sync {
    async fn resolve(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<ResolvedDistance, ResolutionError>;
}

#[derive(Debug, Deserialize)]
struct GeocodeHit {
    lat: String,
    lon: String,
}

/// Resolver backed by a Nominatim-style geocoding endpoint. The service
/// rejects anonymous clients, so every request carries the configured
/// user-agent.
pub struct GeocodeDistanceResolver {
    client: Client,
    base_url: String,
    user_agent: String,
    timeout: Duration,
}

impl GeocodeDistanceResolver {
    pub fn new(config: &GeocoderConfig) -> Self {
        Self {
            client: Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            user_agent: config.user_agent.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn geocode(&self, place: &str) -> Result<(f64, f64), ResolutionError> {
        let response = self
            .client
            .get(format!("{}/search", self.base_url))
            .query(&[("q", place), ("format", "json"), ("limit", "1")])
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .timeout(self.timeout)
            .send()
            .await
            .map_err(|error| ResolutionError::Transport(error.to_string()))?;

        if !response.status().is_success() {
            return Err(ResolutionError::Transport(format!(
                "geocoder returned status {}",
                response.status().as_u16()
            )));
        }

        let hits: Vec<GeocodeHit> = response
            .json()
            .await
            .map_err(|error| ResolutionError::Transport(error.to_string()))?;

        let Some(hit) = hits.into_iter().next() else {
            return Err(ResolutionError::Geocode { place: place.to_string() });
        };

        match (hit.lat.parse::<f64>(), hit.lon.parse::<f64>()) {
            (Ok(lat), Ok(lon)) => Ok((lat, lon)),
            _ => Err(ResolutionError::Geocode { place: place.to_string() }),
        }
    }
}

#[async_trait]
impl DistanceResolver for GeocodeDistanceResolver {
    async fn resolve(
        &self,
        origin: &str,
        destination: &str,
    ) -> Result<ResolvedDistance, ResolutionError> {
        let from = self.geocode(origin).await?;
        let to = self.geocode(destination).await?;
        let distance_km = round_to(haversine_km(from, to), 1);

        debug!(
            event_name = "resolver.distance_resolved",
            origin,
            destination,
            distance_km,
            "route distance resolved"
        );

        Ok(ResolvedDistance {
            origin: origin.to_string(),
            destination: destination.to_string(),
            distance_km,
        })
    }
}

/// Great-circle distance between two (latitude, longitude) pairs, in
/// kilometers.
pub fn haversine_km(from: (f64, f64), to: (f64, f64)) -> f64 {
    let (lat1, lon1) = (from.0.to_radians(), from.1.to_radians());
    let (lat2, lon2) = (to.0.to_radians(), to.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let a = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().asin();

    MEAN_EARTH_RADIUS_KM * c
}
