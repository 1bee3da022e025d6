use serde::{Deserialize, Serialize};

/// A structured shipment description as handed over by the conversational
/// layer. Distance may be given directly or left to be resolved from an
/// origin/destination pair; the comparison engine rejects requests where
/// neither is available.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ShipmentRequest {
    pub weight_value: f64,
    #[serde(default = "default_weight_unit")]
    pub weight_unit: String,
    #[serde(default)]
    pub distance_value: Option<f64>,
    #[serde(default = "default_distance_unit")]
    pub distance_unit: String,
    #[serde(default)]
    pub origin: Option<String>,
    #[serde(default)]
    pub destination: Option<String>,
    pub transport_methods: Vec<String>,
}

fn default_weight_unit() -> String {
    "kg".to_string()
}

fn default_distance_unit() -> String {
    "km".to_string()
}

impl ShipmentRequest {
    pub fn new(weight_value: f64, transport_methods: Vec<String>) -> Self {
        Self {
            weight_value,
            weight_unit: default_weight_unit(),
            distance_value: None,
            distance_unit: default_distance_unit(),
            origin: None,
            destination: None,
            transport_methods,
        }
    }

    pub fn with_distance(mut self, distance_value: f64) -> Self {
        self.distance_value = Some(distance_value);
        self
    }

    pub fn with_units(mut self, weight_unit: &str, distance_unit: &str) -> Self {
        self.weight_unit = weight_unit.to_string();
        self.distance_unit = distance_unit.to_string();
        self
    }

    pub fn with_route(mut self, origin: &str, destination: &str) -> Self {
        self.origin = Some(origin.to_string());
        self.destination = Some(destination.to_string());
        self
    }

    pub fn has_route(&self) -> bool {
        self.origin.is_some() && self.destination.is_some()
    }
}
