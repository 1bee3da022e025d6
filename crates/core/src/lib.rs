pub mod cache;
pub mod compare;
pub mod config;
pub mod domain;
pub mod errors;
pub mod estimate;
pub mod fallback;
pub mod fingerprint;
pub mod resolve;
pub mod units;

pub use cache::{EmissionsCache, ProvenanceRecord, DEFAULT_CACHE_CAPACITY};
pub use compare::{
    ComparisonEngine, ComparisonResult, MethodEntry, MethodOutcome, DEFAULT_API_CALL_BUDGET,
};
pub use domain::emissions::{EmissionsResult, EmissionsSource};
pub use domain::shipment::ShipmentRequest;
pub use errors::{ApiError, CompareError, FallbackError, ResolutionError};
pub use estimate::{CarbonEstimateApi, EstimationClient};
pub use fallback::{emission_factor, estimate_fallback, FALLBACK_EMISSION_FACTORS};
pub use fingerprint::{fingerprint, CacheFingerprint};
pub use resolve::{DistanceResolver, GeocodeDistanceResolver, ResolvedDistance};
pub use units::{normalize_distance, normalize_weight};
