use thiserror::Error;

/// Failure of the external estimation API. Never fatal inside a
/// comparison: the engine converts every variant into a fallback
/// invocation. A single-estimate call surfaces it to the caller as-is.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ApiError {
    #[error("estimation api returned unexpected status {status}")]
    Status { status: u16, body: String },
    #[error("estimation api transport failure: {0}")]
    Transport(String),
    #[error("estimation api response was unusable: {0}")]
    MalformedResponse(String),
}

/// The shipping distance could not be determined. Surfaced structurally
/// with no retry.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum ResolutionError {
    #[error("missing distance or locations to resolve distance")]
    MissingDistance,
    #[error("could not geocode `{place}`")]
    Geocode { place: String },
    #[error("distance resolver transport failure: {0}")]
    Transport(String),
}

/// Failure of the static-factor estimator: the transport method has no
/// entry in the factor table. Never a silent zero.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum FallbackError {
    #[error("unsupported transport method: {method}")]
    UnsupportedMethod { method: String },
}

/// Request-level failure of a comparison. Per-method failures do not show
/// up here; they become inline error entries in the result.
#[derive(Clone, Debug, Error, PartialEq)]
pub enum CompareError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),
    #[error("no transport methods to compare")]
    EmptyMethods,
}

impl ResolutionError {
    pub fn user_message(&self) -> String {
        match self {
            Self::MissingDistance => {
                "I need either a distance or an origin and destination to work with.".to_string()
            }
            Self::Geocode { place } => {
                format!("I couldn't locate `{place}` to measure the route.")
            }
            Self::Transport(_) => {
                "The distance lookup service is unreachable right now. Please retry shortly."
                    .to_string()
            }
        }
    }
}

impl CompareError {
    pub fn user_message(&self) -> String {
        match self {
            Self::Resolution(resolution) => resolution.user_message(),
            Self::EmptyMethods => {
                "I need at least one transport method to compare.".to_string()
            }
        }
    }
}
