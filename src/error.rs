//! Error types shared by the provider clients and configuration loader.

use crate::provider::ProviderId;
use thiserror::Error;

/// Why a single provider call produced no data.
///
/// Failures from any non-terminal provider are absorbed by
/// [`crate::selection::FallbackChain`]; callers only ever see them in the
/// attempt log of a resolution.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Timeout, connection failure or server-side error
    #[error("{provider}: network failure: {detail}")]
    Network { provider: ProviderId, detail: String },

    /// Missing or rejected access credential
    #[error("{provider}: authentication failure: {detail}")]
    Auth { provider: ProviderId, detail: String },

    /// Point lies outside the provider's service area
    #[error("{provider}: outside coverage: {detail}")]
    Coverage { provider: ProviderId, detail: String },

    /// Response body missing expected fields or not decodable
    #[error("{provider}: malformed response: {detail}")]
    MalformedResponse { provider: ProviderId, detail: String },
}

impl ProviderError {
    pub fn provider(&self) -> ProviderId {
        match self {
            ProviderError::Network { provider, .. }
            | ProviderError::Auth { provider, .. }
            | ProviderError::Coverage { provider, .. }
            | ProviderError::MalformedResponse { provider, .. } => *provider,
        }
    }

    pub fn network(provider: ProviderId, detail: impl Into<String>) -> Self {
        ProviderError::Network {
            provider,
            detail: detail.into(),
        }
    }

    pub fn auth(provider: ProviderId, detail: impl Into<String>) -> Self {
        ProviderError::Auth {
            provider,
            detail: detail.into(),
        }
    }

    pub fn coverage(provider: ProviderId, detail: impl Into<String>) -> Self {
        ProviderError::Coverage {
            provider,
            detail: detail.into(),
        }
    }

    pub fn malformed(provider: ProviderId, detail: impl Into<String>) -> Self {
        ProviderError::MalformedResponse {
            provider,
            detail: detail.into(),
        }
    }
}

/// Invalid coordinates handed to [`crate::GeoPoint::new`].
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeoError {
    #[error("latitude {0} outside [-90, 90]")]
    Latitude(f64),

    #[error("longitude {0} outside [-180, 180]")]
    Longitude(f64),
}

/// Failures writing a configuration file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("config IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("config encode: {0}")]
    Encode(#[from] toml::ser::Error),
}
