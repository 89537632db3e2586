//! # WorldTides Client
//!
//! Global tide-extremes source (API v3) and primary fallback for tides.
//! Requires a key. Errors arrive as a body-level `error` string, often with a
//! 400 status, so the body is inspected before the status is classified.

use crate::http::{classify_status, decode, HttpTransport};
use crate::normalize::RawTides;
use crate::provider::{FetchRequest, ProviderId, Source, Tides};
use crate::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// `extremes` is a bare flag, so it lives in the URL itself.
pub const EXTREMES_URL: &str = "https://www.worldtides.info/api/v3?extremes";

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct WorldTidesExtremes {
    #[serde(default)]
    pub status: Option<u16>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub extremes: Vec<WorldTidesExtreme>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct WorldTidesExtreme {
    /// Unix seconds, UTC.
    pub dt: i64,
    pub height: f64,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone)]
pub struct WorldTidesClient {
    http: HttpTransport,
    url: String,
    api_key: Option<String>,
}

impl WorldTidesClient {
    pub fn new(http: HttpTransport, api_key: Option<String>) -> Self {
        Self {
            http,
            url: EXTREMES_URL.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }
}

/// Turn a decoded envelope plus status into the raw payload or a failure.
fn interpret(
    status: reqwest::StatusCode,
    body: &str,
) -> Result<WorldTidesExtremes, ProviderError> {
    let provider = ProviderId::WorldTides;
    if let Ok(envelope) = decode::<WorldTidesExtremes>(provider, body) {
        if let Some(message) = envelope.error.as_deref() {
            let lower = message.to_ascii_lowercase();
            return Err(if lower.contains("key") || lower.contains("credit") {
                ProviderError::auth(provider, message)
            } else {
                ProviderError::malformed(provider, message)
            });
        }
        if classify_status(provider, status).is_none() {
            return Ok(envelope);
        }
    }
    if let Some(err) = classify_status(provider, status) {
        return Err(err);
    }
    decode(provider, body)
}

#[async_trait]
impl Source<Tides> for WorldTidesClient {
    fn id(&self) -> ProviderId {
        ProviderId::WorldTides
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<RawTides, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::auth(ProviderId::WorldTides, "API key not configured"))?;
        let query = vec![
            ("lat", request.point.latitude().to_string()),
            ("lon", request.point.longitude().to_string()),
            ("date", request.range.start().format("%Y-%m-%d").to_string()),
            ("days", request.range.days().to_string()),
            ("key", key.to_string()),
        ];
        let reply = self
            .http
            .get(ProviderId::WorldTides, &self.url, &query)
            .await?;
        interpret(reply.status, &reply.body).map(RawTides::WorldTides)
    }
}
