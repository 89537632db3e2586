//! # HTTP Transport
//!
//! Thin wrapper over a shared `reqwest::Client` used by every provider client.
//!
//! ## Failure Classification
//! Transport outcomes are mapped onto the provider failure taxonomy:
//! - **Timeout / connect / body read**: `Network`
//! - **401, 403**: `Auth`
//! - **216**: `Coverage` (MeteoSIX answers out-of-area points with this status)
//! - **Other 4xx**: `MalformedResponse` (the provider rejected our request shape)
//! - **5xx and anything else unsuccessful**: `Network`
//! - **Undecodable JSON**: `MalformedResponse`

use crate::provider::ProviderId;
use crate::ProviderError;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

/// Per-request timeout when the configuration does not override it.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const USER_AGENT: &str = "Xirin-Marine/1.0";

/// Raw status and body of one completed request.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: String,
}

impl HttpReply {
    /// Classify the status, then decode the body as `T`.
    pub fn json<T: DeserializeOwned>(&self, provider: ProviderId) -> Result<T, ProviderError> {
        if let Some(err) = classify_status(provider, self.status) {
            return Err(err);
        }
        decode(provider, &self.body)
    }
}

/// Decode a JSON body, mapping any failure to `MalformedResponse`.
pub fn decode<T: DeserializeOwned>(provider: ProviderId, body: &str) -> Result<T, ProviderError> {
    serde_json::from_str(body).map_err(|e| ProviderError::malformed(provider, e.to_string()))
}

/// Map an HTTP status onto the failure taxonomy; `None` for success.
pub fn classify_status(provider: ProviderId, status: StatusCode) -> Option<ProviderError> {
    if status.is_success() && status.as_u16() != 216 {
        return None;
    }
    let detail = format!("HTTP {status}");
    let err = match status.as_u16() {
        401 | 403 => ProviderError::auth(provider, detail),
        216 => ProviderError::coverage(provider, detail),
        400..=499 => ProviderError::malformed(provider, format!("request rejected ({detail})")),
        _ => ProviderError::network(provider, detail),
    };
    Some(err)
}

/// Shared HTTP client with a bounded per-request timeout.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> reqwest::Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(USER_AGENT)
            .build()?;
        Ok(Self { client })
    }

    /// Issue one GET and read the whole body. Only transport failures are errors here.
    pub async fn get(
        &self,
        provider: ProviderId,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<HttpReply, ProviderError> {
        debug!("{provider}: GET {url}");
        let response = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(|e| transport_error(provider, e))?;
        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| transport_error(provider, e))?;
        debug!("{provider}: {status} ({} bytes)", body.len());
        Ok(HttpReply { status, body })
    }

    /// GET and decode in one step for providers without body-level error envelopes.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        provider: ProviderId,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<T, ProviderError> {
        self.get(provider, url, query).await?.json(provider)
    }
}

fn transport_error(provider: ProviderId, err: reqwest::Error) -> ProviderError {
    let detail = if err.is_timeout() {
        format!("timed out: {err}")
    } else if err.is_connect() {
        format!("connection failed: {err}")
    } else {
        err.to_string()
    };
    ProviderError::network(provider, detail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    struct Envelope {
        value: f64,
    }

    #[test]
    fn success_statuses_are_not_failures() {
        assert!(classify_status(ProviderId::OpenMeteo, StatusCode::OK).is_none());
    }

    #[test]
    fn auth_statuses_map_to_auth_failure() {
        for code in [401, 403] {
            let status = StatusCode::from_u16(code).unwrap();
            assert!(matches!(
                classify_status(ProviderId::MeteoSix, status),
                Some(ProviderError::Auth { .. })
            ));
        }
    }

    #[test]
    fn meteosix_out_of_area_status_maps_to_coverage() {
        let status = StatusCode::from_u16(216).unwrap();
        assert!(matches!(
            classify_status(ProviderId::MeteoSix, status),
            Some(ProviderError::Coverage { .. })
        ));
    }

    #[test]
    fn server_errors_map_to_network_failure() {
        assert!(matches!(
            classify_status(ProviderId::OpenMeteo, StatusCode::BAD_GATEWAY),
            Some(ProviderError::Network { .. })
        ));
    }

    #[test]
    fn rejected_requests_map_to_malformed() {
        assert!(matches!(
            classify_status(ProviderId::OpenMeteo, StatusCode::BAD_REQUEST),
            Some(ProviderError::MalformedResponse { .. })
        ));
    }

    #[test]
    fn reply_decodes_json_body() {
        let reply = HttpReply {
            status: StatusCode::OK,
            body: r#"{"value": 0.0}"#.to_string(),
        };
        let envelope: Envelope = reply.json(ProviderId::OpenMeteo).unwrap();
        assert_eq!(envelope.value, 0.0);
    }

    #[test]
    fn reply_with_missing_field_is_malformed() {
        let reply = HttpReply {
            status: StatusCode::OK,
            body: "{}".to_string(),
        };
        let err = reply.json::<Envelope>(ProviderId::OpenMeteo).unwrap_err();
        assert!(matches!(err, ProviderError::MalformedResponse { .. }));
    }
}
