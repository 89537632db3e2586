//! # NOAA CO-OPS Client
//!
//! Regional tide source for United States waters using the Tides and Currents
//! data API (`product=predictions`, `interval=hilo`). Predictions are tied to
//! a station, so the station id comes from configuration rather than the point;
//! the point only decides coverage.
//!
//! Heights are requested in metres relative to MLLW and times in GMT.

use crate::http::HttpTransport;
use crate::normalize::RawTides;
use crate::provider::{ensure_coverage, FetchRequest, ProviderId, Source, Tides};
use crate::{CoverageRegion, ProviderError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DATAGETTER_URL: &str = "https://api.tidesandcurrents.noaa.gov/api/prod/datagetter";

/// Portland, ME
pub const DEFAULT_STATION: &str = "8418150";

/// Continental US, Alaska, Hawaii and the Caribbean territories.
pub const UNITED_STATES: CoverageRegion =
    CoverageRegion::new("United States", 17.0, 72.0, -180.0, -64.0);

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct NoaaPredictions {
    #[serde(default)]
    pub predictions: Vec<NoaaPrediction>,
    #[serde(default)]
    pub error: Option<NoaaApiError>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NoaaApiError {
    pub message: String,
}

/// One high/low prediction; `v` is a numeric string, `t` is `YYYY-MM-DD HH:MM` GMT.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct NoaaPrediction {
    pub t: String,
    pub v: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone)]
pub struct NoaaClient {
    http: HttpTransport,
    url: String,
    station: String,
}

impl NoaaClient {
    pub fn new(http: HttpTransport, station: impl Into<String>) -> Self {
        Self {
            http,
            url: DATAGETTER_URL.to_string(),
            station: station.into(),
        }
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    fn query(&self, request: &FetchRequest) -> Vec<(&'static str, String)> {
        vec![
            ("product", "predictions".to_string()),
            ("application", "xirin-marine".to_string()),
            ("begin_date", request.range.start().format("%Y%m%d").to_string()),
            ("end_date", request.range.end().format("%Y%m%d").to_string()),
            ("datum", "MLLW".to_string()),
            ("station", self.station.clone()),
            ("time_zone", "gmt".to_string()),
            ("units", "metric".to_string()),
            ("interval", "hilo".to_string()),
            ("format", "json".to_string()),
        ]
    }
}

#[async_trait]
impl Source<Tides> for NoaaClient {
    fn id(&self) -> ProviderId {
        ProviderId::Noaa
    }

    fn coverage(&self) -> Option<CoverageRegion> {
        Some(UNITED_STATES)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<RawTides, ProviderError> {
        ensure_coverage(ProviderId::Noaa, Some(UNITED_STATES), request.point)?;
        if self.station.trim().is_empty() {
            return Err(ProviderError::coverage(
                ProviderId::Noaa,
                "no NOAA station configured",
            ));
        }
        let predictions: NoaaPredictions = self
            .http
            .get_json(ProviderId::Noaa, &self.url, &self.query(request))
            .await?;
        if let Some(error) = &predictions.error {
            return Err(ProviderError::malformed(
                ProviderId::Noaa,
                error.message.clone(),
            ));
        }
        Ok(RawTides::Noaa(predictions))
    }
}
