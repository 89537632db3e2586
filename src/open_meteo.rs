//! # Open-Meteo Client
//!
//! Global, keyless source for hourly weather (forecast API) and sea state
//! (marine API). Always eligible; it is the primary fallback for both
//! categories.
//!
//! Requests use `timezone=GMT`, so hourly `time` entries are UTC wall-clock
//! strings and `utc_offset_seconds` is 0. A local zone would report one
//! offset for the whole request and mislabel every hour after a DST switch.
//! The envelope offset is still kept and attached during normalization.
//!
//! Hourly arrays are positional and may contain `null` for hours the model
//! did not produce; those stay absent after normalization.

use crate::http::HttpTransport;
use crate::normalize::{RawMarine, RawWeather};
use crate::provider::{FetchRequest, Marine, ProviderId, Source, Weather};
use crate::ProviderError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";
pub const MARINE_URL: &str = "https://marine-api.open-meteo.com/v1/marine";

const WEATHER_HOURLY: &str =
    "temperature_2m,relative_humidity_2m,wind_speed_10m,wind_direction_10m,pressure_msl,cloud_cover,precipitation";
const MARINE_HOURLY: &str = "wave_height,wave_direction,wave_period,sea_surface_temperature";

/// Forecast API response (only the fields we consume).
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenMeteoForecast {
    #[serde(default)]
    pub utc_offset_seconds: i32,
    pub hourly: OpenMeteoHourly,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OpenMeteoHourly {
    pub time: Vec<String>,
    #[serde(default)]
    pub temperature_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub relative_humidity_2m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_speed_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub wind_direction_10m: Vec<Option<f64>>,
    #[serde(default)]
    pub pressure_msl: Vec<Option<f64>>,
    #[serde(default)]
    pub cloud_cover: Vec<Option<f64>>,
    #[serde(default)]
    pub precipitation: Vec<Option<f64>>,
}

/// Marine API response.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct OpenMeteoMarine {
    #[serde(default)]
    pub utc_offset_seconds: i32,
    pub hourly: OpenMeteoMarineHourly,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct OpenMeteoMarineHourly {
    pub time: Vec<String>,
    #[serde(default)]
    pub wave_height: Vec<Option<f64>>,
    #[serde(default)]
    pub wave_direction: Vec<Option<f64>>,
    #[serde(default)]
    pub wave_period: Vec<Option<f64>>,
    #[serde(default)]
    pub sea_surface_temperature: Vec<Option<f64>>,
}

#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: HttpTransport,
    forecast_url: String,
    marine_url: String,
}

impl OpenMeteoClient {
    pub fn new(http: HttpTransport) -> Self {
        Self {
            http,
            forecast_url: FORECAST_URL.to_string(),
            marine_url: MARINE_URL.to_string(),
        }
    }

    /// Point the client at different endpoints (proxies, mirrors).
    pub fn with_base_urls(mut self, forecast: impl Into<String>, marine: impl Into<String>) -> Self {
        self.forecast_url = forecast.into();
        self.marine_url = marine.into();
        self
    }

    fn query(request: &FetchRequest, hourly: &str) -> Vec<(&'static str, String)> {
        vec![
            ("latitude", request.point.latitude().to_string()),
            ("longitude", request.point.longitude().to_string()),
            ("hourly", hourly.to_string()),
            ("timezone", "GMT".to_string()),
            ("start_date", request.range.start().format("%Y-%m-%d").to_string()),
            ("end_date", request.range.end().format("%Y-%m-%d").to_string()),
        ]
    }
}

#[async_trait]
impl Source<Weather> for OpenMeteoClient {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<RawWeather, ProviderError> {
        let query = Self::query(request, WEATHER_HOURLY);
        let forecast: OpenMeteoForecast = self
            .http
            .get_json(ProviderId::OpenMeteo, &self.forecast_url, &query)
            .await?;
        Ok(RawWeather::OpenMeteo(forecast))
    }
}

#[async_trait]
impl Source<Marine> for OpenMeteoClient {
    fn id(&self) -> ProviderId {
        ProviderId::OpenMeteo
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<RawMarine, ProviderError> {
        let query = Self::query(request, MARINE_HOURLY);
        let marine: OpenMeteoMarine = self
            .http
            .get_json(ProviderId::OpenMeteo, &self.marine_url, &query)
            .await?;
        Ok(RawMarine::OpenMeteo(marine))
    }
}
