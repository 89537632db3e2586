//! # MeteoSIX Client (MeteoGalicia API v5)
//!
//! Regional high-resolution source for the Galician coast. One endpoint
//! (`getNumericForecastInfo`) serves both atmospheric (WRF) and sea-state
//! (WW3/SWAN, ROMS) variables; `getTidesInfo` serves tide extrema for the
//! nearest port.
//!
//! ## Quirks handled here or in normalization
//! - Requires an `API_KEY`; a missing key fails with `Auth` before any request
//! - Points outside [`GALICIA`] are rejected locally with `Coverage`, and the
//!   service itself answers them with HTTP 216
//! - `timeInstant` values may carry a truncated offset (`+01`), repaired by
//!   [`crate::normalize::repair_offset`]
//! - Variable values may be numbers or numeric strings
//! - Wind is a module/direction pair whose module unit is reported per variable

use crate::http::HttpTransport;
use crate::normalize::{RawMarine, RawTides, RawWeather};
use crate::provider::{ensure_coverage, FetchRequest, Marine, ProviderId, Source, Tides, Weather};
use crate::{CoverageRegion, ProviderError};
use async_trait::async_trait;
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

pub const BASE_URL: &str = "https://servizos.meteogalicia.gal/apiv5";

/// Galicia and nearby Atlantic waters.
pub const GALICIA: CoverageRegion = CoverageRegion::new("Galicia", 41.5, 44.0, -9.5, -6.5);

const WEATHER_VARIABLES: &str = "temperature,wind,precipitation_amount,relative_humidity,cloud_area_fraction,air_pressure_at_sea_level";
const MARINE_VARIABLES: &str =
    "significative_wave_height,mean_wave_direction,relative_peak_period,sea_water_temperature";

/// GeoJSON envelope returned by `getNumericForecastInfo`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MeteoSixForecast {
    #[serde(default)]
    pub features: Vec<MeteoSixFeature>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MeteoSixFeature {
    pub properties: MeteoSixProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MeteoSixProperties {
    #[serde(default)]
    pub days: Vec<MeteoSixDay>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MeteoSixDay {
    #[serde(default)]
    pub variables: Vec<MeteoSixVariable>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeteoSixVariable {
    pub name: String,
    #[serde(default)]
    pub units: Option<String>,
    #[serde(default)]
    pub module_units: Option<String>,
    #[serde(default)]
    pub values: Vec<MeteoSixValue>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeteoSixValue {
    pub time_instant: String,
    /// Number, numeric string, or absent.
    #[serde(default)]
    pub value: Option<serde_json::Value>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub module_value: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub direction_value: Option<f64>,
}

/// Reads a JSON number or numeric string; anything else is `None`.
pub(crate) fn number_in(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.as_ref().and_then(number_in))
}

impl MeteoSixForecast {
    pub fn days(&self) -> &[MeteoSixDay] {
        self.features
            .first()
            .map(|feature| feature.properties.days.as_slice())
            .unwrap_or_default()
    }
}

/// GeoJSON envelope returned by `getTidesInfo`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MeteoSixTides {
    #[serde(default)]
    pub features: Vec<MeteoSixTideFeature>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MeteoSixTideFeature {
    pub properties: MeteoSixTideProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MeteoSixTideProperties {
    #[serde(default)]
    pub port: Option<MeteoSixPort>,
    #[serde(default)]
    pub days: Vec<MeteoSixTideDay>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MeteoSixPort {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct MeteoSixTideDay {
    #[serde(default)]
    pub variables: Vec<MeteoSixTideVariable>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct MeteoSixTideVariable {
    pub name: String,
    #[serde(default)]
    pub summary: Vec<MeteoSixTideSummary>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MeteoSixTideSummary {
    pub state: String,
    pub time_instant: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub height: Option<f64>,
}

impl MeteoSixTides {
    pub fn days(&self) -> &[MeteoSixTideDay] {
        self.features
            .first()
            .map(|feature| feature.properties.days.as_slice())
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct MeteoSixClient {
    http: HttpTransport,
    base_url: String,
    api_key: Option<String>,
}

impl MeteoSixClient {
    pub fn new(http: HttpTransport, api_key: Option<String>) -> Self {
        Self {
            http,
            base_url: BASE_URL.to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
        }
    }

    /// Route requests through a proxy exposing the same paths.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Credential and coverage checks shared by every endpoint.
    fn preflight(&self, request: &FetchRequest) -> Result<&str, ProviderError> {
        let key = self
            .api_key
            .as_deref()
            .ok_or_else(|| ProviderError::auth(ProviderId::MeteoSix, "API key not configured"))?;
        ensure_coverage(ProviderId::MeteoSix, Some(GALICIA), request.point)?;
        Ok(key)
    }

    fn query(request: &FetchRequest, key: &str) -> Vec<(&'static str, String)> {
        vec![
            (
                "coords",
                format!(
                    "{},{}",
                    request.point.longitude(),
                    request.point.latitude()
                ),
            ),
            ("API_KEY", key.to_string()),
            ("format", "application/json".to_string()),
            ("lang", "en".to_string()),
            ("tz", "Europe/Madrid".to_string()),
            (
                "startTime",
                request.range.start().format("%Y-%m-%dT00:00:00").to_string(),
            ),
            (
                "endTime",
                request.range.end().format("%Y-%m-%dT23:59:59").to_string(),
            ),
        ]
    }

    async fn numeric_forecast(
        &self,
        request: &FetchRequest,
        variables: &str,
    ) -> Result<MeteoSixForecast, ProviderError> {
        let key = self.preflight(request)?;
        let mut query = Self::query(request, key);
        query.push(("variables", variables.to_string()));
        let url = format!("{}/getNumericForecastInfo", self.base_url);
        let forecast: MeteoSixForecast = self
            .http
            .get_json(ProviderId::MeteoSix, &url, &query)
            .await?;
        if forecast.days().is_empty() {
            return Err(ProviderError::malformed(
                ProviderId::MeteoSix,
                "no forecast days in response",
            ));
        }
        debug!("MeteoSIX: {} forecast days", forecast.days().len());
        Ok(forecast)
    }
}

#[async_trait]
impl Source<Weather> for MeteoSixClient {
    fn id(&self) -> ProviderId {
        ProviderId::MeteoSix
    }

    fn coverage(&self) -> Option<CoverageRegion> {
        Some(GALICIA)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<RawWeather, ProviderError> {
        self.numeric_forecast(request, WEATHER_VARIABLES)
            .await
            .map(RawWeather::MeteoSix)
    }
}

#[async_trait]
impl Source<Marine> for MeteoSixClient {
    fn id(&self) -> ProviderId {
        ProviderId::MeteoSix
    }

    fn coverage(&self) -> Option<CoverageRegion> {
        Some(GALICIA)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<RawMarine, ProviderError> {
        self.numeric_forecast(request, MARINE_VARIABLES)
            .await
            .map(RawMarine::MeteoSix)
    }
}

#[async_trait]
impl Source<Tides> for MeteoSixClient {
    fn id(&self) -> ProviderId {
        ProviderId::MeteoSix
    }

    fn coverage(&self) -> Option<CoverageRegion> {
        Some(GALICIA)
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<RawTides, ProviderError> {
        let key = self.preflight(request)?;
        let query = Self::query(request, key);
        let url = format!("{}/getTidesInfo", self.base_url);
        let tides: MeteoSixTides = self
            .http
            .get_json(ProviderId::MeteoSix, &url, &query)
            .await?;
        if tides.days().is_empty() {
            return Err(ProviderError::malformed(
                ProviderId::MeteoSix,
                "no tide days in response",
            ));
        }
        if let Some(port) = tides.features.first().and_then(|f| f.properties.port.as_ref()) {
            debug!("MeteoSIX: tides for port {}", port.name);
        }
        Ok(RawTides::MeteoSix(tides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::decode;
    use crate::{DateRange, GeoPoint};
    use chrono::NaiveDate;
    use std::time::Duration;

    fn request_at(lat: f64, lng: f64) -> FetchRequest {
        FetchRequest::new(
            GeoPoint::new(lat, lng).unwrap(),
            DateRange::single(NaiveDate::from_ymd_opt(2025, 11, 29).unwrap()),
        )
    }

    fn client(key: Option<&str>) -> MeteoSixClient {
        let http = HttpTransport::new(Duration::from_secs(1)).unwrap();
        MeteoSixClient::new(http, key.map(str::to_string))
    }

    #[test]
    fn galicia_covers_vigo_but_not_lisbon() {
        assert!(GALICIA.contains(GeoPoint::new(42.24, -8.72).unwrap()));
        assert!(!GALICIA.contains(GeoPoint::new(38.72, -9.14).unwrap()));
    }

    #[test]
    fn missing_key_is_an_auth_failure() {
        let err = client(None).preflight(&request_at(42.24, -8.72)).unwrap_err();
        assert!(matches!(err, ProviderError::Auth { .. }));
    }

    #[test]
    fn blank_key_counts_as_missing() {
        let err = client(Some("  ")).preflight(&request_at(42.24, -8.72)).unwrap_err();
        assert!(matches!(err, ProviderError::Auth { .. }));
    }

    #[test]
    fn out_of_region_call_is_rejected_locally() {
        let err = client(Some("k")).preflight(&request_at(38.72, -9.14)).unwrap_err();
        assert!(matches!(err, ProviderError::Coverage { .. }));
    }

    #[test]
    fn coords_are_longitude_first() {
        let query = MeteoSixClient::query(&request_at(42.5, -8.5), "k");
        assert!(query.contains(&("coords", "-8.5,42.5".to_string())));
    }

    #[test]
    fn numeric_forecast_body_decodes_mixed_value_types() {
        let body = r#"{
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "geometry": {"type": "Point", "coordinates": [-8.72, 42.24]},
                "properties": {"days": [{
                    "timePeriod": {"begin": {"timeInstant": "2025-11-29T00:00:00+01"}},
                    "variables": [
                        {"name": "temperature", "model": "WRF", "units": "degc",
                         "values": [{"timeInstant": "2025-11-29T13:00:00+01", "modelRun": "x", "value": "12.5"}]},
                        {"name": "wind", "moduleUnits": "m s-1", "directionUnits": "deg",
                         "values": [{"timeInstant": "2025-11-29T13:00:00+01", "moduleValue": 5.0, "directionValue": 270.0}]}
                    ]
                }]}
            }]
        }"#;
        let forecast: MeteoSixForecast = decode(ProviderId::MeteoSix, body).unwrap();
        let day = &forecast.days()[0];
        assert_eq!(day.variables.len(), 2);
        assert_eq!(day.variables[1].module_units.as_deref(), Some("m s-1"));
    }

    #[test]
    fn wind_and_tide_numbers_may_arrive_as_strings() {
        let wind: MeteoSixValue = decode(
            ProviderId::MeteoSix,
            r#"{"timeInstant": "2025-11-29T13:00:00+01", "moduleValue": "5.5", "directionValue": " 270 "}"#,
        )
        .unwrap();
        assert_eq!(wind.module_value, Some(5.5));
        assert_eq!(wind.direction_value, Some(270.0));

        let odd: MeteoSixValue = decode(
            ProviderId::MeteoSix,
            r#"{"timeInstant": "2025-11-29T13:00:00+01", "moduleValue": "calm", "directionValue": null}"#,
        )
        .unwrap();
        assert_eq!((odd.module_value, odd.direction_value), (None, None));

        let tides: MeteoSixTides = decode(
            ProviderId::MeteoSix,
            r#"{"features": [{"properties": {"days": [{"variables": [{"name": "tides", "summary": [
                {"state": "High tides", "timeInstant": "2025-11-29T04:12:00+01", "height": "3.42"},
                {"state": "Low tides", "timeInstant": "2025-11-29T10:25:00+01", "height": 0.8}
            ]}]}]}}]}"#,
        )
        .unwrap();
        let summary = &tides.days()[0].variables[0].summary;
        assert_eq!(summary[0].height, Some(3.42));
        assert_eq!(summary[1].height, Some(0.8));
    }
}
