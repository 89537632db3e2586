//! # Day Conditions and Catch Snapshots
//!
//! [`ConditionsService::fetch_day`] resolves weather, sea state and tides for
//! one point concurrently, each through its own [`FallbackChain`]. The
//! resulting [`DayConditions`] answers point-in-time questions
//! ([`DayConditions::conditions_at`]) and freezes a [`CatchSnapshot`] for the
//! record-creation flow to persist.

use crate::config::{Config, MarineProvider, TideProvider, WeatherProvider};
use crate::fallback::SimulatedSource;
use crate::http::HttpTransport;
use crate::meteosix::{self, MeteoSixClient};
use crate::noaa::{self, NoaaClient};
use crate::open_meteo::{self, OpenMeteoClient};
use crate::provider::{FetchRequest, Marine, ProviderId, Source, Tides, Weather};
use crate::selection::{FallbackChain, NoDataReason, Resolution, Tier};
use crate::worldtides::{self, WorldTidesClient};
use crate::{
    tide_state, DateRange, GeoPoint, HourlyMarineSample, HourlyWeatherSample, TideEvent,
    TideReading, Timestamp, Timestamped,
};
use chrono::Duration;
use log::info;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Hourly samples further than this from the query instant are not used.
pub const MAX_SAMPLE_DISTANCE_MINUTES: i64 = 90;

/// Base URLs of every provider; the defaults are the public services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub open_meteo_forecast: String,
    pub open_meteo_marine: String,
    pub meteosix: String,
    pub worldtides: String,
    pub noaa: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            open_meteo_forecast: open_meteo::FORECAST_URL.to_string(),
            open_meteo_marine: open_meteo::MARINE_URL.to_string(),
            meteosix: meteosix::BASE_URL.to_string(),
            worldtides: worldtides::EXTREMES_URL.to_string(),
            noaa: noaa::DATAGETTER_URL.to_string(),
        }
    }
}

/// Owns the HTTP transport shared by every provider client.
#[derive(Debug, Clone)]
pub struct ConditionsService {
    http: HttpTransport,
    endpoints: Endpoints,
}

impl ConditionsService {
    pub fn new(config: &Config) -> reqwest::Result<Self> {
        Ok(Self::with_transport(HttpTransport::new(config.timeout())?))
    }

    pub fn with_transport(http: HttpTransport) -> Self {
        Self {
            http,
            endpoints: Endpoints::default(),
        }
    }

    /// Point the provider clients at other hosts, e.g. a mirror or a local stub.
    pub fn with_endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Resolve all three categories for `point` over `range`.
    ///
    /// The three chains run concurrently; a failure in one never cancels the
    /// others.
    pub async fn fetch_day(&self, point: GeoPoint, range: DateRange, config: &Config) -> DayConditions {
        let request = FetchRequest::new(point, range);

        let urls = &self.endpoints;
        let open_meteo = OpenMeteoClient::new(self.http.clone())
            .with_base_urls(&urls.open_meteo_forecast, &urls.open_meteo_marine);
        let meteosix = MeteoSixClient::new(self.http.clone(), config.credentials.meteosix())
            .with_base_url(&urls.meteosix);
        let worldtides = WorldTidesClient::new(self.http.clone(), config.credentials.worldtides())
            .with_url(&urls.worldtides);
        let noaa = NoaaClient::new(self.http.clone(), config.noaa.station.clone()).with_url(&urls.noaa);
        let simulated = SimulatedSource;

        let weather_preferred: &dyn Source<Weather> = match config.providers.weather {
            WeatherProvider::OpenMeteo => &open_meteo,
            WeatherProvider::MeteoSix => &meteosix,
            WeatherProvider::Simulated => &simulated,
        };
        let weather = FallbackChain::<Weather>::new(
            Some(weather_preferred),
            &open_meteo,
            config.fallback.simulated_weather.then_some(&simulated as &dyn Source<Weather>),
        );

        let marine_preferred: &dyn Source<Marine> = match config.providers.marine {
            MarineProvider::OpenMeteo => &open_meteo,
            MarineProvider::MeteoSix => &meteosix,
            MarineProvider::Simulated => &simulated,
        };
        let marine = FallbackChain::<Marine>::new(
            Some(marine_preferred),
            &open_meteo,
            config.fallback.simulated_marine.then_some(&simulated as &dyn Source<Marine>),
        );

        let tide_preferred: Option<&dyn Source<Tides>> = match config.providers.tide {
            TideProvider::None => None,
            TideProvider::WorldTides => Some(&worldtides),
            TideProvider::Noaa => Some(&noaa),
            TideProvider::MeteoSix => Some(&meteosix),
            TideProvider::Simulated => Some(&simulated),
        };
        let tides = FallbackChain::<Tides>::new(
            tide_preferred,
            &worldtides,
            config.fallback.simulated_tides.then_some(&simulated as &dyn Source<Tides>),
        );

        info!("fetching conditions for {point} from {}", range.start());
        let (weather, marine, tides) = tokio::join!(
            weather.resolve(&request),
            marine.resolve(&request),
            tides.resolve(&request),
        );

        DayConditions {
            point,
            range,
            weather,
            marine,
            tides,
        }
    }
}

/// Everything resolved for one point and date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DayConditions {
    pub point: GeoPoint,
    pub range: DateRange,
    pub weather: Resolution<Vec<HourlyWeatherSample>>,
    pub marine: Resolution<Vec<HourlyMarineSample>>,
    pub tides: Resolution<Vec<TideEvent>>,
}

/// Conditions at a single instant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherConditions {
    pub at: Timestamp,
    pub weather: Option<HourlyWeatherSample>,
    pub marine: Option<HourlyMarineSample>,
    pub tide: TideReading,
    pub next_tide: Option<TideEvent>,
}

/// One hour with whichever categories have a sample at that instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyConditions {
    pub timestamp: Timestamp,
    pub weather: Option<HourlyWeatherSample>,
    pub marine: Option<HourlyMarineSample>,
}

/// Where one category's data came from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provenance {
    pub source: Option<ProviderId>,
    pub tier: Option<Tier>,
    pub simulated: bool,
    pub no_data: Option<NoDataReason>,
    /// Failed tiers, in the order they were tried.
    pub failures: Vec<String>,
}

impl<T> From<&Resolution<T>> for Provenance {
    fn from(resolution: &Resolution<T>) -> Self {
        Provenance {
            source: resolution.source(),
            tier: resolution.tier(),
            simulated: resolution.is_simulated(),
            no_data: match resolution {
                Resolution::NoData { reason, .. } => Some(*reason),
                Resolution::Data { .. } => None,
            },
            failures: resolution
                .attempts()
                .iter()
                .map(|attempt| attempt.error.to_string())
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotProvenance {
    pub weather: Provenance,
    pub marine: Provenance,
    pub tides: Provenance,
}

impl SnapshotProvenance {
    pub fn any_simulated(&self) -> bool {
        self.weather.simulated || self.marine.simulated || self.tides.simulated
    }
}

/// Conditions payload attached to a catch record. Captured once at
/// record-creation time and never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatchSnapshot {
    pub caught_at: Timestamp,
    pub point: GeoPoint,
    pub conditions: WeatherConditions,
    pub hourly_weather: Vec<HourlyWeatherSample>,
    pub hourly_marine: Vec<HourlyMarineSample>,
    pub tides: Vec<TideEvent>,
    pub provenance: SnapshotProvenance,
}

fn samples<T>(resolution: &Resolution<Vec<T>>) -> &[T] {
    resolution.value().map(Vec::as_slice).unwrap_or(&[])
}

/// Sample closest to `at`, if any lies within the allowed distance.
fn nearest<T: Timestamped>(samples: &[T], at: Timestamp) -> Option<&T> {
    let limit = Duration::minutes(MAX_SAMPLE_DISTANCE_MINUTES);
    samples
        .iter()
        .map(|sample| {
            let offset = sample.timestamp() - at;
            (if offset < Duration::zero() { -offset } else { offset }, sample)
        })
        .filter(|(distance, _)| *distance <= limit)
        .min_by_key(|(distance, _)| *distance)
        .map(|(_, sample)| sample)
}

impl DayConditions {
    pub fn hourly_weather(&self) -> &[HourlyWeatherSample] {
        samples(&self.weather)
    }

    pub fn hourly_marine(&self) -> &[HourlyMarineSample] {
        samples(&self.marine)
    }

    pub fn tide_events(&self) -> &[TideEvent] {
        samples(&self.tides)
    }

    /// Point-in-time conditions. Weather and marine samples are looked up
    /// independently, so the two series may have different lengths.
    pub fn conditions_at(&self, at: Timestamp) -> WeatherConditions {
        let tides = self.tide_events();
        WeatherConditions {
            at,
            weather: nearest(self.hourly_weather(), at).cloned(),
            marine: nearest(self.hourly_marine(), at).cloned(),
            tide: tide_state::interpolate(tides, at),
            next_tide: tide_state::next_event(tides, at).cloned(),
        }
    }

    /// Weather and marine rows joined by instant, ascending.
    pub fn merged_hourly(&self) -> Vec<HourlyConditions> {
        let mut rows: BTreeMap<Timestamp, HourlyConditions> = BTreeMap::new();
        for sample in self.hourly_weather() {
            rows.entry(sample.timestamp)
                .or_insert_with(|| HourlyConditions {
                    timestamp: sample.timestamp,
                    weather: None,
                    marine: None,
                })
                .weather
                .get_or_insert_with(|| sample.clone());
        }
        for sample in self.hourly_marine() {
            rows.entry(sample.timestamp)
                .or_insert_with(|| HourlyConditions {
                    timestamp: sample.timestamp,
                    weather: None,
                    marine: None,
                })
                .marine
                .get_or_insert_with(|| sample.clone());
        }
        rows.into_values().collect()
    }

    pub fn provenance(&self) -> SnapshotProvenance {
        SnapshotProvenance {
            weather: Provenance::from(&self.weather),
            marine: Provenance::from(&self.marine),
            tides: Provenance::from(&self.tides),
        }
    }

    /// Freeze the conditions for a catch at `caught_at`.
    pub fn snapshot(&self, caught_at: Timestamp) -> CatchSnapshot {
        CatchSnapshot {
            caught_at,
            point: self.point,
            conditions: self.conditions_at(caught_at),
            hourly_weather: self.hourly_weather().to_vec(),
            hourly_marine: self.hourly_marine().to_vec(),
            tides: self.tide_events().to_vec(),
            provenance: self.provenance(),
        }
    }
}
