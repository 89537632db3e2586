//! # Xirin Marine Conditions Core
//!
//! This library turns heterogeneous weather, wave and tide provider responses into one
//! normalized schema and derives point-in-time tide state for a logged catch.
//!
//! ## Data Flow
//! 1. **Select**: [`selection::FallbackChain`] picks a provider for each data category,
//!    gating regional providers by their [`CoverageRegion`]
//! 2. **Fetch**: a [`provider::Source`] performs one bounded HTTP round trip
//! 3. **Normalize**: [`normalize`] reshapes the provider-native payload into
//!    [`HourlyWeatherSample`], [`HourlyMarineSample`] or [`TideEvent`] sequences
//! 4. **Interpolate**: [`tide_state::interpolate`] derives a [`TideReading`] for any instant
//!
//! When every real provider fails, the simulated source in [`fallback`] keeps the
//! pipeline producing (clearly labelled) placeholder data.
//!
//! ## Core Types
//! - [`GeoPoint`]: validated latitude/longitude pair
//! - [`CoverageRegion`]: rectangular service area of a regional provider
//! - [`DateRange`]: whole UTC days requested from a provider
//! - [`HourlyWeatherSample`] / [`HourlyMarineSample`]: one forecast hour; every measured
//!   field is optional so that "unknown" never masquerades as a measured zero
//! - [`TideEvent`] / [`TideReading`]: tide extrema and derived instantaneous state

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub mod conditions;
pub mod config;
pub mod error;
pub mod fallback;
pub mod http;
pub mod meteosix;
pub mod noaa;
pub mod normalize;
pub mod open_meteo;
pub mod provider;
pub mod report;
pub mod selection;
pub mod tide_state;
pub mod units;
pub mod worldtides;

#[cfg(test)]
mod tests;

pub use error::{GeoError, ProviderError};

/// Instant with the explicit UTC offset the provider reported.
///
/// Comparisons between timestamps are by absolute instant, so samples from
/// providers reporting different offsets still order correctly.
pub type Timestamp = DateTime<FixedOffset>;

/// A WGS84 position in decimal degrees.
///
/// Fields are private so that every `GeoPoint` in circulation satisfies
/// latitude ∈ [-90, 90] and longitude ∈ [-180, 180]; this also holds for
/// deserialized values.
///
/// # Example
/// ```
/// use xirin_marine_lib::GeoPoint;
///
/// let vigo = GeoPoint::new(42.2406, -8.7207).unwrap();
/// assert_eq!(vigo.latitude(), 42.2406);
/// assert!(GeoPoint::new(91.0, 0.0).is_err());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "UncheckedGeoPoint")]
pub struct GeoPoint {
    latitude: f64,
    longitude: f64,
}

#[derive(Deserialize)]
struct UncheckedGeoPoint {
    latitude: f64,
    longitude: f64,
}

impl TryFrom<UncheckedGeoPoint> for GeoPoint {
    type Error = GeoError;

    fn try_from(raw: UncheckedGeoPoint) -> Result<Self, Self::Error> {
        GeoPoint::new(raw.latitude, raw.longitude)
    }
}

impl GeoPoint {
    /// Build a point, rejecting out-of-range or non-finite coordinates.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, GeoError> {
        if !latitude.is_finite() || !(-90.0..=90.0).contains(&latitude) {
            return Err(GeoError::Latitude(latitude));
        }
        if !longitude.is_finite() || !(-180.0..=180.0).contains(&longitude) {
            return Err(GeoError::Longitude(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }
}

impl fmt::Display for GeoPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.4}, {:.4})", self.latitude, self.longitude)
    }
}

/// Named rectangular service area of a regional provider.
///
/// Bounds are inclusive on every edge.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoverageRegion {
    pub name: &'static str,
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl CoverageRegion {
    pub const fn new(
        name: &'static str,
        min_lat: f64,
        max_lat: f64,
        min_lng: f64,
        max_lng: f64,
    ) -> Self {
        Self {
            name,
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    pub fn contains(&self, point: GeoPoint) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.latitude())
            && (self.min_lng..=self.max_lng).contains(&point.longitude())
    }
}

/// Longest range any provider is asked for; Open-Meteo forecasts 16 days ahead.
pub const MAX_FORECAST_DAYS: u32 = 16;

/// A run of whole UTC days, starting at `start`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "UncheckedDateRange")]
pub struct DateRange {
    start: NaiveDate,
    days: u32,
}

#[derive(Deserialize)]
struct UncheckedDateRange {
    start: NaiveDate,
    days: u32,
}

impl From<UncheckedDateRange> for DateRange {
    fn from(raw: UncheckedDateRange) -> Self {
        DateRange::new(raw.start, raw.days)
    }
}

impl DateRange {
    /// Range of `days` days starting at `start`, clamped to `1..=MAX_FORECAST_DAYS`.
    pub fn new(start: NaiveDate, days: u32) -> Self {
        Self {
            start,
            days: days.clamp(1, MAX_FORECAST_DAYS),
        }
    }

    pub fn single(date: NaiveDate) -> Self {
        Self::new(date, 1)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn days(&self) -> u32 {
        self.days
    }

    /// Last day included in the range; saturates at the end of the calendar.
    pub fn end(&self) -> NaiveDate {
        self.start
            .checked_add_signed(Duration::days(i64::from(self.days) - 1))
            .unwrap_or(NaiveDate::MAX)
    }

    /// Midnight UTC at the start of the range.
    pub fn start_instant(&self) -> Timestamp {
        Utc.from_utc_datetime(&self.start.and_time(NaiveTime::MIN))
            .fixed_offset()
    }

    /// Midnight UTC just after the last day of the range.
    pub fn end_instant(&self) -> Timestamp {
        let start = self.start_instant();
        start
            .checked_add_signed(Duration::days(i64::from(self.days)))
            .unwrap_or(start)
    }
}

/// Anything carrying a single timestamp; used for sorting and nearest lookups.
pub trait Timestamped {
    fn timestamp(&self) -> Timestamp;
}

/// One forecast hour of atmospheric conditions.
///
/// Units: °C, km/h, degrees in `[0, 360)`, hPa, percent in `[0, 100]`, mm.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourlyWeatherSample {
    pub timestamp: Timestamp,
    pub temperature: Option<f64>,
    pub wind_speed: Option<f64>,
    pub wind_direction: Option<f64>,
    pub pressure: Option<f64>,
    pub cloud_cover: Option<f64>,
    pub relative_humidity: Option<f64>,
    pub precipitation_mm: Option<f64>,
}

impl HourlyWeatherSample {
    /// A sample at `timestamp` with every measurement unknown.
    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            temperature: None,
            wind_speed: None,
            wind_direction: None,
            pressure: None,
            cloud_cover: None,
            relative_humidity: None,
            precipitation_mm: None,
        }
    }
}

impl Timestamped for HourlyWeatherSample {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

/// One forecast hour of sea state.
///
/// Units: metres, degrees in `[0, 360)`, seconds, °C.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HourlyMarineSample {
    pub timestamp: Timestamp,
    pub wave_height: Option<f64>,
    pub wave_direction: Option<f64>,
    pub wave_period: Option<f64>,
    pub sea_temperature: Option<f64>,
}

impl HourlyMarineSample {
    pub fn empty(timestamp: Timestamp) -> Self {
        Self {
            timestamp,
            wave_height: None,
            wave_direction: None,
            wave_period: None,
            sea_temperature: None,
        }
    }
}

impl Timestamped for HourlyMarineSample {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TideKind {
    High,
    Low,
}

/// A tide extremum. Height is in metres relative to the provider's datum.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideEvent {
    pub timestamp: Timestamp,
    pub kind: TideKind,
    pub height: f64,
}

impl Timestamped for TideEvent {
    fn timestamp(&self) -> Timestamp {
        self.timestamp
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TidePhase {
    Rising,
    Falling,
    High,
    Low,
    Unknown,
}

impl From<TideKind> for TidePhase {
    fn from(kind: TideKind) -> Self {
        match kind {
            TideKind::High => TidePhase::High,
            TideKind::Low => TidePhase::Low,
        }
    }
}

/// Instantaneous tide state derived from a [`TideEvent`] sequence.
///
/// Only [`tide_state::interpolate`] produces these.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TideReading {
    pub phase: TidePhase,
    pub height: Option<f64>,
}

impl TideReading {
    pub const UNKNOWN: TideReading = TideReading {
        phase: TidePhase::Unknown,
        height: None,
    };
}
