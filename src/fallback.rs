//! # Simulated Fallback Source
//!
//! Terminal data source used when every real provider has failed (or when a
//! user explicitly prefers simulated data). It never fails for a valid
//! [`GeoPoint`] and is a pure function of (latitude, longitude, date range),
//! so repeated calls produce identical output.
//!
//! **This is a placeholder signal, not physics.** Results are labelled with
//! [`ProviderId::Simulated`] all the way to the catch record so that users
//! are never shown them as real observations.
//!
//! ## Tide Model
//! - A lunar-like offset from days since the Unix epoch modulo 29.53
//! - A location offset from (lat, lng) in `[0, 1)`, worth up to 6 hours
//! - Extremes alternate every 6.2 hours, four per day, starting with the
//!   first one after midnight UTC of the first requested day
//! - Heights sit at a fixed base ± amplitude (2.5 m ± 1.5 m)
//!
//! ## Weather and Sea-State Model
//! Smooth daily cycles keyed to solar hour (longitude / 15) with a
//! latitude-dependent baseline. Precipitation is left unknown.

use crate::normalize::{RawMarine, RawTides, RawWeather};
use crate::provider::{FetchRequest, Marine, ProviderId, Source, Tides, Weather};
use crate::{
    DateRange, GeoPoint, HourlyMarineSample, HourlyWeatherSample, ProviderError, TideEvent,
    TideKind,
};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate};
use std::f64::consts::TAU;

/// Mean synodic month used for the lunar-like offset.
pub const SYNODIC_MONTH_DAYS: f64 = 29.53;

/// Hours between consecutive simulated extremes.
pub const EVENT_SPACING_HOURS: f64 = 6.2;

const EVENTS_PER_DAY: u32 = 4;
const BASE_HEIGHT_M: f64 = 2.5;
const AMPLITUDE_M: f64 = 1.5;

/// Position-derived factor in `[0, 1]`.
fn location_factor(point: GeoPoint) -> f64 {
    ((point.latitude() + 90.0) / 180.0 + (point.longitude() + 180.0) / 360.0) / 2.0
}

fn days_since_epoch(date: NaiveDate) -> f64 {
    let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
    date.signed_duration_since(epoch).num_days() as f64
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let scale = 10f64.powi(decimals);
    (value * scale).round() / scale
}

fn hours(h: f64) -> Duration {
    Duration::milliseconds((h * 3_600_000.0).round() as i64)
}

/// Placeholder tide extremes for `range` at `point`.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use xirin_marine_lib::{fallback, DateRange, GeoPoint};
///
/// let point = GeoPoint::new(42.24, -8.72).unwrap();
/// let day = DateRange::single(NaiveDate::from_ymd_opt(2025, 11, 29).unwrap());
/// let events = fallback::simulated_tides(point, day);
/// assert_eq!(events.len(), 4);
/// assert_eq!(events, fallback::simulated_tides(point, day));
/// ```
pub fn simulated_tides(point: GeoPoint, range: DateRange) -> Vec<TideEvent> {
    let lunar_days = days_since_epoch(range.start()).rem_euclid(SYNODIC_MONTH_DAYS);
    let base_offset = (lunar_days / SYNODIC_MONTH_DAYS) * 24.0 + location_factor(point) * 6.0;

    // Highs recur every two spacings; start from the first extremum at or after midnight.
    let phase = base_offset.rem_euclid(2.0 * EVENT_SPACING_HOURS);
    let (first_hour, first_high) = if phase >= EVENT_SPACING_HOURS {
        (phase - EVENT_SPACING_HOURS, false)
    } else {
        (phase, true)
    };

    let midnight = range.start_instant();
    (0..EVENTS_PER_DAY.saturating_mul(range.days()))
        .map(|i| {
            let is_high = (i % 2 == 0) == first_high;
            let hour = first_hour + f64::from(i) * EVENT_SPACING_HOURS;
            let (kind, height) = if is_high {
                (TideKind::High, BASE_HEIGHT_M + AMPLITUDE_M)
            } else {
                (TideKind::Low, BASE_HEIGHT_M - AMPLITUDE_M)
            };
            TideEvent {
                timestamp: midnight + hours(hour),
                kind,
                height: round_to(height, 2),
            }
        })
        .collect()
}

/// Placeholder hourly weather for `range` at `point`.
pub fn simulated_weather(point: GeoPoint, range: DateRange) -> Vec<HourlyWeatherSample> {
    let location = location_factor(point);
    let baseline = 27.0 - 0.4 * point.latitude().abs();
    let midnight = range.start_instant();

    (0..24u32.saturating_mul(range.days()))
        .map(|h| {
            let hour = f64::from(h);
            let solar = (hour + point.longitude() / 15.0).rem_euclid(24.0);
            // Peaks mid-afternoon, bottoms out before dawn.
            let diurnal = (TAU * (solar - 9.0) / 24.0).sin();
            let gust = (TAU * hour / 24.0 + location * TAU).sin();
            HourlyWeatherSample {
                timestamp: midnight + Duration::hours(i64::from(h)),
                temperature: Some(round_to(baseline + 4.0 * diurnal, 1)),
                wind_speed: Some(round_to(12.0 + 6.0 * gust, 1)),
                wind_direction: Some(round_to(location * 360.0 + 15.0 * gust, 0).rem_euclid(360.0)),
                pressure: Some(round_to(1013.0 + 3.0 * (TAU * hour / 48.0 + location).cos(), 1)),
                cloud_cover: Some(round_to((50.0 - 30.0 * diurnal).clamp(0.0, 100.0), 0)),
                relative_humidity: Some(round_to((72.0 - 15.0 * diurnal).clamp(0.0, 100.0), 0)),
                precipitation_mm: None,
            }
        })
        .collect()
}

/// Placeholder hourly sea state for `range` at `point`.
pub fn simulated_marine(point: GeoPoint, range: DateRange) -> Vec<HourlyMarineSample> {
    let location = location_factor(point);
    let sea_baseline = 24.0 - 0.3 * point.latitude().abs();
    let midnight = range.start_instant();

    (0..24u32.saturating_mul(range.days()))
        .map(|h| {
            let hour = f64::from(h);
            let swell = (TAU * hour / 24.0 + location * TAU).sin();
            HourlyMarineSample {
                timestamp: midnight + Duration::hours(i64::from(h)),
                wave_height: Some(round_to(1.2 + 0.4 * swell, 2)),
                wave_direction: Some(round_to(location * 360.0 + 180.0, 0).rem_euclid(360.0)),
                wave_period: Some(round_to(9.0 + 2.0 * swell, 1)),
                sea_temperature: Some(round_to(sea_baseline + 0.5 * swell, 1)),
            }
        })
        .collect()
}

/// The simulated provider for every data category.
#[derive(Debug, Clone, Copy, Default)]
pub struct SimulatedSource;

#[async_trait]
impl Source<Weather> for SimulatedSource {
    fn id(&self) -> ProviderId {
        ProviderId::Simulated
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<RawWeather, ProviderError> {
        Ok(RawWeather::Simulated(simulated_weather(
            request.point,
            request.range,
        )))
    }
}

#[async_trait]
impl Source<Marine> for SimulatedSource {
    fn id(&self) -> ProviderId {
        ProviderId::Simulated
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<RawMarine, ProviderError> {
        Ok(RawMarine::Simulated(simulated_marine(
            request.point,
            request.range,
        )))
    }
}

#[async_trait]
impl Source<Tides> for SimulatedSource {
    fn id(&self) -> ProviderId {
        ProviderId::Simulated
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<RawTides, ProviderError> {
        Ok(RawTides::Simulated(simulated_tides(
            request.point,
            request.range,
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> DateRange {
        DateRange::single(NaiveDate::from_ymd_opt(y, m, d).unwrap())
    }

    #[test]
    fn tides_alternate_and_are_spaced_evenly() {
        let point = GeoPoint::new(43.36, -8.41).unwrap();
        let events = simulated_tides(point, day(2025, 7, 24));
        assert_eq!(events.len(), 4);
        for pair in events.windows(2) {
            assert_ne!(pair[0].kind, pair[1].kind, "extremes must alternate");
            let gap = (pair[1].timestamp - pair[0].timestamp).num_seconds();
            assert!((gap - 22_320).abs() <= 1, "6.2 h between extremes, got {gap}s");
        }
    }

    #[test]
    fn first_event_falls_within_the_first_spacing_of_the_day() {
        let point = GeoPoint::new(-33.9, 151.2).unwrap();
        let range = day(2026, 1, 3);
        let first = &simulated_tides(point, range)[0];
        let offset = first.timestamp - range.start_instant();
        assert!(offset >= Duration::zero());
        assert!(offset < hours(EVENT_SPACING_HOURS));
    }

    #[test]
    fn heights_are_base_plus_minus_amplitude() {
        let point = GeoPoint::new(0.0, 0.0).unwrap();
        for event in simulated_tides(point, day(2025, 1, 1)) {
            match event.kind {
                TideKind::High => assert_eq!(event.height, 4.0),
                TideKind::Low => assert_eq!(event.height, 1.0),
            }
        }
    }

    #[test]
    fn location_changes_timing() {
        let range = day(2025, 11, 29);
        let vigo = simulated_tides(GeoPoint::new(42.24, -8.72).unwrap(), range);
        let boston = simulated_tides(GeoPoint::new(42.36, -71.06).unwrap(), range);
        assert_ne!(vigo[0].timestamp, boston[0].timestamp);
    }

    #[test]
    fn multi_day_ranges_scale_event_count() {
        let point = GeoPoint::new(42.24, -8.72).unwrap();
        let range = DateRange::new(NaiveDate::from_ymd_opt(2025, 11, 29).unwrap(), 3);
        assert_eq!(simulated_tides(point, range).len(), 12);
        assert_eq!(simulated_weather(point, range).len(), 72);
        assert_eq!(simulated_marine(point, range).len(), 72);
    }

    #[test]
    fn oversized_ranges_are_capped_to_the_forecast_horizon() {
        let point = GeoPoint::new(42.24, -8.72).unwrap();
        let range = DateRange::new(NaiveDate::from_ymd_opt(2025, 11, 29).unwrap(), 4_000_000_000);
        assert_eq!(range.days(), crate::MAX_FORECAST_DAYS);
        assert_eq!(simulated_tides(point, range).len(), 64);
        assert_eq!(simulated_weather(point, range).len(), 384);
        assert_eq!(simulated_marine(point, range).len(), 384);
    }

    #[test]
    fn weather_values_stay_in_schema_ranges() {
        let point = GeoPoint::new(60.0, 5.3).unwrap();
        for sample in simulated_weather(point, day(2025, 2, 1)) {
            let direction = sample.wind_direction.unwrap();
            assert!((0.0..360.0).contains(&direction));
            let clouds = sample.cloud_cover.unwrap();
            assert!((0.0..=100.0).contains(&clouds));
            assert!(sample.precipitation_mm.is_none());
        }
    }
}
