//! # Normalization and Tide-State Properties
//!
//! Exercises the normalizers through provider-shaped JSON bodies, the same
//! way the clients decode them, and checks the properties every consumer of
//! the schema relies on.

use crate::fallback;
use crate::http::decode;
use crate::meteosix::MeteoSixTides;
use crate::noaa::NoaaPredictions;
use crate::normalize::{self, RawTides, RawWeather};
use crate::open_meteo::OpenMeteoForecast;
use crate::provider::ProviderId;
use crate::worldtides::WorldTidesExtremes;
use crate::{tide_state, DateRange, GeoPoint, TideKind, TidePhase, Timestamp};
use chrono::{DateTime, NaiveDate};

fn at(s: &str) -> Timestamp {
    DateTime::parse_from_rfc3339(s).unwrap()
}

fn open_meteo(body: &str) -> RawWeather {
    RawWeather::OpenMeteo(decode::<OpenMeteoForecast>(ProviderId::OpenMeteo, body).unwrap())
}

/// A reported zero is a measurement; a missing key is not.
#[test]
fn zero_is_present_and_missing_is_absent() {
    let raw = open_meteo(
        r#"{"utc_offset_seconds": 0,
            "hourly": {"time": ["2025-01-15T06:00"], "temperature_2m": [0.0], "wind_speed_10m": [null]}}"#,
    );
    let samples = normalize::weather(&raw);
    assert_eq!(samples.len(), 1);
    assert_eq!(samples[0].temperature, Some(0.0));
    assert_eq!(samples[0].wind_speed, None, "null column entry");
    assert_eq!(samples[0].pressure, None, "missing column");
}

#[test]
fn normalization_is_idempotent() {
    let raw = open_meteo(
        r#"{"utc_offset_seconds": 3600,
            "hourly": {"time": ["2025-11-29T01:00", "2025-11-29T00:00"],
                       "temperature_2m": [11.2, 11.9], "cloud_cover": [140.0, 20.0]}}"#,
    );
    assert_eq!(normalize::weather(&raw), normalize::weather(&raw));

    let tides: NoaaPredictions = decode(
        ProviderId::Noaa,
        r#"{"predictions": [{"t": "2025-11-29 04:12", "v": "2.891", "type": "H"}]}"#,
    )
    .unwrap();
    let raw = RawTides::Noaa(tides);
    assert_eq!(normalize::tides(&raw), normalize::tides(&raw));
}

#[test]
fn out_of_order_input_comes_out_sorted() {
    let raw = open_meteo(
        r#"{"utc_offset_seconds": 3600,
            "hourly": {"time": ["2025-11-29T02:00", "2025-11-29T00:00", "2025-11-29T01:00"],
                       "temperature_2m": [3.0, 1.0, 2.0], "cloud_cover": [140.0, 20.0, -5.0]}}"#,
    );
    let samples = normalize::weather(&raw);
    let temps: Vec<_> = samples.iter().map(|s| s.temperature).collect();
    assert_eq!(temps, vec![Some(1.0), Some(2.0), Some(3.0)]);
    assert_eq!(samples[0].timestamp, at("2025-11-28T23:00:00Z"));
    // Cloud cover is clamped into [0, 100].
    assert_eq!(samples[1].cloud_cover, Some(0.0));
    assert_eq!(samples[2].cloud_cover, Some(100.0));
}

/// GMT hours stay one hour apart through the Europe/Madrid switch back to CET.
#[test]
fn gmt_hours_are_evenly_spaced_across_a_dst_change() {
    let raw = open_meteo(
        r#"{"utc_offset_seconds": 0, "timezone": "GMT",
            "hourly": {"time": ["2025-10-26T00:00", "2025-10-26T01:00", "2025-10-26T02:00",
                                "2025-10-26T03:00", "2025-10-26T04:00"],
                       "temperature_2m": [14.0, 13.8, 13.5, 13.1, 12.9]}}"#,
    );
    let samples = normalize::weather(&raw);
    assert_eq!(samples.len(), 5);
    for pair in samples.windows(2) {
        assert_eq!((pair[1].timestamp - pair[0].timestamp).num_minutes(), 60);
    }
    assert_eq!(samples[0].timestamp, at("2025-10-26T02:00:00+02:00"));
    // 04:00 in Madrid after the switch is 03:00Z, not 02:00Z.
    assert_eq!(samples[3].timestamp, at("2025-10-26T04:00:00+01:00"));
}

#[test]
fn truncated_offset_matches_full_offset() {
    let repaired = normalize::parse_timestamp("2025-11-29T13:00:00+01").unwrap();
    let full = normalize::parse_timestamp("2025-11-29T13:00:00+01:00").unwrap();
    assert_eq!(repaired, full);
    assert_eq!(repaired, at("2025-11-29T12:00:00Z"));
}

#[test]
fn meteosix_tides_repair_offsets_and_read_both_languages() {
    let body = r#"{"type": "FeatureCollection", "features": [{"properties": {
        "port": {"id": 3, "name": "Vigo"},
        "days": [{"variables": [{"name": "tides", "summary": [
            {"id": 1, "state": "Pleamar", "timeInstant": "2025-11-29T16:12:00+01", "height": 3.2},
            {"id": 2, "state": "Low tide", "timeInstant": "2025-11-29T10:00:00+01", "height": 0.8},
            {"id": 3, "state": "Slack", "timeInstant": "2025-11-29T19:00:00+01", "height": 2.0}
        ]}]}]}}]}"#;
    let tides: MeteoSixTides = decode(ProviderId::MeteoSix, body).unwrap();
    let events = normalize::tides(&RawTides::MeteoSix(tides));
    assert_eq!(events.len(), 2, "unrecognised states are skipped");
    assert_eq!(events[0].kind, TideKind::Low);
    assert_eq!(events[0].timestamp, at("2025-11-29T09:00:00Z"));
    assert_eq!(events[1].kind, TideKind::High);
}

#[test]
fn worldtides_and_noaa_agree_on_the_same_extremes() {
    let worldtides: WorldTidesExtremes = decode(
        ProviderId::WorldTides,
        r#"{"status": 200, "extremes": [
            {"dt": 1764410400, "height": 0.8, "type": "Low"},
            {"dt": 1764432720, "height": 3.2, "type": "High"}]}"#,
    )
    .unwrap();
    let noaa: NoaaPredictions = decode(
        ProviderId::Noaa,
        r#"{"predictions": [
            {"t": "2025-11-29 16:12", "v": "3.2", "type": "H"},
            {"t": "2025-11-29 10:00", "v": "0.8", "type": "L"}]}"#,
    )
    .unwrap();
    assert_eq!(
        normalize::tides(&RawTides::WorldTides(worldtides)),
        normalize::tides(&RawTides::Noaa(noaa))
    );
}

/// Normalized provider events feed the interpolator directly.
#[test]
fn interpolation_midpoint_from_normalized_events() {
    let noaa: NoaaPredictions = decode(
        ProviderId::Noaa,
        r#"{"predictions": [
            {"t": "2025-11-29 10:00", "v": "0.8", "type": "L"},
            {"t": "2025-11-29 16:12", "v": "3.2", "type": "H"}]}"#,
    )
    .unwrap();
    let events = normalize::tides(&RawTides::Noaa(noaa));
    let reading = tide_state::interpolate(&events, at("2025-11-29T13:06:00Z"));
    assert_eq!(reading.phase, TidePhase::Rising);
    let height = reading.height.unwrap();
    assert!(height > 0.8 && height < 3.2);
    assert!((height - 2.497).abs() < 0.001, "{height}");
}

#[test]
fn single_event_is_not_extrapolated() {
    let noaa: NoaaPredictions = decode(
        ProviderId::Noaa,
        r#"{"predictions": [{"t": "2025-11-29 10:00", "v": "3.0", "type": "H"}]}"#,
    )
    .unwrap();
    let events = normalize::tides(&RawTides::Noaa(noaa));
    let reading = tide_state::interpolate(&events, at("2025-11-29T18:00:00Z"));
    assert_eq!(reading.phase, TidePhase::High);
    assert_eq!(reading.height, Some(3.0));
}

#[test]
fn date_ranges_are_capped_to_the_forecast_horizon() {
    let start = NaiveDate::from_ymd_opt(2025, 11, 29).unwrap();
    let range = DateRange::new(start, 4_000_000_000);
    assert_eq!(range.days(), 16);
    assert_eq!(range.end(), NaiveDate::from_ymd_opt(2025, 12, 14).unwrap());
    assert_eq!(range.end_instant(), at("2025-12-15T00:00:00Z"));
    assert_eq!(DateRange::new(start, 0).days(), 1);

    let decoded: DateRange =
        serde_json::from_str(r#"{"start": "2025-11-29", "days": 4000000000}"#).unwrap();
    assert_eq!(decoded, range);
}

#[test]
fn range_end_saturates_at_the_last_calendar_day() {
    let range = DateRange::new(NaiveDate::MAX, 16);
    assert_eq!(range.end(), NaiveDate::MAX);
}

#[test]
fn simulated_tides_are_byte_identical_across_calls() {
    let point = GeoPoint::new(42.2406, -8.7207).unwrap();
    let range = DateRange::new(NaiveDate::from_ymd_opt(2025, 11, 29).unwrap(), 2);
    let first = serde_json::to_string(&fallback::simulated_tides(point, range)).unwrap();
    let second = serde_json::to_string(&fallback::simulated_tides(point, range)).unwrap();
    assert_eq!(first, second);
}

#[test]
fn simulated_tides_interpolate_cleanly_all_day() {
    let point = GeoPoint::new(43.66, -70.25).unwrap();
    let range = DateRange::single(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    let events = fallback::simulated_tides(point, range);
    let curve = tide_state::sample_curve(&events, events[0].timestamp, events[3].timestamp, 36);
    for (instant, reading) in curve {
        let height = reading.height.unwrap();
        assert!((1.0..=4.0).contains(&height), "{instant}: {height}");
        assert_ne!(reading.phase, TidePhase::Unknown);
    }
}
