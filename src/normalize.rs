//! # Response Normalization
//!
//! Each data category has a tagged union of provider-native payloads and one
//! pure normalizer that turns any variant into the internal schema.
//!
//! ## Guarantees
//! - **Total and deterministic**: no I/O, no hidden state; normalizing the same
//!   payload twice yields identical output
//! - **Absent stays absent**: a missing or `null` field becomes `None`, a
//!   reported `0` stays `Some(0.0)`
//! - **Offsets repaired**: truncated UTC offsets (`+01`, `+0100`) are completed
//!   before parsing
//! - **Ordered**: output is sorted ascending by instant with duplicate
//!   instants removed (first occurrence wins)
//!
//! Samples whose timestamp cannot be parsed are dropped, never invented.

use crate::meteosix::{
    self, MeteoSixDay, MeteoSixForecast, MeteoSixTides, MeteoSixValue, MeteoSixVariable,
};
use crate::noaa::NoaaPredictions;
use crate::open_meteo::{OpenMeteoForecast, OpenMeteoMarine};
use crate::worldtides::WorldTidesExtremes;
use crate::{
    HourlyMarineSample, HourlyWeatherSample, TideEvent, TideKind, Timestamp, Timestamped,
};
use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, TimeZone, Utc};
use log::warn;
use std::borrow::Cow;
use std::collections::BTreeMap;

/// Provider-native weather payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum RawWeather {
    OpenMeteo(OpenMeteoForecast),
    MeteoSix(MeteoSixForecast),
    Simulated(Vec<HourlyWeatherSample>),
}

/// Provider-native sea-state payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum RawMarine {
    OpenMeteo(OpenMeteoMarine),
    MeteoSix(MeteoSixForecast),
    Simulated(Vec<HourlyMarineSample>),
}

/// Provider-native tide payloads.
#[derive(Debug, Clone, PartialEq)]
pub enum RawTides {
    WorldTides(WorldTidesExtremes),
    Noaa(NoaaPredictions),
    MeteoSix(MeteoSixTides),
    Simulated(Vec<TideEvent>),
}

// MeteoSIX encodes "no value" as this sentinel in numeric fields.
const METEOSIX_MISSING: f64 = -9999.0;

const MS_TO_KMH: f64 = 3.6;
const KNOT_TO_KMH: f64 = 1.852;

pub fn weather(raw: &RawWeather) -> Vec<HourlyWeatherSample> {
    match raw {
        RawWeather::OpenMeteo(forecast) => open_meteo_weather(forecast),
        RawWeather::MeteoSix(forecast) => meteosix_weather(forecast),
        RawWeather::Simulated(samples) => finalize(samples.clone()),
    }
}

pub fn marine(raw: &RawMarine) -> Vec<HourlyMarineSample> {
    match raw {
        RawMarine::OpenMeteo(marine) => open_meteo_marine(marine),
        RawMarine::MeteoSix(forecast) => meteosix_marine(forecast),
        RawMarine::Simulated(samples) => finalize(samples.clone()),
    }
}

pub fn tides(raw: &RawTides) -> Vec<TideEvent> {
    match raw {
        RawTides::WorldTides(envelope) => worldtides_events(envelope),
        RawTides::Noaa(predictions) => noaa_events(predictions),
        RawTides::MeteoSix(tides) => meteosix_events(tides),
        RawTides::Simulated(events) => finalize(events.clone()),
    }
}

/// Complete a UTC offset that is missing its minutes or colon.
///
/// Only the offset after the time component is touched, so a bare date such
/// as `2025-11-29` is returned unchanged.
///
/// ```
/// use xirin_marine_lib::normalize::repair_offset;
///
/// assert_eq!(repair_offset("2025-11-29T13:00:00+01"), "2025-11-29T13:00:00+01:00");
/// assert_eq!(repair_offset("2025-11-29T13:00:00-0330"), "2025-11-29T13:00:00-03:30");
/// assert_eq!(repair_offset("2025-11-29T13:00:00+01:00"), "2025-11-29T13:00:00+01:00");
/// ```
pub fn repair_offset(raw: &str) -> Cow<'_, str> {
    let Some(t) = raw.find('T') else {
        return Cow::Borrowed(raw);
    };
    let time = &raw[t + 1..];
    let Some(sign) = time.rfind(|c| c == '+' || c == '-') else {
        return Cow::Borrowed(raw);
    };
    let offset = &time[sign + 1..];
    if !offset.bytes().all(|b| b.is_ascii_digit()) {
        return Cow::Borrowed(raw);
    }
    match offset.len() {
        2 => Cow::Owned(format!("{raw}:00")),
        4 => {
            let split = raw.len() - 2;
            Cow::Owned(format!("{}:{}", &raw[..split], &raw[split..]))
        }
        _ => Cow::Borrowed(raw),
    }
}

/// Parse an ISO-8601 instant carrying an explicit offset, repairing it first.
pub fn parse_timestamp(raw: &str) -> Option<Timestamp> {
    let repaired = repair_offset(raw.trim());
    DateTime::parse_from_rfc3339(&repaired)
        .or_else(|_| DateTime::parse_from_str(&repaired, "%Y-%m-%dT%H:%M%:z"))
        .ok()
}

/// Parse an offset-less wall-clock time and pin it to `offset`.
fn parse_local(raw: &str, offset: FixedOffset) -> Option<Timestamp> {
    let naive = NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M")
        .or_else(|_| NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%dT%H:%M:%S"))
        .or_else(|_| NaiveDateTime::parse_from_str(raw.trim(), "%Y-%m-%d %H:%M"))
        .ok()?;
    offset.from_local_datetime(&naive).single()
}

/// Sort ascending by instant and drop later duplicates.
fn finalize<T: Timestamped>(mut samples: Vec<T>) -> Vec<T> {
    samples.sort_by_key(|s| s.timestamp());
    samples.dedup_by(|later, earlier| later.timestamp() == earlier.timestamp());
    samples
}

fn finite(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite())
}

fn degrees(value: Option<f64>) -> Option<f64> {
    finite(value).map(|d| d.rem_euclid(360.0))
}

fn percent(value: Option<f64>) -> Option<f64> {
    finite(value).map(|p| p.clamp(0.0, 100.0))
}

fn column(values: &[Option<f64>], index: usize) -> Option<f64> {
    finite(values.get(index).copied().flatten())
}

fn offset_from_seconds(seconds: i32) -> FixedOffset {
    FixedOffset::east_opt(seconds).unwrap_or_else(|| {
        warn!("ignoring out-of-range UTC offset {seconds}s");
        Utc.fix()
    })
}

fn open_meteo_weather(forecast: &OpenMeteoForecast) -> Vec<HourlyWeatherSample> {
    let offset = offset_from_seconds(forecast.utc_offset_seconds);
    let hourly = &forecast.hourly;
    let samples = hourly
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, time)| {
            let Some(timestamp) = parse_local(time, offset) else {
                warn!("Open-Meteo: dropping weather hour with unparseable time {time:?}");
                return None;
            };
            Some(HourlyWeatherSample {
                timestamp,
                temperature: column(&hourly.temperature_2m, i),
                wind_speed: column(&hourly.wind_speed_10m, i),
                wind_direction: degrees(column(&hourly.wind_direction_10m, i)),
                pressure: column(&hourly.pressure_msl, i),
                cloud_cover: percent(column(&hourly.cloud_cover, i)),
                relative_humidity: percent(column(&hourly.relative_humidity_2m, i)),
                precipitation_mm: column(&hourly.precipitation, i),
            })
        })
        .collect();
    finalize(samples)
}

fn open_meteo_marine(marine: &OpenMeteoMarine) -> Vec<HourlyMarineSample> {
    let offset = offset_from_seconds(marine.utc_offset_seconds);
    let hourly = &marine.hourly;
    let samples = hourly
        .time
        .iter()
        .enumerate()
        .filter_map(|(i, time)| {
            let Some(timestamp) = parse_local(time, offset) else {
                warn!("Open-Meteo: dropping marine hour with unparseable time {time:?}");
                return None;
            };
            Some(HourlyMarineSample {
                timestamp,
                wave_height: column(&hourly.wave_height, i),
                wave_direction: degrees(column(&hourly.wave_direction, i)),
                wave_period: column(&hourly.wave_period, i),
                sea_temperature: column(&hourly.sea_surface_temperature, i),
            })
        })
        .collect();
    finalize(samples)
}

/// Numeric payload of a MeteoSIX value: number or numeric string.
fn meteosix_number(value: &MeteoSixValue) -> Option<f64> {
    meteosix_present(value.value.as_ref().and_then(meteosix::number_in))
}

fn meteosix_present(value: Option<f64>) -> Option<f64> {
    finite(value).filter(|v| *v > METEOSIX_MISSING)
}

/// Factor converting a wind module reported in `units` to km/h.
fn wind_factor(units: Option<&str>) -> f64 {
    match units.map(|u| u.trim().to_ascii_lowercase()).as_deref() {
        Some("m s-1") | Some("m/s") | Some("ms-1") | Some("m s**-1") => MS_TO_KMH,
        Some("kt") | Some("kn") | Some("knots") => KNOT_TO_KMH,
        _ => 1.0,
    }
}

/// One MeteoSIX variable with its values keyed by repaired instant.
type Column<'a> = Option<(&'a MeteoSixVariable, BTreeMap<Timestamp, &'a MeteoSixValue>)>;

fn indexed<'a>(day: &'a MeteoSixDay, name: &str) -> Column<'a> {
    let variable = day.variables.iter().find(|v| v.name == name)?;
    let mut by_instant = BTreeMap::new();
    for value in &variable.values {
        match parse_timestamp(&value.time_instant) {
            Some(instant) => {
                by_instant.entry(instant).or_insert(value);
            }
            None => warn!(
                "MeteoSIX: dropping {name} value with unparseable time {:?}",
                value.time_instant
            ),
        }
    }
    Some((variable, by_instant))
}

/// Every instant any of the given variables reports for the day.
fn instants<'c, 'a: 'c>(columns: impl IntoIterator<Item = &'c Column<'a>>) -> Vec<Timestamp> {
    let mut all: Vec<Timestamp> = columns
        .into_iter()
        .flatten()
        .flat_map(|(_, values)| values.keys().copied())
        .collect();
    all.sort();
    all.dedup();
    all
}

fn scalar_at(column: &Column<'_>, at: &Timestamp) -> Option<f64> {
    let (_, values) = column.as_ref()?;
    meteosix_number(values.get(at)?)
}

fn meteosix_weather(forecast: &MeteoSixForecast) -> Vec<HourlyWeatherSample> {
    let mut samples = Vec::new();
    for day in forecast.days() {
        let temperature = indexed(day, "temperature");
        let wind = indexed(day, "wind");
        let precipitation = indexed(day, "precipitation_amount");
        let humidity = indexed(day, "relative_humidity");
        let clouds = indexed(day, "cloud_area_fraction");
        let pressure = indexed(day, "air_pressure_at_sea_level");

        let columns = [&temperature, &wind, &precipitation, &humidity, &clouds, &pressure];
        for at in instants(columns) {
            let (wind_speed, wind_direction) = match &wind {
                Some((variable, values)) => match values.get(&at) {
                    Some(value) => (
                        meteosix_present(value.module_value)
                            .map(|m| m * wind_factor(variable.module_units.as_deref())),
                        degrees(meteosix_present(value.direction_value)),
                    ),
                    None => (None, None),
                },
                None => (None, None),
            };
            samples.push(HourlyWeatherSample {
                timestamp: at,
                temperature: scalar_at(&temperature, &at),
                wind_speed,
                wind_direction,
                pressure: scalar_at(&pressure, &at),
                cloud_cover: percent(scalar_at(&clouds, &at)),
                relative_humidity: percent(scalar_at(&humidity, &at)),
                precipitation_mm: scalar_at(&precipitation, &at),
            });
        }
    }
    finalize(samples)
}

fn meteosix_marine(forecast: &MeteoSixForecast) -> Vec<HourlyMarineSample> {
    let mut samples = Vec::new();
    for day in forecast.days() {
        let height = indexed(day, "significative_wave_height");
        let direction = indexed(day, "mean_wave_direction");
        let period = indexed(day, "relative_peak_period");
        let sea_temperature = indexed(day, "sea_water_temperature");

        for at in instants([&height, &direction, &period, &sea_temperature]) {
            samples.push(HourlyMarineSample {
                timestamp: at,
                wave_height: scalar_at(&height, &at),
                wave_direction: degrees(scalar_at(&direction, &at)),
                wave_period: scalar_at(&period, &at),
                sea_temperature: scalar_at(&sea_temperature, &at),
            });
        }
    }
    finalize(samples)
}

fn tide_kind(label: &str) -> Option<TideKind> {
    let label = label.trim().to_ascii_lowercase();
    match label.as_str() {
        "h" | "hh" => return Some(TideKind::High),
        "l" | "ll" => return Some(TideKind::Low),
        _ => {}
    }
    if label.contains("high") || label.contains("pleamar") || label.contains("preamar") {
        Some(TideKind::High)
    } else if label.contains("low") || label.contains("bajamar") || label.contains("baixamar") {
        Some(TideKind::Low)
    } else {
        None
    }
}

fn worldtides_events(envelope: &WorldTidesExtremes) -> Vec<TideEvent> {
    let events = envelope
        .extremes
        .iter()
        .filter_map(|extreme| {
            let timestamp = DateTime::<Utc>::from_timestamp(extreme.dt, 0)?.fixed_offset();
            let kind = tide_kind(&extreme.kind)?;
            let height = finite(Some(extreme.height))?;
            Some(TideEvent {
                timestamp,
                kind,
                height,
            })
        })
        .collect();
    finalize(events)
}

fn noaa_events(predictions: &NoaaPredictions) -> Vec<TideEvent> {
    let events = predictions
        .predictions
        .iter()
        .filter_map(|prediction| {
            let Some(timestamp) = parse_local(&prediction.t, Utc.fix()) else {
                warn!("NOAA: dropping prediction with unparseable time {:?}", prediction.t);
                return None;
            };
            let kind = tide_kind(&prediction.kind)?;
            let height = finite(prediction.v.trim().parse::<f64>().ok())?;
            Some(TideEvent {
                timestamp,
                kind,
                height,
            })
        })
        .collect();
    finalize(events)
}

fn meteosix_events(tides: &MeteoSixTides) -> Vec<TideEvent> {
    let events = tides
        .days()
        .iter()
        .flat_map(|day| day.variables.iter().filter(|v| v.name == "tides"))
        .flat_map(|variable| variable.summary.iter())
        .filter_map(|entry| {
            let Some(timestamp) = parse_timestamp(&entry.time_instant) else {
                warn!("MeteoSIX: dropping tide with unparseable time {:?}", entry.time_instant);
                return None;
            };
            let kind = tide_kind(&entry.state)?;
            let height = meteosix_present(entry.height)?;
            Some(TideEvent {
                timestamp,
                kind,
                height,
            })
        })
        .collect();
    finalize(events)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meteosix::{MeteoSixFeature, MeteoSixProperties};
    use crate::open_meteo::OpenMeteoHourly;
    use serde_json::json;

    fn value(time: &str, v: serde_json::Value) -> MeteoSixValue {
        MeteoSixValue {
            time_instant: time.to_string(),
            value: Some(v),
            module_value: None,
            direction_value: None,
        }
    }

    fn variable(name: &str, values: Vec<MeteoSixValue>) -> MeteoSixVariable {
        MeteoSixVariable {
            name: name.to_string(),
            units: None,
            module_units: None,
            values,
        }
    }

    fn meteosix(variables: Vec<MeteoSixVariable>) -> MeteoSixForecast {
        MeteoSixForecast {
            features: vec![MeteoSixFeature {
                properties: MeteoSixProperties {
                    days: vec![MeteoSixDay { variables }],
                },
            }],
        }
    }

    #[test]
    fn repair_leaves_plain_dates_alone() {
        assert_eq!(repair_offset("2025-11-29"), "2025-11-29");
        assert_eq!(repair_offset("2025-11-29T13:00:00Z"), "2025-11-29T13:00:00Z");
    }

    #[test]
    fn truncated_and_full_offsets_parse_to_same_instant() {
        let short = parse_timestamp("2025-11-29T13:00:00+01").unwrap();
        let full = parse_timestamp("2025-11-29T13:00:00+01:00").unwrap();
        assert_eq!(short, full);
        assert_eq!(short.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn minute_precision_offsets_parse() {
        let ts = parse_timestamp("2025-11-29T05:12+0000").unwrap();
        assert_eq!(ts.to_rfc3339(), "2025-11-29T05:12:00+00:00");
    }

    #[test]
    fn open_meteo_times_take_the_envelope_offset() {
        let forecast = OpenMeteoForecast {
            utc_offset_seconds: 3600,
            hourly: OpenMeteoHourly {
                time: vec!["2025-11-29T13:00".to_string()],
                temperature_2m: vec![Some(12.0)],
                ..Default::default()
            },
        };
        let samples = weather(&RawWeather::OpenMeteo(forecast));
        assert_eq!(
            samples[0].timestamp,
            parse_timestamp("2025-11-29T12:00:00Z").unwrap()
        );
    }

    #[test]
    fn open_meteo_short_columns_leave_fields_absent() {
        let forecast = OpenMeteoForecast {
            utc_offset_seconds: 0,
            hourly: OpenMeteoHourly {
                time: vec!["2025-11-29T00:00".to_string(), "2025-11-29T01:00".to_string()],
                temperature_2m: vec![Some(0.0)],
                wind_direction_10m: vec![Some(360.0), Some(-90.0)],
                cloud_cover: vec![Some(104.0), None],
                ..Default::default()
            },
        };
        let samples = weather(&RawWeather::OpenMeteo(forecast));
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].temperature, Some(0.0));
        assert_eq!(samples[1].temperature, None);
        assert_eq!(samples[0].wind_direction, Some(0.0));
        assert_eq!(samples[1].wind_direction, Some(270.0));
        assert_eq!(samples[0].cloud_cover, Some(100.0));
        assert_eq!(samples[1].cloud_cover, None);
        assert_eq!(samples[0].pressure, None);
    }

    #[test]
    fn meteosix_weather_joins_variables_by_instant() {
        let forecast = meteosix(vec![
            variable(
                "temperature",
                vec![
                    value("2025-11-29T14:00:00+01", json!(13.0)),
                    value("2025-11-29T13:00:00+01", json!("12.5")),
                ],
            ),
            MeteoSixVariable {
                name: "wind".to_string(),
                units: None,
                module_units: Some("m s-1".to_string()),
                values: vec![MeteoSixValue {
                    time_instant: "2025-11-29T14:00:00+01".to_string(),
                    value: None,
                    module_value: Some(5.0),
                    direction_value: Some(270.0),
                }],
            },
            variable(
                "air_pressure_at_sea_level",
                vec![value("2025-11-29T15:00:00+01", json!(1018.0))],
            ),
        ]);
        let samples = weather(&RawWeather::MeteoSix(forecast));
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].temperature, Some(12.5));
        assert_eq!(samples[0].wind_speed, None);
        assert_eq!(samples[1].wind_speed, Some(18.0));
        assert_eq!(samples[1].wind_direction, Some(270.0));
        assert_eq!(samples[2].temperature, None);
        assert_eq!(samples[2].pressure, Some(1018.0));
    }

    #[test]
    fn meteosix_sentinel_and_garbage_values_are_absent() {
        let forecast = meteosix(vec![variable(
            "significative_wave_height",
            vec![
                value("2025-11-29T13:00:00+01", json!(-9999.0)),
                value("2025-11-29T14:00:00+01", json!("n/a")),
                value("2025-11-29T15:00:00+01", json!(0)),
            ],
        )]);
        let samples = marine(&RawMarine::MeteoSix(forecast));
        assert_eq!(samples.len(), 3);
        assert_eq!(samples[0].wave_height, None);
        assert_eq!(samples[1].wave_height, None);
        assert_eq!(samples[2].wave_height, Some(0.0));
    }

    #[test]
    fn tide_labels_are_recognized_or_skipped() {
        assert_eq!(tide_kind("H"), Some(TideKind::High));
        assert_eq!(tide_kind("LL"), Some(TideKind::Low));
        assert_eq!(tide_kind("High tide"), Some(TideKind::High));
        assert_eq!(tide_kind("Bajamar"), Some(TideKind::Low));
        assert_eq!(tide_kind("slack"), None);
    }
}
