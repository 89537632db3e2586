//! # Provider Contract
//!
//! Every upstream data source implements [`Source`] once per data category it
//! serves. A category ([`Weather`], [`Marine`], [`Tides`]) fixes the raw
//! response type a source returns and the normalized sample type it becomes.
//!
//! Each `fetch` is exactly one network round trip bounded by the transport
//! timeout. Sources never retry; retry and fallback belong to
//! [`crate::selection`].

use crate::normalize::{self, RawMarine, RawTides, RawWeather};
use crate::{
    CoverageRegion, DateRange, GeoPoint, HourlyMarineSample, HourlyWeatherSample, ProviderError,
    TideEvent, Timestamped,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an upstream data source, recorded as data provenance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProviderId {
    OpenMeteo,
    #[serde(rename = "meteosix")]
    MeteoSix,
    #[serde(rename = "worldtides")]
    WorldTides,
    Noaa,
    Simulated,
}

impl ProviderId {
    pub fn name(self) -> &'static str {
        match self {
            ProviderId::OpenMeteo => "Open-Meteo",
            ProviderId::MeteoSix => "MeteoSIX",
            ProviderId::WorldTides => "WorldTides",
            ProviderId::Noaa => "NOAA CO-OPS",
            ProviderId::Simulated => "Simulated",
        }
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// What to fetch: a point and the whole UTC days around it.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FetchRequest {
    pub point: GeoPoint,
    pub range: DateRange,
}

impl FetchRequest {
    pub fn new(point: GeoPoint, range: DateRange) -> Self {
        Self { point, range }
    }
}

/// A data category: binds a raw response union to its normalized sample type.
pub trait Category: Send + Sync + 'static {
    type Raw: Send;
    type Sample: Timestamped + Clone + Send;

    /// Short lowercase name used in log lines.
    const NAME: &'static str;

    /// Pure, total reshaping of a raw response into ascending samples.
    fn normalize(raw: &Self::Raw) -> Vec<Self::Sample>;
}

/// Hourly atmospheric forecast.
pub struct Weather;

/// Hourly sea-state forecast.
pub struct Marine;

/// Tide extrema.
pub struct Tides;

impl Category for Weather {
    type Raw = RawWeather;
    type Sample = HourlyWeatherSample;
    const NAME: &'static str = "weather";

    fn normalize(raw: &RawWeather) -> Vec<HourlyWeatherSample> {
        normalize::weather(raw)
    }
}

impl Category for Marine {
    type Raw = RawMarine;
    type Sample = HourlyMarineSample;
    const NAME: &'static str = "marine";

    fn normalize(raw: &RawMarine) -> Vec<HourlyMarineSample> {
        normalize::marine(raw)
    }
}

impl Category for Tides {
    type Raw = RawTides;
    type Sample = TideEvent;
    const NAME: &'static str = "tides";

    fn normalize(raw: &RawTides) -> Vec<TideEvent> {
        normalize::tides(raw)
    }
}

/// Uniform fetch contract for one provider and one data category.
#[async_trait]
pub trait Source<C: Category>: Send + Sync {
    fn id(&self) -> ProviderId;

    /// Service area for regional providers; `None` means global.
    fn coverage(&self) -> Option<CoverageRegion> {
        None
    }

    async fn fetch(&self, request: &FetchRequest) -> Result<C::Raw, ProviderError>;
}

/// Reject points outside `region` before any request is built.
///
/// Regional clients call this themselves even though the selection policy
/// already gates on coverage.
pub fn ensure_coverage(
    provider: ProviderId,
    region: Option<CoverageRegion>,
    point: GeoPoint,
) -> Result<(), ProviderError> {
    match region {
        Some(region) if !region.contains(point) => Err(ProviderError::coverage(
            provider,
            format!("{point} is outside {}", region.name),
        )),
        _ => Ok(()),
    }
}
