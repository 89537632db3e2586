//! # Configuration Management
//!
//! Loads the explicit [`Config`] value that every core call receives: the
//! provider preference per data category, which categories may fall back to
//! simulated data, network limits, provider credentials, the NOAA station and
//! display units. Nothing in the library reads settings from global state.
//!
//! The file is `xirin-config.toml`. Credentials may also come from
//! `XIRIN_METEOSIX_API_KEY` / `XIRIN_WORLDTIDES_API_KEY`, which win over the
//! file.

use crate::error::ConfigError;
use crate::noaa;
use crate::provider::ProviderId;
use crate::units::Units;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_PATH: &str = "xirin-config.toml";
pub const METEOSIX_KEY_VAR: &str = "XIRIN_METEOSIX_API_KEY";
pub const WORLDTIDES_KEY_VAR: &str = "XIRIN_WORLDTIDES_API_KEY";

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub providers: ProviderConfig,
    pub fallback: FallbackConfig,
    pub network: NetworkConfig,
    pub credentials: Credentials,
    pub noaa: NoaaConfig,
    pub display: DisplayConfig,
}

/// User preference per data category.
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub weather: WeatherProvider,
    pub marine: MarineProvider,
    pub tide: TideProvider,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum WeatherProvider {
    #[default]
    OpenMeteo,
    #[serde(rename = "meteosix")]
    MeteoSix,
    Simulated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum MarineProvider {
    #[default]
    OpenMeteo,
    #[serde(rename = "meteosix")]
    MeteoSix,
    Simulated,
}

/// Tides alone may be switched off entirely.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum TideProvider {
    None,
    #[default]
    #[serde(rename = "worldtides")]
    WorldTides,
    Noaa,
    #[serde(rename = "meteosix")]
    MeteoSix,
    Simulated,
}

impl WeatherProvider {
    pub fn id(self) -> ProviderId {
        match self {
            WeatherProvider::OpenMeteo => ProviderId::OpenMeteo,
            WeatherProvider::MeteoSix => ProviderId::MeteoSix,
            WeatherProvider::Simulated => ProviderId::Simulated,
        }
    }
}

impl MarineProvider {
    pub fn id(self) -> ProviderId {
        match self {
            MarineProvider::OpenMeteo => ProviderId::OpenMeteo,
            MarineProvider::MeteoSix => ProviderId::MeteoSix,
            MarineProvider::Simulated => ProviderId::Simulated,
        }
    }
}

impl TideProvider {
    /// `None` when the user opted out of tide data.
    pub fn id(self) -> Option<ProviderId> {
        match self {
            TideProvider::None => None,
            TideProvider::WorldTides => Some(ProviderId::WorldTides),
            TideProvider::Noaa => Some(ProviderId::Noaa),
            TideProvider::MeteoSix => Some(ProviderId::MeteoSix),
            TideProvider::Simulated => Some(ProviderId::Simulated),
        }
    }
}

/// Whether each category may end on simulated data.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct FallbackConfig {
    pub simulated_weather: bool,
    pub simulated_marine: bool,
    pub simulated_tides: bool,
}

impl Default for FallbackConfig {
    fn default() -> Self {
        FallbackConfig {
            simulated_weather: true,
            simulated_marine: true,
            simulated_tides: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Per-request timeout
    pub timeout_secs: u64,
    /// Days requested when the caller does not say
    pub forecast_days: u32,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            timeout_secs: 10,
            forecast_days: 3,
        }
    }
}

/// Provider access keys. Blank means "not configured".
#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Credentials {
    pub meteosix_api_key: String,
    pub worldtides_api_key: String,
}

impl Credentials {
    pub fn meteosix(&self) -> Option<String> {
        non_blank(&self.meteosix_api_key)
    }

    pub fn worldtides(&self) -> Option<String> {
        non_blank(&self.worldtides_api_key)
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct NoaaConfig {
    /// CO-OPS station id (e.g. "8418150" for Portland, ME)
    pub station: String,
}

impl Default for NoaaConfig {
    fn default() -> Self {
        NoaaConfig {
            station: noaa::DEFAULT_STATION.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct DisplayConfig {
    pub units: Units,
}

/// One provider's readiness, for the startup log.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProviderStatus {
    pub provider: ProviderId,
    pub configured: bool,
    pub note: &'static str,
}

impl Config {
    /// Load from `xirin-config.toml` plus credential environment variables.
    /// Falls back to defaults if the file doesn't exist or is invalid.
    pub fn load() -> Self {
        Self::load_from_path(DEFAULT_PATH).with_env_credentials(|key| std::env::var(key).ok())
    }

    /// Load from `path` only. Falls back to defaults if the file doesn't exist
    /// or is invalid.
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref();
        match fs::read_to_string(path) {
            Ok(contents) => match toml::from_str::<Config>(&contents) {
                Ok(config) => {
                    info!(
                        "loaded {}: weather={:?} marine={:?} tide={:?}",
                        path.display(),
                        config.providers.weather,
                        config.providers.marine,
                        config.providers.tide
                    );
                    config
                }
                Err(e) => {
                    warn!("invalid config file {}: {e}; using defaults", path.display());
                    Self::default()
                }
            },
            Err(_) => {
                info!("no config file at {}, using defaults", path.display());
                Self::default()
            }
        }
    }

    /// Override credentials from `lookup` (normally the process environment).
    /// Blank values are ignored.
    pub fn with_env_credentials<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(key) = lookup(METEOSIX_KEY_VAR).as_deref().and_then(non_blank) {
            self.credentials.meteosix_api_key = key;
        }
        if let Some(key) = lookup(WORLDTIDES_KEY_VAR).as_deref().and_then(non_blank) {
            self.credentials.worldtides_api_key = key;
        }
        self
    }

    /// Write the configuration as pretty TOML.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path.as_ref(), contents)?;
        info!("configuration saved to {}", path.as_ref().display());
        Ok(())
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.network.timeout_secs.max(1))
    }

    /// Which providers can actually be used with this configuration.
    pub fn provider_status(&self) -> Vec<ProviderStatus> {
        let meteosix = self.credentials.meteosix().is_some();
        let worldtides = self.credentials.worldtides().is_some();
        let station = !self.noaa.station.trim().is_empty();
        vec![
            ProviderStatus {
                provider: ProviderId::OpenMeteo,
                configured: true,
                note: "no key required",
            },
            ProviderStatus {
                provider: ProviderId::MeteoSix,
                configured: meteosix,
                note: if meteosix { "API key set" } else { "API key missing" },
            },
            ProviderStatus {
                provider: ProviderId::WorldTides,
                configured: worldtides,
                note: if worldtides { "API key set" } else { "API key missing" },
            },
            ProviderStatus {
                provider: ProviderId::Noaa,
                configured: station,
                note: if station { "station set" } else { "station missing" },
            },
            ProviderStatus {
                provider: ProviderId::Simulated,
                configured: true,
                note: "always available",
            },
        ]
    }
}
