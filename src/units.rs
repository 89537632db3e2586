//! Display unit conversions. All stored values stay metric; conversion
//! happens only when text is rendered.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Units {
    #[default]
    Metric,
    Imperial,
}

const FEET_PER_METRE: f64 = 3.280_84;
const MILES_PER_KM: f64 = 0.621_371;

impl Units {
    pub fn temperature(self, celsius: f64) -> f64 {
        match self {
            Units::Metric => celsius,
            Units::Imperial => celsius * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn speed(self, kmh: f64) -> f64 {
        match self {
            Units::Metric => kmh,
            Units::Imperial => kmh * MILES_PER_KM,
        }
    }

    /// Wave and tide heights.
    pub fn distance(self, metres: f64) -> f64 {
        match self {
            Units::Metric => metres,
            Units::Imperial => metres * FEET_PER_METRE,
        }
    }

    pub fn temperature_label(self) -> &'static str {
        match self {
            Units::Metric => "°C",
            Units::Imperial => "°F",
        }
    }

    pub fn speed_label(self) -> &'static str {
        match self {
            Units::Metric => "km/h",
            Units::Imperial => "mph",
        }
    }

    pub fn distance_label(self) -> &'static str {
        match self {
            Units::Metric => "m",
            Units::Imperial => "ft",
        }
    }

    /// Pressure is hPa in both systems.
    pub fn pressure_label(self) -> &'static str {
        "hPa"
    }
}
