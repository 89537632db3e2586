//! # Conditions Report
//!
//! Plain-text rendering of [`DayConditions`] for the terminal: point-in-time
//! conditions, the day's tide extremes, an ASCII tide curve centred on the
//! query instant and the provenance of each category. Simulated data is
//! always flagged.

use crate::conditions::{DayConditions, Provenance, WeatherConditions};
use crate::selection::NoDataReason;
use crate::units::Units;
use crate::{tide_state, TideKind, TidePhase, Timestamp};
use chrono::Duration;
use std::fmt;

const CURVE_ROWS: usize = 14;
const CURVE_STEPS: u32 = 48;
const CURVE_HALF_WINDOW_HOURS: i64 = 12;
const Y_AXIS_WIDTH: usize = 7;

/// Displayable report; use [`render`] for a `String`.
pub struct Report<'a> {
    pub day: &'a DayConditions,
    pub at: Timestamp,
    pub units: Units,
}

pub fn render(day: &DayConditions, at: Timestamp, units: Units) -> String {
    Report { day, at, units }.to_string()
}

fn value(v: Option<f64>, decimals: usize, label: &str) -> String {
    match v {
        Some(v) => format!("{v:.decimals$} {label}"),
        None => "n/a".to_string(),
    }
}

fn phase_name(phase: TidePhase) -> &'static str {
    match phase {
        TidePhase::Rising => "rising",
        TidePhase::Falling => "falling",
        TidePhase::High => "high",
        TidePhase::Low => "low",
        TidePhase::Unknown => "unknown",
    }
}

fn provenance_line(name: &str, provenance: &Provenance) -> String {
    let source = match (provenance.source, provenance.no_data) {
        (Some(source), _) if provenance.simulated => format!("{source} (SIMULATED)"),
        (Some(source), _) => source.to_string(),
        (None, Some(NoDataReason::NoProviderSelected)) => "none selected".to_string(),
        (None, Some(NoDataReason::SimulatedFailed)) => {
            "no data (simulated source failed)".to_string()
        }
        (None, _) => "no data".to_string(),
    };
    if provenance.failures.is_empty() {
        format!("{name:<8} {source}")
    } else {
        format!("{name:<8} {source} after: {}", provenance.failures.join("; "))
    }
}

impl Report<'_> {
    fn conditions(&self, f: &mut fmt::Formatter<'_>, now: &WeatherConditions) -> fmt::Result {
        let u = self.units;
        writeln!(f, "Conditions at {}", now.at.format("%Y-%m-%d %H:%M %:z"))?;
        match &now.weather {
            Some(w) => {
                writeln!(
                    f,
                    "  Air      {}  wind {} from {}  {}",
                    value(w.temperature.map(|t| u.temperature(t)), 1, u.temperature_label()),
                    value(w.wind_speed.map(|s| u.speed(s)), 0, u.speed_label()),
                    value(w.wind_direction, 0, "°"),
                    value(w.pressure, 0, u.pressure_label()),
                )?;
                writeln!(
                    f,
                    "           cloud {}  humidity {}  rain {}",
                    value(w.cloud_cover, 0, "%"),
                    value(w.relative_humidity, 0, "%"),
                    value(w.precipitation_mm, 1, "mm"),
                )?;
            }
            None => writeln!(f, "  Air      no weather sample near this time")?,
        }
        match &now.marine {
            Some(m) => writeln!(
                f,
                "  Sea      waves {} from {} every {}  water {}",
                value(m.wave_height.map(|h| u.distance(h)), 1, u.distance_label()),
                value(m.wave_direction, 0, "°"),
                value(m.wave_period, 0, "s"),
                value(m.sea_temperature.map(|t| u.temperature(t)), 1, u.temperature_label()),
            )?,
            None => writeln!(f, "  Sea      no marine sample near this time")?,
        }
        write!(
            f,
            "  Tide     {} {}",
            phase_name(now.tide.phase),
            value(now.tide.height.map(|h| u.distance(h)), 2, u.distance_label())
        )?;
        if let Some(next) = &now.next_tide {
            let kind = match next.kind {
                TideKind::High => "high",
                TideKind::Low => "low",
            };
            write!(f, ", next {kind} at {}", next.timestamp.format("%H:%M"))?;
        }
        writeln!(f)
    }

    fn tide_table(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let events = self.day.tide_events();
        if events.is_empty() {
            return Ok(());
        }
        writeln!(f, "\nTide extremes")?;
        for event in events {
            let kind = match event.kind {
                TideKind::High => "High",
                TideKind::Low => "Low ",
            };
            writeln!(
                f,
                "  {}  {kind}  {:>6.2} {}",
                event.timestamp.format("%a %d %H:%M"),
                self.units.distance(event.height),
                self.units.distance_label()
            )?;
        }
        Ok(())
    }

    /// Tide curve over ±12 h with the query instant marked `X` in the centre.
    fn tide_curve(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let events = self.day.tide_events();
        let window = Duration::hours(CURVE_HALF_WINDOW_HOURS);
        let curve = tide_state::sample_curve(events, self.at - window, self.at + window, CURVE_STEPS);
        let heights: Vec<Option<f64>> = curve
            .iter()
            .map(|(_, reading)| reading.height.map(|h| self.units.distance(h)))
            .collect();

        let (min, max) = heights
            .iter()
            .flatten()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), h| (lo.min(*h), hi.max(*h)));
        if !min.is_finite() || !max.is_finite() {
            return Ok(());
        }
        let span = (max - min).max(0.1);
        let to_row = |h: f64| (((max - h) / span) * (CURVE_ROWS as f64 - 1.0)).round() as usize;

        let columns = heights.len();
        let mut grid = vec![vec![' '; columns + Y_AXIS_WIDTH]; CURVE_ROWS];
        for (row, line) in grid.iter_mut().enumerate() {
            line[Y_AXIS_WIDTH - 1] = '│';
            if row == 0 || row == CURVE_ROWS - 1 || row == CURVE_ROWS / 2 {
                let h = max - span * row as f64 / (CURVE_ROWS as f64 - 1.0);
                let label = format!("{h:>5.1}");
                for (i, ch) in label.chars().take(Y_AXIS_WIDTH - 2).enumerate() {
                    line[i] = ch;
                }
            }
        }

        let centre = columns / 2;
        for (column, height) in heights.iter().enumerate() {
            if let Some(h) = height {
                let row = to_row(*h).min(CURVE_ROWS - 1);
                grid[row][column + Y_AXIS_WIDTH] = if column == centre { 'X' } else { '•' };
            }
        }

        writeln!(f, "\nTide ({})", self.units.distance_label())?;
        for line in grid {
            writeln!(f, "{}", line.into_iter().collect::<String>())?;
        }
        let padding = " ".repeat(Y_AXIS_WIDTH);
        let markers: String = (0..columns)
            .map(|i| if i % 8 == 0 { '|' } else { ' ' })
            .collect();
        writeln!(f, "{padding}{markers}")?;
        let left = format!("-{CURVE_HALF_WINDOW_HOURS}h");
        let right = format!("+{CURVE_HALF_WINDOW_HOURS}h");
        let left_width = centre.saturating_sub(1);
        let right_width = columns.saturating_sub(left_width + 3);
        writeln!(f, "{padding}{left:<left_width$}Now{right:>right_width$}")
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let provenance = self.day.provenance();
        if provenance.any_simulated() {
            writeln!(f, "⚠ SIMULATED DATA: placeholder values, not observations\n")?;
        }
        writeln!(
            f,
            "Xirin Marine  {}  {} to {}\n",
            self.day.point,
            self.day.range.start(),
            self.day.range.end()
        )?;

        self.conditions(f, &self.day.conditions_at(self.at))?;
        self.tide_table(f)?;
        self.tide_curve(f)?;

        writeln!(f, "\nSources")?;
        writeln!(f, "  {}", provenance_line("weather", &provenance.weather))?;
        writeln!(f, "  {}", provenance_line("marine", &provenance.marine))?;
        write!(f, "  {}", provenance_line("tides", &provenance.tides))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fallback;
    use crate::provider::ProviderId;
    use crate::selection::{Resolution, Tier};
    use crate::{DateRange, GeoPoint};
    use chrono::{DateTime, NaiveDate};

    fn day(tides: Resolution<Vec<crate::TideEvent>>) -> DayConditions {
        let point = GeoPoint::new(42.24, -8.72).unwrap();
        let range = DateRange::single(NaiveDate::from_ymd_opt(2025, 11, 29).unwrap());
        DayConditions {
            point,
            range,
            weather: Resolution::Data {
                value: fallback::simulated_weather(point, range),
                source: ProviderId::OpenMeteo,
                tier: Tier::Preferred,
                attempts: Vec::new(),
            },
            marine: Resolution::Data {
                value: fallback::simulated_marine(point, range),
                source: ProviderId::OpenMeteo,
                tier: Tier::Preferred,
                attempts: Vec::new(),
            },
            tides,
        }
    }

    fn noon() -> Timestamp {
        DateTime::parse_from_rfc3339("2025-11-29T12:00:00Z").unwrap()
    }

    #[test]
    fn simulated_tides_are_flagged() {
        let point = GeoPoint::new(42.24, -8.72).unwrap();
        let range = DateRange::single(NaiveDate::from_ymd_opt(2025, 11, 29).unwrap());
        let report = render(
            &day(Resolution::Data {
                value: fallback::simulated_tides(point, range),
                source: ProviderId::Simulated,
                tier: Tier::Simulated,
                attempts: Vec::new(),
            }),
            noon(),
            Units::Metric,
        );
        assert!(report.starts_with("⚠ SIMULATED DATA"));
        assert!(report.contains("Simulated (SIMULATED)"));
        assert!(report.contains("Now"), "curve is drawn around the query instant");
        assert!(report.contains("Tide extremes"));
    }

    #[test]
    fn real_data_has_no_banner_and_skips_missing_tides() {
        let report = render(
            &day(Resolution::NoData {
                reason: NoDataReason::NoProviderSelected,
                attempts: Vec::new(),
            }),
            noon(),
            Units::Imperial,
        );
        assert!(!report.contains("SIMULATED"));
        assert!(!report.contains("Tide extremes"));
        assert!(report.contains("none selected"));
        assert!(report.contains("°F"));
    }

    #[test]
    fn failed_simulated_tier_is_named() {
        let report = render(
            &day(Resolution::NoData {
                reason: NoDataReason::SimulatedFailed,
                attempts: Vec::new(),
            }),
            noon(),
            Units::Metric,
        );
        assert!(report.contains("tides    no data (simulated source failed)"));
    }
}
