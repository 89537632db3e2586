//! # Tide State Interpolation
//!
//! Derives the instantaneous tide phase and height from a sequence of
//! extrema. Between a low and the following high the height follows a
//! quarter-sine ease, which gives the characteristic S-shaped tide curve
//! rather than a straight ramp.

use crate::{TideEvent, TideKind, TidePhase, TideReading, Timestamp};
use chrono::Duration;
use std::f64::consts::FRAC_PI_2;

/// Tide state at `at` from `events`, which need not be sorted.
///
/// Outside the covered span the nearest extremum is reported literally
/// (no extrapolation); an empty sequence yields [`TideReading::UNKNOWN`].
///
/// # Example
/// ```
/// use chrono::DateTime;
/// use xirin_marine_lib::{tide_state, TideEvent, TideKind, TidePhase};
///
/// let at = |s: &str| DateTime::parse_from_rfc3339(s).unwrap();
/// let events = vec![
///     TideEvent { timestamp: at("2025-11-29T10:00:00Z"), kind: TideKind::Low, height: 0.8 },
///     TideEvent { timestamp: at("2025-11-29T16:12:00Z"), kind: TideKind::High, height: 3.2 },
/// ];
/// let reading = tide_state::interpolate(&events, at("2025-11-29T13:06:00Z"));
/// assert_eq!(reading.phase, TidePhase::Rising);
/// assert!((reading.height.unwrap() - 2.497).abs() < 0.001);
/// ```
pub fn interpolate(events: &[TideEvent], at: Timestamp) -> TideReading {
    let mut sorted: Vec<&TideEvent> = events.iter().collect();
    sorted.sort_by_key(|event| event.timestamp);

    let split = sorted.partition_point(|event| event.timestamp <= at);
    let before = split.checked_sub(1).map(|i| sorted[i]);
    let after = sorted.get(split).copied();

    match (before, after) {
        (Some(before), Some(after)) => between(before, after, at),
        (Some(only), None) | (None, Some(only)) => TideReading {
            phase: only.kind.into(),
            height: Some(only.height),
        },
        (None, None) => TideReading::UNKNOWN,
    }
}

fn between(before: &TideEvent, after: &TideEvent, at: Timestamp) -> TideReading {
    let span = (after.timestamp - before.timestamp).num_milliseconds() as f64;
    let elapsed = (at - before.timestamp).num_milliseconds() as f64;
    let progress = if span > 0.0 {
        (elapsed / span).clamp(0.0, 1.0)
    } else {
        0.0
    };

    let (low, high) = match (before.kind, after.kind) {
        (TideKind::Low, TideKind::High) => (before.height, after.height),
        (TideKind::High, TideKind::Low) => (after.height, before.height),
        _ => return TideReading::UNKNOWN,
    };

    if before.kind == TideKind::Low {
        TideReading {
            phase: TidePhase::Rising,
            height: Some(low + (high - low) * (progress * FRAC_PI_2).sin()),
        }
    } else {
        // sin(π/2 + x) falls from 1 to 0 over the half-cycle, so 1 - that rises
        // from 0; measured from the high, the height drops by that fraction.
        let drop = 1.0 - (FRAC_PI_2 + progress * FRAC_PI_2).sin();
        TideReading {
            phase: TidePhase::Falling,
            height: Some(high - (high - low) * drop),
        }
    }
}

/// `steps + 1` evenly spaced readings from `start` to `end` inclusive.
pub fn sample_curve(
    events: &[TideEvent],
    start: Timestamp,
    end: Timestamp,
    steps: u32,
) -> Vec<(Timestamp, TideReading)> {
    let steps = steps.max(1);
    let span = (end - start).num_milliseconds();
    (0..=steps)
        .map(|i| {
            let at = start + Duration::milliseconds(span * i64::from(i) / i64::from(steps));
            (at, interpolate(events, at))
        })
        .collect()
}

/// First extremum strictly after `at`.
pub fn next_event(events: &[TideEvent], at: Timestamp) -> Option<&TideEvent> {
    events
        .iter()
        .filter(|event| event.timestamp > at)
        .min_by_key(|event| event.timestamp)
}

/// Last extremum at or before `at`.
pub fn previous_event(events: &[TideEvent], at: Timestamp) -> Option<&TideEvent> {
    events
        .iter()
        .filter(|event| event.timestamp <= at)
        .max_by_key(|event| event.timestamp)
}
