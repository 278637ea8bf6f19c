//! Breakpoint placement.
//!
//! Breakpoints split the sensor record into calibration segments so that each
//! segment has at most one manual anchor at its start and one at its end:
//!
//! 1. drop missing values from both streams
//! 2. keep manual readings within `[sensor.first - buffer, sensor.last + buffer]`
//! 3. seed with the first sensor timestamp if it precedes the first manual reading
//! 4. every manual reading with a sensor sample within `± buffer` is a candidate
//! 5. candidates within `buffer` of the previously accepted one are suppressed
//!    (sorted by time, first-seen wins)
//! 6. close with the last sensor timestamp if it follows the last manual reading

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::domain::{Stream, days_to_duration, validate_day_buffer};
use crate::error::DriftError;
use crate::series::{TimeIndexedSeries, days_between, saturating_shift};

/// A manual reading considered as a segment boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BreakpointCandidate {
    pub manual: NaiveDateTime,
    /// Sensor sample closest to the manual reading.
    pub closest_sensor: NaiveDateTime,
    /// `manual - closest_sensor` in days.
    pub delta_days: f64,
}

/// Sorted, unique segment boundaries plus placement diagnostics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Breakpoints {
    pub points: Vec<NaiveDateTime>,
    pub accepted: Vec<BreakpointCandidate>,
    /// Candidates dropped for lying within the buffer of an accepted one.
    pub suppressed: Vec<BreakpointCandidate>,
    /// Manual readings inside the sensor window (before candidate filtering).
    pub manual_in_window: usize,
}

impl Breakpoints {
    pub fn segment_count(&self) -> usize {
        self.points.len().saturating_sub(1)
    }

    /// Bounds of segment `i`.
    pub fn bounds(&self, i: usize) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((*self.points.get(i)?, *self.points.get(i + 1)?))
    }

    pub fn is_last_segment(&self, i: usize) -> bool {
        i + 1 == self.segment_count()
    }

    pub fn date_range(&self) -> Option<(NaiveDateTime, NaiveDateTime)> {
        Some((*self.points.first()?, *self.points.last()?))
    }

    pub fn mean_segment_days(&self) -> f64 {
        match self.date_range() {
            Some((start, end)) if self.segment_count() > 0 => {
                days_between(start, end) / self.segment_count() as f64
            }
            _ => 0.0,
        }
    }
}

/// Compute segment boundaries for a sensor series and its manual reference.
pub fn calculate_breakpoints(
    sensor: &TimeIndexedSeries,
    manual: &TimeIndexedSeries,
    day_buffer: f64,
) -> Result<Breakpoints, DriftError> {
    validate_day_buffer(day_buffer)?;
    let buffer = days_to_duration(day_buffer);

    // 1) Drop missing values.
    let sensor = sensor.drop_missing();
    let manual = manual.drop_missing();
    let (Some(sensor_first), Some(sensor_last)) = (sensor.first(), sensor.last()) else {
        return Err(DriftError::EmptyInput { stream: Stream::Sensor });
    };
    let (Some(manual_first), Some(manual_last)) = (manual.first(), manual.last()) else {
        return Err(DriftError::EmptyInput { stream: Stream::Manual });
    };

    // 2) Restrict manual readings to the sensor window.
    let in_window = manual.between(
        saturating_shift(sensor_first.timestamp, -buffer),
        saturating_shift(sensor_last.timestamp, buffer),
        true,
    );
    let (Some(window_first), Some(window_last)) = (in_window.first(), in_window.last()) else {
        return Err(DriftError::NoOverlap {
            sensor_start: sensor_first.timestamp,
            sensor_end: sensor_last.timestamp,
            manual_start: manual_first.timestamp,
            manual_end: manual_last.timestamp,
            buffer_days: day_buffer,
        });
    };

    let mut points = Vec::new();

    // 3) Seed with the sensor start.
    if sensor_first.timestamp < window_first.timestamp {
        points.push(sensor_first.timestamp);
    }

    // 4) + 5) Candidates with nearby sensor coverage, thinned by the buffer.
    let (accepted, suppressed) = select_candidates(&sensor, in_window.iter().map(|m| m.timestamp), buffer);
    points.extend(accepted.iter().map(|c| c.manual));

    // 6) Close with the sensor end.
    if sensor_last.timestamp > window_last.timestamp {
        points.push(sensor_last.timestamp);
    }

    points.sort();
    points.dedup();

    if points.len() < 2 {
        return Err(DriftError::InsufficientBreakpoints { found: points.len() });
    }

    let breakpoints = Breakpoints {
        points,
        accepted,
        suppressed,
        manual_in_window: in_window.len(),
    };
    info!(
        "Placed {} breakpoints ({} segments, mean {:.1} days)",
        breakpoints.points.len(),
        breakpoints.segment_count(),
        breakpoints.mean_segment_days()
    );
    Ok(breakpoints)
}

fn select_candidates(
    sensor: &TimeIndexedSeries,
    manual_times: impl Iterator<Item = NaiveDateTime>,
    buffer: Duration,
) -> (Vec<BreakpointCandidate>, Vec<BreakpointCandidate>) {
    let mut accepted: Vec<BreakpointCandidate> = Vec::new();
    let mut suppressed = Vec::new();

    for manual in manual_times {
        if sensor.within(manual, buffer).is_empty() {
            debug!("No sensor reading within buffer of manual measurement at {manual}");
            continue;
        }
        let Some(closest) = sensor.closest(manual) else {
            continue;
        };
        let candidate = BreakpointCandidate {
            manual,
            closest_sensor: closest.timestamp,
            delta_days: days_between(closest.timestamp, manual),
        };

        match accepted.last() {
            Some(prev) if manual - prev.manual <= buffer => {
                debug!(
                    "Suppressed breakpoint at {manual}: within buffer of {}",
                    prev.manual
                );
                suppressed.push(candidate);
            }
            _ => accepted.push(candidate),
        }
    }

    (accepted, suppressed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn date(m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn daily_sensor(start: NaiveDateTime, days: i64) -> TimeIndexedSeries {
        TimeIndexedSeries::from_observations((0..days).map(|i| (start + Duration::days(i), 10.0 + i as f64 * 0.01)))
    }

    fn manual(readings: &[(NaiveDateTime, f64)]) -> TimeIndexedSeries {
        TimeIndexedSeries::from_observations(readings.iter().copied())
    }

    #[test]
    fn brackets_each_manual_visit() {
        let sensor = daily_sensor(date(1, 1), 90);
        let manual = manual(&[(date(1, 31), 10.0), (date(2, 28), 11.0), (date(3, 31), 12.0)]);
        let bp = calculate_breakpoints(&sensor, &manual, 3.0).unwrap();
        assert_eq!(bp.points, vec![date(1, 1), date(1, 31), date(2, 28), date(3, 31)]);
        assert_eq!(bp.segment_count(), 3);
        assert!(bp.points.windows(2).all(|w| w[0] < w[1]));
        assert!((bp.mean_segment_days() - 89.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn appends_sensor_end_after_last_visit() {
        let sensor = daily_sensor(date(1, 1), 60);
        let manual = manual(&[(date(1, 1), 10.0), (date(1, 20), 10.2)]);
        let bp = calculate_breakpoints(&sensor, &manual, 3.0).unwrap();
        assert_eq!(bp.points, vec![date(1, 1), date(1, 20), date(3, 1)]);
    }

    #[test]
    fn close_visits_keep_first_seen() {
        let sensor = daily_sensor(date(1, 1), 60);
        let manual = manual(&[(date(1, 20), 10.0), (date(1, 22), 10.1), (date(2, 10), 10.3)]);
        let bp = calculate_breakpoints(&sensor, &manual, 3.0).unwrap();
        assert_eq!(bp.points, vec![date(1, 1), date(1, 20), date(2, 10), date(3, 1)]);
        assert_eq!(bp.suppressed.len(), 1);
        assert_eq!(bp.suppressed[0].manual, date(1, 22));
    }

    #[test]
    fn visits_inside_sensor_gaps_are_not_breakpoints() {
        let mut obs: Vec<(NaiveDateTime, f64)> = (0..10).map(|i| (date(1, 1) + Duration::days(i), 1.0)).collect();
        obs.extend((0..10).map(|i| (date(2, 1) + Duration::days(i), 1.0)));
        let sensor = TimeIndexedSeries::from_observations(obs);
        let manual = manual(&[(date(1, 20), 1.0), (date(2, 5), 1.0)]);
        let bp = calculate_breakpoints(&sensor, &manual, 3.0).unwrap();
        assert_eq!(bp.points, vec![date(1, 1), date(2, 5), date(2, 10)]);
        assert_eq!(bp.manual_in_window, 2);
    }

    #[test]
    fn manual_after_sensor_is_no_overlap() {
        let sensor = daily_sensor(date(1, 1), 30);
        let manual = manual(&[(date(3, 1), 10.0)]);
        let err = calculate_breakpoints(&sensor, &manual, 3.0).unwrap_err();
        assert!(matches!(err, DriftError::NoOverlap { .. }));
    }

    #[test]
    fn missing_values_count_as_empty() {
        let sensor = TimeIndexedSeries::from_observations([(date(1, 1), f64::NAN)]);
        let manual = manual(&[(date(1, 1), 10.0)]);
        assert_eq!(
            calculate_breakpoints(&sensor, &manual, 3.0).unwrap_err(),
            DriftError::EmptyInput { stream: Stream::Sensor }
        );
        let sensor = daily_sensor(date(1, 1), 5);
        assert_eq!(
            calculate_breakpoints(&sensor, &TimeIndexedSeries::default(), 3.0).unwrap_err(),
            DriftError::EmptyInput { stream: Stream::Manual }
        );
    }

    #[test]
    fn oversized_buffer_is_invalid_config() {
        let sensor = daily_sensor(date(1, 1), 30);
        let manual = manual(&[(date(1, 15), 10.0)]);
        assert!(matches!(
            calculate_breakpoints(&sensor, &manual, 1e8),
            Err(DriftError::InvalidConfig(_))
        ));
        assert!(matches!(
            calculate_breakpoints(&sensor, &manual, f64::INFINITY),
            Err(DriftError::InvalidConfig(_))
        ));
    }

    #[test]
    fn widest_buffer_keeps_every_visit_in_window() {
        let sensor = daily_sensor(date(1, 1), 30);
        let manual = manual(&[(date(1, 15), 10.0)]);
        let bp = calculate_breakpoints(&sensor, &manual, crate::domain::MAX_DAY_BUFFER).unwrap();
        assert_eq!(bp.manual_in_window, 1);
        assert_eq!(bp.points, vec![date(1, 1), date(1, 15), date(1, 30)]);
    }

    #[test]
    fn single_coincident_sample_is_insufficient() {
        let sensor = daily_sensor(date(1, 1), 1);
        let manual = manual(&[(date(1, 1), 10.0)]);
        assert_eq!(
            calculate_breakpoints(&sensor, &manual, 3.0).unwrap_err(),
            DriftError::InsufficientBreakpoints { found: 1 }
        );
    }
}
