//! Sorted, duplicate-free single-field time series.

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::series::time::{julian_day, saturating_shift};

/// One observation plus its continuous time coordinate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub timestamp: NaiveDateTime,
    pub julian: f64,
    /// `NaN` marks a missing value.
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(timestamp: NaiveDateTime, value: f64) -> Self {
        Self {
            timestamp,
            julian: julian_day(timestamp),
            value,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.value.is_finite()
    }
}

/// A time series sorted ascending by timestamp with unique timestamps.
///
/// Duplicates are resolved by keeping the first occurrence in input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeIndexedSeries {
    points: Vec<SeriesPoint>,
}

impl TimeIndexedSeries {
    pub fn from_observations<I>(observations: I) -> Self
    where
        I: IntoIterator<Item = (NaiveDateTime, f64)>,
    {
        Self::from_points(
            observations
                .into_iter()
                .map(|(ts, value)| SeriesPoint::new(ts, value))
                .collect(),
        )
    }

    pub fn from_points(mut points: Vec<SeriesPoint>) -> Self {
        // Stable sort: among equal timestamps the first input row stays first.
        points.sort_by_key(|p| p.timestamp);
        let before = points.len();
        points.dedup_by_key(|p| p.timestamp);
        let dropped = before - points.len();
        if dropped > 0 {
            debug!("Dropped {dropped} duplicate timestamp(s) while normalizing series");
        }
        Self { points }
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[SeriesPoint] {
        &self.points
    }

    pub fn iter(&self) -> std::slice::Iter<'_, SeriesPoint> {
        self.points.iter()
    }

    pub fn first(&self) -> Option<&SeriesPoint> {
        self.points.first()
    }

    pub fn last(&self) -> Option<&SeriesPoint> {
        self.points.last()
    }

    /// Copy without missing (`NaN`/infinite) values.
    pub fn drop_missing(&self) -> Self {
        Self {
            points: self.points.iter().copied().filter(SeriesPoint::is_valid).collect(),
        }
    }

    /// Points with `start <= t < end`, or `start <= t <= end` when `include_end`.
    pub fn between(&self, start: NaiveDateTime, end: NaiveDateTime, include_end: bool) -> &[SeriesPoint] {
        let lo = self.points.partition_point(|p| p.timestamp < start);
        let hi = if include_end {
            self.points.partition_point(|p| p.timestamp <= end)
        } else {
            self.points.partition_point(|p| p.timestamp < end)
        };
        &self.points[lo..hi.max(lo)]
    }

    /// Points within `buffer` of `center`, bounds inclusive.
    ///
    /// The window is clamped to the representable time range.
    pub fn within(&self, center: NaiveDateTime, buffer: Duration) -> &[SeriesPoint] {
        self.between(saturating_shift(center, -buffer), saturating_shift(center, buffer), true)
    }

    /// The point whose timestamp is closest to `target`.
    ///
    /// Ties go to the earlier point.
    pub fn closest(&self, target: NaiveDateTime) -> Option<&SeriesPoint> {
        let idx = self.points.partition_point(|p| p.timestamp < target);
        let before = idx.checked_sub(1).and_then(|i| self.points.get(i));
        let after = self.points.get(idx);
        match (before, after) {
            (Some(b), Some(a)) => {
                if a.timestamp - target < target - b.timestamp {
                    Some(a)
                } else {
                    Some(b)
                }
            }
            (Some(b), None) => Some(b),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }
}
