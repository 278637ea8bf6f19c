//! Regularize a series onto a fixed sampling grid.

use chrono::{DateTime, Duration, NaiveDateTime};

use crate::series::{SeriesPoint, TimeIndexedSeries};

/// Largest gap between raw samples that hourly resampling will interpolate across.
pub const HOURLY_MAX_GAP_MINUTES: i64 = 90;

/// Resample onto grid marks every `interval_minutes`, aligned to the Unix epoch.
///
/// Each grid mark takes the raw value at that instant, or a time-linear
/// interpolation between the bracketing valid samples when they are at most
/// `max_gap` apart. Marks inside longer gaps are omitted rather than invented.
pub fn resample(series: &TimeIndexedSeries, interval_minutes: u32, max_gap: Duration) -> TimeIndexedSeries {
    let valid = series.drop_missing();
    let points = valid.points();
    let (Some(first), Some(last)) = (points.first(), points.last()) else {
        return TimeIndexedSeries::default();
    };
    if interval_minutes == 0 {
        return valid;
    }

    let step = i64::from(interval_minutes) * 60;
    let first_secs = first.timestamp.and_utc().timestamp();
    let last_secs = last.timestamp.and_utc().timestamp();
    let mut mark = first_secs.div_euclid(step) * step;
    if mark < first_secs {
        mark += step;
    }

    let mut out = Vec::new();
    while mark <= last_secs {
        if let Some(ts) = from_unix_seconds(mark) {
            if let Some(value) = value_at(points, ts, max_gap) {
                out.push(SeriesPoint::new(ts, value));
            }
        }
        mark += step;
    }

    TimeIndexedSeries::from_points(out)
}

/// Hourly resampling with the default interpolation gap limit.
pub fn resample_hourly(series: &TimeIndexedSeries) -> TimeIndexedSeries {
    resample(series, 60, Duration::minutes(HOURLY_MAX_GAP_MINUTES))
}

fn from_unix_seconds(secs: i64) -> Option<NaiveDateTime> {
    DateTime::from_timestamp(secs, 0).map(|dt| dt.naive_utc())
}

fn value_at(points: &[SeriesPoint], ts: NaiveDateTime, max_gap: Duration) -> Option<f64> {
    let idx = points.partition_point(|p| p.timestamp < ts);
    let after = points.get(idx)?;
    if after.timestamp == ts {
        return Some(after.value);
    }
    let before = points.get(idx.checked_sub(1)?)?;
    if after.timestamp - before.timestamp > max_gap {
        return None;
    }
    let span = after.julian - before.julian;
    let w = (crate::series::julian_day(ts) - before.julian) / span;
    Some(before.value + w * (after.value - before.value))
}
