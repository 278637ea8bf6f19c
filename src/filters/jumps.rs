//! Jump and spike handling for transducer records.

use tracing::debug;

use crate::series::{SeriesPoint, TimeIndexedSeries};

/// Drop runs at either edge of a segment that are separated from the body by a jump.
///
/// A jump is a change larger than `jump_tol` between consecutive samples, and the
/// jump sample is the first one on the far side of it. A leading jump drops every
/// sample before the jump sample; a trailing jump drops the jump sample and every
/// sample after it. Either way only the run cut off by the jump is lost. In segments shorter than two windows, a jump counts as
/// leading when it falls in the first half and trailing otherwise.
pub fn trim_edge_jumps(points: &[SeriesPoint], jump_tol: f64, edge_window: usize) -> Vec<SeriesPoint> {
    let n = points.len();
    let mut start = 0usize;
    let mut end = n;

    for i in 1..n {
        let step = points[i].value - points[i - 1].value;
        if step.abs() <= jump_tol {
            continue;
        }
        let leading = i < edge_window && i <= n / 2;
        let trailing = i >= n.saturating_sub(edge_window) && i > n / 2;
        if leading {
            start = start.max(i);
            debug!("Dropped from beginning to {}", points[i].timestamp);
        } else if trailing {
            end = end.min(i);
            debug!("Dropped from end to {}", points[i].timestamp);
        }
    }

    if start >= end {
        return Vec::new();
    }
    points[start..end].to_vec()
}

/// Remove step discontinuities by shifting everything after each jump back by the jump size.
///
/// Missing values pass through untouched and do not break jump detection across them.
pub fn fix_jumps(series: &TimeIndexedSeries, threshold: f64) -> TimeIndexedSeries {
    let mut offset = 0.0;
    let mut prev: Option<f64> = None;
    let mut out = Vec::with_capacity(series.len());

    for p in series.iter() {
        if !p.is_valid() {
            out.push(*p);
            continue;
        }
        if let Some(prev) = prev {
            let step = p.value - prev;
            if step.abs() > threshold {
                offset += step;
                debug!("Removed jump of {step:.3} at {}", p.timestamp);
            }
        }
        prev = Some(p.value);
        out.push(SeriesPoint {
            value: p.value - offset,
            ..*p
        });
    }

    TimeIndexedSeries::from_points(out)
}

/// Drop isolated single-sample spikes.
///
/// A sample is a spike when it departs from both neighbours by more than
/// `threshold` in opposite directions.
pub fn remove_spikes(series: &TimeIndexedSeries, threshold: f64) -> TimeIndexedSeries {
    let points = series.points();
    let mut out = Vec::with_capacity(points.len());

    for (i, p) in points.iter().enumerate() {
        let is_spike = match (i.checked_sub(1).and_then(|j| points.get(j)), points.get(i + 1)) {
            (Some(before), Some(after)) => {
                let rise = p.value - before.value;
                let fall = after.value - p.value;
                rise.abs() > threshold && fall.abs() > threshold && rise.signum() != fall.signum()
            }
            _ => false,
        };
        if is_spike {
            debug!("Removed spike of {:.3} at {}", p.value, p.timestamp);
        } else {
            out.push(*p);
        }
    }

    TimeIndexedSeries::from_points(out)
}
