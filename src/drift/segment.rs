//! Per-segment drift correction.
//!
//! Each segment flows through pure stages, so ordering is enforced by the types:
//!
//! ```text
//! extract_segment -> trim_segment -> locate_anchors -> fit_drift_model -> apply_correction
//!   SegmentSlice      SegmentSlice     AnchoredSegment   FittedSegment      Vec<CorrectedSample>
//! ```
//!
//! Drift model per anchor availability (offsets are sensor minus manual):
//!
//! | start | end | slope | intercept |
//! |---|---|---|---|
//! | present | present | `slope_trans - slope_man` | start offset |
//! | missing | present | `end offset / sensor span` | 0 |
//! | present | missing | `-start offset / sensor span` | start offset |
//! | missing | missing | 0 | 0 (pass-through) |

use chrono::{Duration, NaiveDateTime};
use tracing::{debug, warn};

use crate::domain::{
    Anchor, CorrectedSample, DriftConfig, DriftFeatures, DriftModel, ManualAnchor, SegmentStatus,
};
use crate::drift::breakpoints::Breakpoints;
use crate::error::DriftError;
use crate::filters::trim_edge_jumps;
use crate::series::{SeriesPoint, TimeIndexedSeries, days_between};

/// Valid sensor samples of one segment (never empty).
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentSlice {
    pub index: usize,
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
    samples: Vec<SeriesPoint>,
    first: SeriesPoint,
    last: SeriesPoint,
}

impl SegmentSlice {
    pub fn new(index: usize, start: NaiveDateTime, end: NaiveDateTime, samples: Vec<SeriesPoint>) -> Option<Self> {
        let first = *samples.first()?;
        let last = *samples.last()?;
        Some(Self {
            index,
            start,
            end,
            samples,
            first,
            last,
        })
    }

    pub fn samples(&self) -> &[SeriesPoint] {
        &self.samples
    }

    pub fn first(&self) -> &SeriesPoint {
        &self.first
    }

    pub fn last(&self) -> &SeriesPoint {
        &self.last
    }

    /// Days between the first and last sensor sample.
    pub fn span_days(&self) -> f64 {
        self.last.julian - self.first.julian
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnchoredSegment {
    pub slice: SegmentSlice,
    pub begin: Anchor,
    pub end: Anchor,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FittedSegment {
    pub anchored: AnchoredSegment,
    pub model: DriftModel,
    pub status: SegmentStatus,
}

/// Result of running one segment through every stage.
#[derive(Debug, Clone, PartialEq)]
pub enum SegmentOutcome {
    /// No valid sensor samples between the breakpoints.
    Empty { index: usize },
    Degenerate {
        features: DriftFeatures,
        error: DriftError,
    },
    Corrected {
        features: DriftFeatures,
        samples: Vec<CorrectedSample>,
    },
}

impl SegmentOutcome {
    pub fn index(&self) -> usize {
        match self {
            SegmentOutcome::Empty { index } => *index,
            SegmentOutcome::Degenerate { features, .. } | SegmentOutcome::Corrected { features, .. } => {
                features.segment
            }
        }
    }
}

/// Run segment `index` through the full correction chain.
///
/// `sensor` and `manual` must already be free of missing values.
pub fn correct_segment(
    index: usize,
    breakpoints: &Breakpoints,
    sensor: &TimeIndexedSeries,
    manual: &TimeIndexedSeries,
    config: &DriftConfig,
) -> SegmentOutcome {
    let Some(slice) = extract_segment(index, breakpoints, sensor) else {
        debug!("Segment {index} has no sensor data; skipping");
        return SegmentOutcome::Empty { index };
    };
    let Some(slice) = trim_segment(slice, config) else {
        debug!("Segment {index} is empty after edge trimming; skipping");
        return SegmentOutcome::Empty { index };
    };

    let anchored = locate_anchors(slice, manual, config.buffer(), config.day_buffer);
    match fit_drift_model(anchored.clone()) {
        Ok(fitted) => SegmentOutcome::Corrected {
            features: drift_features(&fitted),
            samples: apply_correction(&fitted),
        },
        Err(error) => {
            warn!("Skipping segment: {error}");
            SegmentOutcome::Degenerate {
                features: degenerate_features(&anchored),
                error,
            }
        }
    }
}

/// Sensor samples with `breakpoint[i] <= t < breakpoint[i + 1]`.
///
/// The final segment also includes its upper breakpoint so the last sensor
/// sample is corrected rather than dropped.
pub fn extract_segment(index: usize, breakpoints: &Breakpoints, sensor: &TimeIndexedSeries) -> Option<SegmentSlice> {
    let (start, end) = breakpoints.bounds(index)?;
    let include_end = breakpoints.is_last_segment(index);
    let samples: Vec<SeriesPoint> = sensor
        .between(start, end, include_end)
        .iter()
        .copied()
        .filter(SeriesPoint::is_valid)
        .collect();
    SegmentSlice::new(index, start, end, samples)
}

/// Apply the optional edge-jump trim.
pub fn trim_segment(slice: SegmentSlice, config: &DriftConfig) -> Option<SegmentSlice> {
    if !config.trim_end {
        return Some(slice);
    }
    let trimmed = trim_edge_jumps(slice.samples(), config.jump_tol, config.trim_window);
    SegmentSlice::new(slice.index, slice.start, slice.end, trimmed)
}

/// Find the manual reading nearest each breakpoint and judge it against the sensor boundary.
///
/// One reading never anchors both ends of a segment. When the same reading is
/// in tolerance of both boundaries it anchors the nearer one (the start on a
/// tie) and the other end falls back to its sensor value.
pub fn locate_anchors(
    slice: SegmentSlice,
    manual: &TimeIndexedSeries,
    buffer: Duration,
    day_buffer: f64,
) -> AnchoredSegment {
    let mut begin = anchor_for(manual, slice.start, slice.first().timestamp, buffer);
    let mut end = anchor_for(manual, slice.end, slice.last().timestamp, buffer);

    let shared = match (begin, end) {
        (Anchor::Present(b), Anchor::Present(e)) if b.timestamp == e.timestamp => Some(b.timestamp),
        _ => None,
    };
    if let Some(nearest) = shared {
        let begin_gap = (nearest - slice.first().timestamp).abs();
        let end_gap = (nearest - slice.last().timestamp).abs();
        if end_gap < begin_gap {
            begin = Anchor::Shared { nearest };
        } else {
            end = Anchor::Shared { nearest };
        }
        debug!(
            "Segment {}: manual measurement at {nearest} is nearest both boundaries; anchoring the {} only",
            slice.index,
            if begin.is_present() { "start" } else { "end" }
        );
    }

    match begin {
        Anchor::Present(_) | Anchor::Shared { .. } => {}
        Anchor::OutOfTolerance { .. } | Anchor::Unavailable => warn!(
            "No initial manual measurement within {day_buffer} days of {}; using initial sensor value",
            slice.first().timestamp
        ),
    }
    match end {
        Anchor::Present(_) | Anchor::Shared { .. } => {}
        Anchor::OutOfTolerance { .. } | Anchor::Unavailable => warn!(
            "No final manual measurement within {day_buffer} days of {}; using final sensor value",
            slice.last().timestamp
        ),
    }
    AnchoredSegment { slice, begin, end }
}

fn anchor_for(
    manual: &TimeIndexedSeries,
    breakpoint: NaiveDateTime,
    sensor_boundary: NaiveDateTime,
    buffer: Duration,
) -> Anchor {
    let Some(nearest) = manual.closest(breakpoint) else {
        return Anchor::Unavailable;
    };
    let gap = (nearest.timestamp - sensor_boundary).abs();
    if gap > buffer {
        return Anchor::OutOfTolerance {
            nearest: nearest.timestamp,
            gap_days: days_between(sensor_boundary, nearest.timestamp).abs(),
        };
    }
    Anchor::Present(ManualAnchor {
        timestamp: nearest.timestamp,
        julian: nearest.julian,
        value: nearest.value,
    })
}

/// Derive slope and intercept from the available anchors.
pub fn fit_drift_model(anchored: AnchoredSegment) -> Result<FittedSegment, DriftError> {
    let slice = &anchored.slice;
    let first = *slice.first();
    let last = *slice.last();
    let span = slice.span_days();

    let sensor_span_error = || DriftError::DegenerateSegment {
        segment: slice.index,
        span: "sensor endpoints",
        first: first.timestamp,
        last: last.timestamp,
    };
    let slope_trans = || (first.value - last.value) / (first.julian - last.julian);

    let (model, status) = match (anchored.begin.manual(), anchored.end.manual()) {
        (Some(begin), Some(end)) => {
            if begin.timestamp == end.timestamp {
                return Err(DriftError::DegenerateSegment {
                    segment: slice.index,
                    span: "manual anchors",
                    first: begin.timestamp,
                    last: end.timestamp,
                });
            }
            if first.timestamp == last.timestamp {
                return Err(sensor_span_error());
            }
            let slope_man = (begin.value - end.value) / (begin.julian - end.julian);
            let slope_trans = slope_trans();
            let slope = slope_trans - slope_man;
            let intercept = first.value - begin.value;
            (
                DriftModel {
                    slope_man,
                    slope_trans,
                    slope,
                    intercept,
                    drift: slope * span,
                },
                SegmentStatus::Corrected,
            )
        }
        (None, Some(end)) => {
            if first.timestamp == last.timestamp {
                return Err(sensor_span_error());
            }
            let last_offset = last.value - end.value;
            let slope = last_offset / span;
            (
                DriftModel {
                    slope_man: 0.0,
                    slope_trans: slope_trans(),
                    slope,
                    intercept: 0.0,
                    drift: slope * span,
                },
                SegmentStatus::Corrected,
            )
        }
        (Some(begin), None) => {
            if first.timestamp == last.timestamp {
                return Err(sensor_span_error());
            }
            let first_offset = first.value - begin.value;
            let slope = -first_offset / span;
            (
                DriftModel {
                    slope_man: 0.0,
                    slope_trans: slope_trans(),
                    slope,
                    intercept: first_offset,
                    drift: slope * span,
                },
                SegmentStatus::Corrected,
            )
        }
        (None, None) => {
            let slope_trans = if first.timestamp == last.timestamp { 0.0 } else { slope_trans() };
            (
                DriftModel {
                    slope_trans,
                    ..DriftModel::ZERO
                },
                SegmentStatus::PassThrough,
            )
        }
    };

    Ok(FittedSegment {
        anchored,
        model,
        status,
    })
}

/// `corrected[t] = raw[t] - (slope * (t - first_sensor_time) + intercept)`.
pub fn apply_correction(fitted: &FittedSegment) -> Vec<CorrectedSample> {
    let slice = &fitted.anchored.slice;
    let t0 = slice.first().julian;
    slice
        .samples()
        .iter()
        .map(|p| {
            let days = p.julian - t0;
            let drift_correction = fitted.model.slope * days;
            let correction_with_offset = fitted.model.correction_at(days);
            CorrectedSample {
                timestamp: p.timestamp,
                julian: p.julian,
                segment: slice.index,
                raw: p.value,
                drift_correction,
                correction_with_offset,
                corrected: p.value - correction_with_offset,
            }
        })
        .collect()
}

pub fn drift_features(fitted: &FittedSegment) -> DriftFeatures {
    DriftFeatures {
        status: fitted.status,
        model: Some(fitted.model),
        ..degenerate_features(&fitted.anchored)
    }
}

fn degenerate_features(anchored: &AnchoredSegment) -> DriftFeatures {
    let slice = &anchored.slice;
    DriftFeatures {
        segment: slice.index,
        status: SegmentStatus::Degenerate,
        t_beg: slice.start,
        t_end: slice.end,
        trans_beg: slice.first().timestamp,
        trans_end: slice.last().timestamp,
        first_trans: slice.first().value,
        last_trans: slice.last().value,
        begin_anchor: anchored.begin,
        end_anchor: anchored.end,
        samples: slice.samples().len(),
        model: None,
    }
}
