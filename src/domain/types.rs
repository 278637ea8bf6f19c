//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - passed between the correction stages without shared mutable state
//! - exported to JSON/CSV
//! - reloaded later for reporting

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::DriftError;

/// Which of the two input streams a value or error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stream {
    Sensor,
    Manual,
}

impl std::fmt::Display for Stream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stream::Sensor => write!(f, "sensor"),
            Stream::Manual => write!(f, "manual"),
        }
    }
}

/// Configuration of a single drift-correction run.
///
/// This is derived from CLI flags (plus defaults) or built directly by library callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DriftConfig {
    /// Sensor column that drifts (e.g. transducer level).
    pub drifting_field: String,
    /// Manual-table column holding the trusted reference readings.
    pub manual_field: String,
    /// Name given to the corrected column in exports.
    pub output_field: String,
    /// Tolerance (days) for associating a manual measurement with sensor readings.
    pub day_buffer: f64,
    /// Trim leading/trailing jumps off each segment before fitting.
    pub trim_end: bool,
    /// Jump size (measurement units) that counts as a discontinuity when trimming.
    pub jump_tol: f64,
    /// Number of samples at either edge of a segment searched for jumps.
    pub trim_window: usize,
    /// Correct segments on the rayon thread pool.
    pub parallel: bool,
}

impl Default for DriftConfig {
    fn default() -> Self {
        Self {
            drifting_field: "level".to_string(),
            manual_field: "measured_level".to_string(),
            output_field: "water_level".to_string(),
            day_buffer: 3.0,
            trim_end: false,
            jump_tol: 0.5,
            trim_window: 50,
            parallel: false,
        }
    }
}

impl DriftConfig {
    /// The day buffer as a chrono duration (millisecond resolution).
    pub fn buffer(&self) -> Duration {
        days_to_duration(self.day_buffer)
    }

    pub fn validate(&self) -> Result<(), DriftError> {
        validate_day_buffer(self.day_buffer)?;
        if self.trim_end && !(self.jump_tol.is_finite() && self.jump_tol > 0.0) {
            return Err(DriftError::InvalidConfig(format!(
                "jump tolerance must be finite and > 0 (got {})",
                self.jump_tol
            )));
        }
        if self.drifting_field.trim().is_empty() || self.manual_field.trim().is_empty() {
            return Err(DriftError::InvalidConfig(
                "drifting and manual field names must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Largest accepted day buffer (one hundred years).
pub const MAX_DAY_BUFFER: f64 = 36_525.0;

/// Reject buffers that are negative, non-finite or too wide to add to a timestamp.
pub fn validate_day_buffer(day_buffer: f64) -> Result<(), DriftError> {
    if !(day_buffer.is_finite() && (0.0..=MAX_DAY_BUFFER).contains(&day_buffer)) {
        return Err(DriftError::InvalidConfig(format!(
            "day buffer must be finite and within [0, {MAX_DAY_BUFFER}] (got {day_buffer})"
        )));
    }
    Ok(())
}

pub(crate) fn days_to_duration(days: f64) -> Duration {
    Duration::milliseconds((days * 86_400_000.0).round() as i64)
}

/// Like [`days_to_duration`], but `None` when the value does not fit a chrono duration.
pub(crate) fn try_days_to_duration(days: f64) -> Option<Duration> {
    Duration::try_milliseconds((days * 86_400_000.0).round() as i64)
}

/// A manual measurement pinned to a segment boundary.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManualAnchor {
    pub timestamp: NaiveDateTime,
    pub julian: f64,
    pub value: f64,
}

/// Anchor state at one end of a segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Anchor {
    /// A manual measurement lies within the day buffer of the sensor boundary.
    Present(ManualAnchor),
    /// The closest manual measurement is farther than the day buffer.
    OutOfTolerance {
        nearest: NaiveDateTime,
        gap_days: f64,
    },
    /// The nearest manual measurement already anchors the other end of the
    /// segment, where it lies closer to the sensor boundary.
    Shared { nearest: NaiveDateTime },
    /// No manual measurement exists at all.
    Unavailable,
}

impl Anchor {
    pub fn manual(&self) -> Option<&ManualAnchor> {
        match self {
            Anchor::Present(anchor) => Some(anchor),
            Anchor::OutOfTolerance { .. } | Anchor::Shared { .. } | Anchor::Unavailable => None,
        }
    }

    pub fn is_present(&self) -> bool {
        self.manual().is_some()
    }

    /// Short label for tables.
    pub fn label(&self) -> &'static str {
        match self {
            Anchor::Present(_) => "present",
            Anchor::OutOfTolerance { .. } => "out_of_tolerance",
            Anchor::Shared { .. } => "shared",
            Anchor::Unavailable => "unavailable",
        }
    }
}

/// Outcome of correcting one non-empty segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SegmentStatus {
    /// A drift model was fitted from at least one anchor and applied.
    Corrected,
    /// Neither end had an anchor; values pass through unchanged.
    PassThrough,
    /// A slope needed a zero time span; the segment was skipped.
    Degenerate,
}

impl SegmentStatus {
    pub fn label(self) -> &'static str {
        match self {
            SegmentStatus::Corrected => "corrected",
            SegmentStatus::PassThrough => "pass_through",
            SegmentStatus::Degenerate => "degenerate",
        }
    }
}

/// Linear drift model for one segment.
///
/// `correction(t) = slope * (t - first_sensor_time) + intercept`, all times in days.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DriftModel {
    /// Trend of the manual readings between the anchors (units/day).
    pub slope_man: f64,
    /// Trend of the sensor readings between the segment endpoints (units/day).
    pub slope_trans: f64,
    /// Drift rate removed from the sensor (units/day).
    pub slope: f64,
    /// Sensor-minus-manual offset at the start of the segment.
    pub intercept: f64,
    /// Total drift accumulated over the segment (`slope * sensor span`).
    pub drift: f64,
}

impl DriftModel {
    pub const ZERO: DriftModel = DriftModel {
        slope_man: 0.0,
        slope_trans: 0.0,
        slope: 0.0,
        intercept: 0.0,
        drift: 0.0,
    };

    /// Correction term at `days` after the first sensor sample.
    pub fn correction_at(&self, days: f64) -> f64 {
        self.slope * days + self.intercept
    }
}

/// Diagnostic record for one non-empty segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriftFeatures {
    pub segment: usize,
    pub status: SegmentStatus,
    /// Breakpoints bounding the segment.
    pub t_beg: NaiveDateTime,
    pub t_end: NaiveDateTime,
    /// First/last sensor samples actually used.
    pub trans_beg: NaiveDateTime,
    pub trans_end: NaiveDateTime,
    pub first_trans: f64,
    pub last_trans: f64,
    pub begin_anchor: Anchor,
    pub end_anchor: Anchor,
    pub samples: usize,
    /// `None` when the segment was degenerate.
    pub model: Option<DriftModel>,
}

impl DriftFeatures {
    pub fn man_beg(&self) -> Option<NaiveDateTime> {
        self.begin_anchor.manual().map(|a| a.timestamp)
    }

    pub fn man_end(&self) -> Option<NaiveDateTime> {
        self.end_anchor.manual().map(|a| a.timestamp)
    }

    pub fn first_meas(&self) -> Option<f64> {
        self.begin_anchor.manual().map(|a| a.value)
    }

    pub fn last_meas(&self) -> Option<f64> {
        self.end_anchor.manual().map(|a| a.value)
    }

    pub fn drift(&self) -> Option<f64> {
        self.model.map(|m| m.drift)
    }
}

/// One corrected sensor sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorrectedSample {
    pub timestamp: NaiveDateTime,
    pub julian: f64,
    pub segment: usize,
    /// Raw value of the drifting field.
    pub raw: f64,
    /// `slope * days since segment start`.
    pub drift_correction: f64,
    /// `drift_correction + intercept`.
    pub correction_with_offset: f64,
    /// `raw - correction_with_offset`.
    pub corrected: f64,
}

/// A saved run summary (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftReportFile {
    pub tool: String,
    pub drifting_field: String,
    pub manual_field: String,
    pub output_field: String,
    pub day_buffer: f64,
    pub max_drift: f64,
    pub corrected_samples: usize,
    pub breakpoints: Vec<NaiveDateTime>,
    pub segments: Vec<DriftFeatures>,
}
