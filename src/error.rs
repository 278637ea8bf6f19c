use chrono::NaiveDateTime;
use thiserror::Error;

use crate::domain::Stream;

/// Process-level error carrying the exit code the `drift` binary returns.
///
/// Exit codes:
/// - `2`: configuration / I/O problems (bad flags, missing columns, unreadable files)
/// - `3`: data-quality problems (nothing to correct, no overlap, ...)
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Errors raised by the drift-correction engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DriftError {
    #[error("column `{field}` not found in the {stream} table (available: {available})")]
    MissingField {
        stream: Stream,
        field: String,
        available: String,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{stream} stream has no valid values after dropping missing rows")]
    EmptyInput { stream: Stream },

    #[error(
        "no manual measurement within {buffer_days} days of the sensor record \
         ({sensor_start} to {sensor_end}); manual record spans {manual_start} to {manual_end}"
    )]
    NoOverlap {
        sensor_start: NaiveDateTime,
        sensor_end: NaiveDateTime,
        manual_start: NaiveDateTime,
        manual_end: NaiveDateTime,
        buffer_days: f64,
    },

    #[error("only {found} breakpoint(s) could be placed; at least two are required")]
    InsufficientBreakpoints { found: usize },

    #[error("segment {segment}: zero time span between {span} at {first} and {last}")]
    DegenerateSegment {
        segment: usize,
        span: &'static str,
        first: NaiveDateTime,
        last: NaiveDateTime,
    },

    #[error("none of the {segments} segment(s) could be corrected")]
    NoSegmentsProcessed { segments: usize },
}

impl DriftError {
    /// True for errors caused by how the run was configured rather than by the data.
    pub fn is_config_error(&self) -> bool {
        matches!(self, DriftError::MissingField { .. } | DriftError::InvalidConfig(_))
    }
}

impl From<DriftError> for AppError {
    fn from(err: DriftError) -> Self {
        let code = if err.is_config_error() { 2 } else { 3 };
        AppError::new(code, err.to_string())
    }
}
