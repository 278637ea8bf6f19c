//! Drift-correction engine.
//!
//! Responsibilities:
//!
//! - place segment boundaries at trusted manual measurements (`breakpoints`)
//! - fit and apply a linear drift model per segment (`segment`)
//! - merge segments and summarize the drift removed (`aggregate`)
//!
//! Segments only read their own slice of the sensor record plus the shared manual
//! record, so they can be corrected in parallel and merged by index.

use rayon::prelude::*;

use crate::domain::{DriftConfig, Stream};
use crate::error::DriftError;
use crate::series::{TimeIndexedSeries, TimeTable};

pub mod aggregate;
pub mod breakpoints;
pub mod segment;

pub use aggregate::*;
pub use breakpoints::*;
pub use segment::*;

/// A validated sensor/manual pairing ready for correction.
#[derive(Debug, Clone)]
pub struct DriftCorrector {
    sensor: TimeIndexedSeries,
    manual: TimeIndexedSeries,
    config: DriftConfig,
}

impl DriftCorrector {
    /// Pull the configured fields out of the two tables.
    ///
    /// Missing columns and invalid tolerances are reported here, before any computation.
    pub fn new(manual: &TimeTable, sensor: &TimeTable, config: DriftConfig) -> Result<Self, DriftError> {
        config.validate()?;
        let sensor_series = sensor
            .series(&config.drifting_field)
            .ok_or_else(|| missing_field(Stream::Sensor, &config.drifting_field, sensor))?;
        let manual_series = manual
            .series(&config.manual_field)
            .ok_or_else(|| missing_field(Stream::Manual, &config.manual_field, manual))?;
        Ok(Self {
            sensor: sensor_series,
            manual: manual_series,
            config,
        })
    }

    pub fn from_series(manual: TimeIndexedSeries, sensor: TimeIndexedSeries, config: DriftConfig) -> Result<Self, DriftError> {
        config.validate()?;
        Ok(Self { sensor, manual, config })
    }

    pub fn config(&self) -> &DriftConfig {
        &self.config
    }

    pub fn sensor(&self) -> &TimeIndexedSeries {
        &self.sensor
    }

    pub fn manual(&self) -> &TimeIndexedSeries {
        &self.manual
    }

    pub fn breakpoints(&self) -> Result<Breakpoints, DriftError> {
        calculate_breakpoints(&self.sensor, &self.manual, self.config.day_buffer)
    }

    pub fn run(&self) -> Result<DriftCorrection, DriftError> {
        correct_drift(&self.manual, &self.sensor, &self.config)
    }
}

fn missing_field(stream: Stream, field: &str, table: &TimeTable) -> DriftError {
    DriftError::MissingField {
        stream,
        field: field.to_string(),
        available: table.columns().join(", "),
    }
}

/// Normalize -> breakpoints -> per-segment correction -> aggregate.
pub fn correct_drift(
    manual: &TimeIndexedSeries,
    sensor: &TimeIndexedSeries,
    config: &DriftConfig,
) -> Result<DriftCorrection, DriftError> {
    config.validate()?;
    let breakpoints = calculate_breakpoints(sensor, manual, config.day_buffer)?;

    let sensor = sensor.drop_missing();
    let manual = manual.drop_missing();
    let n = breakpoints.segment_count();

    let outcomes: Vec<SegmentOutcome> = if config.parallel {
        (0..n)
            .into_par_iter()
            .map(|i| correct_segment(i, &breakpoints, &sensor, &manual, config))
            .collect()
    } else {
        (0..n)
            .map(|i| correct_segment(i, &breakpoints, &sensor, &manual, config))
            .collect()
    };

    aggregate(breakpoints, outcomes)
}
