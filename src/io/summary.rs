//! Read/write run summary JSON files.
//!
//! The summary JSON is the "portable" record of a correction run:
//! - field names and day buffer used
//! - breakpoints
//! - the full per-segment drift table and max drift
//!
//! The schema is defined by `domain::DriftReportFile`.

use std::fs::File;
use std::path::Path;

use crate::domain::{DriftConfig, DriftReportFile};
use crate::drift::DriftCorrection;
use crate::error::AppError;

pub fn build_report(correction: &DriftCorrection, config: &DriftConfig) -> DriftReportFile {
    DriftReportFile {
        tool: "drift".to_string(),
        drifting_field: config.drifting_field.clone(),
        manual_field: config.manual_field.clone(),
        output_field: config.output_field.clone(),
        day_buffer: config.day_buffer,
        max_drift: correction.max_drift,
        corrected_samples: correction.corrected.len(),
        breakpoints: correction.breakpoints.points.clone(),
        segments: correction.features.clone(),
    }
}

/// Write a summary JSON file.
pub fn write_summary_json(path: &Path, correction: &DriftCorrection, config: &DriftConfig) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create summary JSON '{}': {e}", path.display())))?;
    serde_json::to_writer_pretty(file, &build_report(correction, config))
        .map_err(|e| AppError::new(2, format!("Failed to write summary JSON: {e}")))?;
    Ok(())
}

/// Read a summary JSON file.
pub fn read_summary_json(path: &Path) -> Result<DriftReportFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open summary JSON '{}': {e}", path.display())))?;
    let report: DriftReportFile =
        serde_json::from_reader(file).map_err(|e| AppError::new(2, format!("Invalid summary JSON: {e}")))?;
    Ok(report)
}
