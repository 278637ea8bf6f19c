//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - run configuration (`DriftConfig`)
//! - per-segment anchors and drift models (`Anchor`, `DriftModel`)
//! - correction outputs (`DriftFeatures`, `CorrectedSample`, `DriftReportFile`)

pub mod types;

pub use types::*;
