//! `well-drift` library crate.
//!
//! The binary (`drift`) is a thin wrapper around this library so that:
//!
//! - the correction engine is testable without spawning processes
//! - the same pipeline can be driven from other tools or notebooks

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod drift;
pub mod error;
pub mod filters;
pub mod io;
pub mod report;
pub mod series;

pub use domain::{CorrectedSample, DriftConfig, DriftFeatures};
pub use drift::{DriftCorrection, DriftCorrector, correct_drift};
pub use error::{AppError, DriftError};
