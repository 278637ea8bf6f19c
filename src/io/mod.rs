//! Input/output helpers.
//!
//! - CSV ingest of sensor/manual tables (`ingest`)
//! - corrected series + drift table CSV exports (`export`)
//! - run summary JSON read/write (`summary`)

pub mod export;
pub mod ingest;
pub mod summary;

pub use export::*;
pub use ingest::*;
pub use summary::*;
