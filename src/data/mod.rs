//! Data sources that do not come from CSV files.

pub mod synthetic;

pub use synthetic::*;
