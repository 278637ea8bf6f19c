//! Terminal reporting for drift-correction runs.

pub mod format;

pub use format::*;
