//! Time-indexed series utilities.
//!
//! - timestamp parsing + continuous day coordinate (`time`)
//! - sorted, duplicate-free single-field series with closest-match queries (`indexed`)
//! - multi-column tables as produced by decoders/ingest (`table`)

pub mod indexed;
pub mod table;
pub mod time;

pub use indexed::*;
pub use table::*;
pub use time::*;
