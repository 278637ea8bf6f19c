//! Signal cleanup collaborators used around the drift corrector.
//!
//! All filters are pure functions from a series to a new series:
//! - edge trimming, jump removal and spike removal (`jumps`)
//! - regular-interval resampling (`resample`)

pub mod jumps;
pub mod resample;

pub use jumps::*;
pub use resample::*;
