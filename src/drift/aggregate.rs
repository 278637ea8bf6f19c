//! Merge per-segment outcomes into one corrected series plus a drift table.

use tracing::info;

use crate::domain::{CorrectedSample, DriftFeatures, SegmentStatus};
use crate::drift::breakpoints::Breakpoints;
use crate::drift::segment::SegmentOutcome;
use crate::error::DriftError;

/// Complete output of a drift-correction run.
#[derive(Debug, Clone, PartialEq)]
pub struct DriftCorrection {
    /// Corrected samples of every processed segment, sorted by timestamp.
    pub corrected: Vec<CorrectedSample>,
    /// One row per non-empty segment (including degenerate ones), by segment index.
    pub features: Vec<DriftFeatures>,
    /// Largest absolute per-segment drift; 0.0 when no segment has a finite drift.
    pub max_drift: f64,
    pub breakpoints: Breakpoints,
}

impl DriftCorrection {
    pub fn segments_with_status(&self, status: SegmentStatus) -> usize {
        self.features.iter().filter(|f| f.status == status).count()
    }
}

/// Concatenate corrected segments and build the diagnostic table.
///
/// Fails with `NoSegmentsProcessed` when no segment produced corrected samples,
/// so "no drift" is never confused with "nothing was corrected".
pub fn aggregate(breakpoints: Breakpoints, mut outcomes: Vec<SegmentOutcome>) -> Result<DriftCorrection, DriftError> {
    outcomes.sort_by_key(SegmentOutcome::index);

    let mut corrected = Vec::new();
    let mut features = Vec::new();
    let mut processed = 0usize;

    for outcome in outcomes {
        match outcome {
            SegmentOutcome::Empty { .. } => {}
            SegmentOutcome::Degenerate { features: f, .. } => features.push(f),
            SegmentOutcome::Corrected { features: f, samples } => {
                processed += 1;
                features.push(f);
                corrected.extend(samples);
            }
        }
    }

    if processed == 0 {
        return Err(DriftError::NoSegmentsProcessed {
            segments: breakpoints.segment_count(),
        });
    }

    corrected.sort_by_key(|s| s.timestamp);
    let max_drift = max_abs_drift(&features);

    info!(
        "Corrected {} samples across {processed} of {} segments (max drift {max_drift:.3})",
        corrected.len(),
        breakpoints.segment_count()
    );

    Ok(DriftCorrection {
        corrected,
        features,
        max_drift,
        breakpoints,
    })
}

/// `max(|drift|)` over segments with a finite drift, or 0.0.
pub fn max_abs_drift(features: &[DriftFeatures]) -> f64 {
    features
        .iter()
        .filter_map(DriftFeatures::drift)
        .filter(|d| d.is_finite())
        .map(f64::abs)
        .fold(0.0, f64::max)
}
