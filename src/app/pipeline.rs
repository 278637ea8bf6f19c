//! Shared pipeline logic behind the CLI commands.
//!
//! Workflows:
//! - CSV ingest -> column validation -> breakpoints -> per-segment correction -> aggregate
//! - synthetic well -> correction -> error against the known truth
//! - single-series cleaning (jumps, spikes, resampling)
//!
//! Presentation (printing, exports) stays in `app`.

use std::collections::HashMap;

use chrono::Duration;
use tracing::info;

use crate::cli::{CleanArgs, CorrectArgs};
use crate::data::{SyntheticConfig, SyntheticWell, generate_well};
use crate::domain::{CorrectedSample, DriftConfig};
use crate::drift::{Breakpoints, DriftCorrection, DriftCorrector};
use crate::error::AppError;
use crate::filters::{fix_jumps, remove_spikes, resample};
use crate::io::ingest::{IngestedTable, load_time_table};
use crate::series::{TimeIndexedSeries, TimeTable};

/// All computed outputs of a single `drift correct` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub sensor: IngestedTable,
    pub manual: IngestedTable,
    pub correction: DriftCorrection,
}

/// Outputs of `drift breakpoints`.
#[derive(Debug, Clone)]
pub struct BreakpointOutput {
    pub sensor: IngestedTable,
    pub manual: IngestedTable,
    pub breakpoints: Breakpoints,
}

/// Outputs of `drift demo`.
#[derive(Debug, Clone)]
pub struct DemoOutput {
    pub well: SyntheticWell,
    pub correction: DriftCorrection,
    /// RMSE of the raw sensor against the truth.
    pub raw_rmse: f64,
    /// RMSE of the corrected series against the truth.
    pub corrected_rmse: f64,
}

fn load_inputs(args: &CorrectArgs) -> Result<(IngestedTable, IngestedTable), AppError> {
    let sensor = load_time_table(&args.sensor, args.sensor_time_column.as_deref())?;
    let manual = load_time_table(&args.manual, args.manual_time_column.as_deref())?;
    Ok((sensor, manual))
}

/// Execute the full correction pipeline.
pub fn run_correction(args: &CorrectArgs, config: &DriftConfig) -> Result<RunOutput, AppError> {
    let (sensor, manual) = load_inputs(args)?;
    let corrector = DriftCorrector::new(&manual.table, &sensor.table, config.clone())?;
    let correction = corrector.run()?;
    Ok(RunOutput {
        sensor,
        manual,
        correction,
    })
}

/// Place breakpoints without fitting anything.
pub fn run_breakpoints(args: &CorrectArgs, config: &DriftConfig) -> Result<BreakpointOutput, AppError> {
    let (sensor, manual) = load_inputs(args)?;
    let corrector = DriftCorrector::new(&manual.table, &sensor.table, config.clone())?;
    let breakpoints = corrector.breakpoints()?;
    Ok(BreakpointOutput {
        sensor,
        manual,
        breakpoints,
    })
}

/// Generate a synthetic well, correct it, and score the result against the truth.
pub fn run_demo(synthetic: &SyntheticConfig, config: &DriftConfig) -> Result<DemoOutput, AppError> {
    let well = generate_well(synthetic)?;
    let correction = DriftCorrector::new(&well.manual, &well.sensor, config.clone())?.run()?;

    let truth: HashMap<_, _> = well.truth.iter().map(|p| (p.timestamp, p.value)).collect();
    let raw_rmse = rmse(&truth, &correction.corrected, |s| s.raw);
    let corrected_rmse = rmse(&truth, &correction.corrected, |s| s.corrected);
    info!("demo: raw RMSE {raw_rmse:.4}, corrected RMSE {corrected_rmse:.4}");

    Ok(DemoOutput {
        well,
        correction,
        raw_rmse,
        corrected_rmse,
    })
}

fn rmse<F>(truth: &HashMap<chrono::NaiveDateTime, f64>, samples: &[CorrectedSample], value: F) -> f64
where
    F: Fn(&CorrectedSample) -> f64,
{
    let (sum, n) = samples
        .iter()
        .filter_map(|s| truth.get(&s.timestamp).map(|t| value(s) - t))
        .fold((0.0, 0usize), |(sum, n), r| (sum + r * r, n + 1));
    if n == 0 { f64::NAN } else { (sum / n as f64).sqrt() }
}

/// Load one field and run the requested cleaning steps, in order:
/// jumps, spikes, resampling.
pub fn run_clean(args: &CleanArgs) -> Result<(IngestedTable, TimeTable), AppError> {
    if let Some(t) = args.fix_jumps.into_iter().chain(args.remove_spikes).find(|t| !(t.is_finite() && *t > 0.0)) {
        return Err(AppError::new(2, format!("Cleaning thresholds must be finite and > 0 (got {t}).")));
    }
    if args.resample == Some(0) {
        return Err(AppError::new(2, "Resample interval must be > 0 minutes."));
    }

    let ingested = load_time_table(&args.input, args.time_column.as_deref())?;
    let field = args.field.to_ascii_lowercase();
    let series = ingested.table.series(&field).ok_or_else(|| {
        AppError::new(
            2,
            format!(
                "Missing field `{field}` in '{}' (available: {}).",
                args.input.display(),
                ingested.table.columns().join(", ")
            ),
        )
    })?;

    let cleaned = clean_series(series, args);
    Ok((ingested, TimeTable::from_series(field, &cleaned)))
}

fn clean_series(mut series: TimeIndexedSeries, args: &CleanArgs) -> TimeIndexedSeries {
    if let Some(threshold) = args.fix_jumps {
        series = fix_jumps(&series, threshold);
    }
    if let Some(threshold) = args.remove_spikes {
        series = remove_spikes(&series, threshold);
    }
    if let Some(minutes) = args.resample {
        series = resample(&series, minutes, Duration::minutes(args.max_gap_minutes));
    }
    series
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn demo_reduces_error() {
        let synthetic = SyntheticConfig {
            days: 90,
            interval_minutes: 180,
            max_drift_per_day: 0.02,
            ..SyntheticConfig::default()
        };
        let out = run_demo(&synthetic, &DriftConfig::default()).unwrap();
        assert_eq!(out.correction.corrected.len(), out.well.sensor.len());
        assert!(out.corrected_rmse < out.raw_rmse);
        assert!(out.corrected_rmse < 0.05);
    }
}
