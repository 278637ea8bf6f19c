//! Command-line parsing for the drift corrector.
//!
//! Argument parsing and command dispatch stay separate from the correction code.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::filters::HOURLY_MAX_GAP_MINUTES;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "drift", version, about = "Pressure-transducer drift correction against manual readings")]
pub struct Cli {
    /// Log at debug level (overridden by RUST_LOG).
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Correct a sensor record against manual readings and print the drift table.
    Correct(CorrectArgs),
    /// Only place breakpoints and print where they landed.
    Breakpoints(CorrectArgs),
    /// Clean a single series (jump removal, spike removal, resampling).
    Clean(CleanArgs),
    /// Generate a synthetic well and correct it.
    Demo(DemoArgs),
    /// Print a summary JSON written by `drift correct --export-json`.
    Show(ShowArgs),
}

/// Inputs and tuning for a correction run.
#[derive(Debug, Args, Clone)]
pub struct CorrectArgs {
    /// Sensor (transducer) CSV.
    #[arg(long, value_name = "CSV")]
    pub sensor: PathBuf,

    /// Manual measurement CSV.
    #[arg(long, value_name = "CSV")]
    pub manual: PathBuf,

    /// Timestamp column of the sensor CSV (auto-detected if omitted).
    #[arg(long)]
    pub sensor_time_column: Option<String>,

    /// Timestamp column of the manual CSV (auto-detected if omitted).
    #[arg(long)]
    pub manual_time_column: Option<String>,

    /// Sensor field that drifts.
    #[arg(long, default_value = "level")]
    pub drift_field: String,

    /// Manual field holding the reference readings.
    #[arg(long, default_value = "measured_level")]
    pub manual_field: String,

    /// Name of the corrected column in the export.
    #[arg(long, default_value = "water_level")]
    pub output_field: String,

    /// Tolerance (days) between a manual reading and the sensor record.
    #[arg(long, default_value_t = 3.0)]
    pub day_buffer: f64,

    /// Trim jumps near the start/end of each segment before fitting.
    #[arg(long)]
    pub trim_end: bool,

    /// Jump size treated as a discontinuity by `--trim-end`.
    #[arg(long, default_value_t = 0.5)]
    pub jump_tol: f64,

    /// Samples searched for jumps at either edge of a segment.
    #[arg(long, default_value_t = 50)]
    pub trim_window: usize,

    /// Correct segments in parallel.
    #[arg(long)]
    pub parallel: bool,

    /// Export the corrected series to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,

    /// Export the per-segment drift table to CSV.
    #[arg(long = "export-table")]
    pub export_table: Option<PathBuf>,

    /// Export a run summary to JSON.
    #[arg(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

/// Options for cleaning a single series.
#[derive(Debug, Args, Clone)]
pub struct CleanArgs {
    #[arg(long, value_name = "CSV")]
    pub input: PathBuf,

    #[arg(long)]
    pub time_column: Option<String>,

    /// Field to clean.
    #[arg(long, default_value = "level")]
    pub field: String,

    /// Remove step jumps larger than this.
    #[arg(long)]
    pub fix_jumps: Option<f64>,

    /// Drop single-sample spikes larger than this.
    #[arg(long)]
    pub remove_spikes: Option<f64>,

    /// Resample onto a regular grid (minutes).
    #[arg(long)]
    pub resample: Option<u32>,

    /// Longest gap (minutes) bridged when resampling.
    #[arg(long, default_value_t = HOURLY_MAX_GAP_MINUTES)]
    pub max_gap_minutes: i64,

    /// Output CSV.
    #[arg(long, value_name = "CSV")]
    pub output: PathBuf,
}

/// Options for the synthetic demo.
#[derive(Debug, Args, Clone)]
pub struct DemoArgs {
    /// Record length in days.
    #[arg(long, default_value_t = 180)]
    pub days: u32,

    /// Sensor sampling interval.
    #[arg(long, default_value_t = 60)]
    pub interval_minutes: u32,

    /// Days between field visits (manual readings).
    #[arg(long, default_value_t = 30.0)]
    pub visit_days: f64,

    /// Maximum drift rate (units/day).
    #[arg(long, default_value_t = 0.01)]
    pub max_drift: f64,

    #[arg(long, default_value_t = 0.005)]
    pub sensor_noise: f64,

    #[arg(long, default_value_t = 0.002)]
    pub manual_noise: f64,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    #[arg(long, default_value_t = 3.0)]
    pub day_buffer: f64,

    #[arg(long)]
    pub parallel: bool,

    /// Also write the generated sensor table to CSV.
    #[arg(long = "export-sensor")]
    pub export_sensor: Option<PathBuf>,

    /// Also write the generated manual table to CSV.
    #[arg(long = "export-manual")]
    pub export_manual: Option<PathBuf>,

    /// Export the corrected series to CSV.
    #[arg(long)]
    pub export: Option<PathBuf>,
}

/// Options for printing a saved summary.
#[derive(Debug, Args)]
pub struct ShowArgs {
    /// Summary JSON produced by `drift correct --export-json`.
    #[arg(long, value_name = "JSON")]
    pub summary: PathBuf,
}
