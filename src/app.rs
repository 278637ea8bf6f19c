//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and sets up logging
//! - parses CLI arguments
//! - runs the correction pipeline
//! - prints reports
//! - writes optional exports

use std::io;

use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::{CleanArgs, Command, CorrectArgs, DemoArgs, ShowArgs};
use crate::data::SyntheticConfig;
use crate::domain::DriftConfig;
use crate::error::AppError;

pub mod pipeline;

/// Entry point for the `drift` binary.
pub fn run() -> Result<(), AppError> {
    dotenvy::dotenv().ok();
    let cli = crate::cli::Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Correct(args) => handle_correct(args),
        Command::Breakpoints(args) => handle_breakpoints(args),
        Command::Clean(args) => handle_clean(args),
        Command::Demo(args) => handle_demo(args),
        Command::Show(args) => handle_show(args),
    }
}

fn handle_correct(args: CorrectArgs) -> Result<(), AppError> {
    let config = config_from_args(&args);
    let run = pipeline::run_correction(&args, &config)?;

    println!("{}", crate::report::format_ingest("Sensor", &run.sensor));
    println!("{}", crate::report::format_ingest("Manual", &run.manual));
    println!();
    println!("{}", crate::report::format_run_summary(&run.correction, &config));
    println!("{}", crate::report::format_drift_table(&run.correction.features));

    if let Some(path) = &args.export {
        crate::io::export::write_corrected_csv(path, &run.correction.corrected, &config.output_field)?;
        info!("wrote corrected series to {}", path.display());
    }
    if let Some(path) = &args.export_table {
        crate::io::export::write_drift_table_csv(path, &run.correction.features)?;
        info!("wrote drift table to {}", path.display());
    }
    if let Some(path) = &args.export_json {
        crate::io::summary::write_summary_json(path, &run.correction, &config)?;
        info!("wrote summary to {}", path.display());
    }

    Ok(())
}

fn handle_breakpoints(args: CorrectArgs) -> Result<(), AppError> {
    let config = config_from_args(&args);
    let out = pipeline::run_breakpoints(&args, &config)?;

    println!("{}", crate::report::format_ingest("Sensor", &out.sensor));
    println!("{}", crate::report::format_ingest("Manual", &out.manual));
    println!();
    println!(
        "{} segments, mean length {:.2} d",
        out.breakpoints.segment_count(),
        out.breakpoints.mean_segment_days()
    );
    println!("{}", crate::report::format_breakpoints(&out.breakpoints));
    Ok(())
}

fn handle_clean(args: CleanArgs) -> Result<(), AppError> {
    let (ingested, cleaned) = pipeline::run_clean(&args)?;
    crate::io::export::write_table_csv(&args.output, &cleaned, &ingested.time_column)?;
    println!(
        "{}: {} rows in, {} rows out -> {}",
        args.field,
        ingested.rows_used,
        cleaned.len(),
        args.output.display()
    );
    Ok(())
}

fn handle_demo(args: DemoArgs) -> Result<(), AppError> {
    let synthetic = synthetic_config_from_args(&args);
    let config = DriftConfig {
        day_buffer: args.day_buffer,
        parallel: args.parallel,
        ..DriftConfig::default()
    };
    let out = pipeline::run_demo(&synthetic, &config)?;

    println!("{}", crate::report::format_run_summary(&out.correction, &config));
    println!("{}", crate::report::format_drift_table(&out.correction.features));
    println!("Raw RMSE vs truth:       {:.4}", out.raw_rmse);
    println!("Corrected RMSE vs truth: {:.4}", out.corrected_rmse);

    if let Some(path) = &args.export_sensor {
        crate::io::export::write_table_csv(path, &out.well.sensor, "datetime")?;
    }
    if let Some(path) = &args.export_manual {
        crate::io::export::write_table_csv(path, &out.well.manual, "datetime")?;
    }
    if let Some(path) = &args.export {
        crate::io::export::write_corrected_csv(path, &out.correction.corrected, &config.output_field)?;
    }
    Ok(())
}

fn handle_show(args: ShowArgs) -> Result<(), AppError> {
    let report = crate::io::summary::read_summary_json(&args.summary)?;
    println!("{}", crate::report::format_report_file(&report));
    Ok(())
}

pub fn config_from_args(args: &CorrectArgs) -> DriftConfig {
    DriftConfig {
        drifting_field: args.drift_field.clone(),
        manual_field: args.manual_field.clone(),
        output_field: args.output_field.clone(),
        day_buffer: args.day_buffer,
        trim_end: args.trim_end,
        jump_tol: args.jump_tol,
        trim_window: args.trim_window,
        parallel: args.parallel,
    }
}

fn synthetic_config_from_args(args: &DemoArgs) -> SyntheticConfig {
    SyntheticConfig {
        days: args.days,
        interval_minutes: args.interval_minutes,
        visit_interval_days: args.visit_days,
        max_drift_per_day: args.max_drift,
        sensor_noise: args.sensor_noise,
        manual_noise: args.manual_noise,
        seed: args.seed,
        ..SyntheticConfig::default()
    }
}
