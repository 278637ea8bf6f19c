//! Synthetic monitoring-well records for demos and tests.
//!
//! The generated well has a seasonal "true" water level. The transducer reads that
//! level plus a linear drift that restarts at every field visit (the sensor is
//! re-set when the technician takes a manual reading) plus Gaussian noise. Manual
//! readings are the true level at each visit with their own, smaller noise.

use std::f64::consts::TAU;

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;
use tracing::debug;

use crate::domain::try_days_to_duration;
use crate::error::DriftError;
use crate::series::{SeriesPoint, TimeIndexedSeries, TimeTable, days_between};

const DAYS_PER_YEAR: f64 = 365.25;

#[derive(Debug, Clone, PartialEq)]
pub struct SyntheticConfig {
    pub start: NaiveDateTime,
    /// Length of the sensor record in days.
    pub days: u32,
    pub interval_minutes: u32,
    pub visit_interval_days: f64,
    pub base_level: f64,
    pub seasonal_amplitude: f64,
    /// Drift rates are drawn uniformly from `[-max, max]` per day.
    pub max_drift_per_day: f64,
    pub sensor_noise: f64,
    pub manual_noise: f64,
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            start: NaiveDate::from_ymd_opt(2023, 1, 1)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            days: 180,
            interval_minutes: 60,
            visit_interval_days: 30.0,
            base_level: 100.0,
            seasonal_amplitude: 1.5,
            max_drift_per_day: 0.01,
            sensor_noise: 0.005,
            manual_noise: 0.002,
            seed: 42,
        }
    }
}

/// A generated sensor/manual pair plus the ground truth behind it.
#[derive(Debug, Clone)]
pub struct SyntheticWell {
    /// Columns: `level`, `temperature`.
    pub sensor: TimeTable,
    /// Column: `measured_level`.
    pub manual: TimeTable,
    /// Noise-free water level at every sensor timestamp.
    pub truth: TimeIndexedSeries,
    /// Drift rate (units/day) of each deployment between visits.
    pub drift_rates: Vec<f64>,
}

pub fn generate_well(config: &SyntheticConfig) -> Result<SyntheticWell, DriftError> {
    validate(config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let sensor_noise = Normal::new(0.0, config.sensor_noise)
        .map_err(|e| DriftError::InvalidConfig(format!("sensor noise: {e}")))?;
    let manual_noise = Normal::new(0.0, config.manual_noise)
        .map_err(|e| DriftError::InvalidConfig(format!("manual noise: {e}")))?;

    let end = config
        .start
        .checked_add_signed(Duration::days(i64::from(config.days)))
        .ok_or_else(|| {
            DriftError::InvalidConfig(format!(
                "a {}-day record starting {} runs past the supported date range",
                config.days, config.start
            ))
        })?;
    let visit = try_days_to_duration(config.visit_interval_days)
        .filter(|d| *d > Duration::zero())
        .ok_or_else(|| {
            DriftError::InvalidConfig(format!(
                "visit interval of {} days is below the 1 ms resolution",
                config.visit_interval_days
            ))
        })?;

    let mut visits = Vec::new();
    let mut next = Some(config.start);
    while let Some(t) = next.filter(|t| *t <= end) {
        visits.push(t);
        next = t.checked_add_signed(visit);
    }

    // A visit on the last day of the record does not start a new deployment.
    let deployments = visits.iter().filter(|v| **v < end).count().max(1);
    let max = config.max_drift_per_day;
    let drift_rates: Vec<f64> = (0..deployments).map(|_| rng.gen_range(-max..=max)).collect();

    let step = Duration::minutes(i64::from(config.interval_minutes));
    let mut sensor = TimeTable::new(["level", "temperature"]);
    let mut truth = Vec::new();
    let mut next = Some(config.start);
    while let Some(t) = next.filter(|t| *t <= end) {
        let elapsed = days_between(config.start, t);
        let deployment = visits
            .partition_point(|v| *v <= t)
            .saturating_sub(1)
            .min(deployments - 1);
        let since_visit = days_between(visits[deployment], t);

        let level = true_level(config, elapsed);
        let reading = level + drift_rates[deployment] * since_visit + sensor_noise.sample(&mut rng);
        let temperature = 10.0 + 3.0 * (TAU * elapsed / DAYS_PER_YEAR).cos() + sensor_noise.sample(&mut rng);

        sensor.push_row(t, vec![reading, temperature]);
        truth.push(SeriesPoint::new(t, level));
        next = t.checked_add_signed(step);
    }

    let mut manual = TimeTable::new(["measured_level"]);
    for v in &visits {
        let level = true_level(config, days_between(config.start, *v));
        manual.push_row(*v, vec![level + manual_noise.sample(&mut rng)]);
    }

    debug!(
        "synthetic well: {} sensor rows, {} visits, seed {}",
        sensor.len(),
        visits.len(),
        config.seed
    );

    Ok(SyntheticWell {
        sensor,
        manual,
        truth: TimeIndexedSeries::from_points(truth),
        drift_rates,
    })
}

fn true_level(config: &SyntheticConfig, elapsed_days: f64) -> f64 {
    config.base_level + config.seasonal_amplitude * (TAU * elapsed_days / DAYS_PER_YEAR).sin()
}

fn validate(config: &SyntheticConfig) -> Result<(), DriftError> {
    if config.days == 0 || config.interval_minutes == 0 {
        return Err(DriftError::InvalidConfig(
            "synthetic record length and interval must be > 0".to_string(),
        ));
    }
    if !(config.visit_interval_days.is_finite() && config.visit_interval_days > 0.0) {
        return Err(DriftError::InvalidConfig(format!(
            "visit interval must be finite and > 0 (got {})",
            config.visit_interval_days
        )));
    }
    let non_negative = [
        ("max drift", config.max_drift_per_day),
        ("sensor noise", config.sensor_noise),
        ("manual noise", config.manual_noise),
    ];
    for (name, v) in non_negative {
        if !(v.is_finite() && v >= 0.0) {
            return Err(DriftError::InvalidConfig(format!("{name} must be finite and >= 0 (got {v})")));
        }
    }
    Ok(())
}
