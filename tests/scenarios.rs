use approx::assert_abs_diff_eq;
use chrono::{Duration, NaiveDate, NaiveDateTime};
use tempdir::TempDir;

use well_drift::app::config_from_args;
use well_drift::app::pipeline::run_correction;
use well_drift::cli::CorrectArgs;
use well_drift::domain::{Anchor, SegmentStatus};
use well_drift::drift::{SegmentOutcome, calculate_breakpoints, correct_segment};
use well_drift::io::{read_summary_json, write_corrected_csv, write_summary_json, write_table_csv};
use well_drift::series::{TimeIndexedSeries, TimeTable};
use well_drift::{DriftConfig, DriftCorrector, DriftError, correct_drift};

fn date(m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2023, m, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn series(points: &[(NaiveDateTime, f64)]) -> TimeIndexedSeries {
    TimeIndexedSeries::from_observations(points.iter().copied())
}

/// 90 daily samples ramping 10.0 -> 13.0 from 2023-01-01.
fn ramp_sensor() -> TimeIndexedSeries {
    TimeIndexedSeries::from_observations((0..90).map(|i| (date(1, 1) + Duration::days(i), 10.0 + 3.0 * i as f64 / 89.0)))
}

fn ramp_manual() -> TimeIndexedSeries {
    series(&[(date(1, 31), 10.0), (date(2, 28), 11.0), (date(3, 31), 12.0)])
}

#[test]
fn ramp_is_pulled_onto_manual_readings() {
    let manual = ramp_manual();
    let result = correct_drift(&manual, &ramp_sensor(), &DriftConfig::default()).unwrap();

    let bp = &result.breakpoints.points;
    assert!((2..=4).contains(&bp.len()));
    assert_eq!(bp, &vec![date(1, 1), date(1, 31), date(2, 28), date(3, 31)]);
    assert_eq!(result.corrected.len(), 90);
    assert_eq!(result.segments_with_status(SegmentStatus::Corrected), 3);

    for m in manual.iter() {
        let sample = result
            .corrected
            .iter()
            .find(|s| s.timestamp == m.timestamp)
            .unwrap();
        assert!((sample.corrected - m.value).abs() < (sample.raw - m.value).abs());
        assert_abs_diff_eq!(sample.corrected, m.value, epsilon = 1e-9);
    }

    assert!(result.max_drift.is_finite());
    assert!(result.max_drift > 0.0);
}

#[test]
fn parallel_run_matches_sequential_on_ramp() {
    let config = DriftConfig {
        parallel: true,
        ..DriftConfig::default()
    };
    let parallel = correct_drift(&ramp_manual(), &ramp_sensor(), &config).unwrap();
    let sequential = correct_drift(&ramp_manual(), &ramp_sensor(), &DriftConfig::default()).unwrap();
    assert_eq!(parallel, sequential);
}

#[test]
fn manual_after_sensor_record_is_no_overlap() {
    let manual = series(&[(date(5, 1), 10.0), (date(6, 1), 11.0)]);
    let err = correct_drift(&manual, &ramp_sensor(), &DriftConfig::default()).unwrap_err();
    match err {
        DriftError::NoOverlap {
            sensor_end,
            manual_start,
            ..
        } => {
            assert_eq!(sensor_end, date(3, 31));
            assert_eq!(manual_start, date(5, 1));
        }
        other => panic!("expected NoOverlap, got {other:?}"),
    }

    // Just inside the buffer still overlaps.
    let manual = series(&[(date(4, 3), 13.0)]);
    assert!(calculate_breakpoints(&ramp_sensor(), &manual, 3.0).is_ok());
}

#[test]
fn single_start_anchor_zeroes_offset_at_end() {
    let sensor = TimeIndexedSeries::from_observations((0..30).map(|i| (date(1, 1) + Duration::days(i), 10.0 + 0.1 * i as f64)));
    let manual = series(&[(date(1, 1), 9.5)]);
    let result = correct_drift(&manual, &sensor, &DriftConfig::default()).unwrap();

    assert_eq!(result.breakpoints.points, vec![date(1, 1), date(1, 30)]);
    assert_eq!(result.features.len(), 1);
    let segment = &result.features[0];
    assert!(segment.begin_anchor.is_present());
    assert!(!segment.end_anchor.is_present());

    let model = segment.model.unwrap();
    assert_eq!(model.slope_man, 0.0);
    assert_abs_diff_eq!(model.intercept, 0.5, epsilon = 1e-12);

    let first = result.corrected.first().unwrap();
    let last = result.corrected.last().unwrap();
    assert_abs_diff_eq!(first.corrected, 9.5, epsilon = 1e-9);
    assert_abs_diff_eq!(last.correction_with_offset, 0.0, epsilon = 1e-9);
    assert_abs_diff_eq!(last.corrected, last.raw, epsilon = 1e-9);
}

#[test]
fn degenerate_segment_does_not_abort_the_run() {
    let sensor = TimeIndexedSeries::from_observations((0..60).map(|i| (date(1, 1) + Duration::days(i), 10.0 + 0.01 * i as f64)));
    // Duplicate reading at Jan 2; the first one wins.
    let manual = series(&[(date(1, 2), 10.0), (date(1, 2), 10.4), (date(2, 15), 10.5)]);
    assert_eq!(manual.len(), 2);

    let config = DriftConfig::default();
    let bp = calculate_breakpoints(&sensor, &manual, config.day_buffer).unwrap();
    assert_eq!(bp.points, vec![date(1, 1), date(1, 2), date(2, 15), date(3, 1)]);

    match correct_segment(0, &bp, &sensor, &manual, &config) {
        SegmentOutcome::Degenerate { error, features } => {
            assert!(matches!(error, DriftError::DegenerateSegment { segment: 0, .. }));
            assert!(features.model.is_none());
        }
        other => panic!("expected a degenerate segment, got {other:?}"),
    }

    let result = correct_drift(&manual, &sensor, &config).unwrap();
    assert_eq!(result.features.len(), 3);
    assert_eq!(result.features[0].status, SegmentStatus::Degenerate);
    assert_eq!(result.features[1].status, SegmentStatus::Corrected);
    assert_eq!(result.features[2].status, SegmentStatus::Corrected);
    assert_eq!(result.corrected.len(), 59);
    assert!(result.corrected.iter().all(|s| s.corrected.is_finite()));
    assert!(result.corrected.iter().all(|s| s.timestamp > date(1, 1)));
}

#[test]
fn nothing_corrected_is_an_error() {
    // One sensor sample cannot carry a drift slope.
    let sensor = series(&[(date(1, 1), 10.0)]);
    let manual = series(&[(date(1, 3), 10.0)]);
    let err = correct_drift(&manual, &sensor, &DriftConfig::default()).unwrap_err();
    assert_eq!(err, DriftError::NoSegmentsProcessed { segments: 1 });
}

#[test]
fn logger_pulled_after_last_visit_keeps_every_sample() {
    let sensor = TimeIndexedSeries::from_observations((0..31).map(|i| (date(1, 1) + Duration::days(i), 10.0 + 0.01 * i as f64)));
    let manual = series(&[(date(1, 1), 10.0), (date(1, 29), 10.3)]);
    let result = correct_drift(&manual, &sensor, &DriftConfig::default()).unwrap();

    assert_eq!(result.breakpoints.points, vec![date(1, 1), date(1, 29), date(1, 31)]);
    assert_eq!(result.segments_with_status(SegmentStatus::Corrected), 2);
    assert_eq!(result.corrected.len(), 31);

    let tail = &result.features[1];
    assert_eq!(tail.man_beg(), Some(date(1, 29)));
    assert_eq!(tail.end_anchor, Anchor::Shared { nearest: date(1, 29) });

    let at_visit = result.corrected.iter().find(|s| s.timestamp == date(1, 29)).unwrap();
    assert_abs_diff_eq!(at_visit.corrected, 10.3, epsilon = 1e-9);
    let last = result.corrected.last().unwrap();
    assert_abs_diff_eq!(last.corrected, last.raw, epsilon = 1e-9);
}

#[test]
fn large_manual_offset_is_absorbed_by_the_intercept() {
    let sensor = TimeIndexedSeries::from_observations((0..30).map(|i| (date(1, 1) + Duration::days(i), 10.0 + 0.1 * i as f64)));
    let manual = series(&[(date(1, 1), 1e6), (date(1, 30), 1e6)]);
    let result = correct_drift(&manual, &sensor, &DriftConfig::default()).unwrap();

    assert_eq!(result.corrected.len(), 30);
    assert!(result.corrected.iter().all(|s| s.corrected.is_finite()));
    assert_eq!(result.corrected[0].corrected, 1e6);
    assert_abs_diff_eq!(result.corrected[29].corrected, 1e6, epsilon = 1e-6);

    let drift = result.features[0].drift().unwrap();
    assert_abs_diff_eq!(drift, 2.9, epsilon = 1e-9);
    assert!(result.max_drift.is_finite());
    assert_eq!(result.max_drift, drift.abs());
}

#[test]
fn oversized_day_buffer_is_rejected_before_any_work() {
    let config = DriftConfig {
        day_buffer: 1e8,
        ..DriftConfig::default()
    };
    let err = correct_drift(&ramp_manual(), &ramp_sensor(), &config).unwrap_err();
    assert!(matches!(err, DriftError::InvalidConfig(_)));
    assert!(DriftCorrector::from_series(ramp_manual(), ramp_sensor(), config).is_err());
}

#[test]
fn gap_across_breakpoint_is_not_filled() {
    let start = date(1, 1);
    let gap = (date(1, 30) + Duration::hours(18), date(1, 31) + Duration::hours(6));
    let sensor = TimeIndexedSeries::from_observations((0..=236).map(|i| {
        let t = start + Duration::hours(6 * i);
        let v = if t >= gap.0 && t <= gap.1 { f64::NAN } else { 10.0 + 0.002 * i as f64 };
        (t, v)
    }));
    let manual = series(&[(date(1, 1), 10.0), (date(1, 31), 10.2), (date(3, 1), 10.4)]);

    let result = correct_drift(&manual, &sensor, &DriftConfig::default()).unwrap();
    assert_eq!(result.breakpoints.points, vec![date(1, 1), date(1, 31), date(3, 1)]);
    assert_eq!(result.segments_with_status(SegmentStatus::Corrected), 2);
    assert_eq!(result.corrected.len(), 237 - 3);
    assert!(result.corrected.iter().all(|s| s.timestamp < gap.0 || s.timestamp > gap.1));
    assert!(result.corrected.iter().all(|s| s.corrected.is_finite()));

    let seg0 = &result.features[0];
    assert_eq!(seg0.trans_end, date(1, 30) + Duration::hours(12));
    let seg1 = &result.features[1];
    assert_eq!(seg1.trans_beg, date(1, 31) + Duration::hours(12));
}

#[test]
fn exports_and_summary_round_trip() {
    let dir = TempDir::new("well-drift").unwrap();
    let corrector = DriftCorrector::from_series(ramp_manual(), ramp_sensor(), DriftConfig::default()).unwrap();
    let result = corrector.run().unwrap();

    let csv_path = dir.path().join("corrected.csv");
    write_corrected_csv(&csv_path, &result.corrected, "water_level").unwrap();
    let text = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(text.lines().count(), 91);
    assert!(text.starts_with("timestamp,julian,segment,raw,drift_correction,correction_with_offset,water_level\n"));

    let json_path = dir.path().join("summary.json");
    write_summary_json(&json_path, &result, corrector.config()).unwrap();
    let report = read_summary_json(&json_path).unwrap();
    assert_eq!(report.breakpoints, result.breakpoints.points);
    assert_eq!(report.segments.len(), result.features.len());
    for (saved, live) in report.segments.iter().zip(&result.features) {
        assert_eq!(saved.segment, live.segment);
        assert_eq!(saved.status, live.status);
        assert_eq!(saved.begin_anchor.label(), live.begin_anchor.label());
        assert_abs_diff_eq!(saved.drift().unwrap(), live.drift().unwrap(), epsilon = 1e-12);
    }
    assert_eq!(report.corrected_samples, 90);
    assert_abs_diff_eq!(report.max_drift, result.max_drift, epsilon = 1e-12);
}

#[test]
fn csv_pipeline_end_to_end() {
    let dir = TempDir::new("well-drift").unwrap();
    let sensor = TimeTable::from_series("level", &ramp_sensor());
    let manual = TimeTable::from_series("measured_level", &ramp_manual());
    let sensor_path = dir.path().join("sensor.csv");
    let manual_path = dir.path().join("manual.csv");
    write_table_csv(&sensor_path, &sensor, "DateTime").unwrap();
    write_table_csv(&manual_path, &manual, "ReadingDate").unwrap();

    let args = CorrectArgs {
        sensor: sensor_path,
        manual: manual_path,
        sensor_time_column: None,
        manual_time_column: None,
        drift_field: "Level".to_string(),
        manual_field: "measured_level".to_string(),
        output_field: "water_level".to_string(),
        day_buffer: 3.0,
        trim_end: false,
        jump_tol: 0.5,
        trim_window: 50,
        parallel: false,
        export: None,
        export_table: None,
        export_json: None,
    };
    let config = config_from_args(&args);
    let run = run_correction(&args, &config).unwrap();
    assert_eq!(run.sensor.time_column, "datetime");
    assert_eq!(run.manual.time_column, "readingdate");
    assert_eq!(run.correction.corrected.len(), 90);

    let args = CorrectArgs {
        drift_field: "pressure".to_string(),
        ..args
    };
    let err = run_correction(&args, &config_from_args(&args)).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}
