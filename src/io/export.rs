//! Export corrected series, drift tables and cleaned tables to CSV.
//!
//! The exports are meant to be easy to consume in spreadsheets or downstream scripts.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use chrono::NaiveDateTime;

use crate::domain::{CorrectedSample, DriftFeatures};
use crate::error::AppError;
use crate::series::TimeTable;

const TS_FMT: &str = "%Y-%m-%d %H:%M:%S";

/// Write the corrected series to a CSV file.
pub fn write_corrected_csv(path: &Path, samples: &[CorrectedSample], output_field: &str) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_corrected(&mut out, samples, output_field)?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))
}

pub fn write_corrected<W: Write>(out: &mut W, samples: &[CorrectedSample], output_field: &str) -> Result<(), AppError> {
    writeln!(
        out,
        "timestamp,julian,segment,raw,drift_correction,correction_with_offset,{output_field}"
    )
    .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for s in samples {
        writeln!(
            out,
            "{},{:.6},{},{:.4},{:.6},{:.6},{:.4}",
            s.timestamp.format(TS_FMT),
            s.julian,
            s.segment,
            s.raw,
            s.drift_correction,
            s.correction_with_offset,
            s.corrected,
        )
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }
    Ok(())
}

/// Write the per-segment drift table to a CSV file.
pub fn write_drift_table_csv(path: &Path, features: &[DriftFeatures]) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create drift table '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_drift_table(&mut out, features)?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush drift table: {e}")))
}

pub fn write_drift_table<W: Write>(out: &mut W, features: &[DriftFeatures]) -> Result<(), AppError> {
    writeln!(
        out,
        "segment,status,t_beg,t_end,trans_beg,trans_end,man_beg,man_end,first_trans,last_trans,\
         first_meas,last_meas,begin_anchor,end_anchor,samples,slope_man,slope_trans,slope,intercept,drift"
    )
    .map_err(|e| AppError::new(2, format!("Failed to write drift table header: {e}")))?;

    for f in features {
        let model = f.model;
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{:.4},{:.4},{},{},{},{},{},{},{},{},{},{}",
            f.segment,
            f.status.label(),
            f.t_beg.format(TS_FMT),
            f.t_end.format(TS_FMT),
            f.trans_beg.format(TS_FMT),
            f.trans_end.format(TS_FMT),
            fmt_opt_ts(f.man_beg()),
            fmt_opt_ts(f.man_end()),
            f.first_trans,
            f.last_trans,
            fmt_opt(f.first_meas(), 4, ""),
            fmt_opt(f.last_meas(), 4, ""),
            f.begin_anchor.label(),
            f.end_anchor.label(),
            f.samples,
            fmt_opt(model.map(|m| m.slope_man), 8, ""),
            fmt_opt(model.map(|m| m.slope_trans), 8, ""),
            fmt_opt(model.map(|m| m.slope), 8, ""),
            fmt_opt(model.map(|m| m.intercept), 6, ""),
            fmt_opt(model.map(|m| m.drift), 6, ""),
        )
        .map_err(|e| AppError::new(2, format!("Failed to write drift table row: {e}")))?;
    }
    Ok(())
}

/// Write a time table (one timestamp column + value columns) to CSV.
///
/// Missing values are written as empty cells so the file reads back the same way.
pub fn write_table_csv(path: &Path, table: &TimeTable, time_column: &str) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);
    write_table(&mut out, table, time_column)?;
    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush CSV: {e}")))
}

pub fn write_table<W: Write>(out: &mut W, table: &TimeTable, time_column: &str) -> Result<(), AppError> {
    let mut header = vec![time_column.to_string()];
    header.extend(table.columns().iter().cloned());
    writeln!(out, "{}", header.join(","))
        .map_err(|e| AppError::new(2, format!("Failed to write CSV header: {e}")))?;

    for row in table.rows() {
        let mut cells = vec![row.timestamp.format(TS_FMT).to_string()];
        cells.extend(
            row.values
                .iter()
                .map(|v| if v.is_finite() { format!("{v:.6}") } else { String::new() }),
        );
        writeln!(out, "{}", cells.join(","))
            .map_err(|e| AppError::new(2, format!("Failed to write CSV row: {e}")))?;
    }
    Ok(())
}

fn fmt_opt_ts(ts: Option<NaiveDateTime>) -> String {
    ts.map(|t| t.format(TS_FMT).to_string()).unwrap_or_default()
}

/// Fixed-precision float, or `missing` for `None`.
pub(crate) fn fmt_opt(v: Option<f64>, precision: usize, missing: &str) -> String {
    v.map(|v| format!("{v:.precision$}"))
        .unwrap_or_else(|| missing.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Anchor, DriftModel, ManualAnchor, SegmentStatus};
    use chrono::NaiveDate;

    fn ts(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    #[test]
    fn corrected_csv_uses_output_field_header() {
        let sample = CorrectedSample {
            timestamp: ts(1),
            julian: 2_459_945.5,
            segment: 0,
            raw: 10.25,
            drift_correction: 0.0,
            correction_with_offset: 0.25,
            corrected: 10.0,
        };
        let mut buf = Vec::new();
        write_corrected(&mut buf, &[sample], "water_level").unwrap();
        let text = String::from_utf8(buf).unwrap();
        let mut lines = text.lines();
        assert!(lines.next().unwrap().ends_with(",water_level"));
        assert_eq!(
            lines.next().unwrap(),
            "2023-01-01 00:00:00,2459945.500000,0,10.2500,0.000000,0.250000,10.0000"
        );
    }

    #[test]
    fn degenerate_rows_leave_model_columns_blank() {
        let row = DriftFeatures {
            segment: 3,
            status: SegmentStatus::Degenerate,
            t_beg: ts(1),
            t_end: ts(2),
            trans_beg: ts(1),
            trans_end: ts(1),
            first_trans: 1.0,
            last_trans: 1.0,
            begin_anchor: Anchor::Present(ManualAnchor {
                timestamp: ts(2),
                julian: 0.0,
                value: 1.5,
            }),
            end_anchor: Anchor::Unavailable,
            samples: 1,
            model: None,
        };
        let mut buf = Vec::new();
        write_drift_table(&mut buf, &[row.clone()]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let line = text.lines().nth(1).unwrap();
        assert!(line.starts_with("3,degenerate,"));
        assert!(line.ends_with(",1,,,,,"));
        assert!(line.contains(",1.5000,,present,unavailable,"));

        let corrected = DriftFeatures {
            status: SegmentStatus::Corrected,
            model: Some(DriftModel { drift: 0.5, ..DriftModel::ZERO }),
            ..row
        };
        let mut buf = Vec::new();
        write_drift_table(&mut buf, &[corrected]).unwrap();
        assert!(String::from_utf8(buf).unwrap().trim_end().ends_with(",0.500000"));
    }

    #[test]
    fn table_csv_reads_back() {
        let mut table = TimeTable::new(["level"]);
        table.push_row(ts(1), vec![1.25]);
        table.push_row(ts(2), vec![f64::NAN]);
        let mut buf = Vec::new();
        write_table(&mut buf, &table, "datetime").unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert_eq!(text, "datetime,level\n2023-01-01 00:00:00,1.250000\n2023-01-02 00:00:00,\n");

        let ingested = crate::io::ingest::read_time_table(text.as_bytes(), None).unwrap();
        assert_eq!(ingested.rows_used, 2);
        let level = ingested.table.series("level").unwrap();
        assert_eq!(level.drop_missing().len(), 1);
    }
}
