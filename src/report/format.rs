//! Formatted terminal output: run summary, drift table, breakpoints.
//!
//! Formatting lives here so the correction code stays free of presentation
//! concerns and output changes stay localized.

use chrono::NaiveDateTime;

use crate::domain::{Anchor, DriftConfig, DriftFeatures, DriftReportFile, SegmentStatus};
use crate::drift::{Breakpoints, DriftCorrection};
use crate::io::export::fmt_opt;
use crate::io::ingest::IngestedTable;

const TS_FMT: &str = "%Y-%m-%d %H:%M";

/// One line describing an ingested CSV.
pub fn format_ingest(label: &str, ingest: &IngestedTable) -> String {
    format!(
        "{label}: rows={} used={} skipped={} | time column `{}` | fields [{}]",
        ingest.rows_read,
        ingest.rows_used,
        ingest.row_errors.len(),
        ingest.time_column,
        ingest.table.columns().join(", "),
    )
}

/// Format the run summary (config + segment counts + max drift).
pub fn format_run_summary(correction: &DriftCorrection, config: &DriftConfig) -> String {
    let mut out = String::new();

    out.push_str("=== drift - Transducer Drift Correction ===\n");
    out.push_str(&format!(
        "Fields: {} -> {} (reference: {})\n",
        config.drifting_field, config.output_field, config.manual_field
    ));
    out.push_str(&format!("Day buffer: {} d\n", config.day_buffer));
    if config.trim_end {
        out.push_str(&format!(
            "Edge trimming: jump_tol={} window={}\n",
            config.jump_tol, config.trim_window
        ));
    }

    let bp = &correction.breakpoints;
    if let Some((start, end)) = bp.date_range() {
        out.push_str(&format!(
            "Breakpoints: n={} | {} .. {} | mean segment {:.2} d\n",
            bp.points.len(),
            start.format(TS_FMT),
            end.format(TS_FMT),
            bp.mean_segment_days(),
        ));
    }

    out.push_str(&format!(
        "Segments: corrected={} pass-through={} degenerate={} empty={}\n",
        correction.segments_with_status(SegmentStatus::Corrected),
        correction.segments_with_status(SegmentStatus::PassThrough),
        correction.segments_with_status(SegmentStatus::Degenerate),
        bp.segment_count().saturating_sub(correction.features.len()),
    ));
    out.push_str(&format!("Corrected samples: {}\n", correction.corrected.len()));
    out.push_str(&format!("Max drift: {:.4}\n", correction.max_drift));

    out
}

/// Format the per-segment drift table.
pub fn format_drift_table(features: &[DriftFeatures]) -> String {
    let mut out = String::new();
    out.push_str(
        format!(
            "{:>4} {:<12} {:<16} {:<16} {:>7} {:<6} {:<6} {:>12} {:>12} {:>10} {:>10}",
            "seg", "status", "t_beg", "t_end", "n", "beg", "end", "slope", "slope_man", "intercept", "drift"
        )
        .trim_end(),
    );
    out.push('\n');
    out.push_str(
        format!(
            "{:-<4} {:-<12} {:-<16} {:-<16} {:-<7} {:-<6} {:-<6} {:-<12} {:-<12} {:-<10} {:-<10}",
            "", "", "", "", "", "", "", "", "", "", ""
        )
        .trim_end(),
    );
    out.push('\n');

    for f in features {
        let model = f.model;
        out.push_str(
            format!(
                "{:>4} {:<12} {:<16} {:<16} {:>7} {:<6} {:<6} {:>12} {:>12} {:>10} {:>10}",
                f.segment,
                f.status.label(),
                f.t_beg.format(TS_FMT).to_string(),
                f.t_end.format(TS_FMT).to_string(),
                f.samples,
                anchor_mark(&f.begin_anchor),
                anchor_mark(&f.end_anchor),
                fmt_opt(model.map(|m| m.slope), 6, "-"),
                fmt_opt(model.map(|m| m.slope_man), 6, "-"),
                fmt_opt(model.map(|m| m.intercept), 4, "-"),
                fmt_opt(model.map(|m| m.drift), 4, "-"),
            )
            .trim_end(),
        );
        out.push('\n');
    }

    out
}

/// Format breakpoint placement diagnostics.
pub fn format_breakpoints(breakpoints: &Breakpoints) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Manual readings in sensor window: {}\n",
        breakpoints.manual_in_window
    ));
    out.push_str(&format!(
        "Accepted: {} | suppressed: {}\n",
        breakpoints.accepted.len(),
        breakpoints.suppressed.len()
    ));

    out.push_str("\nBreakpoints:\n");
    for (i, ts) in breakpoints.points.iter().enumerate() {
        let source = breakpoints
            .accepted
            .iter()
            .find(|c| c.manual == *ts)
            .map(|c| format!("manual (closest sensor {}, {:+.3} d)", c.closest_sensor.format(TS_FMT), c.delta_days))
            .unwrap_or_else(|| "sensor record edge".to_string());
        out.push_str(&format!("{i:>4}  {}  {source}\n", ts.format(TS_FMT)));
    }

    if !breakpoints.suppressed.is_empty() {
        out.push_str("\nSuppressed (within day buffer of an earlier reading):\n");
        for c in &breakpoints.suppressed {
            out.push_str(&format!("      {}\n", c.manual.format(TS_FMT)));
        }
    }

    out
}

/// Format a saved summary JSON for `drift show`.
pub fn format_report_file(report: &DriftReportFile) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== {} summary ===\n", report.tool));
    out.push_str(&format!(
        "Fields: {} -> {} (reference: {})\n",
        report.drifting_field, report.output_field, report.manual_field
    ));
    out.push_str(&format!("Day buffer: {} d\n", report.day_buffer));
    out.push_str(&format!(
        "Breakpoints: {} | {}\n",
        report.breakpoints.len(),
        fmt_range(report.breakpoints.first(), report.breakpoints.last())
    ));
    out.push_str(&format!("Corrected samples: {}\n", report.corrected_samples));
    out.push_str(&format!("Max drift: {:.4}\n\n", report.max_drift));
    out.push_str(&format_drift_table(&report.segments));
    out
}

fn fmt_range(start: Option<&NaiveDateTime>, end: Option<&NaiveDateTime>) -> String {
    match (start, end) {
        (Some(s), Some(e)) => format!("{} .. {}", s.format(TS_FMT), e.format(TS_FMT)),
        _ => "-".to_string(),
    }
}

fn anchor_mark(anchor: &Anchor) -> &'static str {
    match anchor {
        Anchor::Present(_) => "yes",
        Anchor::Shared { .. } => "shared",
        Anchor::OutOfTolerance { .. } | Anchor::Unavailable => "no",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::DriftModel;
    use chrono::NaiveDate;

    fn ts(d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2023, 1, d).unwrap().and_hms_opt(0, 0, 0).unwrap()
    }

    fn row(segment: usize, status: SegmentStatus, model: Option<DriftModel>) -> DriftFeatures {
        DriftFeatures {
            segment,
            status,
            t_beg: ts(1),
            t_end: ts(10),
            trans_beg: ts(1),
            trans_end: ts(10),
            first_trans: 1.0,
            last_trans: 1.2,
            begin_anchor: Anchor::Unavailable,
            end_anchor: Anchor::Unavailable,
            samples: 10,
            model,
        }
    }

    #[test]
    fn drift_table_has_one_line_per_segment() {
        let rows = vec![
            row(0, SegmentStatus::Corrected, Some(DriftModel { drift: 0.2, ..DriftModel::ZERO })),
            row(1, SegmentStatus::Degenerate, None),
        ];
        let text = format_drift_table(&rows);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("corrected"));
        assert!(lines[2].ends_with("0.2000"));
        assert!(lines[3].contains("degenerate"));
        assert!(lines[3].ends_with('-'));
    }

    #[test]
    fn shared_anchor_is_marked_in_table() {
        let mut shared = row(0, SegmentStatus::Corrected, Some(DriftModel::ZERO));
        shared.end_anchor = Anchor::Shared { nearest: ts(1) };
        let text = format_drift_table(&[shared]);
        let line = text.lines().nth(2).unwrap();
        assert!(line.contains(" no "));
        assert!(line.contains(" shared "));
    }

    #[test]
    fn breakpoints_list_edges_and_manuals() {
        let bp = Breakpoints {
            points: vec![ts(1), ts(5), ts(10)],
            accepted: vec![crate::drift::BreakpointCandidate {
                manual: ts(5),
                closest_sensor: ts(5),
                delta_days: 0.0,
            }],
            suppressed: Vec::new(),
            manual_in_window: 1,
        };
        let text = format_breakpoints(&bp);
        assert_eq!(text.matches("sensor record edge").count(), 2);
        assert!(text.contains("manual (closest sensor 2023-01-05 00:00"));
        assert!(!text.contains("Suppressed"));
    }
}
