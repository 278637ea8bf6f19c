//! CSV ingest for sensor and manual tables.
//!
//! This module turns a logger export or a field-visit sheet into a `TimeTable`:
//! - one timestamp column (named explicitly or auto-detected)
//! - every other column parsed as a numeric field
//!
//! Design goals:
//! - **Row-level validation** (skip rows with bad timestamps, but report what happened)
//! - **Missing values stay missing** (blank/unparseable numbers become `NaN`)
//! - **Separation of concerns**: no correction logic here

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::StringRecord;
use tracing::{debug, warn};

use crate::error::AppError;
use crate::series::{TimeTable, parse_timestamp};

/// Timestamp column names tried, in order, when none is given.
const TIME_COLUMNS: [&str; 6] = ["datetime", "timestamp", "date_time", "readingdate", "date", "time"];

/// A row-level error encountered during ingest.
#[derive(Debug, Clone)]
pub struct RowError {
    pub line: usize,
    pub message: String,
}

/// Ingest output: table + resolved timestamp column + row errors.
#[derive(Debug, Clone)]
pub struct IngestedTable {
    pub table: TimeTable,
    pub time_column: String,
    pub row_errors: Vec<RowError>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load a CSV file into a `TimeTable`.
pub fn load_time_table(path: &Path, time_column: Option<&str>) -> Result<IngestedTable, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::new(2, format!("Failed to open CSV '{}': {e}", path.display())))?;
    let ingested = read_time_table(file, time_column)?;
    if !ingested.row_errors.is_empty() {
        warn!(
            "{}: skipped {} of {} rows",
            path.display(),
            ingested.row_errors.len(),
            ingested.rows_read
        );
    }
    Ok(ingested)
}

/// Read CSV from any reader into a `TimeTable`.
pub fn read_time_table<R: Read>(reader: R, time_column: Option<&str>) -> Result<IngestedTable, AppError> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = reader
        .headers()
        .map_err(|e| AppError::new(2, format!("Failed to read CSV headers: {e}")))?
        .clone();
    let header_map = build_header_map(&headers);

    let (time_column, time_idx) = resolve_time_column(time_column, &header_map)?;

    let value_columns: Vec<(usize, String)> = headers
        .iter()
        .enumerate()
        .filter(|(idx, _)| *idx != time_idx)
        .map(|(idx, name)| (idx, normalize_header_name(name)))
        .filter(|(_, name)| !name.is_empty())
        .collect();

    let mut table = TimeTable::new(value_columns.iter().map(|(_, name)| name.clone()));
    let mut row_errors = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: header is line 1 and records() is 0-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                row_errors.push(RowError {
                    line,
                    message: format!("CSV parse error: {e}"),
                });
                continue;
            }
        };

        let timestamp = match record.get(time_idx).map(parse_timestamp) {
            Some(Ok(ts)) => ts,
            Some(Err(e)) => {
                debug!("line {line}: {e}");
                row_errors.push(RowError { line, message: e });
                continue;
            }
            None => {
                row_errors.push(RowError {
                    line,
                    message: format!("Missing `{time_column}` value."),
                });
                continue;
            }
        };

        let values = value_columns
            .iter()
            .map(|(col, _)| parse_value(record.get(*col)))
            .collect();
        table.push_row(timestamp, values);
    }

    let rows_used = table.len();
    if rows_used == 0 {
        warn!("No rows with a valid `{time_column}` timestamp were found");
    }

    Ok(IngestedTable {
        table,
        time_column,
        row_errors,
        rows_read,
        rows_used,
    })
}

fn build_header_map(headers: &StringRecord) -> HashMap<String, usize> {
    headers
        .iter()
        .enumerate()
        .map(|(idx, name)| (normalize_header_name(name), idx))
        .collect()
}

fn normalize_header_name(name: &str) -> String {
    // Spreadsheet exports often prefix the first header with a UTF-8 BOM.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn resolve_time_column(
    requested: Option<&str>,
    header_map: &HashMap<String, usize>,
) -> Result<(String, usize), AppError> {
    if let Some(name) = requested {
        let name = normalize_header_name(name);
        return match header_map.get(&name) {
            Some(&idx) => Ok((name, idx)),
            None => Err(AppError::new(2, format!("Missing timestamp column: `{name}`"))),
        };
    }

    TIME_COLUMNS
        .iter()
        .find_map(|c| header_map.get(*c).map(|&idx| (c.to_string(), idx)))
        .ok_or_else(|| {
            AppError::new(
                2,
                format!(
                    "Could not find a timestamp column (tried: {}). Use `--sensor-time-column`/`--manual-time-column`.",
                    TIME_COLUMNS.join(", ")
                ),
            )
        })
}

fn parse_value(s: Option<&str>) -> f64 {
    s.map(str::trim)
        .filter(|s| !s.is_empty())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}
