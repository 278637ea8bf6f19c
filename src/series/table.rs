//! Multi-column tables indexed by timestamp.
//!
//! Raw-file decoders and the CSV ingest produce a `TimeTable`; the correction
//! engine pulls single-field `TimeIndexedSeries` out of it.

use chrono::NaiveDateTime;

use crate::series::indexed::{SeriesPoint, TimeIndexedSeries};

#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    pub timestamp: NaiveDateTime,
    /// One value per table column; `NaN` marks a missing value.
    pub values: Vec<f64>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TimeTable {
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

impl TimeTable {
    pub fn new<S: Into<String>>(columns: impl IntoIterator<Item = S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Build a single-column table from an existing series.
    pub fn from_series(column: impl Into<String>, series: &TimeIndexedSeries) -> Self {
        let mut table = Self::new([column.into()]);
        for p in series.iter() {
            table.push_row(p.timestamp, vec![p.value]);
        }
        table
    }

    /// Append a row. Missing trailing values are filled with `NaN`; extras are dropped.
    pub fn push_row(&mut self, timestamp: NaiveDateTime, mut values: Vec<f64>) {
        values.resize(self.columns.len(), f64::NAN);
        self.rows.push(TableRow { timestamp, values });
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[TableRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Case-insensitive column lookup.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        let name = name.trim();
        self.columns.iter().position(|c| c.eq_ignore_ascii_case(name))
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Extract one column as a normalized series (missing values kept as `NaN`).
    pub fn series(&self, column: &str) -> Option<TimeIndexedSeries> {
        let idx = self.column_index(column)?;
        let points = self
            .rows
            .iter()
            .map(|r| SeriesPoint::new(r.timestamp, r.values.get(idx).copied().unwrap_or(f64::NAN)))
            .collect();
        Some(TimeIndexedSeries::from_points(points))
    }
}
