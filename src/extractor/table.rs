use chrono::{DateTime, FixedOffset};
use serde::Serialize;

/// Name given to the synthesized time column.
pub const TIME_COLUMN: &str = "time";

/// Per-column metadata carried alongside the extracted samples.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMeta {
    /// Channel path such as `/'Untitled'/'ch0'`, or `time`.
    pub name: String,
    pub unit: Option<String>,
    pub start_time: Option<DateTime<FixedOffset>>,
    pub start_offset: Option<f64>,
    pub increment: Option<f64>,
}

impl ColumnMeta {
    pub fn time() -> Self {
        Self {
            name: TIME_COLUMN.to_string(),
            unit: None,
            start_time: None,
            start_offset: None,
            increment: None,
        }
    }

    pub fn is_time(&self) -> bool {
        self.name == TIME_COLUMN
    }

    pub fn has_waveform_timing(&self) -> bool {
        self.start_time.is_some()
    }
}

/// A rectangular numeric table, stored column-major.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedTable {
    rows: usize,
    columns: Vec<Vec<f64>>,
    meta: Vec<ColumnMeta>,
}

impl ExtractedTable {
    pub fn new(rows: usize) -> Self {
        Self {
            rows,
            columns: Vec::new(),
            meta: Vec::new(),
        }
    }

    /// Append a column. Callers guarantee `data.len() == self.rows()`.
    pub(crate) fn push_column(&mut self, data: Vec<f64>, meta: ColumnMeta) {
        debug_assert_eq!(data.len(), self.rows);
        self.columns.push(data);
        self.meta.push(meta);
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn column(&self, index: usize) -> &[f64] {
        &self.columns[index]
    }

    pub fn columns(&self) -> &[Vec<f64>] {
        &self.columns
    }

    pub fn meta(&self) -> &[ColumnMeta] {
        &self.meta
    }

    pub fn has_time_track(&self) -> bool {
        self.meta.first().is_some_and(ColumnMeta::is_time)
    }

    /// Values of one row, in column order.
    pub fn row(&self, index: usize) -> impl Iterator<Item = f64> + '_ {
        self.columns.iter().map(move |column| column[index])
    }

    /// All values in row-major (C) order.
    pub fn row_major(&self) -> Vec<f64> {
        let mut values = Vec::with_capacity(self.rows * self.columns.len());
        for r in 0..self.rows {
            values.extend(self.row(r));
        }
        values
    }
}
