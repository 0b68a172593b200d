//! Target format writers.
//!
//! The target extension picks one variant of the closed [`OutputFormat`]
//! set; each variant has a [`TableWriter`] that knows how to lay out a
//! whole table in one file or one column per file.

pub mod delimited;
pub mod mat;
pub mod npy;

pub use delimited::DelimitedWriter;
pub use mat::MatWriter;
pub use npy::NpyWriter;

use crate::error::Result;
use crate::extractor::ExtractedTable;
use crate::naming::OutputTargets;
use clap::ValueEnum;
use log::{debug, error, warn};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// NumPy arrays (.npy, or .npz when compressed)
    #[default]
    Npy,
    /// MATLAB level 5 MAT files
    Mat,
    /// Delimited text
    Csv,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Npy => "npy",
            OutputFormat::Mat => "mat",
            OutputFormat::Csv => "csv",
        }
    }

    pub fn from_extension(extension: &str) -> Option<Self> {
        match extension.trim_start_matches('.').to_lowercase().as_str() {
            "npy" => Some(OutputFormat::Npy),
            "mat" => Some(OutputFormat::Mat),
            "csv" => Some(OutputFormat::Csv),
            _ => None,
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Serializes an [`ExtractedTable`] into one container format.
pub trait TableWriter {
    /// Checks done before any byte is written.
    fn validate(&self, _table: &ExtractedTable, _labels: &[String]) -> Result<()> {
        Ok(())
    }

    /// Write the whole table into `path`. Returns the files actually written.
    fn write_single(
        &self,
        table: &ExtractedTable,
        path: &Path,
        labels: &[String],
        compress: bool,
    ) -> Result<Vec<PathBuf>>;

    /// Write column `n` into `paths[n]`. Returns the files actually written.
    fn write_split(
        &self,
        table: &ExtractedTable,
        paths: &[PathBuf],
        labels: &[String],
        compress: bool,
    ) -> Result<Vec<PathBuf>>;
}

#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    Written(Vec<PathBuf>),
    /// The target extension has no writer; nothing was written.
    Skipped { extension: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct WriterSettings {
    pub csv_delimiter: u8,
}

impl Default for WriterSettings {
    fn default() -> Self {
        Self { csv_delimiter: b' ' }
    }
}

/// Write `table` to `targets` with default settings.
pub fn write(
    table: &ExtractedTable,
    targets: &OutputTargets,
    labels: &[String],
    compress: bool,
) -> Result<WriteOutcome> {
    write_with(table, targets, labels, compress, &WriterSettings::default())
}

pub fn write_with(
    table: &ExtractedTable,
    targets: &OutputTargets,
    labels: &[String],
    compress: bool,
    settings: &WriterSettings,
) -> Result<WriteOutcome> {
    let extension = targets.extension().unwrap_or_default();
    let Some(format) = OutputFormat::from_extension(&extension) else {
        error!("Target format .{} not supported", extension);
        return Ok(WriteOutcome::Skipped { extension });
    };

    debug!("Writing {} target(s) as {}", targets.paths().len(), format);

    match format {
        OutputFormat::Npy => run(&NpyWriter, table, targets, labels, compress),
        OutputFormat::Mat => run(&MatWriter, table, targets, labels, compress),
        OutputFormat::Csv => run(
            &DelimitedWriter::new(settings.csv_delimiter),
            table,
            targets,
            labels,
            compress,
        ),
    }
}

fn run<W: TableWriter>(
    writer: &W,
    table: &ExtractedTable,
    targets: &OutputTargets,
    labels: &[String],
    compress: bool,
) -> Result<WriteOutcome> {
    writer.validate(table, labels)?;

    let written = match targets {
        OutputTargets::Single(path) => writer.write_single(table, path, labels, compress)?,
        OutputTargets::Split(paths) => writer.write_split(table, paths, labels, compress)?,
    };

    Ok(WriteOutcome::Written(written))
}

/// Whether `labels` can name every column one to one.
pub(crate) fn labels_match(table: &ExtractedTable, labels: &[String]) -> bool {
    labels.len() == table.column_count()
}

/// One `(label, column)` pair per distinct label, in first-seen order. A
/// repeated label keeps the column given last.
pub(crate) fn keyed_columns<'a>(
    table: &'a ExtractedTable,
    labels: &'a [String],
) -> Vec<(&'a str, &'a [f64])> {
    let mut keyed: Vec<(&str, &[f64])> = Vec::with_capacity(labels.len());
    for (label, column) in labels.iter().zip(table.columns()) {
        match keyed.iter_mut().find(|(key, _)| *key == label.as_str()) {
            Some(entry) => {
                warn!("Duplicate label '{}', the later column replaces the earlier one", label);
                entry.1 = column.as_slice();
            }
            None => keyed.push((label.as_str(), column.as_slice())),
        }
    }
    keyed
}


#[cfg(test)]
mod tests {
    use super::test_support::{labels, sample_table};
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(OutputFormat::from_extension("npy"), Some(OutputFormat::Npy));
        assert_eq!(OutputFormat::from_extension(".MAT"), Some(OutputFormat::Mat));
        assert_eq!(OutputFormat::from_extension("csv"), Some(OutputFormat::Csv));
        assert_eq!(OutputFormat::from_extension("h5"), None);
        assert_eq!(OutputFormat::Mat.to_string(), "mat");
    }

    #[test]
    fn test_unsupported_extension_is_skipped() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.h5");
        let outcome = write(
            &sample_table(3),
            &OutputTargets::Single(target.clone()),
            &labels(&["t", "a", "b"]),
            false,
        )
        .unwrap();

        assert_eq!(
            outcome,
            WriteOutcome::Skipped {
                extension: "h5".to_string()
            }
        );
        assert!(!target.exists());
    }

    #[test]
    fn test_dispatch_by_extension() {
        let dir = TempDir::new().unwrap();
        let target = dir.path().join("out.csv");
        let outcome = write(
            &sample_table(3),
            &OutputTargets::Single(target.clone()),
            &labels(&["t", "a", "b"]),
            false,
        )
        .unwrap();

        assert_eq!(outcome, WriteOutcome::Written(vec![target.clone()]));
        assert!(std::fs::read_to_string(target).unwrap().starts_with("t a b\n"));
    }

    #[test]
    fn test_keyed_columns_last_duplicate_wins() {
        let table = sample_table(3);
        let names = labels(&["x", "volt", "x"]);
        let keyed = keyed_columns(&table, &names);

        assert_eq!(keyed.len(), 2);
        assert_eq!(keyed[0], ("x", table.column(2)));
        assert_eq!(keyed[1], ("volt", table.column(1)));
    }
}
