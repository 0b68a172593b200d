use super::{labels_match, TableWriter};
use crate::error::Result;
use crate::extractor::ExtractedTable;
use csv::{QuoteStyle, Writer, WriterBuilder};
use log::debug;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Writes delimited text: a header of labels, then one line per row.
///
/// Values use the same `%.18e` notation as `numpy.savetxt`.
#[derive(Debug)]
pub struct DelimitedWriter {
    delimiter: u8,
}

impl Default for DelimitedWriter {
    fn default() -> Self {
        Self::new(b' ')
    }
}

impl DelimitedWriter {
    pub fn new(delimiter: u8) -> Self {
        Self { delimiter }
    }

    fn open(&self, path: &Path) -> Result<Writer<File>> {
        Ok(WriterBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .has_headers(false)
            .quote_style(QuoteStyle::Never)
            .from_path(path)?)
    }
}

impl TableWriter for DelimitedWriter {
    fn write_single(
        &self,
        table: &ExtractedTable,
        path: &Path,
        labels: &[String],
        compress: bool,
    ) -> Result<Vec<PathBuf>> {
        if compress {
            debug!("Compression is not available for delimited text, ignored");
        }

        let mut writer = self.open(path)?;
        if !labels.is_empty() {
            writer.write_record(labels)?;
        }
        for r in 0..table.rows() {
            writer.write_record(table.row(r).map(format_value))?;
        }
        writer.flush()?;

        Ok(vec![path.to_path_buf()])
    }

    fn write_split(
        &self,
        table: &ExtractedTable,
        paths: &[PathBuf],
        labels: &[String],
        compress: bool,
    ) -> Result<Vec<PathBuf>> {
        if compress {
            debug!("Compression is not available for delimited text, ignored");
        }

        let with_header = labels_match(table, labels);
        for (n, path) in paths.iter().enumerate() {
            let mut writer = self.open(path)?;
            if with_header {
                writer.write_record([&labels[n]])?;
            }
            for &value in table.column(n) {
                writer.write_record([format_value(value)])?;
            }
            writer.flush()?;
        }

        Ok(paths.to_vec())
    }
}

/// `1.000000000000000000e+00` style scientific notation.
pub fn format_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let formatted = format!("{:.18e}", value);
    match formatted.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{}e{}{:02}", mantissa, sign, exponent.abs())
        }
        None => formatted,
    }
}
