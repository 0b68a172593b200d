//! Output file names and column labels.
//!
//! Names combine the source stem, the recording start time and, in split
//! mode, the column label: `dev2_1-20200708-100304.npy` or
//! `dev2_1-20200708-100304-ch0.csv`.

use crate::error::{Result, Tdms2xError};
use crate::extractor::ColumnMeta;
use crate::tdms::split_object_path;
use chrono::{DateTime, FixedOffset};
use std::path::{Path, PathBuf};

const TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S";

/// Where outputs go and what they are called, beyond the defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NamingOptions {
    /// Directory for outputs, the source's own directory when unset.
    pub output_dir: Option<PathBuf>,
    /// Replaces the source file stem in output names.
    pub file_prefix: Option<String>,
}

impl NamingOptions {
    pub fn with_output_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.output_dir = Some(dir.into());
        self
    }

    pub fn with_file_prefix<S: Into<String>>(mut self, prefix: S) -> Self {
        self.file_prefix = Some(prefix.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum OutputTargets {
    Single(PathBuf),
    /// One path per column, in column order.
    Split(Vec<PathBuf>),
}

impl OutputTargets {
    pub fn paths(&self) -> Vec<&Path> {
        match self {
            OutputTargets::Single(path) => vec![path.as_path()],
            OutputTargets::Split(paths) => paths.iter().map(PathBuf::as_path).collect(),
        }
    }

    pub fn is_split(&self) -> bool {
        matches!(self, OutputTargets::Split(_))
    }

    /// Extension of the first target, without the dot.
    pub fn extension(&self) -> Option<String> {
        self.paths()
            .first()
            .and_then(|p| p.extension())
            .map(|e| e.to_string_lossy().to_string())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NamingPlan {
    pub targets: OutputTargets,
    pub labels: Vec<String>,
}

/// Display label for a column name: the text after the last `/` once TDMS
/// quoting is removed, so `/'Untitled'/'ch0'` becomes `ch0` and
/// `/'dev2'/'Dev2/ai0'` becomes `ai0`.
pub fn label_from_name(name: &str) -> String {
    let unquoted = if name.starts_with("/'") {
        split_object_path(name).pop()
    } else {
        None
    };
    let name = unquoted.as_deref().unwrap_or(name);
    name.rsplit('/').next().unwrap_or(name).to_string()
}

/// Label as it appears inside a file name; path separators become `_`.
fn file_label(label: &str) -> String {
    label.replace(['/', '\\'], "_")
}

/// Resolve one label per column. User names are padded or truncated to the
/// column count; empty slots take the label derived from the column name.
pub fn reconcile_labels(user_names: &[String], metadata: &[ColumnMeta]) -> Vec<String> {
    metadata
        .iter()
        .enumerate()
        .map(|(n, meta)| match user_names.get(n) {
            Some(name) if !name.is_empty() => name.clone(),
            _ => label_from_name(&meta.name),
        })
        .collect()
}

pub fn plan_names(
    input_path: &Path,
    metadata: &[ColumnMeta],
    user_names: &[String],
    split: bool,
    extension: &str,
    options: &NamingOptions,
) -> Result<NamingPlan> {
    let labels = reconcile_labels(user_names, metadata);

    // the first non-time column carries the recording start
    let first_channel = match metadata.first() {
        Some(meta) if meta.is_time() => 1,
        _ => 0,
    };
    let reference = metadata
        .get(first_channel)
        .and_then(|meta| meta.start_time)
        .ok_or_else(|| Tdms2xError::MissingStartTime {
            column: labels
                .get(first_channel)
                .cloned()
                .unwrap_or_else(|| input_path.display().to_string()),
        })?;

    let base = file_base(input_path, options);

    let targets = if split {
        OutputTargets::Split(
            metadata
                .iter()
                .zip(&labels)
                .map(|(meta, label)| {
                    let time = meta.start_time.unwrap_or(reference);
                    PathBuf::from(format!(
                        "{}-{}-{}.{}",
                        base.display(),
                        stamp(&time),
                        file_label(label),
                        extension
                    ))
                })
                .collect(),
        )
    } else {
        OutputTargets::Single(PathBuf::from(format!(
            "{}-{}.{}",
            base.display(),
            stamp(&reference),
            extension
        )))
    };

    Ok(NamingPlan { targets, labels })
}

fn file_base(input_path: &Path, options: &NamingOptions) -> PathBuf {
    let dir = match &options.output_dir {
        Some(dir) => dir.clone(),
        None => input_path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    let stem = match &options.file_prefix {
        Some(prefix) => prefix.clone(),
        None => input_path
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default(),
    };
    dir.join(stem)
}

fn stamp(time: &DateTime<FixedOffset>) -> String {
    time.format(TIMESTAMP_FORMAT).to_string()
}
