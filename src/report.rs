use crate::writer::OutputFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Exit status reported when the batch was interrupted.
pub const EXIT_CANCELLED: i32 = 130;

const MAX_FAILURE_EXIT: usize = 125;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FileStatus {
    Converted { outputs: Vec<PathBuf> },
    Displayed,
    Skipped { extension: String },
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct FileOutcome {
    pub source: PathBuf,
    #[serde(flatten)]
    pub status: FileStatus,
    pub rows: Option<usize>,
    pub columns: Option<usize>,
    pub meta_file: Option<PathBuf>,
    pub duration: Duration,
}

impl FileOutcome {
    pub fn new<P: Into<PathBuf>>(source: P, status: FileStatus) -> Self {
        Self {
            source: source.into(),
            status,
            rows: None,
            columns: None,
            meta_file: None,
            duration: Duration::ZERO,
        }
    }

    pub fn with_shape(mut self, rows: usize, columns: usize) -> Self {
        self.rows = Some(rows);
        self.columns = Some(columns);
        self
    }

    pub fn with_meta_file(mut self, meta_file: Option<PathBuf>) -> Self {
        self.meta_file = meta_file;
        self
    }

    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, FileStatus::Failed { .. })
    }
}

/// Per-batch record of what happened to every source file.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub input: PathBuf,
    pub format: OutputFormat,
    pub display_only: bool,
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    pub total_files: usize,
    pub files: Vec<FileOutcome>,
    pub cancelled: bool,
}

impl ConversionReport {
    pub fn new(input: &Path, format: OutputFormat, display_only: bool, total_files: usize) -> Self {
        Self {
            input: input.to_path_buf(),
            format,
            display_only,
            started_at: Utc::now(),
            duration: Duration::ZERO,
            total_files,
            files: Vec::new(),
            cancelled: false,
        }
    }

    pub fn push(&mut self, outcome: FileOutcome) {
        self.files.push(outcome);
    }

    pub fn converted_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Converted { .. }))
            .count()
    }

    pub fn skipped_count(&self) -> usize {
        self.files
            .iter()
            .filter(|f| matches!(f.status, FileStatus::Skipped { .. }))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.files.iter().filter(|f| f.is_failed()).count()
    }

    pub fn output_count(&self) -> usize {
        self.files
            .iter()
            .map(|f| match &f.status {
                FileStatus::Converted { outputs } => outputs.len(),
                _ => 0,
            })
            .sum()
    }

    /// Files that were never reached because the batch stopped early.
    pub fn unprocessed_count(&self) -> usize {
        self.total_files.saturating_sub(self.files.len())
    }

    pub fn is_success(&self) -> bool {
        !self.cancelled && self.failed_count() == 0
    }

    /// 0 on success, 130 when cancelled, otherwise the failed file count
    /// clamped to 1..=125.
    pub fn exit_code(&self) -> i32 {
        if self.cancelled {
            return EXIT_CANCELLED;
        }
        match self.failed_count() {
            0 => 0,
            failed => failed.min(MAX_FAILURE_EXIT) as i32,
        }
    }
}
