use thiserror::Error;

#[derive(Error, Debug)]
pub enum Tdms2xError {
    #[error("IO operation failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Malformed TDMS data in {path}: {message}")]
    Tdms { path: String, message: String },

    #[error("Recording contains no groups: {path}")]
    NoGroups { path: String },

    #[error("Group {group} contains no channels")]
    EmptyGroup { group: String },

    #[error("Channel index {index} out of range (group has {count} channels)")]
    ChannelIndexOutOfRange { index: usize, count: usize },

    #[error("Channel {channel} is missing property '{key}'")]
    MissingProperty { channel: String, key: String },

    #[error("Channel length mismatch: {channel} has {actual} samples, expected {expected}")]
    ChannelLengthMismatch {
        channel: String,
        expected: usize,
        actual: usize,
    },

    #[error("No waveform start time available for column '{column}'")]
    MissingStartTime { column: String },

    #[error("Label count {labels} does not match column count {columns}")]
    LabelCountMismatch { labels: usize, columns: usize },

    #[error("Archive write failed: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Delimited text write failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Path validation failed: {path}")]
    InvalidPath { path: String },

    #[error("No .{extension} files found in {path}")]
    NoSourceFiles { path: String, extension: String },

    #[error("Output path exists and is not a directory: {path}")]
    OutputPathNotDirectory { path: String },

    #[error("Failed to save meta info for {path}: {message}")]
    MetaSave { path: String, message: String },

    #[error("Operation was cancelled by user")]
    Cancelled,
}

impl Tdms2xError {
    /// Faults that stop the whole batch rather than just the current file.
    pub fn is_batch_fatal(&self) -> bool {
        matches!(
            self,
            Tdms2xError::MetaSave { .. }
                | Tdms2xError::Cancelled
                | Tdms2xError::InvalidPath { .. }
                | Tdms2xError::NoSourceFiles { .. }
                | Tdms2xError::OutputPathNotDirectory { .. }
        )
    }
}

pub trait UserFriendlyError {
    fn user_message(&self) -> String;
    fn suggestion(&self) -> Option<String>;
}

impl UserFriendlyError for Tdms2xError {
    fn user_message(&self) -> String {
        match self {
            Tdms2xError::Tdms { path, message } => {
                format!("Could not read TDMS file {}: {}", path, message)
            }
            Tdms2xError::ChannelIndexOutOfRange { index, count } => {
                format!(
                    "Channel index {} is out of range, valid indexes are 0..{}",
                    index, count
                )
            }
            Tdms2xError::MissingProperty { channel, key } => {
                format!("Channel {} has no '{}' property", channel, key)
            }
            Tdms2xError::ChannelLengthMismatch {
                channel,
                expected,
                actual,
            } => {
                format!(
                    "Channel length mismatch: {} has {} samples but the group expects {}",
                    channel, actual, expected
                )
            }
            Tdms2xError::MissingStartTime { column } => {
                format!("Column '{}' carries no recording start time", column)
            }
            Tdms2xError::LabelCountMismatch { labels, columns } => {
                format!(
                    "MAT output needs one variable name per column ({} names for {} columns)",
                    labels, columns
                )
            }
            Tdms2xError::InvalidPath { path } => {
                format!("Invalid input path: {}", path)
            }
            Tdms2xError::NoSourceFiles { path, extension } => {
                format!("No .{} file is found in {}", extension, path)
            }
            Tdms2xError::OutputPathNotDirectory { path } => {
                format!("Output path {} exists and is not a directory", path)
            }
            Tdms2xError::Config { message } => {
                format!("Configuration error: {}", message)
            }
            _ => self.to_string(),
        }
    }

    fn suggestion(&self) -> Option<String> {
        match self {
            Tdms2xError::ChannelIndexOutOfRange { .. } => Some(
                "Run with --display-only to list the available channels and their indexes.".to_string()
            ),
            Tdms2xError::MissingStartTime { .. } => Some(
                "Only waveform channels carry a start time; select waveform channels for conversion.".to_string()
            ),
            Tdms2xError::LabelCountMismatch { .. } => Some(
                "Provide one name per output column with --names, including the time column when --time-track is set.".to_string()
            ),
            Tdms2xError::NoSourceFiles { .. } => Some(
                "Check the input directory or the scan settings in your configuration file.".to_string()
            ),
            Tdms2xError::OutputPathNotDirectory { .. } => Some(
                "Choose a different --output-dir or remove the conflicting file.".to_string()
            ),
            Tdms2xError::Config { .. } => Some(
                "Check your configuration file syntax and ensure all required fields are present.".to_string()
            ),
            _ => None,
        }
    }
}

impl From<toml::de::Error> for Tdms2xError {
    fn from(error: toml::de::Error) -> Self {
        Tdms2xError::Config {
            message: error.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, Tdms2xError>;
