use crate::error::{Result, Tdms2xError};
use crate::naming::NamingOptions;
use crate::writer::{OutputFormat, WriterSettings};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATHS: [&str; 2] = ["tdms2x.toml", ".tdms2x.toml"];

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub conversion: ConversionConfig,
    pub output: OutputConfig,
    pub batch: BatchConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ScanConfig {
    /// Source file extension, matched case-insensitively.
    pub extension: String,
    pub exclude_dirs: Vec<String>,
    pub exclude_patterns: Vec<String>,
    pub max_depth: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConversionConfig {
    pub format: OutputFormat,
    pub time_track: bool,
    pub compress: bool,
    pub split: bool,
    /// Channel indexes into the first group, empty for all.
    pub channels: Vec<usize>,
    pub channel_names: Vec<String>,
    pub csv_delimiter: char,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    pub directory: Option<PathBuf>,
    pub file_prefix: Option<String>,
    pub meta_save: bool,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct BatchConfig {
    /// Stop at the first failed file instead of continuing.
    pub fail_fast: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extension: "tdms".to_string(),
            exclude_dirs: vec![".git".to_string()],
            exclude_patterns: Vec::new(),
            max_depth: 32,
        }
    }
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Npy,
            time_track: false,
            compress: false,
            split: false,
            channels: Vec::new(),
            channel_names: Vec::new(),
            csv_delimiter: ' ',
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(Tdms2xError::Config {
                message: format!("Configuration file not found: {}", path.display()),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| Tdms2xError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;

        toml::from_str(&content).map_err(|e| Tdms2xError::Config {
            message: format!("Failed to parse config file {}: {}", path.display(), e),
        })
    }

    pub fn load_with_defaults<P: AsRef<Path>>(config_path: Option<P>) -> Result<Self> {
        match config_path {
            Some(path) => Self::load_from_file(path),
            None => {
                for default_path in &DEFAULT_CONFIG_PATHS {
                    if Path::new(default_path).exists() {
                        return Self::load_from_file(default_path);
                    }
                }
                Ok(Self::default())
            }
        }
    }

    pub fn merge_with_cli_args(&mut self, cli_args: &CliOverrides) {
        if let Some(format) = cli_args.format {
            self.conversion.format = format;
        }

        if let Some(time_track) = cli_args.time_track {
            self.conversion.time_track = time_track;
        }

        if let Some(compress) = cli_args.compress {
            self.conversion.compress = compress;
        }

        if let Some(split) = cli_args.split {
            self.conversion.split = split;
        }

        if let Some(ref channels) = cli_args.channels {
            self.conversion.channels = channels.clone();
        }

        if let Some(ref names) = cli_args.channel_names {
            self.conversion.channel_names = names.clone();
        }

        if let Some(ref output_dir) = cli_args.output_dir {
            self.output.directory = Some(output_dir.clone());
        }

        if let Some(ref prefix) = cli_args.file_prefix {
            self.output.file_prefix = Some(prefix.clone());
        }

        if let Some(meta_save) = cli_args.meta_save {
            self.output.meta_save = meta_save;
        }

        if let Some(fail_fast) = cli_args.fail_fast {
            self.batch.fail_fast = fail_fast;
        }
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let content = toml::to_string_pretty(self).map_err(|e| Tdms2xError::Config {
            message: format!("Failed to serialize config: {}", e),
        })?;

        std::fs::write(path, content).map_err(|e| Tdms2xError::Config {
            message: format!("Failed to write config file {}: {}", path.display(), e),
        })?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.scan.extension.trim().is_empty() {
            return Err(Tdms2xError::Config {
                message: "Source file extension must not be empty".to_string(),
            });
        }

        if self.scan.max_depth == 0 {
            return Err(Tdms2xError::Config {
                message: "Maximum directory depth must be greater than 0".to_string(),
            });
        }

        for pattern in &self.scan.exclude_patterns {
            Regex::new(pattern).map_err(|e| Tdms2xError::Config {
                message: format!("Invalid exclude pattern '{}': {}", pattern, e),
            })?;
        }

        let delimiter = self.conversion.csv_delimiter;
        if !delimiter.is_ascii() || matches!(delimiter, '"' | '\n' | '\r') {
            return Err(Tdms2xError::Config {
                message: format!("CSV delimiter {:?} must be a single ASCII character other than a quote or newline", delimiter),
            });
        }

        if let Some(prefix) = &self.output.file_prefix {
            if prefix.is_empty() || prefix.contains(['/', '\\']) {
                return Err(Tdms2xError::Config {
                    message: format!("File prefix '{}' must be a non-empty file name", prefix),
                });
            }
        }

        Ok(())
    }

    pub fn naming_options(&self) -> NamingOptions {
        NamingOptions {
            output_dir: self.output.directory.clone(),
            file_prefix: self.output.file_prefix.clone(),
        }
    }

    pub fn writer_settings(&self) -> WriterSettings {
        WriterSettings {
            csv_delimiter: self.conversion.csv_delimiter as u8,
        }
    }

    pub fn create_sample_config() -> String {
        let sample_config = Self::default();
        toml::to_string_pretty(&sample_config).unwrap_or_default()
    }
}

#[derive(Debug, Default)]
pub struct CliOverrides {
    pub format: Option<OutputFormat>,
    pub time_track: Option<bool>,
    pub compress: Option<bool>,
    pub split: Option<bool>,
    pub channels: Option<Vec<usize>>,
    pub channel_names: Option<Vec<String>>,
    pub output_dir: Option<PathBuf>,
    pub file_prefix: Option<String>,
    pub meta_save: Option<bool>,
    pub fail_fast: Option<bool>,
}

impl CliOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_format(mut self, format: Option<OutputFormat>) -> Self {
        self.format = format;
        self
    }

    pub fn with_time_track(mut self, time_track: Option<bool>) -> Self {
        self.time_track = time_track;
        self
    }

    pub fn with_compress(mut self, compress: Option<bool>) -> Self {
        self.compress = compress;
        self
    }

    pub fn with_split(mut self, split: Option<bool>) -> Self {
        self.split = split;
        self
    }

    pub fn with_channels(mut self, channels: Option<Vec<usize>>) -> Self {
        self.channels = channels;
        self
    }

    pub fn with_channel_names(mut self, names: Option<Vec<String>>) -> Self {
        self.channel_names = names;
        self
    }

    pub fn with_output_dir(mut self, output_dir: Option<PathBuf>) -> Self {
        self.output_dir = output_dir;
        self
    }

    pub fn with_file_prefix(mut self, prefix: Option<String>) -> Self {
        self.file_prefix = prefix;
        self
    }

    pub fn with_meta_save(mut self, meta_save: Option<bool>) -> Self {
        self.meta_save = meta_save;
        self
    }

    pub fn with_fail_fast(mut self, fail_fast: Option<bool>) -> Self {
        self.fail_fast = fail_fast;
        self
    }
}
