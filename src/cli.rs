use crate::config::{CliOverrides, Config};
use crate::error::Result;
use crate::writer::OutputFormat;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "tdms2x")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Convert TDMS waveform recordings to npy, mat or csv")]
#[command(
    long_about = "tdms2x reads the first group of National Instruments TDMS files and writes \
                  the selected channels, optionally with a derived time column, as NumPy \
                  arrays, MATLAB files or delimited text."
)]
#[command(after_help = "EXAMPLES:\n  \
    tdms2x dev2_1.tdms\n  \
    tdms2x dev2_1.tdms --time-track --format mat --names t volt amp\n  \
    tdms2x recordings/ --format csv --split --output-dir export\n  \
    tdms2x dev2_1.tdms --display-only\n  \
    tdms2x recordings/ --config my-config.toml --dry-run")]
#[command(arg_required_else_help = true)]
pub struct Cli {
    /// TDMS file or folder containing TDMS files (searched recursively)
    #[arg(value_name = "PATH")]
    pub path: Option<PathBuf>,

    /// Display meta info of the source file(s) without converting
    #[arg(short, long)]
    pub display_only: bool,

    /// Also save meta info next to the outputs as a .info file
    #[arg(short, long)]
    pub meta_save: bool,

    /// Zero-based channel indexes to convert (default: all)
    #[arg(short, long, num_args = 1.., value_name = "IDX")]
    pub channels: Option<Vec<usize>>,

    /// Prepend a time column computed from the waveform timing
    #[arg(short, long)]
    pub time_track: bool,

    /// Compress the output when the format supports it
    #[arg(short = 'z', long)]
    pub compress: bool,

    /// Write one file per column
    #[arg(short, long)]
    pub split: bool,

    /// Custom column names, the time column included
    #[arg(short, long, num_args = 1.., value_name = "NAME")]
    pub names: Option<Vec<String>>,

    /// Target format
    #[arg(short = 'o', long, value_enum)]
    pub format: Option<OutputFormat>,

    /// Output directory (default: next to each source file)
    #[arg(short = 'O', long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// File name used instead of the source file stem
    #[arg(short, long, value_name = "NAME")]
    pub file_prefix: Option<String>,

    /// Stop the batch at the first failed file
    #[arg(long)]
    pub fail_fast: bool,

    /// Configuration file path
    #[arg(long, help = "Path to TOML configuration file")]
    pub config: Option<PathBuf>,

    /// Output format for console messages
    #[arg(long, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    /// Verbose output level (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Quiet mode (suppress non-essential output)
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Dry run (show what would be written without writing)
    #[arg(long, help = "Show the planned outputs without writing them")]
    pub dry_run: bool,

    /// Generate sample configuration file
    #[arg(long, help = "Generate a sample configuration file")]
    pub generate_config: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, ValueEnum)]
pub enum MessageFormat {
    /// Human-readable colored output
    Human,
    /// JSON formatted output
    Json,
    /// Plain text output
    Plain,
}

impl MessageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Human => "human",
            MessageFormat::Json => "json",
            MessageFormat::Plain => "plain",
        }
    }
}

impl Cli {
    pub fn load_config(&self) -> Result<Config> {
        let mut config = Config::load_with_defaults(self.config.as_ref())?;

        let overrides = self.create_cli_overrides();
        config.merge_with_cli_args(&overrides);
        config.validate()?;

        Ok(config)
    }

    /// Flags only override the config file when given.
    pub fn create_cli_overrides(&self) -> CliOverrides {
        CliOverrides::new()
            .with_format(self.format)
            .with_time_track(self.time_track.then_some(true))
            .with_compress(self.compress.then_some(true))
            .with_split(self.split.then_some(true))
            .with_channels(self.channels.clone())
            .with_channel_names(self.names.clone())
            .with_output_dir(self.output_dir.clone())
            .with_file_prefix(self.file_prefix.clone())
            .with_meta_save(self.meta_save.then_some(true))
            .with_fail_fast(self.fail_fast.then_some(true))
    }

    pub fn is_verbose(&self) -> bool {
        self.verbose > 0 && !self.quiet
    }

    pub fn verbosity_level(&self) -> u8 {
        if self.quiet {
            0
        } else {
            self.verbose
        }
    }

    /// Filter for env_logger when `RUST_LOG` is unset.
    pub fn log_level(&self) -> &'static str {
        match self.verbosity_level() {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    }
}
