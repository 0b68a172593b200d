pub mod cli;
pub mod config;
pub mod error;
pub mod extractor;
pub mod naming;
pub mod report;
pub mod scanner;
pub mod tdms;
pub mod ui;
pub mod writer;

// Public API re-exports
pub use cli::{Cli, MessageFormat};
pub use config::{CliOverrides, Config};
pub use error::{Result, Tdms2xError, UserFriendlyError};

// Core functionality re-exports
pub use extractor::{describe, extract, extract_file, ColumnMeta, ExtractedTable};
pub use naming::{plan_names, reconcile_labels, NamingOptions, NamingPlan, OutputTargets};
pub use report::{ConversionReport, FileOutcome, FileStatus};
pub use scanner::{SourceFile, SourceScanner};
pub use tdms::TdmsFile;
pub use ui::{GracefulShutdown, OutputFormatter, OutputMode, ProgressAwareOutput, ProgressManager};
pub use writer::{OutputFormat, TableWriter, WriteOutcome};

use log::{debug, error, info, warn};
use std::fs;
use std::path::Path;
use std::time::Instant;

/// Conversion planned for one source file, without writing anything.
#[derive(Debug)]
pub struct PlannedConversion {
    pub source: SourceFile,
    pub plan: Result<NamingPlan>,
}

/// Batch driver: resolves the input, then runs extract, name and write per
/// source file in order.
pub struct Tdms2x {
    config: Config,
    output_formatter: OutputFormatter,
    progress_manager: ProgressManager,
    shutdown: GracefulShutdown,
}

impl Tdms2x {
    pub fn new(config: Config, output_mode: OutputMode, verbose: u8, quiet: bool) -> Result<Self> {
        let output_formatter = OutputFormatter::new(output_mode, verbose, quiet);
        let progress_manager = ProgressManager::new(!quiet && output_mode == OutputMode::Human);
        let shutdown = GracefulShutdown::new()?;

        Ok(Self {
            config,
            output_formatter,
            progress_manager,
            shutdown,
        })
    }

    /// No signal handler registration, no progress bars.
    #[cfg(test)]
    pub fn new_for_test(config: Config) -> Self {
        Self {
            config,
            output_formatter: OutputFormatter::new(OutputMode::Plain, 0, true),
            progress_manager: ProgressManager::new(false),
            shutdown: GracefulShutdown::new_for_test(),
        }
    }

    pub fn from_cli(cli_args: &Cli) -> Result<Self> {
        let config = cli_args.load_config()?;
        let output_mode = OutputMode::from_string(cli_args.message_format.as_str());

        Self::new(config, output_mode, cli_args.verbose, cli_args.quiet)
    }

    /// Convert every source file found at `input`.
    pub fn convert<P: AsRef<Path>>(&self, input: P) -> Result<ConversionReport> {
        self.run_batch(input.as_ref(), false)
    }

    /// Print the meta info of every source file found at `input`.
    pub fn display<P: AsRef<Path>>(&self, input: P) -> Result<ConversionReport> {
        self.run_batch(input.as_ref(), true)
    }

    /// Resolve sources and their output names without writing anything.
    pub fn plan<P: AsRef<Path>>(&self, input: P) -> Result<Vec<PlannedConversion>> {
        let sources = SourceScanner::new(&self.config.scan).resolve(input)?;

        Ok(sources
            .into_iter()
            .map(|source| {
                let plan = self.prepare(&source).map(|(_, plan)| plan);
                PlannedConversion { source, plan }
            })
            .collect())
    }

    fn run_batch(&self, input: &Path, display_only: bool) -> Result<ConversionReport> {
        self.shutdown.check_shutdown()?;

        let scanner = SourceScanner::new(&self.config.scan);
        let sources = scanner.resolve(input)?;
        debug!("{}", scanner.get_statistics(&sources).display_summary());

        if !display_only {
            self.prepare_output_dir()?;
        }

        let mut report = ConversionReport::new(
            input,
            self.config.conversion.format,
            display_only,
            sources.len(),
        );
        let start_time = Instant::now();

        if !display_only {
            self.output_formatter.start_operation(&format!(
                "Converting {} file(s) to {}",
                sources.len(),
                self.config.conversion.format
            ));
        }

        let file_progress = self
            .progress_manager
            .create_file_progress(sources.len() as u64);
        let output = ProgressAwareOutput::new(&self.output_formatter, Some(&self.progress_manager));

        for (n, source) in sources.iter().enumerate() {
            if !self.shutdown.is_running() {
                warn!("Cancelled before {}", source.path.display());
                report.cancelled = true;
                break;
            }

            ui::progress::update_file_progress(&file_progress, n, &source.display_path());
            let file_start = Instant::now();

            let result = if display_only {
                self.display_one(source)
            } else {
                self.convert_one(source)
            };

            match result {
                Ok(outcome) => {
                    match &outcome.status {
                        FileStatus::Converted { outputs } => output.info(&format!(
                            "#{} {}: {} output(s) in {}",
                            n + 1,
                            source.display_path(),
                            outputs.len(),
                            ui::progress::format_duration(file_start.elapsed())
                        )),
                        FileStatus::Skipped { extension } => output.warning(&format!(
                            "#{} {}: target format .{} not supported, nothing written",
                            n + 1,
                            source.display_path(),
                            extension
                        )),
                        _ => {}
                    }
                    report.push(outcome.with_duration(file_start.elapsed()));
                }
                Err(e) => {
                    error!("{}: {}", source.path.display(), e);
                    output.error(&format!("{}: {}", source.display_path(), e.user_message()));

                    let stop = e.is_batch_fatal() || self.config.batch.fail_fast;
                    if matches!(e, Tdms2xError::Cancelled) {
                        report.cancelled = true;
                    }
                    if let Tdms2xError::MetaSave { .. } = e {
                        output.error("Saving meta info failed, aborting further processing");
                    }

                    report.push(
                        FileOutcome::new(
                            &source.path,
                            FileStatus::Failed {
                                error: e.to_string(),
                            },
                        )
                        .with_duration(file_start.elapsed()),
                    );

                    if stop {
                        break;
                    }
                }
            }
        }

        report.duration = start_time.elapsed();
        file_progress.set_position(report.files.len() as u64);
        ui::progress::finish_progress_with_summary(
            &file_progress,
            &format!("Processed {} file(s)", report.files.len()),
            report.duration,
        );

        if report.unprocessed_count() > 0 {
            warn!("{} file(s) were not processed", report.unprocessed_count());
        }

        Ok(report)
    }

    fn display_one(&self, source: &SourceFile) -> Result<FileOutcome> {
        let recording = TdmsFile::open(&source.path)?;
        let text = describe(&recording, &source.path);
        self.progress_manager.suspend(|| {
            self.output_formatter
                .print_meta_info(&source.path.display().to_string(), &text)
        });

        Ok(FileOutcome::new(&source.path, FileStatus::Displayed))
    }

    fn convert_one(&self, source: &SourceFile) -> Result<FileOutcome> {
        info!("Converting {}", source.path.display());

        let meta_file = if self.config.output.meta_save {
            let path =
                extractor::save_meta_info(&source.path, self.config.output.directory.as_deref())?;
            debug!("Meta info saved to {}", path.display());
            Some(path)
        } else {
            None
        };

        let (table, plan) = self.prepare(source)?;
        let conversion = &self.config.conversion;

        let status = match writer::write_with(
            &table,
            &plan.targets,
            &plan.labels,
            conversion.compress,
            &self.config.writer_settings(),
        )? {
            WriteOutcome::Written(outputs) => FileStatus::Converted { outputs },
            WriteOutcome::Skipped { extension } => FileStatus::Skipped { extension },
        };

        Ok(FileOutcome::new(&source.path, status)
            .with_shape(table.rows(), table.column_count())
            .with_meta_file(meta_file))
    }

    fn prepare(&self, source: &SourceFile) -> Result<(ExtractedTable, NamingPlan)> {
        let conversion = &self.config.conversion;

        let table = extract_file(&source.path, &conversion.channels, conversion.time_track)?;
        let plan = plan_names(
            &source.path,
            table.meta(),
            &conversion.channel_names,
            conversion.split,
            conversion.format.extension(),
            &self.config.naming_options(),
        )?;

        Ok((table, plan))
    }

    fn prepare_output_dir(&self) -> Result<()> {
        let Some(dir) = &self.config.output.directory else {
            return Ok(());
        };

        if dir.exists() && !dir.is_dir() {
            return Err(Tdms2xError::OutputPathNotDirectory {
                path: dir.display().to_string(),
            });
        }

        if !dir.exists() {
            fs::create_dir_all(dir)?;
            info!("Created output directory {}", dir.display());
        }

        Ok(())
    }

    pub fn generate_sample_config<P: AsRef<Path>>(output_path: P) -> Result<()> {
        let sample_config = Config::create_sample_config();
        fs::write(output_path.as_ref(), sample_config)?;
        Ok(())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn output_formatter(&self) -> &OutputFormatter {
        &self.output_formatter
    }

    pub fn is_running(&self) -> bool {
        self.shutdown.is_running()
    }

    pub fn request_shutdown(&self) {
        self.shutdown.request_shutdown();
    }

    pub fn handle_error(&self, error: &Tdms2xError) {
        self.output_formatter.print_user_friendly_error(error);
    }
}

pub fn version_info() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
