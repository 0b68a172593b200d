use crate::error::{Tdms2xError, UserFriendlyError};
use crate::report::{ConversionReport, FileStatus};
use crate::scanner::format_bytes;
use crate::ui::progress::format_duration;
use console::{style, Emoji, Term};
use serde_json;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum OutputMode {
    Human,
    Json,
    Plain,
}

impl OutputMode {
    pub fn from_string(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => OutputMode::Json,
            "plain" => OutputMode::Plain,
            _ => OutputMode::Human,
        }
    }
}

// Emojis with text fallbacks
static CHECKMARK: Emoji = Emoji("✅ ", "✓ ");
static CROSS: Emoji = Emoji("❌ ", "✗ ");
static INFO: Emoji = Emoji("ℹ️  ", "i ");
static WARNING: Emoji = Emoji("⚠️  ", "! ");
static ROCKET: Emoji = Emoji("🚀 ", "> ");

pub struct OutputFormatter {
    #[allow(dead_code)]
    term: Term,
    mode: OutputMode,
    use_colors: bool,
    verbose_level: u8,
    quiet: bool,
}

impl OutputFormatter {
    pub fn new(mode: OutputMode, verbose: u8, quiet: bool) -> Self {
        let term = Term::stdout();
        let use_colors = match mode {
            OutputMode::Human => term.features().colors_supported() && !quiet,
            _ => false,
        };

        Self {
            term,
            mode,
            use_colors,
            verbose_level: if quiet { 0 } else { verbose },
            quiet,
        }
    }

    pub fn mode(&self) -> OutputMode {
        self.mode
    }

    pub fn success(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Success, message),
            OutputMode::Json => self.print_json_message("success", message),
            OutputMode::Plain => println!("SUCCESS: {}", message),
        }
    }

    pub fn error(&self, message: &str) {
        match self.mode {
            OutputMode::Human => self.print_human_message(MessageType::Error, message),
            OutputMode::Json => self.print_json_message("error", message),
            OutputMode::Plain => eprintln!("ERROR: {}", message),
        }
    }

    pub fn warning(&self, message: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Warning, message),
                OutputMode::Json => self.print_json_message("warning", message),
                OutputMode::Plain => println!("WARNING: {}", message),
            }
        }
    }

    pub fn info(&self, message: &str) {
        if self.should_show_message(1) {
            match self.mode {
                OutputMode::Human => self.print_human_message(MessageType::Info, message),
                OutputMode::Json => self.print_json_message("info", message),
                OutputMode::Plain => println!("INFO: {}", message),
            }
        }
    }

    pub fn start_operation(&self, operation: &str) {
        if self.should_show_message(0) {
            match self.mode {
                OutputMode::Human => {
                    if self.use_colors {
                        println!("{}{}", ROCKET, style(operation).bold());
                    } else {
                        println!("> {}", operation);
                    }
                }
                OutputMode::Json => self.print_json_message("operation_start", operation),
                OutputMode::Plain => println!("STARTING: {}", operation),
            }
        }
    }

    pub fn print_user_friendly_error(&self, error: &Tdms2xError) {
        let user_message = error.user_message();
        self.error(&user_message);

        if let Some(suggestion) = error.suggestion() {
            match self.mode {
                OutputMode::Human => {
                    eprintln!();
                    if self.use_colors {
                        eprintln!(
                            "{}{}",
                            INFO,
                            style(&format!("Suggestion: {}", suggestion)).cyan()
                        );
                    } else {
                        eprintln!("Suggestion: {}", suggestion);
                    }
                }
                OutputMode::Json => {
                    self.print_json_object(&serde_json::json!({
                        "type": "suggestion",
                        "message": suggestion
                    }));
                }
                OutputMode::Plain => {
                    eprintln!("SUGGESTION: {}", suggestion);
                }
            }
        }
    }

    /// Meta info text is the payload of a display-only run, so it is
    /// printed even in quiet mode.
    pub fn print_meta_info(&self, source: &str, text: &str) {
        match self.mode {
            OutputMode::Json => {
                self.print_json_object(&serde_json::json!({
                    "type": "meta_info",
                    "source": source,
                    "text": text
                }));
            }
            OutputMode::Human | OutputMode::Plain => print!("{}", text),
        }
    }

    pub fn print_conversion_report(&self, report: &ConversionReport) {
        match self.mode {
            OutputMode::Human => {
                if !self.quiet {
                    self.print_human_report(report);
                }
            }
            OutputMode::Json => {
                let json_output =
                    serde_json::to_string_pretty(report).unwrap_or_else(|_| "{}".to_string());
                println!("{}", json_output);
            }
            OutputMode::Plain => {
                if !self.quiet {
                    self.print_plain_report(report);
                }
            }
        }
    }

    pub fn print_separator(&self) {
        if self.quiet {
            return;
        }

        match self.mode {
            OutputMode::Human => {
                if self.use_colors {
                    println!("{}", style("─".repeat(60)).dim());
                } else {
                    println!("{}", "-".repeat(60));
                }
            }
            OutputMode::Plain => {
                println!("{}", "-".repeat(60));
            }
            OutputMode::Json => {}
        }
    }

    fn should_show_message(&self, min_verbose_level: u8) -> bool {
        !self.quiet && self.verbose_level >= min_verbose_level
    }

    fn print_human_message(&self, msg_type: MessageType, message: &str) {
        #[allow(clippy::type_complexity)]
        let (emoji, color_fn): (Emoji, Box<dyn Fn(&str) -> console::StyledObject<&str>>) =
            match msg_type {
                MessageType::Success => (CHECKMARK, Box::new(|msg| style(msg).green().bold())),
                MessageType::Error => (CROSS, Box::new(|msg| style(msg).red().bold())),
                MessageType::Warning => (WARNING, Box::new(|msg| style(msg).yellow().bold())),
                MessageType::Info => (INFO, Box::new(|msg| style(msg).cyan())),
            };

        if self.use_colors {
            match msg_type {
                MessageType::Error => eprintln!("{}{}", emoji, color_fn(message)),
                _ => println!("{}{}", emoji, color_fn(message)),
            }
        } else {
            let prefix = match msg_type {
                MessageType::Success => "✓",
                MessageType::Error => "✗",
                MessageType::Warning => "!",
                MessageType::Info => "i",
            };

            match msg_type {
                MessageType::Error => eprintln!("{} {}", prefix, message),
                _ => println!("{} {}", prefix, message),
            }
        }
    }

    fn print_json_message(&self, level: &str, message: &str) {
        self.print_json_object(&serde_json::json!({
            "type": "message",
            "level": level,
            "message": message,
            "timestamp": chrono::Utc::now().to_rfc3339()
        }));
    }

    fn print_json_object(&self, obj: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string(obj).unwrap_or_else(|_| "{}".to_string())
        );
    }

    fn highlight(&self, value: String) -> String {
        if self.use_colors {
            style(value).cyan().bold().to_string()
        } else {
            value
        }
    }

    fn print_human_report(&self, report: &ConversionReport) {
        println!();
        self.print_separator();

        let headline = if report.cancelled {
            "Conversion cancelled"
        } else if report.display_only {
            "Meta info display completed!"
        } else if report.failed_count() > 0 {
            "Conversion finished with errors"
        } else {
            "Conversion completed!"
        };

        if self.use_colors {
            let styled = if report.is_success() {
                style(headline).green().bold()
            } else {
                style(headline).yellow().bold()
            };
            println!("{} {}", styled, CHECKMARK);
        } else {
            println!("✓ {}", headline);
        }

        println!();
        println!(
            "  Files processed: {}",
            self.highlight(format!("{}/{}", report.files.len(), report.total_files))
        );
        if !report.display_only {
            println!(
                "  Files converted: {}",
                self.highlight(report.converted_count().to_string())
            );
            println!(
                "  Outputs written: {}",
                self.highlight(report.output_count().to_string())
            );
        }
        println!(
            "  Time taken:      {}",
            self.highlight(format_duration(report.duration))
        );

        if report.skipped_count() > 0 {
            println!("  Skipped:         {}", report.skipped_count());
        }

        if report.failed_count() > 0 {
            println!("  Failed:          {}", report.failed_count());
            println!();
            println!("Issues encountered:");
            for file in report.files.iter().filter(|f| f.is_failed()) {
                if let FileStatus::Failed { error } = &file.status {
                    println!("  - {}: {}", file.source.display(), error);
                }
            }
        }

        if self.verbose_level >= 1 {
            let outputs: Vec<_> = report
                .files
                .iter()
                .filter_map(|f| match &f.status {
                    FileStatus::Converted { outputs } => Some(outputs),
                    _ => None,
                })
                .flatten()
                .collect();
            if !outputs.is_empty() {
                println!();
                println!("Outputs:");
                for path in outputs {
                    let size = path.metadata().map(|m| m.len()).unwrap_or(0);
                    println!("  {} ({})", path.display(), format_bytes(size));
                }
            }
        }

        self.print_separator();
    }

    fn print_plain_report(&self, report: &ConversionReport) {
        if report.cancelled {
            println!("CANCELLED: Conversion");
        } else {
            println!("COMPLETED: Conversion");
        }
        println!("Format: {}", report.format);
        println!("Files: {}/{}", report.files.len(), report.total_files);
        println!("Converted: {}", report.converted_count());
        println!("Outputs: {}", report.output_count());
        println!("Duration: {:?}", report.duration);

        for file in &report.files {
            match &file.status {
                FileStatus::Converted { outputs } => {
                    for output in outputs {
                        println!("OUTPUT: {}", output.display());
                    }
                }
                FileStatus::Failed { error } => {
                    println!("FAILED: {}: {}", file.source.display(), error);
                }
                FileStatus::Skipped { extension } => {
                    println!("SKIPPED: {}: {}", file.source.display(), extension);
                }
                FileStatus::Displayed => {}
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum MessageType {
    Success,
    Error,
    Warning,
    Info,
}

// Progress-aware output wrapper
pub struct ProgressAwareOutput<'a> {
    formatter: &'a OutputFormatter,
    progress_manager: Option<&'a crate::ui::ProgressManager>,
}

impl<'a> ProgressAwareOutput<'a> {
    pub fn new(
        formatter: &'a OutputFormatter,
        progress_manager: Option<&'a crate::ui::ProgressManager>,
    ) -> Self {
        Self {
            formatter,
            progress_manager,
        }
    }

    pub fn suspend_and_print<F>(&self, f: F)
    where
        F: FnOnce(&OutputFormatter),
    {
        if let Some(pm) = self.progress_manager {
            pm.suspend(|| f(self.formatter));
        } else {
            f(self.formatter);
        }
    }

    pub fn success(&self, message: &str) {
        self.suspend_and_print(|f| f.success(message));
    }

    pub fn error(&self, message: &str) {
        self.suspend_and_print(|f| f.error(message));
    }

    pub fn warning(&self, message: &str) {
        self.suspend_and_print(|f| f.warning(message));
    }

    pub fn info(&self, message: &str) {
        self.suspend_and_print(|f| f.info(message));
    }
}
