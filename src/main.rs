use clap::Parser;
use std::process;
use tdms2x::{Cli, OutputFormatter, OutputMode, Tdms2x, Tdms2xError, UserFriendlyError};

const DEFAULT_CONFIG_FILE: &str = "tdms2x.toml";

fn main() {
    let exit_code = run();
    process::exit(exit_code);
}

fn run() -> i32 {
    let cli = Cli::parse();
    setup_logging(&cli);

    if cli.generate_config {
        return handle_generate_config(&cli);
    }

    let Some(input) = cli.path.clone() else {
        print_startup_error(
            &cli,
            &Tdms2xError::InvalidPath {
                path: "no input path given".to_string(),
            },
        );
        return exit_code_for(&Tdms2xError::InvalidPath {
            path: String::new(),
        });
    };

    let app = match Tdms2x::from_cli(&cli) {
        Ok(app) => app,
        Err(e) => {
            print_startup_error(&cli, &e);
            return exit_code_for(&e);
        }
    };

    if cli.dry_run {
        return handle_dry_run(&app, &input);
    }

    let result = if cli.display_only {
        app.display(&input)
    } else {
        app.convert(&input)
    };

    match result {
        Ok(report) => {
            app.output_formatter().print_conversion_report(&report);
            report.exit_code()
        }
        Err(e) => {
            app.handle_error(&e);
            exit_code_for(&e)
        }
    }
}

fn exit_code_for(error: &Tdms2xError) -> i32 {
    match error {
        Tdms2xError::Cancelled => 130, // Interrupted (SIGINT)
        Tdms2xError::InvalidPath { .. } => 2,
        Tdms2xError::NoSourceFiles { .. } => 3,
        Tdms2xError::OutputPathNotDirectory { .. } => 4,
        _ => 1,
    }
}

fn setup_logging(cli: &Cli) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(cli.log_level()))
        .init();
}

fn handle_generate_config(cli: &Cli) -> i32 {
    let config_path = cli
        .config
        .as_ref()
        .map(|p| p.to_string_lossy().to_string())
        .unwrap_or_else(|| DEFAULT_CONFIG_FILE.to_string());

    match Tdms2x::generate_sample_config(&config_path) {
        Ok(()) => {
            println!("Generated sample configuration file: {}", config_path);
            println!("\nTo use this configuration:");
            println!("  tdms2x <PATH> --config {}", config_path);
            println!("\nEdit the file to customize settings for your needs.");
            0
        }
        Err(e) => {
            eprintln!("Failed to generate configuration file: {}", e.user_message());
            if let Some(suggestion) = e.suggestion() {
                eprintln!("Suggestion: {}", suggestion);
            }
            1
        }
    }
}

fn handle_dry_run(app: &Tdms2x, input: &std::path::Path) -> i32 {
    let formatter = app.output_formatter();

    formatter.info("DRY RUN MODE - No files will be written");
    formatter.print_separator();

    let config = app.config();
    formatter.info("Configuration that would be used:");
    println!("  Format: {}", config.conversion.format);
    println!("  Time track: {}", config.conversion.time_track);
    println!("  Compress: {}", config.conversion.compress);
    println!("  Split: {}", config.conversion.split);
    if config.conversion.channels.is_empty() {
        println!("  Channels: all");
    } else {
        let channels: Vec<String> = config
            .conversion
            .channels
            .iter()
            .map(|c| c.to_string())
            .collect();
        println!("  Channels: {}", channels.join(", "));
    }
    if !config.conversion.channel_names.is_empty() {
        println!("  Names: {}", config.conversion.channel_names.join(", "));
    }
    match &config.output.directory {
        Some(dir) => println!("  Output directory: {}", dir.display()),
        None => println!("  Output directory: next to each source file"),
    }
    println!("  Meta save: {}", config.output.meta_save);

    formatter.print_separator();

    let planned = match app.plan(input) {
        Ok(planned) => planned,
        Err(e) => {
            app.handle_error(&e);
            return exit_code_for(&e);
        }
    };

    formatter.info("Conversion plan:");
    let mut failed: i32 = 0;
    for item in &planned {
        println!("  {}", item.source.path.display());
        match &item.plan {
            Ok(plan) => {
                for path in plan.targets.paths() {
                    println!("    -> {}", path.display());
                }
                println!("    columns: {}", plan.labels.join(", "));
            }
            Err(e) => {
                failed += 1;
                println!("    !! {}", e.user_message());
            }
        }
    }

    formatter.print_separator();
    if failed == 0 {
        formatter.success("Dry run completed successfully");
        formatter.info("Run without --dry-run to perform the conversion");
        0
    } else {
        formatter.warning(&format!("{} file(s) would fail", failed));
        failed.min(125)
    }
}

fn print_startup_error(cli: &Cli, error: &Tdms2xError) {
    let formatter = OutputFormatter::new(
        OutputMode::from_string(cli.message_format.as_str()),
        0,
        false,
    );
    formatter.print_user_friendly_error(error);
}
