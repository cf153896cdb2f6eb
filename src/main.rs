//! herakles-proc-sampler - version 0.1.0
//!
//! Per-core CPU, memory and process table sampler with tracing logging.
//! This is the main entry point that resolves configuration and dispatches
//! to the sampling loop or a subcommand.

mod cli;
mod commands;
mod config;

use clap::Parser;
use tracing::{error, info, Level};

use cli::{Args, Commands, LogLevel};
use commands::{command_check, command_config, command_run};
use config::{resolve_config, show_config, validate_effective_config};

/// Initializes tracing logging subsystem with configured log level.
fn setup_logging(level: LogLevel) {
    let log_level = match level {
        LogLevel::Off => None,
        LogLevel::Error => Some(Level::ERROR),
        LogLevel::Warn => Some(Level::WARN),
        LogLevel::Info => Some(Level::INFO),
        LogLevel::Debug => Some(Level::DEBUG),
        LogLevel::Trace => Some(Level::TRACE),
    };
    let Some(log_level) = log_level else {
        return;
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .finish();

    if tracing::subscriber::set_global_default(subscriber).is_err() {
        eprintln!("Failed to set tracing subscriber");
        return;
    }

    info!("Logging initialized with level: {:?}", level);
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = resolve_config(&args)?;

    setup_logging(config.log_level());

    if args.show_config {
        show_config(&config, args.config_format.clone())?;
        return Ok(());
    }

    if args.check_config {
        match validate_effective_config(&config) {
            Ok(()) => {
                println!("✅ Configuration is valid");
                return Ok(());
            }
            Err(e) => {
                eprintln!("❌ Configuration invalid: {}", e);
                std::process::exit(1);
            }
        }
    }

    match args.command {
        Some(Commands::Check {
            proc,
            cpu,
            memory,
            all,
        }) => command_check(proc, cpu, memory, all, &config),
        Some(Commands::Config {
            output,
            format,
            commented,
        }) => command_config(output, format, commented),
        None => {
            if let Err(e) = validate_effective_config(&config) {
                error!("Invalid configuration: {}", e);
                std::process::exit(1);
            }
            if let Err(e) = command_run(&config) {
                error!("Sampling stopped: {:#}", e);
                std::process::exit(1);
            }
            Ok(())
        }
    }
}
