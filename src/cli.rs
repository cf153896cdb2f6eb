//! CLI arguments and subcommands for herakles-proc-sampler.
//!
//! This module defines the command-line interface structure using the clap library,
//! including all flags, options, and subcommands.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Log level options for CLI parsing
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            LogLevel::Off => "off",
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

/// Configuration format options for output
#[derive(Debug, Clone, ValueEnum)]
pub enum ConfigFormat {
    Yaml,
    Json,
    Toml,
}

/// Rendering of each sampling tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

impl OutputFormat {
    pub fn as_str(self) -> &'static str {
        match self {
            OutputFormat::Text => "text",
            OutputFormat::Json => "json",
        }
    }
}

/// Main CLI arguments structure
#[derive(Parser, Debug)]
#[command(
    name = "herakles-proc-sampler",
    about = "Per-core CPU, memory and process table sampler",
    long_about = "Per-core CPU, memory and process table sampler.\n\n\
                  Periodically samples per-core CPU usage, memory and swap usage and the \
                  process table from /proc, and prints a top-style summary or one JSON \
                  document per tick.",
    author = "Michael Moll <exporter@herakles.now> - Herakles",
    version = "0.1.0",
    propagate_version = true,
    after_help = "More info: https://www.herakles.now, Support: exporter@herakles.now"
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Log level [default: log_level from the config file, else info]
    #[arg(long, value_enum)]
    pub log_level: Option<LogLevel>,

    /// Config file (YAML/JSON/TOML)
    #[arg(short = 'c', long)]
    pub config: Option<PathBuf>,

    /// Disable all config file loading
    #[arg(long)]
    pub no_config: bool,

    /// Print effective merged config and exit
    #[arg(long)]
    pub show_config: bool,

    /// Output format for --show-config
    #[arg(long, value_enum, default_value = "yaml")]
    pub config_format: ConfigFormat,

    /// Validate config and exit (return code 1 on error)
    #[arg(long)]
    pub check_config: bool,

    /// Milliseconds between ticks
    #[arg(short = 'd', long)]
    pub interval_ms: Option<u64>,

    /// Stop after N ticks (default: run until interrupted)
    #[arg(short = 'n', long)]
    pub iterations: Option<u64>,

    /// Refresh CPU and memory statistics only, leave the process table alone
    #[arg(long)]
    pub metrics_only: bool,

    /// Hide kernel threads
    #[arg(long)]
    pub hide_kernel_threads: bool,

    /// Hide userland threads listed as their own processes. The procfs
    /// source lists thread-group leaders only, so this has no effect there
    #[arg(long)]
    pub hide_userland_threads: bool,

    /// Rebuild commands of known processes every tick
    #[arg(long)]
    pub update_process_names: bool,

    /// Upper bound in bytes when reading a process argument vector
    #[arg(long)]
    pub max_argv_bytes: Option<usize>,

    /// procfs mount point
    #[arg(long)]
    pub proc_root: Option<PathBuf>,

    /// Number of processes shown per tick
    #[arg(long)]
    pub top_n: Option<usize>,

    /// Output format per tick
    #[arg(short = 'o', long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Include hidden processes in the listing
    #[arg(long)]
    pub show_hidden: bool,
}

/// Subcommands for additional functionality
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate configuration and system requirements
    Check {
        /// Check /proc filesystem
        #[arg(long)]
        proc: bool,

        /// Check per-core CPU counters
        #[arg(long)]
        cpu: bool,

        /// Check memory counters
        #[arg(long)]
        memory: bool,

        /// Check all system requirements
        #[arg(long)]
        all: bool,
    },

    /// Generate configuration files
    Config {
        /// Output file path ("-" for stdout)
        #[arg(short = 'o', long)]
        output: Option<PathBuf>,

        /// Output format
        #[arg(long, value_enum, default_value = "yaml")]
        format: ConfigFormat,

        /// Include comments and examples
        #[arg(long)]
        commented: bool,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_sampling_flags() {
        let args = Args::parse_from([
            "herakles-proc-sampler",
            "-d",
            "500",
            "-n",
            "3",
            "--hide-kernel-threads",
            "--output",
            "json",
        ]);
        assert_eq!(args.interval_ms, Some(500));
        assert_eq!(args.iterations, Some(3));
        assert!(args.hide_kernel_threads);
        assert!(!args.hide_userland_threads);
        assert_eq!(args.output, Some(OutputFormat::Json));
        assert!(args.command.is_none());
        assert_eq!(args.log_level, None);
    }

    #[test]
    fn test_parse_check_subcommand() {
        let args = Args::parse_from(["herakles-proc-sampler", "check", "--cpu"]);
        match args.command {
            Some(Commands::Check {
                proc, cpu, all, ..
            }) => {
                assert!(cpu);
                assert!(!proc);
                assert!(!all);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }
}
