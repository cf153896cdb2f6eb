//! Config command implementation.
//!
//! Generates configuration files in various formats.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;

use crate::cli::ConfigFormat;
use crate::config::{render_config, Config};

/// Generates configuration files.
pub fn command_config(output: Option<PathBuf>, format: ConfigFormat, commented: bool) -> Result<()> {
    let config = Config::default();
    let output = output.unwrap_or_else(|| PathBuf::from("herakles-proc-sampler.yaml"));

    let content = generate_config(&config, format, commented)?;

    if output.to_string_lossy() == "-" {
        print!("{}", content);
    } else {
        fs::write(&output, content)
            .with_context(|| format!("Failed to write {}", output.display()))?;
        println!("✅ Configuration written to: {}", output.display());
    }

    Ok(())
}

/// Serializes `config`, prefixed with a commented reference block for YAML
/// when requested.
pub fn generate_config(config: &Config, format: ConfigFormat, commented: bool) -> Result<String> {
    let content = render_config(config, format.clone())?;
    Ok(match format {
        ConfigFormat::Yaml if commented => add_config_comments(content),
        _ => content,
    })
}

/// Adds comments to YAML configuration.
fn add_config_comments(yaml: String) -> String {
    let comments = r#"# Herakles Process Sampler Configuration
# ======================================
#
# Sampling Loop
# -------------
# interval_ms: 1500            # Milliseconds between ticks
# iterations: null             # Stop after N ticks (null = run until interrupted)
# metrics_only: false          # Refresh CPU/memory only, leave the process table alone
#
# Process Reconciliation
# ----------------------
# hide_kernel_threads: false   # Hide kernel threads
# hide_userland_threads: false # Hide userland threads listed as processes
#                              # (no effect with procfs: it lists thread-group leaders only)
# update_process_names: false  # Rebuild commands of known processes every tick
# max_argv_bytes: 500          # Upper bound when reading an argument vector
#
# Kernel Source
# -------------
# proc_root: "/proc"           # procfs mount point
#
# Rendering
# ---------
# top_n: 15                    # Processes shown per tick
# output: "text"               # text or json
# show_hidden: false           # Include hidden processes in the listing
#
# Logging
# -------
# log_level: "info"            # off, error, warn, info, debug, trace
"#;

    format!("{comments}\n{yaml}")
}
