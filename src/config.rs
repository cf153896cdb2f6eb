//! Configuration management for herakles-proc-sampler.
//!
//! This module handles loading, merging, and validating configuration from files
//! and CLI arguments. It supports YAML, JSON, and TOML formats.

use anyhow::{bail, Context, Result};
use clap::ValueEnum;
use herakles_proc_sampler::{SamplerSettings, DEFAULT_MAX_ARGV_BYTES};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::cli::{Args, ConfigFormat, LogLevel};

// Default configuration constants
pub const DEFAULT_INTERVAL_MS: u64 = 1500;
pub const DEFAULT_PROC_ROOT: &str = "/proc";
pub const DEFAULT_TOP_N: usize = 15;
pub const DEFAULT_OUTPUT: &str = "text";

const DEFAULT_CONFIG_PATHS: [&str; 6] = [
    "/etc/herakles/proc-sampler.yaml",
    "/etc/herakles/proc-sampler.yml",
    "/etc/herakles/proc-sampler.json",
    "./herakles-proc-sampler.yaml",
    "./herakles-proc-sampler.yml",
    "./herakles-proc-sampler.json",
];

/// Sampler configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    // Sampling loop
    #[serde(alias = "interval-ms")]
    pub interval_ms: Option<u64>,
    /// None = run until interrupted
    pub iterations: Option<u64>,
    /// Refresh CPU and memory only, never touch the process table
    #[serde(alias = "metrics-only")]
    pub metrics_only: Option<bool>,

    // Process reconciliation
    #[serde(alias = "hide-kernel-threads")]
    pub hide_kernel_threads: Option<bool>,
    #[serde(alias = "hide-userland-threads")]
    pub hide_userland_threads: Option<bool>,
    #[serde(alias = "update-process-names")]
    pub update_process_names: Option<bool>,
    #[serde(alias = "max-argv-bytes")]
    pub max_argv_bytes: Option<usize>,

    // Kernel source
    #[serde(alias = "proc-root")]
    pub proc_root: Option<PathBuf>,

    // Rendering
    #[serde(alias = "top-n")]
    pub top_n: Option<usize>,
    /// "text" | "json"
    pub output: Option<String>,
    #[serde(alias = "show-hidden")]
    pub show_hidden: Option<bool>,

    // Logging
    #[serde(alias = "log-level")]
    pub log_level: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            interval_ms: Some(DEFAULT_INTERVAL_MS),
            iterations: None,
            metrics_only: Some(false),
            hide_kernel_threads: Some(false),
            hide_userland_threads: Some(false),
            update_process_names: Some(false),
            max_argv_bytes: Some(DEFAULT_MAX_ARGV_BYTES),
            proc_root: Some(PathBuf::from(DEFAULT_PROC_ROOT)),
            top_n: Some(DEFAULT_TOP_N),
            output: Some(DEFAULT_OUTPUT.into()),
            show_hidden: Some(false),
            log_level: Some("info".into()),
        }
    }
}

impl Config {
    /// Reconciliation switches handed to the sampler.
    pub fn sampler_settings(&self) -> SamplerSettings {
        SamplerSettings {
            hide_kernel_threads: self.hide_kernel_threads.unwrap_or(false),
            hide_userland_threads: self.hide_userland_threads.unwrap_or(false),
            update_process_names: self.update_process_names.unwrap_or(false),
            max_argv_bytes: self.max_argv_bytes.unwrap_or(DEFAULT_MAX_ARGV_BYTES),
        }
    }

    pub fn proc_root(&self) -> PathBuf {
        self.proc_root
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PROC_ROOT))
    }

    /// Effective log level; unset or unparsable values fall back to info.
    pub fn log_level(&self) -> LogLevel {
        self.log_level
            .as_deref()
            .and_then(|s| LogLevel::from_str(s, true).ok())
            .unwrap_or(LogLevel::Info)
    }
}

/// Validate effective config (used by --check-config and at startup)
pub fn validate_effective_config(cfg: &Config) -> Result<()> {
    if cfg.interval_ms == Some(0) {
        bail!("interval_ms must be greater than 0");
    }
    if cfg.max_argv_bytes == Some(0) {
        bail!("max_argv_bytes must be greater than 0");
    }
    if cfg.top_n == Some(0) {
        bail!("top_n must be greater than 0");
    }

    if let Some(level) = cfg.log_level.as_deref() {
        if LogLevel::from_str(level, true).is_err() {
            bail!(
                "Invalid log_level '{}', expected off, error, warn, info, debug or trace",
                level
            );
        }
    }

    if let Some(output) = cfg.output.as_deref() {
        match output {
            "text" | "json" => {}
            other => bail!("Invalid output '{}', expected 'text' or 'json'", other),
        }
    }

    Ok(())
}

/// Resolves configuration from CLI args, config file, and defaults.
/// This enforces precedence: CLI (if provided) > config file > default.
pub fn resolve_config(args: &Args) -> Result<Config> {
    let mut config = if args.no_config {
        Config::default()
    } else {
        load_config(args.config.as_deref())?
    };

    if let Some(ms) = args.interval_ms {
        config.interval_ms = Some(ms);
    }
    if let Some(n) = args.iterations {
        config.iterations = Some(n);
    }
    if let Some(bytes) = args.max_argv_bytes {
        config.max_argv_bytes = Some(bytes);
    }
    if let Some(root) = &args.proc_root {
        config.proc_root = Some(root.clone());
    }
    if let Some(n) = args.top_n {
        config.top_n = Some(n);
    }
    if let Some(output) = args.output {
        config.output = Some(output.as_str().to_string());
    }
    if let Some(level) = args.log_level {
        config.log_level = Some(level.as_str().to_string());
    }

    // Feature flags
    if args.metrics_only {
        config.metrics_only = Some(true);
    }
    if args.hide_kernel_threads {
        config.hide_kernel_threads = Some(true);
    }
    if args.hide_userland_threads {
        config.hide_userland_threads = Some(true);
    }
    if args.update_process_names {
        config.update_process_names = Some(true);
    }
    if args.show_hidden {
        config.show_hidden = Some(true);
    }

    Ok(config)
}

/// Loads the configuration from `path`, or from the first default location
/// that exists. Falls back to defaults when no file is found.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => match DEFAULT_CONFIG_PATHS.iter().find(|p| Path::new(p).exists()) {
            Some(p) => PathBuf::from(p),
            None => return Ok(Config::default()),
        },
    };

    if !path.exists() {
        return Ok(Config::default());
    }

    let content = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file {}", path.display()))?;

    let config: Config = match path.extension().and_then(|s| s.to_str()) {
        Some("json") => serde_json::from_str(&content)
            .with_context(|| format!("Invalid JSON in {}", path.display()))?,
        Some("toml") => toml::from_str(&content)
            .with_context(|| format!("Invalid TOML in {}", path.display()))?,
        // Default to YAML
        _ => serde_yaml::from_str(&content)
            .with_context(|| format!("Invalid YAML in {}", path.display()))?,
    };
    info!("Loaded configuration from: {}", path.display());
    Ok(config)
}

/// Renders a configuration in the requested format.
pub fn render_config(config: &Config, format: ConfigFormat) -> Result<String> {
    let output = match format {
        ConfigFormat::Json => serde_json::to_string_pretty(config)?,
        ConfigFormat::Toml => toml::to_string_pretty(config)?,
        ConfigFormat::Yaml => serde_yaml::to_string(config)?,
    };
    Ok(output)
}

/// Shows configuration in requested format
pub fn show_config(config: &Config, format: ConfigFormat) -> Result<()> {
    println!("{}", render_config(config, format)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_default_config_is_valid() {
        let cfg = Config::default();
        assert!(validate_effective_config(&cfg).is_ok());
        assert_eq!(cfg.sampler_settings(), SamplerSettings::default());
        assert_eq!(cfg.proc_root(), PathBuf::from("/proc"));
    }

    #[test]
    fn test_validate_rejects_zero_and_unknown_values() {
        let cfg = Config {
            interval_ms: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            max_argv_bytes: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            top_n: Some(0),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());

        let cfg = Config {
            output: Some("xml".into()),
            ..Config::default()
        };
        let err = validate_effective_config(&cfg).unwrap_err();
        assert!(err.to_string().contains("xml"));

        let cfg = Config {
            log_level: Some("verbose".into()),
            ..Config::default()
        };
        assert!(validate_effective_config(&cfg).is_err());
    }

    #[test]
    fn test_log_level_from_file_unless_flag_given() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("sampler.yaml");
        fs::write(&path, "log-level: debug\n").unwrap();
        let path_arg = path.to_string_lossy().to_string();

        let args = Args::parse_from(["herakles-proc-sampler", "--config", path_arg.as_str()]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.log_level(), LogLevel::Debug);

        let args = Args::parse_from([
            "herakles-proc-sampler",
            "--config",
            path_arg.as_str(),
            "--log-level",
            "warn",
        ]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.log_level(), LogLevel::Warn);

        assert_eq!(Config::default().log_level(), LogLevel::Info);
        let unset = Config {
            log_level: None,
            ..Config::default()
        };
        assert_eq!(unset.log_level(), LogLevel::Info);
    }

    #[test]
    fn test_load_yaml_with_aliases() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("sampler.yaml");
        fs::write(
            &path,
            "interval-ms: 250\nhide_kernel_threads: true\nmax-argv-bytes: 64\n",
        )
        .unwrap();

        let cfg = load_config(Some(&path)).unwrap();
        assert_eq!(cfg.interval_ms, Some(250));
        assert_eq!(cfg.hide_kernel_threads, Some(true));
        assert_eq!(cfg.max_argv_bytes, Some(64));
        assert_eq!(cfg.top_n, None);
    }

    #[test]
    fn test_load_json_and_toml() {
        let dir = tempdir().expect("Failed to create temp dir");

        let json = dir.path().join("sampler.json");
        fs::write(&json, r#"{"top_n": 5, "output": "json"}"#).unwrap();
        let cfg = load_config(Some(&json)).unwrap();
        assert_eq!(cfg.top_n, Some(5));
        assert_eq!(cfg.output.as_deref(), Some("json"));

        let toml_path = dir.path().join("sampler.toml");
        fs::write(&toml_path, "proc_root = \"/host/proc\"\n").unwrap();
        let cfg = load_config(Some(&toml_path)).unwrap();
        assert_eq!(cfg.proc_root, Some(PathBuf::from("/host/proc")));
    }

    #[test]
    fn test_load_invalid_file_reports_path() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let err = load_config(Some(&path)).unwrap_err();
        assert!(err.to_string().contains("broken.json"));
    }

    #[test]
    fn test_missing_explicit_file_uses_defaults() {
        let dir = tempdir().expect("Failed to create temp dir");
        let cfg = load_config(Some(&dir.path().join("absent.yaml"))).unwrap();
        assert_eq!(cfg, Config::default());
    }

    #[test]
    fn test_cli_overrides_file() {
        let dir = tempdir().expect("Failed to create temp dir");
        let path = dir.path().join("sampler.yaml");
        fs::write(&path, "interval_ms: 250\ntop_n: 3\n").unwrap();

        let path_arg = path.to_string_lossy().to_string();
        let args = Args::parse_from([
            "herakles-proc-sampler",
            "--config",
            path_arg.as_str(),
            "--interval-ms",
            "100",
            "--update-process-names",
        ]);
        let cfg = resolve_config(&args).unwrap();
        assert_eq!(cfg.interval_ms, Some(100));
        assert_eq!(cfg.top_n, Some(3));
        assert_eq!(cfg.update_process_names, Some(true));
    }

    #[test]
    fn test_render_config_round_trips_yaml() {
        let cfg = Config::default();
        let yaml = render_config(&cfg, ConfigFormat::Yaml).unwrap();
        let parsed: Config = serde_yaml::from_str(&yaml).unwrap();
        assert_eq!(parsed, cfg);
    }
}
