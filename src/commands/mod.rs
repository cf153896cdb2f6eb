//! CLI command implementations for herakles-proc-sampler.
//!
//! This module provides implementations for all CLI modes:
//! - `run`: the sampling loop (default mode)
//! - `check`: System validation
//! - `config`: Configuration file generation

pub mod check;
pub mod config;
pub mod run;

// Re-export command functions
pub use check::command_check;
pub use config::command_config;
pub use run::command_run;
