//! Error types for the sampler core.
//!
//! Only fatal conditions are represented here. A required kernel counter
//! source that is unavailable or structurally wrong aborts the tick, and the
//! binary terminates on it. Degraded paths (missing argv, missing thread
//! list, a process exiting mid-scan) never produce an error.

use std::path::PathBuf;

/// Fatal sampler errors.
#[derive(Debug, thiserror::Error)]
pub enum SamplerError {
    #[error("Failed to read CPU counters for core {core}: {reason}")]
    CpuCountersUnavailable { core: usize, reason: String },

    #[error("Malformed CPU counters for core {core}: expected {expected} categories, got {got}")]
    MalformedCpuCounters {
        core: usize,
        expected: usize,
        got: usize,
    },

    #[error("Failed to read memory counters: {0}")]
    MemoryCountersUnavailable(String),

    #[error("Kernel source not available at {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{0} sysconf call failed")]
    Sysconf(&'static str),
}
