//! Process tracking: entities, command reconstruction, state classification
//! and reconciliation against raw kernel records.
//!
//! This module provides:
//! - `entity`: the tracked `ProcessEntity` and its `ProcessState` code
//! - `cmdline`: display command and basename offset from an argument vector
//! - `state`: two-level process/thread state classification
//! - `reconciler`: per-record create-or-refresh of registry entities

pub mod cmdline;
pub mod entity;
pub mod reconciler;
pub mod state;

// Re-export commonly used types
pub use cmdline::reconstruct_command;
pub use entity::{format_start_time, ProcessEntity, ProcessState};
pub use reconciler::{cpu_percent, cpu_time_centis, reconcile_process, ScanContext};
pub use state::{classify, scan_threads, thread_state, StateLevel};
