//! Herakles Process Sampler Library
//!
//! This library samples per-core CPU usage, memory usage and the process
//! table of a running system the way an interactive process viewer does.
//! Kernel access sits behind the [`KernelSource`] trait so the sampling
//! logic can run against `/proc` or against a scripted source in tests.
//!
//! # Features
//!
//! - **Per-core CPU statistics**: period deltas over monotonic counters plus a
//!   system-wide average
//! - **Memory statistics**: total, used, buffers, cached and swap in KB
//! - **Process tracking**: identity reconciliation across ticks, command line
//!   reconstruction and two-level state classification
//!
//! # Usage
//!
//! ```no_run
//! use herakles_proc_sampler::{ProcessTable, ProcfsSource, Sampler, SamplerSettings};
//!
//! let source = ProcfsSource::new("/proc").expect("procfs");
//! let mut sampler = Sampler::new(source, SamplerSettings::default());
//! let mut table = ProcessTable::new();
//!
//! let report = sampler.scan(&mut table, false).expect("tick");
//! println!("{} tasks, {} running", report.total_tasks, report.running_tasks);
//! println!("cpu busy: {:.1}%", sampler.cpus().average().usage().busy);
//! ```

pub mod cpu;
pub mod error;
pub mod kernel;
pub mod memory;
pub mod process;
pub mod registry;
pub mod sampler;
pub mod users;

// Re-export main types for convenience
pub use cpu::{CpuData, CpuSet, CpuUsage};
pub use error::SamplerError;
pub use kernel::{
    KernelParams, KernelSource, LwpState, MemoryCounters, ProcessRunState, ProcfsSource,
    RawCpuCounters, RawProcessRecord,
};
pub use memory::MemoryStats;
pub use process::{ProcessEntity, ProcessState};
pub use registry::{ProcessRegistry, ProcessTable};
pub use sampler::{Sampler, SamplerSettings, TickReport, DEFAULT_MAX_ARGV_BYTES};
pub use users::UsersTable;
