//! Kernel snapshot boundary.
//!
//! A [`KernelSource`] is the only place that interprets platform-specific
//! process and CPU accounting data. Everything it hands out is an owned,
//! safe copy valid for one tick:
//! - `RawProcessRecord`: one process as the kernel reports it
//! - `RawCpuCounters`: one core's monotonic time counters
//! - `MemoryCounters`: system page counters
//!
//! `procfs` provides the Linux implementation.

pub mod procfs;

use crate::error::SamplerError;

pub use procfs::ProcfsSource;

/// Index of the user time category in a counter vector.
pub const CP_USER: usize = 0;
/// Index of the nice time category.
pub const CP_NICE: usize = 1;
/// Index of the system time category.
pub const CP_SYS: usize = 2;
/// Index of the interrupt time category.
pub const CP_INTR: usize = 3;
/// Index of the idle time category.
pub const CP_IDLE: usize = 4;
/// Minimum number of categories a counter vector must carry.
pub const CPU_STATES: usize = 5;

/// Monotonic time counters for a single core.
///
/// The first [`CPU_STATES`] entries are user, nice, system, interrupt and
/// idle. Any further categories only count towards the total.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCpuCounters {
    times: Vec<u64>,
}

impl RawCpuCounters {
    /// Wraps a counter vector, rejecting one that is too short to hold the
    /// named categories.
    pub fn new(core: usize, times: Vec<u64>) -> Result<Self, SamplerError> {
        if times.len() < CPU_STATES {
            return Err(SamplerError::MalformedCpuCounters {
                core,
                expected: CPU_STATES,
                got: times.len(),
            });
        }
        Ok(Self { times })
    }

    pub fn times(&self) -> &[u64] {
        &self.times
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }

    pub fn user(&self) -> u64 {
        self.times[CP_USER]
    }

    pub fn nice(&self) -> u64 {
        self.times[CP_NICE]
    }

    pub fn system(&self) -> u64 {
        self.times[CP_SYS]
    }

    pub fn interrupt(&self) -> u64 {
        self.times[CP_INTR]
    }

    pub fn idle(&self) -> u64 {
        self.times[CP_IDLE]
    }

    /// Sum of every category, named or not.
    pub fn total(&self) -> u64 {
        self.times.iter().fold(0u64, |acc, t| acc.wrapping_add(*t))
    }
}

/// System memory counters, in pages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MemoryCounters {
    pub total_pages: u64,
    pub free_pages: u64,
    pub paging_pages: u64,
    pub file_pages: u64,
    pub anon_pages: u64,
    pub exec_pages: u64,
    pub swap_pages: u64,
    pub swap_in_use_pages: u64,
}

/// Coarse process-level state as reported by the kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessRunState {
    /// Being created.
    Idle,
    /// Alive; the per-thread states decide what is shown.
    Active,
    Stopped,
    Zombie,
    Dead,
    Unknown,
}

/// State of a single kernel schedulable unit (thread).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LwpState {
    /// Executing on a CPU right now.
    OnProc,
    /// Runnable, waiting for a CPU.
    Run,
    Sleep,
    Stop,
    Idle,
    Zombie,
    Dead,
    Suspended,
    Unknown,
}

/// One process as reported by the kernel for the current tick.
#[derive(Debug, Clone, PartialEq)]
pub struct RawProcessRecord {
    pub pid: i32,
    pub ppid: i32,
    pub tpgid: i32,
    pub session: i32,
    pub tty_nr: u64,
    pub pgrp: i32,
    pub uid: u32,
    /// Start time in seconds since the epoch.
    pub start_time: i64,
    /// Kernel short name.
    pub comm: String,
    pub vm_vsize_pages: u64,
    pub vm_rssize_pages: u64,
    /// CPU fraction in fixed point, scaled by [`KernelParams::fscale`].
    pub pctcpu: u64,
    pub nlwps: u32,
    /// Raw nice value; [`KernelParams::nice_base`] means nice 0.
    pub nice: i32,
    pub rtime_sec: u64,
    pub rtime_usec: u64,
    /// Raw priority; [`KernelParams::priority_zero`] means priority 0.
    pub priority: i32,
    pub state: ProcessRunState,
    pub kernel_thread: bool,
}

/// Per-source constants, fixed when the source is opened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KernelParams {
    pub page_size_kb: u64,
    pub fscale: u64,
    pub nice_base: i32,
    pub priority_zero: i32,
    pub cpu_count: usize,
}

/// Provider of raw kernel snapshots.
///
/// Counter fetches are fatal on failure. Argument vectors and thread lists
/// are best effort and report absence instead of failing.
pub trait KernelSource {
    fn params(&self) -> KernelParams;

    fn fetch_memory_counters(&mut self) -> Result<MemoryCounters, SamplerError>;

    fn fetch_per_core_counters(&mut self, core: usize) -> Result<RawCpuCounters, SamplerError>;

    /// All processes currently known to the kernel. Order is not stable
    /// across ticks.
    fn fetch_process_snapshot(&mut self) -> Vec<RawProcessRecord>;

    /// Argument vector of the process, bounded to roughly `max_bytes`.
    /// `None` when it cannot be retrieved.
    fn fetch_argv(&mut self, record: &RawProcessRecord, max_bytes: usize) -> Option<Vec<String>>;

    /// Thread states in kernel-reported order; empty when unavailable.
    fn fetch_thread_states(&mut self, record: &RawProcessRecord) -> Vec<LwpState>;
}
