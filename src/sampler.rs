//! Sampling orchestration.
//!
//! One tick refreshes memory statistics, then CPU statistics, then (unless
//! process updates are paused) reconciles every process of the kernel
//! snapshot into the registry. A fatal counter error aborts the tick before
//! any process is touched.

use tracing::{debug, info, instrument};

use crate::cpu::CpuSet;
use crate::error::SamplerError;
use crate::kernel::{KernelParams, KernelSource};
use crate::memory::MemoryStats;
use crate::process::{reconcile_process, ProcessState, ScanContext};
use crate::registry::{ProcessRegistry, ProcessTable};
use crate::users::UsersTable;

/// Default upper bound for argument vector retrieval, in bytes.
pub const DEFAULT_MAX_ARGV_BYTES: usize = 500;

/// Behaviour switches for process reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SamplerSettings {
    pub hide_kernel_threads: bool,
    pub hide_userland_threads: bool,
    /// Rebuild the command of already tracked processes every tick.
    pub update_process_names: bool,
    pub max_argv_bytes: usize,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        Self {
            hide_kernel_threads: false,
            hide_userland_threads: false,
            update_process_names: false,
            max_argv_bytes: DEFAULT_MAX_ARGV_BYTES,
        }
    }
}

/// Counts gathered during one tick.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    pub total_tasks: usize,
    /// Processes with a thread on a CPU.
    pub running_tasks: usize,
    /// False when process updates were paused.
    pub processes_scanned: bool,
}

/// Periodic sampler over a kernel source.
pub struct Sampler<K: KernelSource> {
    source: K,
    settings: SamplerSettings,
    params: KernelParams,
    cpus: CpuSet,
    memory: MemoryStats,
    users: UsersTable,
}

impl<K: KernelSource> Sampler<K> {
    pub fn new(source: K, settings: SamplerSettings) -> Self {
        let params = source.params();
        info!(
            "Sampler initialized: {} cores, page size {} KB, fscale {}",
            params.cpu_count, params.page_size_kb, params.fscale
        );
        Self {
            source,
            settings,
            params,
            cpus: CpuSet::new(params.cpu_count),
            memory: MemoryStats::default(),
            users: UsersTable::new(),
        }
    }

    /// Replaces the users table, e.g. with a pre-seeded one.
    pub fn with_users(mut self, users: UsersTable) -> Self {
        self.users = users;
        self
    }

    pub fn settings(&self) -> &SamplerSettings {
        &self.settings
    }

    pub fn params(&self) -> KernelParams {
        self.params
    }

    pub fn cpus(&self) -> &CpuSet {
        &self.cpus
    }

    pub fn memory(&self) -> &MemoryStats {
        &self.memory
    }

    pub fn source_mut(&mut self) -> &mut K {
        &mut self.source
    }

    /// Runs one tick against `registry`.
    ///
    /// With `pause_process_update` only the memory and CPU statistics are
    /// refreshed and the registry is left untouched.
    #[instrument(skip_all, fields(pause = pause_process_update))]
    pub fn tick<R: ProcessRegistry + ?Sized>(
        &mut self,
        registry: &mut R,
        pause_process_update: bool,
    ) -> Result<TickReport, SamplerError> {
        self.refresh_memory()?;
        self.cpus.refresh(&mut self.source)?;

        if pause_process_update {
            debug!("Process updates paused, refreshed system statistics only");
            return Ok(TickReport::default());
        }

        let ctx = ScanContext {
            settings: &self.settings,
            params: self.params,
            total_mem_kb: self.memory.total_kb,
            now: chrono::Utc::now().timestamp(),
        };

        let mut report = TickReport {
            processes_scanned: true,
            ..TickReport::default()
        };

        let snapshot = self.source.fetch_process_snapshot();
        for record in &snapshot {
            let state =
                reconcile_process(&mut self.source, &mut self.users, registry, record, &ctx);
            report.total_tasks += 1;
            if state == ProcessState::OnCpu {
                report.running_tasks += 1;
            }
        }

        debug!(
            "Tick complete: {} tasks, {} running",
            report.total_tasks, report.running_tasks
        );
        Ok(report)
    }

    /// Runs one tick with the [`ProcessTable`] bookkeeping around it: flags
    /// are cleared before and stale entities reaped after. A paused tick
    /// skips both.
    pub fn scan(
        &mut self,
        table: &mut ProcessTable,
        pause_process_update: bool,
    ) -> Result<TickReport, SamplerError> {
        if pause_process_update {
            return self.tick(table, true);
        }

        table.prepare();
        let report = self.tick(table, false)?;
        let reaped = table.reap();
        if reaped > 0 {
            debug!("Removed {} exited processes", reaped);
        }
        Ok(report)
    }

    fn refresh_memory(&mut self) -> Result<(), SamplerError> {
        let counters = self.source.fetch_memory_counters()?;
        self.memory = MemoryStats::from_counters(&counters, self.params.page_size_kb);
        debug!(
            "Memory: total={} KB used={} KB swap={}/{} KB",
            self.memory.total_kb,
            self.memory.used_kb,
            self.memory.used_swap_kb,
            self.memory.total_swap_kb
        );
        Ok(())
    }
}
