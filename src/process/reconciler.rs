//! Reconciles raw kernel process records with tracked entities.

use tracing::{debug, trace};

use crate::kernel::{KernelParams, KernelSource, RawProcessRecord};
use crate::memory::memory_percent;
use crate::process::cmdline::reconstruct_command;
use crate::process::entity::{ProcessEntity, ProcessState};
use crate::process::state::{scan_threads, StateLevel};
use crate::registry::ProcessRegistry;
use crate::sampler::SamplerSettings;
use crate::users::UsersTable;

/// Per-tick values shared by every record of a snapshot.
#[derive(Debug, Clone, Copy)]
pub struct ScanContext<'a> {
    pub settings: &'a SamplerSettings,
    pub params: KernelParams,
    pub total_mem_kb: u64,
    /// Wall-clock seconds since the epoch, for start-time labels.
    pub now: i64,
}

/// CPU percentage from the kernel's fixed-point CPU fraction, clamped to
/// what `cpu_count` cores can deliver.
pub fn cpu_percent(pctcpu: u64, fscale: u64, cpu_count: usize) -> f64 {
    if fscale == 0 {
        return 0.0;
    }
    let pct = 100.0 * pctcpu as f64 / fscale as f64;
    pct.clamp(0.0, cpu_count.max(1) as f64 * 100.0)
}

/// Accumulated run time in centiseconds, rounded half up.
pub fn cpu_time_centis(sec: u64, usec: u64) -> u64 {
    sec.saturating_mul(100)
        .saturating_add(usec.saturating_add(5_000) / 10_000)
}

/// Brings the registry entity for `record` up to date and returns its
/// state.
///
/// A newly seen process gets its identity fields and command filled in.
/// An existing one keeps its identity; its command is rebuilt only when
/// `update_process_names` is set.
pub fn reconcile_process<K, R>(
    source: &mut K,
    users: &mut UsersTable,
    registry: &mut R,
    record: &RawProcessRecord,
    ctx: &ScanContext<'_>,
) -> ProcessState
where
    K: KernelSource + ?Sized,
    R: ProcessRegistry + ?Sized,
{
    let settings = ctx.settings;
    let (proc, pre_existing) = registry.lookup_or_create(record.pid);

    if !pre_existing {
        proc.ppid = record.ppid;
        proc.tpgid = record.tpgid;
        proc.tgid = record.pid;
        proc.session = record.session;
        proc.tty_nr = record.tty_nr;
        proc.pgrp = record.pgrp;
        proc.st_uid = record.uid;
        proc.set_start_time(record.start_time, ctx.now);
        proc.user = users.get_ref(record.uid);
        refresh_command(source, proc, record, settings.max_argv_bytes);
        debug!("New process {} ({})", proc.pid, proc.comm);
    } else if settings.update_process_names {
        refresh_command(source, proc, record, settings.max_argv_bytes);
    }

    proc.kernel_thread = record.kernel_thread;
    proc.show = !((settings.hide_kernel_threads && proc.is_kernel_thread())
        || (settings.hide_userland_threads && proc.is_userland_thread()));

    let page_kb = ctx.params.page_size_kb;
    proc.m_virt_kb = record.vm_vsize_pages.saturating_mul(page_kb);
    proc.m_resident_kb = record.vm_rssize_pages.saturating_mul(page_kb);
    proc.percent_mem = memory_percent(proc.m_resident_kb, ctx.total_mem_kb);
    proc.percent_cpu = cpu_percent(record.pctcpu, ctx.params.fscale, ctx.params.cpu_count);
    proc.nlwp = record.nlwps;
    proc.nice = record.nice - ctx.params.nice_base;
    proc.time_cs = cpu_time_centis(record.rtime_sec, record.rtime_usec);
    proc.priority = record.priority - ctx.params.priority_zero;

    proc.state = match record.state.level() {
        StateLevel::Settled(state) => state,
        StateLevel::ScanThreads => scan_threads(&source.fetch_thread_states(record)),
    };

    proc.updated = true;
    trace!(
        pid = proc.pid,
        state = %proc.state,
        cpu = proc.percent_cpu,
        mem = proc.percent_mem,
        "reconciled"
    );
    proc.state
}

fn refresh_command<K: KernelSource + ?Sized>(
    source: &mut K,
    proc: &mut ProcessEntity,
    record: &RawProcessRecord,
    max_argv_bytes: usize,
) {
    let argv = source.fetch_argv(record, max_argv_bytes);
    let (comm, basename_offset) = reconstruct_command(argv.as_deref(), &record.comm);
    proc.comm = comm;
    proc.basename_offset = basename_offset;
}
