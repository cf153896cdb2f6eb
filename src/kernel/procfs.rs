//! Linux kernel source reading the /proc filesystem.
//!
//! - `<root>/stat`: per-core counters, core count, boot time
//! - `<root>/meminfo`: memory and swap counters
//! - `<root>/<pid>/stat`, `cmdline`, `task/<tid>/stat`: processes and threads
//!
//! Linux does not publish a kernel-side CPU fraction per process, so the
//! source derives one from the change in process CPU time between its own
//! consecutive observations of a pid.

use ahash::AHashMap as HashMap;
use ahash::AHashSet as HashSet;
use once_cell::sync::Lazy;
use std::fs;
use std::io::Read;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::error::SamplerError;
use crate::kernel::{
    KernelParams, KernelSource, LwpState, MemoryCounters, ProcessRunState, RawCpuCounters,
    RawProcessRecord,
};

/// Fixed-point scale for the CPU fraction handed out in records.
pub const FSCALE: u64 = 2048;

/// `PF_KTHREAD` from include/linux/sched.h.
const PF_KTHREAD: u64 = 0x0020_0000;

/// Get system clock ticks per second (usually 100, but can vary).
fn get_clk_tck() -> u64 {
    // SAFETY: sysconf is safe to call with _SC_CLK_TCK
    // Returns -1 on error, 0 if undefined - both are handled by the > 0 check
    let tck = unsafe { libc::sysconf(libc::_SC_CLK_TCK) };
    if tck > 0 {
        tck as u64
    } else {
        100
    }
}

/// System clock ticks per second (for CPU time calculation).
pub static CLK_TCK: Lazy<u64> = Lazy::new(get_clk_tck);

fn page_size_bytes() -> Result<u64, SamplerError> {
    // SAFETY: sysconf is safe to call with _SC_PAGESIZE
    let size = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if size <= 0 {
        return Err(SamplerError::Sysconf("pagesize"));
    }
    Ok(size as u64)
}

/// Previous CPU time observation for one pid.
struct CpuEntry {
    cpu_time_seconds: f64,
    last_updated: Instant,
}

/// Fields of `/proc/<pid>/stat` used by the sampler.
#[derive(Debug, Clone, PartialEq)]
pub struct PidStat {
    pub comm: String,
    pub state: char,
    pub ppid: i32,
    pub pgrp: i32,
    pub session: i32,
    pub tty_nr: u64,
    pub tpgid: i32,
    pub flags: u64,
    pub utime: u64,
    pub stime: u64,
    pub priority: i32,
    pub nice: i32,
    pub num_threads: u32,
    pub starttime: u64,
    pub vsize: u64,
    pub rss: u64,
}

/// Parses the contents of a `stat` file. The command name may contain
/// spaces and parentheses, so fields are located after the last `)`.
pub fn parse_pid_stat(content: &str) -> Option<PidStat> {
    let open = content.find('(')?;
    let close = content.rfind(')')?;
    if close < open {
        return None;
    }
    let comm = content[open + 1..close].to_string();
    let fields: Vec<&str> = content[close + 1..].split_whitespace().collect();
    if fields.len() < 22 {
        return None;
    }

    let num = |i: usize| fields[i].parse::<i64>().ok();

    Some(PidStat {
        comm,
        state: fields[0].chars().next()?,
        ppid: num(1)? as i32,
        pgrp: num(2)? as i32,
        session: num(3)? as i32,
        tty_nr: num(4)?.max(0) as u64,
        tpgid: num(5)? as i32,
        flags: fields[6].parse().ok()?,
        utime: fields[11].parse().ok()?,
        stime: fields[12].parse().ok()?,
        priority: num(15)? as i32,
        nice: num(16)? as i32,
        num_threads: num(17)?.max(0) as u32,
        starttime: fields[19].parse().ok()?,
        vsize: fields[20].parse().ok()?,
        rss: num(21)?.max(0) as u64,
    })
}

/// Process-level state from the `stat` state character.
pub fn run_state_from_char(c: char) -> ProcessRunState {
    match c {
        'Z' => ProcessRunState::Zombie,
        'X' | 'x' => ProcessRunState::Dead,
        'T' | 't' => ProcessRunState::Stopped,
        'R' | 'S' | 'D' | 'I' | 'W' | 'P' | 'K' => ProcessRunState::Active,
        _ => ProcessRunState::Unknown,
    }
}

/// Thread state from the `stat` state character. Linux reports `R` for a
/// thread that is running.
pub fn thread_state_from_char(c: char) -> LwpState {
    match c {
        'R' => LwpState::OnProc,
        'S' | 'D' | 'I' => LwpState::Sleep,
        'T' | 't' => LwpState::Stop,
        'Z' => LwpState::Zombie,
        'X' | 'x' => LwpState::Dead,
        _ => LwpState::Unknown,
    }
}

/// Counter vector for `cpu<core>` from the contents of `/proc/stat`:
/// user, nice, system, irq + softirq, idle, iowait, steal.
pub fn parse_core_counters(content: &str, core: usize) -> Result<Vec<u64>, SamplerError> {
    let label = format!("cpu{}", core);
    let line = content
        .lines()
        .find(|l| l.split_whitespace().next() == Some(label.as_str()))
        .ok_or_else(|| SamplerError::CpuCountersUnavailable {
            core,
            reason: format!("no {} line in stat", label),
        })?;

    let values: Vec<u64> = line
        .split_whitespace()
        .skip(1)
        .map(|v| v.parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|e| SamplerError::CpuCountersUnavailable {
            core,
            reason: format!("invalid counter: {}", e),
        })?;

    if values.len() < 7 {
        return Err(SamplerError::MalformedCpuCounters {
            core,
            expected: 7,
            got: values.len(),
        });
    }

    let steal = values.get(7).copied().unwrap_or(0);
    Ok(vec![
        values[0],
        values[1],
        values[2],
        values[5].saturating_add(values[6]),
        values[3],
        values[4],
        steal,
    ])
}

/// Number of `cpuN` lines, at least 1.
pub fn count_cpus(stat_content: &str) -> usize {
    stat_content
        .lines()
        .filter_map(|l| l.split_whitespace().next())
        .filter(|label| {
            label
                .strip_prefix("cpu")
                .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
        })
        .count()
        .max(1)
}

/// Boot time in epoch seconds from the `btime` line.
pub fn parse_boot_time(stat_content: &str) -> Option<i64> {
    stat_content
        .lines()
        .find_map(|l| l.strip_prefix("btime "))
        .and_then(|v| v.trim().parse().ok())
}

/// Memory counters from the contents of `/proc/meminfo`, converted from KB
/// to pages.
///
/// MemFree on Linux excludes the page cache, so Buffers and Cached are
/// reported as paging pages and the file, anon and exec counts stay 0.
/// Used memory then comes out as MemTotal - MemFree - Buffers - Cached.
pub fn parse_meminfo(content: &str, page_size_kb: u64) -> Result<MemoryCounters, SamplerError> {
    let mut total: Option<u64> = None;
    let mut free: Option<u64> = None;
    let mut buffers = 0;
    let mut cached = 0;
    let mut swap_total = 0;
    let mut swap_free = 0;

    for line in content.lines() {
        let mut parts = line.split_whitespace();
        let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
            continue;
        };
        let Ok(kb) = value.parse::<u64>() else {
            continue;
        };
        match key {
            "MemTotal:" => total = Some(kb),
            "MemFree:" => free = Some(kb),
            "Buffers:" => buffers = kb,
            "Cached:" => cached = kb,
            "SwapTotal:" => swap_total = kb,
            "SwapFree:" => swap_free = kb,
            _ => {}
        }
    }

    let (Some(total), Some(free)) = (total, free) else {
        return Err(SamplerError::MemoryCountersUnavailable(
            "MemTotal or MemFree missing from meminfo".to_string(),
        ));
    };

    let pages = |kb: u64| kb / page_size_kb.max(1);
    Ok(MemoryCounters {
        total_pages: pages(total),
        free_pages: pages(free),
        paging_pages: pages(buffers.saturating_add(cached)),
        file_pages: 0,
        anon_pages: 0,
        exec_pages: 0,
        swap_pages: pages(swap_total),
        swap_in_use_pages: pages(swap_total.saturating_sub(swap_free)),
    })
}

/// Kernel source over a procfs mount.
pub struct ProcfsSource {
    root: PathBuf,
    params: KernelParams,
    page_size: u64,
    boot_time: i64,
    clk_tck: u64,
    cpu_cache: HashMap<i32, CpuEntry>,
    /// `<root>/stat` as read for core 0 of the current tick.
    stat_snapshot: Option<String>,
}

impl ProcfsSource {
    /// Opens the procfs mounted at `root` (normally `/proc`).
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, SamplerError> {
        let root = root.into();
        let stat_path = root.join("stat");
        let stat = fs::read_to_string(&stat_path).map_err(|source| {
            SamplerError::SourceUnavailable {
                path: stat_path.clone(),
                source,
            }
        })?;

        let page_size = page_size_bytes()?;
        let cpu_count = count_cpus(&stat);
        let boot_time = parse_boot_time(&stat).unwrap_or_else(|| {
            warn!("No btime in {}, start times are relative to the epoch", stat_path.display());
            0
        });

        let params = KernelParams {
            page_size_kb: (page_size / 1024).max(1),
            fscale: FSCALE,
            nice_base: 0,
            priority_zero: 0,
            cpu_count,
        };
        info!(
            "Opened procfs at {} ({} cores, boot time {})",
            root.display(),
            cpu_count,
            boot_time
        );

        Ok(Self {
            root,
            params,
            page_size,
            boot_time,
            clk_tck: *CLK_TCK,
            cpu_cache: HashMap::new(),
            stat_snapshot: None,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn read_record(&mut self, pid: i32, proc_path: &Path, now: Instant) -> Option<RawProcessRecord> {
        let content = match fs::read_to_string(proc_path.join("stat")) {
            Ok(c) => c,
            Err(e) => {
                debug!("Failed to read stat for pid {}: {}", pid, e);
                return None;
            }
        };
        let Some(stat) = parse_pid_stat(&content) else {
            debug!("Malformed stat for pid {}", pid);
            return None;
        };
        let uid = match fs::metadata(proc_path) {
            Ok(m) => m.uid(),
            Err(e) => {
                debug!("Failed to stat {}: {}", proc_path.display(), e);
                return None;
            }
        };

        let clk = self.clk_tck.max(1);
        let ticks = stat.utime.saturating_add(stat.stime);
        let pctcpu = self.cpu_fraction(pid, ticks as f64 / clk as f64, now);

        Some(RawProcessRecord {
            pid,
            ppid: stat.ppid,
            tpgid: stat.tpgid,
            session: stat.session,
            tty_nr: stat.tty_nr,
            pgrp: stat.pgrp,
            uid,
            start_time: self.boot_time + (stat.starttime / clk) as i64,
            comm: stat.comm,
            vm_vsize_pages: stat.vsize / self.page_size,
            vm_rssize_pages: stat.rss,
            pctcpu,
            nlwps: stat.num_threads,
            nice: stat.nice,
            rtime_sec: ticks / clk,
            rtime_usec: (ticks % clk) * 1_000_000 / clk,
            priority: stat.priority,
            state: run_state_from_char(stat.state),
            kernel_thread: stat.flags & PF_KTHREAD != 0,
        })
    }

    /// Fixed-point CPU fraction since the previous observation of `pid`;
    /// 0 the first time a pid is seen.
    fn cpu_fraction(&mut self, pid: i32, cpu_time_seconds: f64, now: Instant) -> u64 {
        let mut fraction = 0.0;
        if let Some(entry) = self.cpu_cache.get(&pid) {
            let dt = now.duration_since(entry.last_updated).as_secs_f64();
            if dt > 0.0 {
                let delta_cpu = cpu_time_seconds - entry.cpu_time_seconds;
                if delta_cpu > 0.0 {
                    fraction = delta_cpu / dt;
                }
            }
        }
        self.cpu_cache.insert(
            pid,
            CpuEntry {
                cpu_time_seconds,
                last_updated: now,
            },
        );
        (fraction * FSCALE as f64) as u64
    }
}

impl KernelSource for ProcfsSource {
    fn params(&self) -> KernelParams {
        self.params
    }

    fn fetch_memory_counters(&mut self) -> Result<MemoryCounters, SamplerError> {
        let path = self.root.join("meminfo");
        let content = fs::read_to_string(&path).map_err(|e| {
            SamplerError::MemoryCountersUnavailable(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))
        })?;
        parse_meminfo(&content, self.params.page_size_kb)
    }

    /// Cores are requested in ascending order each tick: `stat` is read once
    /// for core 0 and the other cores are parsed from that same read.
    fn fetch_per_core_counters(&mut self, core: usize) -> Result<RawCpuCounters, SamplerError> {
        if core == 0 || self.stat_snapshot.is_none() {
            let content = fs::read_to_string(self.root.join("stat")).map_err(|e| {
                SamplerError::CpuCountersUnavailable {
                    core,
                    reason: e.to_string(),
                }
            })?;
            self.stat_snapshot = Some(content);
        }
        let content = self.stat_snapshot.as_deref().unwrap_or_default();
        RawCpuCounters::new(core, parse_core_counters(content, core)?)
    }

    fn fetch_process_snapshot(&mut self) -> Vec<RawProcessRecord> {
        let entries = match fs::read_dir(&self.root) {
            Ok(e) => e,
            Err(e) => {
                warn!("Failed to list {}: {}", self.root.display(), e);
                return Vec::new();
            }
        };

        let now = Instant::now();
        let mut records = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            let Some(pid) = path
                .file_name()
                .and_then(|s| s.to_str())
                .filter(|n| n.chars().all(|c| c.is_ascii_digit()))
                .and_then(|n| n.parse::<i32>().ok())
            else {
                continue;
            };
            if let Some(record) = self.read_record(pid, &path, now) {
                records.push(record);
            }
        }

        let seen: HashSet<i32> = records.iter().map(|r| r.pid).collect();
        self.cpu_cache.retain(|pid, _| seen.contains(pid));

        debug!("Found {} processes under {}", records.len(), self.root.display());
        records
    }

    fn fetch_argv(&mut self, record: &RawProcessRecord, max_bytes: usize) -> Option<Vec<String>> {
        let path = self.root.join(record.pid.to_string()).join("cmdline");
        let mut buf = Vec::new();
        let file = fs::File::open(&path).ok()?;
        if let Err(e) = file.take(max_bytes as u64).read_to_end(&mut buf) {
            debug!("Failed to read {}: {}", path.display(), e);
            return None;
        }

        let mut args: Vec<String> = buf
            .split(|&b| b == 0u8)
            .map(|s| String::from_utf8_lossy(s).into_owned())
            .collect();
        // cmdline is NUL-terminated
        if args.last().is_some_and(|a| a.is_empty()) {
            args.pop();
        }
        if args.iter().all(|a| a.is_empty()) {
            return None;
        }
        Some(args)
    }

    fn fetch_thread_states(&mut self, record: &RawProcessRecord) -> Vec<LwpState> {
        let task_dir = self.root.join(record.pid.to_string()).join("task");
        let Ok(entries) = fs::read_dir(&task_dir) else {
            return Vec::new();
        };

        let mut tids: Vec<i32> = entries
            .flatten()
            .filter_map(|e| e.file_name().to_str().and_then(|n| n.parse().ok()))
            .collect();
        tids.sort_unstable();

        tids.into_iter()
            .filter_map(|tid| {
                let content = fs::read_to_string(task_dir.join(tid.to_string()).join("stat")).ok()?;
                let stat = parse_pid_stat(&content)?;
                Some(thread_state_from_char(stat.state))
            })
            .collect()
    }
}
