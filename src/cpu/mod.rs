//! Per-core and system-average CPU accounting.
//!
//! This module provides:
//! - `delta`: saturating counter deltas
//! - `CpuData`: absolute counters plus per-tick periods for one core
//! - `CpuSet`: the collection of cores with the average entity at index 0

pub mod delta;

use serde::Serialize;
use tracing::{debug, trace};

use crate::error::SamplerError;
use crate::kernel::{KernelSource, RawCpuCounters};

pub use delta::delta;

/// Absolute counters and per-tick deltas for one CPU entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CpuData {
    pub total_time: u64,
    pub user_time: u64,
    pub nice_time: u64,
    pub sys_time: u64,
    pub sys_all_time: u64,
    pub intr_time: u64,
    pub idle_time: u64,

    pub total_period: u64,
    pub user_period: u64,
    pub nice_period: u64,
    pub sys_period: u64,
    pub sys_all_period: u64,
    pub intr_period: u64,
    pub idle_period: u64,
}

impl Default for CpuData {
    /// Total time and period start at 1 so ratios over the first tick are
    /// well defined.
    fn default() -> Self {
        Self {
            total_time: 1,
            user_time: 0,
            nice_time: 0,
            sys_time: 0,
            sys_all_time: 0,
            intr_time: 0,
            idle_time: 0,
            total_period: 1,
            user_period: 0,
            nice_period: 0,
            sys_period: 0,
            sys_all_period: 0,
            intr_period: 0,
            idle_period: 0,
        }
    }
}

/// Share of the last period spent in each category, in percent.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CpuUsage {
    pub user: f64,
    pub nice: f64,
    pub system: f64,
    pub interrupt: f64,
    pub idle: f64,
    pub busy: f64,
}

impl CpuData {
    /// Folds a fresh counter vector into this entity: periods become the
    /// saturating deltas against the stored absolutes, then the absolutes
    /// are replaced.
    pub fn update(&mut self, counters: &RawCpuCounters) {
        let total_time = counters.total();
        let sys_all_time = counters.interrupt().saturating_add(counters.system());

        self.total_period = delta(self.total_time, total_time);
        self.user_period = delta(self.user_time, counters.user());
        self.nice_period = delta(self.nice_time, counters.nice());
        self.sys_period = delta(self.sys_time, counters.system());
        self.sys_all_period = delta(self.sys_all_time, sys_all_time);
        self.intr_period = delta(self.intr_time, counters.interrupt());
        self.idle_period = delta(self.idle_time, counters.idle());

        self.total_time = total_time;
        self.user_time = counters.user();
        self.nice_time = counters.nice();
        self.sys_time = counters.system();
        self.sys_all_time = sys_all_time;
        self.intr_time = counters.interrupt();
        self.idle_time = counters.idle();
    }

    /// Percentages of the last total period. All zero when nothing elapsed.
    pub fn usage(&self) -> CpuUsage {
        if self.total_period == 0 {
            return CpuUsage::default();
        }

        let total = self.total_period as f64;
        let pct = |period: u64| (period as f64 / total * 100.0).clamp(0.0, 100.0);
        let idle = pct(self.idle_period);

        CpuUsage {
            user: pct(self.user_period),
            nice: pct(self.nice_period),
            system: pct(self.sys_period),
            interrupt: pct(self.intr_period),
            idle,
            busy: 100.0 - idle,
        }
    }
}

/// All CPU entities: index 0 is the system average, `1..=cores` the cores.
#[derive(Debug, Clone)]
pub struct CpuSet {
    cpus: Vec<CpuData>,
}

impl CpuSet {
    /// Allocates `cpu_count + 1` entities. A count of zero is treated as one.
    pub fn new(cpu_count: usize) -> Self {
        let cpu_count = cpu_count.max(1);
        Self {
            cpus: vec![CpuData::default(); cpu_count + 1],
        }
    }

    pub fn cpu_count(&self) -> usize {
        self.cpus.len() - 1
    }

    /// The system-average entity.
    pub fn average(&self) -> &CpuData {
        &self.cpus[0]
    }

    /// Core `index` (0-based).
    pub fn core(&self, index: usize) -> Option<&CpuData> {
        self.cpus.get(index + 1)
    }

    pub fn cores(&self) -> &[CpuData] {
        &self.cpus[1..]
    }

    /// Fetches every core's counters and folds them in. Nothing is updated
    /// unless all cores could be read.
    pub fn refresh<K: KernelSource>(&mut self, source: &mut K) -> Result<(), SamplerError> {
        let counters = (0..self.cpu_count())
            .map(|core| source.fetch_per_core_counters(core))
            .collect::<Result<Vec<_>, _>>()?;
        self.apply(&counters)
    }

    /// Folds one counter vector per core into the set and recomputes the
    /// average entity from per-category sums divided by the core count.
    pub fn apply(&mut self, counters: &[RawCpuCounters]) -> Result<(), SamplerError> {
        let cpu_count = self.cpu_count();
        if counters.len() != cpu_count {
            return Err(SamplerError::CpuCountersUnavailable {
                core: counters.len().min(cpu_count),
                reason: format!("expected {} cores, got {}", cpu_count, counters.len()),
            });
        }

        let width = counters[0].len();
        if let Some((core, c)) = counters.iter().enumerate().find(|(_, c)| c.len() != width) {
            return Err(SamplerError::MalformedCpuCounters {
                core,
                expected: width,
                got: c.len(),
            });
        }

        let mut sums = vec![0u128; width];
        for (core, c) in counters.iter().enumerate() {
            self.cpus[core + 1].update(c);
            for (sum, t) in sums.iter_mut().zip(c.times()) {
                *sum += u128::from(*t);
            }
            trace!(
                core,
                user = c.user(),
                nice = c.nice(),
                sys = c.system(),
                intr = c.interrupt(),
                idle = c.idle(),
                "core counters"
            );
        }

        let divisor = cpu_count as u128;
        let avg: Vec<u64> = sums
            .into_iter()
            .map(|s| u64::try_from(s / divisor).unwrap_or(u64::MAX))
            .collect();
        let avg = RawCpuCounters::new(0, avg)?;
        self.cpus[0].update(&avg);

        debug!(
            "CPU average: user={} nice={} sys={} intr={} idle={} total_period={}",
            self.cpus[0].user_period,
            self.cpus[0].nice_period,
            self.cpus[0].sys_period,
            self.cpus[0].intr_period,
            self.cpus[0].idle_period,
            self.cpus[0].total_period
        );
        Ok(())
    }
}
