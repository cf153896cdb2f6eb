//! Sampling loop implementation.
//!
//! Runs the sampler against procfs and prints one report per tick, either
//! as a top-style text summary or as a JSON document.

use anyhow::{Context, Result};
use chrono::Utc;
use herakles_proc_sampler::{
    CpuSet, CpuUsage, MemoryStats, ProcessEntity, ProcessTable, ProcfsSource, Sampler, TickReport,
};
use serde::Serialize;
use std::fmt::Write as _;
use std::io::IsTerminal;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, info};

use crate::config::{Config, DEFAULT_INTERVAL_MS, DEFAULT_TOP_N};

/// Everything shown for one tick.
#[derive(Debug, Serialize)]
pub struct TickView {
    pub tick: u64,
    pub timestamp: String,
    pub cpu: CpuView,
    pub memory: MemoryStats,
    pub tasks: TasksView,
    /// Empty when process updates are paused.
    pub processes: Vec<ProcessView>,
}

#[derive(Debug, Serialize)]
pub struct CpuView {
    pub average: CpuUsage,
    pub cores: Vec<CpuUsage>,
}

#[derive(Debug, Serialize)]
pub struct TasksView {
    pub total: usize,
    pub running: usize,
    pub tracked: usize,
}

#[derive(Debug, Serialize)]
pub struct ProcessView {
    pub pid: i32,
    pub ppid: i32,
    pub user: String,
    pub state: char,
    pub nice: i32,
    pub priority: i32,
    pub virt_kb: u64,
    pub res_kb: u64,
    pub cpu_percent: f64,
    pub mem_percent: f64,
    pub time: String,
    pub start: String,
    pub threads: u32,
    pub command: String,
    pub basename: String,
}

impl ProcessView {
    fn from_entity(p: &ProcessEntity) -> Self {
        Self {
            pid: p.pid,
            ppid: p.ppid,
            user: p
                .user
                .as_deref()
                .map(str::to_string)
                .unwrap_or_else(|| p.st_uid.to_string()),
            state: p.state.as_char(),
            nice: p.nice,
            priority: p.priority,
            virt_kb: p.m_virt_kb,
            res_kb: p.m_resident_kb,
            cpu_percent: p.percent_cpu,
            mem_percent: p.percent_mem,
            time: format_cpu_time(p.time_cs),
            start: p.start_time_label.clone(),
            threads: p.nlwp,
            command: p.comm.clone(),
            basename: p.basename().to_string(),
        }
    }
}

/// Formats centiseconds as `M:SS.cc`, or `HhMM:SS` from one hour on.
pub fn format_cpu_time(centis: u64) -> String {
    let total_seconds = centis / 100;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds / 60) % 60;
    let seconds = total_seconds % 60;

    if hours > 0 {
        format!("{}h{:02}:{:02}", hours, minutes, seconds)
    } else {
        format!("{}:{:02}.{:02}", minutes, seconds, centis % 100)
    }
}

/// Collects the view of one tick.
pub fn build_view(
    tick: u64,
    cpus: &CpuSet,
    memory: &MemoryStats,
    report: &TickReport,
    table: &ProcessTable,
    top_n: usize,
    show_hidden: bool,
) -> TickView {
    let processes = if report.processes_scanned {
        table
            .sorted_by_cpu(show_hidden)
            .into_iter()
            .take(top_n)
            .map(ProcessView::from_entity)
            .collect()
    } else {
        Vec::new()
    };

    TickView {
        tick,
        timestamp: Utc::now().to_rfc3339(),
        cpu: CpuView {
            average: cpus.average().usage(),
            cores: cpus.cores().iter().map(|c| c.usage()).collect(),
        },
        memory: *memory,
        tasks: TasksView {
            total: report.total_tasks,
            running: report.running_tasks,
            tracked: table.len(),
        },
        processes,
    }
}

/// Renders a tick as a top-style text block. With `highlight`, the
/// executable part of each command is printed in bold.
pub fn render_text(view: &TickView, highlight: bool) -> String {
    let mut out = String::new();
    let avg = &view.cpu.average;

    let _ = writeln!(out, "--- tick {} ({}) ---", view.tick, view.timestamp);
    let _ = writeln!(
        out,
        "CPU: {:5.1}% busy  usr {:5.1}%  nice {:5.1}%  sys {:5.1}%  irq {:5.1}%  idle {:5.1}%",
        avg.busy, avg.user, avg.nice, avg.system, avg.interrupt, avg.idle
    );

    let cores: Vec<String> = view
        .cpu
        .cores
        .iter()
        .enumerate()
        .map(|(i, c)| format!("{}:{:5.1}%", i + 1, c.busy))
        .collect();
    let _ = writeln!(out, "Cores: {}", cores.join("  "));

    let m = &view.memory;
    let _ = writeln!(
        out,
        "Mem: {} / {} MB (buffers {} MB, cached {} MB)  Swap: {} / {} MB",
        m.used_kb / 1024,
        m.total_kb / 1024,
        m.buffers_kb / 1024,
        m.cached_kb / 1024,
        m.used_swap_kb / 1024,
        m.total_swap_kb / 1024
    );
    let _ = writeln!(
        out,
        "Tasks: {} total, {} running, {} tracked",
        view.tasks.total, view.tasks.running, view.tasks.tracked
    );

    if view.processes.is_empty() {
        return out;
    }

    let _ = writeln!(
        out,
        "\n{:>7} {:<10} {} {:>3} {:>4} {:>9} {:>9} {:>6} {:>5} {:>10} {:>5}  COMMAND",
        "PID", "USER", "S", "NI", "PRI", "VIRT", "RES", "CPU%", "MEM%", "TIME+", "START"
    );
    for p in &view.processes {
        let command = if highlight {
            let args = p.command.get(p.basename.len()..).unwrap_or("");
            format!("\x1b[1m{}\x1b[0m{}", p.basename, args)
        } else {
            p.command.clone()
        };
        let _ = writeln!(
            out,
            "{:>7} {:<10} {} {:>3} {:>4} {:>9} {:>9} {:>6.1} {:>5.1} {:>10} {:>5}  {}",
            p.pid,
            truncate(&p.user, 10),
            p.state,
            p.nice,
            p.priority,
            p.virt_kb,
            p.res_kb,
            p.cpu_percent,
            p.mem_percent,
            p.time,
            p.start,
            command
        );
    }
    out
}

fn truncate(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Runs the sampling loop until the configured number of iterations is
/// reached, or forever.
pub fn command_run(config: &Config) -> Result<()> {
    let proc_root = config.proc_root();
    let source = ProcfsSource::new(&proc_root)
        .with_context(|| format!("Failed to open procfs at {}", proc_root.display()))?;

    let interval = Duration::from_millis(config.interval_ms.unwrap_or(DEFAULT_INTERVAL_MS));
    let top_n = config.top_n.unwrap_or(DEFAULT_TOP_N);
    let show_hidden = config.show_hidden.unwrap_or(false);
    let metrics_only = config.metrics_only.unwrap_or(false);
    let json = config.output.as_deref() == Some("json");
    let highlight = !json && std::io::stdout().is_terminal();

    let mut sampler = Sampler::new(source, config.sampler_settings());
    let mut table = ProcessTable::new();

    info!(
        "Sampling every {}ms ({})",
        interval.as_millis(),
        match config.iterations {
            Some(n) => format!("{} iterations", n),
            None => "until interrupted".to_string(),
        }
    );

    let mut tick: u64 = 0;
    loop {
        let start = Instant::now();
        let report = sampler.scan(&mut table, metrics_only)?;
        tick += 1;
        debug!(
            "Tick {} sampled in {:.2}ms",
            tick,
            start.elapsed().as_secs_f64() * 1000.0
        );

        let view = build_view(
            tick,
            sampler.cpus(),
            sampler.memory(),
            &report,
            &table,
            top_n,
            show_hidden,
        );
        if json {
            println!("{}", serde_json::to_string(&view)?);
        } else {
            print!("{}", render_text(&view, highlight));
        }

        if config.iterations.is_some_and(|n| tick >= n) {
            break;
        }
        thread::sleep(interval);
    }

    Ok(())
}
