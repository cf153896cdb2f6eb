//! The tracked process record and its display state code.

use chrono::{DateTime, Local};
use std::fmt;
use std::sync::Arc;

/// Seconds after which a start time is shown as a date instead of a clock.
const START_TIME_DATE_THRESHOLD: i64 = 86_400;

/// User-facing process state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessState {
    /// A thread is executing on a CPU.
    OnCpu,
    Runnable,
    Sleeping,
    Stopped,
    Zombie,
    Dead,
    /// Being created.
    Idle,
    #[default]
    Unknown,
}

impl ProcessState {
    pub fn as_char(self) -> char {
        match self {
            ProcessState::OnCpu => 'P',
            ProcessState::Runnable => 'R',
            ProcessState::Sleeping => 'S',
            ProcessState::Stopped => 'T',
            ProcessState::Zombie => 'Z',
            ProcessState::Dead => 'D',
            ProcessState::Idle => 'I',
            ProcessState::Unknown => '?',
        }
    }
}

impl fmt::Display for ProcessState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// One tracked process.
///
/// Identity fields (`ppid` through `start_time_label`) are filled once when
/// the process is first seen. Everything else is refreshed every tick.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessEntity {
    pub pid: i32,
    pub ppid: i32,
    pub tgid: i32,
    pub session: i32,
    pub tty_nr: u64,
    pub tpgid: i32,
    pub pgrp: i32,
    pub st_uid: u32,
    /// Shared name from the users table; `None` when the uid has no entry.
    pub user: Option<Arc<str>>,
    /// Seconds since the epoch.
    pub start_time: i64,
    pub start_time_label: String,

    pub comm: String,
    /// Byte offset where the executable's name ends within `comm`.
    pub basename_offset: usize,

    pub m_virt_kb: u64,
    pub m_resident_kb: u64,
    pub percent_mem: f64,
    pub percent_cpu: f64,
    pub nlwp: u32,
    pub nice: i32,
    /// Accumulated CPU time in centiseconds.
    pub time_cs: u64,
    pub priority: i32,
    pub state: ProcessState,

    pub kernel_thread: bool,
    pub show: bool,
    pub updated: bool,
}

impl ProcessEntity {
    pub fn new(pid: i32) -> Self {
        Self {
            pid,
            ppid: 0,
            tgid: pid,
            session: 0,
            tty_nr: 0,
            tpgid: 0,
            pgrp: 0,
            st_uid: 0,
            user: None,
            start_time: 0,
            start_time_label: String::new(),
            comm: String::new(),
            basename_offset: 0,
            m_virt_kb: 0,
            m_resident_kb: 0,
            percent_mem: 0.0,
            percent_cpu: 0.0,
            nlwp: 0,
            nice: 0,
            time_cs: 0,
            priority: 0,
            state: ProcessState::Unknown,
            kernel_thread: false,
            show: true,
            updated: false,
        }
    }

    pub fn is_kernel_thread(&self) -> bool {
        self.kernel_thread
    }

    /// A thread of a userland process listed on its own.
    pub fn is_userland_thread(&self) -> bool {
        self.pid != self.tgid
    }

    /// The executable part of the command.
    pub fn basename(&self) -> &str {
        self.comm.get(..self.basename_offset).unwrap_or(&self.comm)
    }

    /// The arguments following the executable, including the separator.
    pub fn arguments(&self) -> &str {
        self.comm.get(self.basename_offset..).unwrap_or("")
    }

    /// Refreshes the start time and its display label.
    pub fn set_start_time(&mut self, start_time: i64, now: i64) {
        self.start_time = start_time;
        self.start_time_label = format_start_time(start_time, now);
    }
}

/// Formats a start time as `HH:MM` for processes started within the last
/// day and as `MonDD` otherwise, in local time.
pub fn format_start_time(start_time: i64, now: i64) -> String {
    let Some(utc) = DateTime::from_timestamp(start_time, 0) else {
        return String::from("?");
    };
    let local = utc.with_timezone(&Local);

    if now.saturating_sub(start_time) > START_TIME_DATE_THRESHOLD {
        local.format("%b%d").to_string()
    } else {
        local.format("%H:%M").to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_codes() {
        let codes: String = [
            ProcessState::OnCpu,
            ProcessState::Runnable,
            ProcessState::Sleeping,
            ProcessState::Stopped,
            ProcessState::Zombie,
            ProcessState::Dead,
            ProcessState::Idle,
            ProcessState::Unknown,
        ]
        .iter()
        .map(|s| s.as_char())
        .collect();
        assert_eq!(codes, "PRSTZDI?");
    }

    #[test]
    fn test_new_entity_defaults() {
        let p = ProcessEntity::new(42);
        assert_eq!(p.pid, 42);
        assert_eq!(p.tgid, 42);
        assert!(!p.is_userland_thread());
        assert!(p.show);
        assert!(!p.updated);
        assert_eq!(p.state, ProcessState::Unknown);
    }

    #[test]
    fn test_basename_and_arguments() {
        let mut p = ProcessEntity::new(1);
        p.comm = "/bin/sh -c ls".to_string();
        p.basename_offset = 7;
        assert_eq!(p.basename(), "/bin/sh");
        assert_eq!(p.arguments(), " -c ls");
    }

    #[test]
    fn test_basename_offset_out_of_range_falls_back() {
        let mut p = ProcessEntity::new(1);
        p.comm = "sh".to_string();
        p.basename_offset = 10;
        assert_eq!(p.basename(), "sh");
        assert_eq!(p.arguments(), "");
    }

    #[test]
    fn test_format_start_time_recent_is_clock() {
        let now = 1_700_000_000;
        let label = format_start_time(now - 60, now);
        assert_eq!(label.len(), 5);
        assert_eq!(label.as_bytes()[2], b':');
    }

    #[test]
    fn test_format_start_time_old_is_date() {
        let now = 1_700_000_000;
        let label = format_start_time(now - 3 * 86_400, now);
        assert_eq!(label.len(), 5);
        assert!(label.chars().take(3).all(|c| c.is_ascii_alphabetic()));
        assert!(label.chars().skip(3).all(|c| c.is_ascii_digit()));
    }
}
