//! Process state classification from kernel process and thread states.
//!
//! Classification has two levels. The process-level state settles most
//! cases on its own; only an active process falls through to a scan of its
//! threads, where the first thread with a recognised state decides.

use crate::kernel::{LwpState, ProcessRunState};
use crate::process::entity::ProcessState;

/// Outcome of the process-level lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateLevel {
    /// The process-level state decides on its own.
    Settled(ProcessState),
    /// The threads have to be scanned.
    ScanThreads,
}

/// Thread states that can represent the whole process, in precedence order.
const THREAD_PRECEDENCE: [(LwpState, ProcessState); 4] = [
    (LwpState::OnProc, ProcessState::OnCpu),
    (LwpState::Run, ProcessState::Runnable),
    (LwpState::Sleep, ProcessState::Sleeping),
    (LwpState::Stop, ProcessState::Stopped),
];

impl ProcessRunState {
    pub fn level(self) -> StateLevel {
        match self {
            ProcessRunState::Idle => StateLevel::Settled(ProcessState::Idle),
            ProcessRunState::Active => StateLevel::ScanThreads,
            ProcessRunState::Stopped => StateLevel::Settled(ProcessState::Stopped),
            ProcessRunState::Zombie => StateLevel::Settled(ProcessState::Zombie),
            ProcessRunState::Dead => StateLevel::Settled(ProcessState::Dead),
            ProcessRunState::Unknown => StateLevel::Settled(ProcessState::Unknown),
        }
    }
}

/// Maps a single thread state through the precedence table.
pub fn thread_state(lwp: LwpState) -> ProcessState {
    THREAD_PRECEDENCE
        .iter()
        .find(|(state, _)| *state == lwp)
        .map(|(_, mapped)| *mapped)
        .unwrap_or(ProcessState::Unknown)
}

/// Scans threads in reported order; the first recognised state wins, even
/// if a later thread has a higher-precedence state.
pub fn scan_threads(threads: &[LwpState]) -> ProcessState {
    threads
        .iter()
        .map(|t| thread_state(*t))
        .find(|s| *s != ProcessState::Unknown)
        .unwrap_or(ProcessState::Unknown)
}

/// Full classification for a process and its thread states.
pub fn classify(run_state: ProcessRunState, threads: &[LwpState]) -> ProcessState {
    match run_state.level() {
        StateLevel::Settled(state) => state,
        StateLevel::ScanThreads => scan_threads(threads),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settled_states() {
        assert_eq!(classify(ProcessRunState::Idle, &[]), ProcessState::Idle);
        assert_eq!(classify(ProcessRunState::Stopped, &[]), ProcessState::Stopped);
        assert_eq!(classify(ProcessRunState::Zombie, &[]), ProcessState::Zombie);
        assert_eq!(classify(ProcessRunState::Dead, &[]), ProcessState::Dead);
        assert_eq!(classify(ProcessRunState::Unknown, &[]), ProcessState::Unknown);
    }

    #[test]
    fn test_settled_states_ignore_threads() {
        assert_eq!(
            classify(ProcessRunState::Zombie, &[LwpState::OnProc]),
            ProcessState::Zombie
        );
    }

    #[test]
    fn test_active_first_recognised_thread_wins() {
        assert_eq!(
            classify(ProcessRunState::Active, &[LwpState::Sleep, LwpState::OnProc]),
            ProcessState::Sleeping
        );
        assert_eq!(
            classify(ProcessRunState::Active, &[LwpState::OnProc, LwpState::Sleep]),
            ProcessState::OnCpu
        );
    }

    #[test]
    fn test_active_skips_unrecognised_threads() {
        assert_eq!(
            classify(
                ProcessRunState::Active,
                &[LwpState::Zombie, LwpState::Suspended, LwpState::Run]
            ),
            ProcessState::Runnable
        );
    }

    #[test]
    fn test_active_without_threads_is_unknown() {
        assert_eq!(classify(ProcessRunState::Active, &[]), ProcessState::Unknown);
        assert_eq!(
            classify(ProcessRunState::Active, &[LwpState::Dead, LwpState::Idle]),
            ProcessState::Unknown
        );
    }

    #[test]
    fn test_thread_state_table() {
        assert_eq!(thread_state(LwpState::OnProc), ProcessState::OnCpu);
        assert_eq!(thread_state(LwpState::Run), ProcessState::Runnable);
        assert_eq!(thread_state(LwpState::Sleep), ProcessState::Sleeping);
        assert_eq!(thread_state(LwpState::Stop), ProcessState::Stopped);
        assert_eq!(thread_state(LwpState::Unknown), ProcessState::Unknown);
    }
}
