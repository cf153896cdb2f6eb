//! System-wide memory statistics.
//!
//! Converts the kernel's page counters into kilobyte values for the memory
//! and swap meters. The conversion follows NetBSD top(1): buffers are the
//! file-backed pages, cached covers anonymous, file and executable pages.

use serde::Serialize;

use crate::kernel::MemoryCounters;

/// Memory and swap usage in kilobytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MemoryStats {
    pub total_kb: u64,
    pub used_kb: u64,
    pub buffers_kb: u64,
    pub cached_kb: u64,
    pub total_swap_kb: u64,
    pub used_swap_kb: u64,
}

impl MemoryStats {
    pub fn from_counters(c: &MemoryCounters, page_size_kb: u64) -> Self {
        let kb = |pages: u64| pages.saturating_mul(page_size_kb);

        let total_kb = kb(c.total_pages);
        let buffers_kb = kb(c.file_pages);
        let cached_kb = kb(c
            .anon_pages
            .saturating_add(c.file_pages)
            .saturating_add(c.exec_pages));
        let active_kb = kb(c
            .total_pages
            .saturating_sub(c.free_pages)
            .saturating_sub(c.paging_pages));
        let used_kb = active_kb
            .saturating_add(buffers_kb)
            .saturating_add(cached_kb)
            .min(total_kb);

        Self {
            total_kb,
            used_kb,
            buffers_kb,
            cached_kb,
            total_swap_kb: kb(c.swap_pages),
            used_swap_kb: kb(c.swap_in_use_pages),
        }
    }
}

/// Share of `total_kb` taken by `resident_kb`, in percent.
///
/// `total_kb` must be positive; a zero total yields 0 instead of dividing.
pub fn memory_percent(resident_kb: u64, total_kb: u64) -> f64 {
    if total_kb == 0 {
        return 0.0;
    }
    resident_kb as f64 / total_kb as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_percent() {
        assert_eq!(memory_percent(0, 1024), 0.0);
        assert!((memory_percent(256, 1024) - 25.0).abs() < 1e-9);
        assert!((memory_percent(1024, 1024) - 100.0).abs() < 1e-9);
    }

    #[test]
    fn test_memory_percent_zero_total() {
        assert_eq!(memory_percent(512, 0), 0.0);
    }

    #[test]
    fn test_from_counters_converts_pages() {
        let counters = MemoryCounters {
            total_pages: 1000,
            free_pages: 600,
            paging_pages: 0,
            file_pages: 50,
            anon_pages: 100,
            exec_pages: 10,
            swap_pages: 200,
            swap_in_use_pages: 20,
        };
        let stats = MemoryStats::from_counters(&counters, 4);

        assert_eq!(stats.total_kb, 4000);
        assert_eq!(stats.buffers_kb, 200);
        assert_eq!(stats.cached_kb, 640);
        // (1000 - 600) * 4 + 200 + 640
        assert_eq!(stats.used_kb, 2440);
        assert_eq!(stats.total_swap_kb, 800);
        assert_eq!(stats.used_swap_kb, 80);
    }

    #[test]
    fn test_from_counters_used_never_exceeds_total() {
        let counters = MemoryCounters {
            total_pages: 100,
            free_pages: 10,
            file_pages: 60,
            anon_pages: 40,
            ..Default::default()
        };
        let stats = MemoryStats::from_counters(&counters, 4);
        assert_eq!(stats.used_kb, stats.total_kb);
    }

    #[test]
    fn test_from_counters_free_above_total_saturates() {
        let counters = MemoryCounters {
            total_pages: 10,
            free_pages: 20,
            ..Default::default()
        };
        let stats = MemoryStats::from_counters(&counters, 4);
        assert_eq!(stats.used_kb, 0);
    }
}
