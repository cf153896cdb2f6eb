//! Test to verify system-average CPU accounting.
//!
//! This test validates that the average entity at index 0 holds the
//! per-category mean of the cores, computed by summing first and dividing
//! once, rather than a sum or a mean of per-core percentages.

use herakles_proc_sampler::{CpuSet, RawCpuCounters};

fn counters(rows: &[[u64; 5]]) -> Vec<RawCpuCounters> {
    rows.iter()
        .enumerate()
        .map(|(core, row)| RawCpuCounters::new(core, row.to_vec()).unwrap())
        .collect()
}

#[test]
fn test_cpu_average_is_mean_not_sum() {
    // 3 cores with user time 10, 20, 30: the sum is 60, the average 20
    let mut cpus = CpuSet::new(3);
    cpus.apply(&counters(&[
        [10, 0, 0, 0, 90],
        [20, 0, 0, 0, 80],
        [30, 0, 0, 0, 70],
    ]))
    .unwrap();

    assert_eq!(cpus.average().user_time, 20);
    assert_ne!(cpus.average().user_time, 60);
    assert_eq!(cpus.average().idle_time, 80);
    assert_eq!(cpus.average().total_time, 100);
}

#[test]
fn test_cpu_average_single_core() {
    // Edge case: a single core is its own average
    let mut cpus = CpuSet::new(1);
    cpus.apply(&counters(&[[15, 1, 4, 2, 78]])).unwrap();

    let avg = cpus.average();
    let core = cpus.core(0).unwrap();
    assert_eq!(avg.user_time, core.user_time);
    assert_eq!(avg.sys_all_time, core.sys_all_time);
    assert_eq!(avg.total_period, core.total_period);
}

#[test]
fn test_cpu_average_truncates_after_summing() {
    // user: (1 + 1) / 2 = 1, halving first would give 0 + 0
    let mut cpus = CpuSet::new(2);
    cpus.apply(&counters(&[[1, 0, 3, 0, 0], [1, 0, 4, 0, 0]]))
        .unwrap();

    assert_eq!(cpus.average().sys_time, 3);
    assert_eq!(cpus.average().user_time, 1);
}

#[test]
fn test_cpu_average_high_values() {
    // Large counters must not overflow while summing
    let big = u64::MAX / 2;
    let mut cpus = CpuSet::new(3);
    cpus.apply(&counters(&[
        [big, 0, 0, 0, 0],
        [big, 0, 0, 0, 0],
        [big, 0, 0, 0, 0],
    ]))
    .unwrap();

    assert_eq!(cpus.average().user_time, big);
}

#[test]
fn test_cpu_average_period_over_ticks() {
    let mut cpus = CpuSet::new(2);
    cpus.apply(&counters(&[[10, 0, 0, 0, 90], [30, 0, 0, 0, 70]]))
        .unwrap();
    cpus.apply(&counters(&[[60, 0, 0, 0, 140], [50, 0, 0, 0, 150]]))
        .unwrap();

    let avg = cpus.average();
    // user: (110 / 2) - (40 / 2) = 55 - 20
    assert_eq!(avg.user_period, 35);
    assert_eq!(avg.total_period, 100);
    assert!((avg.usage().user - 35.0).abs() < 1e-9);
}
