//! Process registry: owner of the tracked process records.
//!
//! The sampler only needs [`ProcessRegistry::lookup_or_create`]. The default
//! [`ProcessTable`] adds the tick bookkeeping: clearing `updated` flags
//! before a scan and reaping the records no scan touched.

use ahash::AHashMap as HashMap;
use std::collections::hash_map::Entry;
use tracing::debug;

use crate::process::ProcessEntity;

/// Storage for tracked processes, indexed by pid.
pub trait ProcessRegistry {
    /// Returns the entity for `pid`, inserting a fresh one if absent, and
    /// whether it already existed.
    fn lookup_or_create(&mut self, pid: i32) -> (&mut ProcessEntity, bool);
}

/// Hash-map backed registry.
#[derive(Debug, Default)]
pub struct ProcessTable {
    processes: HashMap<i32, ProcessEntity>,
}

impl ProcessTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks every entity as not yet seen this tick.
    pub fn prepare(&mut self) {
        for p in self.processes.values_mut() {
            p.updated = false;
        }
    }

    /// Removes entities that were not updated since [`prepare`]. Returns
    /// how many were removed.
    ///
    /// [`prepare`]: ProcessTable::prepare
    pub fn reap(&mut self) -> usize {
        let before = self.processes.len();
        self.processes.retain(|pid, p| {
            if !p.updated {
                debug!("Reaping pid {} ({})", pid, p.comm);
            }
            p.updated
        });
        before - self.processes.len()
    }

    pub fn get(&self, pid: i32) -> Option<&ProcessEntity> {
        self.processes.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.processes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.processes.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessEntity> {
        self.processes.values()
    }

    /// Entities sorted by CPU percentage (descending), ties broken by pid.
    /// Hidden entities are skipped unless `include_hidden` is set.
    pub fn sorted_by_cpu(&self, include_hidden: bool) -> Vec<&ProcessEntity> {
        let mut list: Vec<&ProcessEntity> = self
            .processes
            .values()
            .filter(|p| include_hidden || p.show)
            .collect();
        list.sort_by(|a, b| {
            b.percent_cpu
                .total_cmp(&a.percent_cpu)
                .then_with(|| a.pid.cmp(&b.pid))
        });
        list
    }
}

impl ProcessRegistry for ProcessTable {
    fn lookup_or_create(&mut self, pid: i32) -> (&mut ProcessEntity, bool) {
        match self.processes.entry(pid) {
            Entry::Occupied(e) => (e.into_mut(), true),
            Entry::Vacant(v) => (v.insert(ProcessEntity::new(pid)), false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_or_create() {
        let mut table = ProcessTable::new();

        let (p, existed) = table.lookup_or_create(10);
        assert!(!existed);
        p.comm = "first".to_string();

        let (p, existed) = table.lookup_or_create(10);
        assert!(existed);
        assert_eq!(p.comm, "first");
        assert_eq!(table.len(), 1);
    }

    #[test]
    fn test_prepare_and_reap() {
        let mut table = ProcessTable::new();
        table.lookup_or_create(1).0.updated = true;
        table.lookup_or_create(2).0.updated = true;

        table.prepare();
        assert!(table.iter().all(|p| !p.updated));

        table.lookup_or_create(2).0.updated = true;
        assert_eq!(table.reap(), 1);
        assert!(table.get(1).is_none());
        assert!(table.get(2).is_some());
    }

    #[test]
    fn test_sorted_by_cpu() {
        let mut table = ProcessTable::new();
        table.lookup_or_create(1).0.percent_cpu = 5.0;
        table.lookup_or_create(2).0.percent_cpu = 50.0;
        {
            let (p, _) = table.lookup_or_create(3);
            p.percent_cpu = 90.0;
            p.show = false;
        }
        table.lookup_or_create(4).0.percent_cpu = 5.0;

        let visible: Vec<i32> = table.sorted_by_cpu(false).iter().map(|p| p.pid).collect();
        assert_eq!(visible, vec![2, 1, 4]);

        let all: Vec<i32> = table.sorted_by_cpu(true).iter().map(|p| p.pid).collect();
        assert_eq!(all, vec![3, 2, 1, 4]);
    }
}
