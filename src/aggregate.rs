use std::collections::HashMap;

use crate::manager::Snapshot;

/// Subtree totals for one rendering pass, so overlapping queries are summed once.
/// A subtree total is the own memory of a process plus that of all its descendants.
pub struct SubtreeCache<'a> {
    snapshot: &'a Snapshot,
    totals: HashMap<u32, f64>,
}

impl<'a> SubtreeCache<'a> {
    pub fn new(snapshot: &'a Snapshot) -> Self {
        Self {
            snapshot,
            totals: HashMap::new(),
        }
    }

    pub fn get(&mut self, pid: u32) -> f64 {
        if let Some(total) = self.totals.get(&pid) {
            return *total;
        }
        for current in self.snapshot.post_order(pid) {
            if self.totals.contains_key(&current) {
                continue;
            }
            let own = self.snapshot.get(current).map_or(0., |p| p.memory_mb);
            let children: f64 = self
                .snapshot
                .children(current)
                .map(|child| self.totals.get(&child.pid).copied().unwrap_or(0.))
                .sum();
            self.totals.insert(current, own + children);
        }
        self.totals.get(&pid).copied().unwrap_or(0.)
    }
}
