use serde::Deserialize;

use crate::aggregate::SubtreeCache;
use crate::manager::{Snapshot, INIT_PID};
use crate::myprocess::ProcessRecord;

/// When a supervisor's subtree outweighs `threshold` of all memory, the summary
/// lists its direct children instead of the supervisor itself.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(default)]
pub struct SupervisorPolicy {
    pub marker: String,
    pub threshold: f64,
}

impl Default for SupervisorPolicy {
    fn default() -> Self {
        Self {
            marker: "systemd".to_string(),
            threshold: 0.5,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SummaryEntry {
    pub pid: u32,
    pub memory_mb: f64,
}

impl SupervisorPolicy {
    pub fn is_supervisor(&self, root: &ProcessRecord) -> bool {
        root.command.contains(&self.marker) && root.parent == INIT_PID
    }

    pub fn is_dominant_supervisor(&self, root: &ProcessRecord, subtree: f64, total: f64) -> bool {
        self.is_supervisor(root) && subtree > total * self.threshold
    }
}

/// Top level summary entries, largest first.
pub fn unwrap_roots(
    snapshot: &Snapshot,
    cache: &mut SubtreeCache,
    policy: &SupervisorPolicy,
) -> Vec<SummaryEntry> {
    let total = snapshot.total_memory();
    let mut entries = vec![];
    for root in snapshot.top_level() {
        let subtree = cache.get(root.pid);
        if policy.is_dominant_supervisor(root, subtree, total) {
            for child in snapshot.children(root.pid) {
                let memory_mb = cache.get(child.pid);
                if memory_mb > 0. {
                    entries.push(SummaryEntry {
                        pid: child.pid,
                        memory_mb,
                    });
                }
            }
        } else {
            entries.push(SummaryEntry {
                pid: root.pid,
                memory_mb: subtree,
            });
        }
    }
    entries.sort_by(|a, b| b.memory_mb.total_cmp(&a.memory_mb));
    entries
}
