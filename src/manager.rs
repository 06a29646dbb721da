use std::collections::{HashMap, HashSet};

use log::debug;

use crate::myprocess::{ProcessRecord, RawProcess};
use crate::source::MemoryReader;

/// Orphans are reparented here, so its direct children are the top level.
pub const INIT_PID: u32 = 1;

/// Immutable view of the process table taken once per run.
#[derive(Default, Debug)]
pub struct Snapshot {
    records: HashMap<u32, ProcessRecord>,
    //pids in source row order
    order: Vec<u32>,
    children: HashMap<u32, Vec<u32>>,
    //lowest pid of each parent loop, treated as a root
    detached: HashSet<u32>,
}

impl Snapshot {
    /// Keeps a row only if it uses memory or hangs directly off init.
    /// Memory is sampled for every row since the decision depends on it.
    pub fn build<I, M>(rows: I, memory: &M) -> Snapshot
    where
        I: IntoIterator<Item = RawProcess>,
        M: MemoryReader + ?Sized,
    {
        let mut snapshot = Snapshot::default();
        for raw in rows {
            let memory_mb = memory.memory_of(raw.pid);
            let memory_mb = if memory_mb.is_finite() && memory_mb > 0. {
                memory_mb
            } else {
                0.
            };
            if memory_mb == 0. && raw.parent != INIT_PID {
                continue;
            }
            match ProcessRecord::from_raw(raw, memory_mb) {
                Some(record) => snapshot.insert(record),
                None => debug!("skipping process with empty command"),
            }
        }
        snapshot.break_cycles();
        snapshot
    }

    fn insert(&mut self, record: ProcessRecord) {
        if self.records.contains_key(&record.pid) {
            debug!("duplicate pid {} skipped", record.pid);
            return;
        }
        self.order.push(record.pid);
        self.children.entry(record.parent).or_default().push(record.pid);
        self.records.insert(record.pid, record);
    }

    //loops like parent 1 -> child 2 -> parent 1 can show up with pid reuse
    //the lowest pid of the loop becomes a root so every process stays reachable
    fn break_cycles(&mut self) {
        let mut detached = HashSet::new();
        let mut done = HashSet::new();
        for &start in &self.order {
            let mut path = vec![];
            let mut on_path = HashSet::new();
            let mut current = start;
            while !done.contains(&current) {
                let Some(record) = self.records.get(&current) else {
                    break;
                };
                if !on_path.insert(current) {
                    let begin = path.iter().position(|p| *p == current).unwrap_or(0);
                    if let Some(&lowest) = path[begin..].iter().min() {
                        debug!("breaking parent loop at pid {lowest}");
                        detached.insert(lowest);
                    }
                    break;
                }
                path.push(current);
                if record.parent == record.pid {
                    break;
                }
                current = record.parent;
            }
            done.extend(path);
        }
        self.detached = detached;
    }

    pub fn get(&self, pid: u32) -> Option<&ProcessRecord> {
        self.records.get(&pid)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Records in the order the source listed them.
    pub fn records(&self) -> impl Iterator<Item = &ProcessRecord> {
        self.order.iter().filter_map(|pid| self.records.get(pid))
    }

    pub fn total_memory(&self) -> f64 {
        self.records().map(|p| p.memory_mb).sum()
    }

    pub fn is_root(&self, record: &ProcessRecord) -> bool {
        record.parent == INIT_PID
            || record.parent == record.pid
            || !self.records.contains_key(&record.parent)
            || self.detached.contains(&record.pid)
    }

    /// Top level of the forest, in source order.
    pub fn roots(&self) -> Vec<&ProcessRecord> {
        self.records().filter(|p| self.is_root(p)).collect()
    }

    /// Roots shown to the user. Init itself is left out, its adopted children
    /// are the top level; its own memory still counts towards the total.
    pub fn top_level(&self) -> Vec<&ProcessRecord> {
        self.records()
            .filter(|p| p.pid != INIT_PID && self.is_root(p))
            .collect()
    }

    /// Children in source order. Roots are never anyone's child.
    pub fn children(&self, pid: u32) -> impl Iterator<Item = &ProcessRecord> {
        self.children
            .get(&pid)
            .into_iter()
            .flatten()
            .filter_map(|child| self.records.get(child))
            .filter(|child| !self.is_root(child))
    }

    /// Every pid of the subtree under `pid`, children before their parent.
    pub fn post_order(&self, pid: u32) -> Vec<u32> {
        let mut out = vec![];
        let mut seen = HashSet::new();
        let mut stack = vec![(pid, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                out.push(current);
                continue;
            }
            if !seen.insert(current) {
                continue;
            }
            stack.push((current, true));
            for child in self.children(current) {
                stack.push((child.pid, false));
            }
        }
        out
    }
}
