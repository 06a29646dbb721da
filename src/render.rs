use std::collections::HashMap;
use std::io::{self, Write};

use crate::aggregate::SubtreeCache;
use crate::helpers::{format_size, shorten_command};
use crate::manager::Snapshot;
use crate::myprocess::ProcessRecord;
use crate::supervisor::{unwrap_roots, SupervisorPolicy};

const BOX_WIDTH: usize = 56;

#[derive(Clone, Copy, Debug)]
pub struct Layout {
    pub top: usize,
    pub tree_width: usize,
    pub summary_width: usize,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            top: 10,
            tree_width: 42,
            summary_width: 30,
        }
    }
}

/// Boxed panel with the total and the largest consumers after unwrapping.
pub fn render_summary<W: Write>(
    out: &mut W,
    snapshot: &Snapshot,
    cache: &mut SubtreeCache,
    policy: &SupervisorPolicy,
    layout: &Layout,
) -> io::Result<()> {
    let total = snapshot.total_memory();
    let inner = BOX_WIDTH - 4;
    let rule = "═".repeat(BOX_WIDTH - 2);
    let width = layout.summary_width;

    writeln!(out, "╔{rule}╗")?;
    let mem_line = format!("Total Memory: {}", format_size(total));
    writeln!(out, "║ {mem_line:<inner$} ║")?;
    writeln!(out, "╠{rule}╣")?;
    writeln!(out, "║ {:<inner$} ║", "Top Processes (with children):")?;
    writeln!(out, "╠{rule}╣")?;

    for entry in unwrap_roots(snapshot, cache, policy).iter().take(layout.top) {
        let Some(proc) = snapshot.get(entry.pid) else {
            continue;
        };
        let cmd = shorten_command(&proc.command, width);
        let pct = if total > 0. {
            entry.memory_mb / total * 100.
        } else {
            0.
        };
        let line = format!("{cmd:<width$} {:>8} ({pct:5.1}%)", format_size(entry.memory_mb));
        writeln!(out, "║ {line:<inner$} ║")?;
    }

    writeln!(out, "╚{rule}╝")?;
    writeln!(out)
}

struct Frame {
    pid: u32,
    prefix: String,
    last: bool,
}

/// Full parentage, depth first, largest first. Lines under `floor` are left out
/// but their descendants above it keep their place in the tree.
pub fn render_tree<W: Write>(
    out: &mut W,
    snapshot: &Snapshot,
    cache: &mut SubtreeCache,
    floor: f64,
    layout: &Layout,
) -> io::Result<()> {
    let width = layout.tree_width;
    let peaks = peak_memory(snapshot);
    let shown = |pid: &u32| peaks.get(pid).is_some_and(|peak| *peak >= floor);

    writeln!(out, "{:<width$} {:>8}  PID", "Process", "Memory")?;
    writeln!(out, "{}", "─".repeat(width + 27))?;

    let mut roots: Vec<(u32, f64)> = snapshot
        .top_level()
        .iter()
        .map(|p| (p.pid, cache.get(p.pid)))
        .collect();
    roots.sort_by(|a, b| b.1.total_cmp(&a.1));
    let roots: Vec<u32> = roots.into_iter().map(|r| r.0).filter(shown).collect();

    let mut stack = frames(&roots, "");
    while let Some(frame) = stack.pop() {
        let Some(proc) = snapshot.get(frame.pid) else {
            continue;
        };
        if proc.memory_mb >= floor {
            let connector = if frame.last { "└── " } else { "├── " };
            writeln!(
                out,
                "{}{connector}{:<width$} {:>8}  (pid {})",
                frame.prefix,
                shorten_command(&proc.command, width),
                format_size(proc.memory_mb),
                proc.pid
            )?;
        }

        let extension = if frame.last { "    " } else { "│   " };
        let mut children: Vec<&ProcessRecord> = snapshot
            .children(proc.pid)
            .filter(|c| shown(&c.pid))
            .collect();
        children.sort_by(|a, b| b.memory_mb.total_cmp(&a.memory_mb));
        let children: Vec<u32> = children.iter().map(|c| c.pid).collect();
        stack.extend(frames(&children, &format!("{}{extension}", frame.prefix)));
    }
    Ok(())
}

//reversed, so popping the stack yields them in order
fn frames(pids: &[u32], prefix: &str) -> Vec<Frame> {
    pids.iter()
        .enumerate()
        .rev()
        .map(|(i, pid)| Frame {
            pid: *pid,
            prefix: prefix.to_string(),
            last: i == pids.len() - 1,
        })
        .collect()
}

///largest own memory anywhere in each subtree
fn peak_memory(snapshot: &Snapshot) -> HashMap<u32, f64> {
    let mut peaks: HashMap<u32, f64> = HashMap::new();
    for root in snapshot.roots() {
        for pid in snapshot.post_order(root.pid) {
            let own = snapshot.get(pid).map_or(0., |p| p.memory_mb);
            let peak = snapshot
                .children(pid)
                .filter_map(|c| peaks.get(&c.pid))
                .fold(own, |a, b| a.max(*b));
            peaks.insert(pid, peak);
        }
    }
    peaks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::tests::snapshot_of;

    fn sample() -> Snapshot {
        snapshot_of(&[
            (10, 1, "/usr/lib/systemd/systemd", 100.),
            (11, 10, "/usr/bin/firefox", 5000.),
            (12, 10, "/usr/bin/bash", 10.),
        ])
    }

    fn tree(snapshot: &Snapshot, floor: f64) -> Vec<String> {
        let mut cache = SubtreeCache::new(snapshot);
        let mut out = vec![];
        render_tree(&mut out, snapshot, &mut cache, floor, &Layout::default()).unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .skip(2)
            .map(|l| l.to_string())
            .collect()
    }

    fn summary(snapshot: &Snapshot, layout: &Layout) -> Vec<String> {
        let mut cache = SubtreeCache::new(snapshot);
        let mut out = vec![];
        render_summary(
            &mut out,
            snapshot,
            &mut cache,
            &SupervisorPolicy::default(),
            layout,
        )
        .unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|l| l.to_string())
            .collect()
    }

    #[test]
    fn test_tree_shows_everything_without_floor() {
        let lines = tree(&sample(), 0.);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("└── /usr/lib/systemd/systemd"));
        assert!(lines[0].ends_with("  (pid 10)"));
        assert!(lines[1].starts_with("    ├── /usr/bin/firefox"));
        assert!(lines[2].starts_with("    └── /usr/bin/bash"));
    }

    #[test]
    fn test_tree_line_layout() {
        let lines = tree(&sample(), 0.);
        let expected = format!("    ├── {:<42} {:>8}  (pid 11)", "/usr/bin/firefox", "4.9G");
        assert_eq!(lines[1], expected);
    }

    #[test]
    fn test_tree_floor_hides_small_leaf() {
        let lines = tree(&sample(), 50.);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("(pid 10)"));
        assert!(lines[1].starts_with("    └── /usr/bin/firefox"));
        assert!(!lines.iter().any(|l| l.contains("(pid 12)")));
    }

    #[test]
    fn test_tree_floor_keeps_depth_below_hidden_parent() {
        let snapshot = snapshot_of(&[
            (10, 1, "root", 100.),
            (11, 10, "launcher", 1.),
            (12, 11, "worker", 200.),
            (13, 10, "small", 60.),
        ]);
        let lines = tree(&snapshot, 50.);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("└── root"));
        assert!(lines[1].starts_with("    ├── small"));
        //launcher is hidden, worker stays two levels down
        assert!(lines[2].starts_with("        └── worker"));
    }

    #[test]
    fn test_tree_hidden_parent_with_later_sibling_keeps_bar() {
        let snapshot = snapshot_of(&[
            (10, 1, "root", 100.),
            (11, 10, "first-launcher", 40.),
            (12, 11, "first-worker", 200.),
            (13, 10, "second-launcher", 30.),
            (14, 13, "second-worker", 300.),
            (15, 10, "idle-helper", 2.),
        ]);
        let lines = tree(&snapshot, 50.);
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("└── root"));
        assert!(lines[1].starts_with("    │   └── first-worker"));
        assert!(lines[2].starts_with("        └── second-worker"));
    }

    #[test]
    fn test_tree_roots_sorted_by_subtree() {
        let snapshot = snapshot_of(&[
            (10, 1, "small-root", 50.),
            (20, 1, "big-parent", 1.),
            (21, 20, "big-child", 500.),
        ]);
        let lines = tree(&snapshot, 0.);
        assert!(lines[0].starts_with("├── big-parent"));
        assert!(lines[1].starts_with("│   └── big-child"));
        assert!(lines[2].starts_with("└── small-root"));
    }

    #[test]
    fn test_tree_children_sorted_by_own_memory() {
        let snapshot = snapshot_of(&[
            (10, 1, "root", 1.),
            (11, 10, "light", 5.),
            (12, 11, "heavy-grandchild", 900.),
            (13, 10, "medium", 20.),
        ]);
        let lines = tree(&snapshot, 0.);
        assert!(lines[1].starts_with("    ├── medium"));
        assert!(lines[2].starts_with("    └── light"));
    }

    #[test]
    fn test_tree_leaves_out_init() {
        let snapshot = snapshot_of(&[
            (1, 0, "/usr/lib/systemd/systemd", 12.),
            (500, 1, "/usr/bin/postgres", 40.),
        ]);
        let lines = tree(&snapshot, 0.);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].starts_with("└── /usr/bin/postgres"));
        assert!(!lines.iter().any(|l| l.contains("(pid 1)")));
    }

    #[test]
    fn test_tree_never_unwraps() {
        let lines = tree(&sample(), 0.);
        assert!(lines[0].contains("systemd"));
    }

    #[test]
    fn test_summary_unwraps_dominant_supervisor() {
        let lines = summary(&sample(), &Layout::default());
        assert_eq!(lines[0], format!("╔{}╗", "═".repeat(54)));
        assert!(lines[1].contains("Total Memory: 5.0G"));
        assert!(lines[3].contains("Top Processes (with children):"));
        assert!(lines[5].contains("/usr/bin/firefox"));
        assert!(lines[5].contains("    4.9G ( 97.8%)"));
        assert!(lines[6].contains("/usr/bin/bash"));
        assert!(!lines.iter().any(|l| l.contains("systemd")));
        assert_eq!(lines[7], format!("╚{}╝", "═".repeat(54)));
        assert_eq!(lines[8], "");
        for line in &lines[..8] {
            assert_eq!(line.chars().count(), 56);
        }
    }

    #[test]
    fn test_summary_top_n() {
        let rows: Vec<(u32, u32, String, f64)> = (0..15)
            .map(|i| (100 + i, 1, format!("proc-{i}"), 10. + i as f64))
            .collect();
        let rows: Vec<(u32, u32, &str, f64)> =
            rows.iter().map(|r| (r.0, r.1, r.2.as_str(), r.3)).collect();
        let snapshot = snapshot_of(&rows);
        let lines = summary(&snapshot, &Layout::default());
        //five header lines, footer and blank
        assert_eq!(lines.len(), 10 + 7);
        assert!(lines[5].contains("proc-14"));
    }

    #[test]
    fn test_summary_zero_total() {
        let snapshot = snapshot_of(&[(10, 1, "idle", 0.)]);
        let lines = summary(&snapshot, &Layout::default());
        assert!(lines[5].contains("(  0.0%)"));
        assert!(lines[5].contains("0K"));
    }
}
