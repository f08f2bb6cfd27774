use crate::parser::task::TaskRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// Waves
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Wave {
    pub tasks: Vec<String>,
    pub circular: bool,
}

/// Group tasks into parallel-executable waves. Wave k+1 holds every task
/// whose dependencies all sit in waves <= k. Dependencies on tasks outside
/// the set are ignored (the validator reports them). When the fixpoint
/// stalls with tasks remaining, the leftovers form one circular wave with
/// each identifier tagged `(circular)`.
pub fn plan(tasks: &[TaskRecord]) -> Vec<Wave> {
    let known: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let mut placed: HashSet<&str> = HashSet::new();
    let mut waves: Vec<Wave> = Vec::new();

    loop {
        let mut wave: Vec<String> = tasks
            .iter()
            .filter(|t| !placed.contains(t.id.as_str()))
            .filter(|t| {
                t.depends_on
                    .iter()
                    .filter(|d| known.contains(d.as_str()))
                    .all(|d| placed.contains(d.as_str()))
            })
            .map(|t| t.id.clone())
            .collect();
        if wave.is_empty() {
            break;
        }
        wave.sort();
        for id in &wave {
            // Re-borrow from the task list so the set's lifetime is tied to
            // `tasks`, not to this wave's Strings.
            if let Some(t) = tasks.iter().find(|t| &t.id == id) {
                placed.insert(t.id.as_str());
            }
        }
        waves.push(Wave {
            tasks: wave,
            circular: false,
        });
        if placed.len() == tasks.len() {
            break;
        }
    }

    if placed.len() < tasks.len() {
        let mut leftover: Vec<String> = tasks
            .iter()
            .filter(|t| !placed.contains(t.id.as_str()))
            .map(|t| format!("{} (circular)", t.id))
            .collect();
        leftover.sort();
        waves.push(Wave {
            tasks: leftover,
            circular: true,
        });
    }
    waves
}

/// Task IDs that cannot be placed in any acyclic wave.
pub fn circular_tasks(tasks: &[TaskRecord]) -> Vec<String> {
    plan(tasks)
        .into_iter()
        .filter(|w| w.circular)
        .flat_map(|w| w.tasks)
        .map(|id| id.trim_end_matches(" (circular)").to_string())
        .collect()
}

// ---------------------------------------------------------------------------
// Graph serializations
// ---------------------------------------------------------------------------

/// Plain node-and-edge listing, one `from -> to` line per dependency.
pub fn render_edges(tasks: &[TaskRecord]) -> String {
    let mut out = String::new();
    for t in tasks {
        out.push_str(&t.id);
        out.push('\n');
    }
    for t in tasks {
        for dep in &t.depends_on {
            out.push_str(&format!("{} -> {}\n", t.id, dep));
        }
    }
    out
}

/// Attributed Mermaid form with titles and dependency arrows.
pub fn render_mermaid(tasks: &[TaskRecord]) -> String {
    let mut out = String::from("graph TD\n");
    for t in tasks {
        out.push_str(&format!("    {}[\"{}: {}\"]\n", t.id, t.id, t.title));
    }
    for t in tasks {
        for dep in &t.depends_on {
            out.push_str(&format!("    {} --> {}\n", dep, t.id));
        }
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
