use crate::id::{req_scan_re, TaskId};
use crate::types::{Priority, TaskStatus};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

use super::{bold_field, bullet_text, strip_comments};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub story_points: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_hours: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    pub status: TaskStatus,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub description: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub requirements: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub acceptance_criteria: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

impl TaskRecord {
    pub fn task_id(&self) -> Option<TaskId> {
        TaskId::parse(&self.id).ok()
    }
}

static HEADING_RE: OnceLock<Regex> = OnceLock::new();
static TASK_REF_RE: OnceLock<Regex> = OnceLock::new();

fn heading_re() -> &'static Regex {
    HEADING_RE.get_or_init(|| Regex::new(r"^### (TASK-\d{3}):\s*(.*)$").unwrap())
}

fn task_ref_re() -> &'static Regex {
    TASK_REF_RE.get_or_init(|| Regex::new(r"TASK-\d{3}").unwrap())
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    None,
    Requirements,
    Criteria,
    Dependencies,
    Description,
}

/// Extract task blocks. Each `### TASK-NNN: <title>` heading is followed by
/// bold-labelled fields on consecutive lines; `Requirements Coverage`,
/// `Acceptance Criteria`, and `Dependencies` labels introduce bullet lists.
/// Unparseable field values are left unset for the validator to flag.
pub fn parse(content: &str) -> Vec<TaskRecord> {
    let cleaned = strip_comments(content);
    let mut out: Vec<TaskRecord> = Vec::new();
    let mut section = Section::None;

    for line in cleaned.lines() {
        if let Some(caps) = heading_re().captures(line) {
            out.push(TaskRecord {
                id: caps[1].to_string(),
                title: caps[2].trim().to_string(),
                priority: None,
                story_points: None,
                estimated_hours: None,
                assignee: None,
                status: TaskStatus::Pending,
                description: String::new(),
                requirements: Vec::new(),
                acceptance_criteria: Vec::new(),
                depends_on: Vec::new(),
            });
            section = Section::Description;
            continue;
        }
        if line.starts_with("##") {
            section = Section::None;
            continue;
        }
        let Some(task) = out.last_mut() else { continue };
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if let Some(v) = bold_field(trimmed, "Priority") {
            task.priority = v.parse().ok();
            section = Section::Description;
        } else if let Some(v) = bold_field(trimmed, "Story Points") {
            task.story_points = v.parse().ok();
            section = Section::Description;
        } else if let Some(v) = bold_field(trimmed, "Estimated Hours") {
            task.estimated_hours = v.parse().ok();
            section = Section::Description;
        } else if let Some(v) = bold_field(trimmed, "Assignee") {
            task.assignee = Some(v.to_string()).filter(|s| !s.is_empty());
            section = Section::Description;
        } else if let Some(v) = bold_field(trimmed, "Status") {
            if let Ok(s) = v.parse() {
                task.status = s;
            }
            section = Section::Description;
        } else if bold_field(trimmed, "Requirements Coverage").is_some() {
            section = Section::Requirements;
        } else if bold_field(trimmed, "Acceptance Criteria").is_some() {
            section = Section::Criteria;
        } else if bold_field(trimmed, "Dependencies").is_some() {
            section = Section::Dependencies;
        } else if let Some(item) = bullet_text(trimmed) {
            match section {
                Section::Requirements => {
                    task.requirements
                        .extend(req_scan_re().find_iter(item).map(|m| m.as_str().to_string()));
                }
                Section::Dependencies => {
                    task.depends_on
                        .extend(task_ref_re().find_iter(item).map(|m| m.as_str().to_string()));
                }
                Section::Criteria => task.acceptance_criteria.push(item.to_string()),
                _ => {}
            }
        } else if section == Section::Description && !trimmed.starts_with("**") {
            if !task.description.is_empty() {
                task.description.push(' ');
            }
            task.description.push_str(trimmed);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = "\
# Tasks

## P0 Tasks

### TASK-001: Wire up order persistence

**Priority**: P0
**Story Points**: 3
**Estimated Hours**: 8
**Assignee**: mika
**Status**: In Progress

Persist submitted orders through the event store.

**Requirements Coverage**:
- REQ-CHECKOUT-001: Persist submitted orders

**Acceptance Criteria**:
- [ ] replays are idempotent

**Dependencies**:
- TASK-002

## P1 Tasks

### TASK-002: Define order schema

**Priority**: P1
**Story Points**: 2
**Estimated Hours**: 4
**Assignee**: rey
**Status**: pending
";

    #[test]
    fn parses_fixed_fields() {
        let tasks = parse(DOC);
        assert_eq!(tasks.len(), 2);
        let t = &tasks[0];
        assert_eq!(t.id, "TASK-001");
        assert_eq!(t.title, "Wire up order persistence");
        assert_eq!(t.priority, Some(Priority::P0));
        assert_eq!(t.story_points, Some(3));
        assert_eq!(t.estimated_hours, Some(8.0));
        assert_eq!(t.assignee.as_deref(), Some("mika"));
        assert_eq!(t.status, TaskStatus::InProgress);
        assert_eq!(t.description, "Persist submitted orders through the event store.");
    }

    #[test]
    fn parses_reference_lists() {
        let tasks = parse(DOC);
        assert_eq!(tasks[0].requirements, vec!["REQ-CHECKOUT-001"]);
        assert_eq!(tasks[0].depends_on, vec!["TASK-002"]);
        assert_eq!(tasks[0].acceptance_criteria, vec!["replays are idempotent"]);
        assert!(tasks[1].depends_on.is_empty());
    }

    #[test]
    fn invalid_fields_are_left_unset() {
        let doc = "### TASK-003: Broken\n\n**Priority**: P9\n**Story Points**: lots\n";
        let tasks = parse(doc);
        assert_eq!(tasks.len(), 1);
        assert!(tasks[0].priority.is_none());
        assert!(tasks[0].story_points.is_none());
    }

    #[test]
    fn malformed_yields_empty() {
        assert!(parse("## P0 Tasks\n\nno task blocks\n").is_empty());
    }
}
