use crate::ears;
use crate::error::{MusubiError, Result};
use crate::id::req_id_re;
use crate::parser::requirement::Requirement;
use crate::parser::task::TaskRecord;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

// ---------------------------------------------------------------------------
// ValidationResult
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Finding {
    pub id: String,
    pub errors: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationResult {
    pub passed: bool,
    pub total: usize,
    pub valid: usize,
    pub invalid: usize,
    pub violations: Vec<String>,
    pub details: Vec<Finding>,
}

impl ValidationResult {
    fn from_findings(total: usize, findings: Vec<Finding>) -> Self {
        let invalid = findings.len();
        let violations = findings
            .iter()
            .flat_map(|f| f.errors.iter().map(move |e| format!("{}: {e}", f.id)))
            .collect();
        Self {
            passed: invalid == 0,
            total,
            valid: total.saturating_sub(invalid),
            invalid,
            violations,
            details: findings,
        }
    }

    /// Strict mode: a failed result becomes an error.
    pub fn into_strict(self) -> Result<ValidationResult> {
        if self.passed {
            Ok(self)
        } else {
            Err(MusubiError::ValidationFailed(self.invalid))
        }
    }
}

// ---------------------------------------------------------------------------
// Requirement validation
// ---------------------------------------------------------------------------

/// EARS-validate every requirement. Reporting mode: all findings collected.
pub fn validate_requirements(requirements: &[Requirement]) -> ValidationResult {
    let mut findings = Vec::new();
    let mut seen: HashSet<&str> = HashSet::new();
    for req in requirements {
        let mut errors = Vec::new();
        if !seen.insert(&req.id) {
            errors.push("Duplicate requirement ID".to_string());
        }
        let v = ears::validate(&req.statement);
        errors.extend(v.errors);
        if !errors.is_empty() {
            findings.push(Finding {
                id: req.id.clone(),
                errors,
            });
        }
    }
    ValidationResult::from_findings(requirements.len(), findings)
}

// ---------------------------------------------------------------------------
// Task validation
// ---------------------------------------------------------------------------

/// Check field ranges and dependency references within one task document.
/// Violations are surfaced, never auto-repaired.
pub fn validate_tasks(tasks: &[TaskRecord]) -> ValidationResult {
    let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    let mut findings = Vec::new();

    for task in tasks {
        let mut errors = Vec::new();
        if task.priority.is_none() {
            errors.push("Missing or invalid priority (expected P0..P3)".to_string());
        }
        match task.story_points {
            Some(p) if p > 0 => {}
            _ => errors.push("Story points must be a positive integer".to_string()),
        }
        match task.estimated_hours {
            Some(h) if h > 0.0 => {}
            _ => errors.push("Estimated hours must be positive".to_string()),
        }
        for dep in &task.depends_on {
            if !ids.contains(dep.as_str()) {
                errors.push(format!("Dependency {dep} does not exist in this document"));
            }
        }
        if !errors.is_empty() {
            findings.push(Finding {
                id: task.id.clone(),
                errors,
            });
        }
    }

    // Cycles: any task the planner cannot place in an acyclic wave.
    for id in crate::planner::circular_tasks(tasks) {
        findings.push(Finding {
            id: id.clone(),
            errors: vec!["Circular dependency".to_string()],
        });
    }

    ValidationResult::from_findings(tasks.len(), findings)
}

// ---------------------------------------------------------------------------
// Change validation
// ---------------------------------------------------------------------------

/// Every ID referenced under a classification heading must match the
/// requirement grammar. Operates on raw content so malformed IDs the
/// tolerant parser dropped are still reported.
pub fn validate_change(content: &str) -> ValidationResult {
    let mut findings = Vec::new();
    let mut in_classification = false;
    let mut total = 0usize;

    for line in content.lines() {
        let trimmed = line.trim();
        if let Some(heading) = trimmed.strip_prefix("### ") {
            in_classification = heading.contains("Requirements");
            continue;
        }
        if trimmed.starts_with("## ") {
            in_classification = false;
            continue;
        }
        if !in_classification {
            continue;
        }
        let Some(text) = crate::parser::bullet_text(trimmed) else {
            continue;
        };
        total += 1;
        for token in text.split(|c: char| c.is_whitespace() || c == ':') {
            let token = token.trim();
            if token.starts_with("REQ-") && !req_id_re().is_match(token) {
                findings.push(Finding {
                    id: token.to_string(),
                    errors: vec!["Identifier does not match REQ-<COMPONENT>-<NNN>".to_string()],
                });
            }
        }
    }

    ValidationResult::from_findings(total, findings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
