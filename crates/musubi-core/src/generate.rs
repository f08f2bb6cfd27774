use crate::ears::{self, EarsParts};
use crate::error::{MusubiError, Result};
use crate::id::{next_adr_number, next_req_number, next_task_number, AdrId, ReqId, TaskId};
use crate::parser::{adr, requirement, task};
use crate::store::{InitOptions, Store};
use crate::types::{AdrStatus, ArtifactKind, EarsPattern, Priority, TaskStatus};
use chrono::Local;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// RequirementsGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AddRequirement {
    pub pattern: EarsPattern,
    pub parts: EarsParts,
    pub title: Option<String>,
    pub criteria: Vec<String>,
}

pub struct RequirementsGenerator<'a> {
    store: &'a Store,
}

impl<'a> RequirementsGenerator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn init(&self, feature_name: &str, opts: &InitOptions) -> Result<PathBuf> {
        self.store.init(ArtifactKind::Requirements, feature_name, opts)
    }

    /// Allocate the next `REQ-<COMPONENT>-<NNN>` in the document's component
    /// namespace, compose the canonical EARS statement, and insert the block
    /// under `## Functional Requirements`.
    pub fn add_requirement(&self, slug: &str, add: &AddRequirement) -> Result<ReqId> {
        let path = self.document(slug)?;
        let content = std::fs::read_to_string(&path)?;

        let component = document_component(&content)
            .unwrap_or_else(|| ReqId::component_from(slug));
        let existing: Vec<ReqId> = requirement::parse(&content)
            .iter()
            .filter_map(|r| r.req_id())
            .collect();
        let id = ReqId::new(component.clone(), next_req_number(&existing, &component));

        let statement = ears::compose(add.pattern, &add.parts)?;
        let title = add
            .title
            .clone()
            .unwrap_or_else(|| title_from_response(&add.parts.response));

        let mut block = format!("### {id}: {title}\n\n{statement}\n");
        if !add.criteria.is_empty() {
            block.push_str("\n**Acceptance Criteria:**\n");
            for c in &add.criteria {
                block.push_str(&format!("- [ ] {c}\n"));
            }
        }
        self.store.insert(
            &path,
            ArtifactKind::Requirements,
            "Functional Requirements",
            &block,
        )?;
        Ok(id)
    }

    fn document(&self, slug: &str) -> Result<PathBuf> {
        document_for(self.store, ArtifactKind::Requirements, slug)
    }
}

fn title_from_response(response: &str) -> String {
    let mut chars = response.chars();
    match chars.next() {
        Some(c) => c.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}

/// `**Component**:` field of a document header, if present.
fn document_component(content: &str) -> Option<String> {
    content.lines().find_map(|line| {
        let trimmed = line.trim();
        trimmed
            .strip_prefix("**Component**:")
            .or_else(|| trimmed.strip_prefix("**Component:**"))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    })
}

fn document_for(store: &Store, kind: ArtifactKind, slug: &str) -> Result<PathBuf> {
    let direct = crate::paths::artifact_path(store.root(), kind, slug);
    if direct.exists() {
        return Ok(direct);
    }
    // Fall back to discovery: the document may live under an alternate root.
    store
        .locate(kind)?
        .into_iter()
        .find(|p| p.file_stem().is_some_and(|s| s == slug))
        .ok_or_else(|| MusubiError::NotFound(format!("{kind} document for '{slug}'")))
}

// ---------------------------------------------------------------------------
// DesignGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AddAdr {
    pub title: String,
    pub status: AdrStatus,
    pub context: String,
    pub decision: String,
    pub consequences: String,
    pub alternatives: Vec<String>,
}

pub struct DesignGenerator<'a> {
    store: &'a Store,
}

impl<'a> DesignGenerator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn init(&self, feature_name: &str, opts: &InitOptions) -> Result<PathBuf> {
        self.store.init(ArtifactKind::Design, feature_name, opts)
    }

    /// Allocate the next `ADR-<NNN>` in the document and insert the record
    /// under `## Architecture Decisions` (created on first use).
    pub fn add_adr(&self, slug: &str, add: &AddAdr) -> Result<AdrId> {
        let path = document_for(self.store, ArtifactKind::Design, slug)?;
        let content = std::fs::read_to_string(&path)?;

        let existing: Vec<AdrId> = adr::parse(&content)
            .iter()
            .filter_map(|a| AdrId::parse(&a.id).ok())
            .collect();
        let id = AdrId(next_adr_number(&existing));

        let mut block = format!(
            "### {id}: {}\n\n**Status**: {}\n**Date**: {}\n\n**Context**: {}\n**Decision**: {}\n**Consequences**: {}\n",
            add.title,
            add.status,
            Local::now().format("%Y-%m-%d"),
            add.context,
            add.decision,
            add.consequences,
        );
        if !add.alternatives.is_empty() {
            block.push_str("**Alternatives**:\n");
            for alt in &add.alternatives {
                block.push_str(&format!("- {alt}\n"));
            }
        }
        self.store
            .insert(&path, ArtifactKind::Design, "Architecture Decisions", &block)?;
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// TasksGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct AddTask {
    pub title: String,
    pub priority: Priority,
    pub story_points: u32,
    pub estimated_hours: f64,
    pub assignee: Option<String>,
    pub description: Option<String>,
    pub requirements: Vec<String>,
    pub criteria: Vec<String>,
    pub depends_on: Vec<String>,
}

pub struct TasksGenerator<'a> {
    store: &'a Store,
}

/// Both names have been used for this generator; the plural form is
/// canonical.
pub use TasksGenerator as TaskGenerator;

impl<'a> TasksGenerator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    pub fn init(&self, feature_name: &str, opts: &InitOptions) -> Result<PathBuf> {
        self.store.init(ArtifactKind::Tasks, feature_name, opts)
    }

    /// Allocate the next `TASK-<NNN>` (unique across the whole document) and
    /// insert the block under the priority's section. P3 files under P2.
    pub fn add_task(&self, slug: &str, add: &AddTask) -> Result<TaskId> {
        if add.story_points == 0 {
            return Err(MusubiError::InvalidTaskField {
                field: "story_points".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if add.estimated_hours <= 0.0 {
            return Err(MusubiError::InvalidTaskField {
                field: "estimated_hours".to_string(),
                reason: "must be positive".to_string(),
            });
        }

        let path = document_for(self.store, ArtifactKind::Tasks, slug)?;
        let content = std::fs::read_to_string(&path)?;
        let existing: Vec<TaskId> = task::parse(&content)
            .iter()
            .filter_map(|t| t.task_id())
            .collect();
        let id = TaskId(next_task_number(&existing));

        let mut block = format!(
            "### {id}: {}\n\n**Priority**: {}\n**Story Points**: {}\n**Estimated Hours**: {}\n**Assignee**: {}\n**Status**: {}\n",
            add.title,
            add.priority,
            add.story_points,
            add.estimated_hours,
            add.assignee.as_deref().unwrap_or("unassigned"),
            TaskStatus::Pending,
        );
        if let Some(desc) = &add.description {
            block.push_str(&format!("\n{desc}\n"));
        }
        if !add.requirements.is_empty() {
            block.push_str("\n**Requirements Coverage**:\n");
            for r in &add.requirements {
                block.push_str(&format!("- {r}\n"));
            }
        }
        if !add.criteria.is_empty() {
            block.push_str("\n**Acceptance Criteria**:\n");
            for c in &add.criteria {
                block.push_str(&format!("- [ ] {c}\n"));
            }
        }
        if !add.depends_on.is_empty() {
            block.push_str("\n**Dependencies**:\n");
            for d in &add.depends_on {
                block.push_str(&format!("- {d}\n"));
            }
        }
        self.store
            .insert(&path, ArtifactKind::Tasks, add.priority.section(), &block)?;
        Ok(id)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ears::validate;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> Store {
        Store::new(dir.path())
    }

    fn add(pattern: EarsPattern, parts: EarsParts) -> AddRequirement {
        AddRequirement {
            pattern,
            parts,
            title: None,
            criteria: Vec::new(),
        }
    }

    #[test]
    fn requirement_ids_allocate_in_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let gen = RequirementsGenerator::new(&store);
        gen.init("Checkout", &InitOptions::default()).unwrap();

        for n in 1..=3u32 {
            let id = gen
                .add_requirement(
                    "checkout",
                    &add(
                        EarsPattern::Ubiquitous,
                        EarsParts::new("cart", format!("do thing {n}")),
                    ),
                )
                .unwrap();
            assert_eq!(id.to_string(), format!("REQ-CHECKOUT-{n:03}"));
        }

        let content =
            std::fs::read_to_string(dir.path().join("docs/requirements/checkout.md")).unwrap();
        let reqs = requirement::parse(&content);
        assert_eq!(reqs.len(), 3);
        assert!(reqs.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[test]
    fn requirement_creation_scenario() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let gen = RequirementsGenerator::new(&store);
        gen.init("Checkout", &InitOptions::default()).unwrap();

        let id = gen
            .add_requirement(
                "checkout",
                &AddRequirement {
                    pattern: EarsPattern::Event,
                    parts: EarsParts::new("cart", "persist it")
                        .with_clause("the user submits the order"),
                    title: None,
                    criteria: vec!["idempotent".to_string()],
                },
            )
            .unwrap();
        assert_eq!(id.to_string(), "REQ-CHECKOUT-001");

        let content =
            std::fs::read_to_string(dir.path().join("docs/requirements/checkout.md")).unwrap();
        assert!(content.contains("### REQ-CHECKOUT-001:"));
        assert!(content
            .contains("WHEN the user submits the order, THEN the cart SHALL persist it."));
        assert!(content.contains("- [ ] idempotent"));

        let reqs = requirement::parse(&content);
        assert!(validate(&reqs[0].statement).is_valid());
    }

    #[test]
    fn adr_ids_allocate_in_order() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let gen = DesignGenerator::new(&store);
        gen.init("Checkout", &InitOptions::default()).unwrap();

        for n in 1..=2u32 {
            let id = gen
                .add_adr(
                    "checkout",
                    &AddAdr {
                        title: format!("Decision {n}"),
                        status: AdrStatus::Proposed,
                        context: "ctx".to_string(),
                        decision: "do it".to_string(),
                        consequences: "none".to_string(),
                        alternatives: Vec::new(),
                    },
                )
                .unwrap();
            assert_eq!(id.to_string(), format!("ADR-{n:03}"));
        }
    }

    #[test]
    fn task_ids_allocate_across_priority_sections() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let gen = TasksGenerator::new(&store);
        gen.init("Checkout", &InitOptions::default()).unwrap();

        let base = AddTask {
            title: "t".to_string(),
            priority: Priority::P0,
            story_points: 1,
            estimated_hours: 1.0,
            assignee: None,
            description: None,
            requirements: Vec::new(),
            criteria: Vec::new(),
            depends_on: Vec::new(),
        };
        let t1 = gen.add_task("checkout", &base).unwrap();
        let t2 = gen
            .add_task("checkout", &AddTask { priority: Priority::P1, ..base.clone() })
            .unwrap();
        let t3 = gen
            .add_task("checkout", &AddTask { priority: Priority::P3, ..base.clone() })
            .unwrap();
        assert_eq!((t1.0, t2.0, t3.0), (1, 2, 3));

        let content =
            std::fs::read_to_string(dir.path().join("storage/tasks/checkout.md")).unwrap();
        // P3 task files under the P2 section.
        let p2 = content.find("## P2 Tasks").unwrap();
        let t3_pos = content.find("TASK-003").unwrap();
        assert!(t3_pos > p2);
    }

    #[test]
    fn task_field_ranges_are_enforced() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let gen = TasksGenerator::new(&store);
        gen.init("Checkout", &InitOptions::default()).unwrap();

        let bad = AddTask {
            title: "t".to_string(),
            priority: Priority::P0,
            story_points: 0,
            estimated_hours: 1.0,
            assignee: None,
            description: None,
            requirements: Vec::new(),
            criteria: Vec::new(),
            depends_on: Vec::new(),
        };
        assert!(matches!(
            gen.add_task("checkout", &bad),
            Err(MusubiError::InvalidTaskField { .. })
        ));
        assert!(matches!(
            gen.add_task("checkout", &AddTask { story_points: 1, estimated_hours: 0.0, ..bad }),
            Err(MusubiError::InvalidTaskField { .. })
        ));
    }

    #[test]
    fn missing_document_is_not_found() {
        let dir = TempDir::new().unwrap();
        let store = store(&dir);
        let gen = RequirementsGenerator::new(&store);
        let result = gen.add_requirement(
            "absent",
            &add(EarsPattern::Ubiquitous, EarsParts::new("x", "y")),
        );
        assert!(matches!(result, Err(MusubiError::NotFound(_))));
    }
}
