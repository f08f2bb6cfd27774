use crate::output::{print_json, print_table};
use anyhow::Context;
use musubi_core::parser::{requirement, task};
use musubi_core::store::Store;
use musubi_core::types::ArtifactKind;
use musubi_core::validate::{validate_requirements, validate_tasks, ValidationResult};
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct DocumentResult {
    path: String,
    kind: String,
    #[serde(flatten)]
    result: ValidationResult,
}

/// Validate every requirements and task document in the workspace.
/// Reporting mode collects all findings; strict mode exits nonzero when any
/// document fails.
pub fn run(root: &Path, strict: bool, json: bool) -> anyhow::Result<()> {
    let store = Store::new(root);
    let mut results = Vec::new();

    for path in store.locate(ArtifactKind::Requirements)? {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let reqs = requirement::parse(&content);
        results.push(DocumentResult {
            path: rel(root, &path),
            kind: "requirements".to_string(),
            result: validate_requirements(&reqs),
        });
    }

    for path in store.locate(ArtifactKind::Tasks)? {
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let tasks = task::parse(&content);
        results.push(DocumentResult {
            path: rel(root, &path),
            kind: "tasks".to_string(),
            result: validate_tasks(&tasks),
        });
    }

    let failed: usize = results.iter().filter(|r| !r.result.passed).count();

    if json {
        print_json(&results)?;
    } else if results.is_empty() {
        println!("No documents to validate.");
    } else {
        let rows: Vec<Vec<String>> = results
            .iter()
            .map(|r| {
                vec![
                    r.path.clone(),
                    r.kind.clone(),
                    if r.result.passed { "pass" } else { "FAIL" }.to_string(),
                    format!("{}/{}", r.result.valid, r.result.total),
                ]
            })
            .collect();
        print_table(&["DOCUMENT", "KIND", "RESULT", "VALID"], rows);
        for r in results.iter().filter(|r| !r.result.passed) {
            for violation in &r.result.violations {
                println!("  {}: {violation}", r.path);
            }
        }
    }

    if strict && failed > 0 {
        anyhow::bail!("{failed} document(s) failed validation");
    }
    Ok(())
}

fn rel(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .display()
        .to_string()
}
