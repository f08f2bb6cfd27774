use crate::error::{MusubiError, Result};
use crate::io;
use crate::parser::delta::{self, DeltaDocument, DeltaItem};
use crate::paths;
use crate::templates::{render, TemplateSet};
use crate::types::{ArtifactKind, DeltaKind};
use crate::validate::{self, ValidationResult};
use chrono::Local;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Apply hooks
// ---------------------------------------------------------------------------

/// Per-classification callbacks invoked while applying a change. Every
/// method defaults to a no-op; implementors plug in spec-merging, file
/// rewriting, or bookkeeping. A hook returning Err aborts the apply and all
/// subsequent hooks.
pub trait ApplyHooks {
    fn on_added(&mut self, item: &DeltaItem) -> std::result::Result<(), String> {
        let _ = item;
        Ok(())
    }

    fn on_modified(&mut self, item: &DeltaItem) -> std::result::Result<(), String> {
        let _ = item;
        Ok(())
    }

    fn on_removed(&mut self, item: &DeltaItem) -> std::result::Result<(), String> {
        let _ = item;
        Ok(())
    }

    fn on_renamed(&mut self, item: &DeltaItem) -> std::result::Result<(), String> {
        let _ = item;
        Ok(())
    }

    /// Called once during archive with the full document, after the file
    /// has moved to its archived location.
    fn on_archive(&mut self, doc: &DeltaDocument) -> std::result::Result<(), String> {
        let _ = doc;
        Ok(())
    }
}

/// Hooks that accept every item without side effects.
#[derive(Debug, Default)]
pub struct NoopHooks;

impl ApplyHooks for NoopHooks {}

// ---------------------------------------------------------------------------
// Apply report
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ApplyOptions {
    pub dry_run: bool,
    /// Skip re-validation before applying.
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplyReport {
    pub change_id: String,
    pub dry_run: bool,
    pub counts: BTreeMap<String, usize>,
    /// Hook invocations in execution order, as `<KIND> <id>` strings.
    pub applied: Vec<String>,
}

// ---------------------------------------------------------------------------
// ChangeManager
// ---------------------------------------------------------------------------

/// Drives a delta document through its lifecycle: created pending under
/// `storage/changes/`, validated, applied through hooks, then archived to
/// `specs/changes/`.
pub struct ChangeManager {
    root: PathBuf,
    templates: TemplateSet,
}

impl ChangeManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            templates: TemplateSet::builtin_only(),
        }
    }

    pub fn with_templates(root: impl Into<PathBuf>, templates: TemplateSet) -> Self {
        Self {
            root: root.into(),
            templates,
        }
    }

    pub fn change_path(&self, change_id: &str) -> PathBuf {
        paths::change_path(&self.root, change_id)
    }

    /// Create `storage/changes/<change_id>.md` from the change template.
    /// The change ID is used verbatim as the file stem.
    pub fn init(&self, change_id: &str) -> Result<PathBuf> {
        let path = self.change_path(change_id);
        if path.exists() {
            return Err(MusubiError::AlreadyExists(path.display().to_string()));
        }
        let project = crate::store::ambient_project(&self.root)
            .unwrap_or_else(|| "Project".to_string());
        let author =
            crate::store::ambient_author(&self.root).unwrap_or_else(|| "Author".to_string());
        let vars = HashMap::from([
            ("FEATURE_NAME", change_id.to_string()),
            ("PROJECT_NAME", project),
            ("DATE", Local::now().format("%Y-%m-%d").to_string()),
            ("AUTHOR", author),
        ]);
        let content = render(&self.templates.get(ArtifactKind::Changes)?, &vars);
        io::atomic_write(&path, content.as_bytes())?;
        tracing::debug!(change_id, path = %path.display(), "initialized change");
        Ok(path)
    }

    /// Read and parse a pending change.
    pub fn load(&self, change_id: &str) -> Result<DeltaDocument> {
        let path = self.change_path(change_id);
        let content = io::read_opt(&path)?
            .ok_or_else(|| MusubiError::NotFound(path.display().to_string()))?;
        Ok(delta::parse(change_id, &content))
    }

    /// Check every requirement ID the change references against the ID
    /// grammar. Runs over the raw file so malformed IDs are visible.
    pub fn validate(&self, change_id: &str) -> Result<ValidationResult> {
        let path = self.change_path(change_id);
        let content = io::read_opt(&path)?
            .ok_or_else(|| MusubiError::NotFound(path.display().to_string()))?;
        Ok(validate::validate_change(&content))
    }

    /// Apply a pending change. Re-validates first unless forced. Dry runs
    /// report counts without touching the hooks. Items run in document order
    /// within a classification; classifications run ADDED, MODIFIED,
    /// REMOVED, RENAMED. The first hook failure aborts the remainder.
    pub fn apply(
        &self,
        change_id: &str,
        hooks: &mut dyn ApplyHooks,
        opts: &ApplyOptions,
    ) -> Result<ApplyReport> {
        if !opts.force {
            self.validate(change_id)?.into_strict()?;
        }
        let doc = self.load(change_id)?;

        let mut counts = BTreeMap::new();
        for &kind in DeltaKind::all() {
            counts.insert(kind.as_str().to_string(), doc.of_kind(kind).count());
        }

        let mut report = ApplyReport {
            change_id: change_id.to_string(),
            dry_run: opts.dry_run,
            counts,
            applied: Vec::new(),
        };
        if opts.dry_run {
            return Ok(report);
        }

        for &kind in DeltaKind::all() {
            for item in doc.of_kind(kind) {
                let outcome = match kind {
                    DeltaKind::Added => hooks.on_added(item),
                    DeltaKind::Modified => hooks.on_modified(item),
                    DeltaKind::Removed => hooks.on_removed(item),
                    DeltaKind::Renamed => hooks.on_renamed(item),
                };
                outcome.map_err(|reason| MusubiError::ApplyFailed {
                    classification: kind.as_str().to_string(),
                    id: item.target.clone(),
                    reason,
                })?;
                report.applied.push(format!("{kind} {}", item.target));
            }
        }
        tracing::info!(change_id, items = report.applied.len(), "applied change");
        Ok(report)
    }

    /// Move an applied change to `specs/changes/` and run the merge hook.
    pub fn archive(&self, change_id: &str, hooks: &mut dyn ApplyHooks) -> Result<PathBuf> {
        let from = self.change_path(change_id);
        if !from.exists() {
            return Err(MusubiError::NotFound(from.display().to_string()));
        }
        let doc = self.load(change_id)?;
        let to = paths::archived_change_path(&self.root, change_id);
        io::move_file(&from, &to)?;
        hooks
            .on_archive(&doc)
            .map_err(|reason| MusubiError::ApplyFailed {
                classification: "ARCHIVE".to_string(),
                id: change_id.to_string(),
                reason,
            })?;
        tracing::info!(change_id, to = %to.display(), "archived change");
        Ok(to)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const DELTA: &str = "\
# Change CHG-2026-014

## Requirements Changes

### Added Requirements

- REQ-CART-004: Support gift wrapping

### Modified Requirements

- REQ-CART-001: Tighten persistence deadline

### Removed Requirements

- REQ-AUTH-003

### Renamed Requirements

- REQ-CART-002 -> REQ-ORDER-001
";

    fn seeded(content: &str) -> (TempDir, ChangeManager) {
        let dir = TempDir::new().unwrap();
        let mgr = ChangeManager::new(dir.path());
        io::atomic_write(&mgr.change_path("CHG-2026-014"), content.as_bytes()).unwrap();
        (dir, mgr)
    }

    #[derive(Default)]
    struct Recording {
        calls: Vec<String>,
        fail_on: Option<String>,
    }

    impl ApplyHooks for Recording {
        fn on_added(&mut self, item: &DeltaItem) -> std::result::Result<(), String> {
            self.record("ADDED", &item.target)
        }
        fn on_modified(&mut self, item: &DeltaItem) -> std::result::Result<(), String> {
            self.record("MODIFIED", &item.target)
        }
        fn on_removed(&mut self, item: &DeltaItem) -> std::result::Result<(), String> {
            self.record("REMOVED", &item.target)
        }
        fn on_renamed(&mut self, item: &DeltaItem) -> std::result::Result<(), String> {
            self.record("RENAMED", &item.target)
        }
        fn on_archive(&mut self, _doc: &DeltaDocument) -> std::result::Result<(), String> {
            self.calls.push("ARCHIVE".to_string());
            Ok(())
        }
    }

    impl Recording {
        fn record(&mut self, kind: &str, id: &str) -> std::result::Result<(), String> {
            let call = format!("{kind} {id}");
            if self.fail_on.as_deref() == Some(kind) {
                return Err("hook rejected item".to_string());
            }
            self.calls.push(call);
            Ok(())
        }
    }

    #[test]
    fn init_creates_pending_change() {
        let dir = TempDir::new().unwrap();
        let mgr = ChangeManager::new(dir.path());
        let path = mgr.init("CHG-001").unwrap();
        assert_eq!(path, dir.path().join("storage/changes/CHG-001.md"));
        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("# Change CHG-001"));
        assert!(content.contains("### Renamed Requirements"));
    }

    #[test]
    fn init_refuses_existing_change() {
        let dir = TempDir::new().unwrap();
        let mgr = ChangeManager::new(dir.path());
        mgr.init("CHG-001").unwrap();
        assert!(matches!(
            mgr.init("CHG-001"),
            Err(MusubiError::AlreadyExists(_))
        ));
    }

    #[test]
    fn validate_flags_malformed_ids() {
        let (_dir, mgr) = seeded("### Added Requirements\n\n- REQ-cart-09: bad\n");
        let result = mgr.validate("CHG-2026-014").unwrap();
        assert!(!result.passed);
    }

    #[test]
    fn apply_runs_classifications_in_fixed_order() {
        let (_dir, mgr) = seeded(DELTA);
        let mut hooks = Recording::default();
        let report = mgr
            .apply("CHG-2026-014", &mut hooks, &ApplyOptions::default())
            .unwrap();
        assert!(!report.dry_run);
        assert_eq!(
            hooks.calls,
            vec![
                "ADDED REQ-CART-004",
                "MODIFIED REQ-CART-001",
                "REMOVED REQ-AUTH-003",
                "RENAMED REQ-CART-002",
            ]
        );
        assert_eq!(report.applied.len(), 4);
        assert_eq!(report.counts["ADDED"], 1);
    }

    #[test]
    fn dry_run_reports_counts_without_hooks() {
        let (_dir, mgr) = seeded(DELTA);
        let mut hooks = Recording::default();
        let report = mgr
            .apply(
                "CHG-2026-014",
                &mut hooks,
                &ApplyOptions {
                    dry_run: true,
                    force: false,
                },
            )
            .unwrap();
        assert!(report.dry_run);
        assert!(hooks.calls.is_empty());
        assert_eq!(report.counts["RENAMED"], 1);
    }

    #[test]
    fn hook_failure_aborts_subsequent_hooks() {
        let (_dir, mgr) = seeded(DELTA);
        let mut hooks = Recording {
            fail_on: Some("MODIFIED".to_string()),
            ..Recording::default()
        };
        let err = mgr
            .apply("CHG-2026-014", &mut hooks, &ApplyOptions::default())
            .unwrap_err();
        assert!(matches!(err, MusubiError::ApplyFailed { .. }));
        // Only the ADDED hook ran before the failure.
        assert_eq!(hooks.calls, vec!["ADDED REQ-CART-004"]);
    }

    #[test]
    fn apply_revalidates_unless_forced() {
        let (_dir, mgr) = seeded("### Added Requirements\n\n- REQ-cart-09: bad\n");
        let mut hooks = NoopHooks;
        assert!(matches!(
            mgr.apply("CHG-2026-014", &mut hooks, &ApplyOptions::default()),
            Err(MusubiError::ValidationFailed(_))
        ));
        let report = mgr
            .apply(
                "CHG-2026-014",
                &mut hooks,
                &ApplyOptions {
                    dry_run: false,
                    force: true,
                },
            )
            .unwrap();
        // The malformed bullet carried no parseable ID, so nothing applied.
        assert!(report.applied.is_empty());
    }

    #[test]
    fn archive_moves_file_and_runs_merge_hook() {
        let (dir, mgr) = seeded(DELTA);
        let mut hooks = Recording::default();
        mgr.apply("CHG-2026-014", &mut hooks, &ApplyOptions::default())
            .unwrap();
        let archived = mgr.archive("CHG-2026-014", &mut hooks).unwrap();
        assert_eq!(archived, dir.path().join("specs/changes/CHG-2026-014.md"));
        assert!(!mgr.change_path("CHG-2026-014").exists());
        assert!(hooks.calls.last().unwrap() == "ARCHIVE");
    }

    #[test]
    fn missing_change_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mgr = ChangeManager::new(dir.path());
        assert!(matches!(
            mgr.load("CHG-404"),
            Err(MusubiError::NotFound(_))
        ));
        assert!(matches!(
            mgr.archive("CHG-404", &mut NoopHooks),
            Err(MusubiError::NotFound(_))
        ));
    }
}
