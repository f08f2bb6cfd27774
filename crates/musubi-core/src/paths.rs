use crate::error::{MusubiError, Result};
use crate::types::ArtifactKind;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Directory constants
// ---------------------------------------------------------------------------

pub const REQUIREMENTS_DIR: &str = "docs/requirements";
pub const REQUIREMENTS_ALT_DIR: &str = "requirements";
pub const DESIGN_DIR: &str = "docs/design";
pub const DESIGN_ALT_DIR: &str = "design";
pub const TASKS_DIR: &str = "storage/tasks";
pub const TASKS_ALT_DIR: &str = "tasks";
pub const CHANGES_DIR: &str = "storage/changes";
pub const ARCHIVED_CHANGES_DIR: &str = "specs/changes";

pub const STATE_DIR: &str = ".musubi";
pub const COSTS_DIR: &str = ".musubi/costs";
pub const BUDGET_FILE: &str = ".musubi/costs/budget.json";

pub const SRC_DIR: &str = "src";
pub const TESTS_DIR: &str = "tests";

/// Search roots per artifact kind, in discovery order. The first entry is
/// where new documents are created.
pub fn search_dirs(kind: ArtifactKind) -> &'static [&'static str] {
    match kind {
        ArtifactKind::Requirements => &[REQUIREMENTS_DIR, REQUIREMENTS_ALT_DIR],
        ArtifactKind::Design => &[DESIGN_DIR, DESIGN_ALT_DIR],
        ArtifactKind::Tasks => &[TASKS_DIR, TASKS_ALT_DIR],
        ArtifactKind::Changes => &[CHANGES_DIR],
    }
}

// ---------------------------------------------------------------------------
// Path helpers
// ---------------------------------------------------------------------------

pub fn artifact_path(root: &Path, kind: ArtifactKind, slug: &str) -> PathBuf {
    root.join(search_dirs(kind)[0]).join(format!("{slug}.md"))
}

pub fn change_path(root: &Path, change_id: &str) -> PathBuf {
    root.join(CHANGES_DIR).join(format!("{change_id}.md"))
}

pub fn archived_change_path(root: &Path, change_id: &str) -> PathBuf {
    root.join(ARCHIVED_CHANGES_DIR).join(format!("{change_id}.md"))
}

pub fn costs_dir(root: &Path) -> PathBuf {
    root.join(COSTS_DIR)
}

pub fn period_file(root: &Path, window: &str) -> PathBuf {
    costs_dir(root).join(format!("period-{window}.json"))
}

pub fn budget_file(root: &Path) -> PathBuf {
    root.join(BUDGET_FILE)
}

// ---------------------------------------------------------------------------
// Slugs
// ---------------------------------------------------------------------------

/// Lowercase, non-alphanumeric runs collapsed to a single '-', leading and
/// trailing '-' stripped. Idempotent.
pub fn slugify(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut pending_dash = false;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_dash && !out.is_empty() {
                out.push('-');
            }
            pending_dash = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_dash = true;
        }
    }
    out
}

pub fn validate_slug(slug: &str) -> Result<()> {
    if slug.is_empty() || slug.len() > 64 || slugify(slug) != slug {
        return Err(MusubiError::InvalidSlug(slug.to_string()));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slugify_examples() {
        assert_eq!(slugify("Payment & Checkout System"), "payment-checkout-system");
        assert_eq!(slugify(" -feature- "), "feature");
        assert_eq!(slugify("Auth"), "auth");
        assert_eq!(slugify("v2.0 API"), "v2-0-api");
    }

    #[test]
    fn slugify_idempotent() {
        for s in ["Payment & Checkout System", " -feature- ", "already-a-slug", "A  B"] {
            let once = slugify(s);
            assert_eq!(slugify(&once), once);
        }
    }

    #[test]
    fn validate_slug_accepts_canonical() {
        validate_slug("auth-login").unwrap();
        validate_slug("a").unwrap();
    }

    #[test]
    fn validate_slug_rejects_noncanonical() {
        for s in ["", "-leading", "trailing-", "Upper", "two  spaces", "a_b"] {
            assert!(validate_slug(s).is_err(), "expected invalid: {s}");
        }
    }

    #[test]
    fn path_helpers() {
        let root = Path::new("/tmp/proj");
        assert_eq!(
            artifact_path(root, ArtifactKind::Requirements, "checkout"),
            PathBuf::from("/tmp/proj/docs/requirements/checkout.md")
        );
        assert_eq!(
            change_path(root, "CHG-001"),
            PathBuf::from("/tmp/proj/storage/changes/CHG-001.md")
        );
        assert_eq!(
            archived_change_path(root, "CHG-001"),
            PathBuf::from("/tmp/proj/specs/changes/CHG-001.md")
        );
        assert_eq!(
            period_file(root, "daily"),
            PathBuf::from("/tmp/proj/.musubi/costs/period-daily.json")
        );
    }
}
