use crate::error::{MusubiError, Result};
use crate::id::ReqId;
use crate::io;
use crate::paths;
use crate::templates::{render, TemplateSet};
use crate::types::ArtifactKind;
use chrono::Local;
use std::collections::HashMap;
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// InitOptions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub project: Option<String>,
    pub author: Option<String>,
    pub component: Option<String>,
    pub system: Option<String>,
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Filesystem access for the four artifact kinds: discovery under the
/// conventional directories, creation from templates, and structured
/// insertion into existing documents.
pub struct Store {
    root: PathBuf,
    templates: TemplateSet,
}

impl Store {
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

    pub fn root(&self) -> &Path {
        &self.root
    }

    // -----------------------------------------------------------------------
    // locate
    // -----------------------------------------------------------------------

    /// All documents of a kind under its search directories, deduplicated
    /// and sorted for stable output.
    pub fn locate(&self, kind: ArtifactKind) -> Result<Vec<PathBuf>> {
        let mut found = Vec::new();
        for dir in paths::search_dirs(kind) {
            let base = self.root.join(dir);
            if base.is_dir() {
                collect_markdown(&base, &mut found)?;
            }
        }
        found.sort();
        found.dedup();
        Ok(found)
    }

    // -----------------------------------------------------------------------
    // init
    // -----------------------------------------------------------------------

    /// Create `<dir>/<slug>.md` for a feature from the kind's template.
    /// Fails if the document already exists.
    pub fn init(
        &self,
        kind: ArtifactKind,
        feature_name: &str,
        opts: &InitOptions,
    ) -> Result<PathBuf> {
        let slug = paths::slugify(feature_name);
        if slug.is_empty() {
            return Err(MusubiError::InvalidSlug(feature_name.to_string()));
        }
        let path = paths::artifact_path(&self.root, kind, &slug);
        if path.exists() {
            return Err(MusubiError::AlreadyExists(path.display().to_string()));
        }

        let project = opts
            .project
            .clone()
            .or_else(|| ambient_project(&self.root))
            .unwrap_or_else(|| "Project".to_string());
        let author = opts
            .author
            .clone()
            .or_else(|| ambient_author(&self.root))
            .unwrap_or_else(|| "Author".to_string());
        let component = opts
            .component
            .clone()
            .unwrap_or_else(|| ReqId::component_from(feature_name));
        let system = opts.system.clone().unwrap_or_else(|| project.clone());

        let vars = HashMap::from([
            ("FEATURE_NAME", feature_name.to_string()),
            ("PROJECT_NAME", project),
            ("DATE", Local::now().format("%Y-%m-%d").to_string()),
            ("AUTHOR", author),
            ("COMPONENT", component),
            ("SYSTEM", system),
        ]);
        let content = render(&self.templates.get(kind)?, &vars);
        io::atomic_write(&path, content.as_bytes())?;
        tracing::debug!(kind = %kind, path = %path.display(), "created artifact document");
        Ok(path)
    }

    // -----------------------------------------------------------------------
    // insert
    // -----------------------------------------------------------------------

    /// Insert a rendered block at the end of a level-2 section. The design
    /// `Architecture Decisions` section is appended on first use if absent;
    /// any other missing section is fatal for the write.
    pub fn insert(
        &self,
        path: &Path,
        kind: ArtifactKind,
        section: &str,
        block: &str,
    ) -> Result<()> {
        let content = io::read_opt(path)?
            .ok_or_else(|| MusubiError::NotFound(path.display().to_string()))?;

        let updated = match insert_into_section(&content, section, block) {
            Some(updated) => updated,
            None if kind == ArtifactKind::Design && section == "Architecture Decisions" => {
                let mut appended = content;
                if !appended.ends_with('\n') {
                    appended.push('\n');
                }
                appended.push_str(&format!("\n## {section}\n"));
                insert_into_section(&appended, section, block).expect("section just appended")
            }
            None => {
                return Err(MusubiError::SectionMissing {
                    section: section.to_string(),
                    path: path.display().to_string(),
                })
            }
        };
        io::atomic_write(path, updated.as_bytes())
    }
}

// ---------------------------------------------------------------------------
// Section insertion
// ---------------------------------------------------------------------------

/// Insert `block` at the end of the `## <section>` region, before the next
/// level-2 heading. Returns None if the section heading is absent.
fn insert_into_section(content: &str, section: &str, block: &str) -> Option<String> {
    let heading = format!("## {section}");
    let lines: Vec<&str> = content.lines().collect();
    let start = lines
        .iter()
        .position(|l| l.trim_end() == heading || l.trim_end().starts_with(&format!("{heading} ")))?;

    // End of section: next "## " heading (not "###") after the start.
    let end = lines[start + 1..]
        .iter()
        .position(|l| l.starts_with("## "))
        .map(|i| start + 1 + i)
        .unwrap_or(lines.len());

    let mut out: Vec<String> = lines[..end].iter().map(|l| l.to_string()).collect();
    // Trim trailing blank lines inside the section, then pad around the block.
    while out.len() > start + 1 && out.last().is_some_and(|l| l.trim().is_empty()) {
        out.pop();
    }
    out.push(String::new());
    out.extend(block.trim_end().lines().map(|l| l.to_string()));
    out.push(String::new());
    out.extend(lines[end..].iter().map(|l| l.to_string()));

    let mut joined = out.join("\n");
    if content.ends_with('\n') && !joined.ends_with('\n') {
        joined.push('\n');
    }
    Some(joined)
}

// ---------------------------------------------------------------------------
// Ambient metadata
// ---------------------------------------------------------------------------

/// Project name from a package manifest at the root: Cargo.toml `name`, then
/// package.json `"name"`.
pub(crate) fn ambient_project(root: &Path) -> Option<String> {
    if let Ok(Some(cargo)) = io::read_opt(&root.join("Cargo.toml")) {
        for line in cargo.lines() {
            let line = line.trim();
            if let Some(rest) = line.strip_prefix("name") {
                let rest = rest.trim_start();
                if let Some(value) = rest.strip_prefix('=') {
                    return Some(value.trim().trim_matches('"').to_string());
                }
            }
        }
    }
    if let Ok(Some(pkg)) = io::read_opt(&root.join("package.json")) {
        if let Ok(json) = serde_json::from_str::<serde_json::Value>(&pkg) {
            if let Some(name) = json.get("name").and_then(|v| v.as_str()) {
                return Some(name.to_string());
            }
        }
    }
    None
}

/// Author from the repository's version-control user config.
pub(crate) fn ambient_author(root: &Path) -> Option<String> {
    let config = io::read_opt(&root.join(".git/config")).ok()??;
    let mut in_user = false;
    for line in config.lines() {
        let line = line.trim();
        if line.starts_with('[') {
            in_user = line == "[user]";
            continue;
        }
        if in_user {
            if let Some(value) = line.strip_prefix("name") {
                let value = value.trim_start();
                if let Some(name) = value.strip_prefix('=') {
                    return Some(name.trim().to_string());
                }
            }
        }
    }
    None
}

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_markdown(&path, out)?;
        } else if path.extension().is_some_and(|e| e == "md") {
            out.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
