use crate::error::Result;
use crate::id::req_scan_re;
use crate::parser::{adr, requirement, task};
use crate::paths;
use crate::store::Store;
use crate::types::ArtifactKind;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// Nodes and edges
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Requirement,
    Design,
    Adr,
    Task,
    Code,
    Test,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EdgeKind {
    RequirementDesign,
    RequirementTask,
    RequirementCode,
    RequirementTest,
    TaskRequirement,
    TaskTask,
    TestCode,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: String,
    pub to: String,
    pub kind: EdgeKind,
}

// ---------------------------------------------------------------------------
// TraceGraph
// ---------------------------------------------------------------------------

/// Bidirectional trace graph over one workspace. Built fresh per analysis
/// run; immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceGraph {
    pub nodes: Vec<Node>,
    pub edges: Vec<Edge>,
    pub requirements: Vec<requirement::Requirement>,
    pub tasks: Vec<task::TaskRecord>,
    /// Per-run cache: requirement ID -> files whose content mentions it.
    #[serde(skip)]
    search_cache: HashMap<String, Vec<String>>,
}

impl TraceGraph {
    /// Scan the workspace and build the graph. Files are streamed one at a
    /// time; memory stays bounded by the largest file plus the graph itself.
    pub fn build(root: &Path) -> Result<TraceGraph> {
        let store = Store::new(root);
        let mut nodes = Vec::new();
        let mut edges = Vec::new();
        let mut search_cache: HashMap<String, Vec<String>> = HashMap::new();

        // Requirements first; their IDs drive the textual scans.
        let mut requirements = Vec::new();
        for path in store.locate(ArtifactKind::Requirements)? {
            let content = std::fs::read_to_string(&path)?;
            let rel = relative(root, &path);
            requirements.extend(requirement::parse_with_source(&content, &rel));
        }
        let req_ids: HashSet<String> = requirements.iter().map(|r| r.id.clone()).collect();
        for r in &requirements {
            nodes.push(Node {
                id: r.id.clone(),
                kind: NodeKind::Requirement,
                path: r.source.clone(),
            });
        }
        tracing::debug!(count = requirements.len(), "discovered requirements");

        // Design documents and their ADRs.
        for path in store.locate(ArtifactKind::Design)? {
            let content = std::fs::read_to_string(&path)?;
            let rel = relative(root, &path);
            nodes.push(Node {
                id: rel.clone(),
                kind: NodeKind::Design,
                path: Some(rel.clone()),
            });
            for a in adr::parse(&content) {
                nodes.push(Node {
                    id: format!("{rel}#{}", a.id),
                    kind: NodeKind::Adr,
                    path: Some(rel.clone()),
                });
            }
            for id in found_ids(&content, &req_ids) {
                remember(&mut search_cache, &id, &rel);
                edges.push(Edge {
                    from: id,
                    to: rel.clone(),
                    kind: EdgeKind::RequirementDesign,
                });
            }
        }

        // Task documents: explicit coverage lists are authoritative, textual
        // co-occurrence fills in the rest.
        let mut tasks = Vec::new();
        for path in store.locate(ArtifactKind::Tasks)? {
            let content = std::fs::read_to_string(&path)?;
            let rel = relative(root, &path);
            let parsed = task::parse(&content);
            let mut covered: HashSet<(String, String)> = HashSet::new();
            for t in &parsed {
                nodes.push(Node {
                    id: t.id.clone(),
                    kind: NodeKind::Task,
                    path: Some(rel.clone()),
                });
                for req in &t.requirements {
                    if req_ids.contains(req) {
                        covered.insert((req.clone(), t.id.clone()));
                    }
                }
                for dep in &t.depends_on {
                    edges.push(Edge {
                        from: t.id.clone(),
                        to: dep.clone(),
                        kind: EdgeKind::TaskTask,
                    });
                }
            }
            for id in found_ids(&content, &req_ids) {
                remember(&mut search_cache, &id, &rel);
                // Attribute a textual mention to every task in the document
                // that does not already cover the requirement explicitly.
                if !covered.iter().any(|(req, _)| *req == id) {
                    if let Some(t) = parsed.first() {
                        covered.insert((id.clone(), t.id.clone()));
                    }
                }
            }
            for (req, task_id) in covered {
                edges.push(Edge {
                    from: req.clone(),
                    to: task_id.clone(),
                    kind: EdgeKind::RequirementTask,
                });
                edges.push(Edge {
                    from: task_id,
                    to: req,
                    kind: EdgeKind::TaskRequirement,
                });
            }
            tasks.extend(parsed);
        }

        // Code and test files.
        let code_files = collect_files(&root.join(paths::SRC_DIR))?;
        let test_files = collect_files(&root.join(paths::TESTS_DIR))?;
        let code_stems: Vec<(String, String)> = code_files
            .iter()
            .map(|p| {
                (
                    relative(root, p),
                    p.file_stem().unwrap_or_default().to_string_lossy().into_owned(),
                )
            })
            .collect();

        for path in &code_files {
            let rel = relative(root, path);
            nodes.push(Node {
                id: rel.clone(),
                kind: NodeKind::Code,
                path: Some(rel.clone()),
            });
            let content = std::fs::read_to_string(path)?;
            for id in found_ids(&content, &req_ids) {
                remember(&mut search_cache, &id, &rel);
                edges.push(Edge {
                    from: id,
                    to: rel.clone(),
                    kind: EdgeKind::RequirementCode,
                });
            }
        }

        for path in &test_files {
            let rel = relative(root, path);
            nodes.push(Node {
                id: rel.clone(),
                kind: NodeKind::Test,
                path: Some(rel.clone()),
            });
            let content = std::fs::read_to_string(path)?;
            for id in found_ids(&content, &req_ids) {
                remember(&mut search_cache, &id, &rel);
                edges.push(Edge {
                    from: id,
                    to: rel.clone(),
                    kind: EdgeKind::RequirementTest,
                });
            }
            for (code_rel, stem) in &code_stems {
                if !stem.is_empty() && imports_module(&content, stem) {
                    edges.push(Edge {
                        from: rel.clone(),
                        to: code_rel.clone(),
                        kind: EdgeKind::TestCode,
                    });
                }
            }
        }

        tracing::debug!(nodes = nodes.len(), edges = edges.len(), "trace graph built");
        Ok(TraceGraph {
            nodes,
            edges,
            requirements,
            tasks,
            search_cache,
        })
    }

    // -----------------------------------------------------------------------
    // Accessors
    // -----------------------------------------------------------------------

    pub fn out_degree(&self, from: &str, kind: EdgeKind) -> usize {
        self.edges
            .iter()
            .filter(|e| e.kind == kind && e.from == from)
            .count()
    }

    pub fn targets<'a>(&'a self, from: &str, kind: EdgeKind) -> Vec<&'a str> {
        self.edges
            .iter()
            .filter(|e| e.kind == kind && e.from == from)
            .map(|e| e.to.as_str())
            .collect()
    }

    pub fn sources<'a>(&'a self, to: &str, kind: EdgeKind) -> Vec<&'a str> {
        self.edges
            .iter()
            .filter(|e| e.kind == kind && e.to == to)
            .map(|e| e.from.as_str())
            .collect()
    }

    pub fn nodes_of(&self, kind: NodeKind) -> Vec<&Node> {
        self.nodes.iter().filter(|n| n.kind == kind).collect()
    }

    /// Files whose content mentions a requirement ID (cached during build).
    pub fn files_referencing(&self, req_id: &str) -> &[String] {
        self.search_cache
            .get(req_id)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Scan helpers
// ---------------------------------------------------------------------------

fn relative(root: &Path, path: &Path) -> String {
    path.strip_prefix(root)
        .unwrap_or(path)
        .to_string_lossy()
        .replace('\\', "/")
}

fn remember(cache: &mut HashMap<String, Vec<String>>, id: &str, file: &str) {
    let entry = cache.entry(id.to_string()).or_default();
    if !entry.iter().any(|f| f == file) {
        entry.push(file.to_string());
    }
}

/// Known requirement IDs that occur in a file's content, each once.
fn found_ids(content: &str, known: &HashSet<String>) -> Vec<String> {
    let mut seen: BTreeSet<String> = BTreeSet::new();
    for m in req_scan_re().find_iter(content) {
        if known.contains(m.as_str()) {
            seen.insert(m.as_str().to_string());
        }
    }
    seen.into_iter().collect()
}

/// True if any import-like line of a test file mentions the module stem.
fn imports_module(content: &str, stem: &str) -> bool {
    content.lines().any(|line| {
        let trimmed = line.trim_start();
        let import_like = trimmed.starts_with("use ")
            || trimmed.starts_with("mod ")
            || trimmed.starts_with("import ")
            || trimmed.starts_with("from ")
            || trimmed.starts_with("#include")
            || trimmed.contains("require(");
        import_like && trimmed.contains(stem)
    })
}

fn collect_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut out = Vec::new();
    if !dir.is_dir() {
        return Ok(out);
    }
    collect_into(dir, &mut out)?;
    out.sort();
    Ok(out)
}

fn collect_into(dir: &Path, out: &mut Vec<PathBuf>) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if entry.file_type()?.is_dir() {
            collect_into(&path, out)?;
        } else {
            out.push(path);
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
