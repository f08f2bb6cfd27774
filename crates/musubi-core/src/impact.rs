use crate::parser::delta::DeltaItem;
use crate::trace::{EdgeKind, TraceGraph};
use crate::types::{DeltaKind, ImpactCategory, Severity};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AffectedItem {
    pub path: String,
    pub category: ImpactCategory,
    pub severity: Severity,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImpactReport {
    pub classification: DeltaKind,
    pub target: String,
    pub affected: Vec<AffectedItem>,
    pub by_category: BTreeMap<ImpactCategory, usize>,
    pub by_severity: BTreeMap<Severity, usize>,
    pub dependency_chain: Vec<String>,
    pub chain_depth: usize,
    pub recommendations: Vec<String>,
    pub risks: Vec<String>,
}

// ---------------------------------------------------------------------------
// ImpactAnalyzer
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct ImpactConfig {
    pub max_chain_depth: usize,
}

impl Default for ImpactConfig {
    fn default() -> Self {
        Self { max_chain_depth: 3 }
    }
}

/// Computes the blast radius of one delta item over a built trace graph.
/// The dependency cache is per-instance; build a fresh analyzer per run.
pub struct ImpactAnalyzer<'a> {
    graph: &'a TraceGraph,
    config: ImpactConfig,
    chain_cache: HashMap<String, (Vec<String>, usize)>,
}

impl<'a> ImpactAnalyzer<'a> {
    pub fn new(graph: &'a TraceGraph) -> Self {
        Self::with_config(graph, ImpactConfig::default())
    }

    pub fn with_config(graph: &'a TraceGraph, config: ImpactConfig) -> Self {
        Self {
            graph,
            config,
            chain_cache: HashMap::new(),
        }
    }

    pub fn analyze(&mut self, item: &DeltaItem) -> ImpactReport {
        let mut affected: Vec<AffectedItem> = Vec::new();

        // The requirement's own document is always in scope.
        if let Some(req) = self.graph.requirements.iter().find(|r| r.id == item.target) {
            if let Some(source) = &req.source {
                affected.push(AffectedItem {
                    path: source.clone(),
                    category: ImpactCategory::Requirements,
                    severity: Severity::Info,
                });
            }
        }

        for path in self.graph.files_referencing(&item.target) {
            affected.push(AffectedItem {
                path: path.clone(),
                category: categorize(path),
                severity: severity_for(item.kind, path),
            });
        }
        affected.sort_by(|a, b| a.path.cmp(&b.path));

        let mut by_category: BTreeMap<ImpactCategory, usize> = BTreeMap::new();
        let mut by_severity: BTreeMap<Severity, usize> = BTreeMap::new();
        for a in &affected {
            *by_category.entry(a.category).or_default() += 1;
            *by_severity.entry(a.severity).or_default() += 1;
        }

        let (dependency_chain, chain_depth) = self.dependency_chain(&item.target);

        let recommendations = recommendations(&affected, &by_severity, &by_category, chain_depth);
        let risks = risks(item.kind, &affected, &by_severity, &by_category);

        tracing::debug!(
            target = %item.target,
            affected = affected.len(),
            "impact analysis complete"
        );

        ImpactReport {
            classification: item.kind,
            target: item.target.clone(),
            affected,
            by_category,
            by_severity,
            dependency_chain,
            chain_depth,
            recommendations,
            risks,
        }
    }

    /// Task identifiers reachable from the requirement through coverage and
    /// declared dependency edges, bounded by the configured depth. The second
    /// value is the number of traversal levels reached, not the node count.
    fn dependency_chain(&mut self, target: &str) -> (Vec<String>, usize) {
        if let Some(cached) = self.chain_cache.get(target) {
            return cached.clone();
        }
        let mut chain = Vec::new();
        let mut depth = 0;
        let mut frontier: Vec<String> = self
            .graph
            .targets(target, EdgeKind::RequirementTask)
            .iter()
            .map(|s| s.to_string())
            .collect();
        frontier.sort();

        for _ in 0..self.config.max_chain_depth {
            if frontier.is_empty() {
                break;
            }
            let before = chain.len();
            let mut next = Vec::new();
            for node in frontier {
                if chain.contains(&node) {
                    continue;
                }
                for dep in self.graph.targets(&node, EdgeKind::TaskTask) {
                    next.push(dep.to_string());
                }
                chain.push(node);
            }
            if chain.len() > before {
                depth += 1;
            }
            next.sort();
            next.dedup();
            frontier = next;
        }

        self.chain_cache
            .insert(target.to_string(), (chain.clone(), depth));
        (chain, depth)
    }
}

// ---------------------------------------------------------------------------
// Classification rules
// ---------------------------------------------------------------------------

fn is_test_path(path: &str) -> bool {
    path.contains("test") || path.contains("spec")
}

fn is_src_path(path: &str) -> bool {
    path.starts_with("src/") || path.contains("/src/")
}

fn is_docs_path(path: &str) -> bool {
    path.starts_with("docs/") || path.ends_with(".md")
}

/// Severity rules, applied in order; first match wins.
fn severity_for(kind: DeltaKind, path: &str) -> Severity {
    if kind == DeltaKind::Removed && is_src_path(path) {
        return Severity::Critical;
    }
    if is_test_path(path) {
        return if kind == DeltaKind::Removed {
            Severity::High
        } else {
            Severity::Medium
        };
    }
    if is_docs_path(path) {
        return Severity::Low;
    }
    if is_src_path(path) {
        return if kind == DeltaKind::Modified {
            Severity::High
        } else {
            Severity::Medium
        };
    }
    Severity::Medium
}

/// Category rules: tests, docs, configuration, then code.
fn categorize(path: &str) -> ImpactCategory {
    if is_test_path(path) {
        ImpactCategory::Tests
    } else if is_docs_path(path) {
        ImpactCategory::Documentation
    } else if path.contains("config") || path.ends_with(".json") || path.ends_with(".yml") {
        ImpactCategory::Configuration
    } else {
        ImpactCategory::Code
    }
}

// ---------------------------------------------------------------------------
// Recommendations and risks (each emitted at most once)
// ---------------------------------------------------------------------------

fn recommendations(
    affected: &[AffectedItem],
    by_severity: &BTreeMap<Severity, usize>,
    by_category: &BTreeMap<ImpactCategory, usize>,
    chain_depth: usize,
) -> Vec<String> {
    let mut out = Vec::new();
    if affected.len() > 10 {
        out.push("Consider splitting this change into smaller deltas".to_string());
    }
    if by_severity.get(&Severity::Critical).copied().unwrap_or(0) > 0 {
        out.push("Critical impact detected: require heightened testing before apply".to_string());
    }
    if by_category.get(&ImpactCategory::Tests).copied().unwrap_or(0) > 5 {
        out.push("Many tests affected: allocate additional test time".to_string());
    }
    if chain_depth > 3 {
        out.push("Deep dependency chain: consider refactoring to reduce coupling".to_string());
    }
    out
}

fn risks(
    kind: DeltaKind,
    affected: &[AffectedItem],
    by_severity: &BTreeMap<Severity, usize>,
    by_category: &BTreeMap<ImpactCategory, usize>,
) -> Vec<String> {
    let mut out = Vec::new();
    if kind == DeltaKind::Removed || by_severity.get(&Severity::Critical).copied().unwrap_or(0) > 0
    {
        out.push("Breaking change: dependent code may stop compiling or misbehave".to_string());
    }
    if affected.len() > 10 {
        out.push("Broad blast radius: many artifacts reference this requirement".to_string());
    }
    let code = by_category.get(&ImpactCategory::Code).copied().unwrap_or(0);
    let tests = by_category.get(&ImpactCategory::Tests).copied().unwrap_or(0);
    if code > tests {
        out.push("Test gap: more code than tests reference this requirement".to_string());
    }
    out
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn item(kind: DeltaKind, target: &str) -> DeltaItem {
        DeltaItem {
            kind,
            target: target.to_string(),
            title: None,
            renamed_to: None,
        }
    }

    #[test]
    fn removal_of_referenced_requirement_is_critical() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "docs/requirements/auth.md",
            "## Functional Requirements\n\n### REQ-AUTH-001: T\n\nThe auth SHALL work.\n",
        );
        write(root, "src/auth.rs", "// REQ-AUTH-001\n");
        write(root, "tests/auth_test.rs", "// REQ-AUTH-001\n");

        let graph = TraceGraph::build(root).unwrap();
        let mut analyzer = ImpactAnalyzer::new(&graph);
        let report = analyzer.analyze(&item(DeltaKind::Removed, "REQ-AUTH-001"));

        let critical: Vec<&AffectedItem> = report
            .affected
            .iter()
            .filter(|a| a.severity == Severity::Critical)
            .collect();
        assert!(!critical.is_empty());
        assert!(critical.iter().any(|a| a.path == "src/auth.rs"));

        let high_tests: Vec<&AffectedItem> = report
            .affected
            .iter()
            .filter(|a| a.category == ImpactCategory::Tests && a.severity == Severity::High)
            .collect();
        assert!(!high_tests.is_empty());
    }

    #[test]
    fn severity_rules_apply_in_order() {
        assert_eq!(severity_for(DeltaKind::Removed, "src/auth.rs"), Severity::Critical);
        assert_eq!(severity_for(DeltaKind::Modified, "tests/auth_test.rs"), Severity::Medium);
        assert_eq!(severity_for(DeltaKind::Removed, "tests/auth_test.rs"), Severity::High);
        assert_eq!(severity_for(DeltaKind::Added, "docs/design/auth.md"), Severity::Low);
        assert_eq!(severity_for(DeltaKind::Modified, "src/auth.rs"), Severity::High);
        assert_eq!(severity_for(DeltaKind::Added, "src/auth.rs"), Severity::Medium);
        assert_eq!(severity_for(DeltaKind::Added, "scripts/run.sh"), Severity::Medium);
    }

    #[test]
    fn category_rules_apply_in_order() {
        assert_eq!(categorize("tests/auth_test.rs"), ImpactCategory::Tests);
        assert_eq!(categorize("docs/design/auth.md"), ImpactCategory::Documentation);
        assert_eq!(categorize("config/app.yml"), ImpactCategory::Configuration);
        assert_eq!(categorize("settings.json"), ImpactCategory::Configuration);
        assert_eq!(categorize("src/auth.rs"), ImpactCategory::Code);
        assert_eq!(categorize("build/main.o"), ImpactCategory::Code);
    }

    #[test]
    fn critical_impact_requires_heightened_testing() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "docs/requirements/auth.md",
            "## Functional Requirements\n\n### REQ-AUTH-001: T\n\nThe auth SHALL work.\n",
        );
        write(root, "src/auth.rs", "// REQ-AUTH-001\n");

        let graph = TraceGraph::build(root).unwrap();
        let mut analyzer = ImpactAnalyzer::new(&graph);
        let report = analyzer.analyze(&item(DeltaKind::Removed, "REQ-AUTH-001"));
        assert!(report
            .recommendations
            .iter()
            .any(|r| r.contains("heightened testing")));
        assert!(report.risks.iter().any(|r| r.contains("Breaking change")));
        // One code file, zero tests: test-gap risk.
        assert!(report.risks.iter().any(|r| r.contains("Test gap")));
    }

    #[test]
    fn dependency_chain_is_bounded() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "docs/requirements/a.md",
            "## Functional Requirements\n\n### REQ-A-001: T\n\nThe a SHALL b.\n",
        );
        // TASK-001 covers the requirement and sits atop a five-deep chain.
        let mut tasks = String::from("## P0 Tasks\n\n");
        for n in 1..=5 {
            tasks.push_str(&format!(
                "### TASK-{n:03}: Step {n}\n\n**Priority**: P0\n**Story Points**: 1\n\
                 **Estimated Hours**: 1\n**Assignee**: a\n**Status**: pending\n\n"
            ));
            if n == 1 {
                tasks.push_str("**Requirements Coverage**:\n- REQ-A-001\n\n");
            }
            if n < 5 {
                tasks.push_str(&format!("**Dependencies**:\n- TASK-{:03}\n\n", n + 1));
            }
        }
        write(root, "storage/tasks/a.md", &tasks);

        let graph = TraceGraph::build(root).unwrap();
        let mut analyzer = ImpactAnalyzer::new(&graph);
        let report = analyzer.analyze(&item(DeltaKind::Modified, "REQ-A-001"));
        // Depth default 3: TASK-001 -> TASK-002 -> TASK-003.
        assert_eq!(report.dependency_chain, vec!["TASK-001", "TASK-002", "TASK-003"]);
        assert_eq!(report.chain_depth, 3);
    }

    #[test]
    fn chain_depth_counts_levels_not_nodes() {
        let dir = TempDir::new().unwrap();
        let root = dir.path();
        write(
            root,
            "docs/requirements/a.md",
            "## Functional Requirements\n\n### REQ-A-001: T\n\nThe a SHALL b.\n",
        );
        // TASK-001 covers the requirement and fans out to two leaf tasks.
        write(
            root,
            "storage/tasks/a.md",
            "## P0 Tasks\n\n\
             ### TASK-001: Root\n\n**Priority**: P0\n**Story Points**: 1\n\
             **Estimated Hours**: 1\n**Assignee**: a\n**Status**: pending\n\n\
             **Requirements Coverage**:\n- REQ-A-001\n\n\
             **Dependencies**:\n- TASK-002\n- TASK-003\n\n\
             ### TASK-002: Leaf\n\n**Priority**: P0\n**Story Points**: 1\n\
             **Estimated Hours**: 1\n**Assignee**: a\n**Status**: pending\n\n\
             ### TASK-003: Leaf\n\n**Priority**: P0\n**Story Points**: 1\n\
             **Estimated Hours**: 1\n**Assignee**: a\n**Status**: pending\n",
        );

        let graph = TraceGraph::build(root).unwrap();
        let mut analyzer = ImpactAnalyzer::new(&graph);
        let report = analyzer.analyze(&item(DeltaKind::Modified, "REQ-A-001"));
        // Three tasks in the chain, but only two traversal levels.
        assert_eq!(report.dependency_chain, vec!["TASK-001", "TASK-002", "TASK-003"]);
        assert_eq!(report.chain_depth, 2);
    }

    #[test]
    fn unknown_target_yields_empty_report() {
        let dir = TempDir::new().unwrap();
        let graph = TraceGraph::build(dir.path()).unwrap();
        let mut analyzer = ImpactAnalyzer::new(&graph);
        let report = analyzer.analyze(&item(DeltaKind::Added, "REQ-NOPE-001"));
        assert!(report.affected.is_empty());
        assert!(report.recommendations.is_empty());
    }
}
