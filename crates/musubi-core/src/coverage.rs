use crate::error::Result;
use crate::trace::{EdgeKind, NodeKind, TraceGraph};
use serde::{Deserialize, Serialize};
use std::path::Path;

// ---------------------------------------------------------------------------
// Report types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequirementCoverage {
    pub id: String,
    pub has_design: bool,
    pub has_task: bool,
    pub has_code: bool,
    pub has_test: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GapReport {
    /// Requirements with neither a design nor a task edge.
    pub orphaned_requirements: Vec<String>,
    /// Design documents no requirement points at.
    pub orphaned_design: Vec<String>,
    /// Tasks no requirement points at.
    pub orphaned_tasks: Vec<String>,
    /// Code files no test imports.
    pub untested_code: Vec<String>,
    /// Requirements without a test edge.
    pub requirements_missing_tests: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverageReport {
    pub requirements: Vec<RequirementCoverage>,
    pub design_pct: u32,
    pub task_pct: u32,
    pub code_pct: u32,
    pub test_pct: u32,
    /// Rounded mean of the four forward percentages.
    pub overall_pct: u32,
    /// Tests with a complete test -> code -> requirement chain.
    pub backward_pct: u32,
    pub gaps: GapReport,
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

fn pct(count: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    (100.0 * count as f64 / total as f64).round() as u32
}

/// Forward/backward coverage and gap sets over a built trace graph.
pub fn compute(graph: &TraceGraph) -> CoverageReport {
    let mut requirements: Vec<RequirementCoverage> = graph
        .requirements
        .iter()
        .map(|r| RequirementCoverage {
            id: r.id.clone(),
            has_design: graph.out_degree(&r.id, EdgeKind::RequirementDesign) >= 1,
            has_task: graph.out_degree(&r.id, EdgeKind::RequirementTask) >= 1,
            has_code: graph.out_degree(&r.id, EdgeKind::RequirementCode) >= 1,
            has_test: graph.out_degree(&r.id, EdgeKind::RequirementTest) >= 1,
        })
        .collect();
    requirements.sort_by(|a, b| a.id.cmp(&b.id));

    let total = requirements.len();
    let design_pct = pct(requirements.iter().filter(|r| r.has_design).count(), total);
    let task_pct = pct(requirements.iter().filter(|r| r.has_task).count(), total);
    let code_pct = pct(requirements.iter().filter(|r| r.has_code).count(), total);
    let test_pct = pct(requirements.iter().filter(|r| r.has_test).count(), total);
    let overall_pct = if total == 0 {
        0
    } else {
        ((design_pct + task_pct + code_pct + test_pct) as f64 / 4.0).round() as u32
    };

    // Backward: a test is complete when it reaches a requirement, either
    // through a code file a requirement points at or by direct reference.
    let tests = graph.nodes_of(NodeKind::Test);
    let complete = tests
        .iter()
        .filter(|t| {
            let via_code = graph
                .targets(&t.id, EdgeKind::TestCode)
                .iter()
                .any(|code| !graph.sources(code, EdgeKind::RequirementCode).is_empty());
            via_code || !graph.sources(&t.id, EdgeKind::RequirementTest).is_empty()
        })
        .count();
    let backward_pct = pct(complete, tests.len());

    let gaps = gap_report(graph, &requirements);

    CoverageReport {
        requirements,
        design_pct,
        task_pct,
        code_pct,
        test_pct,
        overall_pct,
        backward_pct,
        gaps,
    }
}

/// Build the graph for a workspace and compute its coverage.
pub fn analyze(root: &Path) -> Result<CoverageReport> {
    let graph = TraceGraph::build(root)?;
    Ok(compute(&graph))
}

fn gap_report(graph: &TraceGraph, requirements: &[RequirementCoverage]) -> GapReport {
    let mut gaps = GapReport {
        orphaned_requirements: requirements
            .iter()
            .filter(|r| !r.has_design && !r.has_task)
            .map(|r| r.id.clone())
            .collect(),
        requirements_missing_tests: requirements
            .iter()
            .filter(|r| !r.has_test)
            .map(|r| r.id.clone())
            .collect(),
        ..GapReport::default()
    };

    for design in graph.nodes_of(NodeKind::Design) {
        if graph.sources(&design.id, EdgeKind::RequirementDesign).is_empty() {
            gaps.orphaned_design.push(design.id.clone());
        }
    }
    for task in graph.nodes_of(NodeKind::Task) {
        if graph.sources(&task.id, EdgeKind::RequirementTask).is_empty() {
            gaps.orphaned_tasks.push(task.id.clone());
        }
    }
    for code in graph.nodes_of(NodeKind::Code) {
        if graph.sources(&code.id, EdgeKind::TestCode).is_empty() {
            gaps.untested_code.push(code.id.clone());
        }
    }

    gaps.orphaned_design.sort();
    gaps.orphaned_tasks.sort();
    gaps.untested_code.sort();
    gaps
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
