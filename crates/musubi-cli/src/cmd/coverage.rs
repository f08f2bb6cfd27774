use crate::output::{print_json, print_table};
use anyhow::Context;
use musubi_core::coverage;
use std::path::Path;

pub fn run(root: &Path, json: bool) -> anyhow::Result<()> {
    let report = coverage::analyze(root).context("failed to analyze coverage")?;

    if json {
        print_json(&report)?;
        return Ok(());
    }

    println!(
        "Coverage: design {}%  tasks {}%  code {}%  tests {}%  overall {}%",
        report.design_pct, report.task_pct, report.code_pct, report.test_pct, report.overall_pct
    );
    println!("Backward (test -> code -> requirement): {}%", report.backward_pct);

    if !report.requirements.is_empty() {
        let rows: Vec<Vec<String>> = report
            .requirements
            .iter()
            .map(|r| {
                let mark = |b: bool| if b { "x" } else { "-" }.to_string();
                vec![
                    r.id.clone(),
                    mark(r.has_design),
                    mark(r.has_task),
                    mark(r.has_code),
                    mark(r.has_test),
                ]
            })
            .collect();
        println!();
        print_table(&["REQUIREMENT", "DESIGN", "TASK", "CODE", "TEST"], rows);
    }

    let gaps = &report.gaps;
    for (label, ids) in [
        ("Orphaned requirements", &gaps.orphaned_requirements),
        ("Orphaned design docs", &gaps.orphaned_design),
        ("Orphaned tasks", &gaps.orphaned_tasks),
        ("Untested code", &gaps.untested_code),
        ("Requirements missing tests", &gaps.requirements_missing_tests),
    ] {
        if !ids.is_empty() {
            println!("{label}: {}", ids.join(", "));
        }
    }
    Ok(())
}
