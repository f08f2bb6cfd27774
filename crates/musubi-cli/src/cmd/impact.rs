use crate::output::{print_json, print_table};
use anyhow::Context;
use musubi_core::change::ChangeManager;
use musubi_core::impact::{ImpactAnalyzer, ImpactReport};
use musubi_core::parser::delta::DeltaItem;
use musubi_core::trace::TraceGraph;
use musubi_core::types::DeltaKind;
use std::path::Path;
use std::str::FromStr;

pub fn run(
    root: &Path,
    change: Option<&str>,
    kind: Option<&str>,
    target: Option<&str>,
    json: bool,
) -> anyhow::Result<()> {
    let items: Vec<DeltaItem> = match (change, kind, target) {
        (Some(change_id), _, _) => {
            let doc = ChangeManager::new(root)
                .load(change_id)
                .with_context(|| format!("failed to load change '{change_id}'"))?;
            doc.items
        }
        (None, Some(kind), Some(target)) => {
            let kind = DeltaKind::from_str(kind)
                .with_context(|| format!("unknown classification '{kind}'"))?;
            vec![DeltaItem {
                kind,
                target: target.to_string(),
                title: None,
                renamed_to: None,
            }]
        }
        _ => anyhow::bail!("pass either --change <id> or --kind <kind> --target <req-id>"),
    };

    let graph = TraceGraph::build(root).context("failed to build trace graph")?;
    let mut analyzer = ImpactAnalyzer::new(&graph);
    let reports: Vec<ImpactReport> = items.iter().map(|i| analyzer.analyze(i)).collect();

    if json {
        print_json(&reports)?;
        return Ok(());
    }

    for report in &reports {
        println!(
            "{} {}: {} affected, chain depth {}",
            report.classification,
            report.target,
            report.affected.len(),
            report.chain_depth
        );
        let rows: Vec<Vec<String>> = report
            .affected
            .iter()
            .map(|a| {
                vec![
                    a.path.clone(),
                    a.category.to_string(),
                    a.severity.to_string(),
                ]
            })
            .collect();
        if !rows.is_empty() {
            print_table(&["PATH", "CATEGORY", "SEVERITY"], rows);
        }
        for r in &report.recommendations {
            println!("  recommend: {r}");
        }
        for r in &report.risks {
            println!("  risk: {r}");
        }
        println!();
    }
    Ok(())
}
