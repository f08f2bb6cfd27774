use crate::output::print_json;
use anyhow::Context;
use musubi_core::parser::task::{self, TaskRecord};
use musubi_core::planner;
use musubi_core::store::Store;
use musubi_core::types::ArtifactKind;
use std::path::Path;

pub fn run(root: &Path, slug: Option<&str>, format: &str, json: bool) -> anyhow::Result<()> {
    let store = Store::new(root);
    let mut docs = store.locate(ArtifactKind::Tasks)?;
    if let Some(slug) = slug {
        docs.retain(|p| p.file_stem().is_some_and(|s| s == slug));
        if docs.is_empty() {
            anyhow::bail!("no task document found for '{slug}'");
        }
    }

    let mut tasks: Vec<TaskRecord> = Vec::new();
    for path in &docs {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        tasks.extend(task::parse(&content));
    }

    match format {
        "edges" => {
            print!("{}", planner::render_edges(&tasks));
        }
        "mermaid" => {
            print!("{}", planner::render_mermaid(&tasks));
        }
        "waves" => {
            let waves = planner::plan(&tasks);
            if json {
                print_json(&waves)?;
            } else if waves.is_empty() {
                println!("No tasks to plan.");
            } else {
                for (k, wave) in waves.iter().enumerate() {
                    println!("Wave {k}: [{}]", wave.tasks.join(", "));
                }
            }
        }
        other => anyhow::bail!("unknown format '{other}' (expected waves, edges, or mermaid)"),
    }
    Ok(())
}
