use crate::output::print_json;
use anyhow::Context;
use musubi_core::store::{InitOptions, Store};
use musubi_core::types::ArtifactKind;
use std::path::Path;
use std::str::FromStr;

#[allow(clippy::too_many_arguments)]
pub fn run(
    root: &Path,
    kind: &str,
    feature: &str,
    project: Option<String>,
    author: Option<String>,
    component: Option<String>,
    system: Option<String>,
    json: bool,
) -> anyhow::Result<()> {
    let kind = ArtifactKind::from_str(kind)
        .with_context(|| format!("unknown artifact kind '{kind}'"))?;
    let store = Store::new(root);
    let opts = InitOptions {
        project,
        author,
        component,
        system,
    };
    let path = store
        .init(kind, feature, &opts)
        .with_context(|| format!("failed to create {kind} document for '{feature}'"))?;

    if json {
        print_json(&serde_json::json!({
            "kind": kind.to_string(),
            "feature": feature,
            "path": path.display().to_string(),
        }))?;
    } else {
        println!("Created {kind} document: {}", path.display());
    }
    Ok(())
}
