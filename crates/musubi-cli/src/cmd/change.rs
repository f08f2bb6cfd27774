use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use musubi_core::change::{ApplyOptions, ChangeManager, NoopHooks};
use std::path::Path;

#[derive(Subcommand)]
pub enum ChangeSubcommand {
    /// Create a pending change document from the template
    Init { change_id: String },
    /// Check every referenced requirement ID against the grammar
    Validate { change_id: String },
    /// Apply a pending change through the classification hooks
    Apply {
        change_id: String,
        /// Report counts without invoking hooks
        #[arg(long)]
        dry_run: bool,
        /// Skip re-validation
        #[arg(long)]
        force: bool,
    },
    /// Move an applied change to the archive
    Archive { change_id: String },
}

pub fn run(root: &Path, subcmd: ChangeSubcommand, json: bool) -> anyhow::Result<()> {
    let mgr = ChangeManager::new(root);
    match subcmd {
        ChangeSubcommand::Init { change_id } => {
            let path = mgr
                .init(&change_id)
                .with_context(|| format!("failed to create change '{change_id}'"))?;
            if json {
                print_json(&serde_json::json!({
                    "change_id": change_id,
                    "path": path.display().to_string(),
                }))?;
            } else {
                println!("Created change: {}", path.display());
            }
        }
        ChangeSubcommand::Validate { change_id } => {
            let result = mgr
                .validate(&change_id)
                .with_context(|| format!("failed to validate change '{change_id}'"))?;
            if json {
                print_json(&result)?;
            } else if result.passed {
                println!("{change_id}: {} reference(s), all valid", result.total);
            } else {
                println!("{change_id}: {} violation(s)", result.invalid);
                for v in &result.violations {
                    println!("  {v}");
                }
            }
            if !result.passed {
                anyhow::bail!("change '{change_id}' failed validation");
            }
        }
        ChangeSubcommand::Apply {
            change_id,
            dry_run,
            force,
        } => {
            let report = mgr
                .apply(
                    &change_id,
                    &mut NoopHooks,
                    &ApplyOptions { dry_run, force },
                )
                .with_context(|| format!("failed to apply change '{change_id}'"))?;
            if json {
                print_json(&report)?;
            } else {
                let mode = if report.dry_run { " (dry run)" } else { "" };
                println!("Applied {change_id}{mode}:");
                for (kind, count) in &report.counts {
                    println!("  {kind}: {count}");
                }
            }
        }
        ChangeSubcommand::Archive { change_id } => {
            let path = mgr
                .archive(&change_id, &mut NoopHooks)
                .with_context(|| format!("failed to archive change '{change_id}'"))?;
            if json {
                print_json(&serde_json::json!({
                    "change_id": change_id,
                    "path": path.display().to_string(),
                }))?;
            } else {
                println!("Archived change: {}", path.display());
            }
        }
    }
    Ok(())
}
