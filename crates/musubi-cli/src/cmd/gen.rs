use crate::output::print_json;
use anyhow::Context;
use clap::Subcommand;
use musubi_core::ears::EarsParts;
use musubi_core::generate::{
    AddAdr, AddRequirement, AddTask, DesignGenerator, RequirementsGenerator, TasksGenerator,
};
use musubi_core::store::Store;
use musubi_core::types::{AdrStatus, EarsPattern, Priority};
use std::path::Path;
use std::str::FromStr;

#[derive(Subcommand)]
pub enum ReqSubcommand {
    /// Compose an EARS requirement and insert it into a document
    Add {
        /// Requirements document slug
        slug: String,
        /// EARS pattern: ubiquitous, event, state, unwanted, optional
        #[arg(long)]
        pattern: String,
        /// Acting system name ("the <system> SHALL ...")
        #[arg(long)]
        system: String,
        /// Required response ("... SHALL <response>")
        #[arg(long)]
        response: String,
        /// Trigger/state/feature clause (for event, state, unwanted, optional)
        #[arg(long)]
        clause: Option<String>,
        #[arg(long)]
        title: Option<String>,
        /// Acceptance criterion (repeatable)
        #[arg(long = "criterion")]
        criteria: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum AdrSubcommand {
    /// Record an architecture decision in a design document
    Add {
        /// Design document slug
        slug: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "proposed")]
        status: String,
        #[arg(long, default_value = "")]
        context: String,
        #[arg(long)]
        decision: String,
        #[arg(long, default_value = "")]
        consequences: String,
        /// Considered alternative (repeatable)
        #[arg(long = "alternative")]
        alternatives: Vec<String>,
    },
}

#[derive(Subcommand)]
pub enum TaskSubcommand {
    /// Add a task under its priority section
    Add {
        /// Task document slug
        slug: String,
        #[arg(long)]
        title: String,
        #[arg(long, default_value = "P1")]
        priority: String,
        #[arg(long, default_value = "1")]
        points: u32,
        #[arg(long, default_value = "1.0")]
        hours: f64,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        description: Option<String>,
        /// Covered requirement ID (repeatable)
        #[arg(long = "requirement")]
        requirements: Vec<String>,
        /// Acceptance criterion (repeatable)
        #[arg(long = "criterion")]
        criteria: Vec<String>,
        /// Prerequisite task ID (repeatable)
        #[arg(long = "depends-on")]
        depends_on: Vec<String>,
    },
}

pub fn run_req(root: &Path, subcmd: ReqSubcommand, json: bool) -> anyhow::Result<()> {
    let ReqSubcommand::Add {
        slug,
        pattern,
        system,
        response,
        clause,
        title,
        criteria,
    } = subcmd;

    let pattern = EarsPattern::from_str(&pattern)
        .with_context(|| format!("unknown EARS pattern '{pattern}'"))?;
    let mut parts = EarsParts::new(system, response);
    if let Some(clause) = clause {
        parts = parts.with_clause(clause);
    }

    let store = Store::new(root);
    let gen = RequirementsGenerator::new(&store);
    let id = gen
        .add_requirement(
            &slug,
            &AddRequirement {
                pattern,
                parts,
                title,
                criteria,
            },
        )
        .with_context(|| format!("failed to add requirement to '{slug}'"))?;

    if json {
        print_json(&serde_json::json!({ "id": id.to_string(), "slug": slug }))?;
    } else {
        println!("Added {id}");
    }
    Ok(())
}

pub fn run_adr(root: &Path, subcmd: AdrSubcommand, json: bool) -> anyhow::Result<()> {
    let AdrSubcommand::Add {
        slug,
        title,
        status,
        context,
        decision,
        consequences,
        alternatives,
    } = subcmd;

    let status =
        AdrStatus::from_str(&status).with_context(|| format!("unknown ADR status '{status}'"))?;
    let store = Store::new(root);
    let gen = DesignGenerator::new(&store);
    let id = gen
        .add_adr(
            &slug,
            &AddAdr {
                title,
                status,
                context,
                decision,
                consequences,
                alternatives,
            },
        )
        .with_context(|| format!("failed to add ADR to '{slug}'"))?;

    if json {
        print_json(&serde_json::json!({ "id": id.to_string(), "slug": slug }))?;
    } else {
        println!("Added {id}");
    }
    Ok(())
}

pub fn run_task(root: &Path, subcmd: TaskSubcommand, json: bool) -> anyhow::Result<()> {
    let TaskSubcommand::Add {
        slug,
        title,
        priority,
        points,
        hours,
        assignee,
        description,
        requirements,
        criteria,
        depends_on,
    } = subcmd;

    let priority = Priority::from_str(&priority)
        .with_context(|| format!("unknown priority '{priority}'"))?;
    let store = Store::new(root);
    let gen = TasksGenerator::new(&store);
    let id = gen
        .add_task(
            &slug,
            &AddTask {
                title,
                priority,
                story_points: points,
                estimated_hours: hours,
                assignee,
                description,
                requirements,
                criteria,
                depends_on,
            },
        )
        .with_context(|| format!("failed to add task to '{slug}'"))?;

    if json {
        print_json(&serde_json::json!({ "id": id.to_string(), "slug": slug }))?;
    } else {
        println!("Added {id}");
    }
    Ok(())
}
