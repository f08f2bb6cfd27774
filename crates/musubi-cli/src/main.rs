mod cmd;
mod output;
mod root;

use clap::{Parser, Subcommand};
use cmd::{
    change::ChangeSubcommand,
    cost::CostSubcommand,
    gen::{AdrSubcommand, ReqSubcommand, TaskSubcommand},
};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "musubi",
    about = "Specification-driven development toolkit — EARS requirements, design, tasks, changes, and the analyses over them",
    version,
    propagate_version = true
)]
struct Cli {
    /// Workspace root (default: auto-detect from docs/requirements/ or .git/)
    #[arg(long, global = true, env = "MUSUBI_ROOT")]
    root: Option<PathBuf>,

    /// Output as JSON
    #[arg(long, global = true, short = 'j')]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create an artifact document for a feature from its template
    Init {
        /// Artifact kind: requirements, design, tasks
        kind: String,
        /// Feature name (slugified for the file name)
        feature: String,
        #[arg(long)]
        project: Option<String>,
        #[arg(long)]
        author: Option<String>,
        #[arg(long)]
        component: Option<String>,
        #[arg(long)]
        system: Option<String>,
    },

    /// Add EARS requirements to a requirements document
    Req {
        #[command(subcommand)]
        subcommand: ReqSubcommand,
    },

    /// Add architecture decision records to a design document
    Adr {
        #[command(subcommand)]
        subcommand: AdrSubcommand,
    },

    /// Add tasks to a task document
    Task {
        #[command(subcommand)]
        subcommand: TaskSubcommand,
    },

    /// Validate requirements and task documents across the workspace
    Validate {
        /// Exit with an error on the first failed document
        #[arg(long)]
        strict: bool,
    },

    /// Forward/backward coverage and gap report over the trace graph
    Coverage,

    /// Impact analysis for a requirement change
    Impact {
        /// Analyze every item of a pending change document
        #[arg(long, conflicts_with_all = ["kind", "target"])]
        change: Option<String>,
        /// Delta classification: ADDED, MODIFIED, REMOVED, RENAMED
        #[arg(long, requires = "target")]
        kind: Option<String>,
        /// Target requirement ID
        #[arg(long, requires = "kind")]
        target: Option<String>,
    },

    /// Manage change deltas
    Change {
        #[command(subcommand)]
        subcommand: ChangeSubcommand,
    },

    /// Group a task document into parallel execution waves
    Plan {
        /// Task document slug (omit to plan over every task document)
        slug: Option<String>,
        /// Output format: waves, edges, mermaid
        #[arg(long, default_value = "waves")]
        format: String,
    },

    /// Record and summarize language-model usage
    Cost {
        #[command(subcommand)]
        subcommand: CostSubcommand,
    },
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_target(false)
        .init();

    let root = root::resolve_root(cli.root.as_deref());

    let result = match cli.command {
        Commands::Init {
            kind,
            feature,
            project,
            author,
            component,
            system,
        } => cmd::init::run(&root, &kind, &feature, project, author, component, system, cli.json),
        Commands::Req { subcommand } => cmd::gen::run_req(&root, subcommand, cli.json),
        Commands::Adr { subcommand } => cmd::gen::run_adr(&root, subcommand, cli.json),
        Commands::Task { subcommand } => cmd::gen::run_task(&root, subcommand, cli.json),
        Commands::Validate { strict } => cmd::validate::run(&root, strict, cli.json),
        Commands::Coverage => cmd::coverage::run(&root, cli.json),
        Commands::Impact { change, kind, target } => {
            cmd::impact::run(&root, change.as_deref(), kind.as_deref(), target.as_deref(), cli.json)
        }
        Commands::Change { subcommand } => cmd::change::run(&root, subcommand, cli.json),
        Commands::Plan { slug, format } => {
            cmd::plan::run(&root, slug.as_deref(), &format, cli.json)
        }
        Commands::Cost { subcommand } => cmd::cost::run(&root, subcommand, cli.json),
    };

    if let Err(e) = result {
        // Print the full error chain (anyhow's alternate Display)
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}
