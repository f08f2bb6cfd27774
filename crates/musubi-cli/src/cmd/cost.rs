use crate::output::{print_json, print_table};
use anyhow::Context;
use clap::Subcommand;
use musubi_core::cost::{CostTracker, Totals};
use musubi_core::types::BudgetPeriod;
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

#[derive(Subcommand)]
pub enum CostSubcommand {
    /// Record one language-model usage event
    Record {
        #[arg(long)]
        provider: String,
        #[arg(long)]
        model: String,
        #[arg(long, default_value = "chat")]
        operation: String,
        #[arg(long)]
        input: u64,
        #[arg(long)]
        output: u64,
    },
    /// Show period totals and the persisted period window
    Summary,
    /// Show or set the budget limit
    Budget {
        /// Limit in USD (omit to show the current budget)
        #[arg(long)]
        limit: Option<f64>,
        /// Window: daily, weekly, monthly
        #[arg(long, default_value = "daily")]
        period: String,
    },
}

pub fn run(root: &Path, subcmd: CostSubcommand, json: bool) -> anyhow::Result<()> {
    let mut tracker = CostTracker::new(root).context("failed to load cost tracker state")?;

    match subcmd {
        CostSubcommand::Record {
            provider,
            model,
            operation,
            input,
            output,
        } => {
            tracker.on_budget_event(|event, status| {
                eprintln!(
                    "{}: {:.2} of {:.2} USD spent this {}",
                    event.as_str(),
                    status.spent,
                    status.limit,
                    status.period
                );
            });
            let record = tracker
                .record(&provider, &model, &operation, input, output, BTreeMap::new())
                .context("failed to record usage")?;
            if json {
                print_json(&record)?;
            } else {
                println!("Recorded {model}: {:.4} USD", record.cost);
            }
        }
        CostSubcommand::Summary => {
            let period = tracker.period();
            if json {
                print_json(&serde_json::json!({
                    "period": period,
                    "session": tracker.summary(),
                }))?;
                return Ok(());
            }
            println!(
                "Period ({}, since {}):",
                period.period,
                period.period_start.format("%Y-%m-%d")
            );
            print_totals(&period.totals);
            if let Some(budget) = tracker.budget() {
                println!(
                    "Budget: {:.2} / {:.2} USD ({})",
                    period.totals.cost, budget.limit, budget.period
                );
            }
        }
        CostSubcommand::Budget { limit, period } => {
            let period = BudgetPeriod::from_str(&period)
                .with_context(|| format!("unknown budget period '{period}'"))?;
            match limit {
                Some(limit) => {
                    tracker
                        .set_budget(limit, period)
                        .context("failed to save budget")?;
                    if json {
                        print_json(&tracker.budget())?;
                    } else {
                        println!("Budget set: {limit:.2} USD per {period}");
                    }
                }
                None => match tracker.budget() {
                    Some(budget) if json => print_json(&budget)?,
                    Some(budget) => {
                        println!("Budget: {:.2} USD per {}", budget.limit, budget.period)
                    }
                    None => println!("No budget configured."),
                },
            }
        }
    }
    Ok(())
}

fn print_totals(totals: &Totals) {
    print_table(
        &["REQUESTS", "INPUT TOKENS", "OUTPUT TOKENS", "COST (USD)"],
        vec![vec![
            totals.requests.to_string(),
            totals.input_tokens.to_string(),
            totals.output_tokens.to_string(),
            format!("{:.4}", totals.cost),
        ]],
    );
}
