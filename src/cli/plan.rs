//! Plan subcommand - choose combinations for a batch.

use clap::Parser;

use crate::config::Config;
use crate::planner::CombinationPlanner;

use super::print_json;

/// Plan distinct combinations of entities for a batch.
#[derive(Parser)]
pub struct PlanCommand {
    /// Comma-separated entity ids.
    #[arg(long, value_delimiter = ',', required = true)]
    pub pool: Vec<String>,

    /// Entities per combination.
    #[arg(short)]
    pub k: usize,

    /// Number of combinations.
    #[arg(short)]
    pub m: usize,

    /// Seed for a reproducible plan (defaults to `sampling.seed`, then random).
    #[arg(short, long)]
    pub seed: Option<u64>,
}

impl PlanCommand {
    /// Run the plan command.
    pub fn run(self) -> color_eyre::Result<()> {
        let config = Config::load()?;
        let planner = CombinationPlanner::new(config.planner.exhaustive_limit);
        let plan = planner.plan(
            &self.pool,
            self.k,
            self.m,
            self.seed.or(config.sampling.seed),
        )?;
        tracing::info!(
            "planned {} of {} possible combinations",
            plan.combinations.len(),
            plan.max_combinations
        );
        print_json(&plan)
    }
}
