//! Sample subcommand - draw trait sets without calling a writer.

use std::path::PathBuf;

use clap::Parser;
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;

use crate::config::Config;
use crate::models::Trait;
use crate::sampling::{normalize_dimensions, sample_traits, sort_by_declaration};

use super::{load_entity_type, print_json};

/// Draw trait sets from an entity type definition.
///
/// Text dimensions are listed as pending; they need the LLM writer.
#[derive(Parser)]
pub struct SampleCommand {
    /// Path to a `.toml` or `.json` entity type definition.
    pub input: PathBuf,

    /// Number of trait sets to draw.
    #[arg(short, long, default_value = "1")]
    pub count: usize,

    /// Seed for reproducible draws (defaults to `sampling.seed`, then random).
    #[arg(short, long)]
    pub seed: Option<u64>,
}

#[derive(Serialize)]
struct SampleOutput {
    seed: u64,
    samples: Vec<SampledEntity>,
}

#[derive(Serialize)]
struct SampledEntity {
    index: usize,
    traits: Vec<Trait>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pending_text: Vec<String>,
}

impl SampleCommand {
    /// Run the sample command.
    pub fn run(self) -> color_eyre::Result<()> {
        let config = Config::load()?;
        let draft = load_entity_type(&self.input)?;
        let dimensions = normalize_dimensions(draft.dimensions)?;

        let seed = self
            .seed
            .or(config.sampling.seed)
            .unwrap_or_else(|| rand::thread_rng().next_u64());
        tracing::debug!(seed, count = self.count, "sampling '{}'", draft.name);

        let mut samples = Vec::with_capacity(self.count);
        for index in 0..self.count {
            let mut rng = StdRng::seed_from_u64(seed.wrapping_add(index as u64));
            let sampled = sample_traits(&dimensions, &mut rng)?;
            let mut traits = sampled.traits;
            sort_by_declaration(&dimensions, &mut traits);
            samples.push(SampledEntity {
                index,
                traits,
                pending_text: sampled.pending_text,
            });
        }

        print_json(&SampleOutput { seed, samples })
    }
}
