//! Check subcommand - normalize an entity type definition.

use std::path::PathBuf;

use clap::Parser;
use serde::Serialize;

use crate::models::Dimension;
use crate::sampling::{normalize_dimensions, sampling_order};

use super::{load_entity_type, print_json};

/// Validate and normalize an entity type definition.
#[derive(Parser)]
pub struct CheckCommand {
    /// Path to a `.toml` or `.json` entity type definition.
    pub input: PathBuf,
}

#[derive(Serialize)]
struct CheckOutput {
    name: String,
    description: String,
    dimensions: Vec<Dimension>,
    sampling_order: Vec<String>,
}

impl CheckCommand {
    /// Run the check command.
    pub fn run(self) -> color_eyre::Result<()> {
        let draft = load_entity_type(&self.input)?;
        let dimensions = normalize_dimensions(draft.dimensions)?;
        let order = sampling_order(&dimensions)?;
        tracing::info!(
            "{} is valid ({} dimensions)",
            self.input.display(),
            dimensions.len()
        );

        print_json(&CheckOutput {
            name: draft.name,
            description: draft.description,
            sampling_order: order.iter().map(|&i| dimensions[i].name.clone()).collect(),
            dimensions,
        })
    }
}
