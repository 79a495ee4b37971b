//! CLI module for Dramatis.
//!
//! Subcommands work offline, without any LLM collaborator:
//! - `check`: Normalize an entity type definition and show its sampling order
//! - `sample`: Draw trait sets from an entity type definition
//! - `plan`: Plan batch combinations over an entity pool

mod check;
mod plan;
mod sample;

use std::path::Path;

use clap::{Parser, Subcommand};
use figment::providers::{Format, Json, Toml};
use figment::Figment;

use crate::config::ConfigError;
use crate::error::AppError;
use crate::models::EntityTypeDraft;

pub use check::CheckCommand;
pub use plan::PlanCommand;
pub use sample::SampleCommand;

/// Dramatis - entity sampling and dialogue simulation scheduling
#[derive(Parser)]
#[command(name = "dramatis")]
#[command(about = "Sample entities from typed dimensions and plan dialogue simulations")]
#[command(version)]
pub struct App {
    /// Run in verbose mode
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate and normalize an entity type definition
    Check(CheckCommand),

    /// Draw trait sets from an entity type definition
    Sample(SampleCommand),

    /// Plan distinct combinations of entities for a batch
    Plan(PlanCommand),
}

impl App {
    /// Run the CLI application.
    pub async fn run(self) -> color_eyre::Result<()> {
        match self.command {
            Command::Check(cmd) => cmd.run(),
            Command::Sample(cmd) => cmd.run(),
            Command::Plan(cmd) => cmd.run(),
        }
    }
}

/// Reads an entity type definition from a `.json` or `.toml` file.
pub fn load_entity_type(path: &Path) -> Result<EntityTypeDraft, AppError> {
    if !path.is_file() {
        let missing = figment::Error::from(format!("{} is not a file", path.display()));
        return Err(ConfigError::from(missing).into());
    }

    let figment = match path.extension().and_then(|e| e.to_str()) {
        Some("json") => Figment::from(Json::file(path)),
        _ => Figment::from(Toml::file(path)),
    };
    figment
        .extract()
        .map_err(|e| AppError::from(ConfigError::from(e)))
}

fn print_json<T: serde::Serialize>(value: &T) -> color_eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
