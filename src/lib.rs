//! Dramatis - entity sampling and multi-round dialogue simulation scheduling.
//!
//! Entity types are sets of typed dimensions. Entities are sampled from them
//! with an injected, seedable random source and handed to an LLM collaborator
//! for their text. Entities then meet in simulations: sequential rounds of
//! generated dialogue that can be continued later or fanned out in batches
//! over combinations of an entity pool.

pub mod cli;
pub mod config;
pub mod context;
pub mod di;
pub mod error;
pub mod llm;
pub mod models;
pub mod planner;
pub mod repositories;
pub mod sampling;
pub mod services;

// Re-export FromRef at crate root for di-macros generated code
pub use di::FromRef;
