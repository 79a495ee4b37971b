//! External LLM collaborator boundary.
//!
//! The core never builds prompts or picks models. It hands these traits a
//! request value and gets text back:
//!
//! - [`EntityWriter`] writes backstories and text-typed traits for sampled entities.
//! - [`DialogueWriter`] writes one round of dialogue turns for a simulation.
//!
//! Every call goes through [`with_timeout`], so a slow collaborator surfaces as
//! [`CollaboratorError::Timeout`] and is handled like any other failure.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::CollaboratorError;
use crate::models::{Dimension, EntityType, SimulationSpec, Trait};

/// Generation guidance forwarded to the writer. Sampling ignores it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Variability {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone)]
pub struct BackstoryRequest {
    pub entity_type: EntityType,
    pub traits: Vec<Trait>,
    pub extra_description: Option<String>,
    pub variability: Variability,
}

#[derive(Debug, Clone)]
pub struct TextTraitRequest {
    pub entity_type: EntityType,
    pub dimension: Dimension,
    /// Traits drawn so far for the same entity.
    pub siblings: Vec<Trait>,
    pub variability: Variability,
}

#[derive(Debug, Clone)]
pub struct DialogueRequest {
    pub spec: SimulationSpec,
    /// Transcript accumulated across every earlier round and continuation.
    pub prior_content: String,
    pub n_turns: u32,
    /// Number the first turn of this round should carry.
    pub first_turn_number: u64,
    /// 1-based round within the current call.
    pub round: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueOutput {
    pub text: String,
    /// May be fewer than requested.
    pub turns_produced: u32,
}

#[async_trait]
pub trait EntityWriter: Send + Sync {
    async fn generate_backstory(&self, request: &BackstoryRequest)
        -> Result<String, CollaboratorError>;

    async fn generate_text_trait(
        &self,
        request: &TextTraitRequest,
    ) -> Result<String, CollaboratorError>;
}

#[async_trait]
pub trait DialogueWriter: Send + Sync {
    async fn generate_turns(
        &self,
        request: &DialogueRequest,
    ) -> Result<DialogueOutput, CollaboratorError>;
}

/// Runs a collaborator call under a deadline.
pub async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, CollaboratorError>
where
    F: Future<Output = Result<T, CollaboratorError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(CollaboratorError::Timeout(timeout)),
    }
}
