//! Scripted collaborators and context helpers shared by the integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use dramatis::config::Config;
use dramatis::context::Context;
use dramatis::error::CollaboratorError;
use dramatis::llm::{
    BackstoryRequest, DialogueOutput, DialogueRequest, DialogueWriter, EntityWriter,
    TextTraitRequest, Variability,
};
use dramatis::models::TraitValue;
use dramatis::repositories::MemoryStore;
use dramatis::services::CancelHandle;

/// Text the scripted dialogue writer returns for one round.
pub fn round_text(round: u32, first_turn: u64, turns: u32) -> String {
    format!(
        "<round {round}: turns {first_turn}-{}>\n",
        first_turn + u64::from(turns) - 1
    )
}

/// Writes backstories, refusing entities that carry a given trait value.
#[derive(Default)]
pub struct ScriptedWriter {
    refuse: Option<(String, TraitValue)>,
    pub backstory_calls: AtomicUsize,
    /// Guidance seen by every backstory call, in call order.
    pub backstory_guidance: Mutex<Vec<(Variability, Option<String>)>>,
    /// Guidance seen by every text trait call, in call order.
    pub text_variability: Mutex<Vec<Variability>>,
}

impl ScriptedWriter {
    pub fn refusing(dimension: &str, value: TraitValue) -> Self {
        Self {
            refuse: Some((dimension.to_string(), value)),
            ..Self::default()
        }
    }
}

#[async_trait]
impl EntityWriter for ScriptedWriter {
    async fn generate_backstory(
        &self,
        request: &BackstoryRequest,
    ) -> Result<String, CollaboratorError> {
        self.backstory_calls.fetch_add(1, Ordering::SeqCst);
        self.backstory_guidance
            .lock()
            .unwrap()
            .push((request.variability, request.extra_description.clone()));
        if let Some((dimension, value)) = &self.refuse {
            let hit = request
                .traits
                .iter()
                .any(|t| &t.dimension_name == dimension && &t.value == value);
            if hit {
                return Err(CollaboratorError::Failed("writer refused".into()));
            }
        }
        Ok(format!(
            "A {} described by {} traits.",
            request.entity_type.name,
            request.traits.len()
        ))
    }

    async fn generate_text_trait(
        &self,
        request: &TextTraitRequest,
    ) -> Result<String, CollaboratorError> {
        self.text_variability
            .lock()
            .unwrap()
            .push(request.variability);
        Ok(format!(
            "{} written after {} siblings",
            request.dimension.name,
            request.siblings.len()
        ))
    }
}

/// Dialogue writer with scripted failures, stalls and cancellations.
#[derive(Default)]
pub struct ScriptedDialogue {
    pub calls: AtomicUsize,
    /// Simulations including this entity fail every round.
    doomed: Option<String>,
    /// Simulations including this entity never answer.
    stalled: Option<String>,
    /// The first call for this round number fails; later ones succeed.
    fail_once_at_round: Mutex<Option<u32>>,
    /// Cancels the handle once this many calls have been answered.
    cancel_after: Mutex<Option<(usize, CancelHandle)>>,
    /// Turns returned are this many fewer than requested (at least one).
    short_by: u32,
    /// Prior content seen by every call, in call order.
    pub prior_contents: Mutex<Vec<String>>,
}

impl ScriptedDialogue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn dooming(mut self, entity_id: &str) -> Self {
        self.doomed = Some(entity_id.to_string());
        self
    }

    pub fn stalling(mut self, entity_id: &str) -> Self {
        self.stalled = Some(entity_id.to_string());
        self
    }

    pub fn failing_once_at_round(self, round: u32) -> Self {
        *self.fail_once_at_round.lock().unwrap() = Some(round);
        self
    }

    pub fn cancelling_after(self, calls: usize, handle: CancelHandle) -> Self {
        *self.cancel_after.lock().unwrap() = Some((calls, handle));
        self
    }

    pub fn short_by(mut self, turns: u32) -> Self {
        self.short_by = turns;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DialogueWriter for ScriptedDialogue {
    async fn generate_turns(
        &self,
        request: &DialogueRequest,
    ) -> Result<DialogueOutput, CollaboratorError> {
        let calls = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.prior_contents
            .lock()
            .unwrap()
            .push(request.prior_content.clone());

        let ids = &request.spec.entity_ids;
        if self.stalled.as_ref().is_some_and(|id| ids.contains(id)) {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        if self.doomed.as_ref().is_some_and(|id| ids.contains(id)) {
            return Err(CollaboratorError::Failed("model unavailable".into()));
        }
        {
            let mut fail_at = self.fail_once_at_round.lock().unwrap();
            if *fail_at == Some(request.round) {
                *fail_at = None;
                return Err(CollaboratorError::Failed("transient failure".into()));
            }
        }

        let turns = request.n_turns.saturating_sub(self.short_by).max(1);
        let output = DialogueOutput {
            text: round_text(request.round, request.first_turn_number, turns),
            turns_produced: turns,
        };

        if let Some((after, handle)) = self.cancel_after.lock().unwrap().as_ref() {
            if calls >= *after {
                handle.cancel();
            }
        }
        Ok(output)
    }
}

pub fn config() -> Config {
    let mut config = Config::default();
    config.simulation.max_concurrency = 3;
    config
}

/// Builds a context over a fresh in-memory store.
pub fn context(
    writer: Arc<ScriptedWriter>,
    dialogue: Arc<ScriptedDialogue>,
    config: Config,
) -> Context {
    Context {
        store: Arc::new(MemoryStore::new()),
        writer,
        dialogue,
        config: Arc::new(config),
    }
}
