//! Continuation of finished simulations.
//!
//! A continuation appends a new segment to an existing simulation: the
//! transcript and the running turn number carry over, the entity set and the
//! base context never change, and `simulation_rounds` counts from 1 again.
//! Callers hold on to a [`ContinuationState`] (ids and counters, never the
//! transcript itself) and may hand it back to make sure nothing moved in
//! between.

use serde::{Deserialize, Serialize};

use crate::context::{AppStore, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::{validate_counts, SegmentPlan, Simulation};
use crate::services::{CancelSignal, SimulationScheduler};

/// Points at a simulation's transcript as it stood at a given moment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentRef {
    pub simulation_id: String,
    /// Rounds recorded across the lineage.
    pub rounds: usize,
    /// Transcript length in bytes.
    pub len: usize,
}

impl ContentRef {
    fn of(simulation: &Simulation) -> Self {
        Self {
            simulation_id: simulation.id.clone(),
            rounds: simulation.rounds.len(),
            len: simulation.content.len(),
        }
    }

    /// The referenced transcript, if `simulation` still matches this reference.
    pub fn resolve<'a>(&self, simulation: &'a Simulation) -> Option<&'a str> {
        (*self == Self::of(simulation)).then_some(simulation.content.as_str())
    }
}

/// Where a continuation would pick up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContinuationState {
    pub simulation_id: String,
    pub final_turn_number: u64,
    pub content_ref: ContentRef,
}

impl ContinuationState {
    fn of(simulation: &Simulation) -> Self {
        Self {
            simulation_id: simulation.id.clone(),
            final_turn_number: simulation.final_turn_number,
            content_ref: ContentRef::of(simulation),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContinuationRequest {
    pub simulation_id: String,
    pub n_turns: u32,
    pub simulation_rounds: u32,
    /// Defaults to the value used by the latest segment.
    pub interaction_type: Option<String>,
    /// Defaults to the value used by the latest segment.
    pub language: Option<String>,
    /// Rejects the call if the simulation moved on since this state was read.
    pub expected_state: Option<ContinuationState>,
    /// Rejects the call unless the simulation has exactly these entities, in order.
    pub entity_ids: Option<Vec<String>>,
}

#[derive(FromContext, Clone)]
pub struct ContinuationResolver {
    store: AppStore,
    scheduler: SimulationScheduler,
}

impl ContinuationResolver {
    /// Current continuation state of a simulation.
    pub async fn state(&self, simulation_id: &str) -> Result<ContinuationState, AppError> {
        let simulation = self.load(simulation_id).await?;
        Ok(ContinuationState::of(&simulation))
    }

    /// Appends `simulation_rounds` new rounds to a finished simulation.
    ///
    /// The simulation must have stopped (completed, failed or cancelled) with
    /// at least one recorded round.
    pub async fn continue_simulation(
        &self,
        request: ContinuationRequest,
        cancel: &CancelSignal,
    ) -> Result<Simulation, AppError> {
        validate_counts(request.n_turns, request.simulation_rounds)?;
        let simulation = self.load(&request.simulation_id).await?;

        let Some(latest) = simulation.current_segment() else {
            return Err(AppError::ContinuationState(format!(
                "simulation {} has never run",
                simulation.id
            )));
        };
        if !latest.status.is_terminal() {
            return Err(AppError::ContinuationState(format!(
                "simulation {} is still running",
                simulation.id
            )));
        }
        if simulation.rounds.is_empty() {
            return Err(AppError::ContinuationState(format!(
                "simulation {} has no recorded rounds",
                simulation.id
            )));
        }

        if let Some(entity_ids) = &request.entity_ids {
            if *entity_ids != simulation.spec.entity_ids {
                return Err(AppError::ContinuationState(format!(
                    "entity set does not match simulation {}",
                    simulation.id
                )));
            }
        }
        if let Some(expected) = &request.expected_state {
            if *expected != ContinuationState::of(&simulation) {
                return Err(AppError::ContinuationState(format!(
                    "simulation {} changed since its state was read",
                    simulation.id
                )));
            }
        }

        let plan = SegmentPlan {
            n_turns: request.n_turns,
            simulation_rounds: request.simulation_rounds,
            interaction_type: request
                .interaction_type
                .unwrap_or_else(|| latest.plan.interaction_type.clone()),
            language: request
                .language
                .unwrap_or_else(|| latest.plan.language.clone()),
        };

        tracing::info!(
            id = %simulation.id,
            from_turn = simulation.final_turn_number,
            rounds = plan.simulation_rounds,
            "continuing simulation"
        );
        self.scheduler.execute(simulation, plan, cancel).await
    }

    async fn load(&self, id: &str) -> Result<Simulation, AppError> {
        self.store
            .get_simulation(id)
            .await?
            .ok_or_else(|| AppError::SimulationNotFound(id.to_string()))
    }
}
