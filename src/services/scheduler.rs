//! Simulation run scheduler.
//!
//! One simulation is a sequence of segments (the first run, then one per
//! continuation). Inside a segment, rounds run strictly one after another:
//! each round hands the dialogue writer everything written so far and appends
//! what comes back. The simulation is saved after every round, so a crash or
//! cancellation never loses a finished round and never leaves half of one.
//!
//! ```text
//! Pending -> RoundInProgress -> Completed
//!                 |  \-> Failed      (collaborator error or timeout)
//!                 \----> Cancelled   (between rounds)
//! ```

use std::sync::Arc;

use tracing::Instrument;

use crate::config::Config;
use crate::context::{AppDialogue, AppStore, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::llm::{with_timeout, DialogueRequest};
use crate::models::{SegmentPlan, Simulation, SimulationSpec, SimulationStatus};
use crate::services::CancelSignal;

#[derive(FromContext, Clone)]
pub struct SimulationScheduler {
    store: AppStore,
    dialogue: AppDialogue,
    config: Arc<Config>,
}

impl SimulationScheduler {
    /// Creates a simulation for `spec` and runs its first segment.
    ///
    /// Collaborator failures do not surface as `Err`: they leave the returned
    /// simulation `Failed` with every completed round kept.
    pub async fn start(
        &self,
        spec: SimulationSpec,
        batch_id: Option<String>,
        cancel: &CancelSignal,
    ) -> Result<Simulation, AppError> {
        spec.validate()?;
        let simulation = Simulation::new(spec, batch_id);
        let plan = SegmentPlan::from_spec(&simulation.spec);
        self.execute(simulation, plan, cancel).await
    }

    /// Opens a new segment on `simulation` and runs it to a terminal state.
    pub async fn execute(
        &self,
        mut simulation: Simulation,
        plan: SegmentPlan,
        cancel: &CancelSignal,
    ) -> Result<Simulation, AppError> {
        let segment = simulation.begin_segment(plan);
        self.run_segment(simulation, segment, cancel).await
    }

    /// Re-runs the rounds of the latest segment that were never recorded.
    ///
    /// Recorded rounds are skipped, so resuming a simulation any number of
    /// times never duplicates content. A completed simulation is returned as is.
    pub async fn resume(&self, id: &str, cancel: &CancelSignal) -> Result<Simulation, AppError> {
        let mut simulation = self.get(id).await?;

        let complete = simulation.current_segment().is_some_and(|s| {
            s.status == SimulationStatus::Completed
                && simulation.rounds_in_segment(s.index) >= s.plan.simulation_rounds as usize
        });
        if complete {
            tracing::debug!(id, "simulation already complete, nothing to resume");
            return Ok(simulation);
        }

        match simulation.reopen_segment() {
            Some(segment) => self.run_segment(simulation, segment, cancel).await,
            None => {
                let plan = SegmentPlan::from_spec(&simulation.spec);
                self.execute(simulation, plan, cancel).await
            }
        }
    }

    pub async fn get(&self, id: &str) -> Result<Simulation, AppError> {
        self.store
            .get_simulation(id)
            .await?
            .ok_or_else(|| AppError::SimulationNotFound(id.to_string()))
    }

    async fn run_segment(
        &self,
        simulation: Simulation,
        segment: u32,
        cancel: &CancelSignal,
    ) -> Result<Simulation, AppError> {
        let span = tracing::info_span!("simulation", id = %simulation.id, segment);
        self.run_rounds(simulation, segment, cancel)
            .instrument(span)
            .await
    }

    async fn run_rounds(
        &self,
        mut simulation: Simulation,
        segment: u32,
        cancel: &CancelSignal,
    ) -> Result<Simulation, AppError> {
        let Some(plan) = simulation.current_segment().map(|s| s.plan.clone()) else {
            return Err(AppError::Validation(format!(
                "simulation {} has no segment to run",
                simulation.id
            )));
        };
        let spec = plan.apply(&simulation.spec);
        let timeout = self.config.llm.timeout();

        self.store.save_simulation(&simulation).await?;
        tracing::info!(rounds = plan.simulation_rounds, n_turns = plan.n_turns, "running");

        for round in 1..=plan.simulation_rounds {
            if simulation.has_round(segment, round) {
                tracing::debug!(round, "round already recorded");
                continue;
            }
            if cancel.is_cancelled() {
                tracing::info!(round, "cancelled before round");
                simulation.finish_segment(SimulationStatus::Cancelled, None);
                self.store.save_simulation(&simulation).await?;
                return Ok(simulation);
            }

            let request = DialogueRequest {
                spec: spec.clone(),
                prior_content: simulation.content.clone(),
                n_turns: plan.n_turns,
                first_turn_number: simulation.final_turn_number + 1,
                round,
            };
            let outcome = with_timeout(timeout, self.dialogue.generate_turns(&request)).await;

            match outcome {
                Ok(output) => {
                    let turns = output.turns_produced;
                    simulation.record_round(segment, round, output.text, turns);
                    self.store.save_simulation(&simulation).await?;
                    tracing::debug!(
                        round,
                        turns,
                        final_turn_number = simulation.final_turn_number,
                        "round recorded"
                    );
                }
                Err(e) => {
                    tracing::warn!(round, error = %e, "round failed");
                    simulation.finish_segment(SimulationStatus::Failed, Some(e.to_string()));
                    self.store.save_simulation(&simulation).await?;
                    return Ok(simulation);
                }
            }
        }

        simulation.finish_segment(SimulationStatus::Completed, None);
        self.store.save_simulation(&simulation).await?;
        tracing::info!(
            final_turn_number = simulation.final_turn_number,
            "simulation completed"
        );
        Ok(simulation)
    }
}
