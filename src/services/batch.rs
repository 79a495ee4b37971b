//! Batch orchestration: fan a combination plan out into independent simulations.
//!
//! Components share nothing but the store, so they run on a bounded worker
//! pool (`simulation.max_concurrency`). A failing component is recorded as
//! `Failed` and never affects its siblings; the batch status is aggregated
//! from the component statuses once every component has stopped.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tracing::Instrument;

use crate::config::Config;
use crate::context::{AppStore, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::{
    validate_counts, BatchSimulation, BatchStatus, SegmentPlan, Simulation, SimulationSpec,
    SimulationStatus,
};
use crate::planner::CombinationPlanner;
use crate::services::{CancelSignal, SimulationScheduler};

/// Parameters for a batch run.
#[derive(Debug, Clone)]
pub struct BatchRequest {
    pub entity_pool: Vec<String>,
    /// Entities per simulation (k).
    pub interaction_size: usize,
    /// Simulations to run (m). Ignored when `combinations` is given.
    pub num_simulations: usize,
    pub context: String,
    pub interaction_type: String,
    pub language: String,
    pub n_turns: u32,
    pub simulation_rounds: u32,
    /// Planner seed; falls back to `sampling.seed`.
    pub seed: Option<u64>,
    /// Caller-chosen combinations, validated instead of planned.
    pub combinations: Option<Vec<Vec<String>>>,
}

#[derive(FromContext, Clone)]
pub struct BatchOrchestrator {
    store: AppStore,
    scheduler: SimulationScheduler,
    config: Arc<Config>,
}

impl BatchOrchestrator {
    /// Plans the batch, runs every component and returns the batch with its
    /// aggregated status.
    ///
    /// Planning errors are returned before anything is stored. After that,
    /// only store errors are returned; collaborator failures end up in the
    /// component simulations.
    pub async fn run(
        &self,
        request: BatchRequest,
        cancel: &CancelSignal,
    ) -> Result<BatchSimulation, AppError> {
        validate_counts(request.n_turns, request.simulation_rounds)?;

        let planner = CombinationPlanner::new(self.config.planner.exhaustive_limit);
        let plan = match request.combinations {
            Some(combinations) => {
                planner.validate(&request.entity_pool, request.interaction_size, combinations)?
            }
            None => planner.plan(
                &request.entity_pool,
                request.interaction_size,
                request.num_simulations,
                request.seed.or(self.config.sampling.seed),
            )?,
        };

        let mut batch = BatchSimulation::new(
            request.entity_pool,
            request.interaction_size,
            plan.combinations.len(),
            request.context,
            request.interaction_type,
            request.language,
            request.n_turns,
            request.simulation_rounds,
        );
        batch.seed = plan.seed;

        let components: Vec<Simulation> = plan
            .combinations
            .into_iter()
            .map(|entity_ids| {
                Simulation::new(
                    SimulationSpec {
                        entity_ids,
                        context: batch.context.clone(),
                        interaction_type: batch.interaction_type.clone(),
                        language: batch.language.clone(),
                        n_turns: batch.n_turns,
                        simulation_rounds: batch.simulation_rounds,
                    },
                    Some(batch.id.clone()),
                )
            })
            .collect();

        for simulation in &components {
            self.store.save_simulation(simulation).await?;
        }
        batch.simulation_ids = components.iter().map(|s| s.id.clone()).collect();
        batch.set_status(BatchStatus::InProgress);
        self.store.save_batch(&batch).await?;

        let span = tracing::info_span!("batch", id = %batch.id);
        let statuses = self
            .run_components(components, cancel)
            .instrument(span)
            .await;

        batch.set_status(BatchStatus::aggregate(statuses));
        self.store.save_batch(&batch).await?;
        tracing::info!(id = %batch.id, status = ?batch.status, "batch finished");
        Ok(batch)
    }

    async fn run_components(
        &self,
        components: Vec<Simulation>,
        cancel: &CancelSignal,
    ) -> Vec<SimulationStatus> {
        tracing::info!(components = components.len(), "running batch");
        let scheduler = &self.scheduler;

        stream::iter(components)
            .map(move |simulation| async move {
                let id = simulation.id.clone();
                let plan = SegmentPlan::from_spec(&simulation.spec);
                match scheduler.execute(simulation, plan, cancel).await {
                    Ok(done) => {
                        if done.status == SimulationStatus::Failed {
                            tracing::warn!(simulation = %id, "component failed");
                        }
                        done.status
                    }
                    Err(e) => {
                        tracing::warn!(simulation = %id, error = %e, "component aborted");
                        SimulationStatus::Failed
                    }
                }
            })
            .buffer_unordered(self.config.simulation.max_concurrency.max(1))
            .collect()
            .await
    }

    pub async fn get(&self, id: &str) -> Result<BatchSimulation, AppError> {
        self.store
            .get_batch(id)
            .await?
            .ok_or_else(|| AppError::BatchNotFound(id.to_string()))
    }

    /// Recomputes the batch status from the stored component simulations.
    ///
    /// Components missing from the store count as failed.
    pub async fn refresh(&self, id: &str) -> Result<BatchSimulation, AppError> {
        let mut batch = self.get(id).await?;

        let mut statuses = Vec::with_capacity(batch.simulation_ids.len());
        for simulation_id in &batch.simulation_ids {
            let status = self
                .store
                .get_simulation(simulation_id)
                .await?
                .map_or(SimulationStatus::Failed, |s| s.status);
            statuses.push(status);
        }

        let status = BatchStatus::aggregate(statuses);
        if status != batch.status {
            batch.set_status(status);
            self.store.save_batch(&batch).await?;
        }
        Ok(batch)
    }

    /// Deletes the batch and its component simulations.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.store.delete_batch(id).await? {
            return Err(AppError::BatchNotFound(id.to_string()));
        }
        tracing::info!(id, "deleted batch");
        Ok(())
    }
}
