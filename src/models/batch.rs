//! Batch simulations: independent runs over combinations of an entity pool.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{generate_ulid, SimulationStatus};

/// Aggregate state of a batch's component simulations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Pending,
    InProgress,
    Partial,
    Completed,
    Failed,
}

impl BatchStatus {
    /// Derives a batch status from its components.
    ///
    /// `completed` iff all completed, `failed` iff all failed, `in_progress`
    /// while anything is unfinished, `partial` for any other terminal mix.
    pub fn aggregate<I>(statuses: I) -> Self
    where
        I: IntoIterator<Item = SimulationStatus>,
    {
        let mut total = 0usize;
        let mut pending = 0usize;
        let mut running = 0usize;
        let mut completed = 0usize;
        let mut failed = 0usize;

        for status in statuses {
            total += 1;
            match status {
                SimulationStatus::Pending => pending += 1,
                SimulationStatus::RoundInProgress => running += 1,
                SimulationStatus::Completed => completed += 1,
                SimulationStatus::Failed => failed += 1,
                SimulationStatus::Cancelled => {}
            }
        }

        if total == 0 || pending == total {
            BatchStatus::Pending
        } else if pending + running > 0 {
            BatchStatus::InProgress
        } else if completed == total {
            BatchStatus::Completed
        } else if failed == total {
            BatchStatus::Failed
        } else {
            BatchStatus::Partial
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Partial | BatchStatus::Completed | BatchStatus::Failed
        )
    }
}

/// A fan-out of simulations over `num_simulations` combinations of the pool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSimulation {
    /// Unique identifier (ULID).
    pub id: String,
    pub entity_pool: Vec<String>,
    /// Entities per simulation (k).
    pub interaction_size: usize,
    /// Component simulations (m).
    pub num_simulations: usize,
    pub context: String,
    pub interaction_type: String,
    pub language: String,
    pub n_turns: u32,
    pub simulation_rounds: u32,
    /// Seed the combinations were planned with, if they were planned.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    pub status: BatchStatus,
    /// Component simulation ids, in combination order.
    pub simulation_ids: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl BatchSimulation {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        entity_pool: Vec<String>,
        interaction_size: usize,
        num_simulations: usize,
        context: String,
        interaction_type: String,
        language: String,
        n_turns: u32,
        simulation_rounds: u32,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: generate_ulid(),
            entity_pool,
            interaction_size,
            num_simulations,
            context,
            interaction_type,
            language,
            n_turns,
            simulation_rounds,
            seed: None,
            status: BatchStatus::Pending,
            simulation_ids: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_status(&mut self, status: BatchStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SimulationStatus::*;

    #[test]
    fn test_aggregate_all_completed() {
        assert_eq!(
            BatchStatus::aggregate([Completed, Completed]),
            BatchStatus::Completed
        );
    }

    #[test]
    fn test_aggregate_all_failed() {
        assert_eq!(BatchStatus::aggregate([Failed, Failed]), BatchStatus::Failed);
    }

    #[test]
    fn test_aggregate_mixed_terminal_is_partial() {
        assert_eq!(
            BatchStatus::aggregate([Completed, Failed, Completed]),
            BatchStatus::Partial
        );
        assert_eq!(
            BatchStatus::aggregate([Completed, Cancelled]),
            BatchStatus::Partial
        );
    }

    #[test]
    fn test_aggregate_unfinished_is_in_progress() {
        assert_eq!(
            BatchStatus::aggregate([Completed, RoundInProgress]),
            BatchStatus::InProgress
        );
        assert_eq!(
            BatchStatus::aggregate([Failed, Pending]),
            BatchStatus::InProgress
        );
    }

    #[test]
    fn test_aggregate_nothing_started() {
        assert_eq!(BatchStatus::aggregate([Pending, Pending]), BatchStatus::Pending);
        assert_eq!(BatchStatus::aggregate([]), BatchStatus::Pending);
    }
}
