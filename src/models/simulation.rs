//! Simulation specs, materialized runs and their round history.
//!
//! A simulation's history is a list of segments: the initial run is segment 0
//! and every continuation appends one more. Rounds are keyed by
//! `(segment, round)` so that recording the same round twice is a no-op.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::generate_ulid;
use crate::error::AppError;

/// What to simulate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationSpec {
    /// Participants; order determines turn-taking.
    pub entity_ids: Vec<String>,
    /// Fixed for the whole lineage once the first round has run.
    pub context: String,
    pub interaction_type: String,
    pub language: String,
    /// Dialogue turns requested per round.
    pub n_turns: u32,
    /// Sequential collaborator calls per run.
    pub simulation_rounds: u32,
}

impl SimulationSpec {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.entity_ids.is_empty() {
            return Err(AppError::Validation(
                "a simulation needs at least one entity".to_string(),
            ));
        }
        validate_counts(self.n_turns, self.simulation_rounds)
    }
}

pub(crate) fn validate_counts(n_turns: u32, simulation_rounds: u32) -> Result<(), AppError> {
    if n_turns == 0 {
        return Err(AppError::Validation("n_turns must be at least 1".to_string()));
    }
    if simulation_rounds == 0 {
        return Err(AppError::Validation(
            "simulation_rounds must be at least 1".to_string(),
        ));
    }
    Ok(())
}

/// Run state of a simulation (tracked per segment; the simulation reports its latest).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    Pending,
    RoundInProgress,
    Completed,
    Failed,
    /// Stopped between rounds by a cancellation request.
    Cancelled,
}

impl SimulationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SimulationStatus::Completed | SimulationStatus::Failed | SimulationStatus::Cancelled
        )
    }
}

/// Parameters of one round sequence: the initial run or a continuation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentPlan {
    pub n_turns: u32,
    pub simulation_rounds: u32,
    pub interaction_type: String,
    pub language: String,
}

impl SegmentPlan {
    pub fn from_spec(spec: &SimulationSpec) -> Self {
        Self {
            n_turns: spec.n_turns,
            simulation_rounds: spec.simulation_rounds,
            interaction_type: spec.interaction_type.clone(),
            language: spec.language.clone(),
        }
    }

    /// The spec as seen by the collaborator while this segment runs.
    pub fn apply(&self, spec: &SimulationSpec) -> SimulationSpec {
        SimulationSpec {
            entity_ids: spec.entity_ids.clone(),
            context: spec.context.clone(),
            interaction_type: self.interaction_type.clone(),
            language: self.language.clone(),
            n_turns: self.n_turns,
            simulation_rounds: self.simulation_rounds,
        }
    }
}

/// One executed (or executing) round sequence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub index: u32,
    #[serde(flatten)]
    pub plan: SegmentPlan,
    pub status: SimulationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub started_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finished_at: Option<DateTime<Utc>>,
}

/// Output of one successful collaborator call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub segment: u32,
    /// 1-based within its segment.
    pub round: u32,
    /// Turn number of the first turn in this round (1-based across the lineage).
    pub first_turn: u64,
    pub turns: u32,
    pub text: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_id: Option<String>,
}

/// A materialized simulation run and all its continuations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Simulation {
    /// Unique identifier (ULID).
    pub id: String,
    pub spec: SimulationSpec,
    /// Accumulated transcript: every recorded round's text, in order.
    pub content: String,
    /// Running total of turns across the lineage.
    pub final_turn_number: u64,
    pub status: SimulationStatus,
    #[serde(default)]
    pub segments: Vec<Segment>,
    #[serde(default)]
    pub rounds: Vec<RoundRecord>,
    #[serde(default)]
    pub metadata: SimulationMetadata,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Simulation {
    /// Creates a pending simulation with no segments.
    pub fn new(spec: SimulationSpec, batch_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: generate_ulid(),
            spec,
            content: String::new(),
            final_turn_number: 0,
            status: SimulationStatus::Pending,
            segments: Vec::new(),
            rounds: Vec::new(),
            metadata: SimulationMetadata { batch_id },
            created_at: now,
            updated_at: now,
        }
    }

    pub fn current_segment(&self) -> Option<&Segment> {
        self.segments.last()
    }

    /// Opens a new segment and returns its index.
    pub fn begin_segment(&mut self, plan: SegmentPlan) -> u32 {
        let index = self.segments.len() as u32;
        self.segments.push(Segment {
            index,
            plan,
            status: SimulationStatus::RoundInProgress,
            error: None,
            started_at: Utc::now(),
            finished_at: None,
        });
        self.set_status(SimulationStatus::RoundInProgress);
        index
    }

    /// Reopens the latest segment for another attempt at its missing rounds.
    pub fn reopen_segment(&mut self) -> Option<u32> {
        let segment = self.segments.last_mut()?;
        segment.status = SimulationStatus::RoundInProgress;
        segment.error = None;
        segment.finished_at = None;
        let index = segment.index;
        self.set_status(SimulationStatus::RoundInProgress);
        Some(index)
    }

    /// Closes the latest segment with a terminal status.
    pub fn finish_segment(&mut self, status: SimulationStatus, error: Option<String>) {
        if let Some(segment) = self.segments.last_mut() {
            segment.status = status;
            segment.error = error;
            segment.finished_at = Some(Utc::now());
        }
        self.set_status(status);
    }

    pub fn has_round(&self, segment: u32, round: u32) -> bool {
        self.rounds
            .iter()
            .any(|r| r.segment == segment && r.round == round)
    }

    /// Appends a round's output unless that round is already recorded.
    ///
    /// Returns `false` for a duplicate, leaving content and turn count untouched.
    pub fn record_round(&mut self, segment: u32, round: u32, text: String, turns: u32) -> bool {
        if self.has_round(segment, round) {
            return false;
        }
        let first_turn = self.final_turn_number + 1;
        self.content.push_str(&text);
        self.final_turn_number += u64::from(turns);
        self.rounds.push(RoundRecord {
            segment,
            round,
            first_turn,
            turns,
            text,
            recorded_at: Utc::now(),
        });
        self.updated_at = Utc::now();
        true
    }

    pub fn rounds_in_segment(&self, segment: u32) -> usize {
        self.rounds.iter().filter(|r| r.segment == segment).count()
    }

    fn set_status(&mut self, status: SimulationStatus) {
        self.status = status;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> SimulationSpec {
        SimulationSpec {
            entity_ids: vec!["a".into(), "b".into()],
            context: "a dinner party".into(),
            interaction_type: "conversation".into(),
            language: "en".into(),
            n_turns: 4,
            simulation_rounds: 2,
        }
    }

    #[test]
    fn test_spec_validation() {
        assert!(spec().validate().is_ok());

        let mut no_entities = spec();
        no_entities.entity_ids.clear();
        assert!(no_entities.validate().is_err());

        let mut no_turns = spec();
        no_turns.n_turns = 0;
        assert!(no_turns.validate().is_err());
    }

    #[test]
    fn test_record_round_is_idempotent() {
        let mut sim = Simulation::new(spec(), None);
        let seg = sim.begin_segment(SegmentPlan::from_spec(&sim.spec));

        assert!(sim.record_round(seg, 1, "A: hi\nB: hello\n".into(), 2));
        assert!(!sim.record_round(seg, 1, "A: hi\nB: hello\n".into(), 2));

        assert_eq!(sim.final_turn_number, 2);
        assert_eq!(sim.content, "A: hi\nB: hello\n");
        assert_eq!(sim.rounds.len(), 1);
    }

    #[test]
    fn test_turn_numbering_spans_segments() {
        let mut sim = Simulation::new(spec(), None);
        let first = sim.begin_segment(SegmentPlan::from_spec(&sim.spec));
        sim.record_round(first, 1, "one ".into(), 3);
        sim.finish_segment(SimulationStatus::Completed, None);

        let second = sim.begin_segment(SegmentPlan::from_spec(&sim.spec));
        sim.record_round(second, 1, "two".into(), 2);

        assert_eq!(second, 1);
        assert_eq!(sim.rounds[1].first_turn, 4);
        assert_eq!(sim.final_turn_number, 5);
        assert_eq!(sim.content, "one two");
        assert_eq!(sim.status, SimulationStatus::RoundInProgress);
    }
}
