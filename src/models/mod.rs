//! Domain models for entity types, entities and simulations.

mod batch;
mod dimension;
mod entity;
mod simulation;

pub use batch::{BatchSimulation, BatchStatus};
pub use dimension::{
    BooleanConstraints, CategoricalConstraints, Condition, Constraints, Dependency,
    DependencyEffect, Dimension, DimensionKind, Distribution, NumericConstraints, SkewDirection,
};
pub use entity::{generate_ulid, Entity, EntityType, EntityTypeDraft, Trait, TraitValue};
pub(crate) use simulation::validate_counts;
pub use simulation::{
    RoundRecord, Segment, SegmentPlan, Simulation, SimulationMetadata, SimulationSpec,
    SimulationStatus,
};
