//! Business logic services for entity generation and simulations.
//!
//! Services orchestrate the store and the LLM collaborators and enforce the
//! domain rules, using the `FromContext` derive macro for dependency injection.

mod batch;
mod cancel;
mod continuation;
mod entity_type;
mod generator;
mod scheduler;

pub use batch::{BatchOrchestrator, BatchRequest};
pub use cancel::{CancelHandle, CancelSignal};
pub use continuation::{ContentRef, ContinuationRequest, ContinuationResolver, ContinuationState};
pub use entity_type::{EntityTypeService, UpdateEntityTypeInput};
pub use generator::{
    EntityGenerator, EntityUpdate, GenerateRequest, GenerationFailure, GenerationReport,
};
pub use scheduler::SimulationScheduler;
