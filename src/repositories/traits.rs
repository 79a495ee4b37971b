//! Persistence collaborator contract.
//!
//! Each call is atomic for the record it touches; nothing here spans several
//! records transactionally. Cascading deletes are the backend's concern.

use async_trait::async_trait;

use crate::error::AppError;
use crate::models::{BatchSimulation, Entity, EntityType, Simulation};

/// CRUD over the four persisted record kinds.
///
/// Lookups return `Ok(None)` for missing ids; deletes report whether anything
/// was removed. Listing methods return records in insertion order.
#[async_trait]
pub trait Store: Send + Sync {
    // Entity types

    async fn insert_entity_type(&self, entity_type: EntityType) -> Result<(), AppError>;

    /// Replaces an existing entity type. Fails with `EntityTypeNotFound`.
    async fn update_entity_type(&self, entity_type: EntityType) -> Result<(), AppError>;

    async fn get_entity_type(&self, id: &str) -> Result<Option<EntityType>, AppError>;

    async fn list_entity_types(&self) -> Result<Vec<EntityType>, AppError>;

    /// Deletes the type and every entity sampled from it.
    async fn delete_entity_type(&self, id: &str) -> Result<bool, AppError>;

    // Entities

    async fn insert_entities(&self, entities: Vec<Entity>) -> Result<(), AppError>;

    /// Replaces an existing entity. Fails with `EntityNotFound`.
    async fn update_entity(&self, entity: Entity) -> Result<(), AppError>;

    async fn get_entity(&self, id: &str) -> Result<Option<Entity>, AppError>;

    async fn list_entities(&self, entity_type_id: &str) -> Result<Vec<Entity>, AppError>;

    async fn delete_entity(&self, id: &str) -> Result<bool, AppError>;

    /// Returns the number of entities removed.
    async fn delete_entities_by_type(&self, entity_type_id: &str) -> Result<usize, AppError>;

    // Simulations

    /// Inserts or replaces a simulation.
    async fn save_simulation(&self, simulation: &Simulation) -> Result<(), AppError>;

    async fn get_simulation(&self, id: &str) -> Result<Option<Simulation>, AppError>;

    async fn delete_simulation(&self, id: &str) -> Result<bool, AppError>;

    // Batches

    /// Inserts or replaces a batch.
    async fn save_batch(&self, batch: &BatchSimulation) -> Result<(), AppError>;

    async fn get_batch(&self, id: &str) -> Result<Option<BatchSimulation>, AppError>;

    /// Deletes the batch and its component simulations.
    async fn delete_batch(&self, id: &str) -> Result<bool, AppError>;
}
