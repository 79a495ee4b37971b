//! Entity type authoring.
//!
//! This is the one place dimensions are normalized: categorical probabilities
//! are filled in and renormalized, constraints are checked, and the
//! dependency graph is verified to be acyclic. The sampler trusts what is
//! stored here.

use chrono::Utc;

use crate::context::{AppStore, Context};
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::{Dimension, EntityType, EntityTypeDraft};
use crate::sampling::normalize_dimensions;

/// Partial update of an entity type. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct UpdateEntityTypeInput {
    pub name: Option<String>,
    pub description: Option<String>,
    /// Replaces the whole dimension list.
    pub dimensions: Option<Vec<Dimension>>,
}

/// Service for creating and editing entity types.
#[derive(FromContext, Clone)]
pub struct EntityTypeService {
    store: AppStore,
}

impl EntityTypeService {
    /// Normalizes and stores a new entity type.
    pub async fn create(&self, draft: EntityTypeDraft) -> Result<EntityType, AppError> {
        let name = validate_name(&draft.name)?;
        let dimensions = normalize_dimensions(draft.dimensions)?;

        let entity_type = EntityType::from_draft(EntityTypeDraft {
            name,
            description: draft.description,
            dimensions,
        });
        self.store.insert_entity_type(entity_type.clone()).await?;

        tracing::info!(
            id = %entity_type.id,
            dimensions = entity_type.dimensions.len(),
            "created entity type '{}'",
            entity_type.name
        );
        Ok(entity_type)
    }

    /// Edits an entity type in place. Entities already sampled keep their traits.
    pub async fn update(
        &self,
        id: &str,
        input: UpdateEntityTypeInput,
    ) -> Result<EntityType, AppError> {
        let mut entity_type = self.get(id).await?;

        if let Some(name) = input.name {
            entity_type.name = validate_name(&name)?;
        }
        if let Some(description) = input.description {
            entity_type.description = description;
        }
        if let Some(dimensions) = input.dimensions {
            entity_type.dimensions = normalize_dimensions(dimensions)?;
        }
        entity_type.updated_at = Utc::now();

        self.store.update_entity_type(entity_type.clone()).await?;
        tracing::info!(id = %entity_type.id, "updated entity type");
        Ok(entity_type)
    }

    pub async fn get(&self, id: &str) -> Result<EntityType, AppError> {
        self.store
            .get_entity_type(id)
            .await?
            .ok_or_else(|| AppError::EntityTypeNotFound(id.to_string()))
    }

    pub async fn list(&self) -> Result<Vec<EntityType>, AppError> {
        self.store.list_entity_types().await
    }

    /// Deletes the type together with every entity sampled from it.
    pub async fn delete(&self, id: &str) -> Result<(), AppError> {
        if !self.store.delete_entity_type(id).await? {
            return Err(AppError::EntityTypeNotFound(id.to_string()));
        }
        tracing::info!(id, "deleted entity type");
        Ok(())
    }
}

fn validate_name(name: &str) -> Result<String, AppError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(AppError::Validation(
            "entity type name cannot be empty".to_string(),
        ));
    }
    Ok(name.to_string())
}
