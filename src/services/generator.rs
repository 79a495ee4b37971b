//! Entity generation: sampling traits and asking the writer for text.
//!
//! Generation works on a snapshot of the entity type taken when the call
//! starts, so concurrent edits to the type never mix into one batch. All
//! traits are drawn before any collaborator call; a sampling error aborts the
//! whole call with nothing stored, while a collaborator failure only drops the
//! affected entity into the report's `failed` list.

use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng};
use serde::Serialize;

use crate::config::Config;
use crate::context::{AppStore, AppWriter, Context};
use crate::di::FromContext;
use crate::error::{AppError, CollaboratorError};
use crate::llm::{with_timeout, BackstoryRequest, TextTraitRequest, Variability};
use crate::models::{Entity, EntityType, Trait, TraitValue};
use crate::sampling::{sample_traits, sort_by_declaration, validate_value, SampledTraits};

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub entity_type_id: String,
    pub count: usize,
    pub variability: Variability,
    pub extra_description: Option<String>,
    /// Falls back to `sampling.seed`, then to a fresh random seed.
    pub seed: Option<u64>,
}

/// An entity whose text generation failed.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationFailure {
    /// Position within the request; entity `i` is sampled with `seed + i`.
    pub index: usize,
    pub traits: Vec<Trait>,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct GenerationReport {
    pub generated: Vec<Entity>,
    pub failed: Vec<GenerationFailure>,
    pub seed: u64,
}

/// Replacement fields for a generated entity.
#[derive(Debug, Clone, Default)]
pub struct EntityUpdate {
    /// Traits to overwrite (matched by dimension name) or add.
    pub traits: Option<Vec<Trait>>,
    pub backstory: Option<String>,
}

#[derive(FromContext, Clone)]
pub struct EntityGenerator {
    store: AppStore,
    writer: AppWriter,
    config: Arc<Config>,
}

impl EntityGenerator {
    /// Samples `count` entities of a type and has the writer fill in their text.
    pub async fn generate(&self, request: GenerateRequest) -> Result<GenerationReport, AppError> {
        let entity_type = self
            .store
            .get_entity_type(&request.entity_type_id)
            .await?
            .ok_or_else(|| AppError::EntityTypeNotFound(request.entity_type_id.clone()))?;

        let seed = request
            .seed
            .or(self.config.sampling.seed)
            .unwrap_or_else(|| rand::thread_rng().next_u64());

        let drafts = (0..request.count)
            .map(|i| {
                let mut rng = StdRng::seed_from_u64(seed.wrapping_add(i as u64));
                sample_traits(&entity_type.dimensions, &mut rng)
            })
            .collect::<Result<Vec<_>, _>>()?;

        tracing::info!(
            entity_type = %entity_type.id,
            count = request.count,
            seed,
            "sampled traits, requesting text"
        );

        let entity_type = &entity_type;
        let variability = request.variability;
        let extra = request.extra_description.as_deref();
        let mut outcomes: Vec<(usize, Result<Entity, GenerationFailure>)> =
            stream::iter(drafts.into_iter().enumerate())
                .map(move |(index, sampled)| async move {
                    let outcome = self
                        .write_entity(entity_type, sampled, variability, extra)
                        .await
                        .map_err(|(traits, e)| GenerationFailure {
                            index,
                            traits,
                            error: e.to_string(),
                        });
                    (index, outcome)
                })
                .buffer_unordered(self.config.generation.max_concurrency.max(1))
                .collect()
                .await;
        outcomes.sort_by_key(|(index, _)| *index);

        let mut generated = Vec::new();
        let mut failed = Vec::new();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(entity) => generated.push(entity),
                Err(failure) => {
                    tracing::warn!(index, error = %failure.error, "entity generation failed");
                    failed.push(failure);
                }
            }
        }

        self.store.insert_entities(generated.clone()).await?;
        tracing::info!(
            generated = generated.len(),
            failed = failed.len(),
            "generation finished"
        );

        Ok(GenerationReport {
            generated,
            failed,
            seed,
        })
    }

    /// Fills text traits, then the backstory, for one sampled entity.
    async fn write_entity(
        &self,
        entity_type: &EntityType,
        sampled: SampledTraits,
        variability: Variability,
        extra_description: Option<&str>,
    ) -> Result<Entity, (Vec<Trait>, CollaboratorError)> {
        let timeout = self.config.llm.timeout();
        let mut traits = sampled.traits;

        for name in sampled.pending_text {
            let Some(dimension) = entity_type.dimension(&name) else {
                continue;
            };
            let request = TextTraitRequest {
                entity_type: entity_type.clone(),
                dimension: dimension.clone(),
                siblings: traits.clone(),
                variability,
            };
            match with_timeout(timeout, self.writer.generate_text_trait(&request)).await {
                Ok(text) => traits.push(Trait::new(name, TraitValue::Text(text))),
                Err(e) => return Err((traits, e)),
            }
        }
        sort_by_declaration(&entity_type.dimensions, &mut traits);

        let request = BackstoryRequest {
            entity_type: entity_type.clone(),
            traits,
            extra_description: extra_description.map(str::to_string),
            variability,
        };
        let outcome = with_timeout(timeout, self.writer.generate_backstory(&request)).await;
        match outcome {
            Ok(backstory) => Ok(Entity::new(&entity_type.id, request.traits, backstory)),
            Err(e) => Err((request.traits, e)),
        }
    }

    pub async fn get_entity(&self, id: &str) -> Result<Entity, AppError> {
        self.store
            .get_entity(id)
            .await?
            .ok_or_else(|| AppError::EntityNotFound(id.to_string()))
    }

    pub async fn list_entities(&self, entity_type_id: &str) -> Result<Vec<Entity>, AppError> {
        self.store.list_entities(entity_type_id).await
    }

    /// Overwrites traits and/or the backstory of a stored entity.
    ///
    /// A replaced trait is checked against its dimension when the entity type
    /// still declares it. Names unknown to both the entity and its type are rejected.
    pub async fn update_entity(&self, id: &str, update: EntityUpdate) -> Result<Entity, AppError> {
        let mut entity = self.get_entity(id).await?;

        if let Some(traits) = update.traits {
            let entity_type = self.store.get_entity_type(&entity.entity_type_id).await?;
            for mut replacement in traits {
                let dimension = entity_type
                    .as_ref()
                    .and_then(|t| t.dimension(&replacement.dimension_name));
                if let Some(dimension) = dimension {
                    replacement.value =
                        validate_value(&dimension.name, &dimension.constraints, &replacement.value)?;
                }

                match entity
                    .traits
                    .iter_mut()
                    .find(|t| t.dimension_name == replacement.dimension_name)
                {
                    Some(existing) => *existing = replacement,
                    None if dimension.is_some() => entity.traits.push(replacement),
                    None => {
                        return Err(AppError::Validation(format!(
                            "entity has no trait or dimension named '{}'",
                            replacement.dimension_name
                        )))
                    }
                }
            }
            if let Some(entity_type) = &entity_type {
                sort_by_declaration(&entity_type.dimensions, &mut entity.traits);
            }
        }
        if let Some(backstory) = update.backstory {
            entity.backstory = backstory;
        }
        entity.updated_at = Utc::now();

        self.store.update_entity(entity.clone()).await?;
        Ok(entity)
    }

    pub async fn delete_entity(&self, id: &str) -> Result<(), AppError> {
        if !self.store.delete_entity(id).await? {
            return Err(AppError::EntityNotFound(id.to_string()));
        }
        Ok(())
    }

    /// Deletes every entity of a type and returns how many were removed.
    pub async fn delete_by_type(&self, entity_type_id: &str) -> Result<usize, AppError> {
        let removed = self.store.delete_entities_by_type(entity_type_id).await?;
        tracing::info!(entity_type = entity_type_id, removed, "deleted entities");
        Ok(removed)
    }
}
