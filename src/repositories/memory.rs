//! In-process [`Store`] backed by hash maps behind a tokio `RwLock`.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::Store;
use crate::error::AppError;
use crate::models::{BatchSimulation, Entity, EntityType, Simulation};

/// Records keyed by id, each stamped with an insertion sequence for listing.
struct Table<T> {
    rows: HashMap<String, (u64, T)>,
}

impl<T: Clone> Table<T> {
    fn new() -> Self {
        Self {
            rows: HashMap::new(),
        }
    }

    fn get(&self, id: &str) -> Option<T> {
        self.rows.get(id).map(|(_, row)| row.clone())
    }

    fn upsert(&mut self, id: String, row: T, seq: u64) {
        match self.rows.get_mut(&id) {
            Some(slot) => slot.1 = row,
            None => {
                self.rows.insert(id, (seq, row));
            }
        }
    }

    /// Replaces an existing row, returning false when the id is unknown.
    fn replace(&mut self, id: &str, row: T) -> bool {
        match self.rows.get_mut(id) {
            Some(slot) => {
                slot.1 = row;
                true
            }
            None => false,
        }
    }

    fn remove(&mut self, id: &str) -> bool {
        self.rows.remove(id).is_some()
    }

    fn ordered<F: Fn(&T) -> bool>(&self, keep: F) -> Vec<T> {
        let mut rows: Vec<&(u64, T)> = self.rows.values().filter(|(_, r)| keep(r)).collect();
        rows.sort_by_key(|(seq, _)| *seq);
        rows.into_iter().map(|(_, r)| r.clone()).collect()
    }
}

struct Tables {
    seq: u64,
    entity_types: Table<EntityType>,
    entities: Table<Entity>,
    simulations: Table<Simulation>,
    batches: Table<BatchSimulation>,
}

impl Tables {
    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }
}

pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            tables: RwLock::new(Tables {
                seq: 0,
                entity_types: Table::new(),
                entities: Table::new(),
                simulations: Table::new(),
                batches: Table::new(),
            }),
        }
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_entity_type(&self, entity_type: EntityType) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let seq = tables.next_seq();
        tables
            .entity_types
            .upsert(entity_type.id.clone(), entity_type, seq);
        Ok(())
    }

    async fn update_entity_type(&self, entity_type: EntityType) -> Result<(), AppError> {
        let id = entity_type.id.clone();
        let mut tables = self.tables.write().await;
        if tables.entity_types.replace(&id, entity_type) {
            Ok(())
        } else {
            Err(AppError::EntityTypeNotFound(id))
        }
    }

    async fn get_entity_type(&self, id: &str) -> Result<Option<EntityType>, AppError> {
        Ok(self.tables.read().await.entity_types.get(id))
    }

    async fn list_entity_types(&self) -> Result<Vec<EntityType>, AppError> {
        Ok(self.tables.read().await.entity_types.ordered(|_| true))
    }

    async fn delete_entity_type(&self, id: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        if !tables.entity_types.remove(id) {
            return Ok(false);
        }
        tables.entities.rows.retain(|_, (_, e)| e.entity_type_id != id);
        Ok(true)
    }

    async fn insert_entities(&self, entities: Vec<Entity>) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        for entity in entities {
            let seq = tables.next_seq();
            tables.entities.upsert(entity.id.clone(), entity, seq);
        }
        Ok(())
    }

    async fn update_entity(&self, entity: Entity) -> Result<(), AppError> {
        let id = entity.id.clone();
        let mut tables = self.tables.write().await;
        if tables.entities.replace(&id, entity) {
            Ok(())
        } else {
            Err(AppError::EntityNotFound(id))
        }
    }

    async fn get_entity(&self, id: &str) -> Result<Option<Entity>, AppError> {
        Ok(self.tables.read().await.entities.get(id))
    }

    async fn list_entities(&self, entity_type_id: &str) -> Result<Vec<Entity>, AppError> {
        Ok(self
            .tables
            .read()
            .await
            .entities
            .ordered(|e| e.entity_type_id == entity_type_id))
    }

    async fn delete_entity(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.tables.write().await.entities.remove(id))
    }

    async fn delete_entities_by_type(&self, entity_type_id: &str) -> Result<usize, AppError> {
        let mut tables = self.tables.write().await;
        let before = tables.entities.rows.len();
        tables
            .entities
            .rows
            .retain(|_, (_, e)| e.entity_type_id != entity_type_id);
        Ok(before - tables.entities.rows.len())
    }

    async fn save_simulation(&self, simulation: &Simulation) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let seq = tables.next_seq();
        tables
            .simulations
            .upsert(simulation.id.clone(), simulation.clone(), seq);
        Ok(())
    }

    async fn get_simulation(&self, id: &str) -> Result<Option<Simulation>, AppError> {
        Ok(self.tables.read().await.simulations.get(id))
    }

    async fn delete_simulation(&self, id: &str) -> Result<bool, AppError> {
        Ok(self.tables.write().await.simulations.remove(id))
    }

    async fn save_batch(&self, batch: &BatchSimulation) -> Result<(), AppError> {
        let mut tables = self.tables.write().await;
        let seq = tables.next_seq();
        tables.batches.upsert(batch.id.clone(), batch.clone(), seq);
        Ok(())
    }

    async fn get_batch(&self, id: &str) -> Result<Option<BatchSimulation>, AppError> {
        Ok(self.tables.read().await.batches.get(id))
    }

    async fn delete_batch(&self, id: &str) -> Result<bool, AppError> {
        let mut tables = self.tables.write().await;
        let Some(batch) = tables.batches.get(id) else {
            return Ok(false);
        };
        tables.batches.remove(id);
        for simulation_id in &batch.simulation_ids {
            tables.simulations.remove(simulation_id);
        }
        // Components whose ids were not yet recorded on the batch.
        tables
            .simulations
            .rows
            .retain(|_, (_, s)| s.metadata.batch_id.as_deref() != Some(id));
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Trait, TraitValue};

    fn entity_type(name: &str) -> EntityType {
        EntityType::from_draft(crate::models::EntityTypeDraft {
            name: name.into(),
            description: String::new(),
            dimensions: vec![],
        })
    }

    #[tokio::test]
    async fn test_entities_list_in_insertion_order() {
        let store = MemoryStore::new();
        let ty = entity_type("person");
        store.insert_entity_type(ty.clone()).await.unwrap();

        let entities: Vec<Entity> = (0..5)
            .map(|i| {
                Entity::new(
                    &ty.id,
                    vec![Trait::new("n", TraitValue::Int(i))],
                    String::new(),
                )
            })
            .collect();
        let ids: Vec<String> = entities.iter().map(|e| e.id.clone()).collect();
        store.insert_entities(entities).await.unwrap();

        let listed: Vec<String> = store
            .list_entities(&ty.id)
            .await
            .unwrap()
            .into_iter()
            .map(|e| e.id)
            .collect();
        assert_eq!(listed, ids);
    }

    #[tokio::test]
    async fn test_delete_entity_type_cascades() {
        let store = MemoryStore::new();
        let keep = entity_type("keep");
        let drop = entity_type("drop");
        store.insert_entity_type(keep.clone()).await.unwrap();
        store.insert_entity_type(drop.clone()).await.unwrap();
        store
            .insert_entities(vec![
                Entity::new(&keep.id, vec![], String::new()),
                Entity::new(&drop.id, vec![], String::new()),
                Entity::new(&drop.id, vec![], String::new()),
            ])
            .await
            .unwrap();

        assert!(store.delete_entity_type(&drop.id).await.unwrap());
        assert!(store.list_entities(&drop.id).await.unwrap().is_empty());
        assert_eq!(store.list_entities(&keep.id).await.unwrap().len(), 1);
        assert!(!store.delete_entity_type(&drop.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_update_missing_records_fails() {
        let store = MemoryStore::new();
        let err = store
            .update_entity_type(entity_type("ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityTypeNotFound(_)));

        let err = store
            .update_entity(Entity::new("t", vec![], String::new()))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::EntityNotFound(_)));
    }
}
