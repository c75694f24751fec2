//! In-memory cache implementation.

use crate::cache::EntityCache;
use crate::entity::{generate_temp_id, Entity};
use crate::error::{StoreError, StoreResult};
use parking_lot::RwLock;
use std::collections::HashMap;
use tidemark_filter::{select, Filter, Query};

/// An in-memory [`EntityCache`].
///
/// Suitable for unit tests, integration tests, and ephemeral stores that
/// don't need persistence. Thread-safe; concurrent readers share the
/// lock, writers exclude each other.
#[derive(Debug, Default)]
pub struct MemoryCache<T> {
    records: RwLock<HashMap<String, T>>,
}

impl<T: Entity> MemoryCache<T> {
    /// Creates an empty cache.
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }

    fn upsert(&self, entity: &T) -> StoreResult<()> {
        let id = entity
            .entity_id()
            .filter(|id| !id.is_empty())
            .ok_or_else(|| StoreError::cache("record has no entity ID"))?
            .to_string();
        self.records.write().insert(id, entity.clone());
        Ok(())
    }

    fn documents(&self) -> StoreResult<Vec<(serde_json::Value, T)>> {
        self.records
            .read()
            .values()
            .map(|entity| Ok((entity.to_document()?, entity.clone())))
            .collect()
    }
}

impl<T: Entity> EntityCache<T> for MemoryCache<T> {
    fn find_all(&self) -> StoreResult<Vec<T>> {
        Ok(self.records.read().values().cloned().collect())
    }

    fn find_by_ids(&self, ids: &[String]) -> StoreResult<Vec<T>> {
        let records = self.records.read();
        Ok(ids.iter().filter_map(|id| records.get(id).cloned()).collect())
    }

    fn find_with_query(&self, query: &Query) -> StoreResult<Vec<T>> {
        Ok(select(self.documents()?, query))
    }

    fn get(&self, entity_id: &str) -> StoreResult<Option<T>> {
        Ok(self.records.read().get(entity_id).cloned())
    }

    fn save(&self, mut entity: T) -> StoreResult<T> {
        if !entity.has_entity_id() {
            entity.set_entity_id(generate_temp_id());
        }
        self.upsert(&entity)?;
        Ok(entity)
    }

    fn update(&self, entity: T) -> StoreResult<T> {
        if !entity.has_entity_id() {
            return Err(StoreError::invalid_operation(
                "update requires an entity ID",
            ));
        }
        self.upsert(&entity)?;
        Ok(entity)
    }

    fn delete_by_id(&self, entity_id: &str) -> StoreResult<u64> {
        Ok(u64::from(self.records.write().remove(entity_id).is_some()))
    }

    fn delete_by_query(&self, filter: &Filter) -> StoreResult<(u64, Vec<String>)> {
        let doomed: Vec<String> = self
            .documents()?
            .into_iter()
            .filter(|(doc, _)| filter.matches(doc))
            .filter_map(|(_, entity)| entity.entity_id().map(str::to_string))
            .collect();

        let mut records = self.records.write();
        for id in &doomed {
            records.remove(id);
        }
        Ok((doomed.len() as u64, doomed))
    }

    fn refresh(&self, entities: Vec<T>) -> StoreResult<Vec<T>> {
        for entity in &entities {
            self.upsert(entity)?;
        }
        Ok(entities)
    }

    fn clear(&self, filter: Option<&Filter>) -> StoreResult<u64> {
        match filter {
            Some(filter) => Ok(self.delete_by_query(filter)?.0),
            None => {
                let mut records = self.records.write();
                let removed = records.len() as u64;
                records.clear();
                Ok(removed)
            }
        }
    }

    fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.records.read().is_empty())
    }

    fn count(&self) -> StoreResult<u64> {
        Ok(self.records.read().len() as u64)
    }

    fn last_modified_of(&self, entity_id: &str) -> StoreResult<Option<String>> {
        Ok(self
            .records
            .read()
            .get(entity_id)
            .and_then(|entity| entity.last_modified().map(str::to_string)))
    }
}
