//! Write and delete operations.

use crate::policy::{plan_write, EnqueueRule, WritePolicy};
use crate::store::DataStore;
use serde_json::Value;
use tidemark_core::{
    generate_temp_id, is_temp_id, Entity, PendingWriteAction, StoreError, StoreResult,
    MULTI_INSERT_MIN_API_VERSION,
};
use tidemark_filter::{FilterError, Query};
use tracing::debug;

/// A per-index failure inside a batch save result.
#[derive(Debug)]
pub struct IndexedError {
    /// Position of the failed entity in the submitted batch.
    pub index: usize,
    /// The error for that entity.
    pub error: StoreError,
}

/// The outcome of a batch save.
///
/// Partial failures do not raise: `entities` is index-aligned with the
/// submitted batch (`None` where the save failed) and `errors` carries
/// one entry per failed index, leaving retry decisions to the caller.
#[derive(Debug)]
pub struct MultiInsertResult<T> {
    /// Saved entities, `None` at failed indices.
    pub entities: Vec<Option<T>>,
    /// Per-index failures.
    pub errors: Vec<IndexedError>,
}

impl<T> MultiInsertResult<T> {
    /// Returns true if every entity was saved.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }

    /// Number of entities saved successfully.
    pub fn saved_count(&self) -> usize {
        self.entities.iter().filter(|slot| slot.is_some()).count()
    }
}

impl<T: Entity> DataStore<T> {
    /// Saves one entity under the given write policy.
    ///
    /// An entity without an ID (or with a temporary one) is created;
    /// one with a server-assigned ID is updated. Cache-first policies
    /// assign a temporary ID before the cache write so the record is
    /// locally addressable, reconciling it to the server ID after a
    /// successful create.
    pub async fn save(&self, entity: T, policy: WritePolicy) -> StoreResult<T> {
        self.session.ensure_active()?;
        self.check_cancelled()?;

        let plan = plan_write(policy);
        let is_create = !entity.has_entity_id() || entity.has_temp_id();

        let mut local = entity;
        if plan.mutate_cache_first {
            if !local.has_entity_id() {
                local.set_entity_id(generate_temp_id());
            }
            local = if is_create {
                self.cache.save(local)?
            } else {
                self.cache.update(local)?
            };
        }

        if !plan.call_network {
            self.enqueue_save(&local, is_create)?;
            return Ok(local);
        }

        match self.transmit_save(&local, is_create).await {
            Ok(server) => {
                if plan.mutate_cache_first {
                    self.reconcile_saved(&local, &server)?;
                } else if policy == WritePolicy::NetworkThenLocal {
                    self.cache.refresh(vec![server.clone()])?;
                }
                Ok(server)
            }
            Err(StoreError::Network(err)) if plan.enqueue == EnqueueRule::OnNetworkFailure => {
                // The queue entry is the recovery path; the caller is
                // still told the transmission failed.
                self.enqueue_save(&local, is_create)?;
                debug!(
                    collection = %self.collection,
                    entity_id = ?local.entity_id(),
                    "save deferred to sync queue after network failure"
                );
                Err(StoreError::Network(err))
            }
            Err(other) => Err(other),
        }
    }

    /// Saves a batch of new entities under the given write policy.
    ///
    /// The batch must be non-empty and contain only new entities
    /// (no server-assigned IDs); save existing entities individually.
    pub async fn save_batch(
        &self,
        entities: Vec<T>,
        policy: WritePolicy,
    ) -> StoreResult<MultiInsertResult<T>> {
        self.session.ensure_active()?;
        self.check_cancelled()?;

        if entities.is_empty() {
            return Err(StoreError::EmptyBatch);
        }
        if entities
            .iter()
            .any(|e| e.has_entity_id() && !e.has_temp_id())
        {
            return Err(StoreError::invalid_operation(
                "save_batch accepts new entities only; save existing entities individually",
            ));
        }

        let plan = plan_write(policy);
        if plan.call_network {
            self.session.ensure_api_version(MULTI_INSERT_MIN_API_VERSION)?;
        }

        let mut locals = entities;
        if plan.mutate_cache_first {
            for entity in &mut locals {
                if !entity.has_entity_id() {
                    entity.set_entity_id(generate_temp_id());
                }
                *entity = self.cache.save(entity.clone())?;
            }
        }

        if !plan.call_network {
            for entity in &locals {
                self.enqueue_save(entity, true)?;
            }
            return Ok(MultiInsertResult {
                entities: locals.into_iter().map(Some).collect(),
                errors: Vec::new(),
            });
        }

        let documents: StoreResult<Vec<Value>> =
            locals.iter().map(|e| self.create_document(e)).collect();

        let response = match self.network.create_batch(&self.collection, documents?).await {
            Ok(response) => response,
            Err(err) => {
                if plan.enqueue == EnqueueRule::OnNetworkFailure {
                    for entity in &locals {
                        self.enqueue_save(entity, true)?;
                    }
                }
                return Err(err.into());
            }
        };

        let mut saved = Vec::with_capacity(response.entities.len());
        for (index, slot) in response.entities.into_iter().enumerate() {
            match slot {
                Some(document) => {
                    let server = T::from_document(&document)?;
                    match policy {
                        WritePolicy::ForceNetwork => {}
                        WritePolicy::NetworkThenLocal => {
                            self.cache.refresh(vec![server.clone()])?;
                        }
                        _ => self.reconcile_saved(&locals[index], &server)?,
                    }
                    saved.push(Some(server));
                }
                None => saved.push(None),
            }
        }

        let mut errors = Vec::with_capacity(response.errors.len());
        for failure in response.errors {
            if plan.enqueue == EnqueueRule::OnNetworkFailure {
                self.enqueue_save(&locals[failure.index], true)?;
            }
            errors.push(IndexedError {
                index: failure.index,
                error: failure.error.into(),
            });
        }

        Ok(MultiInsertResult {
            entities: saved,
            errors,
        })
    }

    /// Removes one entity by ID under the given write policy.
    ///
    /// Returns the number of entities removed. Deleting a never-synced
    /// record (temporary ID) under a cache-first policy drops its queued
    /// create instead of enqueueing a delete the backend could not
    /// honor.
    pub async fn remove_by_id(&self, entity_id: &str, policy: WritePolicy) -> StoreResult<u64> {
        self.session.ensure_active()?;
        self.check_cancelled()?;

        match policy {
            WritePolicy::ForceNetwork => Ok(self
                .network
                .delete_by_id(&self.collection, entity_id)
                .await?
                .count),
            WritePolicy::ForceLocal => {
                let removed = self.cache.delete_by_id(entity_id)?;
                self.enqueue_delete(entity_id)?;
                Ok(removed)
            }
            WritePolicy::LocalThenNetwork => {
                let removed = self.cache.delete_by_id(entity_id)?;
                if is_temp_id(entity_id) {
                    self.queue.remove_for_entity(&self.collection, entity_id);
                    return Ok(removed);
                }
                match self.network.delete_by_id(&self.collection, entity_id).await {
                    Ok(response) => Ok(response.count),
                    Err(err) => {
                        self.enqueue_delete(entity_id)?;
                        Err(err.into())
                    }
                }
            }
            WritePolicy::NetworkThenLocal => {
                let response = self
                    .network
                    .delete_by_id(&self.collection, entity_id)
                    .await?;
                self.cache.delete_by_id(entity_id)?;
                Ok(response.count)
            }
        }
    }

    /// Removes every entity matching a query under the given write
    /// policy.
    ///
    /// The query must carry a filter with at least one evaluable
    /// clause; otherwise the call fails before any cache or network
    /// mutation. Returns the number of entities removed.
    pub async fn remove_with_query(
        &self,
        query: &Query,
        policy: WritePolicy,
    ) -> StoreResult<u64> {
        self.session.ensure_active()?;
        self.check_cancelled()?;

        let filter = query
            .filter
            .as_ref()
            .filter(|f| f.has_evaluable_clause())
            .ok_or(FilterError::WhereClauseAbsent)?;
        let filter_string = self.translator.translate(query)?;

        match policy {
            WritePolicy::ForceNetwork => Ok(self
                .network
                .delete_by_filter(&self.collection, &filter_string)
                .await?
                .count),
            WritePolicy::ForceLocal => {
                let (removed, ids) = self.cache.delete_by_query(filter)?;
                for id in &ids {
                    self.enqueue_delete(id)?;
                }
                Ok(removed)
            }
            WritePolicy::LocalThenNetwork => {
                let (_, ids) = self.cache.delete_by_query(filter)?;
                for id in ids.iter().filter(|id| is_temp_id(id)) {
                    self.queue.remove_for_entity(&self.collection, id);
                }
                match self
                    .network
                    .delete_by_filter(&self.collection, &filter_string)
                    .await
                {
                    Ok(response) => Ok(response.count),
                    Err(err) => {
                        for id in ids.iter().filter(|id| !is_temp_id(id)) {
                            self.queue
                                .enqueue(PendingWriteAction::delete(&self.collection, id))?;
                        }
                        Err(err.into())
                    }
                }
            }
            WritePolicy::NetworkThenLocal => {
                // Network first, cache pruned only after success, like
                // the single-ID path.
                let response = self
                    .network
                    .delete_by_filter(&self.collection, &filter_string)
                    .await?;
                let (_, ids) = self.cache.delete_by_query(filter)?;
                for id in ids.iter().filter(|id| is_temp_id(id)) {
                    self.queue.remove_for_entity(&self.collection, id);
                }
                Ok(response.count)
            }
        }
    }

    /// Serializes an entity for a create call, dropping a temporary ID
    /// so the backend assigns the real one.
    pub(crate) fn create_document(&self, entity: &T) -> StoreResult<Value> {
        let mut document = entity.to_document()?;
        if let Value::Object(map) = &mut document {
            let is_temp = map
                .get("_id")
                .and_then(Value::as_str)
                .map(is_temp_id)
                .unwrap_or(false);
            if is_temp {
                map.remove("_id");
            }
        }
        Ok(document)
    }

    async fn transmit_save(&self, entity: &T, is_create: bool) -> StoreResult<T> {
        if is_create {
            let document = self.create_document(entity)?;
            let stored = self.network.create(&self.collection, document).await?;
            T::from_document(&stored)
        } else {
            let entity_id = entity.entity_id().ok_or_else(|| {
                StoreError::invalid_operation("update requires an entity ID")
            })?;
            let document = entity.to_document()?;
            let stored = self
                .network
                .update(&self.collection, entity_id, document)
                .await?;
            T::from_document(&stored)
        }
    }

    /// Replaces the locally-stored copy with the authoritative server
    /// one, dropping a temporary-ID record when the server assigned a
    /// different ID.
    pub(crate) fn reconcile_saved(&self, local: &T, server: &T) -> StoreResult<()> {
        if let Some(local_id) = local.entity_id() {
            if server.entity_id() != Some(local_id) {
                self.cache.delete_by_id(local_id)?;
                self.queue
                    .remap_entity_id(&self.collection, local_id, server.entity_id().unwrap_or(""));
            }
        }
        self.cache.refresh(vec![server.clone()])?;
        Ok(())
    }

    fn enqueue_save(&self, entity: &T, is_create: bool) -> StoreResult<()> {
        let entity_id = entity
            .entity_id()
            .ok_or_else(|| StoreError::queue("cannot enqueue a write without an entity ID"))?;
        let payload = entity.to_document()?;

        // Only the action that introduced the record is a create; a
        // later save of the same unsynced entity replays as an update,
        // remapped to the server ID once the create goes through.
        let action = if is_create && !self.queue.has_pending(&self.collection, entity_id) {
            PendingWriteAction::create(&self.collection, entity_id, payload)
        } else {
            PendingWriteAction::update(&self.collection, entity_id, payload)
        };
        self.queue.enqueue(action)?;
        Ok(())
    }

    fn enqueue_delete(&self, entity_id: &str) -> StoreResult<()> {
        if is_temp_id(entity_id) {
            // The create never reached the backend; dropping its queued
            // actions is the whole delete.
            self.queue.remove_for_entity(&self.collection, entity_id);
            return Ok(());
        }
        self.queue
            .enqueue(PendingWriteAction::delete(&self.collection, entity_id))?;
        Ok(())
    }
}
