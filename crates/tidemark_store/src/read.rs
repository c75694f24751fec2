//! Read operations.

use crate::policy::{plan_read, ReadPlan, ReadPolicy};
use crate::store::DataStore;
use serde_json::Value;
use tidemark_core::{Entity, StoreError, StoreResult};
use tidemark_filter::Query;
use tracing::debug;

/// Where a read result came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadSource {
    /// Served from the local cache.
    Cache,
    /// Served from the network.
    Network,
}

/// The outcome of one read operation.
#[derive(Debug)]
pub struct ReadResult<T> {
    /// The returned records. For a delta fetch this is the changed set,
    /// not the full post-reconcile view.
    pub entities: Vec<T>,
    /// Where the records came from.
    pub source: ReadSource,
    /// True when a delta fetch satisfied the read.
    pub delta_applied: bool,
}

impl<T> ReadResult<T> {
    /// Number of returned records.
    pub fn total(&self) -> usize {
        self.entities.len()
    }

    pub(crate) fn cache(entities: Vec<T>) -> Self {
        Self {
            entities,
            source: ReadSource::Cache,
            delta_applied: false,
        }
    }

    pub(crate) fn network(entities: Vec<T>, delta_applied: bool) -> Self {
        Self {
            entities,
            source: ReadSource::Network,
            delta_applied,
        }
    }
}

impl<T: Entity> DataStore<T> {
    /// Finds all records under the given read policy.
    pub async fn find(&self, policy: ReadPolicy) -> StoreResult<ReadResult<T>> {
        self.find_with_query(&Query::new(), policy).await
    }

    /// Finds records matching a query under the given read policy.
    pub async fn find_with_query(
        &self,
        query: &Query,
        policy: ReadPolicy,
    ) -> StoreResult<ReadResult<T>> {
        self.session.ensure_active()?;
        self.check_cancelled()?;

        match plan_read(policy, self.cache.is_empty()?) {
            ReadPlan::Cache => Ok(ReadResult::cache(self.cache.find_with_query(query)?)),
            ReadPlan::Network => self.fetch_from_network(query).await,
            ReadPlan::NetworkWithCacheFallback => match self.fetch_from_network(query).await {
                Ok(result) => Ok(result),
                Err(StoreError::Network(err)) => {
                    debug!(
                        collection = %self.collection,
                        error = %err,
                        "network read failed, serving cached data"
                    );
                    Ok(ReadResult::cache(self.cache.find_with_query(query)?))
                }
                Err(other) => Err(other),
            },
        }
    }

    /// Finds one record by ID under the given read policy.
    ///
    /// A cache miss under a cache-serving plan fails with
    /// [`StoreError::EntityNotFound`]; a backend miss propagates the
    /// backend's not-found error.
    pub async fn find_by_id(&self, entity_id: &str, policy: ReadPolicy) -> StoreResult<T> {
        self.session.ensure_active()?;
        self.check_cancelled()?;

        let cached = |store: &Self| -> StoreResult<T> {
            store
                .cache
                .get(entity_id)?
                .ok_or_else(|| StoreError::entity_not_found(entity_id))
        };

        match policy {
            ReadPolicy::ForceLocal => cached(self),
            ReadPolicy::ForceNetwork => self.fetch_one(entity_id).await,
            ReadPolicy::Both => match self.cache.get(entity_id)? {
                Some(entity) => Ok(entity),
                None => self.fetch_one(entity_id).await,
            },
            ReadPolicy::NetworkOtherwiseLocal => match self.fetch_one(entity_id).await {
                Ok(entity) => Ok(entity),
                Err(StoreError::Network(_)) => cached(self),
                Err(other) => Err(other),
            },
        }
    }

    /// Counts records under the given read policy.
    pub async fn count(&self, query: &Query, policy: ReadPolicy) -> StoreResult<u64> {
        self.session.ensure_active()?;
        self.check_cancelled()?;

        let local = |store: &Self| -> StoreResult<u64> {
            if query.is_unfiltered() {
                store.cache.count()
            } else {
                Ok(store.cache.find_with_query(query)?.len() as u64)
            }
        };

        match plan_read(policy, self.cache.is_empty()?) {
            ReadPlan::Cache => local(self),
            ReadPlan::Network => {
                let filter = self.translator.translate(query)?;
                Ok(self.network.count(&self.collection, &filter).await?)
            }
            ReadPlan::NetworkWithCacheFallback => {
                let filter = self.translator.translate(query)?;
                match self.network.count(&self.collection, &filter).await {
                    Ok(count) => Ok(count),
                    Err(_) => local(self),
                }
            }
        }
    }

    /// Fetches from the network, delegating to delta reconciliation
    /// when enabled, and refreshes the cache with the result.
    pub(crate) async fn fetch_from_network(&self, query: &Query) -> StoreResult<ReadResult<T>> {
        // Translation happens before any network call so unsupported
        // filter shapes fail fast.
        let filter = self.translator.translate(query)?;
        self.check_cancelled()?;

        if self.config.delta_set_enabled {
            // A ledger entry without cached data cannot converge from a
            // delta alone, so an empty cache forces the full path.
            let force_full = self.cache.is_empty()?;
            let (entities, delta_applied) = self.delta_fetch(query, &filter, force_full).await?;
            return Ok(ReadResult::network(entities, delta_applied));
        }

        let entities = self.plain_fetch(query, &filter).await?;
        Ok(ReadResult::network(entities, false))
    }

    /// Plain fetch-and-replace: fetch matching records, drop the stale
    /// cached subset, upsert the fresh one.
    ///
    /// A paged query (skip/limit) covers only a slice of the matching
    /// subset, so it upserts without clearing; sibling pages stay
    /// cached.
    pub(crate) async fn plain_fetch(&self, query: &Query, filter: &str) -> StoreResult<Vec<T>> {
        let paged = query.skip.is_some() || query.limit.is_some();
        let documents = if paged {
            self.network
                .find_page(
                    &self.collection,
                    filter,
                    query.skip.unwrap_or(0),
                    query.limit.unwrap_or(u64::MAX),
                )
                .await?
        } else {
            self.network.find_by_filter(&self.collection, filter).await?
        };

        let entities = decode_documents::<T>(documents)?;
        if !paged {
            self.cache.clear(query.filter.as_ref())?;
        }
        self.cache.refresh(entities.clone())?;
        Ok(entities)
    }

    async fn fetch_one(&self, entity_id: &str) -> StoreResult<T> {
        let document = self.network.find_by_id(&self.collection, entity_id).await?;
        let entity = T::from_document(&document)?;
        self.cache.refresh(vec![entity.clone()])?;
        Ok(entity)
    }
}

/// Decodes backend documents into typed entities.
pub(crate) fn decode_documents<T: Entity>(documents: Vec<Value>) -> StoreResult<Vec<T>> {
    documents.iter().map(T::from_document).collect()
}
