//! The per-collection store facade.

use crate::config::StoreConfig;
use crate::policy::StoreMode;
use crate::pull::PullResult;
use crate::push::PushResult;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tidemark_core::{
    Entity, EntityCache, MemoryCache, SessionContext, StoreError, StoreResult, SyncQueue,
};
use tidemark_filter::{FilterTranslator, MongoTranslator, Query};
use tidemark_protocol::NetworkExecutor;
use tracing::debug;

/// Result of a sync cycle: push first, then pull.
#[derive(Debug)]
pub struct SyncSummary {
    /// Outcome of the push phase.
    pub push: PushResult,
    /// Outcome of the pull phase; `None` when the push left pending
    /// actions behind and the pull was skipped.
    pub pull: Option<PullResult>,
}

/// A per-collection store mediating between the local cache and the
/// remote backend.
///
/// Every operation takes a read or write policy that decides the
/// ordering and combination of cache and network work for that call;
/// policies are per-call configuration, never stored state.
///
/// Concurrent read and write operations on the same collection are not
/// serialized against each other; callers issuing both at once may
/// observe interleaved cache states. The policy orderings are the sole
/// consistency mechanism, with the sync queue's eventual replay
/// resolving partial-failure windows.
///
/// Operations are cooperatively cancellable: [`DataStore::cancel`] makes
/// in-flight operations fail with [`StoreError::Cancelled`] at their
/// next I/O boundary.
pub struct DataStore<T: Entity> {
    pub(crate) collection: String,
    pub(crate) mode: StoreMode,
    pub(crate) session: Arc<SessionContext>,
    pub(crate) cache: Arc<dyn EntityCache<T>>,
    pub(crate) queue: Arc<SyncQueue>,
    pub(crate) network: Arc<dyn NetworkExecutor>,
    pub(crate) translator: Arc<dyn FilterTranslator>,
    pub(crate) config: StoreConfig,
    pub(crate) cancelled: AtomicBool,
}

impl<T: Entity> DataStore<T> {
    /// Starts building a store for a collection.
    pub fn builder(
        session: Arc<SessionContext>,
        collection: impl Into<String>,
        mode: StoreMode,
    ) -> DataStoreBuilder<T> {
        DataStoreBuilder::new(session, collection, mode)
    }

    /// Returns the collection name.
    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Returns the store's mode.
    pub fn mode(&self) -> StoreMode {
        self.mode
    }

    /// Returns the number of pending write actions for this collection.
    pub fn pending_sync_count(&self) -> usize {
        self.queue.count(Some(&self.collection))
    }

    /// Requests cooperative cancellation of in-flight operations.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Clears the cancellation flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    pub(crate) fn check_cancelled(&self) -> StoreResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(StoreError::Cancelled)
        } else {
            Ok(())
        }
    }

    pub(crate) fn ensure_sync_mode(&self, operation: &str) -> StoreResult<()> {
        if self.mode.supports_sync() {
            Ok(())
        } else {
            Err(StoreError::invalid_operation(format!(
                "{operation} is not available on a network-only store"
            )))
        }
    }

    /// Runs a full sync cycle: push pending writes, then pull.
    ///
    /// The pull runs only when the push drained the queue completely;
    /// otherwise it is skipped and [`SyncSummary::pull`] is `None`.
    pub async fn sync(&self, query: &Query) -> StoreResult<SyncSummary> {
        self.session.ensure_active()?;
        self.ensure_sync_mode("sync")?;

        let push = self.push().await?;
        if self.pending_sync_count() > 0 {
            debug!(
                collection = %self.collection,
                remaining = self.pending_sync_count(),
                "push left pending actions, skipping pull"
            );
            return Ok(SyncSummary { push, pull: None });
        }

        let pull = self.pull(query).await?;
        Ok(SyncSummary {
            push,
            pull: Some(pull),
        })
    }

    /// Removes cached records, and with them the collection's sync
    /// bookkeeping.
    ///
    /// With a query, only matching records (and their queued actions)
    /// are dropped. Without one, the whole collection's cache, queued
    /// actions, and delta-fetch ledger entries are cleared.
    pub fn clear_cache(&self, query: Option<&Query>) -> StoreResult<u64> {
        self.session.ensure_active()?;
        self.ensure_sync_mode("clear_cache")?;

        match query.and_then(|q| q.filter.as_ref()) {
            Some(filter) => {
                let (removed, ids) = self.cache.delete_by_query(filter)?;
                for id in &ids {
                    self.queue.remove_for_entity(&self.collection, id);
                }
                Ok(removed)
            }
            None => {
                let removed = self.cache.clear(None)?;
                self.queue.clear(Some(&self.collection));
                self.session
                    .query_cache()
                    .clear_collection(&self.collection);
                Ok(removed)
            }
        }
    }

    /// Discards the collection's pending write actions without touching
    /// the cache.
    ///
    /// The local changes stay applied; their deferred transmission is
    /// abandoned. Returns the number of actions dropped.
    pub fn purge(&self) -> StoreResult<usize> {
        self.session.ensure_active()?;
        self.ensure_sync_mode("purge")?;
        Ok(self.queue.clear(Some(&self.collection)))
    }
}

impl<T: Entity> std::fmt::Debug for DataStore<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataStore")
            .field("collection", &self.collection)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

/// Builder for [`DataStore`].
pub struct DataStoreBuilder<T: Entity> {
    session: Arc<SessionContext>,
    collection: String,
    mode: StoreMode,
    network: Option<Arc<dyn NetworkExecutor>>,
    cache: Option<Arc<dyn EntityCache<T>>>,
    queue: Option<Arc<SyncQueue>>,
    translator: Option<Arc<dyn FilterTranslator>>,
    config: StoreConfig,
}

impl<T: Entity> DataStoreBuilder<T> {
    /// Creates a builder.
    pub fn new(
        session: Arc<SessionContext>,
        collection: impl Into<String>,
        mode: StoreMode,
    ) -> Self {
        Self {
            session,
            collection: collection.into(),
            mode,
            network: None,
            cache: None,
            queue: None,
            translator: None,
            config: StoreConfig::new(),
        }
    }

    /// Sets the network executor (required).
    pub fn network(mut self, network: Arc<dyn NetworkExecutor>) -> Self {
        self.network = Some(network);
        self
    }

    /// Sets the cache implementation; defaults to an in-memory cache.
    pub fn cache(mut self, cache: Arc<dyn EntityCache<T>>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Sets the sync queue; defaults to a fresh queue.
    ///
    /// Stores sharing a queue instance see each other's pending counts
    /// across collections.
    pub fn queue(mut self, queue: Arc<SyncQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Sets the filter translator; defaults to the Mongo-style one.
    pub fn translator(mut self, translator: Arc<dyn FilterTranslator>) -> Self {
        self.translator = Some(translator);
        self
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: StoreConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables or disables delta-set fetching.
    pub fn delta_set(mut self, enabled: bool) -> Self {
        self.config.delta_set_enabled = enabled;
        self
    }

    /// Builds the store.
    pub fn build(self) -> StoreResult<DataStore<T>> {
        let network = self.network.ok_or_else(|| {
            StoreError::invalid_operation("a network executor is required to build a store")
        })?;

        Ok(DataStore {
            collection: self.collection,
            mode: self.mode,
            session: self.session,
            cache: self
                .cache
                .unwrap_or_else(|| Arc::new(MemoryCache::new())),
            queue: self.queue.unwrap_or_else(|| Arc::new(SyncQueue::new())),
            network,
            translator: self
                .translator
                .unwrap_or_else(|| Arc::new(MongoTranslator::new())),
            config: self.config,
            cancelled: AtomicBool::new(false),
        })
    }
}
