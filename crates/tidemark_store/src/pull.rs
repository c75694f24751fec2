//! Pull: policy-forced refresh of the cache from the backend.

use crate::read::decode_documents;
use crate::store::DataStore;
use std::sync::Arc;
use tidemark_core::{Entity, StoreError, StoreResult};
use tidemark_filter::Query;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::debug;

/// The outcome of a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PullResult {
    /// Number of records transferred and applied to the cache.
    pub count: u64,
    /// True when a delta fetch satisfied the pull.
    pub delta_applied: bool,
}

impl<T: Entity> DataStore<T> {
    /// Refreshes the cache from the backend for the matching records.
    ///
    /// Not available on network-only stores, and rejected while write
    /// actions are pending (push first, so the refresh cannot clobber
    /// unsynced changes). Large result sets are fetched page-by-page:
    /// one producer task per page feeds a bounded channel, and a single
    /// consumer applies pages to the cache **in completion order** —
    /// pages are disjoint skip/limit partitions applied via upsert, so
    /// arrival order does not affect the final cache state.
    pub async fn pull(&self, query: &Query) -> StoreResult<PullResult> {
        self.session.ensure_active()?;
        self.ensure_sync_mode("pull")?;
        self.check_cancelled()?;

        if self.pending_sync_count() > 0 {
            return Err(StoreError::invalid_operation(
                "there are pending write actions; push before pulling",
            ));
        }

        let filter = self.translator.translate(query)?;

        if self.config.delta_set_enabled {
            let force_full = self.cache.is_empty()?;
            let (entities, delta_applied) =
                self.delta_fetch(query, &filter, force_full).await?;
            return Ok(PullResult {
                count: entities.len() as u64,
                delta_applied,
            });
        }

        let count = self.paged_fetch(query, &filter).await?;
        Ok(PullResult {
            count,
            delta_applied: false,
        })
    }

    /// Fetches all matching pages concurrently and applies them through
    /// a bounded channel.
    async fn paged_fetch(&self, query: &Query, filter: &str) -> StoreResult<u64> {
        let total = self.network.count(&self.collection, filter).await?;
        let page_size = self.config.page_size;

        if total <= page_size {
            let entities = self.plain_fetch(query, filter).await?;
            return Ok(entities.len() as u64);
        }

        let pages = total.div_ceil(page_size);
        debug!(
            collection = %self.collection,
            total,
            pages,
            "pulling paged collection"
        );

        // Fresh slate for the matching subset; pages upsert into it.
        self.cache.clear(query.filter.as_ref())?;

        let (page_tx, mut page_rx) =
            mpsc::channel::<(u64, StoreResult<Vec<T>>)>(self.config.pull_page_buffer);

        let mut producers = JoinSet::new();
        for page in 0..pages {
            let network = Arc::clone(&self.network);
            let collection = self.collection.clone();
            let filter = filter.to_string();
            let tx = page_tx.clone();
            producers.spawn(async move {
                let result = network
                    .find_page(&collection, &filter, page * page_size, page_size)
                    .await
                    .map_err(StoreError::from)
                    .and_then(|documents| decode_documents::<T>(documents));
                // A send failure means the consumer bailed; nothing to do.
                let _ = tx.send((page, result)).await;
            });
        }
        drop(page_tx);

        // Single consumer; completion order, not page order.
        let mut applied = 0u64;
        while let Some((page, result)) = page_rx.recv().await {
            self.check_cancelled()?;
            let entities = result?;
            debug!(
                collection = %self.collection,
                page,
                records = entities.len(),
                "applying pulled page"
            );
            applied += entities.len() as u64;
            self.cache.refresh(entities)?;
        }

        while let Some(joined) = producers.join_next().await {
            joined.map_err(|e| {
                StoreError::invalid_operation(format!("page fetch task failed: {e}"))
            })?;
        }

        Ok(applied)
    }
}
