//! Delta-set reconciliation.
//!
//! Repeat fetches of the same (collection, query) transfer only records
//! changed since the last fetch. The ledger entry keyed by the query's
//! fingerprint holds the timestamp to resume from; the server-side
//! delta query is preferred, with a metadata-diff fallback when the
//! backend does not support it.

use crate::read::decode_documents;
use crate::store::DataStore;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use tidemark_core::{time, Entity, QueryCacheItem, StoreResult};
use tidemark_filter::{Filter, Query};
use tracing::debug;

impl<T: Entity> DataStore<T> {
    /// Fetches matching records, transferring only changes when the
    /// ledger allows it.
    ///
    /// Returns the changed set and whether a delta (rather than a full
    /// fetch) satisfied the read. `force_full` ignores any ledger entry
    /// and takes the full path, used when the cache holds no data to
    /// apply a delta onto.
    pub(crate) async fn delta_fetch(
        &self,
        query: &Query,
        filter: &str,
        force_full: bool,
    ) -> StoreResult<(Vec<T>, bool)> {
        let fingerprint = self.translator.fingerprint(&self.collection, query);

        let since = if force_full {
            None
        } else {
            self.session
                .query_cache()
                .get(&self.collection, &fingerprint)
                .map(|item| item.last_request)
                .filter(|stamp| !stamp.is_empty())
        };

        let Some(since) = since else {
            let entities = self.full_refresh(query, filter, &fingerprint).await?;
            return Ok((entities, false));
        };

        self.check_cancelled()?;
        match self
            .network
            .fetch_delta(&self.collection, filter, &since)
            .await
        {
            Ok(delta) => {
                for deleted in &delta.deleted {
                    self.cache.delete_by_id(&deleted.entity_id)?;
                }
                let changed = decode_documents::<T>(delta.changed)?;
                self.cache.refresh(changed.clone())?;

                debug!(
                    collection = %self.collection,
                    changed = changed.len(),
                    deleted = delta.deleted.len(),
                    "applied server delta"
                );
                self.session.query_cache().set(QueryCacheItem::new(
                    &self.collection,
                    &fingerprint,
                    &delta.last_request_time,
                ));
                Ok((changed, true))
            }
            Err(err) if err.is_feature_unavailable() => {
                debug!(
                    collection = %self.collection,
                    "server delta unavailable, reconciling by metadata"
                );
                self.metadata_diff(query, filter, &fingerprint).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// First fetch for a query: full fetch-and-replace plus a fresh
    /// ledger entry.
    async fn full_refresh(
        &self,
        query: &Query,
        filter: &str,
        fingerprint: &str,
    ) -> StoreResult<Vec<T>> {
        let entities = self.plain_fetch(query, filter).await?;

        // The resume point is the newest fetched LMT: the next delta
        // must see exactly the writes the full fetch did not.
        let stamp = entities
            .iter()
            .filter_map(|e| e.last_modified().map(str::to_string))
            .max()
            .unwrap_or_else(time::now_timestamp);

        self.session.query_cache().set(QueryCacheItem::new(
            &self.collection,
            fingerprint,
            stamp,
        ));
        Ok(entities)
    }

    /// Local-diff fallback: compare (ID, LMT) pairs against a
    /// metadata-only fetch and retrieve the stale IDs in bounded
    /// batches.
    async fn metadata_diff(
        &self,
        query: &Query,
        filter: &str,
        fingerprint: &str,
    ) -> StoreResult<(Vec<T>, bool)> {
        let backend = self.network.fetch_metadata(&self.collection, filter).await?;

        let snapshot_query = Query {
            filter: query.filter.clone(),
            ..Query::new()
        };
        let local_lmts: HashMap<String, Option<String>> = self
            .cache
            .find_with_query(&snapshot_query)?
            .iter()
            .filter_map(|entity| {
                entity
                    .entity_id()
                    .map(|id| (id.to_string(), entity.last_modified().map(str::to_string)))
            })
            .collect();

        let backend_ids: HashSet<&str> =
            backend.iter().map(|m| m.entity_id.as_str()).collect();
        for id in local_lmts.keys() {
            if !backend_ids.contains(id.as_str()) {
                self.cache.delete_by_id(id)?;
            }
        }

        // Stale = absent locally, or present with a strictly newer
        // backend LMT (lexicographic comparison on the fixed-width
        // format).
        let to_fetch: Vec<String> = backend
            .iter()
            .filter(|meta| match local_lmts.get(&meta.entity_id) {
                Some(Some(local_lmt)) => meta.last_modified.as_str() > local_lmt.as_str(),
                Some(None) | None => true,
            })
            .map(|meta| meta.entity_id.clone())
            .collect();

        let fetched = if to_fetch.len() == backend.len() {
            // Everything changed; batching buys nothing.
            self.plain_fetch(query, filter).await?
        } else {
            let mut fetched = Vec::with_capacity(to_fetch.len());
            for chunk in to_fetch.chunks(self.config.metadata_chunk_size) {
                self.check_cancelled()?;
                let chunk_query = Query::filtered(Filter::is_in(
                    "_id",
                    chunk.iter().map(|id| Value::String(id.clone())).collect(),
                ));
                let chunk_filter = self.translator.translate(&chunk_query)?;
                let documents = self
                    .network
                    .find_by_filter(&self.collection, &chunk_filter)
                    .await?;
                let entities = decode_documents::<T>(documents)?;
                self.cache.refresh(entities.clone())?;
                fetched.extend(entities);
            }
            fetched
        };

        let stamp = backend
            .iter()
            .map(|meta| meta.last_modified.clone())
            .max()
            .unwrap_or_else(time::now_timestamp);
        self.session.query_cache().set(QueryCacheItem::new(
            &self.collection,
            fingerprint,
            stamp,
        ));

        debug!(
            collection = %self.collection,
            fetched = fetched.len(),
            backend = backend.len(),
            "applied metadata diff"
        );
        Ok((fetched, true))
    }
}
