//! Delta-set ledger: last-request timestamps per (collection, query).

use parking_lot::RwLock;
use std::collections::HashMap;

/// Delta-fetch state for one distinct (collection, query) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCacheItem {
    /// Collection name.
    pub collection: String,
    /// Normalized query fingerprint.
    pub fingerprint: String,
    /// Timestamp of the last successful full or delta fetch.
    pub last_request: String,
}

impl QueryCacheItem {
    /// Creates a ledger entry.
    pub fn new(
        collection: impl Into<String>,
        fingerprint: impl Into<String>,
        last_request: impl Into<String>,
    ) -> Self {
        Self {
            collection: collection.into(),
            fingerprint: fingerprint.into(),
            last_request: last_request.into(),
        }
    }
}

/// The ledger of delta-fetch timestamps.
///
/// One entry exists per distinct (collection, query) pair that has been
/// used for a delta-capable read: created on the first full fetch,
/// updated after every successful fetch, and removed only by explicit
/// clears. Owned by the session; only the read-policy/delta machinery
/// mutates it.
#[derive(Debug, Default)]
pub struct QueryCache {
    items: RwLock<HashMap<(String, String), QueryCacheItem>>,
}

impl QueryCache {
    /// Creates an empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the entry for a (collection, fingerprint) pair.
    pub fn get(&self, collection: &str, fingerprint: &str) -> Option<QueryCacheItem> {
        self.items
            .read()
            .get(&(collection.to_string(), fingerprint.to_string()))
            .cloned()
    }

    /// Upserts an entry, keyed by its (collection, fingerprint) pair.
    pub fn set(&self, item: QueryCacheItem) {
        self.items
            .write()
            .insert((item.collection.clone(), item.fingerprint.clone()), item);
    }

    /// Removes one entry; returns true if it existed.
    pub fn remove(&self, collection: &str, fingerprint: &str) -> bool {
        self.items
            .write()
            .remove(&(collection.to_string(), fingerprint.to_string()))
            .is_some()
    }

    /// Removes every entry for a collection; returns the number removed.
    pub fn clear_collection(&self, collection: &str) -> usize {
        let mut items = self.items.write();
        let before = items.len();
        items.retain(|(coll, _), _| coll != collection);
        before - items.len()
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.items.write().clear();
    }

    /// Returns the number of tracked (collection, query) pairs.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    /// Returns true if no pairs are tracked.
    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}
