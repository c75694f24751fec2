//! Local cache seam and implementations.

mod memory;

pub use memory::MemoryCache;

use crate::entity::Entity;
use crate::error::StoreResult;
use tidemark_filter::{Filter, Query};

/// Per-collection local store of typed records keyed by entity ID.
///
/// Implementations are **keyed stores**: the cache never holds two
/// records with the same ID. `update` upserts by ID, matching
/// [`EntityCache::refresh`]; strict update-only semantics were rejected
/// as the more surprising contract.
///
/// # Implementors
///
/// - [`MemoryCache`] — in-memory, for tests and ephemeral stores
/// - Platform shells supply persistent implementations (SQLite, Realm)
///   outside this workspace's scope
pub trait EntityCache<T: Entity>: Send + Sync {
    /// Returns all cached records, as a snapshot at call time.
    fn find_all(&self) -> StoreResult<Vec<T>>;

    /// Returns the records whose ID is in `ids`; missing IDs are
    /// silently omitted.
    fn find_by_ids(&self, ids: &[String]) -> StoreResult<Vec<T>>;

    /// Returns the records matching a query (filter, sort, skip, limit).
    fn find_with_query(&self, query: &Query) -> StoreResult<Vec<T>>;

    /// Returns one record by ID.
    fn get(&self, entity_id: &str) -> StoreResult<Option<T>>;

    /// Inserts a record, generating a temporary ID if absent; returns
    /// the stored record.
    fn save(&self, entity: T) -> StoreResult<T>;

    /// Overwrites the record matching the entity's ID, inserting it if
    /// absent; returns the stored record.
    fn update(&self, entity: T) -> StoreResult<T>;

    /// Removes one record by ID; returns the number removed (0 or 1).
    fn delete_by_id(&self, entity_id: &str) -> StoreResult<u64>;

    /// Removes all records matching a filter; returns the count and the
    /// removed IDs (needed to build matching sync entries).
    fn delete_by_query(&self, filter: &Filter) -> StoreResult<(u64, Vec<String>)>;

    /// Upserts a batch of records after network reconciliation; records
    /// absent from the batch are left in place.
    fn refresh(&self, entities: Vec<T>) -> StoreResult<Vec<T>>;

    /// Removes records matching the filter, or all records if absent;
    /// returns the number removed.
    fn clear(&self, filter: Option<&Filter>) -> StoreResult<u64>;

    /// Returns true if the cache holds no records.
    fn is_empty(&self) -> StoreResult<bool>;

    /// Returns the number of cached records.
    fn count(&self) -> StoreResult<u64>;

    /// Returns the last-modified time recorded for an entity, if any.
    fn last_modified_of(&self, entity_id: &str) -> StoreResult<Option<String>>;
}
