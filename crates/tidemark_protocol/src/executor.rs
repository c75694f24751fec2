//! Network executor trait definition.

use crate::error::NetworkResult;
use crate::types::{DeleteResponse, DeltaResponse, MetadataRecord, MultiInsertResponse};
use async_trait::async_trait;
use serde_json::Value;

/// Executes document operations against a remote backend.
///
/// The executor is an **opaque collaborator**: it owns the HTTP transport,
/// authentication, and session headers, and exchanges plain JSON
/// documents. Filter arguments arrive as already-translated backend
/// filter strings (see `tidemark_filter::FilterTranslator`); the
/// match-all filter is the translator's representation of an unfiltered
/// query.
///
/// # Implementors
///
/// - [`crate::MockNetwork`] — in-memory backend for tests
/// - An HTTP implementation lives with the application shell, outside
///   this workspace's scope
#[async_trait]
pub trait NetworkExecutor: Send + Sync {
    /// Fetches every entity in a collection.
    async fn find_all(&self, collection: &str) -> NetworkResult<Vec<Value>>;

    /// Fetches one entity by ID.
    async fn find_by_id(&self, collection: &str, entity_id: &str) -> NetworkResult<Value>;

    /// Fetches entities matching a filter.
    async fn find_by_filter(&self, collection: &str, filter: &str) -> NetworkResult<Vec<Value>>;

    /// Fetches one page of entities matching a filter.
    ///
    /// Pages are skip/limit partitions over a stable backend ordering, so
    /// concurrent page fetches are disjoint.
    async fn find_page(
        &self,
        collection: &str,
        filter: &str,
        skip: u64,
        limit: u64,
    ) -> NetworkResult<Vec<Value>>;

    /// Counts entities matching a filter.
    async fn count(&self, collection: &str, filter: &str) -> NetworkResult<u64>;

    /// Creates one entity; the response carries the server-assigned ID
    /// and metadata.
    async fn create(&self, collection: &str, document: Value) -> NetworkResult<Value>;

    /// Creates a batch of entities, reporting per-index outcomes.
    async fn create_batch(
        &self,
        collection: &str,
        documents: Vec<Value>,
    ) -> NetworkResult<MultiInsertResponse>;

    /// Overwrites one entity by ID.
    async fn update(
        &self,
        collection: &str,
        entity_id: &str,
        document: Value,
    ) -> NetworkResult<Value>;

    /// Deletes one entity by ID.
    async fn delete_by_id(
        &self,
        collection: &str,
        entity_id: &str,
    ) -> NetworkResult<DeleteResponse>;

    /// Deletes every entity matching a filter.
    async fn delete_by_filter(
        &self,
        collection: &str,
        filter: &str,
    ) -> NetworkResult<DeleteResponse>;

    /// Fetches all changes (created/updated/deleted) since a timestamp,
    /// scoped to a filter.
    ///
    /// Backends without delta support fail with a
    /// [`crate::ErrorCategory::FeatureUnavailable`] error, which callers
    /// use to fall back to metadata-based reconciliation.
    async fn fetch_delta(
        &self,
        collection: &str,
        filter: &str,
        since: &str,
    ) -> NetworkResult<DeltaResponse>;

    /// Fetches the (ID, last-modified) projection of entities matching a
    /// filter, for local-diff reconciliation.
    async fn fetch_metadata(
        &self,
        collection: &str,
        filter: &str,
    ) -> NetworkResult<Vec<MetadataRecord>>;
}
