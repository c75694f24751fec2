//! Wire-level response types.

use crate::error::NetworkError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response to a delete request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteResponse {
    /// Number of entities the backend removed.
    pub count: u64,
}

impl DeleteResponse {
    /// Creates a response for the given removal count.
    pub fn new(count: u64) -> Self {
        Self { count }
    }
}

/// A deletion notice inside a delta response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    /// ID of the entity deleted on the backend.
    #[serde(rename = "_id")]
    pub entity_id: String,
}

/// Response to a delta query: everything that changed since a timestamp.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeltaResponse {
    /// Entities created or updated since the requested timestamp.
    pub changed: Vec<Value>,
    /// Entities deleted since the requested timestamp.
    pub deleted: Vec<DeletedRecord>,
    /// The backend's reported request time; becomes the next delta
    /// query's `since` value.
    pub last_request_time: String,
}

impl DeltaResponse {
    /// Creates a delta response.
    pub fn new(changed: Vec<Value>, deleted: Vec<DeletedRecord>, last_request_time: String) -> Self {
        Self {
            changed,
            deleted,
            last_request_time,
        }
    }
}

/// Metadata-only projection of an entity, for local-diff reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Entity ID.
    #[serde(rename = "_id")]
    pub entity_id: String,
    /// Server-assigned last-modified time.
    pub last_modified: String,
}

impl MetadataRecord {
    /// Creates a metadata record.
    pub fn new(entity_id: impl Into<String>, last_modified: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            last_modified: last_modified.into(),
        }
    }
}

/// A per-index failure inside a multi-insert response.
#[derive(Debug, Clone)]
pub struct IndexedNetworkError {
    /// Position of the failed document in the request batch.
    pub index: usize,
    /// The backend error for that document.
    pub error: NetworkError,
}

/// Response to a multi-insert request.
///
/// Partial failures do not fail the request: `entities` has one slot per
/// submitted document (`None` where the insert failed) and `errors`
/// describes each failed index.
#[derive(Debug, Clone, Default)]
pub struct MultiInsertResponse {
    /// Stored documents, index-aligned with the request; `None` marks a
    /// failed insert.
    pub entities: Vec<Option<Value>>,
    /// Per-index failures.
    pub errors: Vec<IndexedNetworkError>,
}

impl MultiInsertResponse {
    /// Creates a multi-insert response.
    pub fn new(entities: Vec<Option<Value>>, errors: Vec<IndexedNetworkError>) -> Self {
        Self { entities, errors }
    }

    /// Returns true if every document was stored.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}
