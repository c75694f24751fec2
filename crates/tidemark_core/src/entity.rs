//! Entity trait and server metadata.

use crate::error::{StoreError, StoreResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Prefix marking a client-generated ID that has not been reconciled
/// with a server-assigned one yet.
pub const TEMP_ID_PREFIX: &str = "tmp-";

/// Generates a new entity ID.
pub fn generate_entity_id() -> String {
    Uuid::new_v4().simple().to_string()
}

/// Generates a temporary client-side ID.
///
/// Temporary IDs make a record locally addressable before its create has
/// reached the backend; they are replaced by the server-assigned ID once
/// the create succeeds.
pub fn generate_temp_id() -> String {
    format!("{TEMP_ID_PREFIX}{}", Uuid::new_v4().simple())
}

/// Returns true if the ID is a client-generated temporary ID.
pub fn is_temp_id(id: &str) -> bool {
    id.starts_with(TEMP_ID_PREFIX)
}

/// Access-control list attached to an entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Acl {
    /// User ID of the entity's creator.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,
    /// Whether any authenticated user can read the entity.
    #[serde(rename = "gr", skip_serializing_if = "Option::is_none")]
    pub globally_readable: Option<bool>,
    /// Whether any authenticated user can write the entity.
    #[serde(rename = "gw", skip_serializing_if = "Option::is_none")]
    pub globally_writable: Option<bool>,
    /// User IDs granted read access.
    #[serde(rename = "r", default, skip_serializing_if = "Vec::is_empty")]
    pub readers: Vec<String>,
    /// User IDs granted write access.
    #[serde(rename = "w", default, skip_serializing_if = "Vec::is_empty")]
    pub writers: Vec<String>,
}

/// Server-assigned entity metadata.
///
/// The last-modified time is the backend's change-ordering key: a
/// fixed-width ISO-8601 string compared lexicographically (see
/// [`crate::time`]). It is monotonically non-decreasing per entity
/// across successful writes.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metadata {
    /// Entity creation time.
    #[serde(rename = "ect", skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Last-modified time.
    #[serde(rename = "lmt", skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<String>,
}

impl Metadata {
    /// Creates metadata with the given last-modified time.
    pub fn with_last_modified(lmt: impl Into<String>) -> Self {
        Self {
            created_at: None,
            last_modified: Some(lmt.into()),
        }
    }
}

/// A typed document stored in a tidemark collection.
///
/// Implementors map their ID field to the backend's `_id` and their
/// metadata field to `_kmd` via serde renames:
///
/// ```rust,ignore
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Book {
///     #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
///     id: Option<String>,
///     #[serde(rename = "_kmd", skip_serializing_if = "Option::is_none")]
///     metadata: Option<Metadata>,
///     title: String,
/// }
/// ```
pub trait Entity:
    Serialize + DeserializeOwned + Clone + Send + Sync + 'static
{
    /// Returns the entity's ID, if assigned.
    fn entity_id(&self) -> Option<&str>;

    /// Assigns the entity's ID.
    fn set_entity_id(&mut self, id: String);

    /// Returns the entity's server metadata, if present.
    fn metadata(&self) -> Option<&Metadata>;

    /// Assigns the entity's server metadata.
    fn set_metadata(&mut self, metadata: Metadata);

    /// Serializes the entity to its JSON document form.
    fn to_document(&self) -> StoreResult<Value> {
        serde_json::to_value(self).map_err(StoreError::from)
    }

    /// Deserializes an entity from its JSON document form.
    fn from_document(document: &Value) -> StoreResult<Self> {
        serde_json::from_value(document.clone()).map_err(StoreError::from)
    }

    /// Returns the entity's last-modified time, if known.
    fn last_modified(&self) -> Option<&str> {
        self.metadata().and_then(|m| m.last_modified.as_deref())
    }

    /// Returns true if the entity has a non-empty ID.
    fn has_entity_id(&self) -> bool {
        self.entity_id().is_some_and(|id| !id.is_empty())
    }

    /// Returns true if the entity carries a temporary, unsynced ID.
    fn has_temp_id(&self) -> bool {
        self.entity_id().is_some_and(is_temp_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Book {
        #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
        id: Option<String>,
        #[serde(rename = "_kmd", skip_serializing_if = "Option::is_none")]
        metadata: Option<Metadata>,
        title: String,
    }

    impl Entity for Book {
        fn entity_id(&self) -> Option<&str> {
            self.id.as_deref()
        }

        fn set_entity_id(&mut self, id: String) {
            self.id = Some(id);
        }

        fn metadata(&self) -> Option<&Metadata> {
            self.metadata.as_ref()
        }

        fn set_metadata(&mut self, metadata: Metadata) {
            self.metadata = Some(metadata);
        }
    }

    #[test]
    fn temp_ids_are_marked() {
        let id = generate_temp_id();
        assert!(is_temp_id(&id));
        assert!(!is_temp_id(&generate_entity_id()));
    }

    #[test]
    fn generated_ids_are_unique() {
        assert_ne!(generate_entity_id(), generate_entity_id());
        assert_ne!(generate_temp_id(), generate_temp_id());
    }

    #[test]
    fn document_roundtrip() {
        let book = Book {
            id: Some("b1".into()),
            metadata: Some(Metadata::with_last_modified("2024-03-01T10:00:00.000Z")),
            title: "Dune".into(),
        };

        let doc = book.to_document().unwrap();
        assert_eq!(doc["_id"], json!("b1"));
        assert_eq!(doc["_kmd"]["lmt"], json!("2024-03-01T10:00:00.000Z"));

        let decoded = Book::from_document(&doc).unwrap();
        assert_eq!(decoded, book);
    }

    #[test]
    fn from_document_rejects_wrong_shape() {
        let result = Book::from_document(&json!({"title": 42}));
        assert!(matches!(result, Err(StoreError::Parse { .. })));
    }

    #[test]
    fn id_helpers() {
        let mut book = Book {
            id: None,
            metadata: None,
            title: "Dune".into(),
        };
        assert!(!book.has_entity_id());
        assert!(book.last_modified().is_none());

        book.set_entity_id(generate_temp_id());
        assert!(book.has_entity_id());
        assert!(book.has_temp_id());

        book.set_entity_id("server-id".into());
        assert!(!book.has_temp_id());
    }

    #[test]
    fn acl_serializes_compactly() {
        let acl = Acl {
            creator: Some("user-1".into()),
            globally_readable: Some(true),
            ..Acl::default()
        };
        let doc = serde_json::to_value(&acl).unwrap();
        assert_eq!(doc, json!({"creator": "user-1", "gr": true}));
    }
}
