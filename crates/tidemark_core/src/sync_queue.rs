//! Pending write actions and the per-collection sync queue.

use crate::error::StoreResult;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use tidemark_protocol::time;

/// HTTP-style verb of a deferred write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WriteVerb {
    /// Create a new entity.
    Post,
    /// Overwrite an existing entity.
    Put,
    /// Delete an entity.
    Delete,
}

impl WriteVerb {
    /// Returns the verb's wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteVerb::Post => "POST",
            WriteVerb::Put => "PUT",
            WriteVerb::Delete => "DELETE",
        }
    }
}

/// One deferred write operation awaiting transmission to the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingWriteAction {
    /// Queue-assigned ID, unique across collections.
    pub action_id: u64,
    /// Collection the write targets.
    pub collection: String,
    /// Entity ID, possibly temporary for unsynced creates.
    pub entity_id: String,
    /// Operation verb.
    pub verb: WriteVerb,
    /// Serialized entity payload; `None` for deletes.
    pub payload: Option<Value>,
    /// When the action was enqueued.
    pub enqueued_at: String,
}

impl PendingWriteAction {
    /// Builds an unenqueued create action.
    pub fn create(
        collection: impl Into<String>,
        entity_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::build(collection, entity_id, WriteVerb::Post, Some(payload))
    }

    /// Builds an unenqueued update action.
    pub fn update(
        collection: impl Into<String>,
        entity_id: impl Into<String>,
        payload: Value,
    ) -> Self {
        Self::build(collection, entity_id, WriteVerb::Put, Some(payload))
    }

    /// Builds an unenqueued delete action.
    pub fn delete(collection: impl Into<String>, entity_id: impl Into<String>) -> Self {
        Self::build(collection, entity_id, WriteVerb::Delete, None)
    }

    fn build(
        collection: impl Into<String>,
        entity_id: impl Into<String>,
        verb: WriteVerb,
        payload: Option<Value>,
    ) -> Self {
        Self {
            action_id: 0, // Assigned on enqueue
            collection: collection.into(),
            entity_id: entity_id.into(),
            verb,
            payload,
            enqueued_at: String::new(), // Stamped on enqueue
        }
    }
}

/// An ordered, per-collection queue of pending write actions.
///
/// # Invariants
///
/// - Replay order equals enqueue order within a collection (FIFO)
/// - No de-duplication: multiple queued actions for the same entity are
///   legal and replayed in order
///
/// Enqueue is append-only from the write side; a single push worker
/// drains the queue, so producers and the consumer can run concurrently.
pub struct SyncQueue {
    queues: RwLock<HashMap<String, VecDeque<PendingWriteAction>>>,
    next_action_id: AtomicU64,
}

impl SyncQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            queues: RwLock::new(HashMap::new()),
            next_action_id: AtomicU64::new(1),
        }
    }

    /// Appends an action to its collection's queue.
    ///
    /// Returns the assigned action ID.
    pub fn enqueue(&self, mut action: PendingWriteAction) -> StoreResult<u64> {
        let action_id = self.next_action_id.fetch_add(1, Ordering::SeqCst);
        action.action_id = action_id;
        action.enqueued_at = time::now_timestamp();

        self.queues
            .write()
            .entry(action.collection.clone())
            .or_default()
            .push_back(action);
        Ok(action_id)
    }

    /// Returns the number of pending actions, for one collection or all.
    pub fn count(&self, collection: Option<&str>) -> usize {
        let queues = self.queues.read();
        match collection {
            Some(name) => queues.get(name).map(VecDeque::len).unwrap_or(0),
            None => queues.values().map(VecDeque::len).sum(),
        }
    }

    /// Returns up to `limit` actions from the front of a collection's
    /// queue, oldest first, without removing them.
    pub fn peek_batch(&self, collection: &str, limit: usize) -> Vec<PendingWriteAction> {
        self.queues
            .read()
            .get(collection)
            .map(|queue| queue.iter().take(limit).cloned().collect())
            .unwrap_or_default()
    }

    /// Removes one action after a successful replay.
    ///
    /// Returns true if the action was present.
    pub fn remove(&self, collection: &str, action_id: u64) -> bool {
        let mut queues = self.queues.write();
        match queues.get_mut(collection) {
            Some(queue) => {
                let before = queue.len();
                queue.retain(|action| action.action_id != action_id);
                queue.len() != before
            }
            None => false,
        }
    }

    /// Returns true if any action is queued for an entity.
    pub fn has_pending(&self, collection: &str, entity_id: &str) -> bool {
        self.queues
            .read()
            .get(collection)
            .is_some_and(|queue| queue.iter().any(|action| action.entity_id == entity_id))
    }

    /// Drops every queued action for an entity.
    ///
    /// Used when a never-synced record is deleted locally: its queued
    /// create must not reach the backend.
    pub fn remove_for_entity(&self, collection: &str, entity_id: &str) -> usize {
        let mut queues = self.queues.write();
        match queues.get_mut(collection) {
            Some(queue) => {
                let before = queue.len();
                queue.retain(|action| action.entity_id != entity_id);
                before - queue.len()
            }
            None => 0,
        }
    }

    /// Rewrites queued actions for `old_id` to target `new_id`.
    ///
    /// Called after a create replay succeeds, so later queued updates
    /// address the server-assigned ID. Returns the number of actions
    /// rewritten.
    pub fn remap_entity_id(&self, collection: &str, old_id: &str, new_id: &str) -> usize {
        let mut queues = self.queues.write();
        let Some(queue) = queues.get_mut(collection) else {
            return 0;
        };

        let mut remapped = 0;
        for action in queue.iter_mut() {
            if action.entity_id == old_id {
                action.entity_id = new_id.to_string();
                if let Some(Value::Object(payload)) = action.payload.as_mut() {
                    payload.insert("_id".into(), json!(new_id));
                }
                remapped += 1;
            }
        }
        remapped
    }

    /// Removes all pending actions, for one collection or all.
    ///
    /// Returns the number of actions dropped.
    pub fn clear(&self, collection: Option<&str>) -> usize {
        let mut queues = self.queues.write();
        match collection {
            Some(name) => queues.remove(name).map(|q| q.len()).unwrap_or(0),
            None => {
                let dropped = queues.values().map(VecDeque::len).sum();
                queues.clear();
                dropped
            }
        }
    }

    /// Returns true if no actions are pending anywhere.
    pub fn is_empty(&self) -> bool {
        self.count(None) == 0
    }
}

impl Default for SyncQueue {
    fn default() -> Self {
        Self::new()
    }
}
