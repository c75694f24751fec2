//! Push: replay of the sync queue against the backend.

use crate::store::DataStore;
use serde_json::Value;
use tidemark_core::{
    is_temp_id, Entity, PendingWriteAction, StoreError, StoreResult, WriteVerb,
};
use tracing::debug;

/// One failed replay inside a push result.
#[derive(Debug)]
pub struct PushError {
    /// Queue ID of the failed action.
    pub action_id: u64,
    /// Entity the action targeted.
    pub entity_id: String,
    /// The action's verb.
    pub verb: WriteVerb,
    /// The replay error.
    pub error: StoreError,
}

/// The outcome of a push.
///
/// Failed actions stay queued for the next push; succeeded ones are
/// consumed.
#[derive(Debug, Default)]
pub struct PushResult {
    /// Number of actions replayed successfully.
    pub pushed: u64,
    /// Actions whose replay failed, in queue order.
    pub errors: Vec<PushError>,
}

impl<T: Entity> DataStore<T> {
    /// Replays pending write actions against the backend, in enqueue
    /// order.
    pub async fn push(&self) -> StoreResult<PushResult> {
        self.session.ensure_active()?;
        self.ensure_sync_mode("push")?;

        let actions = self.queue.peek_batch(&self.collection, usize::MAX);
        debug!(
            collection = %self.collection,
            pending = actions.len(),
            "replaying sync queue"
        );

        let mut result = PushResult::default();
        for action in actions {
            self.check_cancelled()?;
            match self.replay(&action).await {
                Ok(()) => {
                    self.queue.remove(&self.collection, action.action_id);
                    result.pushed += 1;
                }
                Err(error) => {
                    result.errors.push(PushError {
                        action_id: action.action_id,
                        entity_id: action.entity_id.clone(),
                        verb: action.verb,
                        error,
                    });
                }
            }
        }

        Ok(result)
    }

    async fn replay(&self, action: &PendingWriteAction) -> StoreResult<()> {
        match action.verb {
            WriteVerb::Post => {
                let payload = require_payload(action)?;
                let stored = match self.network.create(&self.collection, payload.clone()).await {
                    Ok(stored) => stored,
                    // The entity already landed (a direct save raced the
                    // replay); converge via update instead.
                    Err(err)
                        if err.category == tidemark_protocol::ErrorCategory::Conflict
                            && !is_temp_id(&action.entity_id) =>
                    {
                        self.network
                            .update(&self.collection, &action.entity_id, payload)
                            .await?
                    }
                    Err(err) => return Err(err.into()),
                };
                let server = T::from_document(&stored)?;

                if is_temp_id(&action.entity_id) {
                    self.cache.delete_by_id(&action.entity_id)?;
                    if let Some(server_id) = server.entity_id() {
                        // Later queued actions must address the
                        // server-assigned ID.
                        self.queue
                            .remap_entity_id(&self.collection, &action.entity_id, server_id);
                    }
                }
                self.cache.refresh(vec![server])?;
                Ok(())
            }
            WriteVerb::Put => {
                // A temp ID here means the introducing create has not
                // been replayed; the backend cannot address the record.
                if is_temp_id(&action.entity_id) {
                    return Err(StoreError::queue(
                        "queued update targets an entity whose create has not been pushed",
                    ));
                }
                let payload = require_payload(action)?;
                let stored = self
                    .network
                    .update(&self.collection, &action.entity_id, payload)
                    .await?;
                let server = T::from_document(&stored)?;
                self.cache.refresh(vec![server])?;
                Ok(())
            }
            WriteVerb::Delete => {
                match self
                    .network
                    .delete_by_id(&self.collection, &action.entity_id)
                    .await
                {
                    Ok(_) => Ok(()),
                    // Already gone on the backend: the goal state holds.
                    Err(err) if err.is_not_found() => Ok(()),
                    Err(err) => Err(err.into()),
                }
            }
        }
    }
}

fn require_payload(action: &PendingWriteAction) -> StoreResult<Value> {
    let mut payload = action
        .payload
        .clone()
        .ok_or_else(|| StoreError::queue("queued write action has no payload"))?;

    // Temporary IDs never reach the backend; it assigns the real one.
    if let Value::Object(map) = &mut payload {
        let temp = map
            .get("_id")
            .and_then(Value::as_str)
            .map(is_temp_id)
            .unwrap_or(false);
        if temp {
            map.remove("_id");
        }
    }
    Ok(payload)
}
