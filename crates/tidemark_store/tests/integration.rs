//! End-to-end store scenarios over the mock backend.

use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tidemark_core::is_temp_id;
use tidemark_protocol::{MockNetwork, NetworkError, NetworkExecutor};
use tidemark_store::{
    DataStore, Entity, Filter, FilterTranslator, Metadata, MongoTranslator, Query, ReadPolicy,
    ReadSource, SessionContext, StoreConfig, StoreError, StoreMode, WritePolicy,
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Item {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    id: Option<String>,
    #[serde(rename = "_kmd", skip_serializing_if = "Option::is_none")]
    metadata: Option<Metadata>,
    details: String,
    #[serde(default)]
    lat: f64,
}

impl Item {
    fn new(details: &str) -> Self {
        Self {
            id: None,
            metadata: None,
            details: details.into(),
            lat: 0.0,
        }
    }

    fn with_lat(details: &str, lat: f64) -> Self {
        Self {
            lat,
            ..Self::new(details)
        }
    }
}

impl Entity for Item {
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

fn init_logging() {
    use std::sync::Once;
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

fn make_store(
    network: &Arc<MockNetwork>,
    mode: StoreMode,
    session: &Arc<SessionContext>,
) -> DataStore<Item> {
    init_logging();
    DataStore::builder(Arc::clone(session), "items", mode)
        .network(Arc::clone(network) as Arc<dyn NetworkExecutor>)
        .build()
        .unwrap()
}

fn sync_store(network: &Arc<MockNetwork>) -> (DataStore<Item>, Arc<SessionContext>) {
    let session = Arc::new(SessionContext::new());
    (make_store(network, StoreMode::Sync, &session), session)
}

fn delta_store(network: &Arc<MockNetwork>) -> (DataStore<Item>, Arc<SessionContext>) {
    init_logging();
    let session = Arc::new(SessionContext::new());
    let store = DataStore::builder(Arc::clone(&session), "items", StoreMode::Cache)
        .network(Arc::clone(network) as Arc<dyn NetworkExecutor>)
        .delta_set(true)
        .build()
        .unwrap();
    (store, session)
}

#[tokio::test]
async fn force_network_save_assigns_server_id_and_leaves_cache_untouched() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Network, &session);

    let saved = store
        .save(Item::new("A"), WritePolicy::ForceNetwork)
        .await
        .unwrap();

    let id = saved.entity_id().unwrap();
    assert!(!id.is_empty());
    assert!(!is_temp_id(id));
    assert!(saved.last_modified().is_some());

    // The store's cache was not involved in the write.
    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 0);
}

#[tokio::test]
async fn remove_by_query_then_find_deleted_fails_not_found() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Network, &session);

    let doomed = store
        .save(Item::new("Delete me"), WritePolicy::ForceNetwork)
        .await
        .unwrap();
    let kept = store
        .save(Item::new("Keep me"), WritePolicy::ForceNetwork)
        .await
        .unwrap();

    let query = Query::filtered(Filter::eq("details", "Delete me"));
    let removed = store
        .remove_with_query(&query, WritePolicy::ForceNetwork)
        .await
        .unwrap();
    assert_eq!(removed, 1);

    let err = store
        .find_by_id(doomed.entity_id().unwrap(), ReadPolicy::ForceNetwork)
        .await
        .unwrap_err();
    assert!(err.is_network());
    assert!(err.is_not_found());

    let found = store
        .find_by_id(kept.entity_id().unwrap(), ReadPolicy::ForceNetwork)
        .await
        .unwrap();
    assert_eq!(found.details, "Keep me");
}

#[tokio::test]
async fn delta_second_fetch_returns_only_new_record() {
    let network = Arc::new(MockNetwork::new());
    let (store, session) = delta_store(&network);

    network.seed("items", json!({"details": "existing"}));

    // First fetch: full, creates the ledger entry.
    let first = store.find(ReadPolicy::ForceNetwork).await.unwrap();
    assert_eq!(first.total(), 1);
    assert!(!first.delta_applied);

    let fingerprint = MongoTranslator::new().fingerprint("items", &Query::new());
    let t0 = session
        .query_cache()
        .get("items", &fingerprint)
        .unwrap()
        .last_request;
    assert!(!t0.is_empty());

    // One record added on the backend after the first fetch.
    let added = network.seed("items", json!({"details": "added later"}));
    let added_id = added["_id"].as_str().unwrap();

    let second = store.find(ReadPolicy::ForceNetwork).await.unwrap();
    assert!(second.delta_applied);
    assert_eq!(second.total(), 1);
    assert_eq!(second.entities[0].entity_id(), Some(added_id));

    // The ledger advanced past the added record's change time.
    let t1 = session
        .query_cache()
        .get("items", &fingerprint)
        .unwrap()
        .last_request;
    assert!(t1 > t0);

    // Converged: a third fetch transfers nothing.
    let third = store.find(ReadPolicy::ForceNetwork).await.unwrap();
    assert!(third.delta_applied);
    assert_eq!(third.total(), 0);

    // The full reconciled view is in the cache.
    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 2);
}

#[tokio::test]
async fn multi_insert_reports_per_index_failures() {
    let network = Arc::new(MockNetwork::new());
    network.set_create_validator(|doc| {
        let lat = doc.get("lat").and_then(|v| v.as_f64()).unwrap_or(0.0);
        if !(-90.0..=90.0).contains(&lat) {
            Some(NetworkError::bad_request(
                "InvalidEntity",
                "latitude out of range",
            ))
        } else {
            None
        }
    });

    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Network, &session);

    let result = store
        .save_batch(
            vec![Item::with_lat("ok", 45.0), Item::with_lat("bad", 120.0)],
            WritePolicy::ForceNetwork,
        )
        .await
        .unwrap();

    assert_eq!(result.entities.len(), 2);
    assert!(result.entities[0].is_some());
    assert!(result.entities[1].is_none());
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].index, 1);
    assert!(!result.is_complete());
    assert_eq!(result.saved_count(), 1);
}

#[tokio::test]
async fn remove_by_query_without_where_clause_fails_before_network() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Network, &session);

    // A combinator with no evaluable predicate.
    let query = Query::filtered(Filter::and(vec![]));
    let err = store
        .remove_with_query(&query, WritePolicy::ForceNetwork)
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        StoreError::Filter(tidemark_store::FilterError::WhereClauseAbsent)
    ));
    assert_eq!(network.requests(), 0);
}

#[tokio::test]
async fn missing_filter_also_fails_before_network() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Network, &session);

    let err = store
        .remove_with_query(&Query::new(), WritePolicy::ForceNetwork)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::Filter(_)));
    assert_eq!(network.requests(), 0);
}

#[tokio::test]
async fn force_local_find_is_idempotent() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = sync_store(&network);

    store
        .save(Item::new("a"), WritePolicy::ForceLocal)
        .await
        .unwrap();
    store
        .save(Item::new("b"), WritePolicy::ForceLocal)
        .await
        .unwrap();

    let first = store.find(ReadPolicy::ForceLocal).await.unwrap();
    let second = store.find(ReadPolicy::ForceLocal).await.unwrap();

    let ids = |result: &tidemark_store::ReadResult<Item>| {
        let mut ids: Vec<String> = result
            .entities
            .iter()
            .filter_map(|e: &Item| e.entity_id().map(str::to_string))
            .collect();
        ids.sort();
        ids
    };
    assert_eq!(ids(&first), ids(&second));
    assert_eq!(first.total(), 2);
    // No network involvement at any point.
    assert_eq!(network.requests(), 0);
}

#[tokio::test]
async fn local_then_network_failure_is_locally_durable() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Cache, &session);

    network.set_offline(true);
    let before = store.pending_sync_count();

    let err = store
        .save(Item::new("draft"), WritePolicy::LocalThenNetwork)
        .await
        .unwrap_err();
    assert!(err.is_network());

    // Exactly one pending action was queued, and the change is cached.
    assert_eq!(store.pending_sync_count(), before + 1);
    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 1);
    assert_eq!(local.entities[0].details, "draft");
    assert!(local.entities[0].has_temp_id());
}

#[tokio::test]
async fn local_then_network_success_reconciles_temp_id() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Cache, &session);

    let saved = store
        .save(Item::new("fresh"), WritePolicy::LocalThenNetwork)
        .await
        .unwrap();

    assert!(!saved.has_temp_id());
    assert_eq!(store.pending_sync_count(), 0);

    // The cache holds exactly the server copy, not the temp one.
    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 1);
    assert_eq!(local.entities[0].entity_id(), saved.entity_id());
}

#[tokio::test]
async fn network_then_local_failure_leaves_cache_unchanged() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Cache, &session);

    network.set_offline(true);
    let err = store
        .save(Item::new("x"), WritePolicy::NetworkThenLocal)
        .await
        .unwrap_err();
    assert!(err.is_network());

    assert_eq!(store.pending_sync_count(), 0);
    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 0);
}

#[tokio::test]
async fn delta_cycle_converges_to_backend_state() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = delta_store(&network);

    let a = network.seed("items", json!({"details": "a"}));
    let b = network.seed("items", json!({"details": "b"}));
    network.seed("items", json!({"details": "c"}));

    let first = store.pull(&Query::new()).await.unwrap();
    assert_eq!(first.count, 3);
    assert!(!first.delta_applied);

    // Backend mutates: one update, one delete, one insert.
    let a_id = a["_id"].as_str().unwrap();
    let b_id = b["_id"].as_str().unwrap();
    network
        .update("items", a_id, json!({"details": "a2"}))
        .await
        .unwrap();
    network.delete_by_id("items", b_id).await.unwrap();
    network.seed("items", json!({"details": "d"}));

    let second = store.pull(&Query::new()).await.unwrap();
    assert!(second.delta_applied);
    assert_eq!(second.count, 2); // a2 and d

    // Cache now equals exactly the backend's live ID set.
    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    let mut local_ids: Vec<String> = local
        .entities
        .iter()
        .filter_map(|e: &Item| e.entity_id().map(str::to_string))
        .collect();
    local_ids.sort();

    let mut backend_ids: Vec<String> = network
        .find_all("items")
        .await
        .unwrap()
        .iter()
        .map(|d| d["_id"].as_str().unwrap().to_string())
        .collect();
    backend_ids.sort();

    assert_eq!(local_ids, backend_ids);
    assert_eq!(
        local
            .entities
            .iter()
            .find(|e| e.entity_id() == Some(a_id))
            .unwrap()
            .details,
        "a2"
    );
}

#[tokio::test]
async fn metadata_diff_fallback_when_server_delta_unsupported() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = delta_store(&network);

    let a = network.seed("items", json!({"details": "a"}));
    network.seed("items", json!({"details": "b"}));

    let first = store.find(ReadPolicy::ForceNetwork).await.unwrap();
    assert_eq!(first.total(), 2);

    network.set_delta_supported(false);
    let a_id = a["_id"].as_str().unwrap();
    network
        .update("items", a_id, json!({"details": "a-changed"}))
        .await
        .unwrap();

    let second = store.find(ReadPolicy::ForceNetwork).await.unwrap();
    assert!(second.delta_applied);
    assert_eq!(second.total(), 1);
    assert_eq!(second.entities[0].details, "a-changed");

    let cached = store
        .find_by_id(a_id, ReadPolicy::ForceLocal)
        .await
        .unwrap();
    assert_eq!(cached.details, "a-changed");
}

#[tokio::test]
async fn paged_pull_applies_all_pages() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = DataStore::builder(Arc::clone(&session), "items", StoreMode::Sync)
        .network(Arc::clone(&network) as Arc<dyn NetworkExecutor>)
        .config(
            StoreConfig::new()
                .with_page_size(10)
                .with_pull_page_buffer(3),
        )
        .build()
        .unwrap();

    for i in 0..25 {
        network.seed("items", json!({"details": format!("record {i}")}));
    }

    let result = store.pull(&Query::new()).await.unwrap();
    assert_eq!(result.count, 25);

    // Pages arrived in completion order; the cache still holds every
    // record exactly once.
    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 25);
    let mut ids: Vec<String> = local
        .entities
        .iter()
        .filter_map(|e: &Item| e.entity_id().map(str::to_string))
        .collect();
    let total = ids.len();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), total);
}

#[tokio::test]
async fn push_replays_fifo_and_reconciles_temp_ids() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = sync_store(&network);

    store
        .save(Item::new("first"), WritePolicy::ForceLocal)
        .await
        .unwrap();
    store
        .save(Item::new("second"), WritePolicy::ForceLocal)
        .await
        .unwrap();
    assert_eq!(store.pending_sync_count(), 2);
    assert_eq!(network.record_count("items"), 0);

    let result = store.push().await.unwrap();
    assert_eq!(result.pushed, 2);
    assert!(result.errors.is_empty());
    assert_eq!(store.pending_sync_count(), 0);
    assert_eq!(network.record_count("items"), 2);

    // Every cached record now carries its server-assigned ID.
    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 2);
    assert!(local.entities.iter().all(|e| !e.has_temp_id()));
}

#[tokio::test]
async fn push_replays_queued_updates_and_deletes() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = sync_store(&network);

    let draft = store
        .save(Item::new("v1"), WritePolicy::ForceLocal)
        .await
        .unwrap();
    let mut edited = draft.clone();
    edited.details = "v2".into();
    store.save(edited, WritePolicy::ForceLocal).await.unwrap();

    // Create then update for the same entity, replayed in order; the
    // update is remapped to the server ID assigned by the create.
    let result = store.push().await.unwrap();
    assert_eq!(result.pushed, 2);
    assert_eq!(network.record_count("items"), 1);

    let backend = network.find_all("items").await.unwrap();
    assert_eq!(backend[0]["details"], json!("v2"));

    let server_id = backend[0]["_id"].as_str().unwrap().to_string();
    store
        .remove_by_id(&server_id, WritePolicy::ForceLocal)
        .await
        .unwrap();
    assert_eq!(store.pending_sync_count(), 1);

    let result = store.push().await.unwrap();
    assert_eq!(result.pushed, 1);
    assert_eq!(network.record_count("items"), 0);
}

#[tokio::test]
async fn removing_unsynced_record_drops_its_queued_create() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = sync_store(&network);

    let draft = store
        .save(Item::new("never synced"), WritePolicy::ForceLocal)
        .await
        .unwrap();
    assert_eq!(store.pending_sync_count(), 1);

    let removed = store
        .remove_by_id(draft.entity_id().unwrap(), WritePolicy::ForceLocal)
        .await
        .unwrap();
    assert_eq!(removed, 1);

    // No delete was queued; the create is simply gone.
    assert_eq!(store.pending_sync_count(), 0);
    let result = store.push().await.unwrap();
    assert_eq!(result.pushed, 0);
    assert_eq!(network.record_count("items"), 0);
}

#[tokio::test]
async fn sync_pushes_then_pulls() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = sync_store(&network);

    network.seed("items", json!({"details": "remote"}));
    store
        .save(Item::new("local"), WritePolicy::ForceLocal)
        .await
        .unwrap();

    let summary = store.sync(&Query::new()).await.unwrap();
    assert_eq!(summary.push.pushed, 1);
    let pull = summary.pull.expect("pull should run after a clean push");
    assert_eq!(pull.count, 2);

    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 2);
    assert_eq!(network.record_count("items"), 2);
}

#[tokio::test]
async fn sync_skips_pull_when_push_leaves_pending_actions() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = sync_store(&network);

    store
        .save(Item::new("stuck"), WritePolicy::ForceLocal)
        .await
        .unwrap();

    network.set_offline(true);
    let summary = store.sync(&Query::new()).await.unwrap();
    assert_eq!(summary.push.pushed, 0);
    assert_eq!(summary.push.errors.len(), 1);
    assert!(summary.pull.is_none());
    assert_eq!(store.pending_sync_count(), 1);
}

#[tokio::test]
async fn pull_with_pending_writes_is_rejected() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = sync_store(&network);

    store
        .save(Item::new("unsynced"), WritePolicy::ForceLocal)
        .await
        .unwrap();

    let err = store.pull(&Query::new()).await.unwrap_err();
    assert!(matches!(err, StoreError::InvalidOperation { .. }));
}

#[tokio::test]
async fn network_store_rejects_pull_push_sync() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Network, &session);

    assert!(matches!(
        store.pull(&Query::new()).await,
        Err(StoreError::InvalidOperation { .. })
    ));
    assert!(matches!(
        store.push().await,
        Err(StoreError::InvalidOperation { .. })
    ));
    assert!(matches!(
        store.sync(&Query::new()).await,
        Err(StoreError::InvalidOperation { .. })
    ));
}

#[tokio::test]
async fn network_otherwise_local_serves_cache_on_failure() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Cache, &session);

    network.seed("items", json!({"details": "cached"}));
    let fetched = store.find(ReadPolicy::ForceNetwork).await.unwrap();
    assert_eq!(fetched.total(), 1);

    network.set_offline(true);
    let result = store
        .find(ReadPolicy::NetworkOtherwiseLocal)
        .await
        .unwrap();
    assert_eq!(result.source, ReadSource::Cache);
    assert_eq!(result.total(), 1);
    assert_eq!(result.entities[0].details, "cached");
}

#[tokio::test]
async fn both_policy_reads_cache_first_then_network() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Cache, &session);

    network.seed("items", json!({"details": "remote"}));

    // Empty cache: falls through to the network and caches the result.
    let first = store.find(ReadPolicy::Both).await.unwrap();
    assert_eq!(first.source, ReadSource::Network);
    assert_eq!(first.total(), 1);

    let requests_after_first = network.requests();
    let second = store.find(ReadPolicy::Both).await.unwrap();
    assert_eq!(second.source, ReadSource::Cache);
    assert_eq!(network.requests(), requests_after_first);
}

#[tokio::test]
async fn cancelled_store_rejects_operations() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = sync_store(&network);

    store.cancel();
    assert!(matches!(
        store.find(ReadPolicy::ForceLocal).await,
        Err(StoreError::Cancelled)
    ));
    assert!(matches!(
        store.save(Item::new("x"), WritePolicy::ForceLocal).await,
        Err(StoreError::Cancelled)
    ));

    store.reset_cancel();
    assert!(store.find(ReadPolicy::ForceLocal).await.is_ok());
}

#[tokio::test]
async fn save_batch_usage_errors_surface_before_network() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Network, &session);

    let err = store
        .save_batch(vec![], WritePolicy::ForceNetwork)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::EmptyBatch));

    let old_session = Arc::new(SessionContext::new().with_api_version(4));
    let old_store = make_store(&network, StoreMode::Network, &old_session);
    let err = old_store
        .save_batch(vec![Item::new("x")], WritePolicy::ForceNetwork)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::ApiVersionUnsupported { .. }));

    assert_eq!(network.requests(), 0);
}

#[tokio::test]
async fn clear_cache_drops_records_queue_and_ledger() {
    let network = Arc::new(MockNetwork::new());
    let (store, session) = delta_store(&network);

    network.seed("items", json!({"details": "remote"}));
    store.find(ReadPolicy::ForceNetwork).await.unwrap();
    assert_eq!(session.query_cache().len(), 1);

    let removed = store.clear_cache(None).unwrap();
    assert_eq!(removed, 1);
    assert_eq!(session.query_cache().len(), 0);

    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 0);
}

#[tokio::test]
async fn purge_discards_pending_actions_but_keeps_local_changes() {
    let network = Arc::new(MockNetwork::new());
    let (store, _session) = sync_store(&network);

    store
        .save(Item::new("local only"), WritePolicy::ForceLocal)
        .await
        .unwrap();
    assert_eq!(store.pending_sync_count(), 1);

    let dropped = store.purge().unwrap();
    assert_eq!(dropped, 1);
    assert_eq!(store.pending_sync_count(), 0);

    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 1);
}

#[tokio::test]
async fn closed_session_rejects_operations() {
    let network = Arc::new(MockNetwork::new());
    let (store, session) = sync_store(&network);

    session.close();
    assert!(matches!(
        store.find(ReadPolicy::ForceLocal).await,
        Err(StoreError::SessionClosed)
    ));
}

#[tokio::test]
async fn filtered_network_find_replaces_only_matching_subset() {
    let network = Arc::new(MockNetwork::new());
    let session = Arc::new(SessionContext::new());
    let store = make_store(&network, StoreMode::Cache, &session);

    network.seed("items", json!({"details": "alpha", "lat": 1.0}));
    network.seed("items", json!({"details": "beta", "lat": 2.0}));

    store.find(ReadPolicy::ForceNetwork).await.unwrap();

    // Backend loses "beta"; a filtered refresh for "alpha" must not
    // prune the unrelated cached record.
    let beta_id = {
        let all = network.find_all("items").await.unwrap();
        all.iter()
            .find(|d| d["details"] == json!("beta"))
            .unwrap()["_id"]
            .as_str()
            .unwrap()
            .to_string()
    };
    network.delete_by_id("items", &beta_id).await.unwrap();

    let query = Query::filtered(Filter::eq("details", "alpha"));
    let result = store
        .find_with_query(&query, ReadPolicy::ForceNetwork)
        .await
        .unwrap();
    assert_eq!(result.total(), 1);

    // "beta" is stale but still cached; only a matching-subset clear
    // happened.
    let local = store.find(ReadPolicy::ForceLocal).await.unwrap();
    assert_eq!(local.total(), 2);
}
