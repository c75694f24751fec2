//! In-memory mock backend for testing.

use crate::error::{NetworkError, NetworkResult};
use crate::executor::NetworkExecutor;
use crate::time;
use crate::types::{
    DeletedRecord, DeleteResponse, DeltaResponse, IndexedNetworkError, MetadataRecord,
    MultiInsertResponse,
};
use async_trait::async_trait;
use chrono::Duration;
use parking_lot::{Mutex, RwLock};
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use uuid::Uuid;

type CreateValidator = Box<dyn Fn(&Value) -> Option<NetworkError> + Send + Sync>;

#[derive(Default)]
struct CollectionState {
    /// Live records keyed by entity ID. BTreeMap gives the stable
    /// ordering that skip/limit pagination partitions over.
    records: BTreeMap<String, Value>,
    /// Deleted entity IDs with their deletion time, kept so delta
    /// queries can report deletions.
    tombstones: BTreeMap<String, String>,
}

/// An in-memory [`NetworkExecutor`] for tests.
///
/// The mock behaves like a small document backend: it assigns entity IDs
/// and last-modified times on write, keeps tombstones for deleted
/// records so delta queries can be served, and evaluates the Mongo-style
/// filter strings produced by the default translator.
///
/// Failure injection mirrors the response-injection style of the
/// backend mocks used elsewhere in the workspace: `set_offline` fails
/// every call, `fail_next_with` fails exactly one, and
/// `set_create_validator` rejects individual documents during inserts.
pub struct MockNetwork {
    state: RwLock<HashMap<String, CollectionState>>,
    last_lmt: Mutex<String>,
    offline: AtomicBool,
    delta_supported: AtomicBool,
    request_count: AtomicU64,
    fail_next: Mutex<Option<NetworkError>>,
    create_validator: Mutex<Option<CreateValidator>>,
}

impl MockNetwork {
    /// Creates an empty mock backend with delta queries enabled.
    pub fn new() -> Self {
        Self {
            state: RwLock::new(HashMap::new()),
            last_lmt: Mutex::new(String::new()),
            offline: AtomicBool::new(false),
            delta_supported: AtomicBool::new(true),
            request_count: AtomicU64::new(0),
            fail_next: Mutex::new(None),
            create_validator: Mutex::new(None),
        }
    }

    /// Makes every subsequent call fail with a transport error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    /// Makes exactly the next call fail with the given error.
    pub fn fail_next_with(&self, error: NetworkError) {
        *self.fail_next.lock() = Some(error);
    }

    /// Enables or disables server-side delta queries.
    pub fn set_delta_supported(&self, supported: bool) {
        self.delta_supported.store(supported, Ordering::SeqCst);
    }

    /// Installs a validator consulted for each document on create paths;
    /// returning an error rejects that document.
    pub fn set_create_validator<F>(&self, validator: F)
    where
        F: Fn(&Value) -> Option<NetworkError> + Send + Sync + 'static,
    {
        *self.create_validator.lock() = Some(Box::new(validator));
    }

    /// Total number of requests received, including failed ones.
    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Seeds a record directly, bypassing request accounting.
    ///
    /// Assigns an ID and metadata like a real create and returns the
    /// stored document.
    pub fn seed(&self, collection: &str, document: Value) -> Value {
        self.store_new(collection, document).unwrap_or(Value::Null)
    }

    /// Returns a stored record by ID, for assertions.
    pub fn record(&self, collection: &str, entity_id: &str) -> Option<Value> {
        self.state
            .read()
            .get(collection)
            .and_then(|c| c.records.get(entity_id).cloned())
    }

    /// Returns the number of live records in a collection.
    pub fn record_count(&self, collection: &str) -> usize {
        self.state
            .read()
            .get(collection)
            .map(|c| c.records.len())
            .unwrap_or(0)
    }

    /// Issues a timestamp strictly later than every previously issued one.
    fn next_lmt(&self) -> String {
        let now = time::now_timestamp();
        let mut last = self.last_lmt.lock();
        let stamp = if now > *last {
            now
        } else {
            time::parse_timestamp(&last)
                .map(|instant| time::format_timestamp(instant + Duration::milliseconds(1)))
                .unwrap_or(now)
        };
        *last = stamp.clone();
        stamp
    }

    fn begin_request(&self) -> NetworkResult<()> {
        self.request_count.fetch_add(1, Ordering::SeqCst);
        if self.offline.load(Ordering::SeqCst) {
            return Err(NetworkError::general("backend unreachable"));
        }
        if let Some(error) = self.fail_next.lock().take() {
            return Err(error);
        }
        Ok(())
    }

    fn parse_filter(filter: &str) -> NetworkResult<Value> {
        serde_json::from_str(filter)
            .map_err(|e| NetworkError::bad_request("InvalidQuerySyntax", e.to_string()))
    }

    /// Stores a new document, assigning ID and metadata.
    ///
    /// A client-generated temporary ID (`tmp-` prefix) is replaced by a
    /// server-assigned one; an explicit ID that already exists conflicts.
    fn store_new(&self, collection: &str, document: Value) -> NetworkResult<Value> {
        let mut doc = match document {
            Value::Object(map) => map,
            _ => {
                return Err(NetworkError::bad_request(
                    "InvalidEntity",
                    "document must be a JSON object",
                ))
            }
        };

        if let Some(validator) = self.create_validator.lock().as_ref() {
            if let Some(error) = validator(&Value::Object(doc.clone())) {
                return Err(error);
            }
        }

        let requested_id = doc
            .get("_id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty() && !id.starts_with("tmp-"))
            .map(str::to_string);

        let entity_id = requested_id.unwrap_or_else(|| Uuid::new_v4().simple().to_string());

        let mut state = self.state.write();
        let coll = state.entry(collection.to_string()).or_default();
        if coll.records.contains_key(&entity_id) {
            return Err(NetworkError::new(
                Some(409),
                crate::error::ErrorCategory::Conflict,
                "EntityAlreadyExists",
                format!("entity {entity_id} already exists"),
            ));
        }

        let lmt = self.next_lmt();
        doc.insert("_id".into(), json!(entity_id));
        doc.insert(
            "_kmd".into(),
            json!({
                "ect": lmt.clone(),
                "lmt": lmt,
            }),
        );

        let stored = Value::Object(doc);
        coll.tombstones.remove(&entity_id);
        coll.records.insert(entity_id, stored.clone());
        Ok(stored)
    }

    fn matching_records(&self, collection: &str, filter: &Value) -> Vec<Value> {
        self.state
            .read()
            .get(collection)
            .map(|c| {
                c.records
                    .values()
                    .filter(|doc| matches_filter(filter, doc))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl Default for MockNetwork {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl NetworkExecutor for MockNetwork {
    async fn find_all(&self, collection: &str) -> NetworkResult<Vec<Value>> {
        self.begin_request()?;
        Ok(self.matching_records(collection, &Value::Object(Map::new())))
    }

    async fn find_by_id(&self, collection: &str, entity_id: &str) -> NetworkResult<Value> {
        self.begin_request()?;
        self.record(collection, entity_id)
            .ok_or_else(|| NetworkError::entity_not_found(entity_id))
    }

    async fn find_by_filter(&self, collection: &str, filter: &str) -> NetworkResult<Vec<Value>> {
        self.begin_request()?;
        let filter = Self::parse_filter(filter)?;
        Ok(self.matching_records(collection, &filter))
    }

    async fn find_page(
        &self,
        collection: &str,
        filter: &str,
        skip: u64,
        limit: u64,
    ) -> NetworkResult<Vec<Value>> {
        self.begin_request()?;
        let filter = Self::parse_filter(filter)?;
        Ok(self
            .matching_records(collection, &filter)
            .into_iter()
            .skip(skip as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count(&self, collection: &str, filter: &str) -> NetworkResult<u64> {
        self.begin_request()?;
        let filter = Self::parse_filter(filter)?;
        Ok(self.matching_records(collection, &filter).len() as u64)
    }

    async fn create(&self, collection: &str, document: Value) -> NetworkResult<Value> {
        self.begin_request()?;
        self.store_new(collection, document)
    }

    async fn create_batch(
        &self,
        collection: &str,
        documents: Vec<Value>,
    ) -> NetworkResult<MultiInsertResponse> {
        self.begin_request()?;

        let mut entities = Vec::with_capacity(documents.len());
        let mut errors = Vec::new();
        for (index, document) in documents.into_iter().enumerate() {
            match self.store_new(collection, document) {
                Ok(stored) => entities.push(Some(stored)),
                Err(error) => {
                    entities.push(None);
                    errors.push(IndexedNetworkError { index, error });
                }
            }
        }

        Ok(MultiInsertResponse::new(entities, errors))
    }

    async fn update(
        &self,
        collection: &str,
        entity_id: &str,
        document: Value,
    ) -> NetworkResult<Value> {
        self.begin_request()?;

        let mut doc = match document {
            Value::Object(map) => map,
            _ => {
                return Err(NetworkError::bad_request(
                    "InvalidEntity",
                    "document must be a JSON object",
                ))
            }
        };

        let mut state = self.state.write();
        let coll = state.entry(collection.to_string()).or_default();

        let created_at = coll
            .records
            .get(entity_id)
            .and_then(|existing| existing.pointer("/_kmd/ect"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let lmt = self.next_lmt();
        doc.insert("_id".into(), json!(entity_id));
        doc.insert(
            "_kmd".into(),
            json!({
                "ect": created_at.unwrap_or_else(|| lmt.clone()),
                "lmt": lmt,
            }),
        );

        let stored = Value::Object(doc);
        coll.tombstones.remove(entity_id);
        coll.records.insert(entity_id.to_string(), stored.clone());
        Ok(stored)
    }

    async fn delete_by_id(
        &self,
        collection: &str,
        entity_id: &str,
    ) -> NetworkResult<DeleteResponse> {
        self.begin_request()?;

        let mut state = self.state.write();
        let coll = state.entry(collection.to_string()).or_default();
        if coll.records.remove(entity_id).is_none() {
            return Err(NetworkError::entity_not_found(entity_id));
        }
        let lmt = self.next_lmt();
        coll.tombstones.insert(entity_id.to_string(), lmt);
        Ok(DeleteResponse::new(1))
    }

    async fn delete_by_filter(
        &self,
        collection: &str,
        filter: &str,
    ) -> NetworkResult<DeleteResponse> {
        self.begin_request()?;
        let filter = Self::parse_filter(filter)?;

        let mut state = self.state.write();
        let coll = state.entry(collection.to_string()).or_default();
        let doomed: Vec<String> = coll
            .records
            .iter()
            .filter(|(_, doc)| matches_filter(&filter, doc))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &doomed {
            coll.records.remove(id);
            let lmt = self.next_lmt();
            coll.tombstones.insert(id.clone(), lmt);
        }

        Ok(DeleteResponse::new(doomed.len() as u64))
    }

    async fn fetch_delta(
        &self,
        collection: &str,
        filter: &str,
        since: &str,
    ) -> NetworkResult<DeltaResponse> {
        self.begin_request()?;
        if !self.delta_supported.load(Ordering::SeqCst) {
            return Err(NetworkError::delta_unavailable());
        }
        let filter = Self::parse_filter(filter)?;

        let state = self.state.read();
        let Some(coll) = state.get(collection) else {
            return Ok(DeltaResponse::new(vec![], vec![], self.next_lmt()));
        };

        let changed: Vec<Value> = coll
            .records
            .values()
            .filter(|doc| matches_filter(&filter, doc))
            .filter(|doc| lmt_of(doc).is_some_and(|lmt| lmt > since))
            .cloned()
            .collect();

        let deleted: Vec<DeletedRecord> = coll
            .tombstones
            .iter()
            .filter(|(_, lmt)| lmt.as_str() > since)
            .map(|(id, _)| DeletedRecord {
                entity_id: id.clone(),
            })
            .collect();

        drop(state);
        Ok(DeltaResponse::new(changed, deleted, self.next_lmt()))
    }

    async fn fetch_metadata(
        &self,
        collection: &str,
        filter: &str,
    ) -> NetworkResult<Vec<MetadataRecord>> {
        self.begin_request()?;
        let filter = Self::parse_filter(filter)?;

        Ok(self
            .matching_records(collection, &filter)
            .iter()
            .filter_map(|doc| {
                let id = doc.get("_id")?.as_str()?;
                let lmt = lmt_of(doc)?;
                Some(MetadataRecord::new(id, lmt))
            })
            .collect())
    }
}

fn lmt_of(doc: &Value) -> Option<&str> {
    doc.pointer("/_kmd/lmt").and_then(Value::as_str)
}

/// Evaluates the Mongo-style filter subset the default translator emits.
fn matches_filter(filter: &Value, doc: &Value) -> bool {
    let Some(conditions) = filter.as_object() else {
        return false;
    };

    conditions.iter().all(|(key, condition)| match key.as_str() {
        "$and" => condition
            .as_array()
            .is_some_and(|parts| parts.iter().all(|part| matches_filter(part, doc))),
        "$or" => condition
            .as_array()
            .is_some_and(|parts| parts.iter().any(|part| matches_filter(part, doc))),
        field => field_matches(doc.get(field), condition),
    })
}

fn field_matches(actual: Option<&Value>, condition: &Value) -> bool {
    let Some(operators) = condition.as_object().filter(|map| {
        map.keys().any(|k| k.starts_with('$'))
    }) else {
        // Plain equality condition.
        return actual.is_some_and(|v| scalars_equal(v, condition));
    };

    operators.iter().all(|(op, operand)| match op.as_str() {
        "$ne" => actual.is_some_and(|v| !scalars_equal(v, operand)),
        "$gt" => compare(actual, operand).is_some_and(std::cmp::Ordering::is_gt),
        "$gte" => compare(actual, operand).is_some_and(std::cmp::Ordering::is_ge),
        "$lt" => compare(actual, operand).is_some_and(std::cmp::Ordering::is_lt),
        "$lte" => compare(actual, operand).is_some_and(std::cmp::Ordering::is_le),
        "$exists" => operand.as_bool().is_some_and(|want| actual.is_some() == want),
        "$in" => operand.as_array().is_some_and(|candidates| {
            actual.is_some_and(|v| candidates.iter().any(|c| scalars_equal(v, c)))
        }),
        "$regex" => operand.as_str().is_some_and(|pattern| {
            actual
                .and_then(Value::as_str)
                .is_some_and(|s| regex_subset_matches(pattern, s))
        }),
        _ => false,
    })
}

fn compare(actual: Option<&Value>, operand: &Value) -> Option<std::cmp::Ordering> {
    match (actual?, operand) {
        (Value::Number(a), Value::Number(b)) => a.as_f64()?.partial_cmp(&b.as_f64()?),
        (Value::String(a), Value::String(b)) => Some(a.as_str().cmp(b.as_str())),
        (Value::Bool(a), Value::Bool(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn scalars_equal(a: &Value, b: &Value) -> bool {
    match compare(Some(a), b) {
        Some(ordering) => ordering == std::cmp::Ordering::Equal,
        None => a == b,
    }
}

/// Matches the escaped anchored-prefix / substring patterns the default
/// translator emits. Not a regex engine.
fn regex_subset_matches(pattern: &str, candidate: &str) -> bool {
    let (anchored, body) = match pattern.strip_prefix('^') {
        Some(rest) => (true, rest),
        None => (false, pattern),
    };

    let mut literal = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(escaped) = chars.next() {
                literal.push(escaped);
            }
        } else {
            literal.push(c);
        }
    }

    if anchored {
        candidate.starts_with(&literal)
    } else {
        candidate.contains(&literal)
    }
}
