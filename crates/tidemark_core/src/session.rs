//! Session context shared across stores.

use crate::error::{StoreError, StoreResult};
use crate::query_cache::QueryCache;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Minimum backend API version supporting multi-insert.
pub const MULTI_INSERT_MIN_API_VERSION: u32 = 5;

/// Explicit session state passed to each store at construction.
///
/// The session owns the delta-fetch ledger, which outlives any
/// individual store instance but is torn down on logout via
/// [`SessionContext::close`]. There is no global shared client;
/// lifecycle is explicit.
pub struct SessionContext {
    api_version: u32,
    custom_headers: Vec<(String, String)>,
    query_cache: Arc<QueryCache>,
    active: AtomicBool,
}

impl SessionContext {
    /// Creates a session with default settings.
    pub fn new() -> Self {
        Self {
            api_version: 6,
            custom_headers: Vec::new(),
            query_cache: Arc::new(QueryCache::new()),
            active: AtomicBool::new(true),
        }
    }

    /// Sets the negotiated backend API version.
    pub fn with_api_version(mut self, api_version: u32) -> Self {
        self.api_version = api_version;
        self
    }

    /// Adds a custom header sent with every request.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.custom_headers.push((name.into(), value.into()));
        self
    }

    /// Returns the negotiated API version.
    pub fn api_version(&self) -> u32 {
        self.api_version
    }

    /// Returns the session's custom request headers.
    pub fn custom_headers(&self) -> &[(String, String)] {
        &self.custom_headers
    }

    /// Returns the session-scoped delta-fetch ledger.
    pub fn query_cache(&self) -> &Arc<QueryCache> {
        &self.query_cache
    }

    /// Returns true if the session has not been closed.
    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Fails with [`StoreError::SessionClosed`] if the session was
    /// closed.
    pub fn ensure_active(&self) -> StoreResult<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(StoreError::SessionClosed)
        }
    }

    /// Closes the session, tearing down the delta-fetch ledger.
    pub fn close(&self) {
        self.active.store(false, Ordering::SeqCst);
        self.query_cache.clear();
    }

    /// Fails if the session's API version is below `required`.
    pub fn ensure_api_version(&self, required: u32) -> StoreResult<()> {
        if self.api_version >= required {
            Ok(())
        } else {
            Err(StoreError::ApiVersionUnsupported {
                required,
                actual: self.api_version,
            })
        }
    }
}

impl Default for SessionContext {
    fn default() -> Self {
        Self::new()
    }
}
