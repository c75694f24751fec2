//! Read/write policies and their pure planning functions.
//!
//! Policy branching is separated from I/O: [`plan_read`] and
//! [`plan_write`] are pure mappings from (policy, state) to an action
//! plan, testable without a cache or a network.

/// Caller-selected policy for a single read operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Read from the cache only; never touch the network.
    ForceLocal,
    /// Fetch from the network; refresh the cache with the result.
    ForceNetwork,
    /// Read the cache first; fall back to the network if it is empty.
    Both,
    /// Fetch from the network; on any network failure, serve cached
    /// data instead of the error.
    NetworkOtherwiseLocal,
}

/// Caller-selected policy for a single write or delete operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WritePolicy {
    /// Mutate the cache and enqueue a pending write; never call the
    /// network synchronously.
    ForceLocal,
    /// Call the network only; the cache and queue are untouched.
    ForceNetwork,
    /// Mutate the cache, then call the network; on failure enqueue a
    /// pending write and re-raise the error.
    LocalThenNetwork,
    /// Call the network first; mutate the cache only after success.
    NetworkThenLocal,
}

/// Operating mode of a store, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreMode {
    /// Network-only: no cache, no queue, no sync operations.
    Network,
    /// Cache-backed with immediate network writes.
    Cache,
    /// Offline-first: local writes with deferred sync.
    Sync,
}

impl StoreMode {
    /// Default read policy for stores of this mode.
    pub fn default_read_policy(&self) -> ReadPolicy {
        match self {
            StoreMode::Network => ReadPolicy::ForceNetwork,
            StoreMode::Cache => ReadPolicy::Both,
            StoreMode::Sync => ReadPolicy::ForceLocal,
        }
    }

    /// Default write policy for stores of this mode.
    pub fn default_write_policy(&self) -> WritePolicy {
        match self {
            StoreMode::Network => WritePolicy::ForceNetwork,
            StoreMode::Cache => WritePolicy::LocalThenNetwork,
            StoreMode::Sync => WritePolicy::ForceLocal,
        }
    }

    /// Returns true if pull/push/sync operations are valid for this
    /// mode.
    pub fn supports_sync(&self) -> bool {
        !matches!(self, StoreMode::Network)
    }
}

/// The resolved plan for one read call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadPlan {
    /// Serve from the cache.
    Cache,
    /// Fetch from the network and refresh the cache.
    Network,
    /// Fetch from the network; serve the cache if the network fails.
    NetworkWithCacheFallback,
}

/// Maps a read policy and the cache's emptiness to an action plan.
pub fn plan_read(policy: ReadPolicy, cache_empty: bool) -> ReadPlan {
    match policy {
        ReadPolicy::ForceLocal => ReadPlan::Cache,
        ReadPolicy::ForceNetwork => ReadPlan::Network,
        ReadPolicy::Both => {
            if cache_empty {
                ReadPlan::Network
            } else {
                ReadPlan::Cache
            }
        }
        ReadPolicy::NetworkOtherwiseLocal => ReadPlan::NetworkWithCacheFallback,
    }
}

/// When a write's pending action is enqueued.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueRule {
    /// Never enqueue.
    Never,
    /// Always enqueue, alongside the cache mutation.
    Always,
    /// Enqueue only when the network call fails.
    OnNetworkFailure,
}

/// The resolved plan for one write call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WritePlan {
    /// Whether the cache is mutated before any network call.
    pub mutate_cache_first: bool,
    /// Whether a synchronous network call is made.
    pub call_network: bool,
    /// When a pending write action is enqueued.
    pub enqueue: EnqueueRule,
}

/// Maps a write policy to an action plan.
pub fn plan_write(policy: WritePolicy) -> WritePlan {
    match policy {
        WritePolicy::ForceLocal => WritePlan {
            mutate_cache_first: true,
            call_network: false,
            enqueue: EnqueueRule::Always,
        },
        WritePolicy::ForceNetwork => WritePlan {
            mutate_cache_first: false,
            call_network: true,
            enqueue: EnqueueRule::Never,
        },
        WritePolicy::LocalThenNetwork => WritePlan {
            mutate_cache_first: true,
            call_network: true,
            enqueue: EnqueueRule::OnNetworkFailure,
        },
        WritePolicy::NetworkThenLocal => WritePlan {
            mutate_cache_first: false,
            call_network: true,
            enqueue: EnqueueRule::Never,
        },
    }
}
