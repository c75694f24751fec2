//! # Tidemark Store
//!
//! Per-collection stores mediating between a local cache and a remote
//! document backend.
//!
//! This crate provides:
//! - [`DataStore`], the store facade: find/save/remove/count plus
//!   pull, push, sync, clear-cache, and purge
//! - Read/write policy engines with pure, I/O-free planning functions
//! - Delta-set reconciliation keyed by a per-query ledger, with a
//!   metadata-diff fallback
//! - Paged pulls through a bounded channel with a single cache-applying
//!   consumer
//!
//! ## Architecture
//!
//! A read or write call resolves its policy to a plan
//! ([`policy::plan_read`] / [`policy::plan_write`]), then executes the
//! plan against the cache, the sync queue, and the network executor.
//! Deferred writes land in the FIFO sync queue and are replayed by
//! [`DataStore::push`]; [`DataStore::sync`] composes push-then-pull.
//!
//! ## Key invariants
//!
//! - Usage errors surface before any I/O
//! - Cache-first writes stay locally durable when the network fails;
//!   the queued action is the recovery path
//! - Queue replay order equals enqueue order within a collection
//! - Pulled pages apply in completion order over disjoint partitions

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod delta;
pub mod policy;
mod pull;
mod push;
mod read;
mod store;
mod write;

pub use config::StoreConfig;
pub use policy::{ReadPolicy, StoreMode, WritePolicy};
pub use pull::PullResult;
pub use push::{PushError, PushResult};
pub use read::{ReadResult, ReadSource};
pub use store::{DataStore, DataStoreBuilder, SyncSummary};
pub use write::{IndexedError, MultiInsertResult};

pub use tidemark_core::{
    Entity, EntityCache, MemoryCache, Metadata, QueryCache, QueryCacheItem, SessionContext,
    StoreError, StoreResult, SyncQueue,
};
pub use tidemark_filter::{Filter, FilterError, FilterTranslator, MongoTranslator, Query, SortOrder};
