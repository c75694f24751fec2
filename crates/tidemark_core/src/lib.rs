//! # Tidemark Core
//!
//! Local state for offline-first stores.
//!
//! This crate provides:
//! - The [`Entity`] trait and server metadata model ([`Metadata`], [`Acl`])
//! - The [`EntityCache`] seam with an in-memory implementation
//! - The FIFO [`SyncQueue`] of deferred write actions
//! - The [`QueryCache`] ledger tracking per-query delta-fetch state
//! - [`SessionContext`], the explicit session object owning the ledger
//! - The [`StoreError`] taxonomy shared across the workspace
//!
//! ## Key invariants
//!
//! - A cache never holds two records with the same entity ID
//! - Sync queue replay order equals enqueue order within a collection
//! - Last-modified times are fixed-width ISO-8601 strings whose
//!   lexicographic order equals chronological order

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod cache;
mod entity;
mod error;
mod query_cache;
mod session;
mod sync_queue;

pub use cache::{EntityCache, MemoryCache};
pub use entity::{
    generate_entity_id, generate_temp_id, is_temp_id, Acl, Entity, Metadata, TEMP_ID_PREFIX,
};
pub use error::{StoreError, StoreResult};
pub use query_cache::{QueryCache, QueryCacheItem};
pub use session::{SessionContext, MULTI_INSERT_MIN_API_VERSION};
pub use sync_queue::{PendingWriteAction, SyncQueue, WriteVerb};

pub use tidemark_protocol::time;
