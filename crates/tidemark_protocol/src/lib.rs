//! # Tidemark Protocol
//!
//! The network seam between tidemark stores and a remote document backend.
//!
//! This crate provides:
//! - The [`NetworkExecutor`] trait: plain CRUD, filtered reads, paged
//!   reads, multi-insert, delete-by-filter, and the delta-query variant
//!   returning changed/deleted sets since a timestamp
//! - Structured [`NetworkError`]s carrying an HTTP-style status, an error
//!   category, and the backend's raw code
//! - [`MockNetwork`], an in-memory backend with last-modified-time
//!   assignment, delete tombstones (so delta queries can be served),
//!   failure injection, and request counters for tests
//!
//! Implementations receive already-translated filter strings; the filter
//! AST and translator seam live in `tidemark_filter`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod executor;
mod mock;
pub mod time;
mod types;

pub use error::{ErrorCategory, NetworkError, NetworkResult};
pub use executor::NetworkExecutor;
pub use mock::MockNetwork;
pub use types::{
    DeletedRecord, DeleteResponse, DeltaResponse, IndexedNetworkError, MetadataRecord,
    MultiInsertResponse,
};
