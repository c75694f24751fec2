//! # Tidemark Filter
//!
//! Backend-agnostic query representation for tidemark stores.
//!
//! This crate provides:
//! - A small tagged-union filter AST ([`Filter`])
//! - Query shaping with skip/limit/sort ([`Query`])
//! - Local predicate evaluation against JSON documents
//! - The [`FilterTranslator`] seam that turns a query into a backend
//!   filter string and a normalized fingerprint
//!
//! The AST is deliberately backend-agnostic: the local cache evaluates it
//! directly, while each network backend pairs the AST with its own
//! translator. The default [`MongoTranslator`] produces Mongo-style JSON
//! filter strings.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod ast;
mod error;
mod eval;
mod translate;

pub use ast::{Filter, Query, SortOrder};
pub use error::{FilterError, FilterResult};
pub use eval::select;
pub use translate::{FilterTranslator, MongoTranslator};
