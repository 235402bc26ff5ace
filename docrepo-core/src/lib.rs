//! A document repository layer with soft-delete semantics and querystring-driven query options.
//!
//! This crate is the core of the docrepo project and provides:
//!
//! - **Query options** ([`options`]) - Translation of querystring filter/sort/projection descriptors
//! - **Query primitives** ([`query`]) - Operator vocabulary, sort specifications and find requests
//! - **Repository** ([`repository`]) - Create/get/query/update/delete with soft-delete visibility
//! - **Records** ([`record`]) - Stored documents with explicit field presence
//! - **Document descriptors** ([`schema`]) - Field declarations used to validate writes
//! - **Value normalization** ([`normalize`]) - Transport-friendly rendering of stored values
//! - **Store backend abstraction** ([`backend`]) - Traits for implementing storage backends
//! - **Document store** ([`store`]) - Owner of a backend that hands out repositories
//! - **Error handling** ([`error`]) - Error types and result types
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! let store = DocumentStore::new(InMemoryStore::new());
//! let exams = store.repository("Exam", DocumentSchema::permissive("ExamDocument"), "exams");
//!
//! let mut options = QueryOptions::default();
//! options.set_filters(None, Some(vec![FilterDescriptor::new("score", "ge", 50)]));
//! let passed = exams.query(&options, false).await?;
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_core;

pub mod backend;
pub mod error;
pub mod identifier;
pub mod normalize;
pub mod options;
pub mod query;
pub mod record;
pub mod repository;
pub mod schema;
pub mod store;
