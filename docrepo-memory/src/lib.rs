//! In-memory document storage backend for docrepo.
//!
//! This crate provides a thread-safe, in-memory implementation of the `StoreBackend` trait.
//! It uses async-aware read-write locks for concurrent access and evaluates the same
//! Mongo-shaped filter documents a server-backed store would, which makes it suited
//! to development and tests.
//!
//! # Features
//!
//! - **Thread-safe access** - Concurrent reads and writes using async-aware RwLock
//! - **Filter evaluation** - Field operators plus `$and`, `$or` and `$nor`
//! - **Full query support** - Multi-key sorting, skip, limit and projection
//!
//! # Quick Start
//!
//! ```ignore
//! use docrepo::{prelude::*, memory::InMemoryStore};
//! use bson::doc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = DocumentStore::connect(InMemoryStore::builder()).await?;
//!     let users = store.repository("User", DocumentSchema::permissive("UserDocument"), "users");
//!
//!     let alice = users.create(doc! { "name": "Alice" }).await?;
//!     users.delete(alice.id(), false).await?;
//!
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_memory;

pub mod store;
pub mod evaluator;

pub use store::{InMemoryStore, InMemoryStoreBuilder};
