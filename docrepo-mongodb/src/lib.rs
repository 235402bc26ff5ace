//! MongoDB backend implementation for docrepo.
//!
//! This crate provides a MongoDB-based implementation of the `StoreBackend` trait.
//! Filters composed by the repository are already Mongo-native documents, so they
//! are handed to the driver unchanged; partial updates and soft deletes are a single
//! `findOneAndUpdate` each.
//!
//! To use this backend, include the `mongodb` feature in your `Cargo.toml`:
//!
//! ```toml
//! [dependencies]
//! docrepo = { version = "x.y.z", features = ["mongodb"] }
//! ```
//!
//! # Connection
//!
//! Connection settings are given to the builder directly, or loaded from the
//! environment with [`MongoDbConfig::from_env`].
//!
//! # Example
//!
//! ```ignore
//! use docrepo::{prelude::*, mongodb::MongoDbConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = MongoDbConfig::from_env()?;
//!     let store = DocumentStore::connect(config.into_builder()).await?;
//!
//!     store.shutdown().await?;
//!     Ok(())
//! }
//! ```

#[allow(unused_extern_crates)]
extern crate self as docrepo_mongodb;

pub mod config;
pub mod store;

pub use config::{ConfigError, MongoDbConfig};
pub use store::{MongoDbStore, MongoDbStoreBuilder};
