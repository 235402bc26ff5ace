//! Connection settings loaded from environment variables.

use std::env;

use docrepo_core::error::RepositoryError;

use crate::store::MongoDbStoreBuilder;

pub const DEFAULT_DATABASE: &str = "docrepo";

/// MongoDB connection settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MongoDbConfig {
    /// Connection string
    pub uri: String,
    /// Database holding the repository collections
    pub database: String,
}

impl MongoDbConfig {
    /// Load configuration from `MONGODB_URI` and `MONGODB_DATABASE`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which resolves variable names to values.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let uri = lookup("MONGODB_URI")
            .filter(|uri| !uri.trim().is_empty())
            .ok_or(ConfigError::MissingUri)?;

        let database = lookup("MONGODB_DATABASE")
            .filter(|database| !database.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DATABASE.to_string());

        Ok(Self { uri, database })
    }

    pub fn into_builder(self) -> MongoDbStoreBuilder {
        MongoDbStoreBuilder::new(&self.uri, &self.database)
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("MONGODB_URI environment variable is required")]
    MissingUri,
}

impl From<ConfigError> for RepositoryError {
    fn from(err: ConfigError) -> Self {
        RepositoryError::Initialization(err.to_string())
    }
}
