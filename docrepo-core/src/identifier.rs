//! Conversion of caller-supplied identifiers into the store's native `ObjectId`.

use bson::oid::ObjectId;

use crate::error::{RepositoryError, RepositoryResult};

/// Anything that can name a record: a native `ObjectId` or its 24-character hex form.
pub trait Identifier {
    fn to_object_id(&self) -> RepositoryResult<ObjectId>;
}

impl Identifier for ObjectId {
    fn to_object_id(&self) -> RepositoryResult<ObjectId> {
        Ok(*self)
    }
}

impl Identifier for &ObjectId {
    fn to_object_id(&self) -> RepositoryResult<ObjectId> {
        Ok(**self)
    }
}

impl Identifier for &str {
    fn to_object_id(&self) -> RepositoryResult<ObjectId> {
        ObjectId::parse_str(self)
            .map_err(|e| RepositoryError::InvalidIdentifier(format!("'{}': {}", self, e)))
    }
}

impl Identifier for String {
    fn to_object_id(&self) -> RepositoryResult<ObjectId> {
        self.as_str().to_object_id()
    }
}

impl Identifier for &String {
    fn to_object_id(&self) -> RepositoryResult<ObjectId> {
        self.as_str().to_object_id()
    }
}
