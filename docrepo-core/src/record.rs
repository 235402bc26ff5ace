//! The record type returned by repository operations.
//!
//! A [`Record`] is a stored document split into its store-assigned identifier
//! and the remaining fields. Field presence is explicit: a field excluded by a
//! projection, or never stored, reads as [`FieldValue::NotSet`], which is
//! distinct from a stored `null`.

use bson::{Bson, Document, de::deserialize_from_bson, oid::ObjectId};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::{RepositoryError, RepositoryResult},
    normalize::{STORE_ID_FIELD, normalize_document},
    schema::DELETED_AT_FIELD,
};

/// The presence state of one field on a [`Record`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldValue<'a> {
    /// The field was returned by the store.
    Set(&'a Bson),
    /// The field was not returned, either because it is not stored or because
    /// the query's projection excluded it.
    NotSet,
}

impl<'a> FieldValue<'a> {
    pub fn is_set(&self) -> bool {
        matches!(self, FieldValue::Set(_))
    }

    pub fn is_not_set(&self) -> bool {
        !self.is_set()
    }

    pub fn as_bson(&self) -> Option<&'a Bson> {
        match self {
            FieldValue::Set(value) => Some(value),
            FieldValue::NotSet => None,
        }
    }
}

/// A document as stored in a collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    id: ObjectId,
    fields: Document,
}

impl Record {
    pub fn new(id: ObjectId, fields: Document) -> Self {
        Self { id, fields }
    }

    /// Builds a record from a raw store document, which must carry an `ObjectId` `_id`.
    pub fn from_document(mut document: Document) -> RepositoryResult<Self> {
        let id = match document.remove(STORE_ID_FIELD) {
            Some(Bson::ObjectId(id)) => id,
            Some(other) => {
                return Err(RepositoryError::Serialization(format!(
                    "expected ObjectId identifier, got {:?}",
                    other.element_type(),
                )));
            }
            None => {
                return Err(RepositoryError::Serialization(
                    "stored document has no identifier".to_string(),
                ));
            }
        };

        Ok(Self { id, fields: document })
    }

    /// The store-assigned identifier.
    pub fn id(&self) -> ObjectId {
        self.id
    }

    pub fn get(&self, field: &str) -> FieldValue<'_> {
        match self.fields.get(field) {
            Some(value) => FieldValue::Set(value),
            None => FieldValue::NotSet,
        }
    }

    /// All returned fields except the identifier.
    pub fn fields(&self) -> &Document {
        &self.fields
    }

    /// The soft-delete timestamp, if the record carries a date-typed `deleted_at`.
    pub fn deleted_at(&self) -> Option<chrono::DateTime<Utc>> {
        match self.fields.get(DELETED_AT_FIELD) {
            Some(Bson::DateTime(dt)) => Some(dt.to_chrono()),
            _ => None,
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at().is_some()
    }

    /// The record in store form, `_id` first.
    pub fn to_document(&self) -> Document {
        let mut document = Document::new();
        document.insert(STORE_ID_FIELD, self.id);
        for (key, value) in &self.fields {
            document.insert(key.clone(), value.clone());
        }
        document
    }

    /// The record in outward form: identifier exposed as `id` and values normalized.
    pub fn normalized(&self) -> Document {
        normalize_document(&self.to_document())
    }

    pub fn to_json(&self) -> Value {
        Bson::Document(self.normalized()).into_relaxed_extjson()
    }

    /// Deserializes the stored form into a caller-defined type.
    ///
    /// Fields excluded by a projection are absent, so the target type should
    /// model them as `Option`.
    pub fn decode<T: DeserializeOwned>(&self) -> RepositoryResult<T> {
        Ok(deserialize_from_bson(Bson::Document(self.to_document()))?)
    }
}

impl TryFrom<Document> for Record {
    type Error = RepositoryError;

    fn try_from(document: Document) -> Result<Self, Self::Error> {
        Record::from_document(document)
    }
}
