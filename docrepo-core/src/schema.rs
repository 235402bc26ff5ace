//! Document descriptors and validation.
//!
//! A [`DocumentSchema`] declares the fields a stored document may carry: their
//! types, whether they are required, numeric bounds and defaults. The
//! repository validates data against it before anything reaches the store.

use bson::{Bson, Document};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    error::{RepositoryError, RepositoryResult},
    normalize::STORE_ID_FIELD,
};

/// The soft-delete marker field. Always permitted, never declared.
pub const DELETED_AT_FIELD: &str = "deleted_at";

/// Field types supported in descriptors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    String,
    /// 32 or 64 bit integer
    Int,
    /// Any number, integers included
    Float,
    Bool,
    DateTime,
    ObjectId,
    Array,
    Document,
    Any,
}

impl FieldType {
    fn accepts(&self, value: &Bson) -> bool {
        match self {
            FieldType::String => matches!(value, Bson::String(_)),
            FieldType::Int => matches!(value, Bson::Int32(_) | Bson::Int64(_)),
            FieldType::Float => matches!(value, Bson::Double(_) | Bson::Int32(_) | Bson::Int64(_)),
            FieldType::Bool => matches!(value, Bson::Boolean(_)),
            FieldType::DateTime => matches!(value, Bson::DateTime(_)),
            FieldType::ObjectId => matches!(value, Bson::ObjectId(_)),
            FieldType::Array => matches!(value, Bson::Array(_)),
            FieldType::Document => matches!(value, Bson::Document(_)),
            FieldType::Any => true,
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::String => write!(f, "String"),
            FieldType::Int => write!(f, "Int"),
            FieldType::Float => write!(f, "Float"),
            FieldType::Bool => write!(f, "Bool"),
            FieldType::DateTime => write!(f, "DateTime"),
            FieldType::ObjectId => write!(f, "ObjectId"),
            FieldType::Array => write!(f, "Array"),
            FieldType::Document => write!(f, "Document"),
            FieldType::Any => write!(f, "Any"),
        }
    }
}

/// Declaration of one field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    /// Inclusive lower bound for numeric values.
    pub min: Option<f64>,
    /// Inclusive upper bound for numeric values.
    pub max: Option<f64>,
    /// Value filled in on create when the field is absent.
    pub default: Option<Bson>,
}

impl FieldDef {
    /// Create a new required field definition.
    pub fn required(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            min: None,
            max: None,
            default: None,
        }
    }

    /// Create a new optional field definition.
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: false,
            ..Self::required(name, field_type)
        }
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.max = Some(max);
        self
    }

    pub fn with_default(mut self, default: impl Into<Bson>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Validate a value (or its absence) against this declaration.
    pub fn validate(&self, value: Option<&Bson>) -> RepositoryResult<()> {
        match value {
            None | Some(Bson::Null) if self.required => Err(RepositoryError::Validation(
                format!("field '{}' is required", self.name),
            )),
            None | Some(Bson::Null) => Ok(()),
            Some(value) => {
                self.validate_type(value)?;
                self.validate_bounds(value)
            }
        }
    }

    fn validate_type(&self, value: &Bson) -> RepositoryResult<()> {
        if self.field_type.accepts(value) {
            return Ok(());
        }

        Err(RepositoryError::Validation(format!(
            "field '{}' expected {}, got {:?}",
            self.name,
            self.field_type,
            value.element_type(),
        )))
    }

    fn validate_bounds(&self, value: &Bson) -> RepositoryResult<()> {
        let number = match value {
            Bson::Int32(v) => f64::from(*v),
            Bson::Int64(v) => *v as f64,
            Bson::Double(v) => *v,
            _ => return Ok(()),
        };

        if let Some(min) = self.min.filter(|min| number < *min) {
            return Err(RepositoryError::Validation(format!(
                "field '{}' value {} is below minimum {}",
                self.name, number, min,
            )));
        }
        if let Some(max) = self.max.filter(|max| number > *max) {
            return Err(RepositoryError::Validation(format!(
                "field '{}' value {} is above maximum {}",
                self.name, number, max,
            )));
        }

        Ok(())
    }
}

/// The store-document descriptor a repository is bound to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentSchema {
    /// Descriptor name, used in logs.
    pub name: String,
    pub fields: Vec<FieldDef>,
    /// Reject fields that are not declared.
    pub strict: bool,
}

impl DocumentSchema {
    /// Create a non-strict descriptor.
    pub fn new(name: impl Into<String>, fields: Vec<FieldDef>) -> Self {
        Self {
            name: name.into(),
            fields,
            strict: false,
        }
    }

    /// A descriptor that declares nothing and accepts any document.
    pub fn permissive(name: impl Into<String>) -> Self {
        Self::new(name, Vec::new())
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|field| field.name == name)
    }

    /// Validate a complete document for insertion, filling in declared defaults.
    pub fn validate(&self, mut data: Document) -> RepositoryResult<Document> {
        for field in &self.fields {
            if !data.contains_key(&field.name) {
                if let Some(default) = &field.default {
                    data.insert(field.name.clone(), default.clone());
                }
            }
            field.validate(data.get(&field.name))?;
        }
        self.check_undeclared(&data)?;

        Ok(data)
    }

    /// Validate a set of field changes. Only the listed fields are checked.
    pub fn validate_partial(&self, changes: &Document) -> RepositoryResult<()> {
        for (key, value) in changes {
            if let Some(field) = self.field(key) {
                field.validate(Some(value))?;
            }
        }

        self.check_undeclared(changes)
    }

    fn check_undeclared(&self, data: &Document) -> RepositoryResult<()> {
        if !self.strict {
            return Ok(());
        }

        match data
            .keys()
            .find(|key| {
                key.as_str() != STORE_ID_FIELD
                    && key.as_str() != DELETED_AT_FIELD
                    && self.field(key).is_none()
            })
        {
            Some(key) => Err(RepositoryError::Validation(format!(
                "field '{}' is not declared by {}",
                key, self.name,
            ))),
            None => Ok(()),
        }
    }
}
