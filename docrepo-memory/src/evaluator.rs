//! Filter evaluation for in-memory document matching.
//!
//! Filters are Mongo-shaped documents. Top-level keys are either field names,
//! whose condition is a literal (equality) or an operator document, or one of
//! the combinators `$and`, `$or` and `$nor`. Supported field operators are
//! `$eq $ne $gt $gte $lt $lte $in $nin $exists $not $type`.

use std::{cmp::Ordering, collections::HashMap};
use bson::{Bson, Document, datetime::DateTime, oid::ObjectId};

use docrepo_core::error::{RepositoryError, RepositoryResult};


/// Type-erased, comparable representation of BSON values.
///
/// Integers compare exactly as `i64`; a mix of integer and double compares as
/// f64, so `Int32(5)` equals `Double(5.0)`.
#[derive(Debug)]
pub(crate) enum Comparable<'a> {
    Null,
    Bool(bool),
    Integer(i64),
    Number(f64),
    DateTime(DateTime),
    String(&'a str),
    ObjectId(ObjectId),
    Array(Vec<Comparable<'a>>),
    Map(HashMap<&'a str, Comparable<'a>>),
    /// Any other BSON type, compared structurally.
    Other(&'a Bson),
}

impl<'a> From<&'a Bson> for Comparable<'a> {
    fn from(bson: &'a Bson) -> Self {
        match bson {
            Bson::Null => Comparable::Null,
            Bson::Boolean(value) => Comparable::Bool(*value),
            Bson::Int32(value) => Comparable::Integer(i64::from(*value)),
            Bson::Int64(value) => Comparable::Integer(*value),
            Bson::Double(value) => Comparable::Number(*value),
            Bson::DateTime(value) => Comparable::DateTime(*value),
            Bson::String(value) => Comparable::String(value),
            Bson::ObjectId(value) => Comparable::ObjectId(*value),
            Bson::Array(arr) => Comparable::Array(
                arr
                    .iter()
                    .map(Comparable::from)
                    .collect::<Vec<_>>()
            ),
            Bson::Document(doc) => Comparable::Map(
                doc
                    .iter()
                    .map(|(k, v)| (k.as_str(), Comparable::from(v)))
                    .collect::<HashMap<_, _>>()
            ),
            other => Comparable::Other(other),
        }
    }
}

impl<'a> Comparable<'a> {
    /// Rank of the value's type in the server's cross-type sort order:
    /// MinKey, null, numbers, strings, documents, arrays, binary, ObjectId,
    /// booleans, dates, timestamps, regular expressions, MaxKey.
    fn type_rank(&self) -> u8 {
        match self {
            Comparable::Other(Bson::MinKey) => 0,
            Comparable::Null | Comparable::Other(Bson::Undefined) => 1,
            Comparable::Integer(_) | Comparable::Number(_) | Comparable::Other(Bson::Decimal128(_)) => 2,
            Comparable::String(_) | Comparable::Other(Bson::Symbol(_)) => 3,
            Comparable::Map(_) => 4,
            Comparable::Array(_) => 5,
            Comparable::Other(Bson::Binary(_)) => 6,
            Comparable::ObjectId(_) => 7,
            Comparable::Bool(_) => 8,
            Comparable::DateTime(_) => 9,
            Comparable::Other(Bson::Timestamp(_)) => 10,
            Comparable::Other(Bson::RegularExpression(_)) => 11,
            Comparable::Other(Bson::MaxKey) => 13,
            Comparable::Other(_) => 12,
        }
    }

    /// Total order used for sorting: by type rank, then by value.
    pub(crate) fn sort_cmp(&self, other: &Self) -> Ordering {
        self.type_rank()
            .cmp(&other.type_rank())
            .then_with(|| self.partial_cmp(other).unwrap_or(Ordering::Equal))
    }
}

impl<'a> PartialEq for Comparable<'a> {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Comparable::Null, Comparable::Null) => true,
            (Comparable::Bool(a), Comparable::Bool(b)) => a == b,
            (Comparable::Integer(a), Comparable::Integer(b)) => a == b,
            (Comparable::Integer(a), Comparable::Number(b)) => (*a as f64) == *b,
            (Comparable::Number(a), Comparable::Integer(b)) => *a == (*b as f64),
            (Comparable::Number(a), Comparable::Number(b)) => a == b,
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a == b,
            (Comparable::String(a), Comparable::String(b)) => a == b,
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a == b,
            (Comparable::Array(a), Comparable::Array(b)) => a == b,
            (Comparable::Map(a), Comparable::Map(b)) => a == b,
            (Comparable::Other(a), Comparable::Other(b)) => a == b,
            _ => false,
        }
    }
}

impl<'a> PartialOrd for Comparable<'a> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Comparable::Bool(a), Comparable::Bool(b)) => a.partial_cmp(b),
            (Comparable::Integer(a), Comparable::Integer(b)) => a.partial_cmp(b),
            (Comparable::Integer(a), Comparable::Number(b)) => (*a as f64).partial_cmp(b),
            (Comparable::Number(a), Comparable::Integer(b)) => a.partial_cmp(&(*b as f64)),
            (Comparable::Number(a), Comparable::Number(b)) => a.partial_cmp(b),
            (Comparable::DateTime(a), Comparable::DateTime(b)) => a.partial_cmp(b),
            (Comparable::String(a), Comparable::String(b)) => a.partial_cmp(b),
            (Comparable::ObjectId(a), Comparable::ObjectId(b)) => a.partial_cmp(b),
            _ => None,
        }
    }
}


pub(crate) struct DocumentEvaluator<'a> {
    document: &'a Document,
}

impl<'a> DocumentEvaluator<'a> {
    pub fn new(document: &'a Document) -> Self {
        Self { document }
    }

    /// Returns `true` if the document satisfies every clause of `filter`.
    pub fn evaluate(&self, filter: &Document) -> RepositoryResult<bool> {
        for (key, condition) in filter {
            let matched = match key.as_str() {
                "$and" => {
                    let mut all = true;
                    for clause in clauses(key, condition)? {
                        if !self.evaluate(clause)? {
                            all = false;
                            break;
                        }
                    }
                    all
                },
                "$or" => {
                    let mut any = false;
                    for clause in clauses(key, condition)? {
                        if self.evaluate(clause)? {
                            any = true;
                            break;
                        }
                    }
                    any
                },
                "$nor" => {
                    let mut none = true;
                    for clause in clauses(key, condition)? {
                        if self.evaluate(clause)? {
                            none = false;
                            break;
                        }
                    }
                    none
                },
                op if op.starts_with('$') => return Err(unsupported(op)),
                field => matches_condition(self.document.get(field), condition)?,
            };

            if !matched {
                return Ok(false);
            }
        }

        Ok(true)
    }

    pub fn filter_documents(
        documents: impl IntoIterator<Item = &'a Document>,
        filter: &Document,
    ) -> RepositoryResult<Vec<&'a Document>> {
        let mut matched = Vec::new();

        for document in documents {
            if DocumentEvaluator::new(document).evaluate(filter)? {
                matched.push(document);
            }
        }

        Ok(matched)
    }
}

fn clauses<'f>(key: &str, condition: &'f Bson) -> RepositoryResult<Vec<&'f Document>> {
    condition
        .as_array()
        .ok_or_else(|| RepositoryError::Backend(format!("{} requires an array of filters", key)))?
        .iter()
        .map(|clause| {
            clause
                .as_document()
                .ok_or_else(|| RepositoryError::Backend(format!("{} clauses must be documents", key)))
        })
        .collect()
}

fn unsupported(op: &str) -> RepositoryError {
    RepositoryError::Backend(format!("unsupported query operator {}", op))
}

fn is_operator_document(condition: &Bson) -> Option<&Document> {
    match condition {
        Bson::Document(doc) if !doc.is_empty() && doc.keys().all(|k| k.starts_with('$')) => Some(doc),
        _ => None,
    }
}

fn matches_condition(value: Option<&Bson>, condition: &Bson) -> RepositoryResult<bool> {
    let Some(operators) = is_operator_document(condition) else {
        return Ok(equals(value, condition));
    };

    for (op, operand) in operators {
        if !apply_operator(value, op, operand)? {
            return Ok(false);
        }
    }

    Ok(true)
}

fn apply_operator(value: Option<&Bson>, op: &str, operand: &Bson) -> RepositoryResult<bool> {
    Ok(match op {
        "$eq" => equals(value, operand),
        "$ne" => !equals(value, operand),
        "$gt" | "$gte" | "$lt" | "$lte" => match value {
            Some(Bson::Array(items)) if !matches!(operand, Bson::Array(_)) => items
                .iter()
                .any(|item| in_range(op, item, operand)),
            Some(value) => in_range(op, value, operand),
            None => false,
        },
        "$in" => members(op, operand)?
            .iter()
            .any(|candidate| equals(value, candidate)),
        "$nin" => !members(op, operand)?
            .iter()
            .any(|candidate| equals(value, candidate)),
        "$exists" => value.is_some() == truthy(operand),
        "$not" => match operand {
            Bson::Document(_) => !matches_condition(value, operand)?,
            _ => return Err(RepositoryError::Backend("$not requires an operator document".to_string())),
        },
        "$type" => match value {
            Some(value) => has_type(value, operand)?,
            None => false,
        },
        other => return Err(unsupported(other)),
    })
}

/// Equality with array-element matching: an array field equals a scalar it contains.
fn equals(value: Option<&Bson>, operand: &Bson) -> bool {
    match value {
        None => matches!(operand, Bson::Null),
        Some(value) => {
            let left = Comparable::from(value);
            let right = Comparable::from(operand);

            if left == right {
                return true;
            }

            match (&left, &right) {
                (Comparable::Array(items), scalar) if !matches!(scalar, Comparable::Array(_)) => {
                    items.iter().any(|item| item == scalar)
                },
                _ => false,
            }
        },
    }
}

/// Applies a range operator to one value. Values of different types never match.
fn in_range(op: &str, value: &Bson, operand: &Bson) -> bool {
    Comparable::from(value)
        .partial_cmp(&Comparable::from(operand))
        .map(|ordering| match op {
            "$gt" => ordering == Ordering::Greater,
            "$gte" => ordering != Ordering::Less,
            "$lt" => ordering == Ordering::Less,
            _ => ordering != Ordering::Greater,
        })
        .unwrap_or(false)
}

fn members<'o>(op: &str, operand: &'o Bson) -> RepositoryResult<&'o Vec<Bson>> {
    operand
        .as_array()
        .ok_or_else(|| RepositoryError::Backend(format!("{} requires an array", op)))
}

fn truthy(operand: &Bson) -> bool {
    match operand {
        Bson::Boolean(b) => *b,
        Bson::Int32(n) => *n != 0,
        Bson::Int64(n) => *n != 0,
        Bson::Double(n) => *n != 0.0,
        Bson::Null => false,
        _ => true,
    }
}

fn has_type(value: &Bson, operand: &Bson) -> RepositoryResult<bool> {
    let alias = match operand {
        Bson::String(alias) => alias.as_str(),
        Bson::Int32(9) | Bson::Int64(9) => "date",
        Bson::Int32(2) | Bson::Int64(2) => "string",
        Bson::Int32(7) | Bson::Int64(7) => "objectId",
        Bson::Int32(10) | Bson::Int64(10) => "null",
        _ => return Err(RepositoryError::Backend(format!("unsupported $type operand {}", operand))),
    };

    Ok(match alias {
        "date" => matches!(value, Bson::DateTime(_)),
        "string" => matches!(value, Bson::String(_)),
        "objectId" => matches!(value, Bson::ObjectId(_)),
        "null" => matches!(value, Bson::Null),
        "bool" => matches!(value, Bson::Boolean(_)),
        "int" => matches!(value, Bson::Int32(_)),
        "long" => matches!(value, Bson::Int64(_)),
        "double" => matches!(value, Bson::Double(_)),
        "number" => matches!(value, Bson::Int32(_) | Bson::Int64(_) | Bson::Double(_)),
        "array" => matches!(value, Bson::Array(_)),
        "object" => matches!(value, Bson::Document(_)),
        "timestamp" => matches!(value, Bson::Timestamp(_)),
        other => return Err(RepositoryError::Backend(format!("unsupported $type alias {}", other))),
    })
}
