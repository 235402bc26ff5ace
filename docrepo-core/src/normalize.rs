//! Normalization of stored values for outward exposure.
//!
//! Store-native types are rewritten into transport-friendly ones:
//!
//! - `ObjectId` and UUID binaries render as their canonical string form
//! - BSON date-times render as UTC ISO-8601 strings with millisecond precision
//! - BSON replication timestamps become ordinary BSON date-times
//! - arrays are normalized element-wise, recursively
//!
//! Everything else passes through unchanged. The store's `_id` key is renamed
//! to `id` on whole documents.

use bson::{Binary, Bson, DateTime, Document, Timestamp, Uuid, spec::BinarySubtype};
use chrono::{SecondsFormat, Utc};

/// The store's internal identifier key.
pub const STORE_ID_FIELD: &str = "_id";
/// The identifier key exposed on normalized documents.
pub const PUBLIC_ID_FIELD: &str = "id";

/// Formats a UTC timestamp as ISO-8601 with millisecond precision, e.g.
/// `2024-03-01T12:30:00.250+00:00`.
pub fn format_datetime(value: &chrono::DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, false)
}

/// Normalizes a single value, recursing into arrays.
pub fn normalize_value(value: &Bson) -> Bson {
    match value {
        Bson::ObjectId(oid) => Bson::String(oid.to_hex()),
        Bson::DateTime(dt) => Bson::String(format_datetime(&dt.to_chrono())),
        Bson::Timestamp(ts) => Bson::DateTime(timestamp_to_datetime(ts)),
        Bson::Binary(binary) => match binary_uuid(binary) {
            Some(uuid) => Bson::String(uuid.to_string()),
            None => value.clone(),
        },
        Bson::Array(items) => Bson::Array(
            items
                .iter()
                .map(normalize_value)
                .collect()
        ),
        _ => value.clone(),
    }
}

/// Normalizes every top-level value of a document and renames `_id` to `id`.
pub fn normalize_document(document: &Document) -> Document {
    document
        .iter()
        .map(|(key, value)| {
            let key = match key.as_str() {
                STORE_ID_FIELD => PUBLIC_ID_FIELD.to_string(),
                _ => key.clone(),
            };
            let normalized = normalize_value(value);
            tracing::trace!(key = %key, original = %value, normalized = %normalized, "normalized field");

            (key, normalized)
        })
        .collect()
}

fn timestamp_to_datetime(ts: &Timestamp) -> DateTime {
    DateTime::from_millis(i64::from(ts.time) * 1000)
}

fn binary_uuid(binary: &Binary) -> Option<Uuid> {
    if binary.subtype != BinarySubtype::Uuid {
        return None;
    }

    let bytes: [u8; 16] = binary.bytes.as_slice().try_into().ok()?;
    Some(Uuid::from_bytes(bytes))
}
