//! Typed document models and their conversion to and from store fields.
//!
//! Field names follow the stored camelCase layout. Ids are never stored as
//! fields; they travel on `Document::id` and are attached after decoding.

pub mod folder;
pub mod message;
pub mod profile;

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::store::{Document, Fields, StoreError};

pub use folder::Folder;
pub use message::{Attachment, FileMeta, Message, MessageKind, Reaction, ReplyRef};
pub use profile::Profile;

/// Current time as milliseconds since Unix epoch.
#[must_use]
pub fn now_ms() -> i64 {
    let Ok(dur) = SystemTime::now().duration_since(UNIX_EPOCH) else {
        return 0;
    };
    i64::try_from(dur.as_millis()).unwrap_or(0)
}

/// Decode a document's fields into `T`.
///
/// # Errors
///
/// Returns [`StoreError::Malformed`] when the fields do not fit `T`.
pub fn decode<T: DeserializeOwned>(doc: &Document) -> Result<T, StoreError> {
    serde_json::from_value(Value::Object(doc.fields.clone()))
        .map_err(|e| StoreError::Malformed { id: doc.id.clone(), reason: e.to_string() })
}

/// Encode `value` as a field map.
///
/// # Errors
///
/// Returns [`StoreError::Malformed`] when `value` does not serialize to an object.
pub fn encode<T: Serialize>(value: &T) -> Result<Fields, StoreError> {
    match serde_json::to_value(value) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(other) => Err(StoreError::Malformed { id: String::new(), reason: format!("expected object, got {other}") }),
        Err(e) => Err(StoreError::Malformed { id: String::new(), reason: e.to_string() }),
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
