//! Document store seam.
//!
//! DESIGN
//! ======
//! The hosted document database is consumed through `DocumentStore`, a small
//! async trait shaped after the operations the app actually uses: point reads,
//! ordered/limited queries with equality filters, single-document writes,
//! atomic write batches, and live queries. Documents are schemaless JSON
//! objects; typed models live in `crate::model` and convert at the edges.
//!
//! CONSISTENCY
//! ===========
//! No transactions are offered. Concurrent writers get last-write-wins per
//! document, and a live query always reflects the store's latest committed
//! state.

pub mod memory;

use std::cmp::Ordering;

use rand::Rng;
use serde_json::{Map, Value};
use tokio::sync::mpsc;

pub use memory::MemoryStore;

/// Field map of a single document.
pub type Fields = Map<String, Value>;

const AUTO_ID_LEN: usize = 20;
const AUTO_ID_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by document store operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The targeted document does not exist.
    #[error("document not found: {collection}/{id}")]
    NotFound { collection: String, id: String },

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store refused the operation for the current identity.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// A live query was terminated by the store.
    #[error("listener closed: {0}")]
    ListenerClosed(String),

    /// A document could not be converted to or from its typed model.
    #[error("malformed document {id}: {reason}")]
    Malformed { id: String, reason: String },
}

// =============================================================================
// DOCUMENTS & QUERIES
// =============================================================================

/// A stored document: its id plus field map.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// A collection query: equality filters, optional ordering, optional limit.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub collection: String,
    pub filters: Vec<(String, Value)>,
    pub order_by: Option<(String, Direction)>,
    pub limit: Option<usize>,
}

impl Query {
    #[must_use]
    pub fn collection(name: impl Into<String>) -> Self {
        Self { collection: name.into(), filters: Vec::new(), order_by: None, limit: None }
    }

    #[must_use]
    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push((field.into(), value.into()));
        self
    }

    #[must_use]
    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some((field.into(), direction));
        self
    }

    #[must_use]
    pub fn limit(mut self, n: usize) -> Self {
        self.limit = Some(n);
        self
    }

    /// Whether `fields` satisfies every equality filter.
    ///
    /// A missing field matches a `null` filter value.
    #[must_use]
    pub fn matches(&self, fields: &Fields) -> bool {
        self.filters
            .iter()
            .all(|(field, want)| fields.get(field).unwrap_or(&Value::Null) == want)
    }

    /// Filter, order and limit `docs` according to this query.
    ///
    /// Ties on the ordering field are broken by document id so results are
    /// stable across snapshots.
    #[must_use]
    pub fn evaluate(&self, docs: impl IntoIterator<Item = Document>) -> Vec<Document> {
        let mut out: Vec<Document> = docs.into_iter().filter(|d| self.matches(&d.fields)).collect();
        match &self.order_by {
            Some((field, direction)) => out.sort_by(|a, b| {
                let primary = compare_values(
                    a.fields.get(field).unwrap_or(&Value::Null),
                    b.fields.get(field).unwrap_or(&Value::Null),
                );
                let ord = primary.then_with(|| a.id.cmp(&b.id));
                match direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            }),
            None => out.sort_by(|a, b| a.id.cmp(&b.id)),
        }
        if let Some(limit) = self.limit {
            out.truncate(limit);
        }
        out
    }
}

/// Total order over JSON values: null < bool < number < string < other.
fn compare_values(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }
    match (a, b) {
        (Value::Bool(x), Value::Bool(y)) => x.cmp(y),
        (Value::Number(x), Value::Number(y)) => {
            let x = x.as_f64().unwrap_or(0.0);
            let y = y.as_f64().unwrap_or(0.0);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        }
        (Value::String(x), Value::String(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

/// A point-in-time result of a live query.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub docs: Vec<Document>,
}

/// A single write inside an atomic batch.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    /// Create or replace a document.
    Set { collection: String, id: String, fields: Fields },
    /// Merge fields into an existing document.
    Update { collection: String, id: String, fields: Fields },
    /// Remove a document. Deleting a missing document is not an error.
    Delete { collection: String, id: String },
}

/// Receiving end of a live query. Dropping it unsubscribes.
pub struct Listener {
    rx: mpsc::UnboundedReceiver<Result<Snapshot, StoreError>>,
}

impl Listener {
    #[must_use]
    pub fn new(rx: mpsc::UnboundedReceiver<Result<Snapshot, StoreError>>) -> Self {
        Self { rx }
    }

    /// Wait for the next snapshot. `None` means the store dropped the query.
    pub async fn next(&mut self) -> Option<Result<Snapshot, StoreError>> {
        self.rx.recv().await
    }

    /// Return an already-delivered snapshot without waiting.
    pub fn try_next(&mut self) -> Option<Result<Snapshot, StoreError>> {
        self.rx.try_recv().ok()
    }
}

// =============================================================================
// STORE TRAIT
// =============================================================================

/// Async access to the hosted document database. Enables in-memory use in tests.
#[async_trait::async_trait]
pub trait DocumentStore: Send + Sync {
    /// Read one document, `None` when absent.
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError>;

    /// One-shot query.
    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError>;

    /// Create a document with a store-generated id and return the id.
    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError>;

    /// Create or replace a document at a known id.
    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Merge `fields` into an existing document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] when the document does not exist.
    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError>;

    /// Remove a document.
    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError>;

    /// Apply all writes atomically: either every write lands or none does.
    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError>;

    /// Open a live query. The first snapshot is delivered immediately.
    async fn listen(&self, query: Query) -> Result<Listener, StoreError>;
}

/// Generate a 20-character alphanumeric document id.
#[must_use]
pub fn generate_id() -> String {
    let mut rng = rand::rng();
    (0..AUTO_ID_LEN)
        .map(|_| {
            let idx = rng.random_range(0..AUTO_ID_ALPHABET.len());
            AUTO_ID_ALPHABET[idx] as char
        })
        .collect()
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
