//! In-process `DocumentStore`.
//!
//! DESIGN
//! ======
//! Collections are `BTreeMap`s of field maps behind a tokio `RwLock`. Live
//! queries are registrations holding the query and an unbounded sender;
//! after every committed write the affected collection's queries are
//! re-evaluated and pushed. A registration is dropped as soon as its receiver
//! is gone, so dropping a `Listener` is the unsubscribe.
//!
//! Fault injection (`set_offline`, `fail_listeners`) lets tests exercise the
//! error and reconnect paths of callers.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::{RwLock, mpsc};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{Document, DocumentStore, Fields, Listener, Query, Snapshot, StoreError, Write, generate_id};

type Collection = BTreeMap<String, Fields>;

struct Registration {
    query: Query,
    tx: mpsc::UnboundedSender<Result<Snapshot, StoreError>>,
}

#[derive(Default)]
struct Inner {
    collections: RwLock<HashMap<String, Collection>>,
    listeners: Mutex<HashMap<Uuid, Registration>>,
    offline: AtomicBool,
}

/// Shared in-memory store. Clones share the same data.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// While offline every operation fails with [`StoreError::Unavailable`].
    pub fn set_offline(&self, offline: bool) {
        self.inner.offline.store(offline, Ordering::SeqCst);
    }

    /// Terminate every open live query with `reason`.
    pub fn fail_listeners(&self, reason: &str) {
        let drained: Vec<Registration> = match self.inner.listeners.lock() {
            Ok(mut map) => map.drain().map(|(_, reg)| reg).collect(),
            Err(_) => return,
        };
        warn!(count = drained.len(), %reason, "terminating live queries");
        for reg in drained {
            let _ = reg.tx.send(Err(StoreError::ListenerClosed(reason.to_string())));
        }
    }

    /// Number of live queries whose receiver is still open.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner
            .listeners
            .lock()
            .map(|mut map| {
                map.retain(|_, reg| !reg.tx.is_closed());
                map.len()
            })
            .unwrap_or(0)
    }

    /// Number of documents currently in `collection`.
    pub async fn count(&self, collection: &str) -> usize {
        self.inner
            .collections
            .read()
            .await
            .get(collection)
            .map_or(0, BTreeMap::len)
    }

    fn check_online(&self) -> Result<(), StoreError> {
        if self.inner.offline.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("store is offline".into()));
        }
        Ok(())
    }

    async fn snapshot_for(&self, query: &Query) -> Snapshot {
        let collections = self.inner.collections.read().await;
        evaluate(&collections, query)
    }

    /// Push fresh snapshots to every live query on the touched collections.
    ///
    /// Called with the collections lock held so snapshots reach each listener
    /// in commit order.
    fn notify_locked(&self, collections: &HashMap<String, Collection>, touched: &[String]) {
        let Ok(mut map) = self.inner.listeners.lock() else {
            return;
        };
        map.retain(|id, reg| {
            if !touched.contains(&reg.query.collection) {
                return !reg.tx.is_closed();
            }
            let delivered = reg.tx.send(Ok(evaluate(collections, &reg.query))).is_ok();
            if !delivered {
                debug!(listener = %id, collection = %reg.query.collection, "listener dropped; unregistering");
            }
            delivered
        });
    }
}

fn evaluate(collections: &HashMap<String, Collection>, query: &Query) -> Snapshot {
    let docs = collections.get(&query.collection).map(|c| {
        c.iter()
            .map(|(id, fields)| Document { id: id.clone(), fields: fields.clone() })
            .collect::<Vec<_>>()
    });
    Snapshot { docs: query.evaluate(docs.unwrap_or_default()) }
}

fn apply_write(collections: &mut HashMap<String, Collection>, write: Write) -> Result<String, StoreError> {
    match write {
        Write::Set { collection, id, fields } => {
            collections.entry(collection.clone()).or_default().insert(id, fields);
            Ok(collection)
        }
        Write::Update { collection, id, fields } => {
            let doc = collections
                .get_mut(&collection)
                .and_then(|c| c.get_mut(&id))
                .ok_or_else(|| StoreError::NotFound { collection: collection.clone(), id: id.clone() })?;
            for (key, value) in fields {
                doc.insert(key, value);
            }
            Ok(collection)
        }
        Write::Delete { collection, id } => {
            if let Some(c) = collections.get_mut(&collection) {
                c.remove(&id);
            }
            Ok(collection)
        }
    }
}

#[async_trait::async_trait]
impl DocumentStore for MemoryStore {
    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>, StoreError> {
        self.check_online()?;
        let collections = self.inner.collections.read().await;
        Ok(collections
            .get(collection)
            .and_then(|c| c.get(id))
            .map(|fields| Document { id: id.to_string(), fields: fields.clone() }))
    }

    async fn query(&self, query: &Query) -> Result<Vec<Document>, StoreError> {
        self.check_online()?;
        Ok(self.snapshot_for(query).await.docs)
    }

    async fn add(&self, collection: &str, fields: Fields) -> Result<String, StoreError> {
        let id = generate_id();
        self.set(collection, &id, fields).await?;
        Ok(id)
    }

    async fn set(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.commit(vec![Write::Set { collection: collection.to_string(), id: id.to_string(), fields }])
            .await
    }

    async fn update(&self, collection: &str, id: &str, fields: Fields) -> Result<(), StoreError> {
        self.commit(vec![Write::Update { collection: collection.to_string(), id: id.to_string(), fields }])
            .await
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<(), StoreError> {
        self.commit(vec![Write::Delete { collection: collection.to_string(), id: id.to_string() }])
            .await
    }

    async fn commit(&self, writes: Vec<Write>) -> Result<(), StoreError> {
        self.check_online()?;
        let mut collections = self.inner.collections.write().await;

        // Stage on copies of the touched collections so a failing write
        // leaves the store untouched.
        let mut staged: HashMap<String, Collection> = HashMap::new();
        for write in &writes {
            let (Write::Set { collection, .. } | Write::Update { collection, .. } | Write::Delete { collection, .. }) =
                write;
            if !staged.contains_key(collection) {
                staged.insert(collection.clone(), collections.get(collection).cloned().unwrap_or_default());
            }
        }

        let mut touched: Vec<String> = Vec::new();
        for write in writes {
            let name = apply_write(&mut staged, write)?;
            if !touched.contains(&name) {
                touched.push(name);
            }
        }
        collections.extend(staged);
        self.notify_locked(&collections, &touched);
        Ok(())
    }

    async fn listen(&self, query: Query) -> Result<Listener, StoreError> {
        self.check_online()?;
        let (tx, rx) = mpsc::unbounded_channel();
        // Register under the read lock so no commit lands between the initial
        // snapshot and the registration.
        let collections = self.inner.collections.read().await;
        let _ = tx.send(Ok(evaluate(&collections, &query)));
        let id = Uuid::new_v4();
        debug!(listener = %id, collection = %query.collection, "live query opened");
        if let Ok(mut map) = self.inner.listeners.lock() {
            map.insert(id, Registration { query, tx });
        }
        Ok(Listener::new(rx))
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
