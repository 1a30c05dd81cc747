//! Live subscription to the latest message window.
//!
//! DESIGN
//! ======
//! A spawned task owns the store listener and forwards decoded snapshots as
//! [`FeedEvent`]s over a bounded channel. The session is the only consumer.
//!
//! Bursts of snapshots are coalesced: after one arrives the task waits for
//! the debounce interval and then keeps only the newest of whatever queued
//! up meanwhile.
//!
//! RECONNECT
//! =========
//! When the listener fails or closes, the task reports the error, sleeps
//! with exponential backoff (doubling up to `max_backoff_ms`) and opens a
//! new listener. A delivered snapshot resets the backoff.
//!
//! The task ends when the receiving side is dropped, and [`FeedHandle`]
//! aborts it on drop, which also drops the store listener.

#[cfg(test)]
#[path = "feed_test.rs"]
mod feed_test;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::MESSAGES;
use super::state::{ChatEvent, ConnectionStatus};
use crate::config::FeedConfig;
use crate::model::{Message, Profile};
use crate::store::{Direction, DocumentStore, Listener, Query, Snapshot, StoreError};

/// Capacity of the session event channel.
pub const FEED_CHANNEL_CAPACITY: usize = 64;

/// Everything the background tasks report to a chat session.
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    Status(ConnectionStatus),
    /// Decoded window, newest first.
    Snapshot(Vec<Message>),
    Error(String),
    /// Result of a profile lookup; `None` when missing or unreadable.
    Profile { uid: String, profile: Option<Profile> },
    /// A store write started by the session finished; carries the event that
    /// settles its optimistic state.
    Settled(ChatEvent),
}

/// Owns the feed task. Dropping it tears the subscription down.
pub struct FeedHandle {
    task: JoinHandle<()>,
}

impl FeedHandle {
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for FeedHandle {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// The "latest messages" query: newest first, capped at `page_size`.
#[must_use]
pub fn message_query(page_size: usize) -> Query {
    Query::collection(MESSAGES)
        .order_by("createdAt", Direction::Descending)
        .limit(page_size)
}

/// Decode a snapshot, skipping documents that do not parse.
#[must_use]
pub fn decode_messages(snapshot: &Snapshot) -> Vec<Message> {
    snapshot
        .docs
        .iter()
        .filter_map(|doc| match Message::from_document(doc) {
            Ok(msg) => Some(msg),
            Err(e) => {
                warn!(id = %doc.id, error = %e, "skipping malformed message");
                None
            }
        })
        .collect()
}

pub fn spawn_message_feed(
    store: Arc<dyn DocumentStore>,
    config: FeedConfig,
    tx: mpsc::Sender<FeedEvent>,
) -> FeedHandle {
    FeedHandle { task: tokio::spawn(run_feed(store, config, tx)) }
}

enum PumpEnd {
    ReceiverGone,
    Failed(String),
}

async fn run_feed(store: Arc<dyn DocumentStore>, config: FeedConfig, tx: mpsc::Sender<FeedEvent>) {
    let mut backoff_ms = config.reconnect_backoff_ms;
    let mut status = ConnectionStatus::Connecting;
    loop {
        if tx.send(FeedEvent::Status(status)).await.is_err() {
            return;
        }
        status = ConnectionStatus::Reconnecting;

        let reason = match store.listen(message_query(config.page_size)).await {
            Ok(mut listener) => {
                info!(page_size = config.page_size, "message feed connected");
                if tx.send(FeedEvent::Status(ConnectionStatus::Connected)).await.is_err() {
                    return;
                }
                match pump(&mut listener, &config, &tx, &mut backoff_ms).await {
                    PumpEnd::ReceiverGone => return,
                    PumpEnd::Failed(reason) => reason,
                }
            }
            Err(e) => e.to_string(),
        };

        warn!(error = %reason, backoff_ms, "message feed interrupted");
        if tx.send(FeedEvent::Error(reason)).await.is_err() {
            return;
        }
        tokio::select! {
            () = tokio::time::sleep(Duration::from_millis(backoff_ms)) => {}
            () = tx.closed() => return,
        }
        backoff_ms = backoff_ms.saturating_mul(2).min(config.max_backoff_ms);
    }
}

async fn pump(
    listener: &mut Listener,
    config: &FeedConfig,
    tx: &mpsc::Sender<FeedEvent>,
    backoff_ms: &mut u64,
) -> PumpEnd {
    loop {
        let first = tokio::select! {
            next = listener.next() => next,
            () = tx.closed() => return PumpEnd::ReceiverGone,
        };
        let Some(first) = first else {
            return PumpEnd::Failed(StoreError::ListenerClosed("query dropped by store".into()).to_string());
        };

        if config.snapshot_debounce_ms > 0 {
            tokio::time::sleep(config.debounce()).await;
        }
        let mut latest: Option<Snapshot> = None;
        let mut failure: Option<StoreError> = None;
        let mut coalesced = 0usize;
        for item in std::iter::once(first).chain(std::iter::from_fn(|| listener.try_next())) {
            coalesced += 1;
            match item {
                Ok(snapshot) => latest = Some(snapshot),
                Err(e) => {
                    failure = Some(e);
                    break;
                }
            }
        }
        if coalesced > 1 {
            debug!(coalesced, "snapshot burst coalesced");
        }

        if let Some(snapshot) = latest {
            *backoff_ms = config.reconnect_backoff_ms;
            let messages = decode_messages(&snapshot);
            if tx.send(FeedEvent::Snapshot(messages)).await.is_err() {
                return PumpEnd::ReceiverGone;
            }
        }
        if let Some(e) = failure {
            return PumpEnd::Failed(e.to_string());
        }
    }
}
