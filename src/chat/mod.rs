//! Chat view core.
//!
//! DESIGN
//! ======
//! `state` is a reducer over two kinds of events: local intents (compose,
//! menus, optimistic writes) and remote snapshots from `feed`. `ops` performs
//! the store writes and drives the reducer through pending/acked/failed
//! events. `gesture` turns raw touches into intents. `session` owns all of it
//! for one mounted chat view.
//!
//! CONFLICTS
//! =========
//! Writes are not transactional. Two participants editing the same message
//! get last-write-wins at the store. Once a local write is acknowledged, the
//! first snapshot that shows either the written value or a newer one replaces
//! its overlay; snapshots older than the write do not.

pub mod feed;
pub mod gesture;
pub mod ops;
pub mod preview;
pub mod profiles;
pub mod reactions;
pub mod session;
pub mod state;

use crate::store::StoreError;

/// Collection holding chat messages.
pub const MESSAGES: &str = "messages";

/// Errors produced by chat operations.
#[derive(Debug, thiserror::Error)]
pub enum ChatError {
    /// Neither text nor an attachment was provided.
    #[error("message is empty")]
    EmptyMessage,

    /// The attachment is too large to inline.
    #[error("attachment too large: {size} bytes (max {max})")]
    AttachmentTooLarge { size: usize, max: usize },

    /// A send is already in flight.
    #[error("a message is already being sent")]
    SendInProgress,

    /// Only the author may edit or delete a message.
    #[error("only the author can modify message {0}")]
    NotAuthor(String),

    /// The message is not in the current window.
    #[error("unknown message: {0}")]
    UnknownMessage(String),

    /// Delete was attempted without the confirmation step.
    #[error("delete of message {0} was not confirmed")]
    NotConfirmed(String),

    /// The underlying store operation failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}
