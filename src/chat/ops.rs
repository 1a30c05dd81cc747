//! Chat writes against the document store.
//!
//! Every write runs in two phases. A `prepare_*` function validates against
//! the current [`ChatState`] and applies the optimistic part synchronously
//! (`SendStarted`, or a `Pending` overlay). It returns a [`PendingWrite`]
//! that owns everything the store call needs and does not borrow the state,
//! so the caller can run it on a spawned task while the view keeps
//! processing input. [`PendingWrite::run`] performs the store call and
//! yields the [`ChatEvent`] that settles it.
//!
//! The `async` functions below chain both phases for callers that hold the
//! state for the whole round-trip.
//!
//! ERROR HANDLING
//! ==============
//! Validation failures return a [`ChatError`] without touching state. Store
//! failures are logged, surfaced as a notice through the settling event, and
//! returned so callers can react as well.

use serde_json::Value;
use tracing::{info, warn};

use super::reactions;
use super::state::{ChatEvent, ChatState, Compose, Delta, Field, SEND_FAILED_TEXT, UPDATE_FAILED_TEXT};
use super::{ChatError, MESSAGES};
use crate::auth::Identity;
use crate::model::message::MAX_INLINE_BYTES;
use crate::model::{Message, MessageKind, now_ms};
use crate::store::{DocumentStore, Fields, StoreError};

// =============================================================================
// PENDING WRITES
// =============================================================================

#[derive(Debug, Clone)]
enum WriteKind {
    Send { kind: MessageKind, fields: Fields },
    Update { id: String, field: Field, fields: Fields },
    Delete { id: String },
}

/// A store write whose optimistic part has already been applied.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    kind: WriteKind,
}

/// Result of running a [`PendingWrite`].
#[derive(Debug)]
pub struct WriteOutcome {
    /// Event that settles the optimistic state.
    pub event: ChatEvent,
    /// Id of the message written, or the store error.
    pub result: Result<String, StoreError>,
}

impl PendingWrite {
    /// Id of the message this write touches; `None` for a send.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        match &self.kind {
            WriteKind::Send { .. } => None,
            WriteKind::Update { id, .. } | WriteKind::Delete { id } => Some(id),
        }
    }

    /// Perform the store call.
    pub async fn run(self, store: &dyn DocumentStore) -> WriteOutcome {
        match self.kind {
            WriteKind::Send { kind, fields } => match store.add(MESSAGES, fields).await {
                Ok(id) => {
                    info!(id = %id, ?kind, "message sent");
                    WriteOutcome { event: ChatEvent::SendSucceeded, result: Ok(id) }
                }
                Err(e) => {
                    warn!(error = %e, "send failed");
                    WriteOutcome { event: ChatEvent::SendFailed(SEND_FAILED_TEXT.to_string()), result: Err(e) }
                }
            },
            WriteKind::Update { id, field, fields } => {
                let result = store.update(MESSAGES, &id, fields).await;
                settled(id, field, result)
            }
            WriteKind::Delete { id } => {
                let result = store.delete(MESSAGES, &id).await;
                if result.is_ok() {
                    info!(id = %id, "message deleted");
                }
                settled(id, Field::Deleted, result)
            }
        }
    }
}

fn settled(id: String, field: Field, result: Result<(), StoreError>) -> WriteOutcome {
    match result {
        Ok(()) => WriteOutcome { event: ChatEvent::WriteAcked { id: id.clone(), field }, result: Ok(id) },
        Err(e) => {
            warn!(id = %id, ?field, error = %e, "message write failed");
            WriteOutcome {
                event: ChatEvent::WriteFailed { id, field, error: UPDATE_FAILED_TEXT.to_string() },
                result: Err(e),
            }
        }
    }
}

/// Apply the settling event and hand back the store result.
///
/// # Errors
///
/// The store error carried by `outcome`.
pub fn settle(chat: &mut ChatState, outcome: WriteOutcome) -> Result<String, ChatError> {
    chat.apply(outcome.event);
    outcome.result.map_err(ChatError::from)
}

// =============================================================================
// SEND
// =============================================================================

/// Build the record for a send from the compose box.
///
/// # Errors
///
/// [`ChatError::EmptyMessage`] for blank text without an attachment,
/// [`ChatError::AttachmentTooLarge`] above the inline limit.
pub fn build_message(compose: &Compose, me: &Identity, now: i64) -> Result<Message, ChatError> {
    if compose.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    let file = match &compose.attachment {
        Some(att) if att.exceeds_inline_limit() => {
            return Err(ChatError::AttachmentTooLarge { size: att.bytes.len(), max: MAX_INLINE_BYTES });
        }
        Some(att) => Some(att.to_file_meta()),
        None => None,
    };
    let kind = compose.attachment.as_ref().map_or(MessageKind::Text, |a| a.kind());
    Ok(Message {
        id: String::new(),
        author: me.uid.clone(),
        author_email: Some(me.email.clone()).filter(|e| !e.is_empty()),
        content: compose.text.trim().to_string(),
        kind,
        file,
        reply_to: compose.reply_to.clone(),
        reactions: Vec::new(),
        edited: false,
        created_at: now,
        edited_at: None,
    })
}

/// Validate the compose box and mark the send as started.
///
/// # Errors
///
/// [`ChatError::SendInProgress`] while another send is running, or the
/// validation errors from [`build_message`].
pub fn prepare_send(chat: &mut ChatState, me: &Identity) -> Result<PendingWrite, ChatError> {
    if chat.sending {
        return Err(ChatError::SendInProgress);
    }
    let message = build_message(&chat.compose, me, now_ms())?;
    let fields = message.to_fields()?;
    chat.apply(ChatEvent::SendStarted);
    Ok(PendingWrite { kind: WriteKind::Send { kind: message.kind, fields } })
}

/// Send the compose box contents. Returns the new message id.
///
/// The compose box is cleared only after the store accepts the write.
///
/// # Errors
///
/// See [`prepare_send`], or the store error.
pub async fn send_message(store: &dyn DocumentStore, chat: &mut ChatState, me: &Identity) -> Result<String, ChatError> {
    let write = prepare_send(chat, me)?;
    settle(chat, write.run(store).await)
}

// =============================================================================
// EDIT / DELETE / REACT
// =============================================================================

fn own_message(chat: &ChatState, id: &str) -> Result<Message, ChatError> {
    let msg = chat
        .visible_message(id)
        .ok_or_else(|| ChatError::UnknownMessage(id.to_string()))?;
    if !msg.is_from(&chat.me) {
        return Err(ChatError::NotAuthor(id.to_string()));
    }
    Ok(msg)
}

/// Validate an edit and overlay the new content.
///
/// # Errors
///
/// [`ChatError::UnknownMessage`], [`ChatError::NotAuthor`] or
/// [`ChatError::EmptyMessage`].
pub fn prepare_edit(chat: &mut ChatState, id: &str, content: &str) -> Result<PendingWrite, ChatError> {
    own_message(chat, id)?;
    let content = content.trim();
    if content.is_empty() {
        return Err(ChatError::EmptyMessage);
    }
    let edited_at = now_ms();

    let mut fields = Fields::new();
    fields.insert("content".into(), Value::from(content));
    fields.insert("edited".into(), Value::Bool(true));
    fields.insert("editedAt".into(), Value::from(edited_at));

    chat.apply(ChatEvent::Pending { id: id.to_string(), delta: Delta::Edit { content: content.to_string(), edited_at } });
    Ok(PendingWrite { kind: WriteKind::Update { id: id.to_string(), field: Field::Content, fields } })
}

/// Replace the content of one of the user's own messages.
///
/// # Errors
///
/// See [`prepare_edit`], or the store error after rollback.
pub async fn edit_message(store: &dyn DocumentStore, chat: &mut ChatState, id: &str, content: &str) -> Result<(), ChatError> {
    let write = prepare_edit(chat, id, content)?;
    settle(chat, write.run(store).await).map(drop)
}

/// Prepare a save of the open edit buffer. `None` when nothing is being
/// edited.
///
/// # Errors
///
/// See [`prepare_edit`].
pub fn prepare_commit_edit(chat: &mut ChatState) -> Result<Option<PendingWrite>, ChatError> {
    let Some(buffer) = chat.editing.clone() else {
        return Ok(None);
    };
    prepare_edit(chat, &buffer.message_id, &buffer.text).map(Some)
}

/// Save the open edit buffer. No-op when nothing is being edited.
///
/// # Errors
///
/// See [`edit_message`]. The buffer stays open on failure.
pub async fn commit_edit(store: &dyn DocumentStore, chat: &mut ChatState) -> Result<(), ChatError> {
    match prepare_commit_edit(chat)? {
        Some(write) => settle(chat, write.run(store).await).map(drop),
        None => Ok(()),
    }
}

/// First step of a delete: ask for confirmation.
///
/// # Errors
///
/// [`ChatError::UnknownMessage`] or [`ChatError::NotAuthor`].
pub fn request_delete(chat: &mut ChatState, id: &str) -> Result<(), ChatError> {
    own_message(chat, id)?;
    chat.apply(ChatEvent::RequestDelete(id.to_string()));
    Ok(())
}

/// Second step of a delete: hide the message until the store answers.
///
/// # Errors
///
/// [`ChatError::NotConfirmed`] unless [`request_delete`] was called for this
/// id, or the ownership errors.
pub fn prepare_delete(chat: &mut ChatState, id: &str) -> Result<PendingWrite, ChatError> {
    if chat.confirm_delete.as_deref() != Some(id) {
        return Err(ChatError::NotConfirmed(id.to_string()));
    }
    own_message(chat, id)?;
    chat.apply(ChatEvent::Pending { id: id.to_string(), delta: Delta::Delete });
    Ok(PendingWrite { kind: WriteKind::Delete { id: id.to_string() } })
}

/// # Errors
///
/// See [`prepare_delete`], or the store error after rollback.
pub async fn confirm_delete(store: &dyn DocumentStore, chat: &mut ChatState, id: &str) -> Result<(), ChatError> {
    let write = prepare_delete(chat, id)?;
    settle(chat, write.run(store).await).map(drop)
}

/// Overlay the reaction list with `emoji` toggled for the current user.
///
/// # Errors
///
/// [`ChatError::UnknownMessage`].
pub fn prepare_reaction(chat: &mut ChatState, me: &Identity, id: &str, emoji: &str) -> Result<PendingWrite, ChatError> {
    let msg = chat
        .visible_message(id)
        .ok_or_else(|| ChatError::UnknownMessage(id.to_string()))?;
    let next = reactions::toggle(&msg.reactions, &me.uid, &me.email, emoji, now_ms());
    let encoded = serde_json::to_value(&next)
        .map_err(|e| StoreError::Malformed { id: id.to_string(), reason: e.to_string() })?;

    let mut fields = Fields::new();
    fields.insert("reactions".into(), encoded);

    chat.apply(ChatEvent::Pending { id: id.to_string(), delta: Delta::Reactions(next) });
    Ok(PendingWrite { kind: WriteKind::Update { id: id.to_string(), field: Field::Reactions, fields } })
}

/// Toggle `emoji` for the current user on a message.
///
/// # Errors
///
/// [`ChatError::UnknownMessage`] or the store error after rollback.
pub async fn toggle_reaction(
    store: &dyn DocumentStore,
    chat: &mut ChatState,
    me: &Identity,
    id: &str,
    emoji: &str,
) -> Result<(), ChatError> {
    let write = prepare_reaction(chat, me, id, emoji)?;
    settle(chat, write.run(store).await).map(drop)
}

#[cfg(test)]
#[path = "ops_test.rs"]
mod ops_test;
