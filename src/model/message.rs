//! Chat message documents (`messages` collection).

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};

use crate::store::{Document, Fields, StoreError};

/// Raw attachment bytes accepted inline. Base64 inflates by 4/3, which keeps
/// the encoded payload under the store's 1 MiB document limit.
pub const MAX_INLINE_BYTES: usize = 700 * 1024;

/// Reply snippets are cut to this many characters.
pub const REPLY_SNIPPET_CHARS: usize = 100;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
}

impl MessageKind {
    /// Kind implied by an attachment MIME type.
    #[must_use]
    pub fn from_mime(mime: &str) -> Self {
        if mime.starts_with("image/") { Self::Image } else { Self::File }
    }
}

/// A single user's emoji on a message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reaction {
    pub emoji: String,
    pub user_id: String,
    #[serde(default)]
    pub user_email: String,
    #[serde(default)]
    pub timestamp: i64,
}

/// Snapshot of the message being replied to, embedded in the reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyRef {
    pub id: String,
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
}

impl ReplyRef {
    /// Build a reply reference to `target`, truncating its content.
    #[must_use]
    pub fn to(target: &Message) -> Self {
        let snippet = if target.content.is_empty() {
            target.file.as_ref().map(|f| f.name.clone()).unwrap_or_default()
        } else {
            target.content.chars().take(REPLY_SNIPPET_CHARS).collect()
        };
        Self { id: target.id.clone(), author: target.author.clone(), content: snippet, kind: target.kind }
    }
}

/// Stored attachment metadata and inline payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    pub name: String,
    pub size: u64,
    pub mime: String,
    /// `data:<mime>;base64,<payload>` URL.
    pub data: String,
}

/// An attachment picked in the compose box, not yet sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    pub mime: String,
    pub bytes: Vec<u8>,
}

impl Attachment {
    #[must_use]
    pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), mime: mime.into(), bytes }
    }

    #[must_use]
    pub fn kind(&self) -> MessageKind {
        MessageKind::from_mime(&self.mime)
    }

    #[must_use]
    pub fn exceeds_inline_limit(&self) -> bool {
        self.bytes.len() > MAX_INLINE_BYTES
    }

    /// Encode as stored file metadata with a base64 data URL.
    #[must_use]
    pub fn to_file_meta(&self) -> FileMeta {
        FileMeta {
            name: self.name.clone(),
            size: self.bytes.len() as u64,
            mime: self.mime.clone(),
            data: format!("data:{};base64,{}", self.mime, STANDARD.encode(&self.bytes)),
        }
    }
}

impl FileMeta {
    /// Decode the inline payload, `None` if it is not a base64 data URL.
    #[must_use]
    pub fn decode_bytes(&self) -> Option<Vec<u8>> {
        let (_, payload) = self.data.strip_prefix("data:")?.split_once(";base64,")?;
        STANDARD.decode(payload).ok()
    }
}

/// A chat message as stored in `messages`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    #[serde(skip)]
    pub id: String,
    pub author: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author_email: Option<String>,
    #[serde(default)]
    pub content: String,
    #[serde(rename = "type", default)]
    pub kind: MessageKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<FileMeta>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply_to: Option<ReplyRef>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub reactions: Vec<Reaction>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub edited: bool,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub edited_at: Option<i64>,
}

impl Message {
    /// Decode a `messages` document.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] when required fields are missing.
    pub fn from_document(doc: &Document) -> Result<Self, StoreError> {
        let mut msg: Self = super::decode(doc)?;
        msg.id.clone_from(&doc.id);
        Ok(msg)
    }

    /// Encode for storage. The id is not part of the fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Malformed`] if serialization fails.
    pub fn to_fields(&self) -> Result<Fields, StoreError> {
        super::encode(self)
    }

    #[must_use]
    pub fn is_from(&self, user_id: &str) -> bool {
        self.author == user_id
    }

    /// The emoji `user_id` reacted with, if any.
    #[must_use]
    pub fn reaction_of(&self, user_id: &str) -> Option<&str> {
        self.reactions
            .iter()
            .find(|r| r.user_id == user_id)
            .map(|r| r.emoji.as_str())
    }
}

#[cfg(test)]
#[path = "message_test.rs"]
mod tests;
