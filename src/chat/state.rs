//! Chat view state and its reducer.
//!
//! DESIGN
//! ======
//! `ChatState::apply` is the only mutation path. Remote snapshots replace the
//! message window wholesale; local optimistic writes are kept as overlays
//! keyed by (message, field) and layered on top when rendering.
//!
//! An overlay lives while its write is in flight. After every write behind it
//! is acknowledged it stays until a snapshot shows the written value, or a
//! value it has never seen, which means a newer remote write. Snapshots still
//! showing a value from before the write were produced before it landed and
//! are ignored for that field. A snapshot that no longer contains the message
//! drops its overlays at once.
//!
//! New messages are never inserted speculatively. They appear with the
//! snapshot that follows the write.

#[cfg(test)]
#[path = "state_test.rs"]
mod state_test;

use std::collections::BTreeMap;

use crate::model::{Attachment, Message, Reaction, ReplyRef};

/// Generic notice shown when the feed cannot be read.
pub const READ_FAILED_TEXT: &str = "Mesajlar yüklenemedi.";
/// Notice shown when a send fails; the compose box keeps its content.
pub const SEND_FAILED_TEXT: &str = "Mesaj gönderilemedi. Lütfen tekrar deneyin.";
/// Notice shown when an edit, delete or reaction write fails.
pub const UPDATE_FAILED_TEXT: &str = "İşlem tamamlanamadı. Lütfen tekrar deneyin.";

/// Live subscription status.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Error,
}

/// Transient toast.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub text: String,
    /// Bumped on every new notice so hosts can restart their dismiss timer.
    pub seq: u64,
}

/// Compose box contents.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Compose {
    pub text: String,
    pub attachment: Option<Attachment>,
    pub reply_to: Option<ReplyRef>,
}

impl Compose {
    /// Nothing sendable: blank text and no attachment.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text.trim().is_empty() && self.attachment.is_none()
    }
}

/// In-progress edit of one of the user's own messages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditBuffer {
    pub message_id: String,
    pub text: String,
}

/// Per-message popup menu.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Menu {
    /// Edit/delete sheet for the user's own message.
    Actions(String),
    /// Quick-reaction picker for the other participant's message.
    Reactions(String),
}

/// Which part of a message an optimistic write touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum Field {
    Content,
    Deleted,
    Reactions,
}

/// A local change not yet confirmed by a snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Delta {
    Edit { content: String, edited_at: i64 },
    Delete,
    Reactions(Vec<Reaction>),
}

impl Delta {
    #[must_use]
    pub fn field(&self) -> Field {
        match self {
            Self::Edit { .. } => Field::Content,
            Self::Delete => Field::Deleted,
            Self::Reactions(_) => Field::Reactions,
        }
    }
}

/// What a snapshot shows for the field an overlay covers.
#[derive(Clone, Debug, PartialEq, Eq)]
enum Observed {
    Content(String),
    Present,
    Reactions(Vec<Reaction>),
}

impl Observed {
    fn of(msg: &Message, field: Field) -> Self {
        match field {
            Field::Content => Self::Content(msg.content.clone()),
            Field::Deleted => Self::Present,
            Field::Reactions => Self::Reactions(msg.reactions.clone()),
        }
    }

    /// The value a snapshot shows once `delta` has landed. A delete lands as
    /// absence, so it has none.
    fn written(delta: &Delta) -> Option<Self> {
        match delta {
            Delta::Edit { content, .. } => Some(Self::Content(content.clone())),
            Delta::Delete => None,
            Delta::Reactions(list) => Some(Self::Reactions(list.clone())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Overlay {
    delta: Delta,
    in_flight: u32,
    /// Values this field had before the write, from the base snapshot, earlier
    /// deltas and snapshots seen while in flight.
    stale: Vec<Observed>,
}

impl Overlay {
    fn new(delta: Delta) -> Self {
        Self { delta, in_flight: 0, stale: Vec::new() }
    }

    fn note_stale(&mut self, value: Option<Observed>) {
        let Some(value) = value else {
            return;
        };
        if Observed::written(&self.delta).as_ref() != Some(&value) && !self.stale.contains(&value) {
            self.stale.push(value);
        }
    }

    /// Whether the overlay should survive a snapshot showing `seen`.
    fn survives(&mut self, seen: Observed) -> bool {
        if self.in_flight > 0 {
            self.note_stale(Some(seen));
            return true;
        }
        self.stale.contains(&seen)
    }
}

/// Everything that can change chat state.
#[derive(Clone, Debug, PartialEq)]
pub enum ChatEvent {
    // --- remote ---
    /// Messages as delivered by the live query: newest first.
    Snapshot(Vec<Message>),
    Connection(ConnectionStatus),
    FeedError(String),

    // --- compose ---
    ComposeText(String),
    Attach(Attachment),
    ClearAttachment,
    ReplyTo(String),
    CancelReply,
    SendStarted,
    SendSucceeded,
    SendFailed(String),

    // --- edit / menus ---
    BeginEdit(String),
    EditText(String),
    CancelEdit,
    /// Open the menu for a message: actions for own, reactions for others.
    OpenMenu(String),
    CloseMenu,
    RequestDelete(String),
    CancelDelete,
    ToggleDetails(String),

    // --- optimistic writes ---
    Pending { id: String, delta: Delta },
    WriteAcked { id: String, field: Field },
    WriteFailed { id: String, field: Field, error: String },

    DismissNotice,
}

/// State for one mounted chat view.
#[derive(Clone, Debug)]
pub struct ChatState {
    /// Current user id; decides ownership for menus and edits.
    pub me: String,
    /// Latest snapshot, oldest first.
    pub messages: Vec<Message>,
    pub connection: ConnectionStatus,
    pub compose: Compose,
    pub sending: bool,
    pub editing: Option<EditBuffer>,
    pub menu: Option<Menu>,
    /// Message awaiting delete confirmation.
    pub confirm_delete: Option<String>,
    /// Message whose timestamp/details are expanded.
    pub details: Option<String>,
    pub notice: Option<Notice>,
    /// Bumped on every snapshot; hosts scroll to the bottom when it changes.
    pub scroll_seq: u64,
    overlays: BTreeMap<(String, Field), Overlay>,
    notice_seq: u64,
}

impl ChatState {
    #[must_use]
    pub fn new(me: impl Into<String>) -> Self {
        Self {
            me: me.into(),
            messages: Vec::new(),
            connection: ConnectionStatus::Disconnected,
            compose: Compose::default(),
            sending: false,
            editing: None,
            menu: None,
            confirm_delete: None,
            details: None,
            notice: None,
            scroll_seq: 0,
            overlays: BTreeMap::new(),
            notice_seq: 0,
        }
    }

    /// Messages as they should render: snapshot plus pending overlays.
    #[must_use]
    pub fn visible(&self) -> Vec<Message> {
        self.messages
            .iter()
            .filter_map(|m| self.with_overlays(m))
            .collect()
    }

    /// One message as it should render, `None` if unknown or pending delete.
    #[must_use]
    pub fn visible_message(&self, id: &str) -> Option<Message> {
        self.messages
            .iter()
            .find(|m| m.id == id)
            .and_then(|m| self.with_overlays(m))
    }

    #[must_use]
    pub fn has_pending(&self, id: &str) -> bool {
        self.overlays.keys().any(|(mid, _)| mid == id)
    }

    fn with_overlays(&self, base: &Message) -> Option<Message> {
        if self.overlays.contains_key(&(base.id.clone(), Field::Deleted)) {
            return None;
        }
        let mut msg = base.clone();
        if let Some(Overlay { delta: Delta::Edit { content, edited_at }, .. }) =
            self.overlays.get(&(base.id.clone(), Field::Content))
        {
            msg.content.clone_from(content);
            msg.edited = true;
            msg.edited_at = Some(*edited_at);
        }
        if let Some(Overlay { delta: Delta::Reactions(list), .. }) =
            self.overlays.get(&(base.id.clone(), Field::Reactions))
        {
            msg.reactions.clone_from(list);
        }
        Some(msg)
    }

    fn is_own(&self, id: &str) -> bool {
        self.visible_message(id).is_some_and(|m| m.is_from(&self.me))
    }

    fn set_notice(&mut self, level: NoticeLevel, text: impl Into<String>) {
        self.notice_seq += 1;
        self.notice = Some(Notice { level, text: text.into(), seq: self.notice_seq });
    }

    /// Apply one event.
    #[allow(clippy::too_many_lines)]
    pub fn apply(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Snapshot(mut newest_first) => {
                newest_first.reverse();
                self.messages = newest_first;
                self.reconcile();
                self.scroll_seq += 1;
                if self.connection != ConnectionStatus::Connected {
                    self.connection = ConnectionStatus::Connected;
                }
            }
            ChatEvent::Connection(status) => self.connection = status,
            ChatEvent::FeedError(_) => {
                self.set_notice(NoticeLevel::Error, READ_FAILED_TEXT);
            }

            ChatEvent::ComposeText(text) => self.compose.text = text,
            ChatEvent::Attach(attachment) => self.compose.attachment = Some(attachment),
            ChatEvent::ClearAttachment => self.compose.attachment = None,
            ChatEvent::ReplyTo(id) => {
                if let Some(target) = self.visible_message(&id) {
                    self.compose.reply_to = Some(ReplyRef::to(&target));
                }
                self.menu = None;
            }
            ChatEvent::CancelReply => self.compose.reply_to = None,
            ChatEvent::SendStarted => self.sending = true,
            ChatEvent::SendSucceeded => {
                self.sending = false;
                self.compose = Compose::default();
            }
            ChatEvent::SendFailed(text) => {
                self.sending = false;
                self.set_notice(NoticeLevel::Error, text);
            }

            ChatEvent::BeginEdit(id) => {
                if let Some(msg) = self.visible_message(&id).filter(|m| m.is_from(&self.me)) {
                    self.editing = Some(EditBuffer { message_id: id, text: msg.content });
                    self.menu = None;
                }
            }
            ChatEvent::EditText(text) => {
                if let Some(buf) = self.editing.as_mut() {
                    buf.text = text;
                }
            }
            ChatEvent::CancelEdit => self.editing = None,
            ChatEvent::OpenMenu(id) => {
                if self.visible_message(&id).is_some() {
                    self.menu = Some(if self.is_own(&id) { Menu::Actions(id) } else { Menu::Reactions(id) });
                }
            }
            ChatEvent::CloseMenu => self.menu = None,
            ChatEvent::RequestDelete(id) => {
                if self.is_own(&id) {
                    self.confirm_delete = Some(id);
                    self.menu = None;
                }
            }
            ChatEvent::CancelDelete => self.confirm_delete = None,
            ChatEvent::ToggleDetails(id) => {
                self.menu = None;
                self.details = if self.details.as_deref() == Some(id.as_str()) { None } else { Some(id) };
            }

            ChatEvent::Pending { id, delta } => {
                let field = delta.field();
                if field == Field::Deleted && self.confirm_delete.as_deref() == Some(id.as_str()) {
                    self.confirm_delete = None;
                }
                if field == Field::Reactions {
                    self.menu = None;
                }
                let base = self.messages.iter().find(|m| m.id == id).map(|m| Observed::of(m, field));
                let overlay = self
                    .overlays
                    .entry((id, field))
                    .or_insert_with(|| Overlay::new(delta.clone()));
                let previous = std::mem::replace(&mut overlay.delta, delta);
                overlay.in_flight += 1;
                overlay.note_stale(base);
                overlay.note_stale(Observed::written(&previous));
            }
            ChatEvent::WriteAcked { id, field } => {
                if let Some(overlay) = self.overlays.get_mut(&(id.clone(), field)) {
                    overlay.in_flight = overlay.in_flight.saturating_sub(1);
                }
                if field == Field::Content && self.editing.as_ref().is_some_and(|e| e.message_id == id) {
                    self.editing = None;
                }
            }
            ChatEvent::WriteFailed { id, field, error } => {
                let key = (id, field);
                let rollback = self.overlays.get_mut(&key).is_some_and(|overlay| {
                    overlay.in_flight = overlay.in_flight.saturating_sub(1);
                    overlay.in_flight == 0
                });
                if rollback {
                    self.overlays.remove(&key);
                }
                self.set_notice(NoticeLevel::Error, error);
            }

            ChatEvent::DismissNotice => self.notice = None,
        }
    }

    /// Drop overlays the new snapshot supersedes and UI state pointing at
    /// messages that no longer exist.
    fn reconcile(&mut self) {
        let messages = &self.messages;
        let exists = |id: &str| messages.iter().any(|m| m.id == id);
        self.overlays.retain(|(id, field), overlay| {
            messages
                .iter()
                .find(|m| m.id == *id)
                .is_some_and(|m| overlay.survives(Observed::of(m, *field)))
        });

        if self.editing.as_ref().is_some_and(|e| !exists(e.message_id.as_str())) {
            self.editing = None;
        }
        let menu_target = match &self.menu {
            Some(Menu::Actions(id) | Menu::Reactions(id)) => Some(id.as_str()),
            None => None,
        };
        if menu_target.is_some_and(|id| !exists(id)) {
            self.menu = None;
        }
        if self.confirm_delete.as_deref().is_some_and(|id| !exists(id)) {
            self.confirm_delete = None;
        }
        if self.details.as_deref().is_some_and(|id| !exists(id)) {
            self.details = None;
        }
    }
}
