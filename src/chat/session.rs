//! One mounted chat view.
//!
//! DESIGN
//! ======
//! `ChatSession` owns everything the view needs: the reducer state, the
//! live feed task, the profile cache, the gesture machine and the optional
//! preview client. The host drives it from a single task: it awaits
//! [`ChatSession::next_event`] for background updates and calls the
//! operation methods for user input.
//!
//! Input methods never wait on the store. A write applies its optimistic
//! part at once and runs the store call on a spawned task, so the view stays
//! interactive and `sending` and overlays are visible while it is in flight.
//! The outcome comes back through [`ChatSession::next_event`].
//!
//! SYSTEM CONTEXT
//! ==============
//! Background work (feed, profile lookups, writes) reports over one bounded
//! channel. Dropping the session aborts the feed and closes the receiver;
//! writes already started still reach the store, but their outcomes are
//! discarded.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use super::ChatError;
use super::feed::{FEED_CHANNEL_CAPACITY, FeedEvent, FeedHandle, spawn_message_feed};
use super::gesture::{GestureIntent, GestureMachine, Point};
use super::ops::{self, PendingWrite};
use super::preview::{LinkPreview, PreviewClient};
use super::profiles::{ProfileCache, spawn_profile_fetch};
use super::state::{ChatEvent, ChatState};
use crate::auth::Identity;
use crate::config::MindlineConfig;
use crate::model::message::MAX_INLINE_BYTES;
use crate::model::{Attachment, Message};
use crate::store::DocumentStore;

pub struct ChatSession {
    store: Arc<dyn DocumentStore>,
    me: Identity,
    config: MindlineConfig,
    state: ChatState,
    profiles: ProfileCache,
    gestures: GestureMachine,
    previews: Option<PreviewClient>,
    events_tx: mpsc::Sender<FeedEvent>,
    events_rx: mpsc::Receiver<FeedEvent>,
    _feed: FeedHandle,
}

impl ChatSession {
    /// Mount the chat view for `me` and start the live feed.
    ///
    /// Must be called inside a tokio runtime.
    #[must_use]
    pub fn open(store: Arc<dyn DocumentStore>, me: Identity, config: MindlineConfig) -> Self {
        let (events_tx, events_rx) = mpsc::channel(FEED_CHANNEL_CAPACITY);
        let feed = spawn_message_feed(Arc::clone(&store), config.feed, events_tx.clone());
        let previews = config.preview.as_ref().and_then(|cfg| match PreviewClient::new(cfg) {
            Ok(client) => Some(client),
            Err(e) => {
                warn!(error = %e, "link previews disabled");
                None
            }
        });
        info!(uid = %me.uid, previews = previews.is_some(), "chat session opened");
        Self {
            store,
            state: ChatState::new(me.uid.clone()),
            me,
            profiles: ProfileCache::new(),
            gestures: GestureMachine::new(config.gesture),
            config,
            previews,
            events_tx,
            events_rx,
            _feed: feed,
        }
    }

    #[must_use]
    pub fn state(&self) -> &ChatState {
        &self.state
    }

    #[must_use]
    pub fn me(&self) -> &Identity {
        &self.me
    }

    #[must_use]
    pub fn profiles(&self) -> &ProfileCache {
        &self.profiles
    }

    /// Author label for a message.
    #[must_use]
    pub fn author_label(&self, message: &Message) -> String {
        self.profiles.label(&message.author, message.author_email.as_deref())
    }

    // =========================================================================
    // BACKGROUND EVENTS
    // =========================================================================

    /// Wait for one background event and apply it.
    ///
    /// The session keeps a sender for its own background work, so the channel
    /// never closes while the session is alive and this simply waits.
    pub async fn next_event(&mut self) {
        if let Some(event) = self.events_rx.recv().await {
            self.handle_feed_event(event);
        }
    }

    /// Apply every event that is already queued. Returns how many there were.
    pub fn drain_ready(&mut self) -> usize {
        let mut n = 0;
        while let Ok(event) = self.events_rx.try_recv() {
            self.handle_feed_event(event);
            n += 1;
        }
        n
    }

    fn handle_feed_event(&mut self, event: FeedEvent) {
        match event {
            FeedEvent::Status(status) => self.state.apply(ChatEvent::Connection(status)),
            FeedEvent::Snapshot(messages) => {
                let unseen = self.profiles.claim_missing(messages.iter().map(|m| m.author.as_str()));
                for uid in unseen {
                    debug!(%uid, "fetching profile");
                    spawn_profile_fetch(Arc::clone(&self.store), uid, self.events_tx.clone());
                }
                self.state.apply(ChatEvent::Snapshot(messages));
            }
            FeedEvent::Error(reason) => self.state.apply(ChatEvent::FeedError(reason)),
            FeedEvent::Profile { uid, profile } => self.profiles.resolve(&uid, profile),
            FeedEvent::Settled(event) => self.state.apply(event),
        }
    }

    // =========================================================================
    // LOCAL INPUT
    // =========================================================================

    /// Apply a purely local UI event (typing, menus, cancel buttons).
    pub fn dispatch(&mut self, event: ChatEvent) {
        self.state.apply(event);
    }

    /// Put an attachment in the compose box.
    ///
    /// # Errors
    ///
    /// [`ChatError::AttachmentTooLarge`] above the inline limit; the compose
    /// box is left unchanged.
    pub fn attach(&mut self, attachment: Attachment) -> Result<(), ChatError> {
        if attachment.exceeds_inline_limit() {
            return Err(ChatError::AttachmentTooLarge { size: attachment.bytes.len(), max: MAX_INLINE_BYTES });
        }
        self.state.apply(ChatEvent::Attach(attachment));
        Ok(())
    }

    /// Run a prepared write on its own task and report the outcome on the
    /// event channel.
    fn spawn_write(&self, write: PendingWrite) {
        let store = Arc::clone(&self.store);
        let tx = self.events_tx.clone();
        debug!(id = write.message_id().unwrap_or("new"), "write started");
        tokio::spawn(async move {
            let outcome = write.run(store.as_ref()).await;
            if tx.send(FeedEvent::Settled(outcome.event)).await.is_err() {
                debug!("session closed before write settled");
            }
        });
    }

    /// Start sending the compose box. `sending` is set until the outcome
    /// arrives; the compose box is cleared on success and kept on failure.
    ///
    /// # Errors
    ///
    /// See [`ops::prepare_send`]. Store failures arrive later as a notice.
    pub fn send(&mut self) -> Result<(), ChatError> {
        let write = ops::prepare_send(&mut self.state, &self.me)?;
        self.spawn_write(write);
        Ok(())
    }

    /// # Errors
    ///
    /// See [`ops::prepare_edit`]. Store failures roll back and set a notice.
    pub fn edit(&mut self, id: &str, content: &str) -> Result<(), ChatError> {
        let write = ops::prepare_edit(&mut self.state, id, content)?;
        self.spawn_write(write);
        Ok(())
    }

    /// Save the open edit buffer. The buffer closes once the store accepts.
    ///
    /// # Errors
    ///
    /// See [`ops::prepare_commit_edit`].
    pub fn save_edit(&mut self) -> Result<(), ChatError> {
        if let Some(write) = ops::prepare_commit_edit(&mut self.state)? {
            self.spawn_write(write);
        }
        Ok(())
    }

    /// # Errors
    ///
    /// See [`ops::request_delete`].
    pub fn request_delete(&mut self, id: &str) -> Result<(), ChatError> {
        ops::request_delete(&mut self.state, id)
    }

    /// Delete the message awaiting confirmation. It is hidden at once.
    ///
    /// # Errors
    ///
    /// [`ChatError::NotConfirmed`] when nothing awaits confirmation, or see
    /// [`ops::prepare_delete`].
    pub fn confirm_delete(&mut self) -> Result<(), ChatError> {
        let id = self
            .state
            .confirm_delete
            .clone()
            .ok_or_else(|| ChatError::NotConfirmed(String::new()))?;
        let write = ops::prepare_delete(&mut self.state, &id)?;
        self.spawn_write(write);
        Ok(())
    }

    /// # Errors
    ///
    /// See [`ops::prepare_reaction`].
    pub fn react(&mut self, id: &str, emoji: &str) -> Result<(), ChatError> {
        let write = ops::prepare_reaction(&mut self.state, &self.me, id, emoji)?;
        self.spawn_write(write);
        Ok(())
    }

    // =========================================================================
    // GESTURES
    // =========================================================================

    #[must_use]
    pub fn swipe_offset(&self) -> f64 {
        self.gestures.swipe_offset()
    }

    /// When the host should call [`tick`](Self::tick) next.
    #[must_use]
    pub fn next_gesture_deadline(&self) -> Option<u64> {
        self.gestures.next_deadline()
    }

    /// # Errors
    ///
    /// A completed double tap could not start its reaction write.
    pub fn touch_start(&mut self, message_id: &str, at: Point, now: u64) -> Result<Vec<GestureIntent>, ChatError> {
        let intents = self.gestures.touch_start(message_id, at, now);
        self.apply_intents(intents)
    }

    /// # Errors
    ///
    /// See [`touch_start`](Self::touch_start).
    pub fn touch_move(&mut self, at: Point, now: u64) -> Result<Vec<GestureIntent>, ChatError> {
        let intents = self.gestures.touch_move(at, now);
        self.apply_intents(intents)
    }

    /// # Errors
    ///
    /// See [`touch_start`](Self::touch_start).
    pub fn touch_end(&mut self, now: u64) -> Result<Vec<GestureIntent>, ChatError> {
        let intents = self.gestures.touch_end(now);
        self.apply_intents(intents)
    }

    /// # Errors
    ///
    /// See [`touch_start`](Self::touch_start).
    pub fn touch_cancel(&mut self) -> Result<Vec<GestureIntent>, ChatError> {
        let intents = self.gestures.touch_cancel();
        self.apply_intents(intents)
    }

    /// # Errors
    ///
    /// See [`touch_start`](Self::touch_start).
    pub fn tick(&mut self, now: u64) -> Result<Vec<GestureIntent>, ChatError> {
        let intents = self.gestures.tick(now);
        self.apply_intents(intents)
    }

    /// Map recognized gestures onto chat actions. Every intent is applied;
    /// the first failure is returned afterwards.
    fn apply_intents(&mut self, intents: Vec<GestureIntent>) -> Result<Vec<GestureIntent>, ChatError> {
        let mut first_error = None;
        for intent in &intents {
            match intent {
                GestureIntent::Reply(id) => self.state.apply(ChatEvent::ReplyTo(id.clone())),
                GestureIntent::LongPress(id) => self.state.apply(ChatEvent::OpenMenu(id.clone())),
                GestureIntent::Tap(id) => self.state.apply(ChatEvent::ToggleDetails(id.clone())),
                GestureIntent::DoubleTap(id) => {
                    let emoji = self.config.like_emoji.clone();
                    if let Err(e) = self.react(id, &emoji) {
                        first_error.get_or_insert(e);
                    }
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(intents),
        }
    }

    // =========================================================================
    // PREVIEWS
    // =========================================================================

    /// Link previews for a message's text. Empty when previews are disabled
    /// or the message is unknown.
    pub async fn previews(&self, message_id: &str) -> Vec<LinkPreview> {
        let Some(client) = &self.previews else {
            return Vec::new();
        };
        let Some(message) = self.state.visible_message(message_id) else {
            return Vec::new();
        };
        client.previews_for(&message.content).await
    }
}
