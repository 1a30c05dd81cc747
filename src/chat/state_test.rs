use super::*;
use crate::model::MessageKind;

fn msg(id: &str, author: &str, content: &str, created_at: i64) -> Message {
    Message {
        id: id.to_owned(),
        author: author.to_owned(),
        author_email: None,
        content: content.to_owned(),
        kind: MessageKind::Text,
        file: None,
        reply_to: None,
        reactions: Vec::new(),
        edited: false,
        created_at,
        edited_at: None,
    }
}

/// State for "me" with a window of m1 (mine), m2 (theirs), m3 (mine).
fn seeded() -> ChatState {
    let mut state = ChatState::new("me");
    state.apply(ChatEvent::Snapshot(vec![
        msg("m3", "me", "third", 3),
        msg("m2", "you", "second", 2),
        msg("m1", "me", "first", 1),
    ]));
    state
}

fn ids(messages: &[Message]) -> Vec<&str> {
    messages.iter().map(|m| m.id.as_str()).collect()
}

// =============================================================
// Snapshots
// =============================================================

#[test]
fn new_state_is_empty_and_disconnected() {
    let state = ChatState::new("me");
    assert!(state.messages.is_empty());
    assert_eq!(state.connection, ConnectionStatus::Disconnected);
    assert!(state.compose.is_empty());
    assert_eq!(state.scroll_seq, 0);
}

#[test]
fn snapshot_is_reversed_to_oldest_first() {
    let state = seeded();
    assert_eq!(ids(&state.messages), vec!["m1", "m2", "m3"]);
    assert_eq!(state.connection, ConnectionStatus::Connected);
}

#[test]
fn every_snapshot_bumps_scroll_seq() {
    let mut state = seeded();
    let before = state.scroll_seq;
    state.apply(ChatEvent::Snapshot(vec![msg("m1", "me", "first", 1)]));
    assert_eq!(state.scroll_seq, before + 1);
}

#[test]
fn feed_error_sets_generic_notice() {
    let mut state = seeded();
    state.apply(ChatEvent::FeedError("boom".into()));
    let notice = state.notice.clone().expect("notice");
    assert_eq!(notice.level, NoticeLevel::Error);
    assert_eq!(notice.text, READ_FAILED_TEXT);
    assert_eq!(ids(&state.visible()), vec!["m1", "m2", "m3"]);

    state.apply(ChatEvent::FeedError("again".into()));
    assert_eq!(state.notice.as_ref().map(|n| n.seq), Some(notice.seq + 1));

    state.apply(ChatEvent::DismissNotice);
    assert!(state.notice.is_none());
}

// =============================================================
// Compose / send
// =============================================================

#[test]
fn send_success_clears_compose() {
    let mut state = seeded();
    state.apply(ChatEvent::ComposeText("hi".into()));
    state.apply(ChatEvent::ReplyTo("m2".into()));
    state.apply(ChatEvent::SendStarted);
    assert!(state.sending);

    state.apply(ChatEvent::SendSucceeded);
    assert!(!state.sending);
    assert_eq!(state.compose, Compose::default());
}

#[test]
fn send_failure_keeps_compose_and_sets_notice() {
    let mut state = seeded();
    state.apply(ChatEvent::ComposeText("hi".into()));
    state.apply(ChatEvent::Attach(Attachment::new("a.png", "image/png", vec![1, 2])));
    state.apply(ChatEvent::SendStarted);
    state.apply(ChatEvent::SendFailed(SEND_FAILED_TEXT.into()));

    assert!(!state.sending);
    assert_eq!(state.compose.text, "hi");
    assert!(state.compose.attachment.is_some());
    assert_eq!(state.notice.as_ref().map(|n| n.text.as_str()), Some(SEND_FAILED_TEXT));
}

#[test]
fn reply_to_builds_reference_and_cancel_clears() {
    let mut state = seeded();
    state.apply(ChatEvent::ReplyTo("m2".into()));
    let reply = state.compose.reply_to.clone().expect("reply target");
    assert_eq!(reply.id, "m2");
    assert_eq!(reply.author, "you");
    assert_eq!(reply.content, "second");

    state.apply(ChatEvent::CancelReply);
    assert!(state.compose.reply_to.is_none());
}

#[test]
fn reply_to_unknown_message_is_ignored() {
    let mut state = seeded();
    state.apply(ChatEvent::ReplyTo("ghost".into()));
    assert!(state.compose.reply_to.is_none());
}

#[test]
fn compose_is_empty_for_whitespace_only() {
    let compose = Compose { text: "  \n".into(), ..Compose::default() };
    assert!(compose.is_empty());
}

// =============================================================
// Menus / ownership
// =============================================================

#[test]
fn open_menu_depends_on_ownership() {
    let mut state = seeded();
    state.apply(ChatEvent::OpenMenu("m1".into()));
    assert_eq!(state.menu, Some(Menu::Actions("m1".into())));

    state.apply(ChatEvent::OpenMenu("m2".into()));
    assert_eq!(state.menu, Some(Menu::Reactions("m2".into())));

    state.apply(ChatEvent::CloseMenu);
    assert!(state.menu.is_none());
}

#[test]
fn begin_edit_only_on_own_message() {
    let mut state = seeded();
    state.apply(ChatEvent::BeginEdit("m2".into()));
    assert!(state.editing.is_none());

    state.apply(ChatEvent::BeginEdit("m1".into()));
    assert_eq!(state.editing, Some(EditBuffer { message_id: "m1".into(), text: "first".into() }));

    state.apply(ChatEvent::EditText("first!".into()));
    assert_eq!(state.editing.as_ref().map(|e| e.text.as_str()), Some("first!"));

    state.apply(ChatEvent::CancelEdit);
    assert!(state.editing.is_none());
}

#[test]
fn request_delete_only_on_own_message() {
    let mut state = seeded();
    state.apply(ChatEvent::RequestDelete("m2".into()));
    assert!(state.confirm_delete.is_none());

    state.apply(ChatEvent::RequestDelete("m3".into()));
    assert_eq!(state.confirm_delete.as_deref(), Some("m3"));

    state.apply(ChatEvent::CancelDelete);
    assert!(state.confirm_delete.is_none());
}

#[test]
fn toggle_details_flips() {
    let mut state = seeded();
    state.apply(ChatEvent::ToggleDetails("m2".into()));
    assert_eq!(state.details.as_deref(), Some("m2"));
    state.apply(ChatEvent::ToggleDetails("m2".into()));
    assert!(state.details.is_none());
}

// =============================================================
// Optimistic overlays
// =============================================================

#[test]
fn pending_edit_overlays_content_until_acked_snapshot() {
    let mut state = seeded();
    state.apply(ChatEvent::BeginEdit("m1".into()));
    state.apply(ChatEvent::Pending { id: "m1".into(), delta: Delta::Edit { content: "new".into(), edited_at: 9 } });

    let shown = state.visible_message("m1").unwrap();
    assert_eq!(shown.content, "new");
    assert!(shown.edited);
    assert_eq!(shown.edited_at, Some(9));
    assert_eq!(shown.id, "m1");
    assert_eq!(shown.author, "me");

    // A snapshot before the ack keeps the overlay.
    state.apply(ChatEvent::Snapshot(vec![msg("m1", "me", "first", 1)]));
    assert_eq!(state.visible_message("m1").unwrap().content, "new");

    state.apply(ChatEvent::WriteAcked { id: "m1".into(), field: Field::Content });
    assert!(state.editing.is_none());
    assert!(state.has_pending("m1"));

    // The snapshot after the ack is authoritative.
    let mut stored = msg("m1", "me", "server", 1);
    stored.edited = true;
    state.apply(ChatEvent::Snapshot(vec![stored]));
    assert!(!state.has_pending("m1"));
    assert_eq!(state.visible_message("m1").unwrap().content, "server");
}

#[test]
fn failed_edit_rolls_back_and_keeps_buffer() {
    let mut state = seeded();
    state.apply(ChatEvent::BeginEdit("m1".into()));
    state.apply(ChatEvent::EditText("oops".into()));
    state.apply(ChatEvent::Pending { id: "m1".into(), delta: Delta::Edit { content: "oops".into(), edited_at: 9 } });
    state.apply(ChatEvent::WriteFailed { id: "m1".into(), field: Field::Content, error: UPDATE_FAILED_TEXT.into() });

    assert_eq!(state.visible_message("m1").unwrap().content, "first");
    assert_eq!(state.editing.as_ref().map(|e| e.text.as_str()), Some("oops"));
    assert!(state.notice.is_some());
}

#[test]
fn pending_delete_hides_message_and_closes_confirmation() {
    let mut state = seeded();
    state.apply(ChatEvent::RequestDelete("m1".into()));
    state.apply(ChatEvent::Pending { id: "m1".into(), delta: Delta::Delete });

    assert!(state.confirm_delete.is_none());
    assert_eq!(ids(&state.visible()), vec!["m2", "m3"]);
    assert!(state.visible_message("m1").is_none());
}

#[test]
fn deleted_message_absent_after_next_snapshot() {
    let mut state = seeded();
    state.apply(ChatEvent::Pending { id: "m1".into(), delta: Delta::Delete });
    state.apply(ChatEvent::WriteAcked { id: "m1".into(), field: Field::Deleted });
    state.apply(ChatEvent::Snapshot(vec![msg("m3", "me", "third", 3), msg("m2", "you", "second", 2)]));

    assert!(!state.messages.iter().any(|m| m.id == "m1"));
    assert!(!state.has_pending("m1"));
}

#[test]
fn failed_delete_restores_message() {
    let mut state = seeded();
    state.apply(ChatEvent::Pending { id: "m1".into(), delta: Delta::Delete });
    state.apply(ChatEvent::WriteFailed { id: "m1".into(), field: Field::Deleted, error: "no".into() });
    assert_eq!(ids(&state.visible()), vec!["m1", "m2", "m3"]);
}

#[test]
fn remote_delete_wins_over_in_flight_overlay() {
    let mut state = seeded();
    state.apply(ChatEvent::Pending { id: "m1".into(), delta: Delta::Edit { content: "x".into(), edited_at: 5 } });
    state.apply(ChatEvent::Snapshot(vec![msg("m2", "you", "second", 2)]));
    assert!(!state.has_pending("m1"));
    assert_eq!(ids(&state.visible()), vec!["m2"]);
}

#[test]
fn overlapping_reaction_writes_keep_latest_overlay() {
    let mut state = seeded();
    let first = vec![Reaction { emoji: "❤️".into(), user_id: "me".into(), user_email: String::new(), timestamp: 1 }];
    let second = vec![Reaction { emoji: "😂".into(), user_id: "me".into(), user_email: String::new(), timestamp: 2 }];
    state.apply(ChatEvent::OpenMenu("m2".into()));
    state.apply(ChatEvent::Pending { id: "m2".into(), delta: Delta::Reactions(first) });
    assert!(state.menu.is_none());
    state.apply(ChatEvent::Pending { id: "m2".into(), delta: Delta::Reactions(second.clone()) });

    // First write acks; the second is still in flight, so the overlay survives.
    state.apply(ChatEvent::WriteAcked { id: "m2".into(), field: Field::Reactions });
    state.apply(ChatEvent::Snapshot(vec![msg("m2", "you", "second", 2)]));
    assert_eq!(state.visible_message("m2").unwrap().reactions, second);

    state.apply(ChatEvent::WriteAcked { id: "m2".into(), field: Field::Reactions });
    state.apply(ChatEvent::Snapshot(vec![msg("m2", "you", "second", 2)]));
    assert_eq!(state.visible_message("m2").unwrap().reactions, second);

    let mut stored = msg("m2", "you", "second", 2);
    stored.reactions.clone_from(&second);
    state.apply(ChatEvent::Snapshot(vec![stored]));
    assert!(!state.has_pending("m2"));
    assert_eq!(state.visible_message("m2").unwrap().reactions, second);
}

#[test]
fn acked_edit_ignores_snapshot_from_before_the_write() {
    let mut state = seeded();
    state.apply(ChatEvent::Pending { id: "m1".into(), delta: Delta::Edit { content: "final".into(), edited_at: 9 } });
    state.apply(ChatEvent::WriteAcked { id: "m1".into(), field: Field::Content });

    state.apply(ChatEvent::Snapshot(vec![msg("m1", "me", "first", 1)]));
    assert_eq!(state.visible_message("m1").unwrap().content, "final");
    assert!(state.has_pending("m1"));

    let mut stored = msg("m1", "me", "final", 1);
    stored.edited = true;
    state.apply(ChatEvent::Snapshot(vec![stored]));
    assert!(!state.has_pending("m1"));
    assert_eq!(state.visible_message("m1").unwrap().content, "final");
}

#[test]
fn second_edit_ignores_snapshot_showing_first_edit() {
    let mut state = seeded();
    state.apply(ChatEvent::Pending { id: "m1".into(), delta: Delta::Edit { content: "one".into(), edited_at: 5 } });
    state.apply(ChatEvent::Pending { id: "m1".into(), delta: Delta::Edit { content: "two".into(), edited_at: 6 } });
    state.apply(ChatEvent::WriteAcked { id: "m1".into(), field: Field::Content });
    state.apply(ChatEvent::WriteAcked { id: "m1".into(), field: Field::Content });

    state.apply(ChatEvent::Snapshot(vec![msg("m1", "me", "one", 1)]));
    assert_eq!(state.visible_message("m1").unwrap().content, "two");
}

#[test]
fn acked_delete_stays_hidden_on_snapshot_from_before_the_write() {
    let mut state = seeded();
    state.apply(ChatEvent::Pending { id: "m1".into(), delta: Delta::Delete });
    state.apply(ChatEvent::WriteAcked { id: "m1".into(), field: Field::Deleted });

    state.apply(ChatEvent::Snapshot(vec![msg("m2", "you", "second", 2), msg("m1", "me", "first", 1)]));
    assert_eq!(ids(&state.visible()), vec!["m2"]);
}

#[test]
fn newer_remote_value_replaces_acked_overlay() {
    let mut state = seeded();
    let mine = vec![Reaction { emoji: "❤️".into(), user_id: "me".into(), user_email: String::new(), timestamp: 1 }];
    let theirs = vec![Reaction { emoji: "😂".into(), user_id: "you".into(), user_email: String::new(), timestamp: 2 }];
    state.apply(ChatEvent::Pending { id: "m2".into(), delta: Delta::Reactions(mine) });
    state.apply(ChatEvent::WriteAcked { id: "m2".into(), field: Field::Reactions });

    let mut stored = msg("m2", "you", "second", 2);
    stored.reactions.clone_from(&theirs);
    state.apply(ChatEvent::Snapshot(vec![stored]));
    assert!(!state.has_pending("m2"));
    assert_eq!(state.visible_message("m2").unwrap().reactions, theirs);
}

#[test]
fn snapshot_closes_ui_pointing_at_vanished_messages() {
    let mut state = seeded();
    state.apply(ChatEvent::BeginEdit("m1".into()));
    state.apply(ChatEvent::ToggleDetails("m1".into()));
    state.apply(ChatEvent::RequestDelete("m3".into()));
    state.apply(ChatEvent::Snapshot(vec![msg("m2", "you", "second", 2)]));

    assert!(state.editing.is_none());
    assert!(state.details.is_none());
    assert!(state.confirm_delete.is_none());
}

#[test]
fn delta_fields() {
    assert_eq!(Delta::Delete.field(), Field::Deleted);
    assert_eq!(Delta::Reactions(Vec::new()).field(), Field::Reactions);
    assert_eq!(Delta::Edit { content: String::new(), edited_at: 0 }.field(), Field::Content);
}
