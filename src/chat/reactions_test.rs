use super::*;

fn reaction(emoji: &str, user: &str) -> Reaction {
    Reaction { emoji: emoji.to_owned(), user_id: user.to_owned(), user_email: format!("{user}@x.com"), timestamp: 1 }
}

#[test]
fn toggle_adds_reaction_for_new_user() {
    let next = toggle(&[], "u1", "u1@x.com", "❤️", 10);
    assert_eq!(next.len(), 1);
    assert_eq!(next[0].emoji, "❤️");
    assert_eq!(next[0].user_id, "u1");
    assert_eq!(next[0].timestamp, 10);
}

#[test]
fn toggle_same_emoji_removes_it() {
    let current = vec![reaction("❤️", "u1"), reaction("😂", "u2")];
    let next = toggle(&current, "u1", "u1@x.com", "❤️", 10);
    assert_eq!(next, vec![reaction("😂", "u2")]);
}

#[test]
fn toggle_twice_restores_original_list() {
    let original = vec![reaction("😂", "u2"), reaction("👍", "u3")];
    let once = toggle(&original, "u1", "u1@x.com", "🔥", 10);
    assert_ne!(once, original);
    let twice = toggle(&once, "u1", "u1@x.com", "🔥", 11);
    assert_eq!(twice, original);
}

#[test]
fn toggle_other_emoji_replaces_users_reaction() {
    let current = vec![reaction("❤️", "u1"), reaction("😂", "u2")];
    let next = toggle(&current, "u1", "u1@x.com", "😮", 10);
    assert_eq!(next.len(), 2);
    assert_eq!(next.iter().filter(|r| r.user_id == "u1").count(), 1);
    assert_eq!(next.last().map(|r| r.emoji.as_str()), Some("😮"));
}

#[test]
fn toggle_leaves_other_users_untouched() {
    let current = vec![reaction("❤️", "u2")];
    let next = toggle(&current, "u1", "u1@x.com", "❤️", 10);
    assert_eq!(next.len(), 2);
    assert_eq!(next[0], reaction("❤️", "u2"));
}

#[test]
fn summarize_groups_by_emoji() {
    let list = vec![reaction("❤️", "u1"), reaction("😂", "u2"), reaction("❤️", "u3")];
    assert_eq!(summarize(&list), vec![("❤️".to_owned(), 2), ("😂".to_owned(), 1)]);
    assert!(summarize(&[]).is_empty());
}
