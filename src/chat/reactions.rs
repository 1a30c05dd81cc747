//! Reaction toggling with single-reaction-per-user semantics.

use crate::model::Reaction;

/// Toggle `emoji` for `user_id` on a reaction list.
///
/// Selecting the emoji the user already has removes it. Selecting any other
/// emoji drops the user's previous reaction and appends the new one, so a
/// user never holds more than one reaction per message.
#[must_use]
pub fn toggle(current: &[Reaction], user_id: &str, user_email: &str, emoji: &str, now_ms: i64) -> Vec<Reaction> {
    let already = current.iter().any(|r| r.user_id == user_id && r.emoji == emoji);
    let mut next: Vec<Reaction> = current.iter().filter(|r| r.user_id != user_id).cloned().collect();
    if !already {
        next.push(Reaction {
            emoji: emoji.to_string(),
            user_id: user_id.to_string(),
            user_email: user_email.to_string(),
            timestamp: now_ms,
        });
    }
    next
}

/// Reaction counts grouped by emoji, in first-seen order.
#[must_use]
pub fn summarize(reactions: &[Reaction]) -> Vec<(String, usize)> {
    let mut out: Vec<(String, usize)> = Vec::new();
    for r in reactions {
        match out.iter_mut().find(|(emoji, _)| *emoji == r.emoji) {
            Some((_, count)) => *count += 1,
            None => out.push((r.emoji.clone(), 1)),
        }
    }
    out
}

#[cfg(test)]
#[path = "reactions_test.rs"]
mod reactions_test;
