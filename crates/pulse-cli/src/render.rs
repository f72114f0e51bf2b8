//! Plain-text rendering of client state.

use std::fmt::Write;

use pulse_shared::{Conversation, Identity, UserId};

pub fn users(users: &[Identity], me: Option<&UserId>) -> String {
    if users.is_empty() {
        return "no users yet".to_string();
    }
    let mut out = String::new();
    for user in users {
        let marker = if Some(&user.id) == me { " (you)" } else { "" };
        let _ = writeln!(out, "  {:<14} {}{}", user.id.as_str(), user.display_name, marker);
    }
    out.trim_end().to_string()
}

pub fn conversation_list(conversations: &[Conversation], me: &UserId) -> String {
    if conversations.is_empty() {
        return "no conversations yet".to_string();
    }
    let mut out = String::new();
    for (i, c) in conversations.iter().enumerate() {
        let last = c
            .messages
            .last()
            .map(|m| m.text.as_str())
            .unwrap_or("");
        let _ = writeln!(
            out,
            "  {:>2}. [{}] {:<24} {}  {}",
            i + 1,
            c.kind.as_str(),
            c.title(me),
            c.last_active_at.format("%H:%M"),
            preview(last, 40),
        );
    }
    out.trim_end().to_string()
}

/// Header, pending requests (for admins) and the message log.
pub fn conversation(c: &Conversation, me: &UserId) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "== {} ({}) ==", c.title(me), c.id);

    if c.is_group() {
        let members = c.participants.iter().filter(|p| p.is_joined()).count();
        let _ = writeln!(out, "{members} member(s)");
        if c.is_admin(me) {
            for p in c.pending_requests() {
                let _ = writeln!(out, "  join request from {} ({})", name_of(c, &p.user_id), p.user_id);
            }
        }
    }

    for m in &c.messages {
        let tag = if m.is_generated { " [auto]" } else { "" };
        let _ = writeln!(
            out,
            "[{}] {}{}: {}",
            m.created_at.format("%H:%M:%S"),
            name_of(c, &m.sender_id),
            tag,
            m.text
        );
    }
    out.trim_end().to_string()
}

fn name_of(c: &Conversation, user_id: &UserId) -> String {
    c.participant(user_id)
        .and_then(|p| p.user.as_ref())
        .map(|u| u.display_name.clone())
        .unwrap_or_else(|| user_id.to_string())
}

fn preview(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let cut: String = text.chars().take(max).collect();
    format!("{cut}...")
}
