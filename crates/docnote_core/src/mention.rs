//! `@user` mention helpers for comment and reply input.
//!
//! # Responsibility
//! - Derive the live suggestion query from the text being typed.
//! - Filter users for the suggestion list.
//! - Splice a chosen user into the input at the caret.
//!
//! # Invariants
//! - Every query update is computed from the latest input, synchronously.
//! - Caret positions are character offsets.

use crate::model::user::User;
use once_cell::sync::Lazy;
use regex::Regex;

static MENTION_QUERY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"@([^@]*)$").expect("valid mention query regex"));

/// Result of inserting a mention into an input value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MentionInsertion {
    pub text: String,
    /// Caret position right after the inserted `@Name `.
    pub cursor: usize,
}

/// Returns the partial name typed after the last `@`, if any.
///
/// `"ping @Ja"` -> `Some("Ja")`, `"ping @"` -> `Some("")`, `"ping"` -> `None`.
pub fn mention_query(input: &str) -> Option<&str> {
    MENTION_QUERY_RE
        .captures(input)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
}

/// Users whose name contains `query`, case-insensitively, in seed order.
pub fn suggest_users<'a>(users: &'a [User], query: &str) -> Vec<&'a User> {
    let needle = query.to_lowercase();
    users
        .iter()
        .filter(|user| user.name.to_lowercase().contains(&needle))
        .collect()
}

/// Replaces the `@partial` ending at `cursor` with `@Name `.
///
/// Text after the caret is preserved. Returns `None` when no `@` precedes
/// the caret.
pub fn insert_mention(text: &str, cursor: usize, user: &User) -> Option<MentionInsertion> {
    let cursor_byte = text
        .char_indices()
        .nth(cursor)
        .map_or(text.len(), |(byte_index, _)| byte_index);
    let (before, after) = text.split_at(cursor_byte);
    let at_byte = before.rfind('@')?;

    let mut spliced = String::with_capacity(text.len() + user.name.len() + 2);
    spliced.push_str(&before[..at_byte]);
    spliced.push('@');
    spliced.push_str(&user.name);
    spliced.push(' ');
    spliced.push_str(after);

    let at_char = before[..at_byte].chars().count();
    Some(MentionInsertion {
        text: spliced,
        cursor: at_char + user.name.chars().count() + 2,
    })
}

/// Users referenced as `@Name` in `text`, in seed order.
///
/// The name must be followed by a non-word character or the end of text.
pub fn mentioned_users<'a>(text: &str, users: &'a [User]) -> Vec<&'a User> {
    users
        .iter()
        .filter(|user| mentions(text, &user.name))
        .collect()
}

fn mentions(text: &str, name: &str) -> bool {
    if name.is_empty() {
        return false;
    }
    let needle = format!("@{name}");
    text.match_indices(needle.as_str()).any(|(at, found)| {
        text[at + found.len()..]
            .chars()
            .next()
            .map_or(true, |next| !is_word_char(next))
    })
}

fn is_word_char(ch: char) -> bool {
    ch.is_alphanumeric() || ch == '_'
}
