//! Comment and reply entities.
//!
//! # Responsibility
//! - Define the comment thread shape owned by the comment store.
//! - Provide boundary validation for externally supplied entities.
//!
//! # Invariants
//! - `Comment::id` and `Reply::id` are non-empty and unique in their scope.
//! - `Comment::selection` is a non-empty `[start, end)` range.
//! - Timestamps are Unix epoch milliseconds.

use crate::model::anchor::Anchor;
use crate::model::user::UserId;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a comment.
pub type CommentId = String;

/// Stable identifier of a reply, unique within its parent comment.
pub type ReplyId = String;

/// Structural validation error for comment/reply entities.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntityError {
    EmptyCommentId,
    EmptyReplyId { comment_id: CommentId },
    DuplicateReplyId { comment_id: CommentId, reply_id: ReplyId },
    InvalidAnchorRange { start: usize, end: usize },
}

impl Display for EntityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyCommentId => write!(f, "comment id must not be empty"),
            Self::EmptyReplyId { comment_id } => {
                write!(f, "reply id must not be empty (comment {comment_id})")
            }
            Self::DuplicateReplyId {
                comment_id,
                reply_id,
            } => write!(f, "duplicate reply id {reply_id} in comment {comment_id}"),
            Self::InvalidAnchorRange { start, end } => {
                write!(f, "anchor range [{start}, {end}) is empty or reversed")
            }
        }
    }
}

impl Error for EntityError {}

/// Top-level comment attached to a document anchor.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    pub id: CommentId,
    pub text: String,
    pub user_id: UserId,
    pub timestamp: i64,
    /// Ordered oldest first.
    #[serde(default)]
    pub replies: Vec<Reply>,
    pub selection: Anchor,
}

impl Comment {
    /// Creates a comment with a generated id, the current time and no replies.
    pub fn new(text: impl Into<String>, user_id: impl Into<UserId>, selection: Anchor) -> Self {
        Self::with_id(
            Uuid::new_v4().to_string(),
            text,
            user_id,
            Utc::now().timestamp_millis(),
            selection,
        )
    }

    /// Creates a comment with caller-provided identity and time.
    ///
    /// Used by restore paths and tests; no validation happens here.
    pub fn with_id(
        id: impl Into<CommentId>,
        text: impl Into<String>,
        user_id: impl Into<UserId>,
        timestamp: i64,
        selection: Anchor,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            user_id: user_id.into(),
            timestamp,
            replies: Vec::new(),
            selection,
        }
    }

    /// Validates structural invariants before the store accepts this entity.
    ///
    /// Text emptiness is not checked here; that belongs to input handling.
    pub fn validate(&self) -> Result<(), EntityError> {
        if self.id.trim().is_empty() {
            return Err(EntityError::EmptyCommentId);
        }
        if self.selection.start >= self.selection.end {
            return Err(EntityError::InvalidAnchorRange {
                start: self.selection.start,
                end: self.selection.end,
            });
        }

        let mut seen = HashSet::with_capacity(self.replies.len());
        for reply in &self.replies {
            reply.validate(&self.id)?;
            if !seen.insert(reply.id.as_str()) {
                return Err(EntityError::DuplicateReplyId {
                    comment_id: self.id.clone(),
                    reply_id: reply.id.clone(),
                });
            }
        }
        Ok(())
    }

    pub fn reply(&self, reply_id: &str) -> Option<&Reply> {
        self.replies.iter().find(|reply| reply.id == reply_id)
    }

    pub(crate) fn reply_mut(&mut self, reply_id: &str) -> Option<&mut Reply> {
        self.replies.iter_mut().find(|reply| reply.id == reply_id)
    }
}

/// Reply inside a comment thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    pub id: ReplyId,
    pub text: String,
    pub user_id: UserId,
    pub timestamp: i64,
}

impl Reply {
    pub fn new(text: impl Into<String>, user_id: impl Into<UserId>) -> Self {
        Self::with_id(
            Uuid::new_v4().to_string(),
            text,
            user_id,
            Utc::now().timestamp_millis(),
        )
    }

    pub fn with_id(
        id: impl Into<ReplyId>,
        text: impl Into<String>,
        user_id: impl Into<UserId>,
        timestamp: i64,
    ) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            user_id: user_id.into(),
            timestamp,
        }
    }

    /// Validates the reply in the scope of its parent comment.
    pub fn validate(&self, comment_id: &str) -> Result<(), EntityError> {
        if self.id.trim().is_empty() {
            return Err(EntityError::EmptyReplyId {
                comment_id: comment_id.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Comment, EntityError, Reply};
    use crate::model::anchor::Anchor;

    #[test]
    fn new_comment_has_generated_id_and_no_replies() {
        let comment = Comment::new("typo?", "1", Anchor::new("quick", 4, 9));
        assert!(!comment.id.is_empty());
        assert!(comment.replies.is_empty());
        assert!(comment.timestamp > 0);
        assert_eq!(comment.validate(), Ok(()));
    }

    #[test]
    fn validate_rejects_missing_id_and_empty_range() {
        let missing_id = Comment::with_id("", "x", "1", 0, Anchor::new("a", 0, 1));
        assert_eq!(missing_id.validate(), Err(EntityError::EmptyCommentId));

        let empty_range = Comment::with_id("c1", "x", "1", 0, Anchor::new("a", 3, 3));
        assert_eq!(
            empty_range.validate(),
            Err(EntityError::InvalidAnchorRange { start: 3, end: 3 })
        );
    }

    #[test]
    fn validate_rejects_duplicate_reply_ids() {
        let mut comment = Comment::with_id("c1", "x", "1", 0, Anchor::new("a", 0, 1));
        comment.replies.push(Reply::with_id("r1", "one", "2", 1));
        comment.replies.push(Reply::with_id("r1", "two", "3", 2));
        assert_eq!(
            comment.validate(),
            Err(EntityError::DuplicateReplyId {
                comment_id: "c1".to_string(),
                reply_id: "r1".to_string(),
            })
        );
    }
}
