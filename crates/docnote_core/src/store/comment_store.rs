//! Comment store implementation.
//!
//! # Responsibility
//! - Apply comment/reply mutations in call order.
//! - Report the effect of each mutation through `MutationOutcome`.
//! - Fan out one `StoreEvent` per applied mutation to subscribers.
//!
//! # Invariants
//! - Comment ids are unique within the store.
//! - Deleting a comment deletes its replies and clears focus on it.
//! - Group order follows the first insertion of each anchored text.

use crate::model::anchor::Anchor;
use crate::model::comment::{Comment, CommentId, EntityError, Reply, ReplyId};
use crate::model::user::User;
use crate::store::resolution::ResolutionState;
use indexmap::IndexMap;
use log::{debug, warn};
use std::fmt::{Debug, Formatter};

/// Effect of one store mutation.
///
/// Callers are free to ignore it: unknown references are silent no-ops.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationOutcome {
    Applied,
    /// The addressed comment or reply does not exist.
    NotFound,
    Rejected(RejectReason),
}

impl MutationOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, Self::Applied)
    }
}

/// Why a mutation was refused without changing state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    Invalid(EntityError),
    DuplicateCommentId(CommentId),
    DuplicateReplyId(ReplyId),
    /// The comment is resolved and therefore read-only.
    Resolved(CommentId),
}

/// Change notification emitted after an applied mutation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    CommentAdded { comment_id: CommentId },
    CommentDeleted { comment_id: CommentId },
    CommentEdited { comment_id: CommentId },
    ReplyAdded { comment_id: CommentId, reply_id: ReplyId },
    ReplyDeleted { comment_id: CommentId, reply_id: ReplyId },
    ReplyEdited { comment_id: CommentId, reply_id: ReplyId },
    CommentResolved { comment_id: CommentId },
    SelectionChanged { selection: Option<Anchor> },
    ActiveCommentChanged { comment_id: Option<CommentId> },
    CommentsRestored { count: usize },
    ResolutionLoaded { resolved: usize },
}

impl StoreEvent {
    /// Whether highlighted spans must be recomputed.
    pub fn affects_anchors(&self) -> bool {
        matches!(
            self,
            Self::CommentAdded { .. } | Self::CommentDeleted { .. } | Self::CommentsRestored { .. }
        )
    }

    /// Stable snake_case name used in log lines.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CommentAdded { .. } => "comment_added",
            Self::CommentDeleted { .. } => "comment_deleted",
            Self::CommentEdited { .. } => "comment_edited",
            Self::ReplyAdded { .. } => "reply_added",
            Self::ReplyDeleted { .. } => "reply_deleted",
            Self::ReplyEdited { .. } => "reply_edited",
            Self::CommentResolved { .. } => "comment_resolved",
            Self::SelectionChanged { .. } => "selection_changed",
            Self::ActiveCommentChanged { .. } => "active_comment_changed",
            Self::CommentsRestored { .. } => "comments_restored",
            Self::ResolutionLoaded { .. } => "resolution_loaded",
        }
    }

    /// Whether the comment collection itself changed.
    pub fn affects_comments(&self) -> bool {
        matches!(
            self,
            Self::CommentAdded { .. }
                | Self::CommentDeleted { .. }
                | Self::CommentEdited { .. }
                | Self::ReplyAdded { .. }
                | Self::ReplyDeleted { .. }
                | Self::ReplyEdited { .. }
                | Self::CommentsRestored { .. }
        )
    }
}

/// Handle returned by `CommentStore::subscribe`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Listener = Box<dyn FnMut(&StoreEvent) + Send>;

/// Comments sharing one anchored text, in insertion order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentGroup<'a> {
    /// Shared `selection.text`.
    pub key: &'a str,
    pub comments: Vec<&'a Comment>,
}

/// Mutable state container for one document session.
pub struct CommentStore {
    comments: Vec<Comment>,
    users: Vec<User>,
    selected_text: Option<Anchor>,
    active_comment_id: Option<CommentId>,
    resolution: ResolutionState,
    listeners: Vec<(SubscriptionId, Listener)>,
    next_subscription: u64,
    revision: u64,
    comments_revision: u64,
}

impl Debug for CommentStore {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommentStore")
            .field("comments", &self.comments.len())
            .field("users", &self.users.len())
            .field("selected_text", &self.selected_text)
            .field("active_comment_id", &self.active_comment_id)
            .field("resolved", &self.resolution.len())
            .field("listeners", &self.listeners.len())
            .field("revision", &self.revision)
            .field("comments_revision", &self.comments_revision)
            .finish()
    }
}

impl CommentStore {
    /// Creates an empty store with static user reference data.
    pub fn new(users: Vec<User>) -> Self {
        Self {
            comments: Vec::new(),
            users,
            selected_text: None,
            active_comment_id: None,
            resolution: ResolutionState::default(),
            listeners: Vec::new(),
            next_subscription: 0,
            revision: 0,
            comments_revision: 0,
        }
    }

    // ---- read accessors ----

    /// Comments in insertion order.
    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn comment(&self, comment_id: &str) -> Option<&Comment> {
        self.comments.iter().find(|comment| comment.id == comment_id)
    }

    pub fn users(&self) -> &[User] {
        &self.users
    }

    pub fn user(&self, user_id: &str) -> Option<&User> {
        self.users.iter().find(|user| user.id == user_id)
    }

    pub fn selected_text(&self) -> Option<&Anchor> {
        self.selected_text.as_ref()
    }

    pub fn active_comment_id(&self) -> Option<&str> {
        self.active_comment_id.as_deref()
    }

    pub fn resolution(&self) -> &ResolutionState {
        &self.resolution
    }

    pub fn is_resolved(&self, comment_id: &str) -> bool {
        self.resolution.is_resolved(comment_id)
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }

    /// Number of applied mutations since creation.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Number of applied mutations that changed the comment collection.
    ///
    /// Persistence compares this against the last saved value.
    pub fn comments_revision(&self) -> u64 {
        self.comments_revision
    }

    /// Groups comments by exact `selection.text`.
    ///
    /// Identical text at different offsets lands in the same thread.
    pub fn groups(&self) -> Vec<CommentGroup<'_>> {
        let mut grouped: IndexMap<&str, Vec<&Comment>> = IndexMap::new();
        for comment in &self.comments {
            grouped
                .entry(comment.selection.text.as_str())
                .or_default()
                .push(comment);
        }
        grouped
            .into_iter()
            .map(|(key, comments)| CommentGroup { key, comments })
            .collect()
    }

    // ---- subscriptions ----

    /// Registers a listener invoked after every applied mutation.
    pub fn subscribe(&mut self, listener: impl FnMut(&StoreEvent) + Send + 'static) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.listeners.push((id, Box::new(listener)));
        id
    }

    /// Removes a listener. Returns `false` for unknown handles.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(listener_id, _)| *listener_id != id);
        before != self.listeners.len()
    }

    // ---- mutations ----

    /// Appends a comment.
    ///
    /// # Contract
    /// - Rejects entities failing `Comment::validate` or reusing an id.
    /// - Does not check text emptiness or anchor/document agreement.
    pub fn add_comment(&mut self, comment: Comment) -> MutationOutcome {
        if let Err(err) = comment.validate() {
            warn!(
                "event=comment_add module=store status=rejected reason=invalid error={}",
                err
            );
            return MutationOutcome::Rejected(RejectReason::Invalid(err));
        }
        if self.comment(&comment.id).is_some() {
            warn!(
                "event=comment_add module=store status=rejected reason=duplicate_id comment_id={}",
                comment.id
            );
            return MutationOutcome::Rejected(RejectReason::DuplicateCommentId(comment.id));
        }

        let comment_id = comment.id.clone();
        self.comments.push(comment);
        self.commit(StoreEvent::CommentAdded { comment_id })
    }

    /// Appends a reply to the addressed comment.
    pub fn add_reply(&mut self, comment_id: &str, reply: Reply) -> MutationOutcome {
        if let Err(err) = reply.validate(comment_id) {
            return MutationOutcome::Rejected(RejectReason::Invalid(err));
        }
        if let Some(outcome) = self.guard_writable("reply_add", comment_id) {
            return outcome;
        }
        let Some(comment) = self.comment_mut(comment_id) else {
            return MutationOutcome::NotFound;
        };
        if comment.reply(&reply.id).is_some() {
            return MutationOutcome::Rejected(RejectReason::DuplicateReplyId(reply.id));
        }

        let reply_id = reply.id.clone();
        comment.replies.push(reply);
        self.commit(StoreEvent::ReplyAdded {
            comment_id: comment_id.to_string(),
            reply_id,
        })
    }

    /// Removes a comment with all of its replies. Idempotent.
    pub fn delete_comment(&mut self, comment_id: &str) -> MutationOutcome {
        let Some(index) = self.position(comment_id) else {
            log_missing("comment_delete", comment_id);
            return MutationOutcome::NotFound;
        };

        self.comments.remove(index);
        if self.active_comment_id.as_deref() == Some(comment_id) {
            self.active_comment_id = None;
        }
        self.commit(StoreEvent::CommentDeleted {
            comment_id: comment_id.to_string(),
        })
    }

    /// Removes one reply. Allowed on resolved comments.
    pub fn delete_reply(&mut self, comment_id: &str, reply_id: &str) -> MutationOutcome {
        let Some(comment) = self.comment_mut(comment_id) else {
            log_missing("reply_delete", comment_id);
            return MutationOutcome::NotFound;
        };
        let Some(index) = comment.replies.iter().position(|reply| reply.id == reply_id) else {
            log_missing("reply_delete", reply_id);
            return MutationOutcome::NotFound;
        };

        comment.replies.remove(index);
        self.commit(StoreEvent::ReplyDeleted {
            comment_id: comment_id.to_string(),
            reply_id: reply_id.to_string(),
        })
    }

    /// Replaces the full text of a comment.
    pub fn edit_comment(&mut self, comment_id: &str, new_text: impl Into<String>) -> MutationOutcome {
        if let Some(outcome) = self.guard_writable("comment_edit", comment_id) {
            return outcome;
        }
        let Some(comment) = self.comment_mut(comment_id) else {
            return MutationOutcome::NotFound;
        };

        comment.text = new_text.into();
        self.commit(StoreEvent::CommentEdited {
            comment_id: comment_id.to_string(),
        })
    }

    /// Replaces the full text of a reply.
    pub fn edit_reply(
        &mut self,
        comment_id: &str,
        reply_id: &str,
        new_text: impl Into<String>,
    ) -> MutationOutcome {
        if let Some(outcome) = self.guard_writable("reply_edit", comment_id) {
            return outcome;
        }
        let Some(reply) = self
            .comment_mut(comment_id)
            .and_then(|comment| comment.reply_mut(reply_id))
        else {
            log_missing("reply_edit", reply_id);
            return MutationOutcome::NotFound;
        };

        reply.text = new_text.into();
        self.commit(StoreEvent::ReplyEdited {
            comment_id: comment_id.to_string(),
            reply_id: reply_id.to_string(),
        })
    }

    /// Replaces the current selection.
    pub fn set_selected_text(&mut self, selection: Option<Anchor>) -> MutationOutcome {
        self.selected_text = selection.clone();
        self.commit(StoreEvent::SelectionChanged { selection })
    }

    /// Moves focus to a comment, or clears it with `None`.
    pub fn set_active_comment_id(&mut self, comment_id: Option<&str>) -> MutationOutcome {
        if let Some(id) = comment_id {
            if self.position(id).is_none() {
                log_missing("active_comment_set", id);
                return MutationOutcome::NotFound;
            }
        }

        self.active_comment_id = comment_id.map(str::to_string);
        self.commit(StoreEvent::ActiveCommentChanged {
            comment_id: self.active_comment_id.clone(),
        })
    }

    /// Marks a comment thread as resolved.
    pub fn mark_resolved(&mut self, comment_id: &str) -> MutationOutcome {
        if self.position(comment_id).is_none() {
            log_missing("comment_resolve", comment_id);
            return MutationOutcome::NotFound;
        }
        if !self.resolution.mark(comment_id) {
            return MutationOutcome::Rejected(RejectReason::Resolved(comment_id.to_string()));
        }
        self.commit(StoreEvent::CommentResolved {
            comment_id: comment_id.to_string(),
        })
    }

    /// Replaces resolution flags with a loaded state.
    pub fn load_resolution(&mut self, state: ResolutionState) -> MutationOutcome {
        let resolved = state.resolved_ids().count();
        self.resolution = state;
        self.commit(StoreEvent::ResolutionLoaded { resolved })
    }

    /// Replaces the comment collection with previously persisted comments.
    ///
    /// Invalid or duplicate entries are dropped and logged.
    pub fn restore_comments(&mut self, comments: Vec<Comment>) -> MutationOutcome {
        let mut restored: Vec<Comment> = Vec::with_capacity(comments.len());
        for comment in comments {
            if let Err(err) = comment.validate() {
                warn!(
                    "event=comments_restore module=store status=skipped reason=invalid error={}",
                    err
                );
                continue;
            }
            if restored.iter().any(|kept| kept.id == comment.id) {
                warn!(
                    "event=comments_restore module=store status=skipped reason=duplicate_id comment_id={}",
                    comment.id
                );
                continue;
            }
            restored.push(comment);
        }

        let count = restored.len();
        self.comments = restored;
        if let Some(active) = self.active_comment_id.as_deref() {
            if self.position(active).is_none() {
                self.active_comment_id = None;
            }
        }
        self.commit(StoreEvent::CommentsRestored { count })
    }

    /// Clones the comment collection for persistence.
    pub fn snapshot(&self) -> Vec<Comment> {
        self.comments.clone()
    }

    fn position(&self, comment_id: &str) -> Option<usize> {
        self.comments
            .iter()
            .position(|comment| comment.id == comment_id)
    }

    fn comment_mut(&mut self, comment_id: &str) -> Option<&mut Comment> {
        self.comments
            .iter_mut()
            .find(|comment| comment.id == comment_id)
    }

    /// Returns the outcome to short-circuit with when the target is missing
    /// or resolved.
    fn guard_writable(&self, event: &str, comment_id: &str) -> Option<MutationOutcome> {
        if self.position(comment_id).is_none() {
            log_missing(event, comment_id);
            return Some(MutationOutcome::NotFound);
        }
        if self.resolution.is_resolved(comment_id) {
            debug!(
                "event={} module=store status=rejected reason=resolved comment_id={}",
                event, comment_id
            );
            return Some(MutationOutcome::Rejected(RejectReason::Resolved(
                comment_id.to_string(),
            )));
        }
        None
    }

    fn commit(&mut self, event: StoreEvent) -> MutationOutcome {
        self.revision += 1;
        if event.affects_comments() {
            self.comments_revision += 1;
        }
        debug!(
            "event=store_commit module=store status=ok revision={} change={}",
            self.revision,
            event.kind()
        );
        for (_, listener) in self.listeners.iter_mut() {
            listener(&event);
        }
        MutationOutcome::Applied
    }
}

impl Default for CommentStore {
    fn default() -> Self {
        Self::new(crate::model::user::default_users())
    }
}

fn log_missing(event: &str, id: &str) {
    debug!(
        "event={} module=store status=noop reason=not_found id={}",
        event, id
    );
}
