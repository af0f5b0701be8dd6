//! Document session service.
//!
//! # Responsibility
//! - Translate UI events (selection, submit, click) into store mutations.
//! - Persist the comment collection and resolution flags through `KvStore`.
//!
//! # Invariants
//! - Validation failures leave every piece of state untouched.
//! - Missing references surface as `MutationOutcome::NotFound`, never errors.
//! - A failed load starts from empty state; a failed save is logged only.
//! - The comment snapshot is written only when the collection changed, and
//!   removed once the collection is empty.

use crate::annotate::annotator::{annotate, Annotation, StaleAnchor};
use crate::config::CoreConfig;
use crate::mention::mentioned_users;
use crate::model::anchor::Anchor;
use crate::model::comment::{Comment, CommentId};
use crate::model::document::Document;
use crate::model::user::UserId;
use crate::repo::kv_repo::KvStore;
use crate::selection::resolver::{SelectionChange, SelectionEvent, SelectionResolver};
use crate::store::comment_store::{CommentStore, MutationOutcome, StoreEvent, SubscriptionId};
use crate::store::resolution::ResolutionState;
use chrono::DateTime;
use log::{debug, error, info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Storage key of the serialized comment collection.
pub const COMMENTS_STORAGE_KEY: &str = "comments-storage";

const TIMESTAMP_FORMAT: &str = "%b %-d, %Y %-I:%M %p";

pub type SessionResult<T> = Result<T, SessionError>;

/// User input rejected before any mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// Comment or reply text is empty or whitespace.
    EmptyText,
    /// No text is selected in the document.
    NoSelection,
    /// The selection no longer matches the document content.
    StaleSelection,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyText => write!(f, "comment text must not be empty"),
            Self::NoSelection => write!(f, "select some text before adding a comment"),
            Self::StaleSelection => write!(f, "selected text changed; select it again"),
        }
    }
}

impl Error for ValidationError {}

/// Session-level error surfaced to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionError {
    Validation(ValidationError),
    /// The store refused a newly created entity.
    Rejected(MutationOutcome),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Rejected(outcome) => write!(f, "comment store rejected mutation: {outcome:?}"),
        }
    }
}

impl Error for SessionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Rejected(_) => None,
        }
    }
}

impl From<ValidationError> for SessionError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

/// One open document with its comment state and persistence.
#[derive(Debug)]
pub struct DocumentSession<S: KvStore> {
    document: Document,
    store: CommentStore,
    resolver: SelectionResolver,
    kv: S,
    current_user_id: UserId,
    saved_comments_revision: u64,
}

impl<S: KvStore> DocumentSession<S> {
    /// Opens a session and restores persisted comments and resolution flags.
    ///
    /// The config is expected to be validated by the caller.
    pub fn open(document: impl Into<Document>, kv: S, config: &CoreConfig) -> Self {
        let document = document.into();
        let mut store = CommentStore::new(config.users.clone());

        let comments = load_comments(&kv);
        if !comments.is_empty() {
            store.restore_comments(comments);
        }
        store.load_resolution(ResolutionState::load(&kv));

        info!(
            "event=session_open module=service status=ok document_chars={} comments={} resolved={}",
            document.len_chars(),
            store.len(),
            store.resolution().resolved_ids().count()
        );

        Self {
            document,
            saved_comments_revision: store.comments_revision(),
            store,
            resolver: SelectionResolver::new(),
            kv,
            current_user_id: config.current_user_id.clone(),
        }
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn store(&self) -> &CommentStore {
        &self.store
    }

    /// Mutable store access for annotation clicks and direct API use.
    pub fn store_mut(&mut self) -> &mut CommentStore {
        &mut self.store
    }

    pub fn kv(&self) -> &S {
        &self.kv
    }

    pub fn current_user_id(&self) -> &str {
        &self.current_user_id
    }

    pub fn subscribe(
        &mut self,
        listener: impl FnMut(&StoreEvent) + Send + 'static,
    ) -> SubscriptionId {
        self.store.subscribe(listener)
    }

    /// Applies a pointer-release selection event and returns the current
    /// selection.
    pub fn handle_selection(&mut self, event: &SelectionEvent) -> Option<&Anchor> {
        match self.resolver.resolve(&self.document, event) {
            SelectionChange::Set(anchor) => {
                self.store.set_selected_text(Some(anchor));
            }
            SelectionChange::Clear => {
                if self.store.selected_text().is_some() {
                    self.store.set_selected_text(None);
                }
            }
            SelectionChange::Keep => {}
        }
        self.store.selected_text()
    }

    /// Creates a comment on the current selection as the acting user.
    ///
    /// # Errors
    /// - `Validation(EmptyText)` for blank text.
    /// - `Validation(NoSelection)` when nothing is selected.
    /// - `Validation(StaleSelection)` when the selection no longer matches.
    pub fn submit_comment(&mut self, text: &str) -> SessionResult<CommentId> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        let Some(selection) = self.store.selected_text().cloned() else {
            return Err(ValidationError::NoSelection.into());
        };
        if !selection.check(&self.document).is_valid() {
            return Err(ValidationError::StaleSelection.into());
        }

        let comment = Comment::new(text, self.current_user_id.clone(), selection);
        let comment_id = comment.id.clone();
        let mentions = mentioned_users(&comment.text, self.store.users()).len();
        match self.store.add_comment(comment) {
            MutationOutcome::Applied => {
                debug!(
                    "event=comment_submit module=service status=ok comment_id={} mentions={}",
                    comment_id, mentions
                );
                self.sync_comments();
                Ok(comment_id)
            }
            other => Err(SessionError::Rejected(other)),
        }
    }

    /// Drops the pending selection.
    pub fn cancel_comment(&mut self) {
        self.resolver.reset();
        if self.store.selected_text().is_some() {
            self.store.set_selected_text(None);
        }
    }

    /// Appends a reply from the acting user.
    pub fn submit_reply(&mut self, comment_id: &str, text: &str) -> SessionResult<MutationOutcome> {
        if text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        let reply = crate::model::comment::Reply::new(text, self.current_user_id.clone());
        Ok(self.apply(|store| store.add_reply(comment_id, reply)))
    }

    pub fn edit_comment(&mut self, comment_id: &str, new_text: &str) -> SessionResult<MutationOutcome> {
        if new_text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        Ok(self.apply(|store| store.edit_comment(comment_id, new_text)))
    }

    pub fn edit_reply(
        &mut self,
        comment_id: &str,
        reply_id: &str,
        new_text: &str,
    ) -> SessionResult<MutationOutcome> {
        if new_text.trim().is_empty() {
            return Err(ValidationError::EmptyText.into());
        }
        Ok(self.apply(|store| store.edit_reply(comment_id, reply_id, new_text)))
    }

    pub fn delete_comment(&mut self, comment_id: &str) -> MutationOutcome {
        self.apply(|store| store.delete_comment(comment_id))
    }

    pub fn delete_reply(&mut self, comment_id: &str, reply_id: &str) -> MutationOutcome {
        self.apply(|store| store.delete_reply(comment_id, reply_id))
    }

    /// Marks a comment resolved and saves the resolution flags.
    pub fn resolve(&mut self, comment_id: &str) -> MutationOutcome {
        let outcome = self.store.mark_resolved(comment_id);
        if outcome.is_applied() {
            if let Err(err) = self.store.resolution().save(&self.kv) {
                error!(
                    "event=resolution_save module=service status=error comment_id={} error={}",
                    comment_id, err
                );
            }
        }
        outcome
    }

    /// Focuses a comment, as a click on its highlight does.
    pub fn click_highlight(&mut self, comment_id: &str) -> MutationOutcome {
        self.store.set_active_comment_id(Some(comment_id))
    }

    pub fn clear_active_comment(&mut self) -> MutationOutcome {
        self.store.set_active_comment_id(None)
    }

    /// Renders the document with highlighted anchors.
    pub fn annotate(&self) -> Annotation {
        annotate(&self.document, self.store.comments())
    }

    /// Swaps the document content and reports anchors that went stale.
    ///
    /// A selection that no longer matches the new content is cleared.
    pub fn replace_document(&mut self, text: impl Into<Document>) -> Vec<StaleAnchor> {
        self.document = text.into();
        self.resolver.reset();

        let selection_stale = self
            .store
            .selected_text()
            .is_some_and(|anchor| !anchor.check(&self.document).is_valid());
        if selection_stale {
            self.store.set_selected_text(None);
        }

        let stale = self.annotate().stale().to_vec();
        if !stale.is_empty() {
            warn!(
                "event=document_replace module=service status=degraded stale_anchors={}",
                stale.len()
            );
        }
        stale
    }

    fn apply(
        &mut self,
        mutate: impl FnOnce(&mut CommentStore) -> MutationOutcome,
    ) -> MutationOutcome {
        let outcome = mutate(&mut self.store);
        self.sync_comments();
        outcome
    }

    /// Writes the comment snapshot if the collection changed since the last
    /// successful save.
    fn sync_comments(&mut self) {
        let revision = self.store.comments_revision();
        if revision == self.saved_comments_revision {
            return;
        }
        let written = if self.store.is_empty() {
            self.kv.delete(COMMENTS_STORAGE_KEY).map(|_| ())
        } else {
            match serde_json::to_string(self.store.comments()) {
                Ok(raw) => self.kv.put(COMMENTS_STORAGE_KEY, &raw),
                Err(err) => {
                    error!(
                        "event=comments_save module=service status=error error_code=encode_failed error={}",
                        err
                    );
                    return;
                }
            }
        };
        match written {
            Ok(()) => self.saved_comments_revision = revision,
            Err(err) => error!(
                "event=comments_save module=service status=error error_code=kv_write_failed error={}",
                err
            ),
        }
    }
}

/// Renders an epoch-millisecond timestamp as `MMM d, yyyy h:mm a` (UTC).
///
/// Returns an empty string for out-of-range values.
pub fn format_timestamp(epoch_ms: i64) -> String {
    DateTime::from_timestamp_millis(epoch_ms)
        .map(|at| at.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_default()
}

fn load_comments(kv: &impl KvStore) -> Vec<Comment> {
    let raw = match kv.get(COMMENTS_STORAGE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            error!(
                "event=comments_load module=service status=error error_code=kv_read_failed error={}",
                err
            );
            return Vec::new();
        }
    };
    serde_json::from_str(&raw).unwrap_or_else(|err| {
        warn!(
            "event=comments_load module=service status=error error_code=decode_failed error={}",
            err
        );
        Vec::new()
    })
}
