//! Core domain logic for docnote: anchored comments on document text.
//! This crate is the single source of truth for comment invariants.

pub mod annotate;
pub mod config;
pub mod db;
pub mod logging;
pub mod mention;
pub mod model;
pub mod repo;
pub mod selection;
pub mod service;
pub mod store;

pub use annotate::annotator::{annotate, revalidate_anchors, Annotation, Segment, StaleAnchor};
pub use config::{ConfigError, CoreConfig};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use mention::{insert_mention, mention_query, mentioned_users, suggest_users, MentionInsertion};
pub use model::anchor::{Anchor, AnchorStatus, StaleReason};
pub use model::comment::{Comment, CommentId, EntityError, Reply, ReplyId};
pub use model::document::Document;
pub use model::user::{default_users, User, UserId};
pub use repo::kv_repo::{KvStore, RepoError, RepoResult, ScopedKvStore, SqliteKvStore};
pub use selection::resolver::{FocusTarget, SelectionChange, SelectionEvent, SelectionResolver};
pub use service::session_service::{
    format_timestamp, DocumentSession, SessionError, SessionResult, ValidationError,
    COMMENTS_STORAGE_KEY,
};
pub use store::comment_store::{
    CommentGroup, CommentStore, MutationOutcome, RejectReason, StoreEvent, SubscriptionId,
};
pub use store::resolution::{ResolutionError, ResolutionState, RESOLVED_STORAGE_KEY};

/// Minimal health-check API for host integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

#[cfg(test)]
mod tests {
    use super::{core_version, ping};

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }
}
