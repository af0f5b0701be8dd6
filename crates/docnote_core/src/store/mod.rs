//! Comment store: the single writer of comment, reply and focus state.
//!
//! # Responsibility
//! - Own the ordered comment collection, the selection and the active
//!   comment pointer for one document session.
//! - Group comments into threads by anchored text.
//! - Track resolution flags on their own persistence lifecycle.
//! - Notify subscribers after every applied mutation.
//!
//! # Invariants
//! - Missing-reference mutations are no-ops that report `MutationOutcome::NotFound`.
//! - Resolved comments are read-only except for deletion.

pub mod comment_store;
pub mod resolution;
