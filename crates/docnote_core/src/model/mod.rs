//! Domain model for anchored document comments.
//!
//! # Responsibility
//! - Define the document text, anchor, comment, reply and user shapes.
//! - Validate entities before they cross the store boundary.
//!
//! # Invariants
//! - Anchor offsets are character offsets into `Document::text`, never bytes.
//! - Replies are owned by exactly one comment and share its lifecycle.

pub mod anchor;
pub mod comment;
pub mod document;
pub mod user;
