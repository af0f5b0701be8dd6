//! Document annotation: anchored comments rendered as highlighted segments.
//!
//! # Responsibility
//! - Revalidate every comment anchor against the current document text.
//! - Split the document into plain and highlighted segments.
//! - Route highlight clicks back into the comment store.
//!
//! # Invariants
//! - Output is deterministic for a given document and comment list.
//! - Highlights never overlap; a later-starting overlapping anchor is dropped.

pub mod annotator;
