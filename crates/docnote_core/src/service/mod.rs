//! Session-level use cases.
//!
//! # Responsibility
//! - Wire document, selection resolver, comment store and persistence into
//!   one explicit context object per open document.
//! - Apply input validation before mutations reach the store.
//!
//! # Invariants
//! - Exactly one `DocumentSession` owns a given document's comment state.
//! - Persistence failures never roll back in-memory state.

pub mod session_service;
