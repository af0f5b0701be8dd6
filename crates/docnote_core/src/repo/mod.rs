//! Persistence collaborator contracts and implementations.
//!
//! # Responsibility
//! - Define the key-value contract the session persists through.
//! - Keep SQL details behind the repository boundary.
//!
//! # Invariants
//! - Keys are non-empty; values are opaque UTF-8 strings (JSON by convention).

pub mod kv_repo;
