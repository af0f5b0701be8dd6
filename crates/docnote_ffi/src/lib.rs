//! Flutter-facing bindings for docnote core.

pub mod api;
