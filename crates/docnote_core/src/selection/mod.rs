//! Selection-to-anchor resolution.
//!
//! # Responsibility
//! - Turn pointer-release selection events into stable document anchors.
//! - Keep the last anchor alive while focus sits in the comment panel.

pub mod resolver;
