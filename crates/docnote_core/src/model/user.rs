//! Static user reference data.

use serde::{Deserialize, Serialize};

/// Stable identifier of a user.
pub type UserId = String;

/// Author of comments and replies. Immutable for a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: UserId,
    pub name: String,
    /// Avatar image reference (URL or asset key).
    pub avatar_ref: String,
}

impl User {
    pub fn new(
        id: impl Into<UserId>,
        name: impl Into<String>,
        avatar_ref: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            avatar_ref: avatar_ref.into(),
        }
    }
}

/// Seed users available when no configuration overrides them.
pub fn default_users() -> Vec<User> {
    vec![
        User::new("1", "John Doe", "https://i.pravatar.cc/40?img=4"),
        User::new("2", "Jane Smith", "https://i.pravatar.cc/40?img=2"),
        User::new("3", "Bob Johnson", "https://i.pravatar.cc/40?img=3"),
    ]
}
