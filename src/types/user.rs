//! User references
//!
//! Users are owned by an external directory; the ledger only needs their id
//! to check ownership.

use uuid::Uuid;

/// User identifier
pub type UserId = Uuid;

/// Minimal view of a user as exposed by the user directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: String,
}

impl User {
    pub fn new(username: impl Into<String>) -> Self {
        User {
            id: Uuid::new_v4(),
            username: username.into(),
        }
    }
}
