//! In-memory user directory
//!
//! Users are managed outside the ledger; this directory is the lookup the
//! ledger consumes, backed by a concurrent map so replay workers can register
//! and resolve users from several threads.

use crate::core::traits::UserDirectory;
use crate::types::{LedgerError, User, UserId};
use dashmap::DashMap;

/// Thread-safe in-memory user lookup
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    users: DashMap<UserId, User>,
}

impl InMemoryUserDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new user with a fresh id
    pub fn register(&self, username: impl Into<String>) -> User {
        let user = User::new(username);
        self.users.insert(user.id, user.clone());
        user
    }

    /// Insert or replace a user
    pub fn insert(&self, user: User) {
        self.users.insert(user.id, user);
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

impl UserDirectory for InMemoryUserDirectory {
    fn get_user_by_id(&self, id: UserId) -> Result<User, LedgerError> {
        self.users
            .get(&id)
            .map(|user| user.value().clone())
            .ok_or(LedgerError::UserNotFound { user: id })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_then_lookup() {
        let directory = InMemoryUserDirectory::new();
        let user = directory.register("bob");

        assert_eq!(directory.get_user_by_id(user.id).unwrap(), user);
        assert_eq!(directory.len(), 1);
    }

    #[test]
    fn test_unknown_user() {
        let directory = InMemoryUserDirectory::new();
        let id = uuid::Uuid::new_v4();

        assert_eq!(
            directory.get_user_by_id(id).unwrap_err(),
            LedgerError::UserNotFound { user: id }
        );
        assert!(directory.is_empty());
    }
}
