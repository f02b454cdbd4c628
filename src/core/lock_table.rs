//! Row locks for units of work
//!
//! The lock table gives each unit of work exclusive ownership of the rows it
//! is about to change. A unit acquires a row with [`LockTable::acquire`] and
//! keeps it until the unit commits or rolls back, at which point all of its
//! rows are released together.
//!
//! Locks are re-entrant for the owning unit: acquiring the same row twice is a
//! no-op. Waiters block on a condition variable and give up with
//! `LedgerError::LockTimeout` once the configured timeout elapses, so a stuck
//! unit can never hang its peers forever.

use crate::types::{AccountNumber, LedgerError, UserId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};
use tracing::debug;

/// Identifier of a unit of work, unique within a store
pub type UnitId = u64;

/// A lockable row
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum LockKey {
    /// An account row, keyed by account number
    Account(AccountNumber),

    /// All accounts owned by a user; taken before counting or creating them
    Owner(UserId),
}

impl fmt::Display for LockKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LockKey::Account(number) => write!(f, "account {}", number),
            LockKey::Owner(user) => write!(f, "owner {}", user),
        }
    }
}

/// Table of currently held row locks
#[derive(Debug, Default)]
pub struct LockTable {
    /// Row → owning unit
    held: Mutex<HashMap<LockKey, UnitId>>,

    /// Signalled whenever a unit releases its rows
    released: Condvar,
}

impl LockTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Acquire `key` for `unit`, waiting at most `timeout`
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - the lock was newly acquired and must be released later
    /// * `Ok(false)` - the unit already held the lock
    ///
    /// # Errors
    ///
    /// * `LockTimeout` - another unit kept the row for longer than `timeout`
    /// * `Storage` - the table mutex was poisoned
    pub fn acquire(&self, key: &LockKey, unit: UnitId, timeout: Duration) -> Result<bool, LedgerError> {
        let deadline = Instant::now() + timeout;
        let mut held = self.held.lock()?;

        loop {
            match held.get(key).copied() {
                None => {
                    held.insert(key.clone(), unit);
                    return Ok(true);
                }
                Some(owner) if owner == unit => return Ok(false),
                Some(owner) => {
                    let now = Instant::now();
                    if now >= deadline {
                        return Err(LedgerError::LockTimeout {
                            resource: key.to_string(),
                        });
                    }

                    debug!(unit, owner, resource = %key, "waiting for row lock");
                    let (guard, _) = self.released.wait_timeout(held, deadline - now)?;
                    held = guard;
                }
            }
        }
    }

    /// Release every key in `keys` still owned by `unit` and wake waiters
    pub fn release_all(&self, unit: UnitId, keys: &[LockKey]) {
        if keys.is_empty() {
            return;
        }

        // A poisoned table still has to hand rows back, otherwise waiters
        // would only ever leave through the timeout.
        let mut held = match self.held.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        for key in keys {
            if held.get(key) == Some(&unit) {
                held.remove(key);
            }
        }
        drop(held);

        self.released.notify_all();
    }

    /// Number of rows currently locked
    pub fn held_count(&self) -> usize {
        self.held.lock().map(|held| held.len()).unwrap_or(0)
    }
}
