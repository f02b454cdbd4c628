//! Ledger configuration
//!
//! Business limits and store tuning knobs. Every field has a default matching
//! the production rules, so `LedgerConfig::default()` is the normal choice and
//! the `with_*` methods exist for tests and the CLI.

use std::time::Duration;

/// Configuration for a [`crate::Ledger`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    /// Number of digits in a minted account number
    pub account_number_length: usize,

    /// Maximum pocket accounts per user
    pub max_pocket_accounts: u64,

    /// Maximum deposit accounts per user
    pub max_deposit_accounts: u64,

    /// How many fresh numbers to try when a minted number collides
    pub account_number_attempts: usize,

    /// How long a unit of work waits for a row lock before giving up
    pub lock_timeout: Duration,

    /// Page size used when a listing is requested with a zero limit
    pub default_page_limit: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            account_number_length: 10,
            max_pocket_accounts: 8,
            max_deposit_accounts: 3,
            account_number_attempts: 5,
            lock_timeout: Duration::from_secs(5),
            default_page_limit: 10,
        }
    }
}

impl LedgerConfig {
    pub fn with_lock_timeout(mut self, lock_timeout: Duration) -> Self {
        self.lock_timeout = lock_timeout;
        self
    }

    pub fn with_account_number_length(mut self, length: usize) -> Self {
        self.account_number_length = length;
        self
    }

    pub fn with_account_limits(mut self, max_pocket: u64, max_deposit: u64) -> Self {
        self.max_pocket_accounts = max_pocket;
        self.max_deposit_accounts = max_deposit;
        self
    }
}
