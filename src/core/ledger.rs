//! Ledger wiring
//!
//! Builds the store, the validator and both services from a configuration and
//! the two external collaborators. Every dependency is passed in explicitly;
//! there is no global state, so several ledgers can live side by side.

use crate::config::LedgerConfig;
use crate::core::account_service::AccountService;
use crate::core::account_validator::AccountValidator;
use crate::core::number_generator::RandomAccountNumberGenerator;
use crate::core::store::LedgerStore;
use crate::core::traits::{AccountNumberGenerator, UserDirectory};
use crate::core::transaction_service::TransactionService;
use std::sync::Arc;

/// A fully wired ledger
pub struct Ledger {
    store: Arc<LedgerStore>,
    accounts: AccountService,
    transactions: TransactionService,
}

impl Ledger {
    /// Wire a ledger around the given user directory and number generator
    pub fn new(
        config: LedgerConfig,
        users: Arc<dyn UserDirectory>,
        generator: Arc<dyn AccountNumberGenerator>,
    ) -> Self {
        let store = Arc::new(LedgerStore::new(config.lock_timeout));
        let validator = AccountValidator::new(
            users,
            config.max_pocket_accounts,
            config.max_deposit_accounts,
        );

        let accounts = AccountService::new(
            Arc::clone(&store),
            validator,
            generator,
            config.account_number_attempts,
            config.default_page_limit,
        );
        let transactions = TransactionService::new(Arc::clone(&store), config.default_page_limit);

        Ledger {
            store,
            accounts,
            transactions,
        }
    }

    /// Wire a ledger that mints random numbers of the configured length
    pub fn with_random_numbers(config: LedgerConfig, users: Arc<dyn UserDirectory>) -> Self {
        let generator = Arc::new(RandomAccountNumberGenerator::new(
            config.account_number_length,
        ));
        Self::new(config, users, generator)
    }

    pub fn accounts(&self) -> &AccountService {
        &self.accounts
    }

    pub fn transactions(&self) -> &TransactionService {
        &self.transactions
    }

    /// Shared store, read-only outside the crate
    ///
    /// Exposes the account and transaction counts and the number of held row
    /// locks. Writes go through [`Ledger::accounts`] and [`Ledger::transactions`].
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }
}
