//! Account creation rules
//!
//! Checks ownership and the per-user cardinality of each account type before a
//! new account row is written. The validator only reads; the counts it relies
//! on are stable for the caller's unit because the caller holds the owner lock.

use crate::core::traits::{AccountStore, UserDirectory};
use crate::types::{AccountType, LedgerError, User, UserId};
use std::sync::Arc;

/// Validator for account creation
pub struct AccountValidator {
    users: Arc<dyn UserDirectory>,
    max_pocket_accounts: u64,
    max_deposit_accounts: u64,
}

impl AccountValidator {
    /// Create a validator backed by `users` with the given per-type caps
    pub fn new(
        users: Arc<dyn UserDirectory>,
        max_pocket_accounts: u64,
        max_deposit_accounts: u64,
    ) -> Self {
        AccountValidator {
            users,
            max_pocket_accounts,
            max_deposit_accounts,
        }
    }

    /// Check that the owner exists
    ///
    /// # Errors
    ///
    /// * `UserNotFound` - no user with that id
    pub fn validate_owner(&self, user_id: UserId) -> Result<User, LedgerError> {
        self.users.get_user_by_id(user_id)
    }

    /// Check that `user_id` may open one more account of `account_type`
    ///
    /// # Errors
    ///
    /// * `MainAccountExists` - a second main account was requested
    /// * `MainAccountRequired` - a secondary account was requested before a main one
    /// * `AccountLimitReached` - the type's cap is already reached
    pub fn validate_account_type<S>(
        &self,
        store: &S,
        user_id: UserId,
        account_type: AccountType,
    ) -> Result<(), LedgerError>
    where
        S: AccountStore + ?Sized,
    {
        let main_accounts = store.count_by_user_and_type(user_id, AccountType::Main)?;

        let limit = match account_type {
            AccountType::Main => {
                if main_accounts >= 1 {
                    return Err(LedgerError::MainAccountExists { user: user_id });
                }
                return Ok(());
            }
            AccountType::Pocket => self.max_pocket_accounts,
            AccountType::Deposit => self.max_deposit_accounts,
        };

        if main_accounts == 0 {
            return Err(LedgerError::MainAccountRequired {
                user: user_id,
                account_type,
            });
        }

        let existing = store.count_by_user_and_type(user_id, account_type)?;
        if existing >= limit {
            return Err(LedgerError::AccountLimitReached {
                user: user_id,
                account_type,
                limit,
            });
        }

        Ok(())
    }
}
