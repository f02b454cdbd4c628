//! Core traits for account storage, the transaction log and external collaborators
//!
//! The validators and the processor only ever talk to these traits, never to a
//! concrete store. The ledger's own [`crate::core::UnitOfWork`] implements both
//! storage traits, so every read and write issued while handling one request
//! lands in the same atomic unit.

use crate::types::{
    Account, AccountId, AccountNumber, AccountType, LedgerError, NewTransaction, Page, TransactionId,
    TransactionRecord, User, UserId,
};

/// Trait for reading and writing bank accounts
///
/// Reads observe the unit's own pending writes. Writes take the row lock of the
/// account they touch and become visible to other units only after commit.
pub trait AccountStore {
    /// Get an account by its public account number
    fn get_by_account_number(&self, account_number: &AccountNumber)
        -> Result<Account, LedgerError>;

    /// Get an account by its internal id
    fn get_by_id(&self, id: AccountId) -> Result<Account, LedgerError>;

    /// Lock an account row for the rest of the unit, then read it
    ///
    /// Any balance check made on the returned account stays valid until the
    /// unit ends, because no other unit can write the row in between.
    fn get_for_update(&mut self, account_number: &AccountNumber) -> Result<Account, LedgerError>;

    /// Lock every account owned by `user_id` against concurrent creation
    fn lock_owner(&mut self, user_id: UserId) -> Result<(), LedgerError>;

    /// Overwrite an existing account row with `account`
    ///
    /// Full-row semantics: callers must re-read before changing a single field.
    fn update(&mut self, account: &Account) -> Result<Account, LedgerError>;

    /// Insert a new account row
    fn create(&mut self, account: Account) -> Result<Account, LedgerError>;

    /// Remove an account row
    fn delete(&mut self, id: AccountId) -> Result<(), LedgerError>;

    /// Count the accounts of one type owned by a user
    fn count_by_user_and_type(
        &self,
        user_id: UserId,
        account_type: AccountType,
    ) -> Result<u64, LedgerError>;

    /// List accounts in storage order
    fn list_accounts(&self, page: Page) -> Result<Vec<Account>, LedgerError>;

    /// List every account owned by a user, in storage order
    fn list_by_user(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError>;
}

/// Trait for the append-only transaction log
pub trait TransactionLog {
    /// Append a committed movement and return the stamped record
    fn append(&mut self, entry: NewTransaction) -> Result<TransactionRecord, LedgerError>;

    /// Get one record by id
    fn get_transaction(&self, id: TransactionId) -> Result<TransactionRecord, LedgerError>;

    /// All records where the account is source or destination, in log order
    fn transactions_for_account(
        &self,
        account_number: &AccountNumber,
    ) -> Result<Vec<TransactionRecord>, LedgerError>;

    /// Records in log order
    fn list_transactions(&self, page: Page) -> Result<Vec<TransactionRecord>, LedgerError>;
}

/// External user lookup
pub trait UserDirectory: Send + Sync {
    /// Get a user, failing with `UserNotFound` if there is none
    fn get_user_by_id(&self, id: UserId) -> Result<User, LedgerError>;
}

/// Source of fresh account numbers
pub trait AccountNumberGenerator: Send + Sync {
    fn generate(&self) -> Result<AccountNumber, LedgerError>;
}
