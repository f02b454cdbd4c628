//! Core business logic module
//!
//! This module contains the ledger components:
//! - `traits` - Storage and collaborator seams
//! - `store` - Committed tables and the atomic unit of work
//! - `lock_table` - Row locks held by units of work
//! - `account_validator` - Ownership and account-type cardinality rules
//! - `processor` - Transfer, deposit and withdraw state transitions
//! - `transaction_service` - Unit-of-work boundary and log reads
//! - `account_service` - Account lifecycle and reads
//! - `ledger` - Explicit wiring of all of the above

pub mod account_service;
pub mod account_validator;
pub mod ledger;
pub mod lock_table;
pub mod number_generator;
pub mod processor;
pub mod store;
pub mod traits;
pub mod transaction_service;
pub mod user_directory;

pub use account_service::AccountService;
pub use account_validator::AccountValidator;
pub use ledger::Ledger;
pub use lock_table::{LockKey, LockTable, UnitId};
pub use number_generator::RandomAccountNumberGenerator;
pub use processor::TransactionProcessor;
pub use store::{LedgerStore, UnitOfWork};
pub use traits::{AccountNumberGenerator, AccountStore, TransactionLog, UserDirectory};
pub use transaction_service::TransactionService;
pub use user_directory::InMemoryUserDirectory;
