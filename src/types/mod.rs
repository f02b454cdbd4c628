//! Types module
//!
//! Contains core data structures used throughout the ledger.
//! This module organizes types into logical submodules:
//! - `account`: Account, account type and account number
//! - `transaction`: Transaction requests, records and identifiers
//! - `user`: User references
//! - `page`: Pagination window
//! - `error`: Error types for the ledger

pub mod account;
pub mod error;
pub mod page;
pub mod transaction;
pub mod user;

pub use account::{Account, AccountId, AccountNumber, AccountType, NewAccount};
pub use error::{ErrorKind, LedgerError};
pub use page::Page;
pub use transaction::{
    NewTransaction, TransactionId, TransactionRecord, TransactionRequest, TransactionStatus,
    TransactionType,
};
pub use user::{User, UserId};
