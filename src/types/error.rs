//! Error types for the ledger core
//!
//! This module defines every failure the ledger can report. Each variant carries
//! enough context to explain the rejection, and every variant maps onto one of
//! the coarse [`ErrorKind`] categories that callers translate into their own
//! transport status codes.
//!
//! # Error Categories
//!
//! - **InvalidArgument**: malformed input (unknown types, same-account transfers, bad amounts)
//! - **NotFound**: referenced user, account or transaction does not exist
//! - **FailedPrecondition**: a business rule is violated by the current state
//! - **Conflict**: a cardinality or uniqueness limit is reached
//! - **Internal**: the store itself failed (poisoned lock, lock timeout)

use super::account::{AccountId, AccountNumber, AccountType};
use super::transaction::{TransactionId, TransactionType};
use super::user::UserId;
use rust_decimal::Decimal;
use std::fmt;
use thiserror::Error;

/// Coarse error taxonomy shared by all ledger operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    InvalidArgument,
    NotFound,
    FailedPrecondition,
    Conflict,
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::InvalidArgument => "invalid argument",
            ErrorKind::NotFound => "not found",
            ErrorKind::FailedPrecondition => "failed precondition",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Internal => "internal",
        };
        f.write_str(name)
    }
}

/// Main error type for the ledger core
///
/// Validators and the processor return the most specific variant available;
/// services and the store propagate it unchanged.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LedgerError {
    /// No user with the given id exists in the user directory
    #[error("User {user} does not exist")]
    UserNotFound { user: UserId },

    /// No account carries the given account number
    #[error("Account {account_number} not found")]
    AccountNotFound { account_number: AccountNumber },

    /// No account carries the given internal id
    #[error("Account with id {id} not found")]
    AccountIdNotFound { id: AccountId },

    /// No transaction record carries the given id
    #[error("Transaction {id} not found")]
    TransactionNotFound { id: TransactionId },

    /// Transaction type string outside the supported set
    #[error("Invalid transaction type '{tx_type}'")]
    InvalidTransactionType { tx_type: String },

    /// Account type string outside the supported set
    #[error("Invalid account type '{account_type}'")]
    InvalidAccountType { account_type: String },

    /// Identifier that cannot be parsed
    #[error("Invalid identifier '{value}'")]
    InvalidIdentifier { value: String },

    /// Amount that is not acceptable for the operation
    ///
    /// Transaction amounts must be strictly positive; opening balances must
    /// not be negative.
    #[error("Invalid amount {amount} for {operation}")]
    InvalidAmount { amount: Decimal, operation: String },

    /// A transaction request lacks an account number its type requires
    #[error("{tx_type} transaction requires a {field} account number")]
    MissingAccountNumber {
        tx_type: TransactionType,
        field: String,
    },

    /// Source and destination of a transfer are the same account
    #[error("Cannot transfer to the same account {account_number}")]
    SameAccountTransfer { account_number: AccountNumber },

    /// Crediting an account would overflow the decimal range
    #[error("Arithmetic overflow in {operation} for account {account_number}")]
    ArithmeticOverflow {
        operation: String,
        account_number: AccountNumber,
    },

    /// The source account cannot cover the requested amount
    #[error(
        "Insufficient balance in account {account_number}: balance {balance}, requested {requested}"
    )]
    InsufficientBalance {
        account_number: AccountNumber,
        balance: Decimal,
        requested: Decimal,
    },

    /// Secondary accounts require the user to own a main account first
    #[error("User {user} must have a main account to open a {account_type} account")]
    MainAccountRequired {
        user: UserId,
        account_type: AccountType,
    },

    /// Main accounts cannot be removed through the ledger
    #[error("Main account {id} cannot be deleted, contact an administrator")]
    MainAccountDeletion { id: AccountId },

    /// The user already owns a main account
    #[error("User {user} already has a main account")]
    MainAccountExists { user: UserId },

    /// The per-user cap for a secondary account type is reached
    #[error("User {user} reached the {account_type} account limit of {limit}")]
    AccountLimitReached {
        user: UserId,
        account_type: AccountType,
        limit: u64,
    },

    /// The generated account number is already in use
    #[error("Account number {account_number} already exists")]
    DuplicateAccountNumber { account_number: AccountNumber },

    /// A row lock could not be acquired in time
    #[error("Timed out waiting for lock on {resource}")]
    LockTimeout { resource: String },

    /// Failure inside the store itself
    #[error("Storage error: {message}")]
    Storage { message: String },
}

impl LedgerError {
    /// Classify this error into the coarse taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            LedgerError::InvalidTransactionType { .. }
            | LedgerError::InvalidAccountType { .. }
            | LedgerError::InvalidIdentifier { .. }
            | LedgerError::InvalidAmount { .. }
            | LedgerError::MissingAccountNumber { .. }
            | LedgerError::SameAccountTransfer { .. }
            | LedgerError::ArithmeticOverflow { .. } => ErrorKind::InvalidArgument,
            LedgerError::UserNotFound { .. }
            | LedgerError::AccountNotFound { .. }
            | LedgerError::AccountIdNotFound { .. }
            | LedgerError::TransactionNotFound { .. } => ErrorKind::NotFound,
            LedgerError::InsufficientBalance { .. }
            | LedgerError::MainAccountRequired { .. }
            | LedgerError::MainAccountDeletion { .. } => ErrorKind::FailedPrecondition,
            LedgerError::MainAccountExists { .. }
            | LedgerError::AccountLimitReached { .. }
            | LedgerError::DuplicateAccountNumber { .. } => ErrorKind::Conflict,
            LedgerError::LockTimeout { .. } | LedgerError::Storage { .. } => ErrorKind::Internal,
        }
    }
}

// Helper functions for creating common errors

impl LedgerError {
    /// Create an AccountNotFound error
    pub fn account_not_found(account_number: &AccountNumber) -> Self {
        LedgerError::AccountNotFound {
            account_number: account_number.clone(),
        }
    }

    /// Create an InsufficientBalance error
    pub fn insufficient_balance(
        account_number: &AccountNumber,
        balance: Decimal,
        requested: Decimal,
    ) -> Self {
        LedgerError::InsufficientBalance {
            account_number: account_number.clone(),
            balance,
            requested,
        }
    }

    /// Create an InvalidAmount error
    pub fn invalid_amount(amount: Decimal, operation: &str) -> Self {
        LedgerError::InvalidAmount {
            amount,
            operation: operation.to_string(),
        }
    }

    /// Create a MissingAccountNumber error
    pub fn missing_account_number(tx_type: TransactionType, field: &str) -> Self {
        LedgerError::MissingAccountNumber {
            tx_type,
            field: field.to_string(),
        }
    }

    /// Create an ArithmeticOverflow error
    pub fn arithmetic_overflow(operation: &str, account_number: &AccountNumber) -> Self {
        LedgerError::ArithmeticOverflow {
            operation: operation.to_string(),
            account_number: account_number.clone(),
        }
    }

    /// Create a Storage error
    pub fn storage(message: impl Into<String>) -> Self {
        LedgerError::Storage {
            message: message.into(),
        }
    }
}

impl<T> From<std::sync::PoisonError<T>> for LedgerError {
    fn from(error: std::sync::PoisonError<T>) -> Self {
        LedgerError::storage(format!("lock poisoned: {}", error))
    }
}
