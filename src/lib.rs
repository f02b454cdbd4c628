//! Bank Ledger Core Library
//! # Overview
//!
//! This library provides the money-moving core of a retail banking backend:
//! accounts with per-user cardinality rules, transfers, deposits and
//! withdrawals applied atomically, and an append-only transaction log. A CSV
//! replay front end drives it with either a sync or an async strategy.
//!
//! # Architecture
//!
//! The system is organized into several key components:
//!
//! - [`types`] - Core data types (Account, TransactionRecord, LedgerError, etc.)
//! - [`config`] - Business limits and store tuning
//! - [`cli`] - CLI arguments parsing
//! - [`core`] - Business logic components:
//!   - [`core::store`] - Committed tables and the atomic unit of work
//!   - [`core::processor`] - Balance transitions for each transaction type
//!   - [`core::account_validator`] - Account ownership and cardinality rules
//!   - [`core::transaction_service`] - Transaction boundary and log reads
//!   - [`core::account_service`] - Account lifecycle
//!   - [`core::ledger`] - Wiring of the services around one store
//! - [`io`] - CSV operation records and reports
//! - [`strategy`] - Sync and async replay pipelines
//!
//! # Transaction Types
//!
//! - **Transfer**: Move funds between two distinct accounts; the source must
//!   keep a strictly positive balance
//! - **Deposit**: Credit funds to an account
//! - **Withdraw**: Debit funds from an account down to zero at most
//!
//! # Account Rules
//!
//! Each user owns exactly one main account, which must exist before any pocket
//! (at most 8) or deposit (at most 3) account is opened. Main accounts cannot be
//! deleted. Balances never go negative and change only through committed
//! transactions.
//!
//! # Example
//!
//! ```
//! use bank_ledger_core::{InMemoryUserDirectory, Ledger, LedgerConfig, UserDirectory};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! let users = Arc::new(InMemoryUserDirectory::new());
//! let alice = users.register("alice");
//! let bob = users.register("bob");
//! let ledger = Ledger::with_random_numbers(
//!     LedgerConfig::default(),
//!     Arc::clone(&users) as Arc<dyn UserDirectory>,
//! );
//!
//! let a = ledger.accounts().create_bank_account(alice.id, "main", Decimal::new(500, 0)).unwrap();
//! let b = ledger.accounts().create_bank_account(bob.id, "main", Decimal::ZERO).unwrap();
//!
//! ledger
//!     .transactions()
//!     .process_transaction(a.account_number.as_str(), b.account_number.as_str(), "transfer", Decimal::new(100, 0))
//!     .unwrap();
//!
//! let b = ledger.accounts().get_bank_account_by_id(b.id).unwrap();
//! assert_eq!(b.balance, Decimal::new(100, 0));
//! ```

// Module declarations
pub mod cli;
pub mod config;
pub mod core;
pub mod io;
pub mod strategy;
pub mod types;

pub use crate::config::LedgerConfig;
pub use crate::core::{
    AccountNumberGenerator, AccountService, AccountStore, InMemoryUserDirectory, Ledger,
    LedgerStore, TransactionLog, TransactionProcessor, TransactionService, UserDirectory,
};
pub use io::{write_accounts_csv, write_transactions_csv};
pub use types::{
    Account, AccountId, AccountNumber, AccountType, ErrorKind, LedgerError, TransactionId,
    TransactionRecord, TransactionRequest, TransactionStatus, TransactionType, User, UserId,
};
