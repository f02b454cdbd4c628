//! Account-related types for the ledger core
//!
//! This module defines the bank account structure, its closed set of account
//! types and the account number identifier.

use super::error::LedgerError;
use super::user::UserId;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Internal account identifier (UUID v4, assigned at creation)
pub type AccountId = Uuid;

/// Public account number
///
/// A fixed-length numeric string minted by the ledger when the account is
/// opened. Numbers are unique across the store and never reused.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountNumber(String);

impl AccountNumber {
    pub fn new(number: impl Into<String>) -> Self {
        AccountNumber(number.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AccountNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Account types supported by the ledger
///
/// Every user owns exactly one main account; pocket and deposit accounts are
/// secondary accounts subject to per-user caps and require a main account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    /// The user's single primary account
    Main,

    /// Secondary spending account (at most 8 per user by default)
    Pocket,

    /// Secondary savings account (at most 3 per user by default)
    Deposit,
}

impl AccountType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountType::Main => "main",
            AccountType::Pocket => "pocket",
            AccountType::Deposit => "deposit",
        }
    }
}

impl fmt::Display for AccountType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AccountType {
    type Err = LedgerError;

    /// Parse an account type, accepting the legacy spellings as well
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "main" | "rekening-utama" => Ok(AccountType::Main),
            "pocket" | "saku" => Ok(AccountType::Pocket),
            "deposit" | "deposito" => Ok(AccountType::Deposit),
            _ => Err(LedgerError::InvalidAccountType {
                account_type: s.to_string(),
            }),
        }
    }
}

/// Bank account state
///
/// The balance is only ever mutated by the transaction processor; everything
/// else treats it as read-only.
#[derive(Debug, Clone, PartialEq)]
pub struct Account {
    /// Internal identifier
    pub id: AccountId,

    /// Owning user
    pub user_id: UserId,

    pub account_type: AccountType,

    /// Unique public account number
    pub account_number: AccountNumber,

    /// Current balance, never negative at rest
    pub balance: Decimal,

    /// Whether the account is active
    pub active: bool,
}

/// Request to open a new account
///
/// The account number is minted by the ledger, so the request only carries
/// the owner, the type and the opening balance.
#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub user_id: UserId,
    pub account_type: AccountType,
    pub initial_balance: Decimal,
}

impl Account {
    /// Build a freshly opened, active account
    pub fn open(request: &NewAccount, account_number: AccountNumber) -> Self {
        Account {
            id: Uuid::new_v4(),
            user_id: request.user_id,
            account_type: request.account_type,
            account_number,
            balance: request.initial_balance,
            active: true,
        }
    }
}
