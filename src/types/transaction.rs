//! Transaction-related types for the ledger core
//!
//! This module defines the transaction request (what a caller asks for), the
//! transaction record (what the log keeps once the movement is committed) and
//! the identifiers shared between them.

use super::account::AccountNumber;
use super::error::LedgerError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Transaction record identifier (UUID v4, assigned at append time)
pub type TransactionId = Uuid;

/// Transaction types supported by the ledger
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionType {
    /// Move funds between two existing accounts
    Transfer,

    /// Credit funds to an account from outside the ledger
    Deposit,

    /// Debit funds from an account to outside the ledger
    Withdraw,
}

impl TransactionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionType::Transfer => "transfer",
            TransactionType::Deposit => "deposit",
            TransactionType::Withdraw => "withdraw",
        }
    }
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionType {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "transfer" => Ok(TransactionType::Transfer),
            "deposit" => Ok(TransactionType::Deposit),
            "withdraw" => Ok(TransactionType::Withdraw),
            _ => Err(LedgerError::InvalidTransactionType {
                tx_type: s.to_string(),
            }),
        }
    }
}

/// Status of a persisted transaction
///
/// Rejected attempts never reach the log, so the only persisted status is
/// `Success`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    Success,
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransactionStatus::Success => f.write_str("success"),
        }
    }
}

/// A requested monetary operation
///
/// Each variant carries exactly the account numbers its type needs, so the
/// processor matches exhaustively and never sees an unknown type.
#[derive(Debug, Clone, PartialEq)]
pub enum TransactionRequest {
    Transfer {
        from: AccountNumber,
        to: AccountNumber,
        amount: Decimal,
    },
    Deposit {
        to: AccountNumber,
        amount: Decimal,
    },
    Withdraw {
        from: AccountNumber,
        amount: Decimal,
    },
}

impl TransactionRequest {
    /// Build a request from loosely typed boundary input
    ///
    /// Empty account number strings are treated as absent. Account numbers a
    /// type does not use are ignored, matching how deposits carry no source and
    /// withdrawals carry no destination.
    ///
    /// # Errors
    ///
    /// - `InvalidTransactionType` for an unknown type string
    /// - `MissingAccountNumber` when a required account number is empty
    pub fn from_parts(
        from: &str,
        to: &str,
        tx_type: &str,
        amount: Decimal,
    ) -> Result<Self, LedgerError> {
        let tx_type: TransactionType = tx_type.parse()?;
        let require = |value: &str, field: &str| {
            let value = value.trim();
            if value.is_empty() {
                Err(LedgerError::missing_account_number(tx_type, field))
            } else {
                Ok(AccountNumber::new(value))
            }
        };

        match tx_type {
            TransactionType::Transfer => Ok(TransactionRequest::Transfer {
                from: require(from, "source")?,
                to: require(to, "destination")?,
                amount,
            }),
            TransactionType::Deposit => Ok(TransactionRequest::Deposit {
                to: require(to, "destination")?,
                amount,
            }),
            TransactionType::Withdraw => Ok(TransactionRequest::Withdraw {
                from: require(from, "source")?,
                amount,
            }),
        }
    }

    pub fn tx_type(&self) -> TransactionType {
        match self {
            TransactionRequest::Transfer { .. } => TransactionType::Transfer,
            TransactionRequest::Deposit { .. } => TransactionType::Deposit,
            TransactionRequest::Withdraw { .. } => TransactionType::Withdraw,
        }
    }

    pub fn amount(&self) -> Decimal {
        match self {
            TransactionRequest::Transfer { amount, .. }
            | TransactionRequest::Deposit { amount, .. }
            | TransactionRequest::Withdraw { amount, .. } => *amount,
        }
    }
}

/// Entry to append to the transaction log
#[derive(Debug, Clone, PartialEq)]
pub struct NewTransaction {
    pub from_account_number: Option<AccountNumber>,
    pub to_account_number: Option<AccountNumber>,
    pub amount: Decimal,
    pub tx_type: TransactionType,
}

/// Immutable record of one committed fund movement
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRecord {
    pub id: TransactionId,

    /// Source account (absent for deposits)
    pub from_account_number: Option<AccountNumber>,

    /// Destination account (absent for withdrawals)
    pub to_account_number: Option<AccountNumber>,

    /// Strictly positive amount moved
    pub amount: Decimal,

    pub tx_type: TransactionType,

    pub status: TransactionStatus,
}

impl TransactionRecord {
    /// Stamp a log entry with a fresh id and the success status
    pub fn from_entry(entry: NewTransaction) -> Self {
        TransactionRecord {
            id: Uuid::new_v4(),
            from_account_number: entry.from_account_number,
            to_account_number: entry.to_account_number,
            amount: entry.amount,
            tx_type: entry.tx_type,
            status: TransactionStatus::Success,
        }
    }

    /// Whether the given account is the source or destination of this record
    pub fn involves(&self, account_number: &AccountNumber) -> bool {
        self.from_account_number.as_ref() == Some(account_number)
            || self.to_account_number.as_ref() == Some(account_number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ErrorKind;
    use rstest::rstest;

    #[rstest]
    #[case("transfer", TransactionType::Transfer)]
    #[case("deposit", TransactionType::Deposit)]
    #[case("withdraw", TransactionType::Withdraw)]
    #[case("Transfer", TransactionType::Transfer)]
    fn test_transaction_type_parsing(#[case] input: &str, #[case] expected: TransactionType) {
        assert_eq!(input.parse::<TransactionType>().unwrap(), expected);
    }

    #[test]
    fn test_from_parts_transfer() {
        let request =
            TransactionRequest::from_parts("111", "222", "transfer", Decimal::new(100, 0)).unwrap();

        assert_eq!(
            request,
            TransactionRequest::Transfer {
                from: AccountNumber::new("111"),
                to: AccountNumber::new("222"),
                amount: Decimal::new(100, 0),
            }
        );
        assert_eq!(request.tx_type(), TransactionType::Transfer);
        assert_eq!(request.amount(), Decimal::new(100, 0));
    }

    #[test]
    fn test_from_parts_deposit_ignores_source() {
        let request =
            TransactionRequest::from_parts("", "222", "deposit", Decimal::new(50, 0)).unwrap();

        assert_eq!(
            request,
            TransactionRequest::Deposit {
                to: AccountNumber::new("222"),
                amount: Decimal::new(50, 0),
            }
        );
    }

    #[rstest]
    #[case::unknown_type("111", "222", "refund")]
    #[case::transfer_without_source("", "222", "transfer")]
    #[case::transfer_without_destination("111", " ", "transfer")]
    #[case::deposit_without_destination("111", "", "deposit")]
    #[case::withdraw_without_source("", "222", "withdraw")]
    fn test_from_parts_rejects(#[case] from: &str, #[case] to: &str, #[case] tx_type: &str) {
        let err = TransactionRequest::from_parts(from, to, tx_type, Decimal::ONE).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_record_involves_source_and_destination() {
        let record = TransactionRecord::from_entry(NewTransaction {
            from_account_number: Some(AccountNumber::new("111")),
            to_account_number: Some(AccountNumber::new("222")),
            amount: Decimal::ONE,
            tx_type: TransactionType::Transfer,
        });

        assert!(record.involves(&AccountNumber::new("111")));
        assert!(record.involves(&AccountNumber::new("222")));
        assert!(!record.involves(&AccountNumber::new("333")));
        assert_eq!(record.status, TransactionStatus::Success);
    }
}
