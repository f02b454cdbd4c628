//! CSV format handling for replay operations and ledger reports
//!
//! This module centralizes all CSV format concerns, providing:
//! - `OperationRecord` structure for deserialization
//! - Conversion from CSV records to replay [`Operation`]s
//! - Account and transaction report serialization
//!
//! All functions are pure (no I/O) for easy testing.
//!
//! # Input format
//!
//! ```text
//! type,user,account,to,account_type,amount
//! user,alice,,,,
//! open,alice,a1,,main,500000
//! open,alice,a2,,pocket,
//! deposit,,,a2,,50000
//! transfer,,a1,a2,,100000
//! withdraw,,a1,,,1000
//! close,,a2,,,
//! ```
//!
//! Users and accounts are referred to by aliases chosen in the file; the
//! replay session maps them to the generated ids and account numbers.

use crate::types::{AccountType, TransactionStatus, TransactionType};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// CSV record structure for deserialization
///
/// Every column but `type` may be empty; which ones are required depends on
/// the operation type and is checked by [`convert_operation_record`].
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct OperationRecord {
    #[serde(rename = "type")]
    pub op_type: String,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub account: Option<String>,
    #[serde(default)]
    pub to: Option<String>,
    #[serde(default)]
    pub account_type: Option<String>,
    #[serde(default)]
    pub amount: Option<String>,
}

/// One replayable ledger operation
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Register a user under an alias
    RegisterUser { user: String },

    /// Open an account for a registered user
    OpenAccount {
        user: String,
        account: String,
        account_type: AccountType,
        initial_balance: Decimal,
    },

    /// Delete an account
    CloseAccount { account: String },

    /// Move funds; account aliases a type does not use are empty
    Transaction {
        tx_type: TransactionType,
        from: String,
        to: String,
        amount: Decimal,
    },
}

impl Operation {
    /// User alias this operation is scoped to, if any
    pub fn user(&self) -> Option<&str> {
        match self {
            Operation::RegisterUser { user } | Operation::OpenAccount { user, .. } => {
                Some(user.as_str())
            }
            Operation::CloseAccount { .. } | Operation::Transaction { .. } => None,
        }
    }

    /// Account aliases this operation reads or writes
    pub fn accounts(&self) -> Vec<&str> {
        match self {
            Operation::RegisterUser { .. } => Vec::new(),
            Operation::OpenAccount { account, .. } | Operation::CloseAccount { account } => {
                vec![account.as_str()]
            }
            Operation::Transaction { from, to, .. } => [from.as_str(), to.as_str()]
                .into_iter()
                .filter(|alias| !alias.is_empty())
                .collect(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn required(value: Option<String>, column: &str, op_type: &str) -> Result<String, String> {
    non_empty(value).ok_or_else(|| format!("'{}' operation requires the {} column", op_type, column))
}

fn parse_amount(value: Option<String>) -> Result<Option<Decimal>, String> {
    match non_empty(value) {
        Some(amount) => Decimal::from_str(&amount)
            .map(Some)
            .map_err(|_| format!("Invalid amount '{}'", amount)),
        None => Ok(None),
    }
}

/// Convert an OperationRecord to an Operation
///
/// This function:
/// - Parses the operation type (case insensitive)
/// - Checks the columns required by that type are present
/// - Parses the account type and the amount
///
/// # Arguments
///
/// * `record` - The deserialized CSV record
///
/// # Returns
///
/// Result containing either:
/// - Ok(Operation) - Successfully converted record
/// - Err(String) - Error message describing the conversion failure
pub fn convert_operation_record(record: OperationRecord) -> Result<Operation, String> {
    let op_type = record.op_type.trim().to_lowercase();

    match op_type.as_str() {
        "user" => Ok(Operation::RegisterUser {
            user: required(record.user, "user", &op_type)?,
        }),
        "open" => {
            let user = required(record.user, "user", &op_type)?;
            let account = required(record.account, "account", &op_type)?;
            let account_type = required(record.account_type, "account_type", &op_type)?
                .parse::<AccountType>()
                .map_err(|e| e.to_string())?;
            let initial_balance = parse_amount(record.amount)?.unwrap_or(Decimal::ZERO);

            Ok(Operation::OpenAccount {
                user,
                account,
                account_type,
                initial_balance,
            })
        }
        "close" => Ok(Operation::CloseAccount {
            account: required(record.account, "account", &op_type)?,
        }),
        _ => {
            let tx_type = op_type
                .parse::<TransactionType>()
                .map_err(|_| format!("Invalid operation type: '{}'", record.op_type))?;
            let amount = parse_amount(record.amount)?
                .ok_or_else(|| format!("{} operation requires an amount", tx_type))?;

            Ok(Operation::Transaction {
                tx_type,
                from: non_empty(record.account).unwrap_or_default(),
                to: non_empty(record.to).unwrap_or_default(),
                amount,
            })
        }
    }
}

/// Final state of one account, keyed by its alias
#[derive(Debug, Clone, PartialEq)]
pub struct AccountRow {
    pub account: String,
    pub user: String,
    pub account_type: AccountType,
    pub balance: Decimal,
    pub active: bool,
}

/// One committed transaction, with accounts shown by alias
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionRow {
    pub from: String,
    pub to: String,
    pub amount: Decimal,
    pub tx_type: TransactionType,
    pub status: TransactionStatus,
}

/// Write account states to CSV format
///
/// Writes accounts in CSV format with columns: account, user, account_type,
/// balance, active. Rows are sorted by account alias for deterministic output.
///
/// # Arguments
///
/// * `accounts` - Slice of account rows to write
/// * `output` - Mutable reference to a writer for outputting CSV
///
/// # Returns
///
/// * `Ok(())` if writing succeeded
/// * `Err(String)` if a write error occurred
pub fn write_accounts_csv(accounts: &[AccountRow], output: &mut dyn Write) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["account", "user", "account_type", "balance", "active"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by(|a, b| a.account.cmp(&b.account));

    for row in sorted_accounts {
        writer
            .write_record(&[
                row.account,
                row.user,
                row.account_type.to_string(),
                format!("{:.2}", row.balance),
                row.active.to_string(),
            ])
            .map_err(|e| format!("Failed to write account record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}

/// Write the transaction log to CSV format
///
/// Columns: from, to, amount, type, status. Rows keep the given (log) order.
pub fn write_transactions_csv(
    transactions: &[TransactionRow],
    output: &mut dyn Write,
) -> Result<(), String> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer
        .write_record(["from", "to", "amount", "type", "status"])
        .map_err(|e| format!("Failed to write CSV header: {}", e))?;

    for row in transactions {
        writer
            .write_record(&[
                row.from.clone(),
                row.to.clone(),
                format!("{:.2}", row.amount),
                row.tx_type.to_string(),
                row.status.to_string(),
            ])
            .map_err(|e| format!("Failed to write transaction record: {}", e))?;
    }

    writer
        .flush()
        .map_err(|e| format!("Failed to flush output: {}", e))?;

    Ok(())
}
