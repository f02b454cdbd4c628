//! Replay session
//!
//! A `ReplaySession` owns one [`Ledger`] and applies replay [`Operation`]s to it.
//! Input files refer to users and accounts by alias; the session maps each
//! alias to the user id or account number the ledger generated for it, and maps
//! them back when writing reports.
//!
//! The session is shared by every replay worker, so all of its state lives in
//! concurrent maps and atomics.

use crate::config::LedgerConfig;
use crate::core::{InMemoryUserDirectory, Ledger, UserDirectory};
use crate::io::csv_format::{
    write_accounts_csv, write_transactions_csv, AccountRow, Operation, TransactionRow,
};
use crate::types::{AccountNumber, LedgerError, NewAccount, UserId};
use dashmap::DashMap;
use std::collections::HashMap;
use std::fmt;
use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::warn;

/// Page size used when draining the transaction log for reports
const REPORT_PAGE: usize = 500;

/// Why a replay operation was not applied
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ReplayError {
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    #[error("Unknown user alias '{0}'")]
    UnknownUser(String),

    #[error("Alias '{0}' is already in use")]
    DuplicateAlias(String),
}

/// Counts of applied and rejected operations
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReplaySummary {
    pub applied: usize,
    pub rejected: usize,
}

/// Ledger plus alias bookkeeping for one replay run
pub struct ReplaySession {
    ledger: Ledger,
    users: Arc<InMemoryUserDirectory>,
    user_aliases: DashMap<String, UserId>,
    account_aliases: DashMap<String, AccountNumber>,
    applied: AtomicUsize,
    rejected: AtomicUsize,
}

impl fmt::Debug for ReplaySession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReplaySession")
            .field("users", &self.user_aliases.len())
            .field("accounts", &self.account_aliases.len())
            .field("summary", &self.summary())
            .finish_non_exhaustive()
    }
}

impl ReplaySession {
    /// Start a session on an empty ledger
    pub fn new(config: LedgerConfig) -> Self {
        let users = Arc::new(InMemoryUserDirectory::new());
        let ledger = Ledger::with_random_numbers(config, Arc::clone(&users) as Arc<dyn UserDirectory>);

        ReplaySession {
            ledger,
            users,
            user_aliases: DashMap::new(),
            account_aliases: DashMap::new(),
            applied: AtomicUsize::new(0),
            rejected: AtomicUsize::new(0),
        }
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Account number behind an alias, if the alias was opened
    pub fn account_number(&self, alias: &str) -> Option<AccountNumber> {
        self.account_aliases
            .get(alias)
            .map(|entry| entry.value().clone())
    }

    fn resolve(&self, alias: &str) -> AccountNumber {
        self.account_number(alias)
            .unwrap_or_else(|| AccountNumber::new(alias))
    }

    /// Apply one operation to the ledger
    ///
    /// An account alias that was never opened is passed to the ledger as a
    /// literal account number, so it surfaces as `AccountNotFound`.
    pub fn apply(&self, operation: &Operation) -> Result<(), ReplayError> {
        match operation {
            Operation::RegisterUser { user } => {
                if self.user_aliases.contains_key(user) {
                    return Err(ReplayError::DuplicateAlias(user.clone()));
                }
                let registered = self.users.register(user.clone());
                self.user_aliases.insert(user.clone(), registered.id);
            }
            Operation::OpenAccount {
                user,
                account,
                account_type,
                initial_balance,
            } => {
                if self.account_aliases.contains_key(account) {
                    return Err(ReplayError::DuplicateAlias(account.clone()));
                }
                let user_id = self
                    .user_aliases
                    .get(user)
                    .map(|entry| *entry.value())
                    .ok_or_else(|| ReplayError::UnknownUser(user.clone()))?;

                let opened = self.ledger.accounts().open_account(&NewAccount {
                    user_id,
                    account_type: *account_type,
                    initial_balance: *initial_balance,
                })?;
                self.account_aliases
                    .insert(account.clone(), opened.account_number);
            }
            Operation::CloseAccount { account } => {
                let number = self.resolve(account);
                let existing = self.ledger.accounts().get_bank_account_by_number(&number)?;
                self.ledger.accounts().delete_bank_account(existing.id)?;
            }
            Operation::Transaction {
                tx_type,
                from,
                to,
                amount,
            } => {
                let from = self.resolve(from);
                let to = self.resolve(to);
                self.ledger.transactions().process_transaction(
                    from.as_str(),
                    to.as_str(),
                    tx_type.as_str(),
                    *amount,
                )?;
            }
        }

        Ok(())
    }

    /// Apply one operation and count the outcome
    ///
    /// Rejections are logged and counted; they never stop a replay.
    pub fn record(&self, operation: &Operation) -> Result<(), ReplayError> {
        let result = self.apply(operation);
        match &result {
            Ok(()) => {
                self.applied.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                warn!(operation = ?operation, error = %e, "operation rejected");
            }
        }
        result
    }

    pub fn summary(&self) -> ReplaySummary {
        ReplaySummary {
            applied: self.applied.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
        }
    }

    /// Final state of every account still open, sorted by alias
    pub fn account_rows(&self) -> Result<Vec<AccountRow>, LedgerError> {
        let mut rows = Vec::with_capacity(self.account_aliases.len());

        for entry in self.account_aliases.iter() {
            let account = match self.ledger.accounts().get_bank_account_by_number(entry.value()) {
                Ok(account) => account,
                Err(LedgerError::AccountNotFound { .. }) => continue,
                Err(e) => return Err(e),
            };
            let user = self.users.get_user_by_id(account.user_id)?.username;

            rows.push(AccountRow {
                account: entry.key().clone(),
                user,
                account_type: account.account_type,
                balance: account.balance,
                active: account.active,
            });
        }

        rows.sort_by(|a, b| a.account.cmp(&b.account));
        Ok(rows)
    }

    /// The whole transaction log in log order, accounts shown by alias
    pub fn transaction_rows(&self) -> Result<Vec<TransactionRow>, LedgerError> {
        let aliases: HashMap<AccountNumber, String> = self
            .account_aliases
            .iter()
            .map(|entry| (entry.value().clone(), entry.key().clone()))
            .collect();
        let alias_of = |number: &Option<AccountNumber>| match number {
            Some(number) => aliases
                .get(number)
                .cloned()
                .unwrap_or_else(|| number.to_string()),
            None => String::new(),
        };

        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .ledger
                .transactions()
                .get_all_transactions(REPORT_PAGE, offset)?;
            let fetched = page.len();

            rows.extend(page.into_iter().map(|record| TransactionRow {
                from: alias_of(&record.from_account_number),
                to: alias_of(&record.to_account_number),
                amount: record.amount,
                tx_type: record.tx_type,
                status: record.status,
            }));

            if fetched < REPORT_PAGE {
                break;
            }
            offset += fetched;
        }

        Ok(rows)
    }

    /// Write the accounts report and, if requested, the transaction report
    pub fn write_reports(
        &self,
        accounts: &mut dyn Write,
        transactions: Option<&mut dyn Write>,
    ) -> Result<(), String> {
        let rows = self.account_rows().map_err(|e| e.to_string())?;
        write_accounts_csv(&rows, accounts)?;

        if let Some(output) = transactions {
            let rows = self.transaction_rows().map_err(|e| e.to_string())?;
            write_transactions_csv(&rows, output)?;
        }

        Ok(())
    }
}
