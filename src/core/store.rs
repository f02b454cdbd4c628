//! Transactional storage for accounts and the transaction log
//!
//! This module provides the `LedgerStore`, which owns the committed account and
//! transaction tables, and the `UnitOfWork`, which is the only way to read or
//! change them.
//!
//! # Design
//!
//! A unit of work stages every write privately and publishes all of them in one
//! step on [`UnitOfWork::commit`]. Dropping a unit without committing discards
//! its writes, so a failure at any point of a multi-row operation leaves the
//! committed tables untouched.
//!
//! # Isolation
//!
//! - Reads see committed data plus the unit's own staged writes.
//! - Every write takes the row lock of the account it touches (see
//!   [`super::lock_table`]), and `get_for_update` takes it before reading, so a
//!   check-then-write on a balance cannot lose an update.
//! - Commit applies all staged rows under the table write lock, so readers see
//!   either none or all of a unit's writes.
//! - Row locks are released when the unit ends, after its writes are visible.

use super::lock_table::{LockKey, LockTable, UnitId};
use super::traits::{AccountStore, TransactionLog};
use crate::types::{
    Account, AccountId, AccountNumber, AccountType, LedgerError, NewTransaction, Page,
    TransactionId, TransactionRecord, UserId,
};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;

/// Committed rows
#[derive(Debug, Default)]
struct Tables {
    /// Accounts keyed by insertion sequence, which is the storage order
    accounts: BTreeMap<u64, Account>,
    by_number: HashMap<AccountNumber, u64>,
    by_id: HashMap<AccountId, u64>,
    next_seq: u64,

    /// Numbers of deleted accounts, never issued again
    retired: HashSet<AccountNumber>,

    /// Transaction log in append order
    transactions: Vec<TransactionRecord>,
    transaction_index: HashMap<TransactionId, usize>,
}

impl Tables {
    fn account(&self, account_number: &AccountNumber) -> Option<&Account> {
        self.by_number
            .get(account_number)
            .and_then(|seq| self.accounts.get(seq))
    }

    fn account_by_id(&self, id: AccountId) -> Option<&Account> {
        self.by_id.get(&id).and_then(|seq| self.accounts.get(seq))
    }

    fn number_taken(&self, account_number: &AccountNumber) -> bool {
        self.by_number.contains_key(account_number) || self.retired.contains(account_number)
    }

    fn insert_account(&mut self, account: Account) {
        let seq = self.next_seq;
        self.next_seq += 1;
        self.by_number.insert(account.account_number.clone(), seq);
        self.by_id.insert(account.id, seq);
        self.accounts.insert(seq, account);
    }

    fn replace_account(&mut self, account: Account) {
        match self.by_number.get(&account.account_number) {
            Some(seq) => {
                self.accounts.insert(*seq, account);
            }
            None => self.insert_account(account),
        }
    }

    fn remove_account(&mut self, account_number: &AccountNumber) {
        if let Some(seq) = self.by_number.remove(account_number) {
            if let Some(account) = self.accounts.remove(&seq) {
                self.by_id.remove(&account.id);
            }
            self.retired.insert(account_number.clone());
        }
    }

    fn push_transaction(&mut self, record: TransactionRecord) {
        self.transaction_index
            .insert(record.id, self.transactions.len());
        self.transactions.push(record);
    }
}

/// Pending change to one account row
#[derive(Debug, Clone)]
enum Staged {
    Upsert(Account),
    Deleted,
}

/// Shared store of accounts and transaction records
///
/// `LedgerStore` is `Send + Sync` and meant to be shared behind an `Arc`.
/// Every service request opens its own [`UnitOfWork`]. Outside the crate the
/// store is read-only: only its counters are public.
#[derive(Debug)]
pub struct LedgerStore {
    tables: RwLock<Tables>,
    locks: LockTable,
    next_unit: AtomicU64,
    lock_timeout: Duration,
}

impl LedgerStore {
    /// Create an empty store whose units wait at most `lock_timeout` for a row
    pub fn new(lock_timeout: Duration) -> Self {
        Self {
            tables: RwLock::new(Tables::default()),
            locks: LockTable::new(),
            next_unit: AtomicU64::new(1),
            lock_timeout,
        }
    }

    /// Open a new unit of work
    ///
    /// Only the services of this crate open units, so every balance change goes
    /// through [`super::processor::TransactionProcessor`].
    pub(crate) fn begin(&self) -> UnitOfWork<'_> {
        let id = self.next_unit.fetch_add(1, Ordering::Relaxed);
        UnitOfWork {
            store: self,
            id,
            locks: Vec::new(),
            staged: HashMap::new(),
            created: Vec::new(),
            appended: Vec::new(),
            finished: false,
        }
    }

    /// Number of committed accounts
    pub fn account_count(&self) -> Result<usize, LedgerError> {
        Ok(self.tables.read()?.accounts.len())
    }

    /// Number of committed transaction records
    pub fn transaction_count(&self) -> Result<usize, LedgerError> {
        Ok(self.tables.read()?.transactions.len())
    }

    /// Number of row locks currently held by open units
    pub fn held_locks(&self) -> usize {
        self.locks.held_count()
    }
}

impl Default for LedgerStore {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

/// Atomic unit of work against a [`LedgerStore`]
///
/// Implements [`AccountStore`] and [`TransactionLog`]. Writes stay private to
/// the unit until [`UnitOfWork::commit`]; dropping the unit (or calling
/// [`UnitOfWork::rollback`]) discards them. Row locks taken by the unit are
/// released in both cases.
#[derive(Debug)]
pub struct UnitOfWork<'a> {
    store: &'a LedgerStore,
    id: UnitId,

    /// Rows locked by this unit, released on drop
    locks: Vec<LockKey>,

    staged: HashMap<AccountNumber, Staged>,

    /// Numbers of accounts created by this unit, in creation order
    created: Vec<AccountNumber>,

    /// Records appended by this unit, in append order
    appended: Vec<TransactionRecord>,

    finished: bool,
}

impl<'a> UnitOfWork<'a> {
    pub fn id(&self) -> UnitId {
        self.id
    }

    /// Whether the unit has staged anything
    pub fn has_writes(&self) -> bool {
        !self.staged.is_empty() || !self.appended.is_empty()
    }

    /// Publish every staged write atomically
    ///
    /// # Errors
    ///
    /// * `DuplicateAccountNumber` - a created number was committed or retired
    ///   meanwhile
    /// * `Storage` - the table lock was poisoned
    ///
    /// On error nothing is published.
    pub fn commit(mut self) -> Result<(), LedgerError> {
        let mut tables = self.store.tables.write()?;

        if let Some(number) = self
            .created
            .iter()
            .find(|number| tables.number_taken(number))
        {
            return Err(LedgerError::DuplicateAccountNumber {
                account_number: number.clone(),
            });
        }

        let mut staged = std::mem::take(&mut self.staged);
        let new_rows: Vec<Account> = self
            .created
            .iter()
            .filter_map(|number| match staged.remove(number) {
                Some(Staged::Upsert(account)) => Some(account),
                _ => None,
            })
            .collect();

        for (number, change) in staged {
            match change {
                Staged::Upsert(account) => tables.replace_account(account),
                Staged::Deleted => tables.remove_account(&number),
            }
        }
        for account in new_rows {
            tables.insert_account(account);
        }

        let appended = std::mem::take(&mut self.appended);
        let records = appended.len();
        for record in appended {
            tables.push_transaction(record);
        }
        drop(tables);

        self.finished = true;
        debug!(unit = self.id, records, "unit of work committed");
        Ok(())
    }

    /// Discard every staged write
    pub fn rollback(self) {
        drop(self);
    }

    fn lock(&mut self, key: LockKey) -> Result<(), LedgerError> {
        if self
            .store
            .locks
            .acquire(&key, self.id, self.store.lock_timeout)?
        {
            self.locks.push(key);
        }
        Ok(())
    }

    fn check_balance(account: &Account) -> Result<(), LedgerError> {
        if account.balance < Decimal::ZERO {
            return Err(LedgerError::storage(format!(
                "refusing negative balance {} for account {}",
                account.balance, account.account_number
            )));
        }
        Ok(())
    }

    fn visible_account(&self, tables: &Tables, account_number: &AccountNumber) -> Option<Account> {
        match self.staged.get(account_number) {
            Some(Staged::Upsert(account)) => Some(account.clone()),
            Some(Staged::Deleted) => None,
            None => tables.account(account_number).cloned(),
        }
    }

    /// Every account visible to this unit, in storage order
    fn visible_accounts(&self, tables: &Tables) -> Vec<Account> {
        let mut accounts = Vec::with_capacity(tables.accounts.len() + self.created.len());

        for account in tables.accounts.values() {
            match self.staged.get(&account.account_number) {
                Some(Staged::Upsert(staged)) => accounts.push(staged.clone()),
                Some(Staged::Deleted) => {}
                None => accounts.push(account.clone()),
            }
        }
        for number in &self.created {
            if let Some(Staged::Upsert(account)) = self.staged.get(number) {
                accounts.push(account.clone());
            }
        }

        accounts
    }
}

impl Drop for UnitOfWork<'_> {
    fn drop(&mut self) {
        if !self.finished && self.has_writes() {
            debug!(unit = self.id, "unit of work rolled back");
        }
        self.store.locks.release_all(self.id, &self.locks);
    }
}

impl AccountStore for UnitOfWork<'_> {
    fn get_by_account_number(
        &self,
        account_number: &AccountNumber,
    ) -> Result<Account, LedgerError> {
        let tables = self.store.tables.read()?;
        self.visible_account(&tables, account_number)
            .ok_or_else(|| LedgerError::account_not_found(account_number))
    }

    fn get_by_id(&self, id: AccountId) -> Result<Account, LedgerError> {
        let staged = self.staged.values().find_map(|change| match change {
            Staged::Upsert(account) if account.id == id => Some(account.clone()),
            _ => None,
        });
        if let Some(account) = staged {
            return Ok(account);
        }

        let tables = self.store.tables.read()?;
        tables
            .account_by_id(id)
            .filter(|account| !self.staged.contains_key(&account.account_number))
            .cloned()
            .ok_or(LedgerError::AccountIdNotFound { id })
    }

    fn get_for_update(&mut self, account_number: &AccountNumber) -> Result<Account, LedgerError> {
        self.lock(LockKey::Account(account_number.clone()))?;
        self.get_by_account_number(account_number)
    }

    fn lock_owner(&mut self, user_id: UserId) -> Result<(), LedgerError> {
        self.lock(LockKey::Owner(user_id))
    }

    fn update(&mut self, account: &Account) -> Result<Account, LedgerError> {
        Self::check_balance(account)?;
        self.lock(LockKey::Account(account.account_number.clone()))?;

        let current = self.get_by_account_number(&account.account_number)?;
        if current.id != account.id {
            return Err(LedgerError::AccountIdNotFound { id: account.id });
        }

        self.staged.insert(
            account.account_number.clone(),
            Staged::Upsert(account.clone()),
        );
        Ok(account.clone())
    }

    fn create(&mut self, account: Account) -> Result<Account, LedgerError> {
        Self::check_balance(&account)?;
        self.lock(LockKey::Account(account.account_number.clone()))?;

        let taken = self.staged.contains_key(&account.account_number)
            || self
                .store
                .tables
                .read()?
                .number_taken(&account.account_number);
        if taken {
            return Err(LedgerError::DuplicateAccountNumber {
                account_number: account.account_number,
            });
        }

        self.created.push(account.account_number.clone());
        self.staged.insert(
            account.account_number.clone(),
            Staged::Upsert(account.clone()),
        );
        Ok(account)
    }

    fn delete(&mut self, id: AccountId) -> Result<(), LedgerError> {
        let account = self.get_by_id(id)?;
        self.lock(LockKey::Account(account.account_number.clone()))?;

        // Re-read under the lock: another unit may have removed it meanwhile.
        self.get_by_account_number(&account.account_number)?;

        self.staged.insert(account.account_number, Staged::Deleted);
        Ok(())
    }

    fn count_by_user_and_type(
        &self,
        user_id: UserId,
        account_type: AccountType,
    ) -> Result<u64, LedgerError> {
        let matches =
            |account: &Account| account.user_id == user_id && account.account_type == account_type;

        let tables = self.store.tables.read()?;
        let committed = tables
            .accounts
            .values()
            .filter(|account| !self.staged.contains_key(&account.account_number))
            .filter(|account| matches(account))
            .count();
        let staged = self
            .staged
            .values()
            .filter(|change| matches!(change, Staged::Upsert(account) if matches(account)))
            .count();

        Ok((committed + staged) as u64)
    }

    fn list_accounts(&self, page: Page) -> Result<Vec<Account>, LedgerError> {
        let tables = self.store.tables.read()?;
        Ok(page
            .apply(self.visible_accounts(&tables).into_iter())
            .collect())
    }

    fn list_by_user(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError> {
        let tables = self.store.tables.read()?;
        Ok(self
            .visible_accounts(&tables)
            .into_iter()
            .filter(|account| account.user_id == user_id)
            .collect())
    }
}

impl TransactionLog for UnitOfWork<'_> {
    fn append(&mut self, entry: NewTransaction) -> Result<TransactionRecord, LedgerError> {
        let record = TransactionRecord::from_entry(entry);
        self.appended.push(record.clone());
        Ok(record)
    }

    fn get_transaction(&self, id: TransactionId) -> Result<TransactionRecord, LedgerError> {
        if let Some(record) = self.appended.iter().find(|record| record.id == id) {
            return Ok(record.clone());
        }

        let tables = self.store.tables.read()?;
        tables
            .transaction_index
            .get(&id)
            .and_then(|index| tables.transactions.get(*index))
            .cloned()
            .ok_or(LedgerError::TransactionNotFound { id })
    }

    fn transactions_for_account(
        &self,
        account_number: &AccountNumber,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let tables = self.store.tables.read()?;
        Ok(tables
            .transactions
            .iter()
            .chain(self.appended.iter())
            .filter(|record| record.involves(account_number))
            .cloned()
            .collect())
    }

    fn list_transactions(&self, page: Page) -> Result<Vec<TransactionRecord>, LedgerError> {
        let tables = self.store.tables.read()?;
        Ok(page
            .apply(tables.transactions.iter().chain(self.appended.iter()))
            .cloned()
            .collect())
    }
}
