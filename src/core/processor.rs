//! Transaction processor
//!
//! The processor is the single code path that mutates account balances and
//! appends to the transaction log. It is a state transition per call: it reads
//! the involved accounts under row locks, checks the business rules, writes the
//! new balances and appends one record. It never commits; the caller owns the
//! unit of work and discards it when the processor returns an error.

use crate::core::traits::{AccountStore, TransactionLog};
use crate::types::{
    Account, AccountNumber, LedgerError, NewTransaction, TransactionRecord, TransactionRequest,
    TransactionType,
};
use rust_decimal::Decimal;
use tracing::debug;

/// Stateless transaction processor
///
/// Holds no storage of its own; the store is passed to every call so that all
/// reads and writes land in the caller's unit of work.
#[derive(Debug, Clone, Copy, Default)]
pub struct TransactionProcessor;

impl TransactionProcessor {
    pub fn new() -> Self {
        TransactionProcessor
    }

    /// Apply one requested operation to `store`
    ///
    /// # Arguments
    ///
    /// * `store` - The unit of work to read from and write to
    /// * `request` - The operation to apply
    ///
    /// # Returns
    ///
    /// * `Ok(TransactionRecord)` - the appended record
    /// * `Err(LedgerError)` - the operation was rejected; the store may hold
    ///   partial writes and must be discarded
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the amount is not strictly positive
    /// - `AccountNotFound` if an involved account does not exist
    /// - `SameAccountTransfer` if a transfer names one account twice
    /// - `InsufficientBalance` if the source cannot cover the amount
    /// - `ArithmeticOverflow` if a credit leaves the decimal range
    /// - Any store error, unchanged
    pub fn process<S>(
        &self,
        store: &mut S,
        request: &TransactionRequest,
    ) -> Result<TransactionRecord, LedgerError>
    where
        S: AccountStore + TransactionLog + ?Sized,
    {
        let amount = request.amount();
        if amount <= Decimal::ZERO {
            return Err(LedgerError::invalid_amount(
                amount,
                request.tx_type().as_str(),
            ));
        }

        let record = match request {
            TransactionRequest::Transfer { from, to, amount } => {
                self.transfer(store, from, to, *amount)?
            }
            TransactionRequest::Deposit { to, amount } => self.deposit(store, to, *amount)?,
            TransactionRequest::Withdraw { from, amount } => self.withdraw(store, from, *amount)?,
        };

        debug!(
            id = %record.id,
            tx_type = %record.tx_type,
            amount = %record.amount,
            "transaction applied"
        );
        Ok(record)
    }

    /// Move `amount` from one account to another
    ///
    /// Both rows are locked in account number order so two opposite transfers
    /// cannot deadlock. The source must hold strictly more than `amount`.
    fn transfer<S>(
        &self,
        store: &mut S,
        from: &AccountNumber,
        to: &AccountNumber,
        amount: Decimal,
    ) -> Result<TransactionRecord, LedgerError>
    where
        S: AccountStore + TransactionLog + ?Sized,
    {
        let (source, destination) = if to < from {
            let destination = store.get_for_update(to);
            let source = store.get_for_update(from);
            (source, destination)
        } else {
            let source = store.get_for_update(from);
            let destination = store.get_for_update(to);
            (source, destination)
        };
        let mut source = source?;
        let mut destination = destination?;

        if from == to {
            return Err(LedgerError::SameAccountTransfer {
                account_number: from.clone(),
            });
        }

        // A transfer may not drain the source completely.
        if source.balance <= amount {
            return Err(LedgerError::insufficient_balance(
                from,
                source.balance,
                amount,
            ));
        }

        source.balance = debit(&source, amount, "transfer")?;
        destination.balance = credit(&destination, amount, "transfer")?;

        store.update(&source)?;
        store.update(&destination)?;

        store.append(NewTransaction {
            from_account_number: Some(from.clone()),
            to_account_number: Some(to.clone()),
            amount,
            tx_type: TransactionType::Transfer,
        })
    }

    /// Credit `amount` to an account, without upper bound
    fn deposit<S>(
        &self,
        store: &mut S,
        to: &AccountNumber,
        amount: Decimal,
    ) -> Result<TransactionRecord, LedgerError>
    where
        S: AccountStore + TransactionLog + ?Sized,
    {
        let mut destination = store.get_for_update(to)?;
        destination.balance = credit(&destination, amount, "deposit")?;
        store.update(&destination)?;

        store.append(NewTransaction {
            from_account_number: None,
            to_account_number: Some(to.clone()),
            amount,
            tx_type: TransactionType::Deposit,
        })
    }

    /// Debit `amount` from an account; the full balance may be withdrawn
    fn withdraw<S>(
        &self,
        store: &mut S,
        from: &AccountNumber,
        amount: Decimal,
    ) -> Result<TransactionRecord, LedgerError>
    where
        S: AccountStore + TransactionLog + ?Sized,
    {
        let mut source = store.get_for_update(from)?;
        if source.balance < amount {
            return Err(LedgerError::insufficient_balance(
                from,
                source.balance,
                amount,
            ));
        }

        source.balance = debit(&source, amount, "withdraw")?;
        store.update(&source)?;

        store.append(NewTransaction {
            from_account_number: Some(from.clone()),
            to_account_number: None,
            amount,
            tx_type: TransactionType::Withdraw,
        })
    }
}

fn credit(account: &Account, amount: Decimal, operation: &str) -> Result<Decimal, LedgerError> {
    account
        .balance
        .checked_add(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow(operation, &account.account_number))
}

fn debit(account: &Account, amount: Decimal, operation: &str) -> Result<Decimal, LedgerError> {
    account
        .balance
        .checked_sub(amount)
        .ok_or_else(|| LedgerError::arithmetic_overflow(operation, &account.account_number))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::store::{LedgerStore, UnitOfWork};
    use crate::types::{
        AccountId, AccountType, ErrorKind, NewAccount, Page, TransactionId, UserId,
    };
    use rstest::{fixture, rstest};
    use uuid::Uuid;

    fn dec(value: i64) -> Decimal {
        Decimal::new(value, 0)
    }

    fn number(value: &str) -> AccountNumber {
        AccountNumber::new(value)
    }

    /// Store holding accounts A (500000) and B (0)
    #[fixture]
    fn store() -> LedgerStore {
        let store = LedgerStore::default();
        let user = Uuid::new_v4();
        let mut unit = store.begin();
        for (account_number, balance) in [("A", 500_000), ("B", 0)] {
            let request = NewAccount {
                user_id: user,
                account_type: AccountType::Main,
                initial_balance: dec(balance),
            };
            unit.create(Account::open(&request, number(account_number)))
                .unwrap();
        }
        unit.commit().unwrap();
        store
    }

    fn run(store: &LedgerStore, request: TransactionRequest) -> Result<TransactionRecord, LedgerError> {
        let mut unit = store.begin();
        let record = TransactionProcessor::new().process(&mut unit, &request)?;
        unit.commit()?;
        Ok(record)
    }

    fn balance(store: &LedgerStore, account_number: &str) -> Decimal {
        store
            .begin()
            .get_by_account_number(&number(account_number))
            .unwrap()
            .balance
    }

    #[rstest]
    fn test_transfer_moves_funds(store: LedgerStore) {
        let record = run(
            &store,
            TransactionRequest::Transfer {
                from: number("A"),
                to: number("B"),
                amount: dec(100_000),
            },
        )
        .unwrap();

        assert_eq!(balance(&store, "A"), dec(400_000));
        assert_eq!(balance(&store, "B"), dec(100_000));
        assert_eq!(record.tx_type, TransactionType::Transfer);
        assert_eq!(record.from_account_number, Some(number("A")));
        assert_eq!(record.to_account_number, Some(number("B")));
        assert_eq!(store.transaction_count().unwrap(), 1);
    }

    #[rstest]
    fn test_transfer_of_full_balance_is_rejected(store: LedgerStore) {
        let err = run(
            &store,
            TransactionRequest::Transfer {
                from: number("A"),
                to: number("B"),
                amount: dec(500_000),
            },
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::FailedPrecondition);
        assert_eq!(balance(&store, "A"), dec(500_000));
        assert_eq!(store.transaction_count().unwrap(), 0);
    }

    #[rstest]
    fn test_withdraw_of_full_balance_succeeds(store: LedgerStore) {
        let record = run(
            &store,
            TransactionRequest::Withdraw {
                from: number("A"),
                amount: dec(500_000),
            },
        )
        .unwrap();

        assert_eq!(balance(&store, "A"), Decimal::ZERO);
        assert_eq!(record.to_account_number, None);
    }

    #[rstest]
    fn test_withdraw_beyond_balance_is_rejected(store: LedgerStore) {
        let err = run(
            &store,
            TransactionRequest::Withdraw {
                from: number("A"),
                amount: dec(500_001),
            },
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(balance(&store, "A"), dec(500_000));
    }

    #[rstest]
    fn test_deposit_credits_destination(store: LedgerStore) {
        let record = run(
            &store,
            TransactionRequest::Deposit {
                to: number("B"),
                amount: dec(50_000),
            },
        )
        .unwrap();

        assert_eq!(balance(&store, "B"), dec(50_000));
        assert_eq!(record.from_account_number, None);
        assert_eq!(record.tx_type, TransactionType::Deposit);
    }

    #[rstest]
    fn test_same_account_transfer_is_invalid(store: LedgerStore) {
        let err = run(
            &store,
            TransactionRequest::Transfer {
                from: number("A"),
                to: number("A"),
                amount: dec(1),
            },
        )
        .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        assert_eq!(balance(&store, "A"), dec(500_000));
    }

    #[rstest]
    #[case::missing_source("X", "B")]
    #[case::missing_destination("A", "X")]
    fn test_transfer_with_unknown_account_is_not_found(
        store: LedgerStore,
        #[case] from: &str,
        #[case] to: &str,
    ) {
        let err = run(
            &store,
            TransactionRequest::Transfer {
                from: number(from),
                to: number(to),
                amount: dec(1),
            },
        )
        .unwrap_err();

        assert_eq!(err, LedgerError::account_not_found(&number("X")));
    }

    #[rstest]
    fn test_missing_source_reported_before_destination(store: LedgerStore) {
        // "Z" sorts after "Y", so the destination is locked first
        let err = run(
            &store,
            TransactionRequest::Transfer {
                from: number("Z"),
                to: number("Y"),
                amount: dec(1),
            },
        )
        .unwrap_err();

        assert_eq!(err, LedgerError::account_not_found(&number("Z")));
    }

    #[rstest]
    #[case::zero(dec(0))]
    #[case::negative(dec(-5))]
    fn test_non_positive_amount_is_rejected(store: LedgerStore, #[case] amount: Decimal) {
        let err = run(
            &store,
            TransactionRequest::Deposit {
                to: number("B"),
                amount,
            },
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::InvalidAmount { .. }));
        assert_eq!(balance(&store, "B"), Decimal::ZERO);
    }

    #[rstest]
    fn test_deposit_overflow_is_rejected(store: LedgerStore) {
        run(
            &store,
            TransactionRequest::Deposit {
                to: number("B"),
                amount: Decimal::MAX,
            },
        )
        .unwrap();

        let err = run(
            &store,
            TransactionRequest::Deposit {
                to: number("B"),
                amount: dec(1),
            },
        )
        .unwrap_err();

        assert!(matches!(err, LedgerError::ArithmeticOverflow { .. }));
        assert_eq!(balance(&store, "B"), Decimal::MAX);
    }

    /// Unit of work that fails every update of one account
    struct FailingUpdates<'a> {
        inner: UnitOfWork<'a>,
        fail_on: AccountNumber,
    }

    impl AccountStore for FailingUpdates<'_> {
        fn get_by_account_number(&self, n: &AccountNumber) -> Result<Account, LedgerError> {
            self.inner.get_by_account_number(n)
        }
        fn get_by_id(&self, id: AccountId) -> Result<Account, LedgerError> {
            self.inner.get_by_id(id)
        }
        fn get_for_update(&mut self, n: &AccountNumber) -> Result<Account, LedgerError> {
            self.inner.get_for_update(n)
        }
        fn lock_owner(&mut self, user_id: UserId) -> Result<(), LedgerError> {
            self.inner.lock_owner(user_id)
        }
        fn update(&mut self, account: &Account) -> Result<Account, LedgerError> {
            if account.account_number == self.fail_on {
                return Err(LedgerError::storage("injected write failure"));
            }
            self.inner.update(account)
        }
        fn create(&mut self, account: Account) -> Result<Account, LedgerError> {
            self.inner.create(account)
        }
        fn delete(&mut self, id: AccountId) -> Result<(), LedgerError> {
            self.inner.delete(id)
        }
        fn count_by_user_and_type(&self, u: UserId, t: AccountType) -> Result<u64, LedgerError> {
            self.inner.count_by_user_and_type(u, t)
        }
        fn list_accounts(&self, page: Page) -> Result<Vec<Account>, LedgerError> {
            self.inner.list_accounts(page)
        }
        fn list_by_user(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError> {
            self.inner.list_by_user(user_id)
        }
    }

    impl TransactionLog for FailingUpdates<'_> {
        fn append(&mut self, entry: NewTransaction) -> Result<TransactionRecord, LedgerError> {
            self.inner.append(entry)
        }
        fn get_transaction(&self, id: TransactionId) -> Result<TransactionRecord, LedgerError> {
            self.inner.get_transaction(id)
        }
        fn transactions_for_account(
            &self,
            n: &AccountNumber,
        ) -> Result<Vec<TransactionRecord>, LedgerError> {
            self.inner.transactions_for_account(n)
        }
        fn list_transactions(&self, page: Page) -> Result<Vec<TransactionRecord>, LedgerError> {
            self.inner.list_transactions(page)
        }
    }

    #[rstest]
    fn test_failed_credit_leaves_no_partial_transfer(store: LedgerStore) {
        let mut unit = FailingUpdates {
            inner: store.begin(),
            fail_on: number("B"),
        };

        let err = TransactionProcessor::new()
            .process(
                &mut unit,
                &TransactionRequest::Transfer {
                    from: number("A"),
                    to: number("B"),
                    amount: dec(100_000),
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);

        // The source debit was staged before the failure
        assert_eq!(
            unit.get_by_account_number(&number("A")).unwrap().balance,
            dec(400_000)
        );
        drop(unit);

        assert_eq!(balance(&store, "A"), dec(500_000));
        assert_eq!(balance(&store, "B"), Decimal::ZERO);
        assert_eq!(store.transaction_count().unwrap(), 0);
        assert_eq!(store.held_locks(), 0);
    }
}
