//! Account service
//!
//! Opens, closes and reads bank accounts. Creation runs the account validator
//! and the insert in one unit of work while holding the owner lock, so two
//! concurrent requests for the same user cannot both pass the cardinality
//! checks. Balances are never written here; only the transaction processor
//! moves funds.

use crate::core::account_validator::AccountValidator;
use crate::core::store::LedgerStore;
use crate::core::traits::{AccountNumberGenerator, AccountStore};
use crate::types::{
    Account, AccountId, AccountNumber, AccountType, LedgerError, NewAccount, Page, UserId,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info};

/// Service boundary for account lifecycle and reads
pub struct AccountService {
    store: Arc<LedgerStore>,
    validator: AccountValidator,
    generator: Arc<dyn AccountNumberGenerator>,
    number_attempts: usize,
    default_page_limit: usize,
}

impl AccountService {
    pub fn new(
        store: Arc<LedgerStore>,
        validator: AccountValidator,
        generator: Arc<dyn AccountNumberGenerator>,
        number_attempts: usize,
        default_page_limit: usize,
    ) -> Self {
        AccountService {
            store,
            validator,
            generator,
            number_attempts,
            default_page_limit,
        }
    }

    /// Open an account described by boundary strings
    ///
    /// # Arguments
    ///
    /// * `user_id` - Owner of the new account
    /// * `account_type` - `main`, `pocket` or `deposit` (legacy spellings accepted)
    /// * `initial_balance` - Opening balance, must not be negative
    ///
    /// # Errors
    ///
    /// `InvalidAccountType` for an unknown type, otherwise as
    /// [`AccountService::open_account`].
    pub fn create_bank_account(
        &self,
        user_id: UserId,
        account_type: &str,
        initial_balance: Decimal,
    ) -> Result<Account, LedgerError> {
        let account_type: AccountType = account_type.parse()?;
        self.open_account(&NewAccount {
            user_id,
            account_type,
            initial_balance,
        })
    }

    /// Validate and insert a new account with a freshly minted number
    ///
    /// A minted number that is already taken is replaced by a new one, up to
    /// the configured number of attempts.
    ///
    /// # Errors
    ///
    /// - `InvalidAmount` if the opening balance is negative
    /// - `UserNotFound` if the owner does not exist
    /// - `MainAccountExists`, `MainAccountRequired`, `AccountLimitReached`
    ///   from the validator
    /// - `DuplicateAccountNumber` if every attempt collided
    pub fn open_account(&self, request: &NewAccount) -> Result<Account, LedgerError> {
        if request.initial_balance < Decimal::ZERO {
            return Err(LedgerError::invalid_amount(
                request.initial_balance,
                "initial balance",
            ));
        }

        self.validator.validate_owner(request.user_id)?;

        let attempts = self.number_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            let mut unit = self.store.begin();
            unit.lock_owner(request.user_id)?;
            self.validator
                .validate_account_type(&unit, request.user_id, request.account_type)?;

            let account = Account::open(request, self.generator.generate()?);
            let result = match unit.create(account) {
                Ok(account) => unit.commit().map(|()| account),
                Err(err) => Err(err),
            };

            match result {
                Ok(account) => {
                    info!(
                        user = %account.user_id,
                        account_type = %account.account_type,
                        account_number = %account.account_number,
                        "account opened"
                    );
                    return Ok(account);
                }
                Err(err @ LedgerError::DuplicateAccountNumber { .. }) => {
                    debug!(attempt, error = %err, "account number taken, minting another");
                    last_error = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_error.unwrap_or_else(|| LedgerError::storage("no account number attempts made")))
    }

    /// Remove a secondary account
    ///
    /// # Errors
    ///
    /// * `AccountIdNotFound` - no account with that id
    /// * `MainAccountDeletion` - main accounts cannot be deleted
    pub fn delete_bank_account(&self, id: AccountId) -> Result<(), LedgerError> {
        let mut unit = self.store.begin();
        let account = unit.get_by_id(id)?;

        if account.account_type == AccountType::Main {
            return Err(LedgerError::MainAccountDeletion { id });
        }

        unit.delete(id)?;
        unit.commit()?;

        info!(account_number = %account.account_number, "account deleted");
        Ok(())
    }

    /// Activate or deactivate an account, leaving every other field as is
    pub fn set_account_status(&self, id: AccountId, active: bool) -> Result<Account, LedgerError> {
        let mut unit = self.store.begin();
        let account_number = unit.get_by_id(id)?.account_number;

        let mut account = unit.get_for_update(&account_number)?;
        account.active = active;
        unit.update(&account)?;
        unit.commit()?;

        info!(account_number = %account.account_number, active, "account status changed");
        Ok(account)
    }

    pub fn get_bank_account_by_id(&self, id: AccountId) -> Result<Account, LedgerError> {
        self.store.begin().get_by_id(id)
    }

    pub fn get_bank_account_by_number(
        &self,
        account_number: &AccountNumber,
    ) -> Result<Account, LedgerError> {
        self.store.begin().get_by_account_number(account_number)
    }

    /// Page through all accounts in storage order
    ///
    /// A zero `limit` uses the configured default page size.
    pub fn get_all_bank_accounts(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Account>, LedgerError> {
        let page = Page::with_default_limit(limit, offset, self.default_page_limit);
        self.store.begin().list_accounts(page)
    }

    pub fn get_bank_accounts_by_user(&self, user_id: UserId) -> Result<Vec<Account>, LedgerError> {
        self.store.begin().list_by_user(user_id)
    }
}
