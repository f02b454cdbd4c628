//! Transaction service
//!
//! Wraps the [`TransactionProcessor`] in a unit of work per request and exposes
//! the read side of the transaction log. Errors from the processor and the
//! store are returned unchanged.

use crate::core::processor::TransactionProcessor;
use crate::core::store::LedgerStore;
use crate::core::traits::TransactionLog;
use crate::types::{
    AccountNumber, LedgerError, Page, TransactionId, TransactionRecord, TransactionRequest,
};
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{info, warn};

/// Service boundary for fund movements
pub struct TransactionService {
    store: Arc<LedgerStore>,
    processor: TransactionProcessor,
    default_page_limit: usize,
}

impl TransactionService {
    pub fn new(store: Arc<LedgerStore>, default_page_limit: usize) -> Self {
        TransactionService {
            store,
            processor: TransactionProcessor::new(),
            default_page_limit,
        }
    }

    /// Process a transaction described by boundary strings
    ///
    /// # Arguments
    ///
    /// * `from` - Source account number, empty for deposits
    /// * `to` - Destination account number, empty for withdrawals
    /// * `tx_type` - One of `transfer`, `deposit`, `withdraw`
    /// * `amount` - Strictly positive amount
    ///
    /// # Errors
    ///
    /// `InvalidTransactionType` or `MissingAccountNumber` for malformed input,
    /// otherwise whatever [`TransactionService::execute`] returns.
    pub fn process_transaction(
        &self,
        from: &str,
        to: &str,
        tx_type: &str,
        amount: Decimal,
    ) -> Result<TransactionRecord, LedgerError> {
        let request = TransactionRequest::from_parts(from, to, tx_type, amount)?;
        self.execute(&request)
    }

    /// Apply `request` in its own unit of work
    ///
    /// Commits on success. On any failure the unit is rolled back and the
    /// error is returned as is; no balance or record changes are visible.
    pub fn execute(&self, request: &TransactionRequest) -> Result<TransactionRecord, LedgerError> {
        let mut unit = self.store.begin();

        let record = match self.processor.process(&mut unit, request) {
            Ok(record) => record,
            Err(err) => {
                warn!(tx_type = %request.tx_type(), error = %err, "transaction rejected");
                unit.rollback();
                return Err(err);
            }
        };

        if let Err(err) = unit.commit() {
            warn!(tx_type = %request.tx_type(), error = %err, "transaction commit failed");
            return Err(err);
        }

        info!(
            id = %record.id,
            tx_type = %record.tx_type,
            amount = %record.amount,
            "transaction committed"
        );
        Ok(record)
    }

    /// Page through the log in insertion order
    ///
    /// A zero `limit` uses the configured default page size.
    pub fn get_all_transactions(
        &self,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        let page = Page::with_default_limit(limit, offset, self.default_page_limit);
        self.store.begin().list_transactions(page)
    }

    /// Get one record
    ///
    /// # Errors
    ///
    /// * `TransactionNotFound` - no record with that id
    pub fn get_transaction_by_id(&self, id: TransactionId) -> Result<TransactionRecord, LedgerError> {
        self.store.begin().get_transaction(id)
    }

    /// All records where the account is source or destination
    ///
    /// An account without movements yields an empty list, not an error.
    pub fn get_transaction_by_account_id(
        &self,
        account_number: &AccountNumber,
    ) -> Result<Vec<TransactionRecord>, LedgerError> {
        self.store.begin().transactions_for_account(account_number)
    }
}
