//! I/O module
//!
//! Handles CSV parsing and report output for ledger replay.
//!
//! # Components
//!
//! - `csv_format` - CSV format handling (record conversion, report serialization)
//! - `sync_reader` - Synchronous CSV reader with iterator interface
//! - `async_reader` - Asynchronous CSV reader with batch reading interface

pub mod async_reader;
pub mod csv_format;
pub mod sync_reader;

pub use async_reader::AsyncReader;
pub use csv_format::{
    convert_operation_record, write_accounts_csv, write_transactions_csv, AccountRow, Operation,
    OperationRecord, TransactionRow,
};
pub use sync_reader::SyncReader;
