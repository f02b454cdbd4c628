//! Synchronous CSV reader with iterator interface
//!
//! Provides a streaming iterator over replay operations from a CSV file.
//! Delegates CSV format concerns to the csv_format module.
//!
//! # Iterator Interface
//!
//! SyncReader implements the Iterator trait, yielding `Result<Operation, String>`
//! for each CSV row:
//!
//! ```no_run
//! use bank_ledger_core::io::sync_reader::SyncReader;
//! use std::path::Path;
//!
//! let reader = SyncReader::new(Path::new("operations.csv")).unwrap();
//! for result in reader {
//!     match result {
//!         Ok(operation) => println!("Replaying: {:?}", operation),
//!         Err(e) => eprintln!("Error: {}", e),
//!     }
//! }
//! ```
//!
//! # Error Handling
//!
//! - Fatal errors (file not found, I/O errors) are returned from `new()`
//! - Individual record parsing errors are yielded as Err variants in the iterator
//! - Line numbers are included in error messages for debugging

use crate::io::csv_format::{convert_operation_record, Operation, OperationRecord};
use csv::{ReaderBuilder, Trim};
use std::fs::File;
use std::path::Path;

/// Synchronous CSV reader
///
/// Reads one record at a time, so memory use does not grow with the file.
#[derive(Debug)]
pub struct SyncReader {
    reader: csv::Reader<File>,
    line_num: usize,
}

impl SyncReader {
    /// Create a new SyncReader from a file path
    ///
    /// The CSV reader is configured to:
    /// - Trim whitespace from all fields
    /// - Allow flexible field counts (trailing empty columns may be omitted)
    /// - Use an 8KB buffer for efficient I/O
    ///
    /// # Errors
    ///
    /// Returns an error message if the file could not be opened.
    pub fn new(path: &Path) -> Result<Self, String> {
        let file = File::open(path)
            .map_err(|e| format!("Failed to open file '{}': {}", path.display(), e))?;

        let reader = ReaderBuilder::new()
            .trim(Trim::All)
            .flexible(true)
            .buffer_capacity(8 * 1024)
            .from_reader(file);

        Ok(Self {
            reader,
            line_num: 0,
        })
    }
}

impl Iterator for SyncReader {
    type Item = Result<Operation, String>;

    /// Get the next operation from the CSV file
    ///
    /// # Returns
    ///
    /// * `Some(Ok(Operation))` - Successfully parsed record
    /// * `Some(Err(String))` - Parse or conversion error with line number
    /// * `None` - End of file reached
    fn next(&mut self) -> Option<Self::Item> {
        let mut deserializer = self.reader.deserialize::<OperationRecord>();

        let parsed = deserializer.next()?;
        self.line_num += 1;
        // Line numbers count the header row
        let line = self.line_num + 1;

        Some(match parsed {
            Ok(record) => convert_operation_record(record).map_err(|e| format!("Line {}: {}", line, e)),
            Err(e) => Err(format!("Line {}: CSV parse error: {}", line, e)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{AccountType, TransactionType};
    use rust_decimal::Decimal;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "type,user,account,to,account_type,amount\n";

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(rows: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(HEADER.as_bytes())
            .and_then(|_| file.write_all(rows.as_bytes()))
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    #[test]
    fn test_sync_reader_fails_on_missing_file() {
        let result = SyncReader::new(Path::new("nonexistent.csv"));
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_sync_reader_iterates_all_operation_kinds() {
        let file = create_temp_csv(
            "user,alice,,,,\n\
             open,alice,a1,,main,500000\n\
             deposit,,,a1,,10\n\
             withdraw,,a1,,,5\n\
             transfer,,a1,a2,,1\n\
             close,,a2,,,\n",
        );

        let operations: Vec<_> = SyncReader::new(file.path())
            .unwrap()
            .filter_map(Result::ok)
            .collect();

        assert_eq!(operations.len(), 6);
        assert!(matches!(operations[0], Operation::RegisterUser { .. }));
        assert_eq!(
            operations[1],
            Operation::OpenAccount {
                user: "alice".to_string(),
                account: "a1".to_string(),
                account_type: AccountType::Main,
                initial_balance: Decimal::new(500_000, 0),
            }
        );
        assert!(matches!(
            operations[2],
            Operation::Transaction {
                tx_type: TransactionType::Deposit,
                ..
            }
        ));
        assert!(matches!(operations[5], Operation::CloseAccount { .. }));
    }

    #[test]
    fn test_sync_reader_accepts_short_rows() {
        let file = create_temp_csv("user,alice\n");

        let operations: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(operations.len(), 1);
        assert_eq!(
            operations[0],
            Ok(Operation::RegisterUser {
                user: "alice".to_string()
            })
        );
    }

    #[test]
    fn test_sync_reader_includes_line_numbers_in_errors() {
        let file = create_temp_csv(
            "user,alice,,,,\n\
             deposit,,,a1,,invalid\n\
             user,bob,,,,\n",
        );

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(records.len(), 3);
        assert!(records[0].is_ok());
        assert!(records[2].is_ok());

        let error = records[1].as_ref().unwrap_err();
        assert!(error.contains("Line 3"));
        assert!(error.contains("Invalid amount"));
    }

    #[test]
    fn test_sync_reader_handles_whitespace_and_case() {
        let file = create_temp_csv("  DEPOSIT  ,  ,  ,  a1  ,  ,  100.0  \n");

        let records: Vec<_> = SyncReader::new(file.path()).unwrap().collect();

        assert_eq!(
            records[0],
            Ok(Operation::Transaction {
                tx_type: TransactionType::Deposit,
                from: String::new(),
                to: "a1".to_string(),
                amount: Decimal::new(1000, 1),
            })
        );
    }

    #[test]
    fn test_sync_reader_handles_empty_file_after_header() {
        let file = create_temp_csv("");
        assert_eq!(SyncReader::new(file.path()).unwrap().count(), 0);
    }
}
