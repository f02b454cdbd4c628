//! Processing strategy module for ledger replay
//!
//! This module defines the Strategy pattern for complete replay pipelines,
//! covering both CSV parsing and applying operations to a ledger. Different
//! implementations (synchronous, asynchronous batch) can be selected at runtime
//! and produce the same final ledger state for the same input.

use crate::cli::StrategyType;
use crate::config::LedgerConfig;
use std::io::Write;
use std::path::Path;

pub mod r#async;
pub mod batch_processor;
pub mod session;
pub mod sync;

pub use self::r#async::{AsyncProcessingStrategy, BatchConfig};
pub use batch_processor::{BatchProcessor, ProcessingResult};
pub use session::{ReplayError, ReplaySession, ReplaySummary};
pub use sync::SyncProcessingStrategy;

/// Processing strategy trait for complete replay pipelines
///
/// Each strategy reads operations from a CSV file, applies them to a fresh
/// ledger and hands back the resulting session.
pub trait ProcessingStrategy: Send + Sync {
    /// Replay every operation of the input file into a new session
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The input file cannot be opened (file not found, permission denied)
    /// - The async runtime cannot be created
    ///
    /// Individual rows that fail to parse and operations the ledger rejects are
    /// logged and skipped; they do not cause this method to return an error.
    fn replay(&self, input_path: &Path) -> Result<ReplaySession, String>;

    /// Replay the input file and write the reports
    ///
    /// # Arguments
    ///
    /// * `input_path` - Path to the input CSV file of operations
    /// * `output` - Writer for the final account states
    /// * `transactions` - Optional writer for the transaction log
    ///
    /// # Returns
    ///
    /// Counts of applied and rejected operations.
    fn process(
        &self,
        input_path: &Path,
        output: &mut dyn Write,
        transactions: Option<&mut dyn Write>,
    ) -> Result<ReplaySummary, String> {
        let session = self.replay(input_path)?;
        session.write_reports(output, transactions)?;
        Ok(session.summary())
    }
}

/// Create a processing strategy based on the specified strategy type
///
/// # Arguments
///
/// * `strategy_type` - The type of processing strategy to create (Sync or Async)
/// * `ledger_config` - Configuration of the ledger each replay runs against
/// * `batch_config` - Optional configuration for async batch processing (ignored for sync)
pub fn create_strategy(
    strategy_type: StrategyType,
    ledger_config: LedgerConfig,
    batch_config: Option<BatchConfig>,
) -> Box<dyn ProcessingStrategy> {
    match strategy_type {
        StrategyType::Sync => Box::new(SyncProcessingStrategy::new(ledger_config)),
        StrategyType::Async => {
            let batch_config = batch_config.unwrap_or_default();
            Box::new(AsyncProcessingStrategy::new(ledger_config, batch_config))
        }
    }
}
