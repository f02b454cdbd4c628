//! Synchronous processing strategy
//!
//! A single-threaded implementation of the ProcessingStrategy trait. It streams
//! operations through the `SyncReader` and applies each one to the session in
//! file order.

use crate::config::LedgerConfig;
use crate::io::sync_reader::SyncReader;
use crate::strategy::session::ReplaySession;
use crate::strategy::ProcessingStrategy;
use std::path::Path;
use tracing::{info, warn};

/// Synchronous processing strategy
///
/// # Examples
///
/// ```no_run
/// use bank_ledger_core::config::LedgerConfig;
/// use bank_ledger_core::strategy::{ProcessingStrategy, SyncProcessingStrategy};
/// use std::path::Path;
/// use std::io;
///
/// let strategy = SyncProcessingStrategy::new(LedgerConfig::default());
/// let mut output = io::stdout();
///
/// strategy.process(Path::new("operations.csv"), &mut output, None)
///     .expect("Processing failed");
/// ```
#[derive(Debug, Clone)]
pub struct SyncProcessingStrategy {
    config: LedgerConfig,
}

impl SyncProcessingStrategy {
    pub fn new(config: LedgerConfig) -> Self {
        Self { config }
    }
}

impl ProcessingStrategy for SyncProcessingStrategy {
    /// Replay operations one at a time in file order
    ///
    /// Fatal errors (file not found) are returned immediately. Parse errors and
    /// rejected operations are logged and processing continues.
    fn replay(&self, input_path: &Path) -> Result<ReplaySession, String> {
        let session = ReplaySession::new(self.config.clone());
        let reader = SyncReader::new(input_path)?;

        for result in reader {
            match result {
                // Rejections are already logged and counted by the session
                Ok(operation) => {
                    let _ = session.record(&operation);
                }
                Err(e) => warn!(error = %e, "CSV parsing error"),
            }
        }

        let summary = session.summary();
        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            "replay finished"
        );
        Ok(session)
    }
}
