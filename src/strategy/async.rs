//! Asynchronous batch processing strategy
//!
//! This module provides an asynchronous, multi-threaded implementation of the
//! ProcessingStrategy trait. It replays operations in batches and runs the
//! independent conflict groups of each batch in parallel.
//!
//! # Architecture
//!
//! ```text
//! AsyncProcessingStrategy
//!     ├── BatchConfig (batch_size, max_concurrent_batches)
//!     ├── AsyncReader (batch CSV reading)
//!     └── BatchProcessor (conflict-group partitioning + blocking workers)
//!         └── ReplaySession (shared ledger and alias maps)
//! ```
//!
//! Batches are processed one after another, so operations that conflict keep
//! their file order across the whole input.

use crate::config::LedgerConfig;
use crate::io::async_reader::AsyncReader;
use crate::strategy::batch_processor::BatchProcessor;
use crate::strategy::session::ReplaySession;
use crate::strategy::ProcessingStrategy;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Configuration for batch processing
///
/// Controls how operations are batched and how many worker threads replay
/// the conflict groups of a batch.
#[derive(Clone, Debug)]
pub struct BatchConfig {
    /// Number of operations per batch
    pub batch_size: usize,
    /// Maximum number of conflict groups replaying concurrently
    pub max_concurrent_batches: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 1000,
            max_concurrent_batches: num_cpus::get(),
        }
    }
}

impl BatchConfig {
    /// Create a new BatchConfig with custom values
    ///
    /// Zero values fall back to the defaults.
    pub fn new(batch_size: usize, max_concurrent_batches: usize) -> Self {
        let default = Self::default();

        let batch_size = if batch_size == 0 {
            warn!(
                batch_size,
                default = default.batch_size,
                "invalid batch_size, using default"
            );
            default.batch_size
        } else {
            batch_size
        };

        let max_concurrent_batches = if max_concurrent_batches == 0 {
            warn!(
                max_concurrent_batches,
                default = default.max_concurrent_batches,
                "invalid max_concurrent_batches, using default"
            );
            default.max_concurrent_batches
        } else {
            max_concurrent_batches
        };

        Self {
            batch_size,
            max_concurrent_batches,
        }
    }
}

/// Asynchronous batch processing strategy
///
/// # Thread Safety
///
/// AsyncProcessingStrategy is Send + Sync. All shared replay state lives in
/// an `Arc<ReplaySession>` whose ledger serializes conflicting writes with row
/// locks.
#[derive(Debug, Clone)]
pub struct AsyncProcessingStrategy {
    ledger_config: LedgerConfig,
    config: BatchConfig,
}

impl AsyncProcessingStrategy {
    /// Create a new AsyncProcessingStrategy
    ///
    /// # Arguments
    ///
    /// * `ledger_config` - Configuration of the ledger each replay runs against
    /// * `config` - BatchConfig with batch_size and max_concurrent_batches
    pub fn new(ledger_config: LedgerConfig, config: BatchConfig) -> Self {
        Self {
            ledger_config,
            config,
        }
    }
}

impl ProcessingStrategy for AsyncProcessingStrategy {
    /// Replay operations batch by batch on a multi-threaded runtime
    ///
    /// 1. Creates a tokio runtime sized by `max_concurrent_batches`
    /// 2. Reads operations in batches with AsyncReader
    /// 3. Partitions each batch into conflict groups and replays them in parallel
    /// 4. Waits for a batch to finish before reading the next one
    fn replay(&self, input_path: &Path) -> Result<ReplaySession, String> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(self.config.max_concurrent_batches)
            .max_blocking_threads(self.config.max_concurrent_batches)
            .build()
            .map_err(|e| format!("Failed to create tokio runtime: {}", e))?;

        let session = Arc::new(ReplaySession::new(self.ledger_config.clone()));

        runtime.block_on(async {
            let file = tokio::fs::File::open(input_path)
                .await
                .map_err(|e| format!("Failed to open file '{}': {}", input_path.display(), e))?;

            // csv-async reads from futures-io, not tokio-io
            let compat_file = tokio_util::compat::TokioAsyncReadCompatExt::compat(file);
            let mut reader = AsyncReader::new(compat_file);
            let mut processor = BatchProcessor::new(Arc::clone(&session));

            let mut batches = 0usize;
            loop {
                let batch = reader.read_batch(self.config.batch_size).await;
                if batch.is_empty() {
                    break;
                }

                let results = processor.process_batch(batch).await;
                batches += 1;
                debug!(batch = batches, operations = results.len(), "batch replayed");
            }

            Ok::<(), String>(())
        })?;

        // Worker tasks hold clones until the runtime finishes with them
        drop(runtime);
        let session = Arc::try_unwrap(session)
            .map_err(|_| "Replay session is still shared after replay".to_string())?;

        let summary = session.summary();
        info!(
            applied = summary.applied,
            rejected = summary.rejected,
            "replay finished"
        );
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    /// Helper function to create a temporary CSV file for testing
    fn create_temp_csv(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes())
            .expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    fn strategy(batch_size: usize) -> AsyncProcessingStrategy {
        AsyncProcessingStrategy::new(
            LedgerConfig::default(),
            BatchConfig::new(batch_size, num_cpus::get()),
        )
    }

    #[test]
    fn test_batch_config_replaces_zero_values() {
        let config = BatchConfig::new(0, 0);
        assert_eq!(config.batch_size, 1000);
        assert_eq!(config.max_concurrent_batches, num_cpus::get());
    }

    #[test]
    fn test_async_strategy_processes_multiple_users() {
        let file = create_temp_csv(
            "type,user,account,to,account_type,amount\n\
             user,alice,,,,\n\
             user,bob,,,,\n\
             open,alice,a1,,main,100\n\
             open,bob,b1,,main,200\n\
             deposit,,,a1,,50\n",
        );

        let mut output = Vec::new();
        let summary = strategy(1000)
            .process(file.path(), &mut output, None)
            .unwrap();

        assert_eq!(summary.applied, 5);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,user,account_type,balance,active\n\
             a1,alice,main,150.00,true\n\
             b1,bob,main,200.00,true\n"
        );
    }

    #[test]
    fn test_async_strategy_handles_missing_file() {
        let mut output = Vec::new();

        let result = strategy(1000).process(Path::new("nonexistent.csv"), &mut output, None);
        assert!(result.is_err());
        assert!(result.unwrap_err().contains("Failed to open file"));
    }

    #[test]
    fn test_async_strategy_maintains_ordering_across_batches() {
        let file = create_temp_csv(
            "type,user,account,to,account_type,amount\n\
             user,alice,,,,\n\
             open,alice,a1,,main,0\n\
             deposit,,,a1,,100\n\
             withdraw,,a1,,,30\n\
             withdraw,,a1,,,80\n\
             deposit,,,a1,,5\n\
             withdraw,,a1,,,20\n",
        );

        // Small batches force one account's history across several batches
        let mut output = Vec::new();
        let summary = strategy(2).process(file.path(), &mut output, None).unwrap();

        assert_eq!(summary.applied, 6);
        assert_eq!(summary.rejected, 1);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,user,account_type,balance,active\n\
             a1,alice,main,55.00,true\n"
        );
    }

    #[test]
    fn test_async_strategy_close_then_reopen_pocket() {
        let file = create_temp_csv(
            "type,user,account,to,account_type,amount\n\
             user,alice,,,,\n\
             open,alice,a1,,main,0\n\
             open,alice,p1,,pocket,0\n\
             open,alice,p2,,pocket,0\n\
             open,alice,p3,,pocket,0\n\
             close,,p1,,,\n\
             open,alice,p4,,pocket,0\n",
        );
        let strategy = AsyncProcessingStrategy::new(
            LedgerConfig::default().with_account_limits(2, 1),
            BatchConfig::new(3, num_cpus::get()),
        );

        let mut output = Vec::new();
        let summary = strategy.process(file.path(), &mut output, None).unwrap();

        assert_eq!(summary.applied, 6);
        assert_eq!(summary.rejected, 1);
        assert_eq!(
            String::from_utf8(output).unwrap(),
            "account,user,account_type,balance,active\n\
             a1,alice,main,0.00,true\n\
             p2,alice,pocket,0.00,true\n\
             p4,alice,pocket,0.00,true\n"
        );
    }
}
