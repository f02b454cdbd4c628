//! Asynchronous CSV reader with batch interface
//!
//! Provides a streaming interface over replay operations from a CSV file.
//! Supports batch reading for the async replay strategy.
//!
//! # Architecture
//!
//! ```text
//! CSV Reader → AsyncReader → Batches of Operations
//!                  ↓
//!           csv_format module
//!           (OperationRecord, convert_operation_record)
//! ```

use crate::io::csv_format::{convert_operation_record, Operation, OperationRecord};
use csv_async::AsyncReaderBuilder;
use futures::io::AsyncRead;
use futures::stream::StreamExt;
use tracing::warn;

/// Asynchronous CSV reader
///
/// Provides batch reading interface over replay operations.
pub struct AsyncReader<R: AsyncRead + Unpin> {
    csv_reader: csv_async::AsyncDeserializer<R>,
}

impl<R: AsyncRead + Unpin + Send + 'static> AsyncReader<R> {
    /// Create a new AsyncReader from an async reader
    pub fn new(reader: R) -> Self {
        let csv_reader = AsyncReaderBuilder::new()
            .flexible(true)
            .trim(csv_async::Trim::All)
            .create_deserializer(reader);

        Self { csv_reader }
    }

    /// Read a batch of operations
    ///
    /// Reads up to `batch_size` valid operations. Rows that fail to parse or
    /// convert are logged and skipped.
    ///
    /// # Returns
    ///
    /// The operations in file order; an empty vector at end of file.
    pub async fn read_batch(&mut self, batch_size: usize) -> Vec<Operation> {
        let mut batch = Vec::with_capacity(batch_size);
        let mut records = self.csv_reader.deserialize::<OperationRecord>();

        while batch.len() < batch_size {
            match records.next().await {
                Some(Ok(record)) => match convert_operation_record(record) {
                    Ok(operation) => batch.push(operation),
                    Err(e) => warn!(error = %e, "skipping unconvertible record"),
                },
                Some(Err(e)) => warn!(error = %e, "skipping malformed CSV row"),
                None => break,
            }
        }

        batch
    }
}
