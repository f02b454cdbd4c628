//! Batch processing with conflict-group partitioning for async replay
//!
//! This module provides the `BatchProcessor`, which splits each batch of
//! operations into independent conflict groups and replays the groups in
//! parallel while keeping every group in input order.
//!
//! # Conflict groups
//!
//! Two operations conflict when they name the same user alias or the same
//! account alias. Closing an account also touches its owner, because it changes
//! how many accounts of that type the owner may still open. Conflicting
//! operations are joined into one group with a union-find over their keys, so
//! the final ledger state is the same as a sequential replay of the file.
//!
//! # Architecture
//!
//! ```text
//! BatchProcessor
//!     ├── Arc<ReplaySession>       (shared ledger and alias maps)
//!     └── owners                   (account alias → user alias, across batches)
//! ```
//!
//! Groups run on tokio's blocking pool because ledger calls may wait on row
//! locks.

use std::collections::HashMap;
use std::sync::Arc;

use super::session::{ReplayError, ReplaySession};
use crate::io::csv_format::Operation;
use tracing::error;

/// Result of replaying a single operation
#[derive(Debug, Clone)]
pub struct ProcessingResult {
    /// The operation that was replayed
    pub operation: Operation,

    /// The outcome of replaying it
    pub result: Result<(), ReplayError>,
}

/// Batch processor with conflict-group partitioning
#[derive(Debug)]
pub struct BatchProcessor {
    session: Arc<ReplaySession>,

    /// Owner of every account alias opened so far
    owners: HashMap<String, String>,
}

fn find(parent: &mut [usize], mut index: usize) -> usize {
    while parent[index] != index {
        parent[index] = parent[parent[index]];
        index = parent[index];
    }
    index
}

impl BatchProcessor {
    /// Create a new BatchProcessor replaying into `session`
    pub fn new(session: Arc<ReplaySession>) -> Self {
        Self {
            session,
            owners: HashMap::new(),
        }
    }

    /// Keys an operation conflicts on
    fn conflict_keys(&self, operation: &Operation) -> Vec<String> {
        let mut keys: Vec<String> = operation
            .accounts()
            .into_iter()
            .map(|alias| format!("account:{}", alias))
            .collect();

        if let Some(user) = operation.user() {
            keys.push(format!("user:{}", user));
        }
        if let Operation::CloseAccount { account } = operation {
            if let Some(owner) = self.owners.get(account) {
                keys.push(format!("user:{}", owner));
            }
        }

        keys
    }

    /// Partition a batch into conflict groups
    ///
    /// # Guarantees
    ///
    /// - Each operation appears in exactly one group
    /// - Operations sharing a user or account alias share a group
    /// - Each group keeps the input order of its operations
    /// - Groups are ordered by their first operation
    pub fn partition(&mut self, batch: Vec<Operation>) -> Vec<Vec<Operation>> {
        let mut parent: Vec<usize> = (0..batch.len()).collect();
        let mut first_by_key: HashMap<String, usize> = HashMap::new();

        for (index, operation) in batch.iter().enumerate() {
            for key in self.conflict_keys(operation) {
                match first_by_key.get(&key) {
                    Some(&other) => {
                        let a = find(&mut parent, index);
                        let b = find(&mut parent, other);
                        if a != b {
                            parent[a] = b;
                        }
                    }
                    None => {
                        first_by_key.insert(key, index);
                    }
                }
            }

            if let Operation::OpenAccount { user, account, .. } = operation {
                self.owners.insert(account.clone(), user.clone());
            }
        }

        let mut groups: Vec<Vec<Operation>> = Vec::new();
        let mut slot_by_root: HashMap<usize, usize> = HashMap::new();
        for (index, operation) in batch.into_iter().enumerate() {
            let root = find(&mut parent, index);
            let slot = *slot_by_root.entry(root).or_insert_with(|| {
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(operation);
        }

        groups
    }

    /// Replay one group in order
    fn process_group(session: &ReplaySession, operations: Vec<Operation>) -> Vec<ProcessingResult> {
        operations
            .into_iter()
            .map(|operation| {
                let result = session.record(&operation);
                ProcessingResult { operation, result }
            })
            .collect()
    }

    /// Replay a batch with its conflict groups running concurrently
    ///
    /// Waits for every group before returning, so batches never overlap.
    /// Results of different groups may interleave in any order.
    pub async fn process_batch(&mut self, batch: Vec<Operation>) -> Vec<ProcessingResult> {
        let groups = self.partition(batch);

        let mut tasks = Vec::with_capacity(groups.len());
        for group in groups {
            let session = Arc::clone(&self.session);
            tasks.push(tokio::task::spawn_blocking(move || {
                Self::process_group(&session, group)
            }));
        }

        let mut results = Vec::new();
        for task in tasks {
            match task.await {
                Ok(group_results) => results.extend(group_results),
                Err(e) => error!(error = %e, "replay worker panicked"),
            }
        }

        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use crate::types::{AccountType, TransactionType};
    use rust_decimal::Decimal;

    fn user(alias: &str) -> Operation {
        Operation::RegisterUser {
            user: alias.to_string(),
        }
    }

    fn open(user: &str, account: &str, account_type: AccountType) -> Operation {
        Operation::OpenAccount {
            user: user.to_string(),
            account: account.to_string(),
            account_type,
            initial_balance: Decimal::new(100, 0),
        }
    }

    fn transfer(from: &str, to: &str) -> Operation {
        Operation::Transaction {
            tx_type: TransactionType::Transfer,
            from: from.to_string(),
            to: to.to_string(),
            amount: Decimal::ONE,
        }
    }

    fn processor() -> BatchProcessor {
        BatchProcessor::new(Arc::new(ReplaySession::new(LedgerConfig::default())))
    }

    #[test]
    fn test_partition_separates_independent_users() {
        let mut processor = processor();
        let groups = processor.partition(vec![
            user("u1"),
            user("u2"),
            open("u1", "a1", AccountType::Main),
            open("u2", "b1", AccountType::Main),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0], vec![user("u1"), open("u1", "a1", AccountType::Main)]);
        assert_eq!(groups[1], vec![user("u2"), open("u2", "b1", AccountType::Main)]);
    }

    #[test]
    fn test_partition_joins_groups_through_transfers() {
        let mut processor = processor();
        let groups = processor.partition(vec![
            open("u1", "a1", AccountType::Main),
            open("u2", "b1", AccountType::Main),
            open("u3", "c1", AccountType::Main),
            transfer("a1", "b1"),
        ]);

        assert_eq!(groups.len(), 2);
        assert_eq!(groups[0].len(), 3);
        assert_eq!(groups[0][2], transfer("a1", "b1"));
        assert_eq!(groups[1], vec![open("u3", "c1", AccountType::Main)]);
    }

    #[test]
    fn test_close_joins_owner_across_batches() {
        let mut processor = processor();
        processor.partition(vec![open("u1", "p1", AccountType::Pocket)]);

        let groups = processor.partition(vec![
            Operation::CloseAccount {
                account: "p1".to_string(),
            },
            open("u1", "p2", AccountType::Pocket),
        ]);

        assert_eq!(groups.len(), 1);
    }

    #[test]
    fn test_partition_preserves_every_operation() {
        let mut processor = processor();
        let batch: Vec<Operation> = (0..20)
            .map(|i| transfer(&format!("a{}", i % 4), &format!("a{}", (i + 1) % 7)))
            .collect();

        let groups = processor.partition(batch.clone());

        let total: usize = groups.iter().map(Vec::len).sum();
        assert_eq!(total, batch.len());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_process_batch_replays_all_groups() {
        let session = Arc::new(ReplaySession::new(LedgerConfig::default()));
        let mut processor = BatchProcessor::new(Arc::clone(&session));

        let results = processor
            .process_batch(vec![
                user("u1"),
                user("u2"),
                open("u1", "a1", AccountType::Main),
                open("u2", "b1", AccountType::Main),
                transfer("a1", "b1"),
                transfer("b1", "zz"),
            ])
            .await;

        assert_eq!(results.len(), 6);
        assert_eq!(results.iter().filter(|r| r.result.is_ok()).count(), 5);

        let rows = session.account_rows().unwrap();
        assert_eq!(rows[0].balance, Decimal::new(99, 0));
        assert_eq!(rows[1].balance, Decimal::new(101, 0));
    }
}
