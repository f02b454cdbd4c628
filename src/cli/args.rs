use crate::config::LedgerConfig;
use crate::strategy::BatchConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;
use std::time::Duration;

/// Replay banking ledger operations from a CSV file
#[derive(Parser, Debug)]
#[command(name = "bank-ledger")]
#[command(about = "Replay banking ledger operations and report final account states", long_about = None)]
pub struct CliArgs {
    /// Operation file: users, account openings and closings, money movements
    #[arg(value_name = "INPUT", help = "Path to the operation CSV file")]
    pub input_file: PathBuf,

    /// How the operation file is replayed against the ledger
    #[arg(
        long = "strategy",
        value_name = "STRATEGY",
        default_value = "async",
        help = "Replay strategy: 'sync' applies operations in file order, 'async' replays independent users in parallel"
    )]
    pub strategy: StrategyType,

    /// Operations read per batch before conflict grouping (async only)
    #[arg(
        long = "batch-size",
        value_name = "SIZE",
        help = "Operations read per batch (default: 1000)"
    )]
    pub batch_size: Option<usize>,

    /// Conflict groups replayed at once (async only)
    #[arg(
        long = "max-concurrent",
        value_name = "COUNT",
        help = "Maximum number of conflict groups replaying concurrently (default: CPU cores)"
    )]
    pub max_concurrent_batches: Option<usize>,

    /// Where to write the committed transaction log
    #[arg(
        long = "transactions",
        value_name = "PATH",
        help = "Also write the transaction log as CSV to this path"
    )]
    pub transactions: Option<PathBuf>,

    #[arg(
        long = "lock-timeout-ms",
        value_name = "MILLIS",
        help = "How long an operation waits for an account row lock (default: 5000)"
    )]
    pub lock_timeout_ms: Option<u64>,

    #[arg(
        long = "max-pockets",
        value_name = "COUNT",
        help = "Pocket accounts allowed per user (default: 8)"
    )]
    pub max_pocket_accounts: Option<u64>,

    #[arg(
        long = "max-deposits",
        value_name = "COUNT",
        help = "Deposit accounts allowed per user (default: 3)"
    )]
    pub max_deposit_accounts: Option<u64>,
}

/// Replay pipelines selectable on the command line
#[derive(Clone, Debug, PartialEq, Eq, ValueEnum)]
pub enum StrategyType {
    Sync,
    Async,
}

impl CliArgs {
    /// Sizing of the async replay: operations per batch and how many conflict
    /// groups run on blocking workers at once
    ///
    /// Unset flags keep the [`BatchConfig`] defaults. A zero is replaced by
    /// `BatchConfig::new`, which logs a warning.
    pub fn to_batch_config(&self) -> BatchConfig {
        let default = BatchConfig::default();
        match (self.batch_size, self.max_concurrent_batches) {
            (None, None) => default,
            (batch_size, max_concurrent) => BatchConfig::new(
                batch_size.unwrap_or(default.batch_size),
                max_concurrent.unwrap_or(default.max_concurrent_batches),
            ),
        }
    }

    /// Business limits and lock timeout for the replayed ledger
    pub fn to_ledger_config(&self) -> LedgerConfig {
        let mut config = LedgerConfig::default();
        if let Some(millis) = self.lock_timeout_ms {
            config = config.with_lock_timeout(Duration::from_millis(millis));
        }
        if self.max_pocket_accounts.is_some() || self.max_deposit_accounts.is_some() {
            let pockets = self
                .max_pocket_accounts
                .unwrap_or(config.max_pocket_accounts);
            let deposits = self
                .max_deposit_accounts
                .unwrap_or(config.max_deposit_accounts);
            config = config.with_account_limits(pockets, deposits);
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn parse(args: &[&str]) -> CliArgs {
        CliArgs::try_parse_from(std::iter::once("bank-ledger").chain(args.iter().copied()))
            .unwrap()
    }

    #[rstest]
    #[case::replays_async_by_default(&["ops.csv"], StrategyType::Async)]
    #[case::file_order_replay(&["--strategy", "sync", "ops.csv"], StrategyType::Sync)]
    #[case::parallel_replay(&["--strategy", "async", "ops.csv"], StrategyType::Async)]
    fn test_replay_strategy(#[case] args: &[&str], #[case] expected: StrategyType) {
        assert_eq!(parse(args).strategy, expected);
    }

    #[rstest]
    #[case::defaults(&["ops.csv"], 1000, num_cpus::get())]
    #[case::larger_batches(&["--batch-size", "2000", "ops.csv"], 2000, num_cpus::get())]
    #[case::fewer_groups(&["--max-concurrent", "2", "ops.csv"], 1000, 2)]
    #[case::both(&["--batch-size", "50", "--max-concurrent", "8", "ops.csv"], 50, 8)]
    #[case::zero_batch_falls_back(&["--batch-size", "0", "ops.csv"], 1000, num_cpus::get())]
    #[case::zero_groups_falls_back(&["--max-concurrent", "0", "ops.csv"], 1000, num_cpus::get())]
    fn test_replay_sizing(
        #[case] args: &[&str],
        #[case] batch_size: usize,
        #[case] max_concurrent: usize,
    ) {
        let config = parse(args).to_batch_config();

        assert_eq!(config.batch_size, batch_size);
        assert_eq!(config.max_concurrent_batches, max_concurrent);
    }

    #[rstest]
    #[case::default_timeout(&["ops.csv"], Duration::from_secs(5))]
    #[case::short_timeout(&["--lock-timeout-ms", "250", "ops.csv"], Duration::from_millis(250))]
    fn test_row_lock_timeout(#[case] args: &[&str], #[case] expected: Duration) {
        assert_eq!(parse(args).to_ledger_config().lock_timeout, expected);
    }

    #[rstest]
    #[case::default_caps(&["ops.csv"], 8, 3)]
    #[case::pocket_cap(&["--max-pockets", "2", "ops.csv"], 2, 3)]
    #[case::deposit_cap(&["--max-deposits", "1", "ops.csv"], 8, 1)]
    #[case::both_caps(&["--max-pockets", "0", "--max-deposits", "0", "ops.csv"], 0, 0)]
    fn test_account_caps(#[case] args: &[&str], #[case] pockets: u64, #[case] deposits: u64) {
        let config = parse(args).to_ledger_config();

        assert_eq!(config.max_pocket_accounts, pockets);
        assert_eq!(config.max_deposit_accounts, deposits);
    }

    #[test]
    fn test_transaction_log_with_lock_timeout() {
        let args = parse(&["--transactions", "log.csv", "--lock-timeout-ms", "10", "ops.csv"]);

        assert_eq!(args.transactions, Some(PathBuf::from("log.csv")));
        assert_eq!(args.input_file, PathBuf::from("ops.csv"));
        assert_eq!(
            args.to_ledger_config().lock_timeout,
            Duration::from_millis(10)
        );
        assert_eq!(parse(&["ops.csv"]).transactions, None);
    }

    #[rstest]
    #[case::missing_operation_file(&["bank-ledger"])]
    #[case::unknown_strategy(&["bank-ledger", "--strategy", "batch", "ops.csv"])]
    #[case::non_numeric_timeout(&["bank-ledger", "--lock-timeout-ms", "soon", "ops.csv"])]
    #[case::negative_cap(&["bank-ledger", "--max-pockets", "-1", "ops.csv"])]
    fn test_rejected_arguments(#[case] args: &[&str]) {
        assert!(CliArgs::try_parse_from(args).is_err());
    }
}
