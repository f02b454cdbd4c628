//! Bank Ledger CLI
//!
//! Command-line interface for replaying banking ledger operations from CSV files.
//!
//! # Usage
//!
//! ```bash
//! cargo run -- operations.csv > accounts.csv
//! cargo run -- --strategy sync operations.csv > accounts.csv
//! cargo run -- --strategy async --batch-size 2000 --max-concurrent 8 operations.csv > accounts.csv
//! cargo run -- --transactions log.csv operations.csv > accounts.csv
//! cargo run -- --max-pockets 2 --lock-timeout-ms 250 operations.csv > accounts.csv
//! ```
//!
//! The program registers users, opens and closes accounts and applies deposits,
//! withdrawals and transfers from the input file, then writes the final account
//! states to stdout. Rejected operations are logged to stderr; set `RUST_LOG`
//! to change the log level.
//!
//! # Exit Codes
//!
//! - 0: Success
//! - 1: Error (file not found, file not readable, output not writable, etc.)

use bank_ledger_core::cli;
use bank_ledger_core::strategy;
use std::fs::File;
use std::io::{self, Write};
use std::process;
use tracing::{error, info};

fn main() {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = cli::parse_args();

    let strategy = {
        let batch_config = if matches!(args.strategy, cli::StrategyType::Async) {
            Some(args.to_batch_config())
        } else {
            None
        };
        strategy::create_strategy(args.strategy.clone(), args.to_ledger_config(), batch_config)
    };

    let mut transactions = match args.transactions.as_ref().map(File::create).transpose() {
        Ok(file) => file,
        Err(e) => {
            error!(error = %e, "failed to create transaction report");
            process::exit(1);
        }
    };

    let mut output = io::stdout();
    let result = strategy.process(
        &args.input_file,
        &mut output,
        transactions.as_mut().map(|file| file as &mut dyn Write),
    );

    match result {
        Ok(summary) => info!(
            applied = summary.applied,
            rejected = summary.rejected,
            "ledger replay complete"
        ),
        Err(e) => {
            error!(error = %e, "ledger replay failed");
            process::exit(1);
        }
    }
}
