// Copyright (c) 2026 SET Protocol Contributors. MIT License.
// See LICENSE for details.

//! # SET Node
//!
//! Entry point for the `set-node` binary. Parses CLI arguments, initializes
//! logging, stands up the certificate authority, payment processor, and
//! acquiring bank, and runs SET transactions against them.
//!
//! The binary supports two subcommands:
//!
//! - `simulate` — run N transactions concurrently, print their summaries as JSON
//! - `version`  — print build version information

mod cli;
mod logging;
mod simulate;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;

use set_protocol::clock::SystemClock;
use set_protocol::ids::UuidIds;
use set_protocol::session::{ProtocolState, SharedServices};

use cli::{Commands, SetNodeCli, SimulateArgs};
use logging::LogFormat;
use simulate::TransactionPlan;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = SetNodeCli::parse();

    match cli.command {
        Commands::Simulate(args) => {
            logging::init_logging(&cli.log_level, LogFormat::from_str_lossy(&cli.log_format));
            run_simulation(args).await
        }
        Commands::Version => {
            print_version();
            Ok(())
        }
    }
}

/// Stands up the shared parties, runs every transaction on the blocking
/// pool, and prints the summaries in submission order.
async fn run_simulation(args: SimulateArgs) -> Result<()> {
    let config = simulate::load_config(&args)?;
    let plan = TransactionPlan::from_args(&args)?;
    let policy = simulate::policy(&args)?;

    tracing::info!(
        key_bits = config.key_bits,
        ca = %config.ca_name,
        transactions = args.transactions,
        merchant = %plan.merchant,
        amount = %plan.amount,
        "starting simulation"
    );

    // Key generation for the CA and the bank is CPU-bound.
    let services = tokio::task::spawn_blocking(move || {
        SharedServices::bootstrap(config, policy, Arc::new(SystemClock), Arc::new(UuidIds))
    })
    .await
    .context("bootstrap task panicked")?
    .context("failed to stand up the CA and acquirer")?;

    let handles: Vec<_> = (0..args.transactions)
        .map(|index| {
            let services = services.clone();
            let plan = plan.clone();
            tokio::task::spawn_blocking(move || simulate::run_transaction(services, &plan, index))
        })
        .collect();

    let mut summaries = Vec::with_capacity(handles.len());
    for (index, handle) in handles.into_iter().enumerate() {
        let summary = handle
            .await
            .with_context(|| format!("transaction {index} panicked"))?
            .with_context(|| format!("transaction {index} failed"))?;
        summaries.push(summary);
    }

    let completed = summaries
        .iter()
        .filter(|s| s.state == ProtocolState::Completed)
        .count();
    tracing::info!(
        completed,
        stopped = summaries.len() - completed,
        certificates = services.ca.issued_count(),
        "simulation finished"
    );

    let json = serde_json::to_string_pretty(&summaries).context("failed to encode summaries")?;
    println!("{json}");
    Ok(())
}

/// Prints version information to stdout.
fn print_version() {
    println!("set-node {}", env!("CARGO_PKG_VERSION"));
    println!("protocol {}", set_protocol::config::PROTOCOL_VERSION);
}
