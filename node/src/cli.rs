//! # CLI Interface
//!
//! Defines the command-line argument structure for `set-node` using
//! `clap` derive. Two subcommands: `simulate` and `version`.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// SET protocol simulator.
///
/// Runs complete SET transactions in-process: certificate issuance, signed
/// bundles, bank verification, and two-phase settlement. Prints the
/// resulting artifacts as JSON on stdout; logs go to stderr.
#[derive(Parser, Debug)]
#[command(
    name = "set-node",
    about = "SET payment protocol simulator",
    version,
    propagate_version = true
)]
pub struct SetNodeCli {
    /// Log output format: `pretty` or `json`.
    #[arg(long, global = true, env = "SET_LOG_FORMAT", default_value = "pretty")]
    pub log_format: String,

    /// Default log filter when `RUST_LOG` is unset.
    #[arg(
        long,
        global = true,
        env = "SET_LOG_LEVEL",
        default_value = "set_node=info,set_protocol=info"
    )]
    pub log_level: String,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level subcommands for the SET node binary.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run one or more protocol transactions and print their artifacts.
    Simulate(SimulateArgs),
    /// Print version information and exit.
    Version,
}

/// Arguments for the `simulate` subcommand.
#[derive(Parser, Debug, Clone)]
pub struct SimulateArgs {
    /// Path to a JSON protocol configuration file.
    ///
    /// Missing fields take their defaults. Flags below override the file.
    #[arg(long, short = 'c', env = "SET_CONFIG")]
    pub config: Option<PathBuf>,

    /// RSA modulus size for every party.
    #[arg(long, env = "SET_KEY_BITS")]
    pub key_bits: Option<usize>,

    /// Issuer name stamped on certificates.
    #[arg(long, env = "SET_CA_NAME")]
    pub ca_name: Option<String>,

    /// Client identifier the certificates are issued to.
    #[arg(long, env = "SET_CLIENT_ID", default_value = "C1")]
    pub client_id: String,

    /// Merchant the order is placed with.
    #[arg(long, short = 'm', env = "SET_MERCHANT", default_value = "ShopX")]
    pub merchant: String,

    /// Order amount as a decimal string, e.g. `49.99`.
    #[arg(long, short = 'a', default_value = "49.99")]
    pub amount: String,

    /// ISO 4217 currency code.
    #[arg(long, default_value = "EUR")]
    pub currency: String,

    /// Card number to encrypt into the bundle. Only its masked form is
    /// ever printed.
    #[arg(long, env = "SET_PAN", default_value = "4111111111111111")]
    pub pan: String,

    /// Number of independent transactions to run concurrently.
    #[arg(long, short = 'n', default_value_t = 1)]
    pub transactions: usize,

    /// Decline any order above this amount (same currency).
    #[arg(long)]
    pub spending_limit: Option<String>,

    /// Alter the order amount in transit after it is signed.
    #[arg(long)]
    pub tamper: bool,

    /// Let the client certificate expire before the bundle is submitted.
    #[arg(long)]
    pub expired: bool,

    /// Run the post-capture risk review.
    #[arg(long)]
    pub investigate: bool,

    /// Seed for the risk review RNG. Random when omitted.
    #[arg(long)]
    pub seed: Option<u64>,
}
