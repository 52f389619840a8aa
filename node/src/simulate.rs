//! # Transaction Simulation
//!
//! Turns `simulate` arguments into a protocol configuration and a
//! [`TransactionPlan`], then drives one [`SetSession`] per transaction from
//! certificate request to confirmation. A run that the protocol itself
//! stops (rejected bundle, declined order) is not an error here: its
//! summary records where it ended.

use anyhow::{bail, Context, Result};
use rand::rngs::StdRng;
use rand::SeedableRng;
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

use set_protocol::config::ProtocolConfig;
use set_protocol::payment::{ApproveAll, AuthorizationPolicy, SpendingLimit};
use set_protocol::session::{ProtocolState, SessionSummary, SetSession, SharedServices};
use set_protocol::transaction::{Amount, Currency};

use crate::cli::SimulateArgs;

/// Certificate lifetime used when the run asks for an expired certificate.
const EXPIRED_VALIDITY_SECS: u64 = 1;

/// How long an `--expired` run waits before submitting.
const EXPIRY_WAIT: Duration = Duration::from_millis(EXPIRED_VALIDITY_SECS * 1000 + 500);

/// What a `--tamper` run rewrites the amount to, in minor units.
const TAMPERED_VALUE: u64 = 999_999;

/// Read the optional JSON config file, apply flag overrides, and validate.
pub fn load_config(args: &SimulateArgs) -> Result<ProtocolConfig> {
    let mut config = match &args.config {
        Some(path) => read_config_file(path)?,
        None => ProtocolConfig::default(),
    };
    if let Some(bits) = args.key_bits {
        config.key_bits = bits;
    }
    if let Some(name) = &args.ca_name {
        config.ca_name = name.clone();
    }
    if args.expired {
        config.certificate_validity_secs = EXPIRED_VALIDITY_SECS;
    }
    config.validate().context("invalid protocol configuration")?;
    Ok(config)
}

fn read_config_file(path: &Path) -> Result<ProtocolConfig> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read config file {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config file {}", path.display()))
}

/// Everything one simulated transaction needs.
#[derive(Debug, Clone)]
pub struct TransactionPlan {
    pub client_id: String,
    pub merchant: String,
    pub amount: Amount,
    pub pan: String,
    pub tamper: bool,
    pub expired: bool,
    pub investigate: bool,
    pub seed: Option<u64>,
}

impl TransactionPlan {
    pub fn from_args(args: &SimulateArgs) -> Result<Self> {
        if args.transactions == 0 {
            bail!("--transactions must be at least 1");
        }
        Ok(Self {
            client_id: args.client_id.clone(),
            merchant: args.merchant.clone(),
            amount: parse_amount(&args.amount, &args.currency)?,
            pan: args.pan.clone(),
            tamper: args.tamper,
            expired: args.expired,
            investigate: args.investigate,
            seed: args.seed,
        })
    }
}

fn parse_amount(amount: &str, currency: &str) -> Result<Amount> {
    let currency: Currency = currency
        .parse()
        .with_context(|| format!("unsupported currency {currency:?}"))?;
    Amount::parse(amount, currency).with_context(|| format!("invalid amount {amount:?}"))
}

/// The bank's authorization policy for this run.
pub fn policy(args: &SimulateArgs) -> Result<Box<dyn AuthorizationPolicy>> {
    match &args.spending_limit {
        Some(limit) => {
            let limit = parse_amount(limit, &args.currency).context("invalid --spending-limit")?;
            Ok(Box::new(SpendingLimit::new(limit)))
        }
        None => Ok(Box::new(ApproveAll)),
    }
}

/// Run one transaction to the furthest state the protocol allows.
///
/// Blocking: RSA work dominates, so callers on an async runtime should use
/// `spawn_blocking`.
pub fn run_transaction(
    services: SharedServices,
    plan: &TransactionPlan,
    index: usize,
) -> Result<SessionSummary> {
    let session_id = format!("session-{index}");
    let mut session = SetSession::new(&session_id, &plan.client_id, services);

    session
        .request_certificate()
        .context("certificate request failed")?;
    session
        .obtain_certificate()
        .context("certificate issuance failed")?;

    let order = session
        .order_builder()
        .merchant(&plan.merchant)
        .amount(plan.amount.clone())
        .build();
    session
        .create_bundle(order, &plan.pan)
        .context("bundle construction failed")?;

    if plan.expired {
        std::thread::sleep(EXPIRY_WAIT);
    }

    if plan.tamper {
        let mut altered = session.bundle().context("bundle missing")?.clone();
        altered.order.amount = Amount::new(TAMPERED_VALUE, altered.order.amount.currency.clone());
        warn!(%session_id, amount = %altered.order.amount, "altering bundle in transit");
        let wire = altered.to_json().context("failed to encode altered bundle")?;
        session.submit_json(&wire).context("submission failed")?;
    } else {
        session.submit().context("submission failed")?;
    }

    let report = session.verify().context("verification failed")?;
    if !report.accepted() {
        return Ok(finish(&session));
    }

    session
        .request_payment()
        .context("payment request failed")?;
    let authorized = session.authorize().context("authorization failed")?.authorized;
    if !authorized {
        return Ok(finish(&session));
    }
    session.capture().context("capture failed")?;
    session.complete().context("confirmation failed")?;

    if plan.investigate {
        let mut rng = match plan.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_entropy(),
        };
        session
            .investigate(&mut rng)
            .context("risk review failed")?;
    }

    Ok(finish(&session))
}

fn finish(session: &SetSession) -> SessionSummary {
    let summary = session.summary();
    if summary.state == ProtocolState::Completed {
        info!(session_id = %summary.session_id, "transaction completed");
    } else {
        warn!(session_id = %summary.session_id, state = %summary.state, "transaction stopped");
    }
    summary
}
