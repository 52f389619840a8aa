//! Shared fixtures for unit tests.
//!
//! RSA key generation dominates test time, so the three party keypairs are
//! generated once per test binary and shared.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use crate::authority::{Certificate, CertificateAuthority};
use crate::clock::{Clock, FixedClock};
use crate::config::{ProtocolConfig, DEFAULT_CA_NAME, DEFAULT_KEY_BITS};
use crate::crypto::SetKeypair;
use crate::ids::SequentialIds;
use crate::payment::{ApproveAll, AuthorizationPolicy};
use crate::session::SharedServices;
use crate::transaction::{
    Amount, BundleVerifier, Currency, OrderBuilder, OrderRecord, TransactionBundle,
    TransactionBundler,
};

/// 2023-11-14T22:13:20Z
pub(crate) const START_MILLIS: i64 = 1_700_000_000_000;

pub(crate) const TEST_PAN: &str = "4111111111111111";

const ONE_YEAR: Duration = Duration::from_secs(365 * 24 * 3600);

fn cached(cell: &'static OnceLock<SetKeypair>) -> &'static SetKeypair {
    cell.get_or_init(|| SetKeypair::generate(DEFAULT_KEY_BITS).unwrap())
}

pub(crate) fn client_keypair() -> &'static SetKeypair {
    static KEY: OnceLock<SetKeypair> = OnceLock::new();
    cached(&KEY)
}

pub(crate) fn bank_keypair() -> &'static SetKeypair {
    static KEY: OnceLock<SetKeypair> = OnceLock::new();
    cached(&KEY)
}

pub(crate) fn ca_keypair() -> &'static SetKeypair {
    static KEY: OnceLock<SetKeypair> = OnceLock::new();
    cached(&KEY)
}

/// Client "C1" buying for `value` cents (EUR) at "ShopX", created at
/// [`START_MILLIS`].
pub(crate) fn sample_order(transaction_id: &str, value: u64) -> OrderRecord {
    OrderBuilder::new("C1")
        .transaction_id(transaction_id)
        .merchant("ShopX")
        .amount(Amount::new(value, Currency::EUR))
        .created_at(FixedClock::at_millis(START_MILLIS).now())
        .build()
}

pub(crate) fn services() -> SharedServices {
    services_with_policy(Box::new(ApproveAll))
}

pub(crate) fn services_with_policy(policy: Box<dyn AuthorizationPolicy>) -> SharedServices {
    SharedServices::with_keys(
        ProtocolConfig::default(),
        ca_keypair().clone(),
        bank_keypair().clone(),
        policy,
        Arc::new(FixedClock::at_millis(START_MILLIS)),
        Arc::new(SequentialIds::new()),
    )
    .unwrap()
}

/// A CA with certificates already issued to client "C1" and to "BANK".
pub(crate) struct TestParties {
    pub clock: Arc<FixedClock>,
    pub ca: Arc<CertificateAuthority>,
    pub client_certificate: Certificate,
    pub bank_certificate: Certificate,
}

impl TestParties {
    pub fn new() -> Self {
        let clock = Arc::new(FixedClock::at_millis(START_MILLIS));
        let ca = Arc::new(CertificateAuthority::with_keypair(
            DEFAULT_CA_NAME,
            ca_keypair().clone(),
            clock.clone(),
            Arc::new(SequentialIds::new()),
        ));
        let client_certificate = ca
            .issue("C1", client_keypair().public_key(), ONE_YEAR)
            .unwrap();
        let bank_certificate = ca
            .issue("BANK", bank_keypair().public_key(), ONE_YEAR)
            .unwrap();

        Self {
            clock,
            ca,
            client_certificate,
            bank_certificate,
        }
    }

    pub fn bundler(&self) -> TransactionBundler {
        TransactionBundler::new(self.clock.clone())
    }

    /// Like [`sample_order`] but stamped with the current fixture time.
    pub fn order(&self, transaction_id: &str, value: u64) -> OrderRecord {
        OrderBuilder::new("C1")
            .transaction_id(transaction_id)
            .merchant("ShopX")
            .amount(Amount::new(value, Currency::EUR))
            .created_at(self.clock.now())
            .build()
    }

    /// An honest bundle from C1 with the card encrypted to the bank.
    pub fn bundle(&self, transaction_id: &str, value: u64) -> TransactionBundle {
        self.bundler()
            .build(
                self.order(transaction_id, value),
                TEST_PAN,
                client_keypair(),
                &self.client_certificate,
                &self.bank_certificate,
            )
            .unwrap()
    }

    pub fn verifier(&self) -> BundleVerifier {
        BundleVerifier::new(self.ca.clone(), DEFAULT_KEY_BITS, &ProtocolConfig::default())
    }
}
