//! # Protocol Configuration & Constants
//!
//! Every tunable number in the SET engine lives here. Components take their
//! parameters from a [`ProtocolConfig`]; the constants below are its defaults
//! and the hard limits the engine refuses to go past.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

// ---------------------------------------------------------------------------
// Protocol Identity
// ---------------------------------------------------------------------------

/// Protocol version stamped on certificate requests.
pub const PROTOCOL_VERSION: &str = "SET-1.0";

/// Name the simulated root CA signs certificates under.
pub const DEFAULT_CA_NAME: &str = "SET_ROOT_CA_V1";

/// Request type carried by every client certificate request.
pub const CERTIFICATE_REQUEST_TYPE: &str = "SET_CLIENT_CERTIFICATE";

/// Purpose field on issued certificates.
pub const CERTIFICATE_PURPOSE: &str = "SET_TRANSACTION_SIGNING";

/// Message attached to a successful confirmation.
pub const CONFIRMATION_MESSAGE: &str = "SET transaction completed";

// ---------------------------------------------------------------------------
// Cryptographic Parameters
// ---------------------------------------------------------------------------

/// RSA modulus size used when the caller does not ask for one.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Weakest RSA modulus the key service will generate.
pub const MIN_KEY_BITS: usize = 2048;

/// Largest RSA modulus the backend accepts for public keys.
pub const MAX_KEY_BITS: usize = 4096;

/// Length of a SHA-256 output in bytes.
pub const HASH_OUTPUT_LENGTH: usize = 32;

/// OAEP overhead with SHA-256: `2 * hLen + 2`.
pub const OAEP_SHA256_OVERHEAD: usize = 2 * HASH_OUTPUT_LENGTH + 2;

/// Algorithm tag for a given modulus size, e.g. `RSA-2048-SHA256`.
pub fn algorithm_tag(bits: usize) -> String {
    format!("RSA-{}-SHA256", bits)
}

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

/// Default certificate lifetime: one year.
pub const DEFAULT_CERTIFICATE_VALIDITY: Duration = Duration::from_secs(365 * 24 * 60 * 60);

/// How old an order may be when the bank checks it.
pub const DEFAULT_FRESHNESS_WINDOW: Duration = Duration::from_secs(15 * 60);

/// How far in the future an order timestamp may sit (clock skew between parties).
pub const DEFAULT_MAX_FUTURE_SKEW: Duration = Duration::from_secs(300);

/// Longest duration any configured interval may span: one hundred years.
pub const MAX_CONFIGURED_SECS: u64 = 100 * 365 * 24 * 60 * 60;

// ---------------------------------------------------------------------------
// Identifiers & Limits
// ---------------------------------------------------------------------------

pub const CERTIFICATE_ID_PREFIX: &str = "CERT";
pub const TRANSACTION_ID_PREFIX: &str = "TXN";
pub const AUTHORIZATION_CODE_PREFIX: &str = "AUTH";
pub const CAPTURE_CODE_PREFIX: &str = "CAPT";
pub const CLIENT_ID_PREFIX: &str = "CLIENT";

/// Upper bound on any identifier field (transaction, merchant, client).
pub const MAX_IDENTIFIER_LENGTH: usize = 64;

/// Card numbers are 12 to 19 digits (ISO/IEC 7812).
pub const MIN_PAN_DIGITS: usize = 12;
pub const MAX_PAN_DIGITS: usize = 19;

// ---------------------------------------------------------------------------
// ProtocolConfig
// ---------------------------------------------------------------------------

/// Errors raised when a configuration does not make sense.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("key size {bits} outside supported range {}..={}", MIN_KEY_BITS, MAX_KEY_BITS)]
    KeySize { bits: usize },

    #[error("{field} must be greater than zero")]
    ZeroDuration { field: &'static str },

    #[error("{field} exceeds {} seconds", MAX_CONFIGURED_SECS)]
    DurationTooLong { field: &'static str },

    #[error("CA name must not be empty")]
    EmptyCaName,
}

/// Runtime parameters shared by the CA, the verifier, and every session.
///
/// Durations are expressed in whole seconds so the struct reads naturally
/// from JSON. Missing fields fall back to the defaults above.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProtocolConfig {
    /// RSA modulus size for every party's keypair.
    pub key_bits: usize,
    /// Issuer name stamped on certificates.
    pub ca_name: String,
    /// Certificate lifetime in seconds.
    pub certificate_validity_secs: u64,
    /// Maximum order age accepted by the verifier, in seconds.
    pub freshness_window_secs: u64,
    /// Maximum forward clock skew accepted by the verifier, in seconds.
    pub max_future_skew_secs: u64,
}

impl Default for ProtocolConfig {
    fn default() -> Self {
        Self {
            key_bits: DEFAULT_KEY_BITS,
            ca_name: DEFAULT_CA_NAME.to_string(),
            certificate_validity_secs: DEFAULT_CERTIFICATE_VALIDITY.as_secs(),
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW.as_secs(),
            max_future_skew_secs: DEFAULT_MAX_FUTURE_SKEW.as_secs(),
        }
    }
}

impl ProtocolConfig {
    /// Check the configuration against the engine's hard limits.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(MIN_KEY_BITS..=MAX_KEY_BITS).contains(&self.key_bits) {
            return Err(ConfigError::KeySize {
                bits: self.key_bits,
            });
        }
        if self.ca_name.trim().is_empty() {
            return Err(ConfigError::EmptyCaName);
        }
        if self.certificate_validity_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "certificate_validity_secs",
            });
        }
        if self.freshness_window_secs == 0 {
            return Err(ConfigError::ZeroDuration {
                field: "freshness_window_secs",
            });
        }
        for (field, secs) in [
            ("certificate_validity_secs", self.certificate_validity_secs),
            ("freshness_window_secs", self.freshness_window_secs),
            ("max_future_skew_secs", self.max_future_skew_secs),
        ] {
            if secs > MAX_CONFIGURED_SECS {
                return Err(ConfigError::DurationTooLong { field });
            }
        }
        Ok(())
    }

    pub fn certificate_validity(&self) -> Duration {
        Duration::from_secs(self.certificate_validity_secs)
    }

    pub fn freshness_window(&self) -> Duration {
        Duration::from_secs(self.freshness_window_secs)
    }

    pub fn max_future_skew(&self) -> Duration {
        Duration::from_secs(self.max_future_skew_secs)
    }
}

/// Converts a std duration to a chrono one for timestamp arithmetic.
///
/// Millisecond precision is all the protocol's timestamps carry.
pub fn to_time_delta(duration: Duration) -> chrono::Duration {
    chrono::Duration::milliseconds(duration.as_millis().min(i64::MAX as u128) as i64)
}
