//! Crate-level error type.
//!
//! Each module raises its own narrow error enum; [`SetError`] is what the
//! protocol-step APIs (CA issuance, bundling, settlement, session steps)
//! return. Failed verification checks are never errors: they show up as
//! `false` fields in a [`crate::transaction::VerificationReport`].

use thiserror::Error;

use crate::authority::CertificateError;
use crate::config::ConfigError;
use crate::crypto::{CanonicalError, EncryptionError, KeyError, SignatureError};
use crate::session::{Operation, ProtocolState};
use crate::transaction::AmountError;

#[derive(Debug, Error)]
pub enum SetError {
    #[error(transparent)]
    Key(#[from] KeyError),

    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    #[error("signing failed: {0}")]
    Signing(#[from] SignatureError),

    #[error("card encryption failed: {0}")]
    CardEncryption(#[from] EncryptionError),

    /// Only the acquirer decrypts, so this is the acquirer's failure.
    #[error("card decryption failed: {0}")]
    CardDecryption(EncryptionError),

    #[error(transparent)]
    Certificate(#[from] CertificateError),

    #[error("certificate request rejected: {0}")]
    CertificateRequestRejected(String),

    #[error("operation `{operation}` is illegal in state {state}")]
    IllegalTransition {
        state: ProtocolState,
        operation: Operation,
    },

    #[error("transaction {0} has already been processed")]
    ReplayDetected(String),

    #[error("capture refused for {0}: no successful authorization")]
    CaptureWithoutAuthorization(String),

    #[error("authorization {0} has already been captured")]
    AlreadyCaptured(String),

    /// An authorization or capture presented for a transaction it does not
    /// belong to, or with terms that differ from what was approved.
    #[error("authorization for {transaction_id} does not match on {field}")]
    AuthorizationMismatch {
        transaction_id: String,
        field: &'static str,
    },

    #[error("{0} is not available at this step")]
    MissingArtifact(&'static str),

    #[error(transparent)]
    InvalidAmount(#[from] AmountError),

    #[error("serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl SetError {
    /// `true` for errors caused by the caller driving the protocol out of
    /// order, as opposed to bad input or crypto failures.
    pub fn is_sequencing_error(&self) -> bool {
        matches!(
            self,
            Self::IllegalTransition { .. } | Self::MissingArtifact(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn illegal_transition_names_state_and_operation() {
        let err = SetError::IllegalTransition {
            state: ProtocolState::Init,
            operation: Operation::Capture,
        };
        let msg = err.to_string();
        assert!(msg.contains("Init"), "{msg}");
        assert!(msg.contains("capture"), "{msg}");
        assert!(err.is_sequencing_error());
    }

    #[test]
    fn crypto_errors_convert() {
        let err: SetError = EncryptionError::Decryption.into();
        assert!(matches!(err, SetError::CardEncryption(_)));
        assert!(!err.is_sequencing_error());

        let err: SetError = KeyError::Format("bad".into()).into();
        assert!(matches!(err, SetError::Key(_)));
    }
}
