//! Transaction bundles and the bundler that builds them.
//!
//! A bundle is what the client sends to the bank: the order in the clear,
//! the card number encrypted to the bank's key, the client's signature over
//! the order, the client's certificate, and the order digest.
//!
//! Construction is all-or-nothing. Each step either succeeds or the whole
//! build returns an error; no half-built bundle ever escapes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use super::order::OrderRecord;
use crate::authority::Certificate;
use crate::clock::Clock;
use crate::crypto::encryption::validate_pan;
use crate::crypto::{digest, encrypt, sign, ContentDigest, SetKeypair, SetSignature, SignatureError};
use crate::error::SetError;

// ---------------------------------------------------------------------------
// TransactionBundle
// ---------------------------------------------------------------------------

/// The signed, encrypted transaction artifact. Read-only once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransactionBundle {
    pub order: OrderRecord,
    /// RSA-OAEP ciphertext of the card number, hex on the wire.
    #[serde(with = "hex::serde")]
    pub encrypted_card: Vec<u8>,
    /// Client signature over the canonical order.
    pub signature: SetSignature,
    /// The signer's certificate.
    pub certificate: Certificate,
    /// SHA-256 of the canonical order.
    pub digest: ContentDigest,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl TransactionBundle {
    /// Parse a bundle received on the wire. Unknown or missing fields, at
    /// any nesting level, are an error.
    pub fn from_json(json: &str) -> Result<Self, SetError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> Result<String, SetError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn transaction_id(&self) -> &str {
        &self.order.transaction_id
    }
}

// ---------------------------------------------------------------------------
// TransactionBundler
// ---------------------------------------------------------------------------

/// Builds bundles for a client.
pub struct TransactionBundler {
    clock: Arc<dyn Clock>,
}

impl TransactionBundler {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Encrypt the card to the recipient, sign and digest the order, and
    /// assemble the bundle.
    ///
    /// `signer_certificate` must certify `signer`'s public key; it travels in
    /// the bundle so the bank can check the signature.
    pub fn build(
        &self,
        order: OrderRecord,
        pan: &str,
        signer: &SetKeypair,
        signer_certificate: &Certificate,
        recipient_certificate: &Certificate,
    ) -> Result<TransactionBundle, SetError> {
        if &signer_certificate.subject_public_key != signer.public_key() {
            return Err(SetError::Signing(SignatureError::KeyMismatch {
                certificate_id: signer_certificate.certificate_id.clone(),
            }));
        }
        validate_pan(pan)?;

        let encrypted_card = encrypt(pan, &recipient_certificate.subject_public_key)?;
        let signature = sign(&order, signer)?;
        let digest = digest(&order)?;

        let bundle = TransactionBundle {
            order,
            encrypted_card,
            signature,
            certificate: signer_certificate.clone(),
            digest,
            created_at: self.clock.now(),
        };

        info!(
            transaction_id = %bundle.order.transaction_id,
            certificate_id = %bundle.certificate.certificate_id,
            recipient = %recipient_certificate.subject_client_id,
            digest = %bundle.digest,
            "transaction bundle built"
        );
        Ok(bundle)
    }
}
