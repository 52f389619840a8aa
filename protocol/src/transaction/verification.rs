//! Bundle verification: the six acceptance checks the bank runs.
//!
//! Verification is total. Every check is evaluated even after an earlier one
//! fails, and the outcome is a [`VerificationReport`] of booleans rather than
//! an error, so a caller can see exactly which checks failed. The verifier
//! never decrypts the card field.
//!
//! | check                  | passes when                                             |
//! |------------------------|---------------------------------------------------------|
//! | `structure_ok`         | identifiers well-formed, certificate subject is the order's client, signature and card ciphertext present |
//! | `certificate_ok`       | the CA accepts the certificate at `at`                  |
//! | `signature_ok`         | the signature verifies over the order with the certificate key |
//! | `hash_integrity_ok`    | the recomputed order digest equals the stamped one      |
//! | `timestamp_ok`         | `at - freshness <= order.created_at <= at + skew`       |
//! | `card_field_format_ok` | ciphertext is exactly one recipient modulus long        |

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

use super::bundle::TransactionBundle;
use crate::authority::CertificateAuthority;
use crate::config::{to_time_delta, ProtocolConfig};
use crate::crypto::encryption::ciphertext_len_matches;
use crate::crypto::{digest, verify};

// ---------------------------------------------------------------------------
// VerificationReport
// ---------------------------------------------------------------------------

/// Outcome of verifying one bundle. Derived, recomputable, never stored as
/// a source of truth.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationReport {
    pub structure_ok: bool,
    pub certificate_ok: bool,
    pub signature_ok: bool,
    pub hash_integrity_ok: bool,
    pub timestamp_ok: bool,
    pub card_field_format_ok: bool,
}

impl VerificationReport {
    /// A bundle is accepted only when every check passed.
    pub fn accepted(&self) -> bool {
        self.failed_checks().is_empty()
    }

    /// Names of the checks that failed, in table order.
    pub fn failed_checks(&self) -> Vec<&'static str> {
        [
            ("structure", self.structure_ok),
            ("certificate", self.certificate_ok),
            ("signature", self.signature_ok),
            ("hash_integrity", self.hash_integrity_ok),
            ("timestamp", self.timestamp_ok),
            ("card_field_format", self.card_field_format_ok),
        ]
        .into_iter()
        .filter(|(_, ok)| !ok)
        .map(|(name, _)| name)
        .collect()
    }
}

// ---------------------------------------------------------------------------
// BundleVerifier
// ---------------------------------------------------------------------------

/// Runs the acceptance checks on behalf of one recipient.
pub struct BundleVerifier {
    ca: Arc<CertificateAuthority>,
    recipient_key_bits: usize,
    freshness_window: chrono::Duration,
    max_future_skew: chrono::Duration,
}

impl BundleVerifier {
    /// `recipient_key_bits` is the size of the key the card field must be
    /// encrypted to (the verifying bank's own key).
    pub fn new(
        ca: Arc<CertificateAuthority>,
        recipient_key_bits: usize,
        config: &ProtocolConfig,
    ) -> Self {
        Self {
            ca,
            recipient_key_bits,
            freshness_window: to_time_delta(config.freshness_window()),
            max_future_skew: to_time_delta(config.max_future_skew()),
        }
    }

    pub fn verify(&self, bundle: &TransactionBundle, at: DateTime<Utc>) -> VerificationReport {
        let order = &bundle.order;

        let structure_ok = order.structural_problem().is_none()
            && !bundle.certificate.certificate_id.is_empty()
            && bundle.certificate.subject_client_id == order.client_id
            && !bundle.signature.is_empty()
            && !bundle.encrypted_card.is_empty();

        let certificate_ok = self.ca.verify(&bundle.certificate, at);

        let signature_ok = verify(
            order,
            &bundle.signature,
            &bundle.certificate.subject_public_key,
        );

        let hash_integrity_ok = matches!(digest(order), Ok(d) if d == bundle.digest);

        // A window that leaves the representable date range admits nothing.
        let timestamp_ok = match (
            at.checked_sub_signed(self.freshness_window),
            at.checked_add_signed(self.max_future_skew),
        ) {
            (Some(oldest), Some(latest)) => {
                order.created_at >= oldest && order.created_at <= latest
            }
            _ => false,
        };

        let card_field_format_ok =
            ciphertext_len_matches(&bundle.encrypted_card, self.recipient_key_bits);

        let report = VerificationReport {
            structure_ok,
            certificate_ok,
            signature_ok,
            hash_integrity_ok,
            timestamp_ok,
            card_field_format_ok,
        };

        if report.accepted() {
            info!(transaction_id = %order.transaction_id, "bundle accepted");
        } else {
            warn!(
                transaction_id = %order.transaction_id,
                failed = ?report.failed_checks(),
                "bundle rejected"
            );
        }
        report
    }
}
