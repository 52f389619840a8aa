//! Client certificates and their issuer proof.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::{SetPublicKey, SetSignature};

/// Why a certificate is not valid. Collapsed to `certificate_ok = false` by
/// the bundle verifier; surfaced as-is by [`super::CertificateAuthority::check`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CertificateError {
    #[error("certificate {certificate_id} expired at {expires_at}")]
    Expired {
        certificate_id: String,
        expires_at: DateTime<Utc>,
    },

    #[error("certificate {0} has been revoked")]
    Revoked(String),

    #[error("issuer proof on certificate {0} does not verify")]
    InvalidProof(String),

    #[error("certificate {0} was not issued by this authority")]
    Unknown(String),
}

/// Binds a client identifier to a public key, signed by the CA.
///
/// Certificates are immutable. Revocation is recorded by the authority,
/// never on the certificate itself.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Certificate {
    pub certificate_id: String,
    pub subject_client_id: String,
    pub subject_public_key: SetPublicKey,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    pub issuer_name: String,
    pub algorithm_tag: String,
    pub purpose: String,
    /// CA signature over [`Certificate::proof_payload`].
    pub issuer_proof: SetSignature,
}

/// Everything on a certificate except the proof itself.
#[derive(Serialize)]
pub(crate) struct CertificatePayload<'a> {
    pub certificate_id: &'a str,
    pub subject_client_id: &'a str,
    pub subject_public_key: &'a SetPublicKey,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub issued_at: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub expires_at: DateTime<Utc>,
    pub issuer_name: &'a str,
    pub algorithm_tag: &'a str,
    pub purpose: &'a str,
}

impl Certificate {
    /// The record the issuer proof signs.
    pub(crate) fn proof_payload(&self) -> CertificatePayload<'_> {
        CertificatePayload {
            certificate_id: &self.certificate_id,
            subject_client_id: &self.subject_client_id,
            subject_public_key: &self.subject_public_key,
            issued_at: self.issued_at,
            expires_at: self.expires_at,
            issuer_name: &self.issuer_name,
            algorithm_tag: &self.algorithm_tag,
            purpose: &self.purpose,
        }
    }

    /// `true` while `at` is strictly before `expires_at`.
    pub fn is_within_validity(&self, at: DateTime<Utc>) -> bool {
        at < self.expires_at
    }
}
