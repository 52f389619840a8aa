//! The certificate authority: issuance, validation, revocation.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::RwLock;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use super::certificate::{Certificate, CertificateError};
use super::request::CertificateRequest;
use crate::clock::Clock;
use crate::config::{
    algorithm_tag, to_time_delta, ProtocolConfig, CERTIFICATE_PURPOSE, CERTIFICATE_REQUEST_TYPE,
    MAX_IDENTIFIER_LENGTH, PROTOCOL_VERSION,
};
use crate::crypto::{sign, verify, SetKeypair, SetPublicKey, SetSignature};
use crate::error::SetError;
use crate::ids::IdGenerator;

/// Attempts at drawing an unused certificate id before giving up.
const MAX_ID_ATTEMPTS: usize = 8;

/// In-process certificate authority.
///
/// Owns its signing keypair, a registry of every certificate it has issued,
/// and the set of revoked certificate ids. Both collections only grow.
/// Shared across sessions behind an `Arc`; all methods take `&self`.
pub struct CertificateAuthority {
    name: String,
    keypair: SetKeypair,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    certificates: DashMap<String, Certificate>,
    revoked: RwLock<HashSet<String>>,
}

impl CertificateAuthority {
    /// Create a CA with a freshly generated keypair.
    pub fn new(
        config: &ProtocolConfig,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Result<Self, SetError> {
        config.validate()?;
        let keypair = SetKeypair::generate(config.key_bits)?;
        Ok(Self::with_keypair(&config.ca_name, keypair, clock, ids))
    }

    /// Create a CA around an existing keypair.
    pub fn with_keypair(
        name: &str,
        keypair: SetKeypair,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        info!(ca = name, key = %keypair.public_key().fingerprint(), "certificate authority ready");
        Self {
            name: name.to_string(),
            keypair,
            clock,
            ids,
            certificates: DashMap::new(),
            revoked: RwLock::new(HashSet::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Key that verifies every issuer proof from this CA.
    pub fn public_key(&self) -> &SetPublicKey {
        self.keypair.public_key()
    }

    // -----------------------------------------------------------------------
    // Issuance
    // -----------------------------------------------------------------------

    /// Issue a certificate binding `client_id` to `public_key`.
    ///
    /// The certificate id is fresh: insertion into the registry is
    /// insert-if-absent, and a collision draws a new id.
    pub fn issue(
        &self,
        client_id: &str,
        public_key: &SetPublicKey,
        validity: Duration,
    ) -> Result<Certificate, SetError> {
        if client_id.is_empty() || client_id.len() > MAX_IDENTIFIER_LENGTH {
            return Err(SetError::CertificateRequestRejected(format!(
                "client id must be 1-{MAX_IDENTIFIER_LENGTH} bytes"
            )));
        }

        let issued_at = self.clock.now();
        let expires_at = issued_at
            .checked_add_signed(to_time_delta(validity))
            .ok_or_else(|| {
                SetError::CertificateRequestRejected(format!(
                    "validity of {}s runs past the representable date range",
                    validity.as_secs()
                ))
            })?;

        for _ in 0..MAX_ID_ATTEMPTS {
            let mut certificate = Certificate {
                certificate_id: self.ids.certificate_id(),
                subject_client_id: client_id.to_string(),
                subject_public_key: public_key.clone(),
                issued_at,
                expires_at,
                issuer_name: self.name.clone(),
                algorithm_tag: algorithm_tag(public_key.bits()),
                purpose: CERTIFICATE_PURPOSE.to_string(),
                issuer_proof: SetSignature::from_bytes(Vec::new()),
            };
            certificate.issuer_proof = sign(&certificate.proof_payload(), &self.keypair)?;

            match self.certificates.entry(certificate.certificate_id.clone()) {
                Entry::Occupied(_) => {
                    debug!(certificate_id = %certificate.certificate_id, "certificate id collision, redrawing");
                }
                Entry::Vacant(slot) => {
                    slot.insert(certificate.clone());
                    info!(
                        certificate_id = %certificate.certificate_id,
                        client_id,
                        expires_at = %certificate.expires_at,
                        "certificate issued"
                    );
                    return Ok(certificate);
                }
            }
        }

        Err(SetError::CertificateRequestRejected(
            "could not allocate a fresh certificate id".to_string(),
        ))
    }

    /// Issue against a signed request, after checking proof of possession.
    pub fn issue_for_request(
        &self,
        request: &CertificateRequest,
        validity: Duration,
    ) -> Result<Certificate, SetError> {
        let rejection = if request.request_type != CERTIFICATE_REQUEST_TYPE {
            Some(format!("unsupported request type {}", request.request_type))
        } else if request.version != PROTOCOL_VERSION {
            Some(format!("unsupported protocol version {}", request.version))
        } else if !request.verify_signature() {
            Some("request signature does not verify".to_string())
        } else {
            None
        };

        if let Some(reason) = rejection {
            warn!(client_id = %request.client_id, %reason, "certificate request rejected");
            return Err(SetError::CertificateRequestRejected(reason));
        }
        self.issue(&request.client_id, &request.public_key, validity)
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    /// Full validity check with the reason for failure.
    ///
    /// Checks, in order: the issuer proof, that this CA issued exactly this
    /// certificate, revocation, and expiry (`at < expires_at`).
    pub fn check(&self, certificate: &Certificate, at: DateTime<Utc>) -> Result<(), CertificateError> {
        let id = &certificate.certificate_id;

        if certificate.issuer_name != self.name
            || !verify(
                &certificate.proof_payload(),
                &certificate.issuer_proof,
                self.keypair.public_key(),
            )
        {
            return Err(CertificateError::InvalidProof(id.clone()));
        }

        match self.certificates.get(id) {
            Some(registered) if *registered == *certificate => {}
            _ => return Err(CertificateError::Unknown(id.clone())),
        }

        if self.is_revoked(id) {
            return Err(CertificateError::Revoked(id.clone()));
        }

        if !certificate.is_within_validity(at) {
            return Err(CertificateError::Expired {
                certificate_id: id.clone(),
                expires_at: certificate.expires_at,
            });
        }

        Ok(())
    }

    /// `true` when [`Self::check`] passes.
    pub fn verify(&self, certificate: &Certificate, at: DateTime<Utc>) -> bool {
        match self.check(certificate, at) {
            Ok(()) => true,
            Err(e) => {
                debug!(error = %e, "certificate check failed");
                false
            }
        }
    }

    // -----------------------------------------------------------------------
    // Revocation
    // -----------------------------------------------------------------------

    /// Permanently revoke a certificate. Idempotent.
    ///
    /// Returns `Ok(true)` on first revocation and `Ok(false)` if it was
    /// already revoked.
    pub fn revoke(&self, certificate_id: &str) -> Result<bool, CertificateError> {
        if !self.certificates.contains_key(certificate_id) {
            return Err(CertificateError::Unknown(certificate_id.to_string()));
        }
        let newly = self.revoked.write().insert(certificate_id.to_string());
        if newly {
            info!(certificate_id, "certificate revoked");
        }
        Ok(newly)
    }

    pub fn is_revoked(&self, certificate_id: &str) -> bool {
        self.revoked.read().contains(certificate_id)
    }

    /// A copy of an issued certificate, revoked or not.
    pub fn get(&self, certificate_id: &str) -> Option<Certificate> {
        self.certificates.get(certificate_id).map(|c| c.clone())
    }

    pub fn issued_count(&self) -> usize {
        self.certificates.len()
    }
}
