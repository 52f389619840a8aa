//! The acquiring bank.
//!
//! The bank is the recipient of every bundle. It holds the keypair the card
//! number is encrypted to, verifies incoming bundles, decrypts the card for
//! its own records (keeping only the masked form), and signs the closing
//! confirmation. It enrolls with the CA like any client.

use std::sync::Arc;
use tracing::info;

use super::confirmation::Confirmation;
use super::types::{AuthorizationResult, CaptureResult};
use crate::authority::{Certificate, CertificateAuthority, CertificateRequest};
use crate::clock::Clock;
use crate::config::ProtocolConfig;
use crate::crypto::{decrypt, mask_pan, SetKeypair, SetPublicKey};
use crate::error::SetError;
use crate::transaction::{BundleVerifier, OrderRecord, TransactionBundle, VerificationReport};

pub struct Acquirer {
    bank_id: String,
    keypair: SetKeypair,
    certificate: Certificate,
    verifier: BundleVerifier,
    clock: Arc<dyn Clock>,
}

impl Acquirer {
    /// Obtain a certificate for `keypair` from `ca` and set up verification
    /// against it.
    pub fn enroll(
        bank_id: &str,
        keypair: SetKeypair,
        ca: Arc<CertificateAuthority>,
        config: &ProtocolConfig,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, SetError> {
        let request = CertificateRequest::new(bank_id, &keypair, clock.now())?;
        let certificate = ca.issue_for_request(&request, config.certificate_validity())?;
        let verifier = BundleVerifier::new(ca, keypair.bits(), config);

        info!(bank_id, certificate_id = %certificate.certificate_id, "acquirer enrolled");
        Ok(Self {
            bank_id: bank_id.to_string(),
            keypair,
            certificate,
            verifier,
            clock,
        })
    }

    pub fn bank_id(&self) -> &str {
        &self.bank_id
    }

    /// The certificate clients encrypt card numbers to.
    pub fn certificate(&self) -> &Certificate {
        &self.certificate
    }

    /// Key that verifies confirmations from this bank.
    pub fn public_key(&self) -> &SetPublicKey {
        self.keypair.public_key()
    }

    /// Parse a bundle off the wire.
    pub fn receive(&self, wire: &str) -> Result<TransactionBundle, SetError> {
        TransactionBundle::from_json(wire)
    }

    /// Run the acceptance checks at the current time.
    pub fn verify(&self, bundle: &TransactionBundle) -> VerificationReport {
        self.verifier.verify(bundle, self.clock.now())
    }

    /// Decrypt the card field and return it masked. The full number never
    /// leaves this method.
    pub fn reveal_card(&self, bundle: &TransactionBundle) -> Result<String, SetError> {
        let pan = decrypt(&bundle.encrypted_card, &self.keypair).map_err(SetError::CardDecryption)?;
        let masked = mask_pan(&pan);
        info!(
            transaction_id = %bundle.order.transaction_id,
            card = %masked,
            "card field decrypted"
        );
        Ok(masked)
    }

    /// Sign the closing confirmation for a settled order.
    pub fn confirm(
        &self,
        order: &OrderRecord,
        authorization: &AuthorizationResult,
        capture: &CaptureResult,
        certificate_id: &str,
    ) -> Result<Confirmation, SetError> {
        let confirmation = Confirmation::issue(
            order,
            authorization,
            capture,
            certificate_id,
            self.clock.now(),
            &self.keypair,
        )?;
        info!(
            transaction_id = %confirmation.transaction_id,
            status = %confirmation.final_status,
            "transaction confirmed"
        );
        Ok(confirmation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::EncryptionError;
    use crate::test_support::{bank_keypair, TestParties};

    fn acquirer(parties: &TestParties) -> Acquirer {
        Acquirer::enroll(
            "BANK-TEST",
            bank_keypair().clone(),
            parties.ca.clone(),
            &ProtocolConfig::default(),
            parties.clock.clone(),
        )
        .unwrap()
    }

    #[test]
    fn enrollment_yields_valid_certificate() {
        let parties = TestParties::new();
        let bank = acquirer(&parties);
        assert_eq!(bank.certificate().subject_client_id, "BANK-TEST");
        assert!(parties.ca.verify(bank.certificate(), parties.clock.now()));
        assert_eq!(bank.public_key(), bank_keypair().public_key());
    }

    #[test]
    fn receives_and_verifies_wire_bundle() {
        let parties = TestParties::new();
        let bank = acquirer(&parties);
        let bundle = parties.bundle("TXN-1", 4999);

        let received = bank.receive(&bundle.to_json().unwrap()).unwrap();
        assert_eq!(received, bundle);
        assert!(bank.verify(&received).accepted());
    }

    #[test]
    fn reveals_only_masked_card() {
        let parties = TestParties::new();
        let bank = acquirer(&parties);
        let bundle = parties.bundle("TXN-1", 4999);
        assert_eq!(bank.reveal_card(&bundle).unwrap(), "411111******1111");
    }

    #[test]
    fn corrupted_card_field_is_decryption_error() {
        let parties = TestParties::new();
        let bank = acquirer(&parties);
        let mut bundle = parties.bundle("TXN-1", 4999);
        bundle.encrypted_card[0] ^= 0xff;
        assert!(matches!(
            bank.reveal_card(&bundle),
            Err(SetError::CardDecryption(EncryptionError::Decryption))
        ));
    }
}
