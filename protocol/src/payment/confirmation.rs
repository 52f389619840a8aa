//! Signed closing confirmation.
//!
//! After capture the confirming party (the acquiring bank) emits a
//! [`Confirmation`] summarising the transaction and signs its canonical form.
//! The confirmation is self-contained: anyone holding the bank's public key
//! can check it without access to the rest of the session.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{AuthorizationResult, CaptureResult, CaptureStatus};
use crate::config::CONFIRMATION_MESSAGE;
use crate::crypto::{sign, verify, SetKeypair, SetPublicKey, SetSignature};
use crate::error::SetError;
use crate::transaction::{Amount, OrderRecord};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Confirmation {
    pub transaction_id: String,
    pub amount: Amount,
    pub merchant_id: String,
    pub authorization_code: String,
    pub capture_code: String,
    pub certificate_id: String,
    pub final_status: CaptureStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub transaction_date: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub confirmed_at: DateTime<Utc>,
    pub message: String,
    /// Signature over every other field.
    pub closing_signature: SetSignature,
}

#[derive(Serialize)]
struct ConfirmationPayload<'a> {
    transaction_id: &'a str,
    amount: &'a Amount,
    merchant_id: &'a str,
    authorization_code: &'a str,
    capture_code: &'a str,
    certificate_id: &'a str,
    final_status: CaptureStatus,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    transaction_date: DateTime<Utc>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    confirmed_at: DateTime<Utc>,
    message: &'a str,
}

impl Confirmation {
    /// Summarise a completed settlement and sign it with `signer`.
    ///
    /// Refuses unless the authorization was approved and the capture
    /// completed, both for this order.
    pub fn issue(
        order: &OrderRecord,
        authorization: &AuthorizationResult,
        capture: &CaptureResult,
        certificate_id: &str,
        confirmed_at: DateTime<Utc>,
        signer: &SetKeypair,
    ) -> Result<Self, SetError> {
        let authorization_code = authorization
            .authorization_code
            .as_ref()
            .filter(|_| authorization.authorized)
            .ok_or(SetError::MissingArtifact("approved authorization"))?;
        let capture_code = capture
            .capture_code
            .as_ref()
            .filter(|_| capture.captured)
            .ok_or(SetError::MissingArtifact("completed capture"))?;
        if let Some(field) = mismatch(order, authorization, capture) {
            return Err(SetError::AuthorizationMismatch {
                transaction_id: order.transaction_id.clone(),
                field,
            });
        }

        let mut confirmation = Self {
            transaction_id: order.transaction_id.clone(),
            amount: order.amount.clone(),
            merchant_id: order.merchant_id.clone(),
            authorization_code: authorization_code.clone(),
            capture_code: capture_code.clone(),
            certificate_id: certificate_id.to_string(),
            final_status: capture.status,
            transaction_date: order.created_at,
            confirmed_at,
            message: CONFIRMATION_MESSAGE.to_string(),
            closing_signature: SetSignature::from_bytes(Vec::new()),
        };
        confirmation.closing_signature = sign(&confirmation.payload(), signer)?;
        Ok(confirmation)
    }

    fn payload(&self) -> ConfirmationPayload<'_> {
        ConfirmationPayload {
            transaction_id: &self.transaction_id,
            amount: &self.amount,
            merchant_id: &self.merchant_id,
            authorization_code: &self.authorization_code,
            capture_code: &self.capture_code,
            certificate_id: &self.certificate_id,
            final_status: self.final_status,
            transaction_date: self.transaction_date,
            confirmed_at: self.confirmed_at,
            message: &self.message,
        }
    }

    /// Check the closing signature against the confirming party's key.
    pub fn verify(&self, confirmer: &SetPublicKey) -> bool {
        verify(&self.payload(), &self.closing_signature, confirmer)
    }
}

fn mismatch(
    order: &OrderRecord,
    authorization: &AuthorizationResult,
    capture: &CaptureResult,
) -> Option<&'static str> {
    if authorization.transaction_id != order.transaction_id {
        Some("transaction_id")
    } else if authorization.merchant_id != order.merchant_id {
        Some("merchant_id")
    } else if authorization.amount != order.amount {
        Some("amount")
    } else if capture.amount_captured.as_ref() != Some(&order.amount) {
        Some("amount_captured")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::{Clock, FixedClock};
    use crate::payment::{ApproveAll, PaymentProcessor};
    use crate::ids::SequentialIds;
    use crate::test_support::{bank_keypair, client_keypair, sample_order, START_MILLIS};
    use std::sync::Arc;

    fn settled() -> (OrderRecord, AuthorizationResult, CaptureResult) {
        let processor = PaymentProcessor::new(
            Box::new(ApproveAll),
            Arc::new(FixedClock::at_millis(START_MILLIS)),
            Arc::new(SequentialIds::new()),
        );
        let order = sample_order("TXN-1", 4999);
        let (auth, capture) = processor.settle(&order).unwrap();
        (order, auth, capture)
    }

    #[test]
    fn closing_signature_verifies() {
        let (order, auth, capture) = settled();
        let now = FixedClock::at_millis(START_MILLIS).now();
        let c = Confirmation::issue(&order, &auth, &capture, "CERT-1", now, bank_keypair())
            .unwrap();

        assert_eq!(c.final_status, CaptureStatus::Completed);
        assert_eq!(c.message, CONFIRMATION_MESSAGE);
        assert_eq!(c.transaction_date, order.created_at);
        assert!(c.verify(bank_keypair().public_key()));
        assert!(!c.verify(client_keypair().public_key()));
    }

    #[test]
    fn edited_confirmation_fails() {
        let (order, auth, capture) = settled();
        let now = FixedClock::at_millis(START_MILLIS).now();
        let mut c =
            Confirmation::issue(&order, &auth, &capture, "CERT-1", now, bank_keypair()).unwrap();
        c.amount.value += 1;
        assert!(!c.verify(bank_keypair().public_key()));
    }

    #[test]
    fn refuses_settlement_of_another_order() {
        let (order, auth, capture) = settled();
        let now = FixedClock::at_millis(START_MILLIS).now();

        let other = sample_order("TXN-2", 4999);
        assert!(matches!(
            Confirmation::issue(&other, &auth, &capture, "CERT-1", now, bank_keypair()),
            Err(SetError::AuthorizationMismatch { field: "transaction_id", .. })
        ));

        let mut short = capture.clone();
        short.amount_captured = Some(Amount::new(1, order.amount.currency.clone()));
        assert!(matches!(
            Confirmation::issue(&order, &auth, &short, "CERT-1", now, bank_keypair()),
            Err(SetError::AuthorizationMismatch { field: "amount_captured", .. })
        ));
    }

    #[test]
    fn refuses_without_completed_capture() {
        let (order, auth, _) = settled();
        let now = FixedClock::at_millis(START_MILLIS).now();
        let declined = CaptureResult::declined("authorization declined");
        assert!(matches!(
            Confirmation::issue(&order, &auth, &declined, "CERT-1", now, bank_keypair()),
            Err(SetError::MissingArtifact(_))
        ));
    }
}
