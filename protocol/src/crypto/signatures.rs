//! # Digital Signatures
//!
//! RSASSA-PKCS1-v1_5 with SHA-256 over canonical record bytes. This is what
//! binds an order to the client that placed it, a certificate to the CA that
//! issued it, and a confirmation to the bank that settled it.
//!
//! ## Sign and verify are asymmetric on purpose
//!
//! [`sign`] returns a `Result` because there are real ways for it to fail: a
//! record that cannot be canonicalized, or a key the backend rejects. [`verify`]
//! returns a plain `bool`. A forged, truncated or mismatched signature is an
//! expected input for a verifier, not an exceptional one, and the bundle
//! verifier needs a total function to fill in its report.
//!
//! The one case where verification can legitimately error is when the key
//! itself arrives as raw bytes and does not parse: [`verify_der`] surfaces that
//! as a [`KeyError::Format`].

use rsa::Pkcs1v15Sign;
use serde::Serialize;
use sha2::Sha256;
use thiserror::Error;

use super::canonical::{canonicalize, CanonicalError};
use super::hash::sha256;
use super::keys::{KeyError, SetKeypair, SetPublicKey, SetSignature};

/// Errors raised while producing a signature.
#[derive(Debug, Error)]
pub enum SignatureError {
    #[error(transparent)]
    Canonical(#[from] CanonicalError),

    #[error("RSA signing failed: {0}")]
    Backend(String),

    /// The signing key is not the key the signer's certificate names.
    #[error("signing key does not match certificate {certificate_id}")]
    KeyMismatch { certificate_id: String },
}

/// Sign the canonical form of `record`.
///
/// The SHA-256 of the canonical bytes is signed with PKCS#1 v1.5 padding,
/// which is deterministic: the same record and key always give the same
/// signature.
pub fn sign<T: Serialize>(
    record: &T,
    keypair: &SetKeypair,
) -> Result<SetSignature, SignatureError> {
    let hashed = sha256(&canonicalize(record)?);
    let bytes = keypair
        .private_key()
        .sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)
        .map_err(|e| SignatureError::Backend(e.to_string()))?;
    Ok(SetSignature::from_bytes(bytes))
}

/// Check `signature` over the canonical form of `record`.
///
/// Returns `false` for a wrong key, a tampered record, malformed signature
/// bytes, or a record that cannot be canonicalized. Never panics.
pub fn verify<T: Serialize>(
    record: &T,
    signature: &SetSignature,
    public_key: &SetPublicKey,
) -> bool {
    let Ok(bytes) = canonicalize(record) else {
        return false;
    };
    let hashed = sha256(&bytes);
    public_key
        .rsa()
        .verify(Pkcs1v15Sign::new::<Sha256>(), &hashed, signature.as_bytes())
        .is_ok()
}

/// Verify against a public key supplied as SubjectPublicKeyInfo DER.
///
/// Fails only when the key bytes are not a usable RSA public key; a bad
/// signature is still `Ok(false)`.
pub fn verify_der<T: Serialize>(
    record: &T,
    signature: &SetSignature,
    public_key_der: &[u8],
) -> Result<bool, KeyError> {
    let public_key = SetPublicKey::from_der(public_key_der)?;
    Ok(verify(record, signature, &public_key))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bank_keypair, client_keypair};
    use serde_json::json;

    fn order() -> serde_json::Value {
        json!({
            "transaction_id": "TXN-1",
            "amount": { "value": 4999, "currency": "EUR" },
            "merchant_id": "ShopX",
            "client_id": "C1",
        })
    }

    #[test]
    fn sign_then_verify() {
        let kp = client_keypair();
        let sig = sign(&order(), kp).unwrap();
        assert_eq!(sig.len(), kp.public_key().modulus_len());
        assert!(verify(&order(), &sig, kp.public_key()));
    }

    #[test]
    fn signing_is_deterministic() {
        let kp = client_keypair();
        assert_eq!(sign(&order(), kp).unwrap(), sign(&order(), kp).unwrap());
    }

    #[test]
    fn wrong_key_fails() {
        let sig = sign(&order(), client_keypair()).unwrap();
        assert!(!verify(&order(), &sig, bank_keypair().public_key()));
    }

    #[test]
    fn every_field_flip_fails() {
        let kp = client_keypair();
        let sig = sign(&order(), kp).unwrap();

        let mut amount = order();
        amount["amount"]["value"] = json!(999999);
        let mut merchant = order();
        merchant["merchant_id"] = json!("ShopY");
        let mut client = order();
        client["client_id"] = json!("C2");
        let mut txn = order();
        txn["transaction_id"] = json!("TXN-2");

        for tampered in [amount, merchant, client, txn] {
            assert!(!verify(&tampered, &sig, kp.public_key()));
        }
    }

    #[test]
    fn malformed_signature_is_false_not_error() {
        let kp = client_keypair();
        assert!(!verify(&order(), &SetSignature::from_bytes(vec![]), kp.public_key()));
        assert!(!verify(
            &order(),
            &SetSignature::from_bytes(vec![0xff; 7]),
            kp.public_key()
        ));
    }

    #[test]
    fn verify_der_accepts_valid_key_material() {
        let kp = client_keypair();
        let sig = sign(&order(), kp).unwrap();
        assert_eq!(verify_der(&order(), &sig, kp.public_key().as_der()), Ok(true));
        assert_eq!(
            verify_der(&json!({ "other": 1 }), &sig, kp.public_key().as_der()),
            Ok(false)
        );
    }

    #[test]
    fn verify_der_rejects_garbage_key() {
        let sig = sign(&order(), client_keypair()).unwrap();
        assert!(matches!(
            verify_der(&order(), &sig, b"definitely not DER"),
            Err(KeyError::Format(_))
        ));
    }
}
