//! # Key Service
//!
//! RSA keypair generation and public-key encoding for every SET party: the
//! client, the certificate authority, and the bank.
//!
//! Private keys never leave a [`SetKeypair`] except as signatures or
//! decrypted plaintext. `SetKeypair` has no `Serialize` impl and its `Debug`
//! output shows only the public fingerprint. Public keys travel as hex-encoded
//! SubjectPublicKeyInfo DER.

use rand::rngs::OsRng;
use rsa::pkcs8::{DecodePublicKey, EncodePublicKey};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

use super::hash::sha256;
use crate::config::{DEFAULT_KEY_BITS, MAX_KEY_BITS, MIN_KEY_BITS};

/// Errors from key generation and key decoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KeyError {
    /// The requested strength is outside the supported range, or the
    /// backend failed to produce a key.
    #[error("cannot generate {bits}-bit key: {reason}")]
    Generation { bits: usize, reason: String },

    /// Supplied key material is structurally invalid.
    #[error("malformed key material: {0}")]
    Format(String),
}

/// Generate a fresh RSA keypair of the given strength.
///
/// Anything below [`MIN_KEY_BITS`] is refused outright.
pub fn generate_keypair(bits: usize) -> Result<SetKeypair, KeyError> {
    SetKeypair::generate(bits)
}

// ---------------------------------------------------------------------------
// SetKeypair
// ---------------------------------------------------------------------------

/// An RSA keypair owned by exactly one protocol party.
pub struct SetKeypair {
    private_key: RsaPrivateKey,
    public_key: SetPublicKey,
}

impl SetKeypair {
    /// Generate a keypair with the OS RNG.
    pub fn generate(bits: usize) -> Result<Self, KeyError> {
        if bits < MIN_KEY_BITS {
            return Err(KeyError::Generation {
                bits,
                reason: format!("below the {MIN_KEY_BITS}-bit safety floor"),
            });
        }
        if bits > MAX_KEY_BITS {
            return Err(KeyError::Generation {
                bits,
                reason: format!("above the {MAX_KEY_BITS}-bit maximum"),
            });
        }

        let private_key = RsaPrivateKey::new(&mut OsRng, bits).map_err(|e| {
            KeyError::Generation {
                bits,
                reason: e.to_string(),
            }
        })?;
        let public_key = SetPublicKey::from_rsa(private_key.to_public_key())?;

        tracing::debug!(bits, fingerprint = %public_key.fingerprint(), "keypair generated");
        Ok(Self {
            private_key,
            public_key,
        })
    }

    /// Generate a keypair at [`DEFAULT_KEY_BITS`].
    pub fn generate_default() -> Result<Self, KeyError> {
        Self::generate(DEFAULT_KEY_BITS)
    }

    pub fn public_key(&self) -> &SetPublicKey {
        &self.public_key
    }

    /// Modulus size in bits.
    pub fn bits(&self) -> usize {
        self.public_key.bits()
    }

    pub(crate) fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }
}

impl Clone for SetKeypair {
    fn clone(&self) -> Self {
        Self {
            private_key: self.private_key.clone(),
            public_key: self.public_key.clone(),
        }
    }
}

impl fmt::Debug for SetKeypair {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SetKeypair(pub={})", self.public_key.fingerprint())
    }
}

// ---------------------------------------------------------------------------
// SetPublicKey
// ---------------------------------------------------------------------------

/// The shareable half of a keypair.
///
/// Holds the decoded key alongside its DER encoding so equality, hashing and
/// serialization all work on the same canonical bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct SetPublicKey {
    key: RsaPublicKey,
    der: Vec<u8>,
}

impl SetPublicKey {
    fn from_rsa(key: RsaPublicKey) -> Result<Self, KeyError> {
        let der = key
            .to_public_key_der()
            .map_err(|e| KeyError::Format(e.to_string()))?
            .as_bytes()
            .to_vec();
        Ok(Self { key, der })
    }

    /// Decode a SubjectPublicKeyInfo DER blob.
    pub fn from_der(der: &[u8]) -> Result<Self, KeyError> {
        let key =
            RsaPublicKey::from_public_key_der(der).map_err(|e| KeyError::Format(e.to_string()))?;
        let bits = key.size() * 8;
        if bits < MIN_KEY_BITS {
            return Err(KeyError::Format(format!(
                "{bits}-bit modulus is below the {MIN_KEY_BITS}-bit floor"
            )));
        }
        Ok(Self {
            key,
            der: der.to_vec(),
        })
    }

    /// Decode a hex-encoded DER blob.
    pub fn from_hex(hex_str: &str) -> Result<Self, KeyError> {
        let der = hex::decode(hex_str).map_err(|e| KeyError::Format(e.to_string()))?;
        Self::from_der(&der)
    }

    pub fn as_der(&self) -> &[u8] {
        &self.der
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.der)
    }

    /// Modulus size in bytes; also the exact length of every ciphertext and
    /// signature this key produces or checks.
    pub fn modulus_len(&self) -> usize {
        self.key.size()
    }

    pub fn bits(&self) -> usize {
        self.modulus_len() * 8
    }

    /// Short identifier for logs: first 8 bytes of SHA-256 over the DER.
    pub fn fingerprint(&self) -> String {
        hex::encode(&sha256(&self.der)[..8])
    }

    pub(crate) fn rsa(&self) -> &RsaPublicKey {
        &self.key
    }
}

impl fmt::Debug for SetPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SetPublicKey({}, {} bits)", self.fingerprint(), self.bits())
    }
}

impl Serialize for SetPublicKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for SetPublicKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        Self::from_hex(&encoded).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// SetSignature
// ---------------------------------------------------------------------------

/// A detached RSASSA-PKCS1-v1_5 signature. Hex on the wire.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SetSignature {
    #[serde(with = "hex::serde")]
    bytes: Vec<u8>,
}

impl SetSignature {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn to_hex(&self) -> String {
        hex::encode(&self.bytes)
    }
}

impl fmt::Debug for SetSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let hex = self.to_hex();
        let preview = &hex[..hex.len().min(16)];
        write!(f, "SetSignature({}.., {} bytes)", preview, self.bytes.len())
    }
}
