//! # Card Field Encryption
//!
//! RSA-OAEP (SHA-256, MGF1-SHA-256) encryption of the one field in a SET
//! transaction that must stay secret from the merchant: the card number.
//!
//! The client encrypts the PAN to the bank's certificate key. The bank is the
//! only party that ever decrypts it; the bundle verifier only checks that the
//! ciphertext has the shape a ciphertext for that key must have.
//!
//! ## Payload limit
//!
//! OAEP with SHA-256 leaves `k - 2·32 - 2` bytes of room in a `k`-byte modulus
//! (190 bytes for RSA-2048). A PAN is at most 19 digits, so the limit only
//! bites when the function is misused for something else.

use rand::rngs::OsRng;
use rsa::Oaep;
use sha2::Sha256;
use thiserror::Error;

use super::keys::{SetKeypair, SetPublicKey};
use crate::config::{MAX_PAN_DIGITS, MIN_PAN_DIGITS, OAEP_SHA256_OVERHEAD};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EncryptionError {
    #[error("plaintext of {len} bytes exceeds the {max}-byte OAEP payload limit")]
    PlaintextTooLarge { len: usize, max: usize },

    #[error("card number must be {}-{} digits", MIN_PAN_DIGITS, MAX_PAN_DIGITS)]
    InvalidCardNumber,

    #[error("RSA-OAEP encryption failed: {0}")]
    Encryption(String),

    /// Wrong key, corrupted ciphertext, or plaintext that is not UTF-8.
    /// Deliberately not more specific than that.
    #[error("decryption failed -- wrong key or corrupted ciphertext")]
    Decryption,
}

/// Largest plaintext `public_key` can carry under OAEP-SHA-256.
pub fn max_plaintext_len(public_key: &SetPublicKey) -> usize {
    public_key
        .modulus_len()
        .saturating_sub(OAEP_SHA256_OVERHEAD)
}

/// Encrypt a short sensitive field to the recipient's public key.
///
/// OAEP is randomized: two encryptions of the same field differ.
pub fn encrypt(plaintext: &str, recipient: &SetPublicKey) -> Result<Vec<u8>, EncryptionError> {
    let max = max_plaintext_len(recipient);
    if plaintext.len() > max {
        return Err(EncryptionError::PlaintextTooLarge {
            len: plaintext.len(),
            max,
        });
    }
    recipient
        .rsa()
        .encrypt(&mut OsRng, Oaep::new::<Sha256>(), plaintext.as_bytes())
        .map_err(|e| EncryptionError::Encryption(e.to_string()))
}

/// Recover the field with the recipient's private key.
pub fn decrypt(ciphertext: &[u8], recipient: &SetKeypair) -> Result<String, EncryptionError> {
    let plaintext = recipient
        .private_key()
        .decrypt(Oaep::new::<Sha256>(), ciphertext)
        .map_err(|_| EncryptionError::Decryption)?;
    String::from_utf8(plaintext).map_err(|_| EncryptionError::Decryption)
}

/// Format-only check: an RSA ciphertext is exactly one modulus long.
pub fn ciphertext_len_matches(ciphertext: &[u8], key_bits: usize) -> bool {
    !ciphertext.is_empty() && ciphertext.len() == key_bits.div_ceil(8)
}

/// Check that `pan` looks like a card number: ASCII digits, 12 to 19 of them.
pub fn validate_pan(pan: &str) -> Result<(), EncryptionError> {
    let len_ok = (MIN_PAN_DIGITS..=MAX_PAN_DIGITS).contains(&pan.len());
    if len_ok && pan.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(EncryptionError::InvalidCardNumber)
    }
}

/// Mask a PAN for logs: first six and last four digits stay visible.
///
/// `4111111111111111` becomes `411111******1111`. Anything too short to
/// keep both ends visible is masked down to its last four characters.
pub fn mask_pan(pan: &str) -> String {
    let chars: Vec<char> = pan.chars().collect();
    let n = chars.len();
    if n <= 10 {
        let keep = n.min(4);
        return "*".repeat(n - keep) + &chars[n - keep..].iter().collect::<String>();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[n - 4..].iter().collect();
    format!("{}{}{}", head, "*".repeat(n - 10), tail)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{bank_keypair, client_keypair};

    const PAN: &str = "4111111111111111";

    #[test]
    fn roundtrip_with_recipient_key() {
        let bank = bank_keypair();
        let ct = encrypt(PAN, bank.public_key()).unwrap();
        assert_eq!(decrypt(&ct, bank).unwrap(), PAN);
    }

    #[test]
    fn roundtrip_for_all_pan_lengths() {
        let bank = bank_keypair();
        for len in MIN_PAN_DIGITS..=MAX_PAN_DIGITS {
            let pan: String = "4".repeat(len);
            let ct = encrypt(&pan, bank.public_key()).unwrap();
            assert_eq!(decrypt(&ct, bank).unwrap(), pan);
        }
    }

    #[test]
    fn encryption_is_randomized() {
        let pk = bank_keypair().public_key();
        assert_ne!(encrypt(PAN, pk).unwrap(), encrypt(PAN, pk).unwrap());
    }

    #[test]
    fn ciphertext_is_one_modulus_long() {
        let pk = bank_keypair().public_key();
        let ct = encrypt(PAN, pk).unwrap();
        assert_eq!(ct.len(), 256);
        assert!(ciphertext_len_matches(&ct, pk.bits()));
        assert!(!ciphertext_len_matches(&ct[..200], pk.bits()));
        assert!(!ciphertext_len_matches(&[], pk.bits()));
    }

    #[test]
    fn wrong_key_cannot_decrypt() {
        let ct = encrypt(PAN, bank_keypair().public_key()).unwrap();
        assert_eq!(
            decrypt(&ct, client_keypair()),
            Err(EncryptionError::Decryption)
        );
    }

    #[test]
    fn corrupted_ciphertext_cannot_decrypt() {
        let bank = bank_keypair();
        let mut ct = encrypt(PAN, bank.public_key()).unwrap();
        ct[17] ^= 0x01;
        assert_eq!(decrypt(&ct, bank), Err(EncryptionError::Decryption));
    }

    #[test]
    fn oversized_plaintext_rejected() {
        let pk = bank_keypair().public_key();
        let big = "9".repeat(191);
        assert_eq!(
            encrypt(&big, pk),
            Err(EncryptionError::PlaintextTooLarge { len: 191, max: 190 })
        );
        assert!(encrypt(&"9".repeat(190), pk).is_ok());
    }

    #[test]
    fn pan_validation() {
        assert!(validate_pan(PAN).is_ok());
        assert!(validate_pan("411111111111").is_ok());
        assert!(validate_pan("41111111111").is_err());
        assert!(validate_pan("41111111111111111111").is_err());
        assert!(validate_pan("4111-1111-1111-1111").is_err());
        assert!(validate_pan("").is_err());
    }

    #[test]
    fn pan_masking() {
        assert_eq!(mask_pan(PAN), "411111******1111");
        assert_eq!(mask_pan("1234567890123"), "123456***0123");
        assert_eq!(mask_pan("12345"), "*2345");
        assert_eq!(mask_pan("123"), "123");
    }
}
