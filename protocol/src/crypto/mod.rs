//! # Cryptographic Primitives for SET
//!
//! Everything security-related in the engine flows through here: key
//! generation, canonical serialization, signatures, card-field encryption and
//! integrity digests.
//!
//! - **RSA-2048** keys for every party (client, CA, bank).
//! - **RSASSA-PKCS1-v1_5 / SHA-256** signatures over canonical bytes.
//! - **RSA-OAEP / SHA-256** for the card number.
//! - **SHA-256** digests over canonical bytes.
//! - **RFC 8785** canonical JSON as the only input to hashing and signing.
//!
//! Everything here is a thin, typed wrapper around the `rsa` and `sha2`
//! crates. No padding scheme or bignum arithmetic is implemented locally.

pub mod canonical;
pub mod encryption;
pub mod hash;
pub mod keys;
pub mod signatures;

pub use canonical::{canonicalize, CanonicalError};
pub use encryption::{decrypt, encrypt, mask_pan, EncryptionError};
pub use hash::{digest, sha256, ContentDigest};
pub use keys::{generate_keypair, KeyError, SetKeypair, SetPublicKey, SetSignature};
pub use signatures::{sign, verify, verify_der, SignatureError};
