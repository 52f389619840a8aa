//! # Integrity Hashing
//!
//! SHA-256 over canonical record bytes. The digest stamped on a bundle when
//! it is built is recomputed by the bank on arrival; any difference in any
//! byte means the order was altered in transit.
//!
//! Comparison is exact byte equality. Digests are public values, so there is
//! no need for constant-time comparison here.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

use super::canonical::{canonicalize, CanonicalError};
use crate::config::HASH_OUTPUT_LENGTH;

/// Compute the SHA-256 hash of `data`.
pub fn sha256(data: &[u8]) -> [u8; HASH_OUTPUT_LENGTH] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Digest of a record's canonical form.
pub fn digest<T: Serialize>(record: &T) -> Result<ContentDigest, CanonicalError> {
    let bytes = canonicalize(record)?;
    Ok(ContentDigest(sha256(&bytes)))
}

/// A 32-byte SHA-256 content digest. Hex on the wire.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentDigest(#[serde(with = "hex::serde")] pub [u8; HASH_OUTPUT_LENGTH]);

impl ContentDigest {
    pub fn as_bytes(&self) -> &[u8; HASH_OUTPUT_LENGTH] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Debug for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ContentDigest({})", self.to_hex())
    }
}

impl fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}
