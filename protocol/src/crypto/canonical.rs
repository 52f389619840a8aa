//! # Canonical Serialization
//!
//! Every signature and every digest in SET is computed over the canonical
//! byte form of a record, never over whatever `serde_json` happens to emit.
//! Signer and verifier may build the same record from different sources (a
//! struct on one side, a parsed JSON bundle on the other) and still have to
//! agree on every byte.
//!
//! The canonical form is RFC 8785 (JSON Canonicalization Scheme):
//!
//! - object keys sorted lexicographically, at every nesting level
//! - no insignificant whitespace
//! - numbers in their shortest ES6 representation
//!
//! Protocol records keep numbers boring on top of that: money is an integer
//! count of minor units, timestamps are integer milliseconds, and binary
//! fields are hex strings. No float ever reaches this function from the
//! engine itself.

use serde::Serialize;
use thiserror::Error;

/// Failure to bring a record into canonical form.
///
/// Only reachable when a `Serialize` impl errors or a caller hands in a
/// non-finite float.
#[derive(Debug, Error)]
#[error("canonical serialization failed: {0}")]
pub struct CanonicalError(#[from] serde_json::Error);

/// Canonical RFC 8785 bytes for any serializable record.
pub fn canonicalize<T: Serialize>(record: &T) -> Result<Vec<u8>, CanonicalError> {
    Ok(serde_json_canonicalizer::to_vec(record)?)
}

/// Canonical form as a `String`, for logs and debugging output.
pub fn canonicalize_to_string<T: Serialize>(
    record: &T,
) -> Result<String, CanonicalError> {
    Ok(serde_json_canonicalizer::to_string(record)?)
}
