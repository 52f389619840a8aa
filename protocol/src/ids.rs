//! Identifier source for certificates, transactions, and settlement codes.
//!
//! Identifiers only need to be unique within a run, not unguessable. The
//! production source cuts short uppercase hex tokens from UUIDv4s
//! (`CERT-1A2B3C4D`, `AUTH-9F00E1`); tests use a counter so artifacts are
//! reproducible.

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::config::{
    AUTHORIZATION_CODE_PREFIX, CAPTURE_CODE_PREFIX, CERTIFICATE_ID_PREFIX, CLIENT_ID_PREFIX,
    TRANSACTION_ID_PREFIX,
};

/// Hex digits in certificate and transaction identifiers.
const LONG_TOKEN: usize = 8;
/// Hex digits in client identifiers and settlement codes.
const SHORT_TOKEN: usize = 6;

pub trait IdGenerator: Send + Sync {
    /// A fresh `PREFIX-XXXX` identifier with `hex_len` token characters.
    fn token(&self, prefix: &str, hex_len: usize) -> String;

    fn certificate_id(&self) -> String {
        self.token(CERTIFICATE_ID_PREFIX, LONG_TOKEN)
    }

    fn transaction_id(&self) -> String {
        self.token(TRANSACTION_ID_PREFIX, LONG_TOKEN)
    }

    fn authorization_code(&self) -> String {
        self.token(AUTHORIZATION_CODE_PREFIX, SHORT_TOKEN)
    }

    fn capture_code(&self) -> String {
        self.token(CAPTURE_CODE_PREFIX, SHORT_TOKEN)
    }

    fn client_id(&self) -> String {
        self.token(CLIENT_ID_PREFIX, SHORT_TOKEN)
    }
}

/// Random tokens cut from UUIDv4s.
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidIds;

impl IdGenerator for UuidIds {
    fn token(&self, prefix: &str, hex_len: usize) -> String {
        let simple = Uuid::new_v4().simple().to_string().to_uppercase();
        let len = hex_len.min(simple.len());
        format!("{}-{}", prefix, &simple[..len])
    }
}

/// Deterministic ids: `PREFIX-00000001`, `PREFIX-00000002`, ...
///
/// One counter is shared across all prefixes.
#[derive(Debug, Default)]
pub struct SequentialIds {
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGenerator for SequentialIds {
    fn token(&self, prefix: &str, hex_len: usize) -> String {
        let n = self.next.fetch_add(1, Ordering::Relaxed) + 1;
        format!("{}-{:0width$X}", prefix, n, width = hex_len)
    }
}
