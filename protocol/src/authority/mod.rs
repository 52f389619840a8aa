//! # Certificate Authority
//!
//! The simulated SET root CA. It binds client identifiers to RSA public keys
//! and is the only party whose word the bank takes on who owns a key.
//!
//! ## Issuer proof
//!
//! Every certificate carries an `issuer_proof`: an RSASSA-PKCS1-v1_5/SHA-256
//! signature by the CA's own keypair over the canonical form of every other
//! certificate field. Anyone holding the CA public key can check it, and any
//! edit to the subject, key, validity window or issuer invalidates it.
//!
//! ## State
//!
//! ```text
//! certificates  DashMap<id, Certificate>   insert-if-absent, never removed
//! revoked       RwLock<HashSet<id>>        grows only
//! ```
//!
//! A certificate is valid at time `t` when its proof verifies, this CA
//! issued exactly that certificate, it is not revoked, and `t < expires_at`.
//!
//! ## Enrollment
//!
//! Clients enroll through a [`CertificateRequest`] signed with the key being
//! certified (proof of possession). [`CertificateAuthority::issue`] is the
//! lower-level entry point that skips the request.

pub mod ca;
pub mod certificate;
pub mod request;

pub use ca::CertificateAuthority;
pub use certificate::{Certificate, CertificateError};
pub use request::CertificateRequest;
