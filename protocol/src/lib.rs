// Copyright (c) 2026 SET Protocol Contributors. MIT License.
// See LICENSE for details.

//! # SET Protocol — Core Library
//!
//! An in-process engine for the Secure Electronic Transaction payment flow:
//! a client obtains a signing certificate, bundles an order with its
//! encrypted card number and a signature, the bank verifies the bundle, and
//! a two-phase authorization/capture settles the payment, closed by a signed
//! confirmation.
//!
//! ## Architecture
//!
//! - **crypto** — RSA keys, canonical JSON, signatures, OAEP card encryption, digests.
//! - **authority** — the certificate authority and the certificates it issues.
//! - **transaction** — orders, bundle construction, bundle verification.
//! - **payment** — authorization, capture, the acquiring bank, confirmations.
//! - **session** — the protocol state machine and per-transaction context.
//! - **clock** / **ids** — injected time and identifier sources.
//! - **config** — protocol constants and runtime parameters.
//!
//! ## Ground rules
//!
//! 1. Everything signed or hashed goes through the canonical form first.
//! 2. Money is integer minor units. No floats anywhere near a signature.
//! 3. Verification reports failures; it does not raise them.
//! 4. Card numbers are logged masked, keys never.

pub mod authority;
pub mod clock;
pub mod config;
pub mod crypto;
pub mod error;
pub mod ids;
pub mod payment;
pub mod session;
pub mod transaction;

pub use error::SetError;

#[cfg(test)]
pub(crate) mod test_support;
