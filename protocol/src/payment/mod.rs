//! # Payment Settlement
//!
//! The bank side of SET: two-phase settlement of a verified order and the
//! signed confirmation that closes the transaction.
//!
//! ```text
//! types.rs        — AuthorizationResult, CaptureResult, CaptureStatus
//! processor.rs    — PaymentProcessor, AuthorizationPolicy, replay ledger
//! acquirer.rs     — the bank party: keys, certificate, verification, card reveal
//! confirmation.rs — Confirmation with its closing signature
//! risk.rs         — post-capture risk review with an injected RNG
//! ```
//!
//! ## Two-phase invariant
//!
//! Capture is only ever attempted after an approved authorization. On a
//! decline the FAILED [`CaptureResult`] is built directly and
//! [`PaymentProcessor::capture`] is never called. The processor enforces this
//! on its side too: it refuses to capture anything it did not approve.

pub mod acquirer;
pub mod confirmation;
pub mod processor;
pub mod risk;
pub mod types;

pub use acquirer::Acquirer;
pub use confirmation::Confirmation;
pub use processor::{
    ApproveAll, AuthorizationPolicy, LedgerEntry, PaymentProcessor, SpendingLimit,
    DECLINED_CAPTURE_REASON,
};
pub use risk::{assess, RiskAssessment};
pub use types::{AuthorizationResult, CaptureResult, CaptureStatus};
