//! Protocol state machine for a single transaction.
//!
//! ```text
//! Init → CertRequested → CertActive → BundleCreated → Submitted → Verified
//!      → PaymentRequested → Authorized → Captured → Completed
//!
//! Fail    : CertRequested | CertActive | BundleCreated | Verified | Authorized | Captured → Error
//! Revoke  : CertActive | BundleCreated | Verified | Authorized | Captured → Revoked
//! Retry   : Error → Init
//! RequestCertificate also re-enrolls: Revoked → CertRequested
//! ```
//!
//! Everything else is illegal and fails with [`SetError::IllegalTransition`]
//! naming the current state and the attempted operation. A rejected
//! operation leaves the state untouched.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

use crate::error::SetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProtocolState {
    Init,
    CertRequested,
    CertActive,
    BundleCreated,
    Submitted,
    Verified,
    PaymentRequested,
    Authorized,
    Captured,
    Completed,
    Error,
    Revoked,
}

impl ProtocolState {
    /// No forward progress is possible; only `Retry` or re-enrollment.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Revoked)
    }
}

impl fmt::Display for ProtocolState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// An operation that drives a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    RequestCertificate,
    IssueCertificate,
    CreateBundle,
    Submit,
    Verify,
    RequestPayment,
    Authorize,
    Capture,
    Complete,
    Fail,
    Revoke,
    Retry,
    /// Post-capture risk review. Never transitions.
    Investigate,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::RequestCertificate => "request_certificate",
            Self::IssueCertificate => "issue_certificate",
            Self::CreateBundle => "create_bundle",
            Self::Submit => "submit",
            Self::Verify => "verify",
            Self::RequestPayment => "request_payment",
            Self::Authorize => "authorize",
            Self::Capture => "capture",
            Self::Complete => "complete",
            Self::Fail => "fail",
            Self::Revoke => "revoke",
            Self::Retry => "retry",
            Self::Investigate => "investigate",
        };
        f.write_str(name)
    }
}

/// The transition table. `None` means illegal.
pub fn next_state(state: ProtocolState, operation: Operation) -> Option<ProtocolState> {
    use Operation as Op;
    use ProtocolState as S;

    match (state, operation) {
        (S::Init | S::Revoked, Op::RequestCertificate) => Some(S::CertRequested),
        (S::CertRequested, Op::IssueCertificate) => Some(S::CertActive),
        (S::CertActive, Op::CreateBundle) => Some(S::BundleCreated),
        (S::BundleCreated, Op::Submit) => Some(S::Submitted),
        (S::Submitted, Op::Verify) => Some(S::Verified),
        (S::Verified, Op::RequestPayment) => Some(S::PaymentRequested),
        (S::PaymentRequested, Op::Authorize) => Some(S::Authorized),
        (S::Authorized, Op::Capture) => Some(S::Captured),
        (S::Captured, Op::Complete) => Some(S::Completed),

        (
            S::CertRequested | S::CertActive | S::BundleCreated | S::Verified | S::Authorized
            | S::Captured,
            Op::Fail,
        ) => Some(S::Error),

        (
            S::CertActive | S::BundleCreated | S::Verified | S::Authorized | S::Captured,
            Op::Revoke,
        ) => Some(S::Revoked),

        (S::Error, Op::Retry) => Some(S::Init),

        _ => None,
    }
}

/// One applied transition, kept for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: ProtocolState,
    pub to: ProtocolState,
    pub operation: Operation,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub at: DateTime<Utc>,
}

/// Current state plus the full transition history.
#[derive(Debug, Clone)]
pub struct StateMachine {
    state: ProtocolState,
    history: Vec<TransitionRecord>,
}

impl Default for StateMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl StateMachine {
    pub fn new() -> Self {
        Self {
            state: ProtocolState::Init,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> ProtocolState {
        self.state
    }

    pub fn history(&self) -> &[TransitionRecord] {
        &self.history
    }

    /// Fail unless `operation` is legal now. Does not transition.
    pub fn ensure(&self, operation: Operation) -> Result<ProtocolState, SetError> {
        next_state(self.state, operation).ok_or(SetError::IllegalTransition {
            state: self.state,
            operation,
        })
    }

    pub fn apply(&mut self, operation: Operation, at: DateTime<Utc>) -> Result<ProtocolState, SetError> {
        let to = self.ensure(operation)?;
        debug!(from = %self.state, %to, %operation, "state transition");
        self.history.push(TransitionRecord {
            from: self.state,
            to,
            operation,
            at,
        });
        self.state = to;
        Ok(to)
    }
}
