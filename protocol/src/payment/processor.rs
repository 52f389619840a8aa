//! Two-phase settlement: authorization, then capture.
//!
//! The processor keeps a ledger of every transaction id it has decided on.
//! Authorizing the same id twice is a replay and fails. Capture is only
//! possible against an approved authorization this processor issued, and
//! only once per authorization code.

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::{DashMap, DashSet};
use std::sync::Arc;
use tracing::{info, warn};

use super::types::{AuthorizationResult, CaptureResult, CaptureStatus};
use crate::clock::Clock;
use crate::error::SetError;
use crate::ids::IdGenerator;
use crate::transaction::{Amount, OrderRecord};

/// Reason recorded on the FAILED capture that follows a decline.
pub const DECLINED_CAPTURE_REASON: &str = "authorization declined";

// ---------------------------------------------------------------------------
// AuthorizationPolicy
// ---------------------------------------------------------------------------

/// Issuer-side approve/decline decision.
pub trait AuthorizationPolicy: Send + Sync {
    /// `Ok(())` to approve, `Err(reason)` to decline.
    fn decide(&self, order: &OrderRecord) -> Result<(), String>;
}

/// Approves everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct ApproveAll;

impl AuthorizationPolicy for ApproveAll {
    fn decide(&self, _order: &OrderRecord) -> Result<(), String> {
        Ok(())
    }
}

/// Declines orders above a per-transaction limit, or in another currency.
#[derive(Debug, Clone)]
pub struct SpendingLimit {
    pub limit: Amount,
}

impl SpendingLimit {
    pub fn new(limit: Amount) -> Self {
        Self { limit }
    }
}

impl AuthorizationPolicy for SpendingLimit {
    fn decide(&self, order: &OrderRecord) -> Result<(), String> {
        if order.amount.currency != self.limit.currency {
            return Err(format!("currency {} not accepted", order.amount.currency));
        }
        if order.amount.value > self.limit.value {
            return Err(format!(
                "amount {} exceeds limit {}",
                order.amount, self.limit
            ));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

/// What the processor remembers about a transaction id.
///
/// Capture settles the amount recorded here, never the amount on the
/// authorization the caller hands back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerEntry {
    pub transaction_id: String,
    pub merchant_id: String,
    pub amount: Amount,
    pub authorized: bool,
    pub authorization_code: Option<String>,
    pub recorded_at: DateTime<Utc>,
}

impl LedgerEntry {
    /// First field on which `authorization` departs from this entry.
    fn mismatch(&self, authorization: &AuthorizationResult) -> Option<&'static str> {
        if authorization.transaction_id != self.transaction_id {
            Some("transaction_id")
        } else if authorization.merchant_id != self.merchant_id {
            Some("merchant_id")
        } else if authorization.amount != self.amount {
            Some("amount")
        } else {
            None
        }
    }
}

// ---------------------------------------------------------------------------
// PaymentProcessor
// ---------------------------------------------------------------------------

pub struct PaymentProcessor {
    policy: Box<dyn AuthorizationPolicy>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    ledger: DashMap<String, LedgerEntry>,
    captured: DashSet<String>,
}

impl PaymentProcessor {
    pub fn new(
        policy: Box<dyn AuthorizationPolicy>,
        clock: Arc<dyn Clock>,
        ids: Arc<dyn IdGenerator>,
    ) -> Self {
        Self {
            policy,
            clock,
            ids,
            ledger: DashMap::new(),
            captured: DashSet::new(),
        }
    }

    /// Phase one. Decides on the order and records the transaction id.
    ///
    /// A declined order still consumes its transaction id.
    pub fn authorize(&self, order: &OrderRecord) -> Result<AuthorizationResult, SetError> {
        let slot = match self.ledger.entry(order.transaction_id.clone()) {
            Entry::Occupied(_) => {
                warn!(transaction_id = %order.transaction_id, "replayed transaction rejected");
                return Err(SetError::ReplayDetected(order.transaction_id.clone()));
            }
            Entry::Vacant(slot) => slot,
        };

        let decided_at = self.clock.now();
        let (authorization_code, decline_reason) = match self.policy.decide(order) {
            Ok(()) => (Some(self.ids.authorization_code()), None),
            Err(reason) => (None, Some(reason)),
        };
        let authorized = authorization_code.is_some();

        slot.insert(LedgerEntry {
            transaction_id: order.transaction_id.clone(),
            merchant_id: order.merchant_id.clone(),
            amount: order.amount.clone(),
            authorized,
            authorization_code: authorization_code.clone(),
            recorded_at: decided_at,
        });

        match (&authorization_code, &decline_reason) {
            (Some(code), _) => info!(
                transaction_id = %order.transaction_id,
                authorization_code = %code,
                amount = %order.amount,
                "authorization approved"
            ),
            (None, reason) => warn!(
                transaction_id = %order.transaction_id,
                reason = reason.as_deref().unwrap_or_default(),
                "authorization declined"
            ),
        }

        Ok(AuthorizationResult {
            authorized,
            authorization_code,
            amount: order.amount.clone(),
            merchant_id: order.merchant_id.clone(),
            transaction_id: order.transaction_id.clone(),
            decided_at,
            decline_reason,
        })
    }

    /// Phase two. Only for an approved authorization issued by this
    /// processor, with the terms it was issued on, and only once.
    pub fn capture(&self, authorization: &AuthorizationResult) -> Result<CaptureResult, SetError> {
        let txn = &authorization.transaction_id;
        let code = match (&authorization.authorization_code, authorization.authorized) {
            (Some(code), true) => code,
            _ => return Err(SetError::CaptureWithoutAuthorization(txn.clone())),
        };

        let entry = match self.ledger.get(txn) {
            Some(e) if e.authorized && e.authorization_code.as_ref() == Some(code) => {
                e.value().clone()
            }
            _ => return Err(SetError::CaptureWithoutAuthorization(txn.clone())),
        };
        if let Some(field) = entry.mismatch(authorization) {
            warn!(transaction_id = %txn, field, "capture refused: authorization altered");
            return Err(SetError::AuthorizationMismatch {
                transaction_id: txn.clone(),
                field,
            });
        }

        if !self.captured.insert(code.clone()) {
            return Err(SetError::AlreadyCaptured(code.clone()));
        }

        let capture = CaptureResult {
            captured: true,
            capture_code: Some(self.ids.capture_code()),
            amount_captured: Some(entry.amount.clone()),
            status: CaptureStatus::Completed,
            failure_reason: None,
            captured_at: Some(self.clock.now()),
        };
        info!(
            transaction_id = %txn,
            capture_code = capture.capture_code.as_deref().unwrap_or_default(),
            amount = %entry.amount,
            "capture completed"
        );
        Ok(capture)
    }

    /// Both phases. A decline yields the FAILED capture directly and never
    /// calls [`Self::capture`].
    pub fn settle(
        &self,
        order: &OrderRecord,
    ) -> Result<(AuthorizationResult, CaptureResult), SetError> {
        let authorization = self.authorize(order)?;
        let capture = if authorization.authorized {
            self.capture(&authorization)?
        } else {
            CaptureResult::declined(DECLINED_CAPTURE_REASON)
        };
        Ok((authorization, capture))
    }

    pub fn is_processed(&self, transaction_id: &str) -> bool {
        self.ledger.contains_key(transaction_id)
    }

    pub fn ledger_entry(&self, transaction_id: &str) -> Option<LedgerEntry> {
        self.ledger.get(transaction_id).map(|e| e.clone())
    }
}
