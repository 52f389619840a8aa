//! Settlement records produced by the two phases.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::transaction::Amount;

/// Decision on an order. The code is present only on approval, the reason
/// only on decline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationResult {
    pub authorized: bool,
    pub authorization_code: Option<String>,
    pub amount: Amount,
    pub merchant_id: String,
    pub transaction_id: String,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub decided_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub decline_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CaptureStatus {
    Completed,
    Failed,
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Completed => write!(f, "COMPLETED"),
            Self::Failed => write!(f, "FAILED"),
        }
    }
}

/// Outcome of the capture phase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptureResult {
    pub captured: bool,
    pub capture_code: Option<String>,
    pub amount_captured: Option<Amount>,
    pub status: CaptureStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub captured_at: Option<DateTime<Utc>>,
}

impl CaptureResult {
    /// The FAILED result recorded in place of a capture when authorization
    /// was declined. Capture itself is never attempted.
    pub fn declined(reason: &str) -> Self {
        Self {
            captured: false,
            capture_code: None,
            amount_captured: None,
            status: CaptureStatus::Failed,
            failure_reason: Some(reason.to_string()),
            captured_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn declined_capture_shape() {
        let capture = CaptureResult::declined("authorization declined");
        assert!(!capture.captured);
        assert_eq!(capture.status, CaptureStatus::Failed);
        assert!(capture.capture_code.is_none());
        assert!(capture.amount_captured.is_none());

        let json = serde_json::to_value(&capture).unwrap();
        assert_eq!(json["status"], "FAILED");
        assert_eq!(json["failure_reason"], "authorization declined");
    }

    #[test]
    fn status_wire_names() {
        assert_eq!(
            serde_json::to_string(&CaptureStatus::Completed).unwrap(),
            "\"COMPLETED\""
        );
        assert_eq!(CaptureStatus::Failed.to_string(), "FAILED");
    }
}
