//! Post-capture risk review.
//!
//! A demonstration hook, not a fraud model: the score and anomaly count are
//! drawn at random. The caller supplies the RNG so tests can seed it.

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use tracing::info;

use crate::transaction::{Amount, OrderRecord};

pub const RISK_SCORE_RANGE: RangeInclusive<u8> = 10..=40;
pub const ANOMALY_RANGE: RangeInclusive<u8> = 0..=2;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub transaction_id: String,
    pub client_id: String,
    pub amount: Amount,
    pub risk_score: u8,
    pub anomalies: u8,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub assessed_at: DateTime<Utc>,
}

pub fn assess<R: Rng + ?Sized>(
    order: &OrderRecord,
    rng: &mut R,
    at: DateTime<Utc>,
) -> RiskAssessment {
    let assessment = RiskAssessment {
        transaction_id: order.transaction_id.clone(),
        client_id: order.client_id.clone(),
        amount: order.amount.clone(),
        risk_score: rng.gen_range(RISK_SCORE_RANGE),
        anomalies: rng.gen_range(ANOMALY_RANGE),
        assessed_at: at,
    };
    info!(
        transaction_id = %assessment.transaction_id,
        risk_score = assessment.risk_score,
        anomalies = assessment.anomalies,
        "risk assessment recorded"
    );
    assessment
}
