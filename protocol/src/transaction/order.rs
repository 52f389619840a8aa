//! Order records and their builder.
//!
//! An [`OrderRecord`] is the order transcript (OT): what the client is buying,
//! from whom, and for how much. It is the record the client signs and the
//! bank digests, so its serialized shape is part of the protocol. Every
//! field is serialized, timestamps as integer milliseconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::types::{Amount, Currency, TransactionType};
use crate::clock::{Clock, SystemClock};
use crate::config::MAX_IDENTIFIER_LENGTH;

// ---------------------------------------------------------------------------
// OrderRecord
// ---------------------------------------------------------------------------

/// The signed description of a purchase. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OrderRecord {
    pub transaction_id: String,
    pub amount: Amount,
    pub merchant_id: String,
    pub client_id: String,
    pub transaction_type: TransactionType,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

impl OrderRecord {
    /// First structural problem with the identifiers, if any.
    ///
    /// Identifiers must be non-empty, at most [`MAX_IDENTIFIER_LENGTH`]
    /// bytes, and free of whitespace and control characters.
    pub fn structural_problem(&self) -> Option<String> {
        [
            ("transaction_id", &self.transaction_id),
            ("merchant_id", &self.merchant_id),
            ("client_id", &self.client_id),
        ]
        .into_iter()
        .find_map(|(field, value)| identifier_problem(field, value))
    }
}

fn identifier_problem(field: &str, value: &str) -> Option<String> {
    if value.is_empty() {
        Some(format!("{field} is empty"))
    } else if value.len() > MAX_IDENTIFIER_LENGTH {
        Some(format!(
            "{field} exceeds {MAX_IDENTIFIER_LENGTH} bytes ({})",
            value.len()
        ))
    } else if value.chars().any(|c| c.is_whitespace() || c.is_control()) {
        Some(format!("{field} contains whitespace or control characters"))
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// OrderBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`OrderRecord`].
///
/// ```
/// use set_protocol::transaction::{Amount, Currency, OrderBuilder};
///
/// let order = OrderBuilder::new("C1")
///     .transaction_id("TXN-1")
///     .merchant("ShopX")
///     .amount(Amount::new(4999, Currency::EUR))
///     .build();
/// assert_eq!(order.amount.display_decimal(), "49.99 EUR");
/// ```
///
/// `transaction_type` defaults to [`TransactionType::OnlinePurchase`] and
/// `created_at` to the system clock at build time.
pub struct OrderBuilder {
    client_id: String,
    transaction_id: String,
    merchant_id: String,
    amount: Amount,
    transaction_type: TransactionType,
    created_at: Option<DateTime<Utc>>,
}

impl OrderBuilder {
    pub fn new(client_id: &str) -> Self {
        Self {
            client_id: client_id.to_string(),
            transaction_id: String::new(),
            merchant_id: String::new(),
            amount: Amount::new(0, Currency::EUR),
            transaction_type: TransactionType::OnlinePurchase,
            created_at: None,
        }
    }

    pub fn transaction_id(mut self, id: &str) -> Self {
        self.transaction_id = id.to_string();
        self
    }

    pub fn merchant(mut self, merchant_id: &str) -> Self {
        self.merchant_id = merchant_id.to_string();
        self
    }

    pub fn amount(mut self, amount: Amount) -> Self {
        self.amount = amount;
        self
    }

    pub fn transaction_type(mut self, transaction_type: TransactionType) -> Self {
        self.transaction_type = transaction_type;
        self
    }

    /// Stamp the order explicitly instead of reading the system clock.
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    pub fn build(self) -> OrderRecord {
        OrderRecord {
            transaction_id: self.transaction_id,
            amount: self.amount,
            merchant_id: self.merchant_id,
            client_id: self.client_id,
            transaction_type: self.transaction_type,
            created_at: self.created_at.unwrap_or_else(|| SystemClock.now()),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
