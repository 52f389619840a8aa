//! Core value types for SET orders.
//!
//! Money is an integer count of the currency's minor unit. Decimal strings
//! like `"49.99"` are parsed exactly into that integer at the boundary and
//! never pass through a float.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

// ---------------------------------------------------------------------------
// TransactionType
// ---------------------------------------------------------------------------

/// What kind of purchase an order describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionType {
    /// A one-off card-not-present purchase.
    OnlinePurchase,
    /// A merchant-initiated repeat charge.
    Recurring,
}

impl fmt::Display for TransactionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OnlinePurchase => write!(f, "ONLINE_PURCHASE"),
            Self::Recurring => write!(f, "RECURRING"),
        }
    }
}

// ---------------------------------------------------------------------------
// Currency
// ---------------------------------------------------------------------------

/// ISO 4217 currency of an order.
///
/// The common settlement currencies are named; any other three-letter code
/// is carried as [`Currency::Custom`]. On the wire every currency is its
/// bare code, e.g. `"EUR"` or `"SEK"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum Currency {
    EUR,
    USD,
    GBP,
    CHF,
    Custom(String),
}

impl Currency {
    /// Minor-unit exponent. Every supported currency uses cents.
    pub fn decimals(&self) -> u8 {
        2
    }

    pub fn code(&self) -> &str {
        match self {
            Self::EUR => "EUR",
            Self::USD => "USD",
            Self::GBP => "GBP",
            Self::CHF => "CHF",
            Self::Custom(code) => code,
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = AmountError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EUR" => Ok(Self::EUR),
            "USD" => Ok(Self::USD),
            "GBP" => Ok(Self::GBP),
            "CHF" => Ok(Self::CHF),
            other if other.len() == 3 && other.bytes().all(|b| b.is_ascii_uppercase()) => {
                Ok(Self::Custom(other.to_string()))
            }
            other => Err(AmountError::UnknownCurrency(other.to_string())),
        }
    }
}

impl From<Currency> for String {
    fn from(currency: Currency) -> Self {
        currency.code().to_string()
    }
}

impl TryFrom<String> for Currency {
    type Error = AmountError;

    fn try_from(code: String) -> Result<Self, Self::Error> {
        code.parse()
    }
}

// ---------------------------------------------------------------------------
// Amount
// ---------------------------------------------------------------------------

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AmountError {
    #[error("malformed amount {0:?}: expected digits with an optional decimal point")]
    Malformed(String),

    #[error("amount {input:?} has more than {decimals} fractional digits")]
    TooPrecise { input: String, decimals: u8 },

    #[error("amount {0:?} does not fit in 64 bits of minor units")]
    Overflow(String),

    #[error("unknown currency code {0:?}")]
    UnknownCurrency(String),
}

/// A non-negative monetary amount in minor units.
///
/// `Amount { value: 4999, currency: EUR }` is 49.99 EUR.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Amount {
    /// Value in the smallest unit of the currency.
    pub value: u64,
    pub currency: Currency,
}

impl Amount {
    pub fn new(value: u64, currency: Currency) -> Self {
        Self { value, currency }
    }

    /// Parse a decimal string exactly: `"49.99"` → 4999 minor units.
    ///
    /// Rejects signs, exponents, thousands separators, and more fractional
    /// digits than the currency has.
    pub fn parse(input: &str, currency: Currency) -> Result<Self, AmountError> {
        let decimals = currency.decimals();
        let malformed = || AmountError::Malformed(input.to_string());

        let (whole, frac) = match input.split_once('.') {
            Some((w, f)) => (w, f),
            None => (input, ""),
        };
        if whole.is_empty() || !whole.bytes().all(|b| b.is_ascii_digit()) {
            return Err(malformed());
        }
        if !frac.bytes().all(|b| b.is_ascii_digit()) || (input.contains('.') && frac.is_empty())
        {
            return Err(malformed());
        }
        if frac.len() > decimals as usize {
            return Err(AmountError::TooPrecise {
                input: input.to_string(),
                decimals,
            });
        }

        let overflow = || AmountError::Overflow(input.to_string());
        let scale = 10u64.pow(decimals as u32);
        let whole: u64 = whole.parse().map_err(|_| overflow())?;
        let frac_value: u64 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = decimals as usize);
            padded.parse().map_err(|_| malformed())?
        };

        let value = whole
            .checked_mul(scale)
            .and_then(|v| v.checked_add(frac_value))
            .ok_or_else(overflow)?;
        Ok(Self { value, currency })
    }

    pub fn is_zero(&self) -> bool {
        self.value == 0
    }

    /// Human-readable form, e.g. `"49.99 EUR"`.
    pub fn display_decimal(&self) -> String {
        let decimals = self.currency.decimals() as u32;
        let divisor = 10u64.pow(decimals);
        format!(
            "{}.{:0>width$} {}",
            self.value / divisor,
            self.value % divisor,
            self.currency,
            width = decimals as usize
        )
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_decimal())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_exact_decimal() {
        assert_eq!(
            Amount::parse("49.99", Currency::EUR).unwrap(),
            Amount::new(4999, Currency::EUR)
        );
        assert_eq!(Amount::parse("9999.99", Currency::EUR).unwrap().value, 999_999);
        assert_eq!(Amount::parse("49.9", Currency::EUR).unwrap().value, 4990);
        assert_eq!(Amount::parse("49", Currency::EUR).unwrap().value, 4900);
        assert_eq!(Amount::parse("0.01", Currency::USD).unwrap().value, 1);
        assert!(Amount::parse("0", Currency::USD).unwrap().is_zero());
    }

    #[test]
    fn parse_rejects_malformed() {
        for bad in ["", "-1.00", "1e3", "1,000.00", ".50", "12.", "12.3.4", "abc", " 1.00"] {
            assert!(
                matches!(
                    Amount::parse(bad, Currency::EUR),
                    Err(AmountError::Malformed(_))
                ),
                "{bad:?} should be malformed"
            );
        }
    }

    #[test]
    fn parse_rejects_sub_cent_precision() {
        assert!(matches!(
            Amount::parse("49.999", Currency::EUR),
            Err(AmountError::TooPrecise { decimals: 2, .. })
        ));
    }

    #[test]
    fn parse_rejects_overflow() {
        assert!(matches!(
            Amount::parse("184467440737095516.16", Currency::EUR),
            Err(AmountError::Overflow(_))
        ));
        assert!(matches!(
            Amount::parse("99999999999999999999999", Currency::EUR),
            Err(AmountError::Overflow(_))
        ));
    }

    #[test]
    fn amount_display_decimal() {
        assert_eq!(Amount::new(4999, Currency::EUR).display_decimal(), "49.99 EUR");
        assert_eq!(Amount::new(5, Currency::USD).to_string(), "0.05 USD");
    }

    #[test]
    fn currency_from_code() {
        assert_eq!("EUR".parse::<Currency>().unwrap(), Currency::EUR);
        assert_eq!(
            "SEK".parse::<Currency>().unwrap(),
            Currency::Custom("SEK".into())
        );
        assert!("euro".parse::<Currency>().is_err());
    }

    #[test]
    fn currency_wire_form_is_the_bare_code() {
        assert_eq!(serde_json::to_string(&Currency::EUR).unwrap(), r#""EUR""#);
        assert_eq!(
            serde_json::to_string(&Currency::Custom("SEK".into())).unwrap(),
            r#""SEK""#
        );
        assert_eq!(
            serde_json::from_str::<Currency>(r#""SEK""#).unwrap(),
            Currency::Custom("SEK".into())
        );
        assert!(serde_json::from_str::<Currency>(r#""sek""#).is_err());
        assert!(serde_json::from_str::<Currency>(r#"{"Custom":"SEK"}"#).is_err());
    }

    #[test]
    fn transaction_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&TransactionType::OnlinePurchase).unwrap(),
            "\"ONLINE_PURCHASE\""
        );
        assert_eq!(TransactionType::Recurring.to_string(), "RECURRING");
    }

    #[test]
    fn amount_rejects_unknown_fields() {
        let parsed: Result<Amount, _> =
            serde_json::from_str(r#"{ "value": 1, "currency": "EUR", "fx": 1 }"#);
        assert!(parsed.is_err());
    }
}
