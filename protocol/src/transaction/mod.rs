//! # Transaction Module
//!
//! Orders, the signed bundle a client sends to the bank, and the checks the
//! bank runs before it will touch the money.
//!
//! ## Architecture
//!
//! ```text
//! types.rs        — Value types (Amount, Currency, TransactionType)
//! order.rs        — OrderRecord and its fluent OrderBuilder
//! bundle.rs       — TransactionBundle and the all-or-nothing TransactionBundler
//! verification.rs — BundleVerifier and its six-check VerificationReport
//! ```
//!
//! ## Bundle Lifecycle
//!
//! 1. **Order** — the client builds an [`OrderRecord`] with [`OrderBuilder`].
//! 2. **Bundle** — [`TransactionBundler::build`] encrypts the card to the
//!    bank, signs and digests the order, and attaches the client certificate.
//! 3. **Wire** — the bundle travels as JSON; [`TransactionBundle::from_json`]
//!    refuses unknown or missing fields.
//! 4. **Verify** — the bank runs [`BundleVerifier::verify`] and only proceeds
//!    to settlement if the report is fully green.
//!
//! ## Design Decisions
//!
//! - Amounts are `u64` minor units. No floating point anywhere near money.
//! - The order is signed and digested in its RFC 8785 canonical form, so a
//!   bundle parsed back from JSON verifies exactly like the original.
//! - Verification reports failures as data, never as errors.

pub mod bundle;
pub mod order;
pub mod types;
pub mod verification;

pub use bundle::{TransactionBundle, TransactionBundler};
pub use order::{OrderBuilder, OrderRecord};
pub use types::{Amount, AmountError, Currency, TransactionType};
pub use verification::{BundleVerifier, VerificationReport};
