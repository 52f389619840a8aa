//! # Protocol Sessions
//!
//! One transaction's path through SET, from certificate request to signed
//! confirmation.
//!
//! ```text
//! state.rs   — ProtocolState, Operation, the transition table, StateMachine
//! context.rs — SetSession: the step methods and the artifacts they produce
//! store.rs   — ArtifactStore for parking artifacts between requests
//! ```
//!
//! Sessions are independent of each other. What they share (the CA, the
//! payment processor, the acquirer) lives in [`SharedServices`] behind `Arc`s,
//! so many sessions can run on separate threads at once.

pub mod context;
pub mod state;
pub mod store;

pub use context::{SessionSummary, SetSession, SharedServices, DEFAULT_BANK_ID};
pub use state::{next_state, Operation, ProtocolState, StateMachine, TransitionRecord};
pub use store::{Artifact, ArtifactKind, ArtifactStore, InMemoryArtifactStore};
