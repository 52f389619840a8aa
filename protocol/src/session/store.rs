//! Per-session artifact storage.
//!
//! The engine itself keeps artifacts on the [`super::SetSession`]; a store is
//! where a front end parks them between requests. Entries are keyed by an
//! opaque session id and an [`ArtifactKind`]. There is no expiry policy.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::authority::Certificate;
use crate::crypto::SetKeypair;
use crate::payment::{AuthorizationResult, CaptureResult, Confirmation};
use crate::transaction::TransactionBundle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ArtifactKind {
    Keypair,
    Certificate,
    Bundle,
    Authorization,
    Capture,
    Confirmation,
}

/// A stored protocol artifact.
#[derive(Debug, Clone)]
pub enum Artifact {
    Keypair(SetKeypair),
    Certificate(Certificate),
    Bundle(TransactionBundle),
    Authorization(AuthorizationResult),
    Capture(CaptureResult),
    Confirmation(Confirmation),
}

impl Artifact {
    pub fn kind(&self) -> ArtifactKind {
        match self {
            Self::Keypair(_) => ArtifactKind::Keypair,
            Self::Certificate(_) => ArtifactKind::Certificate,
            Self::Bundle(_) => ArtifactKind::Bundle,
            Self::Authorization(_) => ArtifactKind::Authorization,
            Self::Capture(_) => ArtifactKind::Capture,
            Self::Confirmation(_) => ArtifactKind::Confirmation,
        }
    }
}

pub trait ArtifactStore: Send + Sync {
    /// Insert or replace the artifact of its kind for `session_id`.
    fn put(&self, session_id: &str, artifact: Artifact);

    fn get(&self, session_id: &str, kind: ArtifactKind) -> Option<Artifact>;

    /// Kinds currently stored for `session_id`, sorted.
    fn kinds(&self, session_id: &str) -> Vec<ArtifactKind>;

    /// Drop every artifact of `session_id`.
    fn clear(&self, session_id: &str);
}

/// `DashMap`-backed store for tests and single-process front ends.
#[derive(Debug, Default)]
pub struct InMemoryArtifactStore {
    entries: DashMap<(String, ArtifactKind), Artifact>,
}

impl InMemoryArtifactStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ArtifactStore for InMemoryArtifactStore {
    fn put(&self, session_id: &str, artifact: Artifact) {
        self.entries
            .insert((session_id.to_string(), artifact.kind()), artifact);
    }

    fn get(&self, session_id: &str, kind: ArtifactKind) -> Option<Artifact> {
        self.entries
            .get(&(session_id.to_string(), kind))
            .map(|a| a.clone())
    }

    fn kinds(&self, session_id: &str) -> Vec<ArtifactKind> {
        let mut kinds: Vec<ArtifactKind> = self
            .entries
            .iter()
            .filter(|e| e.key().0 == session_id)
            .map(|e| e.key().1)
            .collect();
        kinds.sort();
        kinds
    }

    fn clear(&self, session_id: &str) {
        self.entries.retain(|(sid, _), _| sid != session_id);
    }
}
