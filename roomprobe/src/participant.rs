//! Remote participant model

use crate::track::{TrackKind, TrackPublication, TrackSource};
use serde::{Deserialize, Serialize};

/// Snapshot of a remote participant
///
/// Owned by the room session; callers receive clones and hold the identity
/// as their lookup key rather than any live reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteParticipant {
    /// Server-assigned participant sid
    pub sid: String,
    /// Participant identity string
    pub identity: String,
    /// Tracks this participant currently advertises
    pub publications: Vec<TrackPublication>,
}

impl RemoteParticipant {
    /// First publication matching a (kind, source) pair
    pub fn publication_matching(
        &self,
        kind: TrackKind,
        source: TrackSource,
    ) -> Option<&TrackPublication> {
        self.publications.iter().find(|p| p.matches(kind, source))
    }
}
