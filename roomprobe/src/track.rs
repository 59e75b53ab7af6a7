//! Track publications and their taxonomy

use serde::{Deserialize, Serialize};

/// Track kind enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    /// Audio track
    Audio,
    /// Video track
    Video,
}

impl std::fmt::Display for TrackKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackKind::Audio => write!(f, "audio"),
            TrackKind::Video => write!(f, "video"),
        }
    }
}

/// Track source enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackSource {
    /// Camera/webcam video
    Camera,
    /// Microphone audio
    Microphone,
    /// Screen sharing video
    Screen,
    /// Other/unknown source
    Unknown,
}

impl std::fmt::Display for TrackSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackSource::Camera => write!(f, "camera"),
            TrackSource::Microphone => write!(f, "microphone"),
            TrackSource::Screen => write!(f, "screen"),
            TrackSource::Unknown => write!(f, "unknown"),
        }
    }
}

/// A remote track advertisement
///
/// Lifecycle: a publication appears when the owning participant publishes
/// the track, and carries a consumable stream only once this side requests
/// a subscription and the service confirms it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackPublication {
    /// Server-assigned track sid
    pub sid: String,
    /// Track name chosen by the publisher
    pub name: String,
    /// Track kind
    pub kind: TrackKind,
    /// Track source
    pub source: TrackSource,
    /// Whether this side holds a confirmed subscription
    pub subscribed: bool,
}

impl TrackPublication {
    /// Whether this publication matches a (kind, source) target pair
    pub fn matches(&self, kind: TrackKind, source: TrackSource) -> bool {
        self.kind == kind && self.source == source
    }
}
