//! Room events published on the session's broadcast bus

use crate::participant::RemoteParticipant;
use crate::track::TrackPublication;

/// Room events that can occur during a session
#[derive(Debug, Clone)]
pub enum RoomEvent {
    /// A remote participant joined the room
    ParticipantConnected {
        /// The participant that joined
        participant: RemoteParticipant,
    },
    /// A remote participant left the room
    ParticipantDisconnected {
        /// Identity of the participant that left
        identity: String,
    },
    /// A remote participant published a track
    TrackPublished {
        /// Identity of the publishing participant
        participant_identity: String,
        /// The publication that appeared
        publication: TrackPublication,
    },
    /// A remote participant unpublished a track
    TrackUnpublished {
        /// Identity of the publishing participant
        participant_identity: String,
        /// Sid of the track that went away
        track_sid: String,
    },
    /// A requested subscription materialized
    TrackSubscribed {
        /// Identity of the publishing participant
        participant_identity: String,
        /// Sid of the subscribed track
        track_sid: String,
    },
    /// The session disconnected from the room
    Disconnected {
        /// Reason for disconnection
        reason: String,
    },
}

impl RoomEvent {
    /// Get the event type as a string
    pub fn event_type(&self) -> &'static str {
        match self {
            RoomEvent::ParticipantConnected { .. } => "participant_connected",
            RoomEvent::ParticipantDisconnected { .. } => "participant_disconnected",
            RoomEvent::TrackPublished { .. } => "track_published",
            RoomEvent::TrackUnpublished { .. } => "track_unpublished",
            RoomEvent::TrackSubscribed { .. } => "track_subscribed",
            RoomEvent::Disconnected { .. } => "disconnected",
        }
    }
}
