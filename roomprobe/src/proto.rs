//! Signaling protocol messages
//!
//! Control traffic is JSON over the websocket; media frames travel as
//! binary messages framed by `roomprobe-media`'s wire layout.

use crate::participant::RemoteParticipant;
use crate::track::TrackPublication;
use serde::{Deserialize, Serialize};

/// Messages sent by this client to the room service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Join the room named in the connection URL
    Join {
        /// Room name
        room: String,
        /// Identity the client joins with
        identity: String,
        /// Subscribe automatically to every published track
        auto_subscribe: bool,
        /// Let the service pause layers nobody subscribes to
        dynacast: bool,
    },
    /// Change the subscription state of a remote track
    Subscribe {
        /// Identity of the publishing participant
        participant_identity: String,
        /// Sid of the track
        track_sid: String,
        /// Desired subscription state
        subscribed: bool,
    },
    /// Leave the room
    Leave,
}

/// Messages sent by the room service to this client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ServerMessage {
    /// Join accepted; carries the current remote participant snapshot
    JoinAck {
        /// Remote participants already in the room
        participants: Vec<RemoteParticipant>,
    },
    /// A remote participant connected
    ParticipantConnected {
        /// The participant that connected
        participant: RemoteParticipant,
    },
    /// A remote participant disconnected
    ParticipantDisconnected {
        /// Identity of the participant
        identity: String,
    },
    /// A remote participant published a track
    TrackPublished {
        /// Identity of the publishing participant
        participant_identity: String,
        /// The new publication
        publication: TrackPublication,
    },
    /// A remote participant unpublished a track
    TrackUnpublished {
        /// Identity of the publishing participant
        participant_identity: String,
        /// Sid of the removed track
        track_sid: String,
    },
    /// A subscription requested by this client materialized
    TrackSubscribed {
        /// Identity of the publishing participant
        participant_identity: String,
        /// Sid of the subscribed track
        track_sid: String,
    },
    /// Error response
    Error {
        /// Error message
        message: String,
        /// Error code for programmatic handling
        code: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::track::{TrackKind, TrackSource};

    #[test]
    fn test_client_message_serialization() {
        let join = ClientMessage::Join {
            room: "probe-room".to_string(),
            identity: "server".to_string(),
            auto_subscribe: false,
            dynacast: true,
        };

        let json = serde_json::to_string(&join).unwrap();
        assert!(json.contains("Join"));
        assert!(json.contains("probe-room"));

        let deserialized: ClientMessage = serde_json::from_str(&json).unwrap();
        match deserialized {
            ClientMessage::Join {
                room,
                auto_subscribe,
                dynacast,
                ..
            } => {
                assert_eq!(room, "probe-room");
                assert!(!auto_subscribe);
                assert!(dynacast);
            }
            other => panic!("wrong message type: {:?}", other),
        }
    }

    #[test]
    fn test_server_message_serialization() {
        let message = ServerMessage::TrackPublished {
            participant_identity: "human".to_string(),
            publication: TrackPublication {
                sid: "TR_cam01".to_string(),
                name: "camera".to_string(),
                kind: TrackKind::Video,
                source: TrackSource::Camera,
                subscribed: false,
            },
        };

        let json = serde_json::to_string(&message).unwrap();
        assert!(json.contains("TrackPublished"));
        assert!(json.contains("\"video\""));
        assert!(json.contains("\"camera\""));

        let deserialized: ServerMessage = serde_json::from_str(&json).unwrap();
        match deserialized {
            ServerMessage::TrackPublished { publication, .. } => {
                assert_eq!(publication.sid, "TR_cam01");
                assert_eq!(publication.kind, TrackKind::Video);
            }
            other => panic!("wrong message type: {:?}", other),
        }
    }
}
