//! Room session
//!
//! Holds the live websocket connection to a room. A background read task
//! decodes control messages and media packets, maintains the participant
//! registry, routes frames into per-track channels and publishes
//! [`RoomEvent`]s on a broadcast bus. The session is the single shared
//! resource of the harness: subcomponents read it, only its internal event
//! bus is mutated.

use crate::event::RoomEvent;
use crate::participant::RemoteParticipant;
use crate::proto::{ClientMessage, ServerMessage};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use roomprobe_core::ProbeError;
use roomprobe_media::{MediaFrame, MediaPacket, MediaStream};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

/// Capacity of the room event broadcast bus
const EVENT_BUS_CAPACITY: usize = 256;

/// Connection options forwarded in the join request
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// Subscribe automatically to every published track
    pub auto_subscribe: bool,
    /// Let the service pause layers nobody subscribes to
    pub dynacast: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            auto_subscribe: true,
            dynacast: false,
        }
    }
}

/// Read surface of a room session
///
/// Discovery operates against this trait rather than the concrete session
/// so its waiting logic is exercisable against in-memory fakes.
#[async_trait]
pub trait RoomApi: Send + Sync {
    /// Snapshot of the remote participants currently connected
    fn remote_participants(&self) -> Vec<RemoteParticipant>;

    /// Attach a receiver to the room event bus
    fn subscribe_events(&self) -> broadcast::Receiver<RoomEvent>;

    /// Ask the service to subscribe this client to a remote track
    async fn request_subscription(
        &self,
        participant_identity: &str,
        track_sid: &str,
    ) -> Result<(), ProbeError>;

    /// Take the materialized stream for a track, if any
    ///
    /// Streams are single-consumer: taking one removes it from the session.
    fn take_stream(&self, track_sid: &str) -> Option<MediaStream>;
}

/// Shared session state, owned by the session and its read task
pub(crate) struct SessionState {
    /// Remote participants keyed by identity
    participants: DashMap<String, RemoteParticipant>,
    /// Feed senders for subscribed tracks, keyed by track sid
    feeds: DashMap<String, mpsc::UnboundedSender<MediaFrame>>,
    /// Materialized streams awaiting take-out, keyed by track sid
    pending_streams: Mutex<HashMap<String, MediaStream>>,
    /// Room event bus
    events: broadcast::Sender<RoomEvent>,
}

impl SessionState {
    pub(crate) fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_BUS_CAPACITY);
        Self {
            participants: DashMap::new(),
            feeds: DashMap::new(),
            pending_streams: Mutex::new(HashMap::new()),
            events,
        }
    }

    fn emit(&self, event: RoomEvent) {
        // A send error only means nobody is listening right now.
        let _ = self.events.send(event);
    }

    fn insert_participant(&self, participant: RemoteParticipant) {
        self.participants
            .insert(participant.identity.clone(), participant);
    }

    /// Apply a server control message to the registries and emit the
    /// matching room event
    pub(crate) fn apply(&self, message: ServerMessage) {
        match message {
            ServerMessage::JoinAck { .. } => {
                warn!("unexpected join ack after connect, ignoring");
            }
            ServerMessage::ParticipantConnected { participant } => {
                debug!(identity = %participant.identity, "participant connected");
                self.insert_participant(participant.clone());
                self.emit(RoomEvent::ParticipantConnected { participant });
            }
            ServerMessage::ParticipantDisconnected { identity } => {
                debug!(identity = %identity, "participant disconnected");
                if let Some((_, participant)) = self.participants.remove(&identity) {
                    for publication in &participant.publications {
                        self.feeds.remove(&publication.sid);
                        self.pending_streams.lock().remove(&publication.sid);
                    }
                }
                self.emit(RoomEvent::ParticipantDisconnected { identity });
            }
            ServerMessage::TrackPublished {
                participant_identity,
                publication,
            } => {
                debug!(
                    identity = %participant_identity,
                    track_sid = %publication.sid,
                    kind = %publication.kind,
                    source = %publication.source,
                    "track published"
                );
                match self.participants.get_mut(&participant_identity) {
                    Some(mut participant) => {
                        participant.publications.push(publication.clone());
                    }
                    None => {
                        warn!(identity = %participant_identity, "publication for unknown participant");
                    }
                }
                self.emit(RoomEvent::TrackPublished {
                    participant_identity,
                    publication,
                });
            }
            ServerMessage::TrackUnpublished {
                participant_identity,
                track_sid,
            } => {
                debug!(identity = %participant_identity, track_sid = %track_sid, "track unpublished");
                if let Some(mut participant) = self.participants.get_mut(&participant_identity) {
                    participant.publications.retain(|p| p.sid != track_sid);
                }
                // Dropping the feed sender ends the stream for its consumer.
                self.feeds.remove(&track_sid);
                self.pending_streams.lock().remove(&track_sid);
                self.emit(RoomEvent::TrackUnpublished {
                    participant_identity,
                    track_sid,
                });
            }
            ServerMessage::TrackSubscribed {
                participant_identity,
                track_sid,
            } => {
                info!(identity = %participant_identity, track_sid = %track_sid, "track subscribed");
                if let Some(mut participant) = self.participants.get_mut(&participant_identity) {
                    if let Some(publication) = participant
                        .publications
                        .iter_mut()
                        .find(|p| p.sid == track_sid)
                    {
                        publication.subscribed = true;
                    }
                }
                if !self.feeds.contains_key(&track_sid) {
                    let (sender, stream) = MediaStream::channel(&track_sid);
                    self.feeds.insert(track_sid.clone(), sender);
                    self.pending_streams.lock().insert(track_sid.clone(), stream);
                }
                self.emit(RoomEvent::TrackSubscribed {
                    participant_identity,
                    track_sid,
                });
            }
            ServerMessage::Error { message, code } => {
                warn!(code = %code, message = %message, "room service error");
            }
        }
    }

    /// Route a media packet into its track's feed
    pub(crate) fn route_media(&self, packet: MediaPacket) {
        let delivered = match self.feeds.get(&packet.track_sid) {
            Some(sender) => sender.send(packet.frame).is_ok(),
            None => return,
        };
        if !delivered {
            // Consumer dropped its stream; stop feeding the track.
            debug!(track_sid = %packet.track_sid, "stream consumer gone, dropping feed");
            self.feeds.remove(&packet.track_sid);
        }
    }
}

/// Live connection to a room
pub struct RoomSession {
    room_name: String,
    local_identity: String,
    state: Arc<SessionState>,
    outbound: mpsc::UnboundedSender<ClientMessage>,
    reader: tokio::task::JoinHandle<()>,
    writer: tokio::task::JoinHandle<()>,
}

impl RoomSession {
    /// Connect to `room` on the service at `service_url`, joining as
    /// `identity` with the given access token
    pub async fn connect(
        service_url: &str,
        token: &str,
        room: &str,
        identity: &str,
        options: SessionOptions,
    ) -> Result<Self, ProbeError> {
        let url = rtc_url(service_url, token);
        info!(room = %room, identity = %identity, "connecting to room service");

        let (socket, _response) =
            connect_async(url.as_str())
                .await
                .map_err(|e| ProbeError::Connection {
                    room: room.to_string(),
                    reason: format!("websocket connect failed: {}", e),
                })?;
        let (mut sink, mut source) = socket.split();

        let join = ClientMessage::Join {
            room: room.to_string(),
            identity: identity.to_string(),
            auto_subscribe: options.auto_subscribe,
            dynacast: options.dynacast,
        };
        sink.send(Message::Text(encode_client_message(&join)?))
            .await
            .map_err(|e| ProbeError::Connection {
                room: room.to_string(),
                reason: format!("join send failed: {}", e),
            })?;

        let state = Arc::new(SessionState::new());

        // Consume control messages until the join is acknowledged; the
        // acknowledgement carries the initial participant snapshot.
        loop {
            let message = source.next().await.ok_or_else(|| ProbeError::Connection {
                room: room.to_string(),
                reason: "connection closed before join ack".to_string(),
            })?;
            let message = message.map_err(|e| ProbeError::Connection {
                room: room.to_string(),
                reason: format!("websocket error before join ack: {}", e),
            })?;
            let Message::Text(text) = message else {
                continue;
            };
            match decode_server_message(&text)? {
                ServerMessage::JoinAck { participants } => {
                    info!(remote_participants = participants.len(), "joined room");
                    for participant in participants {
                        state.insert_participant(participant);
                    }
                    break;
                }
                ServerMessage::Error { message, code } => {
                    return Err(ProbeError::Connection {
                        room: room.to_string(),
                        reason: format!("join rejected ({}): {}", code, message),
                    });
                }
                other => state.apply(other),
            }
        }

        // Writer task: serializes outbound control messages.
        let (outbound, mut outbound_rx) = mpsc::unbounded_channel::<ClientMessage>();
        let writer = tokio::spawn(async move {
            while let Some(message) = outbound_rx.recv().await {
                let text = match encode_client_message(&message) {
                    Ok(text) => text,
                    Err(e) => {
                        warn!(error = %e, "dropping unencodable client message");
                        continue;
                    }
                };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    warn!(error = %e, "websocket send failed, stopping writer");
                    break;
                }
            }
        });

        // Reader task: decodes the rest of the connection.
        let reader_state = Arc::clone(&state);
        let reader = tokio::spawn(async move {
            while let Some(message) = source.next().await {
                match message {
                    Ok(Message::Text(text)) => match decode_server_message(&text) {
                        Ok(message) => reader_state.apply(message),
                        Err(e) => warn!(error = %e, "ignoring malformed control message"),
                    },
                    Ok(Message::Binary(data)) => match MediaPacket::decode(&data) {
                        Ok(packet) => reader_state.route_media(packet),
                        Err(e) => warn!(error = %e, "ignoring malformed media packet"),
                    },
                    Ok(Message::Close(frame)) => {
                        let reason = frame
                            .map(|f| f.reason.to_string())
                            .unwrap_or_else(|| "closed by server".to_string());
                        info!(reason = %reason, "room connection closed");
                        reader_state.emit(RoomEvent::Disconnected { reason });
                        break;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        warn!(error = %e, "websocket read failed");
                        reader_state.emit(RoomEvent::Disconnected {
                            reason: e.to_string(),
                        });
                        break;
                    }
                }
            }
            // Ending the feeds ends every outstanding stream.
            reader_state.feeds.clear();
        });

        Ok(Self {
            room_name: room.to_string(),
            local_identity: identity.to_string(),
            state,
            outbound,
            reader,
            writer,
        })
    }

    /// Room name this session is joined to
    pub fn room_name(&self) -> &str {
        &self.room_name
    }

    /// Identity this session joined with
    pub fn local_identity(&self) -> &str {
        &self.local_identity
    }
}

#[async_trait]
impl RoomApi for RoomSession {
    fn remote_participants(&self) -> Vec<RemoteParticipant> {
        self.state
            .participants
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    fn subscribe_events(&self) -> broadcast::Receiver<RoomEvent> {
        self.state.events.subscribe()
    }

    async fn request_subscription(
        &self,
        participant_identity: &str,
        track_sid: &str,
    ) -> Result<(), ProbeError> {
        debug!(identity = %participant_identity, track_sid = %track_sid, "requesting subscription");
        self.outbound
            .send(ClientMessage::Subscribe {
                participant_identity: participant_identity.to_string(),
                track_sid: track_sid.to_string(),
                subscribed: true,
            })
            .map_err(|_| ProbeError::Signaling {
                reason: "session closed, cannot request subscription".to_string(),
            })
    }

    fn take_stream(&self, track_sid: &str) -> Option<MediaStream> {
        self.state.pending_streams.lock().remove(track_sid)
    }
}

impl Drop for RoomSession {
    fn drop(&mut self) {
        let _ = self.outbound.send(ClientMessage::Leave);
        self.reader.abort();
        self.writer.abort();
    }
}

fn encode_client_message(message: &ClientMessage) -> Result<String, ProbeError> {
    serde_json::to_string(message).map_err(|e| ProbeError::Signaling {
        reason: format!("failed to encode client message: {}", e),
    })
}

fn decode_server_message(text: &str) -> Result<ServerMessage, ProbeError> {
    serde_json::from_str(text).map_err(|e| ProbeError::Signaling {
        reason: format!("failed to decode server message: {}", e),
    })
}

/// Map a room service URL onto its websocket RTC endpoint
fn rtc_url(service_url: &str, token: &str) -> String {
    let trimmed = service_url.trim_end_matches('/');
    let base = if let Some(rest) = trimmed.strip_prefix("https://") {
        format!("wss://{}", rest)
    } else if let Some(rest) = trimmed.strip_prefix("http://") {
        format!("ws://{}", rest)
    } else {
        trimmed.to_string()
    };
    format!("{}/rtc?access_token={}", base, token)
}
