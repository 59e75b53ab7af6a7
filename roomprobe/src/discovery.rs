//! Participant and track discovery
//!
//! The waiting core of the harness: resolve the human participant and the
//! (kind, source) track pair to drain, suspending on the room event bus
//! until the required event arrives. Every wait runs through one bounded
//! loop honoring [`WaitOptions`]; with default options a wait is unbounded,
//! matching the harness's original behavior of idling until the room
//! produces what it is looking for.

use crate::event::RoomEvent;
use crate::participant::RemoteParticipant;
use crate::room::RoomApi;
use crate::track::{TrackKind, TrackPublication, TrackSource};
use roomprobe_core::ProbeError;
use roomprobe_media::MediaStream;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Bounds on a discovery wait
///
/// All fields default to `None`: no deadline, no cancellation, no attempt
/// limit.
#[derive(Debug, Clone, Default)]
pub struct WaitOptions {
    /// Give up after this long
    pub deadline: Option<Duration>,
    /// External cancellation signal
    pub cancel: Option<CancellationToken>,
    /// Give up after inspecting this many events
    pub max_attempts: Option<u32>,
}

/// Wait for the next event matching `predicate`
///
/// Consumes events from `receiver` in a loop, counting each inspected event
/// as one attempt. The receiver is dropped by the caller on return, so the
/// listener never outlives its single use.
async fn next_matching_event<F>(
    receiver: &mut broadcast::Receiver<RoomEvent>,
    options: &WaitOptions,
    operation: &str,
    mut predicate: F,
) -> Result<RoomEvent, ProbeError>
where
    F: FnMut(&RoomEvent) -> bool,
{
    let started = tokio::time::Instant::now();
    let deadline_at = options.deadline.map(|d| started + d);
    let mut attempts: u32 = 0;

    loop {
        let event = tokio::select! {
            event = receiver.recv() => event,
            _ = sleep_until_opt(deadline_at) => {
                return Err(ProbeError::WaitTimeout {
                    operation: operation.to_string(),
                    waited: started.elapsed(),
                });
            }
            _ = cancelled_opt(options.cancel.as_ref()) => {
                return Err(ProbeError::WaitCancelled {
                    operation: operation.to_string(),
                });
            }
        };

        let event = match event {
            Ok(event) => event,
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(operation, skipped, "event bus lagged while waiting");
                continue;
            }
            Err(broadcast::error::RecvError::Closed) => {
                return Err(ProbeError::EventBusClosed {
                    operation: operation.to_string(),
                });
            }
        };

        attempts += 1;
        if predicate(&event) {
            return Ok(event);
        }
        debug!(operation, ignored = event.event_type(), "ignoring non-matching event");
        if let Some(max) = options.max_attempts {
            if attempts >= max {
                return Err(ProbeError::WaitExhausted {
                    operation: operation.to_string(),
                    attempts,
                });
            }
        }
    }
}

async fn sleep_until_opt(deadline: Option<tokio::time::Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

async fn cancelled_opt(token: Option<&CancellationToken>) {
    match token {
        Some(token) => token.cancelled().await,
        None => std::future::pending().await,
    }
}

/// Resolves a remote participant by identity, waiting for it to connect
/// when absent
#[derive(Debug)]
pub struct ParticipantLocator<'a, R: RoomApi + ?Sized> {
    room: &'a R,
    identity: String,
}

impl<'a, R: RoomApi + ?Sized> ParticipantLocator<'a, R> {
    /// Create a locator for `identity`
    pub fn new(room: &'a R, identity: &str) -> Self {
        Self {
            room,
            identity: identity.to_string(),
        }
    }

    /// Resolve the participant
    ///
    /// The event receiver is attached before the snapshot scan so a
    /// participant connecting between the two cannot be missed; the result
    /// is identical whichever path finds it.
    pub async fn locate(&self, options: &WaitOptions) -> Result<RemoteParticipant, ProbeError> {
        let mut events = self.room.subscribe_events();

        if let Some(participant) = self
            .room
            .remote_participants()
            .into_iter()
            .find(|p| p.identity == self.identity)
        {
            debug!(identity = %self.identity, "participant found in snapshot");
            return Ok(participant);
        }

        info!(identity = %self.identity, "participant absent, waiting for connect");
        let operation = format!("participant '{}' to connect", self.identity);
        let event = next_matching_event(&mut events, options, &operation, |event| {
            matches!(
                event,
                RoomEvent::ParticipantConnected { participant } if participant.identity == self.identity
            )
        })
        .await
        .map_err(|e| {
            error!(identity = %self.identity, error = %e, "participant wait failed");
            e
        })?;

        let RoomEvent::ParticipantConnected { participant } = event else {
            return Err(ProbeError::Signaling {
                reason: "participant wait resolved with a foreign event".to_string(),
            });
        };
        info!(identity = %participant.identity, "participant connected");
        Ok(participant)
    }
}

/// Resolves one (kind, source) track pair of a participant into a
/// consumable media stream
///
/// States: no publication, publication found, subscribed. The
/// published-to-subscribed transition is driven explicitly by a subscribe
/// request; the subscribed wait is scoped to the target publication's sid
/// so concurrent discoveries of different kinds cannot resolve each other's
/// tracks.
#[derive(Debug)]
pub struct TrackDiscovery<'a, R: RoomApi + ?Sized> {
    room: &'a R,
    kind: TrackKind,
    source: TrackSource,
}

impl<'a, R: RoomApi + ?Sized> TrackDiscovery<'a, R> {
    /// Create a discovery for the (kind, source) pair
    pub fn new(room: &'a R, kind: TrackKind, source: TrackSource) -> Self {
        Self { room, kind, source }
    }

    /// Resolve the pair for `participant_identity` into a media stream
    pub async fn resolve(
        &self,
        participant_identity: &str,
        options: &WaitOptions,
    ) -> Result<MediaStream, ProbeError> {
        self.resolve_inner(participant_identity, options)
            .await
            .map_err(|e| {
                error!(
                    identity = %participant_identity,
                    kind = %self.kind,
                    source = %self.source,
                    error = %e,
                    code = e.error_code(),
                    "track discovery failed"
                );
                e
            })
    }

    async fn resolve_inner(
        &self,
        participant_identity: &str,
        options: &WaitOptions,
    ) -> Result<MediaStream, ProbeError> {
        let mut events = self.room.subscribe_events();

        let publication = match self.scan_publications(participant_identity) {
            Some(publication) => {
                debug!(track_sid = %publication.sid, "publication found in snapshot");
                publication
            }
            None => {
                info!(
                    identity = %participant_identity,
                    kind = %self.kind,
                    source = %self.source,
                    "publication absent, waiting for publish"
                );
                self.wait_for_publication(&mut events, participant_identity, options)
                    .await?
            }
        };

        self.room
            .request_subscription(participant_identity, &publication.sid)
            .await?;

        // Already materialized when the service confirmed a subscription
        // earlier (or auto-subscribe was on).
        if let Some(stream) = self.room.take_stream(&publication.sid) {
            debug!(track_sid = %publication.sid, "stream already materialized");
            return Ok(stream);
        }

        let operation = format!("track {} to be subscribed", publication.sid);
        next_matching_event(&mut events, options, &operation, |event| {
            matches!(
                event,
                RoomEvent::TrackSubscribed { participant_identity: identity, track_sid }
                    if identity == participant_identity && *track_sid == publication.sid
            )
        })
        .await?;

        self.room
            .take_stream(&publication.sid)
            .ok_or_else(|| ProbeError::TrackResolution {
                track_sid: publication.sid.clone(),
            })
    }

    fn scan_publications(&self, participant_identity: &str) -> Option<TrackPublication> {
        self.room
            .remote_participants()
            .iter()
            .find(|p| p.identity == participant_identity)
            .and_then(|p| p.publication_matching(self.kind, self.source))
            .cloned()
    }

    async fn wait_for_publication(
        &self,
        events: &mut broadcast::Receiver<RoomEvent>,
        participant_identity: &str,
        options: &WaitOptions,
    ) -> Result<TrackPublication, ProbeError> {
        let operation = format!("{}/{} track of '{}'", self.kind, self.source, participant_identity);
        let event = next_matching_event(events, options, &operation, |event| {
            matches!(
                event,
                RoomEvent::TrackPublished { participant_identity: identity, publication }
                    if identity == participant_identity
                        && publication.matches(self.kind, self.source)
            )
        })
        .await?;

        let RoomEvent::TrackPublished { publication, .. } = event else {
            return Err(ProbeError::Signaling {
                reason: "publication wait resolved with a foreign event".to_string(),
            });
        };
        info!(track_sid = %publication.sid, "publication appeared");
        Ok(publication)
    }
}
