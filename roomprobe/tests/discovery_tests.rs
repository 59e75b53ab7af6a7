//! Discovery state-machine tests against an in-memory room.

use async_trait::async_trait;
use parking_lot::Mutex;
use roomprobe::{
    ParticipantLocator, RemoteParticipant, RoomApi, RoomEvent, TrackDiscovery, TrackKind,
    TrackPublication, TrackSource, WaitOptions,
};
use roomprobe_core::ProbeError;
use roomprobe_media::{AudioFrame, MediaFrame, MediaStream};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tokio_test::assert_ok;
use tokio_util::sync::CancellationToken;

/// In-memory stand-in for a room session.
struct FakeRoom {
    participants: Mutex<Vec<RemoteParticipant>>,
    events: broadcast::Sender<RoomEvent>,
    streams: Mutex<HashMap<String, MediaStream>>,
    subscription_requests: Mutex<Vec<String>>,
}

impl FakeRoom {
    fn new() -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            participants: Mutex::new(Vec::new()),
            events,
            streams: Mutex::new(HashMap::new()),
            subscription_requests: Mutex::new(Vec::new()),
        })
    }

    fn add_participant(&self, participant: RemoteParticipant) {
        self.participants.lock().push(participant);
    }

    fn emit(&self, event: RoomEvent) {
        self.events.send(event).expect("no listener attached");
    }

    /// Stash a materialized stream for `track_sid`, returning its feed.
    fn materialize(&self, track_sid: &str) -> tokio::sync::mpsc::UnboundedSender<MediaFrame> {
        let (sender, stream) = MediaStream::channel(track_sid);
        self.streams.lock().insert(track_sid.to_string(), stream);
        sender
    }
}

#[async_trait]
impl RoomApi for FakeRoom {
    fn remote_participants(&self) -> Vec<RemoteParticipant> {
        self.participants.lock().clone()
    }

    fn subscribe_events(&self) -> broadcast::Receiver<RoomEvent> {
        self.events.subscribe()
    }

    async fn request_subscription(
        &self,
        _participant_identity: &str,
        track_sid: &str,
    ) -> Result<(), ProbeError> {
        self.subscription_requests.lock().push(track_sid.to_string());
        Ok(())
    }

    fn take_stream(&self, track_sid: &str) -> Option<MediaStream> {
        self.streams.lock().remove(track_sid)
    }
}

fn human() -> RemoteParticipant {
    RemoteParticipant {
        sid: "PA_human".to_string(),
        identity: "human".to_string(),
        publications: vec![],
    }
}

fn publication(sid: &str, kind: TrackKind, source: TrackSource) -> TrackPublication {
    TrackPublication {
        sid: sid.to_string(),
        name: source.to_string(),
        kind,
        source,
        subscribed: false,
    }
}

fn audio_frame() -> MediaFrame {
    MediaFrame::Audio(AudioFrame {
        sample_rate: 48_000,
        channels: 1,
        timestamp_us: 0,
        data: vec![0u8; 32],
    })
}

#[tokio::test]
async fn locator_returns_immediately_from_snapshot() {
    let room = FakeRoom::new();
    room.add_participant(human());

    let found = assert_ok!(
        ParticipantLocator::new(room.as_ref(), "human")
            .locate(&WaitOptions::default())
            .await
    );
    assert_eq!(found.identity, "human");
    assert_eq!(found.sid, "PA_human");
}

#[tokio::test]
async fn locator_resolves_once_on_matching_connect_event() {
    let room = FakeRoom::new();

    let emitter = Arc::clone(&room);
    let task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        // A non-matching participant first; the locator must keep waiting.
        emitter.emit(RoomEvent::ParticipantConnected {
            participant: RemoteParticipant {
                sid: "PA_other".to_string(),
                identity: "other".to_string(),
                publications: vec![],
            },
        });
        emitter.emit(RoomEvent::ParticipantConnected {
            participant: human(),
        });
    });

    let found = ParticipantLocator::new(room.as_ref(), "human")
        .locate(&WaitOptions::default())
        .await
        .unwrap();
    assert_eq!(found.identity, "human");
    task.await.unwrap();
}

#[tokio::test]
async fn locator_result_is_identical_across_both_paths() {
    // Snapshot path.
    let room = FakeRoom::new();
    room.add_participant(human());
    let via_snapshot = ParticipantLocator::new(room.as_ref(), "human")
        .locate(&WaitOptions::default())
        .await
        .unwrap();

    // Event path.
    let room = FakeRoom::new();
    let emitter = Arc::clone(&room);
    let task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        emitter.emit(RoomEvent::ParticipantConnected {
            participant: human(),
        });
    });
    let via_event = ParticipantLocator::new(room.as_ref(), "human")
        .locate(&WaitOptions::default())
        .await
        .unwrap();
    task.await.unwrap();

    assert_eq!(via_snapshot, via_event);
}

#[tokio::test]
async fn locator_times_out_when_deadline_elapses() {
    let room = FakeRoom::new();
    let options = WaitOptions {
        deadline: Some(Duration::from_millis(30)),
        ..WaitOptions::default()
    };

    let err = ParticipantLocator::new(room.as_ref(), "human")
        .locate(&options)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "WAIT_TIMEOUT");
}

#[tokio::test]
async fn locator_stops_on_cancellation() {
    let room = FakeRoom::new();
    let cancel = CancellationToken::new();
    let options = WaitOptions {
        cancel: Some(cancel.clone()),
        ..WaitOptions::default()
    };

    let canceller = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        canceller.cancel();
    });

    let err = ParticipantLocator::new(room.as_ref(), "human")
        .locate(&options)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "WAIT_CANCELLED");
}

#[tokio::test]
async fn locator_gives_up_after_max_attempts() {
    let room = FakeRoom::new();
    let options = WaitOptions {
        max_attempts: Some(2),
        ..WaitOptions::default()
    };

    let emitter = Arc::clone(&room);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        for i in 0..3 {
            emitter.emit(RoomEvent::ParticipantDisconnected {
                identity: format!("stranger-{}", i),
            });
        }
    });

    let err = ParticipantLocator::new(room.as_ref(), "human")
        .locate(&options)
        .await
        .unwrap_err();
    assert_eq!(err.error_code(), "WAIT_EXHAUSTED");
}

#[tokio::test]
async fn discovery_resolves_from_publication_snapshot() {
    let room = FakeRoom::new();
    let mut participant = human();
    participant
        .publications
        .push(publication("TR_cam01", TrackKind::Video, TrackSource::Camera));
    room.add_participant(participant);
    room.materialize("TR_cam01");

    let stream = TrackDiscovery::new(room.as_ref(), TrackKind::Video, TrackSource::Camera)
        .resolve("human", &WaitOptions::default())
        .await
        .unwrap();

    assert_eq!(stream.track_sid(), "TR_cam01");
    assert_eq!(*room.subscription_requests.lock(), vec!["TR_cam01"]);
}

#[tokio::test]
async fn discovery_ignores_non_matching_publications() {
    let room = FakeRoom::new();
    room.add_participant(human());

    let emitter = Arc::clone(&room);
    let task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        // Audio/microphone arrives first; video/camera discovery must not
        // advance on it.
        emitter.emit(RoomEvent::TrackPublished {
            participant_identity: "human".to_string(),
            publication: publication("TR_mic01", TrackKind::Audio, TrackSource::Microphone),
        });
        // Same kind, wrong source.
        emitter.emit(RoomEvent::TrackPublished {
            participant_identity: "human".to_string(),
            publication: publication("TR_screen", TrackKind::Video, TrackSource::Screen),
        });
        emitter.materialize("TR_cam01");
        emitter.emit(RoomEvent::TrackPublished {
            participant_identity: "human".to_string(),
            publication: publication("TR_cam01", TrackKind::Video, TrackSource::Camera),
        });
    });

    let stream = TrackDiscovery::new(room.as_ref(), TrackKind::Video, TrackSource::Camera)
        .resolve("human", &WaitOptions::default())
        .await
        .unwrap();
    task.await.unwrap();

    assert_eq!(stream.track_sid(), "TR_cam01");
    assert_eq!(*room.subscription_requests.lock(), vec!["TR_cam01"]);
}

#[tokio::test]
async fn discovery_waits_for_subscription_to_materialize() {
    let room = FakeRoom::new();
    let mut participant = human();
    participant
        .publications
        .push(publication("TR_cam01", TrackKind::Video, TrackSource::Camera));
    room.add_participant(participant);

    let emitter = Arc::clone(&room);
    let task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        let feed = emitter.materialize("TR_cam01");
        emitter.emit(RoomEvent::TrackSubscribed {
            participant_identity: "human".to_string(),
            track_sid: "TR_cam01".to_string(),
        });
        feed.send(audio_frame()).unwrap();
    });

    let mut stream = TrackDiscovery::new(room.as_ref(), TrackKind::Video, TrackSource::Camera)
        .resolve("human", &WaitOptions::default())
        .await
        .unwrap();
    task.await.unwrap();

    assert_eq!(stream.track_sid(), "TR_cam01");
    assert!(stream.next().await.is_some());
}

#[tokio::test]
async fn concurrent_discoveries_resolve_their_own_tracks() {
    let room = FakeRoom::new();
    let mut participant = human();
    participant
        .publications
        .push(publication("TR_cam01", TrackKind::Video, TrackSource::Camera));
    participant
        .publications
        .push(publication("TR_mic01", TrackKind::Audio, TrackSource::Microphone));
    room.add_participant(participant);

    let emitter = Arc::clone(&room);
    let task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        // Confirm the audio subscription first. The video discovery's
        // subscribed wait is scoped by sid, so it must not resolve on it.
        emitter.materialize("TR_mic01");
        emitter.emit(RoomEvent::TrackSubscribed {
            participant_identity: "human".to_string(),
            track_sid: "TR_mic01".to_string(),
        });
        emitter.materialize("TR_cam01");
        emitter.emit(RoomEvent::TrackSubscribed {
            participant_identity: "human".to_string(),
            track_sid: "TR_cam01".to_string(),
        });
    });

    let video = TrackDiscovery::new(room.as_ref(), TrackKind::Video, TrackSource::Camera);
    let audio = TrackDiscovery::new(room.as_ref(), TrackKind::Audio, TrackSource::Microphone);
    let wait = WaitOptions::default();
    let (video_stream, audio_stream) = tokio::try_join!(
        video.resolve("human", &wait),
        audio.resolve("human", &wait),
    )
    .unwrap();
    task.await.unwrap();

    assert_eq!(video_stream.track_sid(), "TR_cam01");
    assert_eq!(audio_stream.track_sid(), "TR_mic01");
}

#[tokio::test]
async fn subscribed_event_without_stream_is_a_resolution_error() {
    let room = FakeRoom::new();
    let mut participant = human();
    participant
        .publications
        .push(publication("TR_cam01", TrackKind::Video, TrackSource::Camera));
    room.add_participant(participant);

    let emitter = Arc::clone(&room);
    let task = tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        // Subscription confirmed but no stream ever materializes.
        emitter.emit(RoomEvent::TrackSubscribed {
            participant_identity: "human".to_string(),
            track_sid: "TR_cam01".to_string(),
        });
    });

    let err = TrackDiscovery::new(room.as_ref(), TrackKind::Video, TrackSource::Camera)
        .resolve("human", &WaitOptions::default())
        .await
        .unwrap_err();
    task.await.unwrap();

    assert_eq!(err.error_code(), "TRACK_RESOLUTION_FAILED");
}
