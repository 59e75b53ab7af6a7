//! # roomprobe
//!
//! Diagnostic harness for a real-time media room. It provisions access
//! tokens, joins a room as a synthetic `server` participant, locates the
//! `human` participant, subscribes to its camera (and optionally
//! microphone) tracks, and drains the resulting frames indefinitely,
//! primarily to reproduce and observe memory growth under sustained
//! streaming.
//!
//! The interesting part is the discovery choreography: waiting for the
//! participant, waiting for a (kind, source) track publication, waiting for
//! its subscription, then wiring the materialized stream into the drain
//! loop. Everything else is a thin call into the room service.
//!
//! ```rust,no_run
//! use roomprobe::{ParticipantLocator, RoomSession, SessionOptions, TrackDiscovery};
//! use roomprobe::{TrackKind, TrackSource, WaitOptions};
//!
//! # async fn example() -> Result<(), roomprobe_core::ProbeError> {
//! let session = RoomSession::connect(
//!     "wss://rooms.example.com",
//!     "access-token",
//!     "probe-runaway-memory",
//!     "server",
//!     SessionOptions { auto_subscribe: false, dynacast: true },
//! )
//! .await?;
//!
//! let wait = WaitOptions::default();
//! let human = ParticipantLocator::new(&session, "human").locate(&wait).await?;
//! let stream = TrackDiscovery::new(&session, TrackKind::Video, TrackSource::Camera)
//!     .resolve(&human.identity, &wait)
//!     .await?;
//! # let _ = stream;
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod discovery;
pub mod event;
pub mod participant;
pub mod proto;
pub mod room;
pub mod track;

// Re-export main types
pub use discovery::{ParticipantLocator, TrackDiscovery, WaitOptions};
pub use event::RoomEvent;
pub use participant::RemoteParticipant;
pub use room::{RoomApi, RoomSession, SessionOptions};
pub use track::{TrackKind, TrackPublication, TrackSource};

// Re-export the sibling crates' main types for downstream convenience
pub use roomprobe_core::{GrantSet, ProbeConfig, ProbeError, RoomAdmin, RoomIdentity, TokenIssuer};
pub use roomprobe_diagnostics::{DrainOptions, DrainSummary, FrameDrain};
pub use roomprobe_media::{MediaFrame, MediaStream};
