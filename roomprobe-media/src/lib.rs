//! # roomprobe media
//!
//! Media-side building blocks for the roomprobe harness: raw frame types,
//! the consumable [`MediaStream`], the binary wire framing media packets
//! arrive in, and WebP snapshot encoding for sampled video frames.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod frames;
pub mod snapshot;
pub mod stream;
pub mod wire;

// Re-export main types
pub use frames::{AudioFrame, MediaFrame, PixelFormat, VideoFrame};
pub use stream::MediaStream;
pub use wire::MediaPacket;
