//! # roomprobe diagnostics
//!
//! The observation side of the harness: the frame drain loop that consumes
//! a media stream indefinitely, the pluggable hooks invoked on sampled
//! frames, and the periodic process-memory report used while chasing
//! memory growth under sustained streaming.

#![deny(missing_docs)]
#![warn(clippy::all)]

pub mod drain;
pub mod hooks;
pub mod memory;

// Re-export main types
pub use drain::{DrainOptions, DrainSummary, FrameDrain};
pub use hooks::{LogReporter, SampledFrameHook, WebpSnapshotHook};
pub use memory::MemoryReport;
