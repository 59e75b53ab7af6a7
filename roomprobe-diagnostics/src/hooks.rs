//! Sampled-frame hooks
//!
//! The drain loop invokes every registered hook once per sampled frame.
//! Hooks are the seam for optional diagnostics (snapshot export, extra
//! logging) so the drain loop itself stays free of hardcoded side effects.

use roomprobe_core::ProbeError;
use roomprobe_media::{snapshot, MediaFrame};
use std::path::PathBuf;
use tracing::{debug, info};

/// Callback invoked on every sampled frame
pub trait SampledFrameHook: Send {
    /// Short name for logging
    fn name(&self) -> &'static str;

    /// Called with the monotonic frame counter and the sampled frame
    fn on_sampled_frame(&mut self, seq: u64, frame: &MediaFrame) -> Result<(), ProbeError>;
}

/// Hook that reports the sampled frame's size
#[derive(Debug, Default)]
pub struct LogReporter;

impl SampledFrameHook for LogReporter {
    fn name(&self) -> &'static str {
        "log-reporter"
    }

    fn on_sampled_frame(&mut self, seq: u64, frame: &MediaFrame) -> Result<(), ProbeError> {
        info!(
            frame = seq,
            kind = frame.kind(),
            bytes = frame.byte_len(),
            "sampled frame"
        );
        Ok(())
    }
}

/// Hook that writes sampled video frames as WebP snapshots
///
/// Only attached when a snapshot directory is configured; audio frames are
/// ignored.
#[derive(Debug)]
pub struct WebpSnapshotHook {
    dir: PathBuf,
    written: u64,
}

impl WebpSnapshotHook {
    /// Create a hook writing into `dir`
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, written: 0 }
    }

    /// Number of snapshots written so far
    pub fn written(&self) -> u64 {
        self.written
    }
}

impl SampledFrameHook for WebpSnapshotHook {
    fn name(&self) -> &'static str {
        "webp-snapshot"
    }

    fn on_sampled_frame(&mut self, seq: u64, frame: &MediaFrame) -> Result<(), ProbeError> {
        let MediaFrame::Video(video) = frame else {
            return Ok(());
        };

        let webp = snapshot::frame_to_webp(video)?;
        let path = self.dir.join(format!("frame-{:08}.webp", seq));
        std::fs::write(&path, &webp)?;
        self.written += 1;
        debug!(path = %path.display(), bytes = webp.len(), "snapshot written");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomprobe_media::{AudioFrame, PixelFormat, VideoFrame};

    fn temp_snapshot_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("roomprobe-test-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_snapshot_hook_writes_video_frames() {
        let dir = temp_snapshot_dir();
        let mut hook = WebpSnapshotHook::new(dir.clone());

        let frame = MediaFrame::Video(VideoFrame {
            width: 32,
            height: 16,
            format: PixelFormat::Rgb24,
            timestamp_us: 0,
            data: vec![0x20; 32 * 16 * 3],
        });
        hook.on_sampled_frame(200, &frame).unwrap();

        assert_eq!(hook.written(), 1);
        assert!(dir.join("frame-00000200.webp").exists());
        std::fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_snapshot_hook_skips_audio() {
        let dir = temp_snapshot_dir();
        let mut hook = WebpSnapshotHook::new(dir.clone());

        let frame = MediaFrame::Audio(AudioFrame {
            sample_rate: 48_000,
            channels: 2,
            timestamp_us: 0,
            data: vec![0u8; 960],
        });
        hook.on_sampled_frame(200, &frame).unwrap();

        assert_eq!(hook.written(), 0);
        std::fs::remove_dir_all(dir).unwrap();
    }
}
