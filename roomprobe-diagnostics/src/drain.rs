//! Frame drain loop
//!
//! Consumes a media stream until it ends, keeping a monotonic frame counter
//! and invoking the registered hooks on a fixed sampling cadence. This is
//! the piece that keeps the process busy while memory growth is observed.

use crate::hooks::SampledFrameHook;
use crate::memory::MemoryReport;
use roomprobe_core::ProbeError;
use roomprobe_media::MediaStream;
use std::time::Duration;
use tracing::{info, warn};

/// Options for a drain run
#[derive(Debug, Clone)]
pub struct DrainOptions {
    /// Invoke hooks once per this many consumed frames (`0` disables sampling)
    pub sample_every: u64,
    /// Interval between process-memory reports, `None` disables them
    pub memory_report_interval: Option<Duration>,
}

impl Default for DrainOptions {
    fn default() -> Self {
        Self {
            sample_every: 200,
            memory_report_interval: Some(Duration::from_secs(30)),
        }
    }
}

/// What a completed drain run consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainSummary {
    /// Total frames consumed
    pub frames: u64,
    /// Total payload bytes consumed
    pub bytes: u64,
}

/// Drains a media stream, sampling frames through hooks
pub struct FrameDrain {
    options: DrainOptions,
    hooks: Vec<Box<dyn SampledFrameHook>>,
}

impl FrameDrain {
    /// Create a drain with the given options and no hooks
    pub fn new(options: DrainOptions) -> Self {
        Self {
            options,
            hooks: Vec::new(),
        }
    }

    /// Register a sampled-frame hook
    pub fn add_hook(&mut self, hook: Box<dyn SampledFrameHook>) -> &mut Self {
        self.hooks.push(hook);
        self
    }

    /// Consume `stream` until it ends
    ///
    /// The loop has no natural termination of its own: it returns only when
    /// the stream ends (track unpublished or session disconnected) or a hook
    /// fails. Hook failures propagate; the harness treats every failure as
    /// fatal rather than recovering partially.
    pub async fn run(mut self, mut stream: MediaStream) -> Result<DrainSummary, ProbeError> {
        info!(
            track_sid = stream.track_sid(),
            sample_every = self.options.sample_every,
            "draining stream"
        );

        let mut report_timer = self.options.memory_report_interval.map(tokio::time::interval);
        if let Some(timer) = report_timer.as_mut() {
            // An interval yields immediately; swallow that first tick so the
            // first report lands one full period in.
            timer.tick().await;
        }

        let mut frames: u64 = 0;
        let mut bytes: u64 = 0;

        loop {
            tokio::select! {
                frame = stream.next() => {
                    let Some(frame) = frame else {
                        break;
                    };
                    frames += 1;
                    bytes += frame.byte_len() as u64;
                    // A cadence of zero disables sampling instead of
                    // dividing by it.
                    if self.options.sample_every > 0 && frames % self.options.sample_every == 0 {
                        for hook in &mut self.hooks {
                            if let Err(e) = hook.on_sampled_frame(frames, &frame) {
                                warn!(hook = hook.name(), error = %e, "sampled-frame hook failed");
                                return Err(e);
                            }
                        }
                    }
                }
                _ = tick(&mut report_timer) => {
                    MemoryReport::sample().log();
                }
            }
        }

        info!(frames, bytes, "stream ended");
        Ok(DrainSummary { frames, bytes })
    }
}

async fn tick(timer: &mut Option<tokio::time::Interval>) {
    match timer {
        Some(timer) => {
            timer.tick().await;
        }
        None => std::future::pending().await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomprobe_media::{AudioFrame, MediaFrame, MediaStream};
    use std::sync::atomic::{AtomicU64, Ordering};
    use tokio_test::assert_ok;
    use std::sync::Arc;

    struct CountingHook {
        calls: Arc<AtomicU64>,
        last_seq: Arc<AtomicU64>,
    }

    impl SampledFrameHook for CountingHook {
        fn name(&self) -> &'static str {
            "counting"
        }

        fn on_sampled_frame(&mut self, seq: u64, _frame: &MediaFrame) -> Result<(), ProbeError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            // Counter must be monotonic: every observed seq is larger than
            // the previous one.
            let prev = self.last_seq.swap(seq, Ordering::SeqCst);
            assert!(seq > prev || prev == 0);
            Ok(())
        }
    }

    fn audio_frame(bytes: usize) -> MediaFrame {
        MediaFrame::Audio(AudioFrame {
            sample_rate: 48_000,
            channels: 1,
            timestamp_us: 0,
            data: vec![0u8; bytes],
        })
    }

    #[tokio::test]
    async fn test_one_sample_per_n_frames() {
        let (sender, stream) = MediaStream::channel("TR_mic01");
        for _ in 0..25 {
            sender.send(audio_frame(960)).unwrap();
        }
        drop(sender);

        let calls = Arc::new(AtomicU64::new(0));
        let last_seq = Arc::new(AtomicU64::new(0));
        let mut drain = FrameDrain::new(DrainOptions {
            sample_every: 10,
            memory_report_interval: None,
        });
        drain.add_hook(Box::new(CountingHook {
            calls: calls.clone(),
            last_seq: last_seq.clone(),
        }));

        let summary = assert_ok!(drain.run(stream).await);
        assert_eq!(summary.frames, 25);
        assert_eq!(summary.bytes, 25 * 960);
        // Frames 10 and 20 sampled; 25 total frames, N = 10.
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(last_seq.load(Ordering::SeqCst), 20);
    }

    #[tokio::test]
    async fn test_hook_failure_is_fatal() {
        struct FailingHook;
        impl SampledFrameHook for FailingHook {
            fn name(&self) -> &'static str {
                "failing"
            }
            fn on_sampled_frame(
                &mut self,
                _seq: u64,
                _frame: &MediaFrame,
            ) -> Result<(), ProbeError> {
                Err(ProbeError::Encoding {
                    reason: "boom".to_string(),
                })
            }
        }

        let (sender, stream) = MediaStream::channel("TR_mic01");
        sender.send(audio_frame(16)).unwrap();
        drop(sender);

        let mut drain = FrameDrain::new(DrainOptions {
            sample_every: 1,
            memory_report_interval: None,
        });
        drain.add_hook(Box::new(FailingHook));
        let err = drain.run(stream).await.unwrap_err();
        assert_eq!(err.error_code(), "ENCODING_FAILED");
    }

    #[tokio::test]
    async fn test_zero_cadence_disables_sampling() {
        let (sender, stream) = MediaStream::channel("TR_mic01");
        for _ in 0..5 {
            sender.send(audio_frame(16)).unwrap();
        }
        drop(sender);

        let calls = Arc::new(AtomicU64::new(0));
        let mut drain = FrameDrain::new(DrainOptions {
            sample_every: 0,
            memory_report_interval: None,
        });
        drain.add_hook(Box::new(CountingHook {
            calls: calls.clone(),
            last_seq: Arc::new(AtomicU64::new(0)),
        }));

        let summary = assert_ok!(drain.run(stream).await);
        assert_eq!(summary.frames, 5);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_empty_stream_ends_cleanly() {
        let (sender, stream) = MediaStream::channel("TR_mic01");
        drop(sender);

        let summary = FrameDrain::new(DrainOptions::default())
            .run(stream)
            .await
            .unwrap();
        assert_eq!(summary, DrainSummary { frames: 0, bytes: 0 });
    }
}
