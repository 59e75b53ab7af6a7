//! Consumable media streams

use crate::frames::MediaFrame;
use tokio::sync::mpsc;

/// A live, unbounded, non-restartable sequence of media frames
///
/// Produced by the room session once a track subscription materializes and
/// consumed exclusively by the frame drain loop. Taking the stream out of
/// the session transfers ownership; there is no way to rewind or re-open it.
/// The channel is unbounded: no backpressure contract beyond what the
/// underlying transport provides.
#[derive(Debug)]
pub struct MediaStream {
    track_sid: String,
    receiver: mpsc::UnboundedReceiver<MediaFrame>,
}

impl MediaStream {
    /// Create a stream together with the sender that feeds it
    pub fn channel(track_sid: &str) -> (mpsc::UnboundedSender<MediaFrame>, Self) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (
            sender,
            Self {
                track_sid: track_sid.to_string(),
                receiver,
            },
        )
    }

    /// Sid of the track this stream carries
    pub fn track_sid(&self) -> &str {
        &self.track_sid
    }

    /// Next frame, `None` once the track ends and the feed is dropped
    pub async fn next(&mut self) -> Option<MediaFrame> {
        self.receiver.recv().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frames::{AudioFrame, MediaFrame};
    use tokio_test::assert_ok;

    #[tokio::test]
    async fn test_stream_ends_when_feed_drops() {
        let (sender, mut stream) = MediaStream::channel("TR_audio");
        assert_eq!(stream.track_sid(), "TR_audio");

        assert_ok!(sender.send(MediaFrame::Audio(AudioFrame {
            sample_rate: 48_000,
            channels: 2,
            timestamp_us: 0,
            data: vec![0u8; 960],
        })));
        drop(sender);

        assert_eq!(stream.next().await.unwrap().byte_len(), 960);
        assert!(stream.next().await.is_none());
    }
}
