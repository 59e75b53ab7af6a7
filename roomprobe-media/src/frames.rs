//! Media frame types

use serde::{Deserialize, Serialize};

/// Pixel layout of a raw video frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PixelFormat {
    /// Packed 8-bit RGB, 3 bytes per pixel
    Rgb24,
    /// Planar YUV 4:2:0
    I420,
}

/// Raw video frame
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Frame width in pixels
    pub width: u32,
    /// Frame height in pixels
    pub height: u32,
    /// Pixel layout of `data`
    pub format: PixelFormat,
    /// Capture timestamp in microseconds
    pub timestamp_us: u64,
    /// Raw pixel buffer
    pub data: Vec<u8>,
}

/// Raw audio frame (PCM)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u8,
    /// Capture timestamp in microseconds
    pub timestamp_us: u64,
    /// Interleaved 16-bit PCM sample bytes
    pub data: Vec<u8>,
}

/// A single media frame of either kind
#[derive(Debug, Clone)]
pub enum MediaFrame {
    /// Video frame
    Video(VideoFrame),
    /// Audio frame
    Audio(AudioFrame),
}

impl MediaFrame {
    /// Payload size in bytes
    pub fn byte_len(&self) -> usize {
        match self {
            MediaFrame::Video(frame) => frame.data.len(),
            MediaFrame::Audio(frame) => frame.data.len(),
        }
    }

    /// Capture timestamp in microseconds
    pub fn timestamp_us(&self) -> u64 {
        match self {
            MediaFrame::Video(frame) => frame.timestamp_us,
            MediaFrame::Audio(frame) => frame.timestamp_us,
        }
    }

    /// Frame kind as a string, for logging
    pub fn kind(&self) -> &'static str {
        match self {
            MediaFrame::Video(..) => "video",
            MediaFrame::Audio(..) => "audio",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_len_counts_payload_only() {
        let frame = MediaFrame::Video(VideoFrame {
            width: 4,
            height: 2,
            format: PixelFormat::Rgb24,
            timestamp_us: 7,
            data: vec![0u8; 4 * 2 * 3],
        });
        assert_eq!(frame.byte_len(), 24);
        assert_eq!(frame.kind(), "video");
        assert_eq!(frame.timestamp_us(), 7);
    }
}
