//! WebP snapshot encoding for sampled video frames
//!
//! Mirrors the manual-inspection path of the harness: flip the frame
//! vertically (capture buffers arrive bottom-up), shrink it to fit within
//! [`SNAPSHOT_MAX_DIM`] while preserving aspect ratio, and encode WebP.
//! The `image` crate's WebP encoder is lossless-only, so no quality knob.

use crate::frames::{PixelFormat, VideoFrame};
use image::{imageops::FilterType, DynamicImage, ExtendedColorType, RgbImage};
use roomprobe_core::ProbeError;

/// Snapshots are bounded to this many pixels on the longer side
pub const SNAPSHOT_MAX_DIM: u32 = 512;

/// Encode a raw RGB24 video frame as a WebP image
///
/// Frames in any other pixel format are rejected; the session delivers
/// camera tracks as RGB24 and conversion is out of scope for the harness.
pub fn frame_to_webp(frame: &VideoFrame) -> Result<Vec<u8>, ProbeError> {
    if frame.format != PixelFormat::Rgb24 {
        return Err(ProbeError::Encoding {
            reason: format!("snapshot requires RGB24 frames, got {:?}", frame.format),
        });
    }

    let expected = frame.width as usize * frame.height as usize * 3;
    if frame.data.len() != expected {
        return Err(ProbeError::Encoding {
            reason: format!(
                "frame buffer is {} bytes, expected {} for {}x{} RGB24",
                frame.data.len(),
                expected,
                frame.width,
                frame.height
            ),
        });
    }

    let img = RgbImage::from_raw(frame.width, frame.height, frame.data.clone()).ok_or_else(
        || ProbeError::Encoding {
            reason: "frame buffer did not form an image".to_string(),
        },
    )?;

    let flipped = image::imageops::flip_vertical(&img);
    let resized = DynamicImage::ImageRgb8(flipped)
        .resize(SNAPSHOT_MAX_DIM, SNAPSHOT_MAX_DIM, FilterType::Triangle)
        .to_rgb8();

    let mut out = Vec::new();
    image::codecs::webp::WebPEncoder::new_lossless(&mut out)
        .encode(
            resized.as_raw(),
            resized.width(),
            resized.height(),
            ExtendedColorType::Rgb8,
        )
        .map_err(|e| ProbeError::Encoding {
            reason: format!("webp encode failed: {}", e),
        })?;
    Ok(out)
}
