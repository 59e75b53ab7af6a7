//! Binary wire framing for media packets
//!
//! Media frames arrive from the room service as binary websocket messages.
//! Layout, all integers big-endian:
//!
//! ```text
//! kind:u8  sid_len:u16  sid:bytes  timestamp_us:u64
//!   video: format:u8  width:u32  height:u32
//!   audio: sample_rate:u32  channels:u8
//! payload_len:u32  payload:bytes
//! ```

use crate::frames::{AudioFrame, MediaFrame, PixelFormat, VideoFrame};
use bytes::{Buf, BufMut, BytesMut};
use roomprobe_core::ProbeError;

const KIND_VIDEO: u8 = 0;
const KIND_AUDIO: u8 = 1;

const FORMAT_RGB24: u8 = 0;
const FORMAT_I420: u8 = 1;

/// A media frame tagged with the track it belongs to
#[derive(Debug, Clone)]
pub struct MediaPacket {
    /// Sid of the track the frame belongs to
    pub track_sid: String,
    /// The frame itself
    pub frame: MediaFrame,
}

impl MediaPacket {
    /// Encode into wire bytes
    ///
    /// Fails when the track sid exceeds the 16-bit length prefix.
    pub fn encode(&self) -> Result<Vec<u8>, ProbeError> {
        if self.track_sid.len() > u16::MAX as usize {
            return Err(ProbeError::Signaling {
                reason: format!(
                    "track sid is {} bytes, wire limit is {}",
                    self.track_sid.len(),
                    u16::MAX
                ),
            });
        }

        let mut buf = BytesMut::with_capacity(32 + self.frame.byte_len());
        match &self.frame {
            MediaFrame::Video(frame) => {
                buf.put_u8(KIND_VIDEO);
                put_sid(&mut buf, &self.track_sid);
                buf.put_u64(frame.timestamp_us);
                buf.put_u8(match frame.format {
                    PixelFormat::Rgb24 => FORMAT_RGB24,
                    PixelFormat::I420 => FORMAT_I420,
                });
                buf.put_u32(frame.width);
                buf.put_u32(frame.height);
                buf.put_u32(frame.data.len() as u32);
                buf.put_slice(&frame.data);
            }
            MediaFrame::Audio(frame) => {
                buf.put_u8(KIND_AUDIO);
                put_sid(&mut buf, &self.track_sid);
                buf.put_u64(frame.timestamp_us);
                buf.put_u32(frame.sample_rate);
                buf.put_u8(frame.channels);
                buf.put_u32(frame.data.len() as u32);
                buf.put_slice(&frame.data);
            }
        }
        Ok(buf.to_vec())
    }

    /// Decode from wire bytes
    pub fn decode(mut data: &[u8]) -> Result<Self, ProbeError> {
        let kind = take_u8(&mut data, "kind")?;
        let sid_len = take_u16(&mut data, "sid length")? as usize;
        if data.remaining() < sid_len {
            return Err(malformed("sid truncated"));
        }
        let track_sid = String::from_utf8(data.copy_to_bytes(sid_len).to_vec())
            .map_err(|_| malformed("sid is not valid utf-8"))?;
        let timestamp_us = take_u64(&mut data, "timestamp")?;

        let frame = match kind {
            KIND_VIDEO => {
                let format = match take_u8(&mut data, "pixel format")? {
                    FORMAT_RGB24 => PixelFormat::Rgb24,
                    FORMAT_I420 => PixelFormat::I420,
                    other => {
                        return Err(malformed(&format!("unknown pixel format {}", other)));
                    }
                };
                let width = take_u32(&mut data, "width")?;
                let height = take_u32(&mut data, "height")?;
                MediaFrame::Video(VideoFrame {
                    width,
                    height,
                    format,
                    timestamp_us,
                    data: take_payload(&mut data)?,
                })
            }
            KIND_AUDIO => {
                let sample_rate = take_u32(&mut data, "sample rate")?;
                let channels = take_u8(&mut data, "channels")?;
                MediaFrame::Audio(AudioFrame {
                    sample_rate,
                    channels,
                    timestamp_us,
                    data: take_payload(&mut data)?,
                })
            }
            other => return Err(malformed(&format!("unknown frame kind {}", other))),
        };

        Ok(Self { track_sid, frame })
    }
}

fn put_sid(buf: &mut BytesMut, sid: &str) {
    buf.put_u16(sid.len() as u16);
    buf.put_slice(sid.as_bytes());
}

fn malformed(reason: &str) -> ProbeError {
    ProbeError::Signaling {
        reason: format!("malformed media packet: {}", reason),
    }
}

fn take_u8(data: &mut &[u8], what: &str) -> Result<u8, ProbeError> {
    if data.remaining() < 1 {
        return Err(malformed(&format!("{} truncated", what)));
    }
    Ok(data.get_u8())
}

fn take_u16(data: &mut &[u8], what: &str) -> Result<u16, ProbeError> {
    if data.remaining() < 2 {
        return Err(malformed(&format!("{} truncated", what)));
    }
    Ok(data.get_u16())
}

fn take_u32(data: &mut &[u8], what: &str) -> Result<u32, ProbeError> {
    if data.remaining() < 4 {
        return Err(malformed(&format!("{} truncated", what)));
    }
    Ok(data.get_u32())
}

fn take_u64(data: &mut &[u8], what: &str) -> Result<u64, ProbeError> {
    if data.remaining() < 8 {
        return Err(malformed(&format!("{} truncated", what)));
    }
    Ok(data.get_u64())
}

fn take_payload(data: &mut &[u8]) -> Result<Vec<u8>, ProbeError> {
    let len = take_u32(data, "payload length")? as usize;
    if data.remaining() < len {
        return Err(malformed("payload truncated"));
    }
    Ok(data.copy_to_bytes(len).to_vec())
}
