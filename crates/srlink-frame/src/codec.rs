use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::crc::crc16;
use crate::error::{FrameError, Result};

/// Frame header: SOF (1) + length (2) = 3 bytes.
pub const HEADER_SIZE: usize = 3;

/// Start-of-frame marker.
pub const SOF: u8 = 0x7E;

/// CRC trailer size in bytes.
pub const TRAILER_SIZE: usize = 2;

/// Maximum payload size. Firmware transfer blocks are the largest
/// payloads the module accepts.
pub const MAX_PAYLOAD: usize = 1024;

/// A framed API message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// The command identifier.
    pub id: u16,
    /// The command payload.
    pub payload: Bytes,
}

impl Frame {
    /// Create a new frame.
    pub fn new(id: u16, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            payload: payload.into(),
        }
    }

    /// The total wire size of this frame (header + id + payload + crc).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + 2 + self.payload.len() + TRAILER_SIZE
    }
}

/// Encode a frame into the wire format.
///
/// Wire format:
/// ```text
/// ┌──────────┬───────────┬───────────┬──────────────────┬───────────┐
/// │ SOF (1B) │ Length    │ Command   │ Payload          │ CRC-16    │
/// │ 0x7E     │ (2B BE)   │ id (2B BE)│ (Length-2 bytes) │ (2B BE)   │
/// └──────────┴───────────┴───────────┴──────────────────┴───────────┘
/// ```
/// Length counts the command id plus the payload. The CRC covers the
/// same span (CCITT-FALSE).
pub fn encode_frame(id: u16, payload: &[u8], dst: &mut BytesMut) -> Result<()> {
    if payload.len() > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload.len(),
            max: MAX_PAYLOAD,
        });
    }
    dst.reserve(HEADER_SIZE + 2 + payload.len() + TRAILER_SIZE);
    dst.put_u8(SOF);
    dst.put_u16(2 + payload.len() as u16);
    let body_start = dst.len();
    dst.put_u16(id);
    dst.put_slice(payload);
    let crc = crc16(&dst[body_start..]);
    dst.put_u16(crc);
    Ok(())
}

/// Decode a frame from a buffer.
///
/// Leading bytes before the next SOF are discarded. Returns `Ok(None)`
/// if the buffer doesn't contain a complete frame yet. On success,
/// consumes the frame bytes from the buffer.
///
/// A CRC mismatch or malformed length returns an error WITHOUT
/// consuming anything; call [`resync`] to skip past the bad marker
/// before decoding again.
pub fn decode_frame(src: &mut BytesMut) -> Result<Option<Frame>> {
    // Discard line noise ahead of the next frame marker.
    match src.iter().position(|&b| b == SOF) {
        Some(0) => {}
        Some(offset) => src.advance(offset),
        None => {
            src.clear();
            return Ok(None);
        }
    }

    if src.len() < HEADER_SIZE {
        return Ok(None); // Need more data
    }

    let len = u16::from_be_bytes([src[1], src[2]]) as usize;
    if len < 2 {
        return Err(FrameError::BadLength { len });
    }
    let payload_len = len - 2;
    if payload_len > MAX_PAYLOAD {
        return Err(FrameError::PayloadTooLarge {
            size: payload_len,
            max: MAX_PAYLOAD,
        });
    }

    let total = HEADER_SIZE + len + TRAILER_SIZE;
    if src.len() < total {
        return Ok(None); // Need more data
    }

    let body = &src[HEADER_SIZE..HEADER_SIZE + len];
    let expected = crc16(body);
    let found = u16::from_be_bytes([src[HEADER_SIZE + len], src[HEADER_SIZE + len + 1]]);
    if expected != found {
        return Err(FrameError::CorruptFrame { expected, found });
    }

    src.advance(HEADER_SIZE);
    let id = src.get_u16();
    let payload = src.split_to(payload_len).freeze();
    src.advance(TRAILER_SIZE);

    Ok(Some(Frame { id, payload }))
}

/// Skip past a bad frame marker after a decode error.
///
/// Advances over the current SOF byte and discards everything up to
/// the next one, so the following [`decode_frame`] call starts on a
/// fresh candidate frame.
pub fn resync(src: &mut BytesMut) {
    if src.is_empty() {
        return;
    }
    src.advance(1);
    match src.iter().position(|&b| b == SOF) {
        Some(offset) => src.advance(offset),
        None => src.clear(),
    }
}
