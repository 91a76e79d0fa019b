use std::io::{ErrorKind, Read};

use bytes::BytesMut;
use tracing::warn;

use crate::codec::{decode_frame, resync, Frame};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 4 * 1024;
const READ_CHUNK_SIZE: usize = 4 * 1024;

/// Reads complete frames from any `Read` stream.
///
/// Handles partial reads internally; callers always get complete
/// frames. Corrupt frames (bad CRC or malformed length) are logged,
/// skipped up to the next frame marker, and never surface to the
/// caller — serial lines produce line noise and the stream must keep
/// flowing.
pub struct FrameReader<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Read> FrameReader<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Read the next complete frame (blocking).
    ///
    /// Returns `Err(FrameError::LinkClosed)` when EOF is reached.
    /// Timeout errors from the underlying stream propagate as
    /// `FrameError::Io` so callers can poll between reads.
    pub fn read_frame(&mut self) -> Result<Frame> {
        loop {
            match decode_frame(&mut self.buf) {
                Ok(Some(frame)) => return Ok(frame),
                Ok(None) => {}
                Err(
                    err @ (FrameError::CorruptFrame { .. }
                    | FrameError::BadLength { .. }
                    | FrameError::PayloadTooLarge { .. }),
                ) => {
                    warn!(%err, "discarding corrupt frame");
                    resync(&mut self.buf);
                    continue;
                }
                Err(err) => return Err(err),
            }

            let mut chunk = [0u8; READ_CHUNK_SIZE];
            let read = match self.inner.read(&mut chunk) {
                Ok(n) => n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) => return Err(FrameError::Io(err)),
            };

            if read == 0 {
                return Err(FrameError::LinkClosed);
            }

            self.buf.extend_from_slice(&chunk[..read]);
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the reader and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use bytes::{BufMut, BytesMut};

    use super::*;
    use crate::codec::{encode_frame, SOF};

    #[test]
    fn read_single_frame() {
        let mut wire = BytesMut::new();
        encode_frame(0x07FA, b"", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.id, 0x07FA);
        assert!(frame.payload.is_empty());
    }

    #[test]
    fn read_multiple_frames() {
        let mut wire = BytesMut::new();
        encode_frame(0x07A1, b"\x00", &mut wire).unwrap();
        encode_frame(0x07A2, b"\x01\x02", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let f1 = reader.read_frame().unwrap();
        let f2 = reader.read_frame().unwrap();

        assert_eq!((f1.id, f1.payload.as_ref()), (0x07A1, b"\x00".as_ref()));
        assert_eq!((f2.id, f2.payload.as_ref()), (0x07A2, b"\x01\x02".as_ref()));
    }

    #[test]
    fn partial_read_handling() {
        let mut wire = BytesMut::new();
        encode_frame(0x07F5, b"slow", &mut wire).unwrap();

        let mut reader = FrameReader::new(ByteByByteReader {
            bytes: wire.to_vec(),
            pos: 0,
        });
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.id, 0x07F5);
        assert_eq!(frame.payload.as_ref(), b"slow");
    }

    #[test]
    fn corrupt_frame_skipped_silently() {
        let mut wire = BytesMut::new();
        encode_frame(0x07A0, b"damaged", &mut wire).unwrap();
        let crc_pos = wire.len() - 1;
        wire[crc_pos] ^= 0xFF;
        encode_frame(0x07FA, b"good", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.id, 0x07FA);
        assert_eq!(frame.payload.as_ref(), b"good");
    }

    #[test]
    fn corrupt_length_field_skipped() {
        // A bit flip in the length field declares an impossible payload;
        // the reader must skip to the next marker, not give up.
        let mut wire = BytesMut::new();
        wire.put_u8(SOF);
        wire.put_u16(0x8002);
        wire.put_slice(&[0x42, 0x42]);
        encode_frame(0x07FB, b"good", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();

        assert_eq!(frame.id, 0x07FB);
        assert_eq!(frame.payload.as_ref(), b"good");
    }

    #[test]
    fn line_noise_before_frame_skipped() {
        let mut wire = BytesMut::new();
        wire.put_slice(&[0xFF, 0x00, 0x13, 0x37]);
        encode_frame(0x07F1, b"\x00", &mut wire).unwrap();

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, 0x07F1);
    }

    #[test]
    fn link_closed_cleanly() {
        let mut reader = FrameReader::new(Cursor::new(Vec::<u8>::new()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::LinkClosed));
    }

    #[test]
    fn link_closed_mid_frame() {
        let mut wire = BytesMut::new();
        wire.put_u8(SOF);
        wire.put_u16(16);
        wire.put_slice(b"short");

        let mut reader = FrameReader::new(Cursor::new(wire.to_vec()));
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::LinkClosed));
    }

    #[test]
    fn timed_out_read_propagates() {
        let mut reader = FrameReader::new(AlwaysTimedOutReader);
        let err = reader.read_frame().unwrap_err();
        assert!(matches!(err, FrameError::Io(e) if e.kind() == ErrorKind::TimedOut));
    }

    #[test]
    fn interrupted_read_retries() {
        let mut wire = BytesMut::new();
        encode_frame(0x07F3, b"ok", &mut wire).unwrap();

        let mut reader = FrameReader::new(InterruptedThenData {
            interrupted: false,
            bytes: wire.to_vec(),
            pos: 0,
        });
        let frame = reader.read_frame().unwrap();
        assert_eq!(frame.id, 0x07F3);
    }

    struct ByteByByteReader {
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for ByteByByteReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.pos >= self.bytes.len() || buf.is_empty() {
                return Ok(0);
            }
            buf[0] = self.bytes[self.pos];
            self.pos += 1;
            Ok(1)
        }
    }

    struct AlwaysTimedOutReader;

    impl Read for AlwaysTimedOutReader {
        fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from(ErrorKind::TimedOut))
        }
    }

    struct InterruptedThenData {
        interrupted: bool,
        bytes: Vec<u8>,
        pos: usize,
    }

    impl Read for InterruptedThenData {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            if self.pos >= self.bytes.len() {
                return Ok(0);
            }
            let n = (self.bytes.len() - self.pos).min(buf.len());
            buf[..n].copy_from_slice(&self.bytes[self.pos..self.pos + n]);
            self.pos += n;
            Ok(n)
        }
    }
}
