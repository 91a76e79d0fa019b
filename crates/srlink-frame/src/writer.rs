use std::io::{ErrorKind, Write};

use bytes::BytesMut;

use crate::codec::{encode_frame, Frame};
use crate::error::{FrameError, Result};

const INITIAL_BUFFER_CAPACITY: usize = 1200;

/// Writes complete frames to any `Write` stream.
pub struct FrameWriter<T> {
    inner: T,
    buf: BytesMut,
}

impl<T: Write> FrameWriter<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            buf: BytesMut::with_capacity(INITIAL_BUFFER_CAPACITY),
        }
    }

    /// Write a complete frame (blocking).
    pub fn write_frame(&mut self, frame: &Frame) -> Result<()> {
        self.send(frame.id, frame.payload.as_ref())
    }

    /// Encode and send a payload under a command id.
    pub fn send(&mut self, id: u16, payload: &[u8]) -> Result<()> {
        self.buf.clear();
        encode_frame(id, payload, &mut self.buf)?;

        let mut offset = 0usize;
        while offset < self.buf.len() {
            match self.inner.write(&self.buf[offset..]) {
                Ok(0) => return Err(FrameError::LinkClosed),
                Ok(n) => offset += n,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }

        self.flush()
    }

    /// Flush the underlying stream.
    pub fn flush(&mut self) -> Result<()> {
        loop {
            match self.inner.flush() {
                Ok(()) => return Ok(()),
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(err) if err.kind() == ErrorKind::WouldBlock => continue,
                Err(err) => return Err(FrameError::Io(err)),
            }
        }
    }

    /// Borrow the underlying stream.
    pub fn get_ref(&self) -> &T {
        &self.inner
    }

    /// Consume the writer and return the inner stream.
    pub fn into_inner(self) -> T {
        self.inner
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::codec::decode_frame;
    use crate::reader::FrameReader;

    #[test]
    fn written_bytes_decode() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.send(0x07F0, b"\x01").unwrap();

        let wire = writer.into_inner().into_inner();
        let mut buf = BytesMut::from(wire.as_slice());
        let frame = decode_frame(&mut buf).unwrap().unwrap();

        assert_eq!(frame.id, 0x07F0);
        assert_eq!(frame.payload.as_ref(), b"\x01");
    }

    #[test]
    fn oversized_payload_rejected() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        let err = writer.send(0x0742, &vec![0u8; 2048]).unwrap_err();
        assert!(matches!(err, FrameError::PayloadTooLarge { .. }));
    }

    #[test]
    fn interrupted_write_retries() {
        let mut writer = FrameWriter::new(InterruptedOnce {
            interrupted: false,
            data: Vec::new(),
        });
        writer.send(0x07A0, b"retry").unwrap();
        assert!(!writer.get_ref().data.is_empty());
    }

    #[test]
    fn link_closed_when_write_returns_zero() {
        let mut writer = FrameWriter::new(ZeroWriter);
        let err = writer.send(0x07A0, b"x").unwrap_err();
        assert!(matches!(err, FrameError::LinkClosed));
    }

    #[test]
    fn roundtrip_through_reader() {
        let mut writer = FrameWriter::new(Cursor::new(Vec::<u8>::new()));
        writer.write_frame(&Frame::new(0x07F4, "")).unwrap();
        writer.send(0x07F6, b"\x00\x02").unwrap();

        let wire = writer.into_inner().into_inner();
        let mut reader = FrameReader::new(Cursor::new(wire));

        assert_eq!(reader.read_frame().unwrap().id, 0x07F4);
        let second = reader.read_frame().unwrap();
        assert_eq!(second.id, 0x07F6);
        assert_eq!(second.payload.as_ref(), b"\x00\x02");
    }

    struct InterruptedOnce {
        interrupted: bool,
        data: Vec<u8>,
    }

    impl Write for InterruptedOnce {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            if !self.interrupted {
                self.interrupted = true;
                return Err(std::io::Error::from(ErrorKind::Interrupted));
            }
            self.data.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    struct ZeroWriter;

    impl Write for ZeroWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Ok(0)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }
}
