/// Errors that can occur during frame encoding/decoding.
#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    /// The payload exceeds the protocol maximum.
    #[error("payload too large ({size} bytes, max {max})")]
    PayloadTooLarge { size: usize, max: usize },

    /// The frame trailer does not match the CRC computed over the body.
    #[error("corrupt frame (crc expected {expected:#06x}, found {found:#06x})")]
    CorruptFrame { expected: u16, found: u16 },

    /// The declared length cannot hold a command id.
    #[error("corrupt frame (declared length {len} too short)")]
    BadLength { len: usize },

    /// An I/O error occurred while reading or writing frames.
    #[error("frame I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link was closed before a complete frame was received.
    #[error("link closed (incomplete frame)")]
    LinkClosed,
}

pub type Result<T> = std::result::Result<T, FrameError>;
