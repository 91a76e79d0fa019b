/// Errors that can occur in transport operations.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Failed to open the serial device.
    #[error("failed to open {port}: {source}")]
    Open {
        port: String,
        source: serialport::Error,
    },

    /// Failed to clone a link handle.
    #[error("failed to clone link: {0}")]
    Clone(std::io::Error),

    /// An I/O error occurred on the link.
    #[error("link I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The link has been closed.
    #[error("link closed")]
    Closed,
}

pub type Result<T> = std::result::Result<T, TransportError>;
