use srlink_frame::FrameError;
use srlink_schema::{ParamId, SchemaError};
use srlink_transport::TransportError;

/// Errors raised while executing a command against the module.
#[derive(Debug, thiserror::Error)]
pub enum CommandError {
    /// The serial link failed.
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    /// A frame could not be encoded or written.
    #[error("frame error: {0}")]
    Frame(#[from] FrameError),

    /// No response arrived within the deadline, after retries.
    #[error("no response to {id:#06x} after {attempts} attempt(s)")]
    Timeout { id: u16, attempts: u32 },

    /// Another command is in flight and fail-fast dispatch was requested.
    #[error("another command is in flight")]
    Busy,

    /// The link was closed while a command was outstanding.
    #[error("link closed")]
    LinkClosed,

    /// The module answered with a rejection status.
    #[error("device rejected {id:#06x} with status {status:#04x}")]
    Device { id: u16, status: u8 },

    /// The response payload did not have the expected shape.
    #[error("malformed response to {id:#06x}: {message}")]
    BadResponse { id: u16, message: String },

    /// A request argument was malformed before it ever hit the wire.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// The module has no network address yet, so the operation cannot
    /// be routed.
    #[error("module is not connected to a network")]
    NotConnected,
}

pub type Result<T> = std::result::Result<T, CommandError>;

/// Errors raised while applying a configuration mapping.
///
/// Configuration writes are not transactional: `committed` reports how
/// many parameters the module had already accepted when the failure
/// occurred.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    #[error(transparent)]
    Schema(#[from] SchemaError),

    #[error("failed writing {param} ({committed} parameter(s) already committed): {source}")]
    Write {
        param: ParamId,
        committed: usize,
        source: CommandError,
    },
}

/// Errors raised by the firmware update sequencer.
#[derive(Debug, thiserror::Error)]
pub enum UpdateError {
    /// The sequencer is single-shot and has already run.
    #[error("firmware update already attempted on this session")]
    AlreadyRun,

    #[error("firmware image is empty")]
    EmptyImage,

    #[error("firmware version must be {expected} ASCII characters, got {found}")]
    BadVersion { expected: usize, found: usize },

    #[error("transfer failed at offset {offset}: {source}")]
    Transfer {
        offset: usize,
        source: CommandError,
    },

    /// The image transferred completely but the module refused to
    /// verify or activate it.
    #[error("activation failed: {source}")]
    ActivationFailed { source: CommandError },
}
