//! Wire frame codec for the SR mesh module serial protocol.
//!
//! Every exchange with the module is one frame:
//!
//! ```text
//! ┌──────┬───────────┬──────────────┬─────────────────┬───────────┐
//! │ SOF  │ Length    │ Command ID   │ Payload         │ CRC-16    │
//! │ 0x7E │ (2B BE)   │ (2B BE)      │ Length-2 bytes  │ (2B BE)   │
//! └──────┴───────────┴──────────────┴─────────────────┴───────────┘
//! ```
//!
//! The CRC covers command id + payload. Decoding never consumes a frame whose
//! CRC does not match; callers resynchronize to the next SOF and carry on.
//! [`FrameReader`] and [`FrameWriter`] lift the codec onto any blocking
//! `Read`/`Write` stream.

pub mod codec;
pub mod command_id;
pub mod crc;
pub mod error;
pub mod reader;
pub mod writer;

pub use codec::{decode_frame, encode_frame, resync, Frame, MAX_PAYLOAD, SOF};
pub use command_id::{CommandId, CommandKind};
pub use crc::crc16;
pub use error::{FrameError, Result};
pub use reader::FrameReader;
pub use writer::FrameWriter;
