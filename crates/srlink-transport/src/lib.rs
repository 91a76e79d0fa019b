//! Serial transport abstraction for SR mesh modules.
//!
//! Provides the byte-stream duplex channel everything else builds on:
//! - [`SerialLink`] — a physical serial port (fixed 8N1 framing)
//! - [`MemoryLink`] — an in-process pair used by tests and simulators
//!
//! This is the lowest layer of srlink. The protocol layers only ever see the
//! [`Link`] trait; they never open or close devices themselves.

pub mod error;
pub mod link;
pub mod serial;

pub use error::{Result, TransportError};
pub use link::{Link, MemoryLink};
pub use serial::{SerialConfig, SerialLink};
