//! Host-side control library for SR-series wireless mesh modules.
//!
//! srlink talks to an SR920-class module over its serial command
//! protocol: framing, command dispatch with timeout and retry,
//! unsolicited notification fan-out, validated configuration, and
//! firmware updates.
//!
//! # Crate Structure
//!
//! - [`transport`] — Serial port and in-memory byte-stream links
//! - [`frame`] — SOF/length/CRC wire framing and command identifiers
//! - [`schema`] — Configuration parameter table, validation, and
//!   value encoding (behind `schema` feature)
//! - [`client`] — Typed device handle: commands, notifications,
//!   configuration, firmware (behind `client` feature)

/// Re-export transport types.
pub mod transport {
    pub use srlink_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use srlink_frame::*;
}

/// Re-export schema types (requires `schema` feature).
#[cfg(feature = "schema")]
pub mod schema {
    pub use srlink_schema::*;
}

/// Re-export client types (requires `client` feature).
#[cfg(feature = "client")]
pub mod client {
    pub use srlink_client::*;
}

#[cfg(feature = "client")]
pub use srlink_client::Device;
