//! Command dispatch and device management for SR-series modules.
//!
//! This is the "just works" layer. Open a serial port, issue typed
//! commands with timeout and retry, receive unsolicited notifications,
//! apply validated configuration mappings, and push firmware images.

pub mod commands;
pub mod config;
pub mod connection;
pub mod device;
pub mod error;
pub mod firmware;
pub mod notify;

pub use commands::{
    ChannelScan, ConfigStore, FixedAddressMode, LinkEntry, MyNeighbor, Neighbor, NetworkAddress,
    NetworkMode, NodeEntry, NodeListKind, RttMeasurement,
};
pub use connection::{CommandOptions, Connection, DispatchMode};
pub use device::Device;
pub use error::{ApplyError, CommandError, Result, UpdateError};
pub use firmware::{FirmwareUpdate, UpdateProgress, UpdateState, BLOCK_SIZE};
pub use notify::{NetworkState, Notification, NotificationKind, ReceivedData, Subscription};

pub use srlink_schema::{ConfigMap, ConfigValue, NodeType, OperationMode, ParamId, ParamTable};
