//! Payload encoding and parsing for the typed command surface.
//!
//! Addresses are exchanged as hex strings (`"0001"` shorts,
//! 16-digit MACs) but travel least-significant-byte first on the
//! wire, so every helper here reverses byte order at the boundary.

use std::time::Duration;

use bytes::Bytes;
use srlink_frame::CommandId;

use crate::error::{CommandError, Result};

/// Network operation selector for START_NETWORK.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NetworkMode {
    StartNetwork = 0x04,
    StartChannelScan = 0x0A,
    StopChannelScan = 0x0B,
}

/// Which address table a node-list query walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum NodeListKind {
    FixedAddress = 0x00,
    DynamicAddress = 0x01,
    Connected = 0x02,
}

/// Fixed-address table operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum FixedAddressMode {
    Add = 0x01,
    Remove = 0x02,
    Save = 0x03,
    Import = 0x04,
}

/// Whether a config operation touches the running image or flash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigStore {
    #[default]
    Ram,
    Flash,
}

/// The module's current addressing, from GET_NETWORK_ADDRESS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkAddress {
    pub short_address: String,
    pub pan_id: String,
    pub coordinator: String,
}

impl NetworkAddress {
    /// A module that has not joined a network reports `ffff`.
    pub fn is_assigned(&self) -> bool {
        self.short_address != "ffff"
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeEntry {
    pub short_address: String,
    pub mac_address: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkEntry {
    pub child: String,
    pub parent: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Neighbor {
    pub short_address: String,
    pub rssi: i8,
    pub link_cost: u8,
    pub hello: u8,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MyNeighbor {
    pub short_address: String,
    pub rssi: i8,
    pub hop: u8,
    pub parent: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RttMeasurement {
    /// Round trip time in milliseconds.
    pub rtt: u16,
    pub hop: u8,
    /// Remote supply voltage in millivolts.
    pub voltage: u16,
}

/// Noise measurement for one radio channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelScan {
    pub channel: u8,
    /// Samples taken.
    pub count: u16,
    /// Sampling interval in milliseconds.
    pub interval: u16,
    pub rssi_max: i8,
    pub rssi_min: i8,
    /// Sum of sampled RSSI values, not divided by `count`.
    pub rssi_ave: i16,
}

// ---------------------------------------------------------------------------
// address helpers

pub(crate) fn short_to_le(address: &str) -> Result<[u8; 2]> {
    if address.len() != 4 {
        return Err(bad_address(address));
    }
    let value = u16::from_str_radix(address, 16).map_err(|_| bad_address(address))?;
    Ok(value.to_le_bytes())
}

pub(crate) fn short_from_le(bytes: &[u8]) -> String {
    format!("{:02x}{:02x}", bytes[1], bytes[0])
}

pub(crate) fn mac_to_le(address: &str) -> Result<[u8; 8]> {
    if address.len() != 16 {
        return Err(bad_address(address));
    }
    let value = u64::from_str_radix(address, 16).map_err(|_| bad_address(address))?;
    Ok(value.to_le_bytes())
}

pub(crate) fn mac_from_le(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(16);
    for byte in bytes.iter().rev() {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}

fn bad_address(address: &str) -> CommandError {
    CommandError::InvalidArgument(format!("malformed address {address:?}"))
}

// ---------------------------------------------------------------------------
// status handling

/// Strip the leading result byte, mapping device rejections to errors.
pub(crate) fn expect_status(id: CommandId, payload: &Bytes) -> Result<Bytes> {
    match payload.first() {
        Some(0x00) => Ok(payload.slice(1..)),
        Some(&status) => Err(CommandError::Device {
            id: id.as_u16(),
            status,
        }),
        None => Err(truncated(id)),
    }
}

/// Like [`expect_status`] but treats `0x01` as "more pages follow".
pub(crate) fn split_paged(id: CommandId, payload: &Bytes) -> Result<(bool, Bytes)> {
    match payload.first() {
        Some(0x00) => Ok((false, payload.slice(1..))),
        Some(0x01) => Ok((true, payload.slice(1..))),
        Some(&status) => Err(CommandError::Device {
            id: id.as_u16(),
            status,
        }),
        None => Err(truncated(id)),
    }
}

fn truncated(id: CommandId) -> CommandError {
    CommandError::BadResponse {
        id: id.as_u16(),
        message: "response truncated".to_string(),
    }
}

// ---------------------------------------------------------------------------
// configuration commands

// Flash writes carry a fixed 0x02 selector between id and value.
const FLASH_WRITE_SELECTOR: u8 = 0x02;

pub(crate) fn read_config_ids(store: ConfigStore) -> (CommandId, CommandId) {
    match store {
        ConfigStore::Ram => (
            CommandId::ReadRamConfigRequest,
            CommandId::ReadRamConfigResponse,
        ),
        ConfigStore::Flash => (CommandId::ReadConfigRequest, CommandId::ReadConfigResponse),
    }
}

pub(crate) fn write_config_ids(store: ConfigStore) -> (CommandId, CommandId) {
    match store {
        ConfigStore::Ram => (
            CommandId::WriteRamConfigRequest,
            CommandId::WriteRamConfigResponse,
        ),
        ConfigStore::Flash => (
            CommandId::WriteConfigRequest,
            CommandId::WriteConfigResponse,
        ),
    }
}

pub(crate) fn encode_write_config(store: ConfigStore, config_id: u8, value: &[u8]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(2 + value.len());
    payload.push(config_id);
    if store == ConfigStore::Flash {
        payload.push(FLASH_WRITE_SELECTOR);
    }
    payload.extend_from_slice(value);
    payload
}

/// Parse a config read response, returning the raw value bytes.
pub(crate) fn parse_config_value(id: CommandId, config_id: u8, payload: &Bytes) -> Result<Bytes> {
    let body = expect_status(id, payload)?;
    match body.first() {
        Some(&echoed) if echoed == config_id => Ok(body.slice(1..)),
        Some(&echoed) => Err(CommandError::BadResponse {
            id: id.as_u16(),
            message: format!("config id mismatch: sent {config_id:#04x}, got {echoed:#04x}"),
        }),
        None => Err(truncated(id)),
    }
}

// ---------------------------------------------------------------------------
// data plane

// In requests "security on" is 0x0c; responses and notifications echo
// it back as 0x0e.
const SECURITY_ON_REQUEST: u8 = 0x0C;

pub(crate) fn encode_send_data(
    destination: &str,
    source: &str,
    nor: u8,
    security: bool,
    ttl: u8,
    data: &[u8],
) -> Result<Vec<u8>> {
    let destination = short_to_le(destination)?;
    let source = short_to_le(source)?;
    let mut payload = Vec::with_capacity(9 + data.len());
    payload.extend_from_slice(&destination);
    payload.push(0x00);
    payload.extend_from_slice(&source);
    payload.push(0x00);
    payload.push(nor);
    payload.push(if security { SECURITY_ON_REQUEST } else { 0x00 });
    payload.push(ttl);
    payload.extend_from_slice(data);
    Ok(payload)
}

// ---------------------------------------------------------------------------
// module control

pub(crate) const RESET_BODY: [u8; 2] = [0x01, 0x00];

pub(crate) fn encode_start_network(mode: NetworkMode) -> Vec<u8> {
    vec![mode as u8]
}

/// Fold the raw 12-character version into dotted form,
/// e.g. `SRMP02020005` -> `SRMP.02.02.0005`.
pub(crate) fn parse_version(id: CommandId, payload: &Bytes) -> Result<String> {
    let body = expect_status(id, payload)?;
    if body.len() != 12 || !body.is_ascii() {
        return Err(CommandError::BadResponse {
            id: id.as_u16(),
            message: format!("malformed version field ({} bytes)", body.len()),
        });
    }
    let raw = String::from_utf8_lossy(&body);
    Ok(format!(
        "{}.{}.{}.{}",
        &raw[0..4],
        &raw[4..6],
        &raw[6..8],
        &raw[8..]
    ))
}

// ---------------------------------------------------------------------------
// time

// Module time is carried as two 6-byte little-endian fields: whole
// seconds and a binary fraction scaled by 2^32.

fn u48_from_le(bytes: &[u8]) -> u64 {
    let mut buf = [0u8; 8];
    buf[..6].copy_from_slice(&bytes[..6]);
    u64::from_le_bytes(buf)
}

fn u48_to_le(value: u64) -> [u8; 6] {
    let bytes = value.to_le_bytes();
    [bytes[0], bytes[1], bytes[2], bytes[3], bytes[4], bytes[5]]
}

pub(crate) fn encode_time(time: Duration) -> Vec<u8> {
    let seconds = time.as_secs();
    let fraction = (u64::from(time.subsec_nanos()) << 32) / 1_000_000_000;
    let mut payload = Vec::with_capacity(12);
    payload.extend_from_slice(&u48_to_le(seconds));
    payload.extend_from_slice(&u48_to_le(fraction));
    payload
}

pub(crate) fn parse_time(id: CommandId, payload: &Bytes) -> Result<Duration> {
    let body = expect_status(id, payload)?;
    if body.len() < 12 {
        return Err(truncated(id));
    }
    let seconds = u48_from_le(&body[0..6]);
    let fraction = u48_from_le(&body[6..12]);
    let nanos = ((fraction & 0xFFFF_FFFF) * 1_000_000_000) >> 32;
    Ok(Duration::new(seconds, nanos as u32))
}

// ---------------------------------------------------------------------------
// topology queries

pub(crate) fn encode_node_list(kind: NodeListKind, seq_no: u16) -> Vec<u8> {
    let mut payload = vec![kind as u8];
    payload.extend_from_slice(&seq_no.to_le_bytes());
    payload
}

pub(crate) fn parse_node_list_page(
    id: CommandId,
    payload: &Bytes,
) -> Result<(Vec<NodeEntry>, bool)> {
    let (more, body) = split_paged(id, payload)?;
    if body.len() < 2 || (body.len() - 2) % 10 != 0 {
        return Err(truncated(id));
    }
    let entries = body[2..]
        .chunks_exact(10)
        .map(|chunk| NodeEntry {
            short_address: short_from_le(&chunk[0..2]),
            mac_address: mac_from_le(&chunk[2..10]),
        })
        .collect();
    Ok((entries, more))
}

pub(crate) fn encode_link_list(seq_no: u16) -> Vec<u8> {
    seq_no.to_le_bytes().to_vec()
}

pub(crate) fn parse_link_list_page(
    id: CommandId,
    payload: &Bytes,
) -> Result<(Vec<LinkEntry>, bool)> {
    let (more, body) = split_paged(id, payload)?;
    if body.len() < 2 || (body.len() - 2) % 4 != 0 {
        return Err(truncated(id));
    }
    let entries = body[2..]
        .chunks_exact(4)
        .map(|chunk| LinkEntry {
            child: short_from_le(&chunk[0..2]),
            parent: short_from_le(&chunk[2..4]),
        })
        .collect();
    Ok((entries, more))
}

pub(crate) fn encode_route(target: &str) -> Result<Vec<u8>> {
    Ok(short_to_le(target)?.to_vec())
}

pub(crate) fn parse_route(id: CommandId, payload: &Bytes) -> Result<Vec<String>> {
    let body = expect_status(id, payload)?;
    if body.len() % 2 != 0 {
        return Err(truncated(id));
    }
    Ok(body.chunks_exact(2).map(short_from_le).collect())
}

pub(crate) fn encode_measure_rtt(target: &str, length: u8) -> Result<Vec<u8>> {
    let mut payload = short_to_le(target)?.to_vec();
    payload.push(length);
    Ok(payload)
}

pub(crate) fn parse_rtt(id: CommandId, payload: &Bytes) -> Result<RttMeasurement> {
    let body = expect_status(id, payload)?;
    if body.len() < 5 {
        return Err(truncated(id));
    }
    Ok(RttMeasurement {
        rtt: u16::from_le_bytes([body[0], body[1]]),
        hop: body[2],
        voltage: u16::from_le_bytes([body[3], body[4]]),
    })
}

pub(crate) fn encode_scan_channel(channel: u8, count: u16, interval: u16) -> Vec<u8> {
    let mut payload = vec![0x00, channel];
    payload.extend_from_slice(&count.to_le_bytes());
    payload.extend_from_slice(&interval.to_le_bytes());
    payload
}

pub(crate) fn parse_channel_scan(id: CommandId, payload: &Bytes) -> Result<ChannelScan> {
    let body = expect_status(id, payload)?;
    if body.len() < 10 {
        return Err(truncated(id));
    }
    Ok(ChannelScan {
        channel: body[1],
        count: u16::from_le_bytes([body[2], body[3]]),
        interval: u16::from_le_bytes([body[4], body[5]]),
        rssi_max: body[6] as i8,
        rssi_min: body[7] as i8,
        rssi_ave: i16::from_le_bytes([body[8], body[9]]),
    })
}

pub(crate) fn parse_neighbors(id: CommandId, payload: &Bytes) -> Result<Vec<Neighbor>> {
    let body = expect_status(id, payload)?;
    if body.len() % 5 != 0 {
        return Err(truncated(id));
    }
    Ok(body
        .chunks_exact(5)
        .map(|chunk| Neighbor {
            short_address: short_from_le(&chunk[0..2]),
            rssi: chunk[2] as i8,
            link_cost: chunk[3],
            hello: chunk[4],
        })
        .collect())
}

pub(crate) fn parse_my_neighbors(id: CommandId, payload: &Bytes) -> Result<Vec<MyNeighbor>> {
    let body = expect_status(id, payload)?;
    if body.len() % 6 != 0 {
        return Err(truncated(id));
    }
    Ok(body
        .chunks_exact(6)
        .map(|chunk| MyNeighbor {
            short_address: short_from_le(&chunk[0..2]),
            rssi: chunk[2] as i8,
            hop: chunk[3],
            parent: short_from_le(&chunk[4..6]),
        })
        .collect())
}

pub(crate) fn parse_network_address(id: CommandId, payload: &Bytes) -> Result<NetworkAddress> {
    let body = expect_status(id, payload)?;
    if body.len() < 6 {
        return Err(truncated(id));
    }
    Ok(NetworkAddress {
        short_address: short_from_le(&body[0..2]),
        pan_id: short_from_le(&body[2..4]),
        coordinator: short_from_le(&body[4..6]),
    })
}

pub(crate) fn encode_control_fixed_address(
    mode: FixedAddressMode,
    short_address: Option<&str>,
    mac_address: Option<&str>,
) -> Result<Vec<u8>> {
    let mut payload = vec![mode as u8];
    match (mode, short_address, mac_address) {
        (FixedAddressMode::Add | FixedAddressMode::Remove, Some(short), Some(mac)) => {
            payload.extend_from_slice(&short_to_le(short)?);
            payload.extend_from_slice(&mac_to_le(mac)?);
        }
        (FixedAddressMode::Save | FixedAddressMode::Import, None, None) => {}
        _ => {
            return Err(CommandError::InvalidArgument(format!(
                "fixed address mode {mode:?} given wrong address arguments"
            )));
        }
    }
    Ok(payload)
}
