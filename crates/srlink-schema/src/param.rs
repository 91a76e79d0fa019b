use std::fmt;

use serde::{Deserialize, Serialize};

/// A configuration parameter key.
///
/// Most parameters map to a one-byte device config id. The last three
/// are document-level keys with no id of their own: `OperationMode` and
/// `EnableTimeSync` expand into detailed timing parameters, and
/// `FixedAddresses` is applied through the fixed-address control
/// command instead of a config write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ParamId {
    NodeType,
    TxPower,
    MacAddress,
    AsyncFallbackCount,
    Led,
    DummySize,
    ParentSelectionMode,
    EnableEncryption,
    AutoStart,
    MacRetryCount,
    NetworkAddress,
    HelloInterval,
    RrecInterval,
    UplinkRetry,
    DownlinkRetry,
    SleepInterval,
    PreferredParentNode,
    Channel,
    PanId,
    EncryptionKey,
    HelloRequestInterval,
    RouteExpired,
    KeyRenewalInterval,
    TimeSync,
    EnableDataEncryption,
    OperationMode,
    EnableTimeSync,
    FixedAddresses,
}

impl ParamId {
    /// The device config id carried in read/write-config payloads.
    ///
    /// `None` for document-level keys that never reach the module as a
    /// config write.
    pub fn device_id(self) -> Option<u8> {
        let id = match self {
            ParamId::TxPower => 0x02,
            ParamId::MacAddress => 0x12,
            ParamId::AsyncFallbackCount => 0x22,
            ParamId::Led => 0x30,
            ParamId::DummySize => 0x31,
            ParamId::ParentSelectionMode => 0xA2,
            ParamId::EnableEncryption => 0xA6,
            ParamId::AutoStart => 0xA7,
            ParamId::MacRetryCount => 0xA9,
            ParamId::NodeType => 0xB1,
            ParamId::NetworkAddress => 0xB2,
            ParamId::HelloInterval => 0xB3,
            ParamId::RrecInterval => 0xB4,
            ParamId::UplinkRetry => 0xB5,
            ParamId::DownlinkRetry => 0xB6,
            ParamId::SleepInterval => 0xBB,
            ParamId::PreferredParentNode => 0xC1,
            ParamId::Channel => 0xC5,
            ParamId::PanId => 0xC6,
            ParamId::EncryptionKey => 0xC7,
            ParamId::HelloRequestInterval => 0xC9,
            ParamId::RouteExpired => 0xD1,
            ParamId::KeyRenewalInterval => 0xD4,
            ParamId::TimeSync => 0xF0,
            ParamId::EnableDataEncryption => 0xF3,
            ParamId::OperationMode | ParamId::EnableTimeSync | ParamId::FixedAddresses => {
                return None
            }
        };
        Some(id)
    }

    /// Look up a parameter by its device config id.
    pub fn from_device_id(id: u8) -> Option<ParamId> {
        const WITH_DEVICE_ID: [ParamId; 25] = [
            ParamId::TxPower,
            ParamId::MacAddress,
            ParamId::AsyncFallbackCount,
            ParamId::Led,
            ParamId::DummySize,
            ParamId::ParentSelectionMode,
            ParamId::EnableEncryption,
            ParamId::AutoStart,
            ParamId::MacRetryCount,
            ParamId::NodeType,
            ParamId::NetworkAddress,
            ParamId::HelloInterval,
            ParamId::RrecInterval,
            ParamId::UplinkRetry,
            ParamId::DownlinkRetry,
            ParamId::SleepInterval,
            ParamId::PreferredParentNode,
            ParamId::Channel,
            ParamId::PanId,
            ParamId::EncryptionKey,
            ParamId::HelloRequestInterval,
            ParamId::RouteExpired,
            ParamId::KeyRenewalInterval,
            ParamId::TimeSync,
            ParamId::EnableDataEncryption,
        ];
        WITH_DEVICE_ID
            .iter()
            .copied()
            .find(|param| param.device_id() == Some(id))
    }
}

impl fmt::Display for ParamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Display uses the document key form, e.g. "NODE_TYPE".
        let key = match serde_json::to_value(self) {
            Ok(serde_json::Value::String(key)) => key,
            _ => format!("{self:?}"),
        };
        f.write_str(&key)
    }
}

/// Role of a node in the mesh.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeType {
    Coordinator,
    Router,
    SleepRouter,
    SleepCoordinator,
}

impl NodeType {
    pub fn as_code(self) -> u8 {
        match self {
            NodeType::Coordinator => 0x00,
            NodeType::Router => 0x02,
            NodeType::SleepRouter => 0x03,
            NodeType::SleepCoordinator => 0x04,
        }
    }

    pub fn from_code(code: u8) -> Option<NodeType> {
        match code {
            0x00 => Some(NodeType::Coordinator),
            0x02 => Some(NodeType::Router),
            0x03 => Some(NodeType::SleepRouter),
            0x04 => Some(NodeType::SleepCoordinator),
            _ => None,
        }
    }

    /// Parse the document key form, e.g. `"SLEEP_ROUTER"`.
    pub fn from_key(key: &str) -> Option<NodeType> {
        serde_json::from_value(serde_json::Value::String(key.to_string())).ok()
    }

    pub fn is_coordinator(self) -> bool {
        matches!(self, NodeType::Coordinator | NodeType::SleepCoordinator)
    }

    pub fn is_router(self) -> bool {
        matches!(self, NodeType::Router | NodeType::SleepRouter)
    }
}

impl fmt::Display for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeType::Coordinator => "COORDINATOR",
            NodeType::Router => "ROUTER",
            NodeType::SleepRouter => "SLEEP_ROUTER",
            NodeType::SleepCoordinator => "SLEEP_COORDINATOR",
        };
        f.write_str(name)
    }
}

/// Radio transmit power.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TxPower {
    #[serde(rename = "TX_1MW")]
    Tx1mw,
    #[serde(rename = "TX_20MW")]
    Tx20mw,
}

impl TxPower {
    /// Parse the document key form, e.g. `"TX_20MW"`.
    pub fn from_key(key: &str) -> Option<TxPower> {
        serde_json::from_value(serde_json::Value::String(key.to_string())).ok()
    }

    pub fn as_code(self) -> u8 {
        match self {
            TxPower::Tx1mw => 0x01,
            TxPower::Tx20mw => 0x02,
        }
    }

    pub fn from_code(code: u8) -> Option<TxPower> {
        match code {
            0x01 => Some(TxPower::Tx1mw),
            0x02 => Some(TxPower::Tx20mw),
            _ => None,
        }
    }
}

/// Preset balancing latency against power draw.
///
/// Never written to the module directly; expanded into detailed timing
/// parameters before apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationMode {
    PowerSaving,
    Balance,
    LowLatency,
    NonSleep,
}

impl OperationMode {
    /// Parse the document key form, e.g. `"LOW_LATENCY"`.
    pub fn from_key(key: &str) -> Option<OperationMode> {
        serde_json::from_value(serde_json::Value::String(key.to_string())).ok()
    }
}
