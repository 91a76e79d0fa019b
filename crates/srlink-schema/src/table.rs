use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::param::ParamId;

/// How a parameter's value is shaped, constrained, and wired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// One byte on the wire. Some parameters use a vendor-assigned code
    /// for `true` instead of 0x01.
    Bool {
        #[serde(default = "default_true_code")]
        true_code: u8,
        #[serde(default)]
        false_code: u8,
    },
    /// Fixed-width big-endian unsigned integer.
    Uint { width: u8, min: u32, max: u32 },
    /// Fixed-digit hex string; raw bytes are little-endian on the wire.
    Hex {
        digits: usize,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        max_byte: Option<u8>,
    },
    NodeType,
    TxPower,
    OperationMode,
    /// List of 4-hex-digit short addresses.
    AddressList { max_entries: usize },
    /// Map of 4-hex-digit short address to 16-hex-digit MAC address.
    AddressMap,
    TimeSync,
}

fn default_true_code() -> u8 {
    0x01
}

/// Which node types accept a parameter.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Applicability {
    #[default]
    Any,
    CoordinatorOnly,
    RouterOnly,
}

/// One row of the parameter table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParamSpec {
    pub id: ParamId,
    pub kind: ValueKind,
    #[serde(default)]
    pub applicability: Applicability,
    /// Member of the detailed timing group that an OPERATION_MODE
    /// preset replaces; the two cannot be configured together.
    #[serde(default)]
    pub detailed_timing: bool,
}

/// The declarative parameter table.
///
/// Row order is apply order: `apply_config` writes parameters in the
/// order the table declares them (NODE_TYPE first).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParamTable {
    specs: Vec<ParamSpec>,
}

impl ParamTable {
    /// The table shipped with this crate, matching current module
    /// firmware.
    pub fn builtin() -> &'static ParamTable {
        static BUILTIN: OnceLock<ParamTable> = OnceLock::new();
        BUILTIN.get_or_init(build_builtin)
    }

    /// Load a table from a JSON document.
    pub fn from_json(json: &str) -> Result<ParamTable> {
        let table: ParamTable = serde_json::from_str(json)?;
        Ok(table)
    }

    pub fn get(&self, id: ParamId) -> Option<&ParamSpec> {
        self.specs.iter().find(|spec| spec.id == id)
    }

    /// Rows in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &ParamSpec> {
        self.specs.iter()
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }
}

fn build_builtin() -> ParamTable {
    use Applicability::{CoordinatorOnly, RouterOnly};

    let row = |id, kind| ParamSpec {
        id,
        kind,
        applicability: Applicability::Any,
        detailed_timing: false,
    };
    let gated = |id, kind, applicability| ParamSpec {
        id,
        kind,
        applicability,
        detailed_timing: false,
    };
    let timing = |id, kind| ParamSpec {
        id,
        kind,
        applicability: Applicability::Any,
        detailed_timing: true,
    };

    ParamTable {
        specs: vec![
            // NODE_TYPE leads: apply order requires it before anything
            // that depends on the node's role.
            row(ParamId::NodeType, ValueKind::NodeType),
            row(ParamId::TxPower, ValueKind::TxPower),
            row(
                ParamId::Led,
                ValueKind::Bool {
                    true_code: 0x01,
                    false_code: 0x00,
                },
            ),
            row(
                ParamId::AutoStart,
                ValueKind::Bool {
                    true_code: 0x01,
                    false_code: 0x00,
                },
            ),
            row(
                ParamId::DummySize,
                ValueKind::Uint {
                    width: 2,
                    min: 0,
                    max: 1024,
                },
            ),
            row(
                ParamId::Channel,
                ValueKind::Uint {
                    width: 1,
                    min: 33,
                    max: 60,
                },
            ),
            row(
                ParamId::PanId,
                ValueKind::Hex {
                    digits: 4,
                    max_byte: None,
                },
            ),
            row(
                ParamId::EncryptionKey,
                ValueKind::Hex {
                    digits: 32,
                    max_byte: None,
                },
            ),
            row(
                ParamId::EnableEncryption,
                ValueKind::Bool {
                    true_code: 0x6A,
                    false_code: 0x00,
                },
            ),
            row(
                ParamId::EnableDataEncryption,
                ValueKind::Bool {
                    true_code: 0x01,
                    false_code: 0x00,
                },
            ),
            row(
                ParamId::MacRetryCount,
                ValueKind::Uint {
                    width: 1,
                    min: 0,
                    max: 7,
                },
            ),
            row(
                ParamId::AsyncFallbackCount,
                ValueKind::Uint {
                    width: 1,
                    min: 0,
                    max: 255,
                },
            ),
            row(
                ParamId::MacAddress,
                ValueKind::Hex {
                    digits: 16,
                    max_byte: None,
                },
            ),
            row(
                ParamId::NetworkAddress,
                ValueKind::Hex {
                    digits: 4,
                    max_byte: None,
                },
            ),
            timing(
                ParamId::ParentSelectionMode,
                ValueKind::Hex {
                    digits: 2,
                    max_byte: Some(0x01),
                },
            ),
            timing(
                ParamId::HelloInterval,
                ValueKind::Hex {
                    digits: 2,
                    max_byte: Some(0x7F),
                },
            ),
            timing(
                ParamId::RrecInterval,
                ValueKind::Hex {
                    digits: 2,
                    max_byte: Some(0x7F),
                },
            ),
            timing(
                ParamId::UplinkRetry,
                ValueKind::Uint {
                    width: 1,
                    min: 0,
                    max: 255,
                },
            ),
            timing(
                ParamId::DownlinkRetry,
                ValueKind::Uint {
                    width: 1,
                    min: 0,
                    max: 255,
                },
            ),
            timing(
                ParamId::SleepInterval,
                ValueKind::Uint {
                    width: 2,
                    min: 0,
                    max: 65535,
                },
            ),
            timing(
                ParamId::HelloRequestInterval,
                ValueKind::Uint {
                    width: 2,
                    min: 1,
                    max: 30000,
                },
            ),
            ParamSpec {
                id: ParamId::RouteExpired,
                kind: ValueKind::Uint {
                    width: 4,
                    min: 0,
                    max: u32::MAX,
                },
                applicability: CoordinatorOnly,
                detailed_timing: true,
            },
            row(ParamId::TimeSync, ValueKind::TimeSync),
            gated(
                ParamId::PreferredParentNode,
                ValueKind::AddressList { max_entries: 3 },
                RouterOnly,
            ),
            gated(
                ParamId::KeyRenewalInterval,
                ValueKind::Uint {
                    width: 4,
                    min: 0,
                    max: u32::MAX,
                },
                CoordinatorOnly,
            ),
            gated(ParamId::FixedAddresses, ValueKind::AddressMap, CoordinatorOnly),
            row(ParamId::OperationMode, ValueKind::OperationMode),
            row(
                ParamId::EnableTimeSync,
                ValueKind::Bool {
                    true_code: 0x01,
                    false_code: 0x00,
                },
            ),
        ],
    }
}
