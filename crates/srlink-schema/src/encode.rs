//! Wire encoding of configuration values.
//!
//! Integers are big-endian; hex parameters (addresses, MACs, keys) are
//! stored LSB-first on the wire, so their byte order is reversed
//! relative to the document string.

use crate::error::{Result, SchemaError};
use crate::param::{NodeType, TxPower};
use crate::table::{ParamSpec, ValueKind};
use crate::value::{ConfigValue, TimeSync};

/// Encode a validated value into the module's representation.
///
/// OPERATION_MODE, ENABLE_TIME_SYNC and FIXED_ADDRESSES never reach the
/// module as config writes and cannot be encoded.
pub fn encode_value(spec: &ParamSpec, value: &ConfigValue) -> Result<Vec<u8>> {
    let bad = |message: &str| SchemaError::ConstraintViolation {
        param: spec.id,
        message: message.to_string(),
    };

    match &spec.kind {
        ValueKind::Bool {
            true_code,
            false_code,
        } => {
            let flag = value.as_bool().ok_or_else(|| bad("expected a boolean"))?;
            Ok(vec![if flag { *true_code } else { *false_code }])
        }
        ValueKind::Uint { width, .. } => {
            let n = value.as_int().ok_or_else(|| bad("expected an integer"))?;
            let be = n.to_be_bytes();
            Ok(be[4 - *width as usize..].to_vec())
        }
        ValueKind::Hex { .. } => {
            let text = value.as_text().ok_or_else(|| bad("expected a hex string"))?;
            let mut bytes = hex_to_bytes(spec, text)?;
            bytes.reverse();
            Ok(bytes)
        }
        ValueKind::NodeType => {
            let text = value.as_text().ok_or_else(|| bad("expected a node type"))?;
            let node_type =
                NodeType::from_key(text).ok_or_else(|| bad("unknown node type"))?;
            Ok(vec![node_type.as_code()])
        }
        ValueKind::TxPower => {
            let text = value.as_text().ok_or_else(|| bad("expected a tx power"))?;
            let power = TxPower::from_key(text).ok_or_else(|| bad("unknown tx power"))?;
            Ok(vec![power.as_code()])
        }
        ValueKind::AddressList { .. } => {
            let ConfigValue::List(entries) = value else {
                return Err(bad("expected a short address list"));
            };
            let mut out = Vec::with_capacity(entries.len() * 2);
            for entry in entries {
                let mut bytes = hex_to_bytes(spec, entry)?;
                bytes.reverse();
                out.extend_from_slice(&bytes);
            }
            Ok(out)
        }
        ValueKind::TimeSync => {
            let ConfigValue::TimeSync(sync) = value else {
                return Err(bad("expected a time sync block"));
            };
            let mut out = Vec::with_capacity(10);
            out.extend_from_slice(&sync.interval_unsync.to_be_bytes());
            out.push(sync.jitter_unsync as u8);
            out.extend_from_slice(&sync.interval_sync.to_be_bytes());
            out.push(sync.jitter_sync as u8);
            Ok(out)
        }
        ValueKind::OperationMode | ValueKind::AddressMap => {
            Err(bad("not a device parameter, cannot be encoded"))
        }
    }
}

/// Decode the module's representation back into a document value.
pub fn decode_value(spec: &ParamSpec, bytes: &[u8]) -> Result<ConfigValue> {
    let bad_wire = || SchemaError::BadWireValue {
        param: spec.id,
        len: bytes.len(),
    };

    match &spec.kind {
        ValueKind::Bool {
            true_code,
            false_code,
        } => {
            let [byte] = bytes else { return Err(bad_wire()) };
            if byte == true_code {
                Ok(ConfigValue::Bool(true))
            } else if byte == false_code {
                Ok(ConfigValue::Bool(false))
            } else {
                Err(bad_wire())
            }
        }
        ValueKind::Uint { width, .. } => {
            if bytes.len() != *width as usize {
                return Err(bad_wire());
            }
            let mut be = [0u8; 4];
            be[4 - bytes.len()..].copy_from_slice(bytes);
            Ok(ConfigValue::Int(u32::from_be_bytes(be)))
        }
        ValueKind::Hex { digits, .. } => {
            if bytes.len() != digits / 2 {
                return Err(bad_wire());
            }
            Ok(ConfigValue::Text(bytes_to_hex_reversed(bytes)))
        }
        ValueKind::NodeType => {
            let [byte] = bytes else { return Err(bad_wire()) };
            let node_type = NodeType::from_code(*byte).ok_or_else(bad_wire)?;
            Ok(ConfigValue::Text(node_type.to_string()))
        }
        ValueKind::TxPower => {
            let [byte] = bytes else { return Err(bad_wire()) };
            let power = TxPower::from_code(*byte).ok_or_else(bad_wire)?;
            let key = if power == TxPower::Tx1mw {
                "TX_1MW"
            } else {
                "TX_20MW"
            };
            Ok(ConfigValue::Text(key.to_string()))
        }
        ValueKind::AddressList { .. } => {
            if bytes.is_empty() || bytes.len() % 2 != 0 {
                return Err(bad_wire());
            }
            let entries = bytes
                .chunks_exact(2)
                .map(bytes_to_hex_reversed)
                .collect();
            Ok(ConfigValue::List(entries))
        }
        ValueKind::TimeSync => {
            if bytes.len() != 10 {
                return Err(bad_wire());
            }
            let u32_at = |at: usize| {
                u32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
            };
            Ok(ConfigValue::TimeSync(TimeSync {
                interval_unsync: u32_at(0),
                jitter_unsync: bytes[4] as u32,
                interval_sync: u32_at(5),
                jitter_sync: bytes[9] as u32,
            }))
        }
        ValueKind::OperationMode | ValueKind::AddressMap => Err(bad_wire()),
    }
}

fn hex_to_bytes(spec: &ParamSpec, text: &str) -> Result<Vec<u8>> {
    if text.len() % 2 != 0 {
        return Err(SchemaError::ConstraintViolation {
            param: spec.id,
            message: format!("{text:?} is not a whole number of hex bytes"),
        });
    }
    (0..text.len())
        .step_by(2)
        .map(|at| {
            u8::from_str_radix(&text[at..at + 2], 16).map_err(|_| {
                SchemaError::ConstraintViolation {
                    param: spec.id,
                    message: format!("{text:?} is not a hex string"),
                }
            })
        })
        .collect()
}

fn bytes_to_hex_reversed(bytes: &[u8]) -> String {
    bytes
        .iter()
        .rev()
        .map(|byte| format!("{byte:02x}"))
        .collect()
}
