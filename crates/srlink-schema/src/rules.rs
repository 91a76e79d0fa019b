//! Cross-field validation of a configuration mapping.
//!
//! Per-parameter constraints are checked first, then the structural
//! rules in a fixed order: node-type applicability, mutually exclusive
//! groups, and finally missing dependencies. The first failure wins, so
//! callers get deterministic diagnostics for a given document.

use std::collections::BTreeMap;

use tracing::debug;

use crate::error::{Result, SchemaError};
use crate::param::{NodeType, OperationMode, ParamId, TxPower};
use crate::table::{Applicability, ParamTable, ValueKind};
use crate::value::ConfigValue;

/// A configuration mapping as handed to the engine.
pub type ConfigMap = BTreeMap<ParamId, ConfigValue>;

/// The node type a mapping configures, defaulting to SLEEP_ROUTER when
/// NODE_TYPE is absent.
pub fn node_type_of(config: &ConfigMap) -> NodeType {
    config
        .get(&ParamId::NodeType)
        .and_then(|value| value.as_text())
        .and_then(NodeType::from_key)
        .unwrap_or(NodeType::SleepRouter)
}

/// Validate a configuration mapping against the table.
pub fn validate(table: &ParamTable, config: &ConfigMap) -> Result<()> {
    for (param, value) in config {
        let spec = table
            .get(*param)
            .ok_or(SchemaError::UnknownParam(*param))?;
        check_value(*param, &spec.kind, value)?;
    }

    let node_type = node_type_of(config);

    // Node-type applicability.
    for param in config.keys() {
        let spec = table.get(*param).ok_or(SchemaError::UnknownParam(*param))?;
        let applies = match spec.applicability {
            Applicability::Any => true,
            Applicability::CoordinatorOnly => node_type.is_coordinator(),
            Applicability::RouterOnly => node_type.is_router(),
        };
        if !applies {
            return Err(SchemaError::NotApplicableForNodeType {
                param: *param,
                node_type,
            });
        }
    }

    // An operation-mode preset replaces the detailed timing group.
    if config.contains_key(&ParamId::OperationMode) {
        for param in config.keys() {
            let spec = table.get(*param).ok_or(SchemaError::UnknownParam(*param))?;
            if spec.detailed_timing {
                return Err(SchemaError::MutuallyExclusiveGroup {
                    param: *param,
                    other: ParamId::OperationMode,
                });
            }
        }
    }

    // ENABLE_TIME_SYNC owns the timing block.
    if config.contains_key(&ParamId::EnableTimeSync) && config.contains_key(&ParamId::TimeSync) {
        return Err(SchemaError::MutuallyExclusiveGroup {
            param: ParamId::TimeSync,
            other: ParamId::EnableTimeSync,
        });
    }

    // Dependencies.
    let time_sync_enabled = config
        .get(&ParamId::EnableTimeSync)
        .and_then(ConfigValue::as_bool)
        .unwrap_or(false);
    if time_sync_enabled && !config.contains_key(&ParamId::OperationMode) {
        return Err(SchemaError::MissingDependency {
            param: ParamId::EnableTimeSync,
            requires: ParamId::OperationMode,
        });
    }
    if config.contains_key(&ParamId::OperationMode) && !config.contains_key(&ParamId::NodeType) {
        return Err(SchemaError::MissingDependency {
            param: ParamId::OperationMode,
            requires: ParamId::NodeType,
        });
    }

    debug!(params = config.len(), %node_type, "configuration validated");
    Ok(())
}

fn check_value(param: ParamId, kind: &ValueKind, value: &ConfigValue) -> Result<()> {
    let violation = |message: String| SchemaError::ConstraintViolation { param, message };

    match kind {
        ValueKind::Bool { .. } => {
            value
                .as_bool()
                .ok_or_else(|| violation("expected a boolean".to_string()))?;
        }
        ValueKind::Uint { min, max, .. } => {
            let n = value
                .as_int()
                .ok_or_else(|| violation("expected an integer".to_string()))?;
            if n < *min || n > *max {
                return Err(violation(format!("{n} outside {min}..={max}")));
            }
        }
        ValueKind::Hex { digits, max_byte } => {
            let text = value
                .as_text()
                .ok_or_else(|| violation("expected a hex string".to_string()))?;
            check_hex(param, text, *digits)?;
            if let Some(max) = max_byte {
                // Only single-byte hex parameters carry a range cap.
                let byte = u8::from_str_radix(text, 16)
                    .map_err(|_| violation(format!("{text:?} is not a hex byte")))?;
                if byte > *max {
                    return Err(violation(format!("{text:?} above {max:#04x}")));
                }
            }
        }
        ValueKind::NodeType => {
            let text = value
                .as_text()
                .ok_or_else(|| violation("expected a node type name".to_string()))?;
            NodeType::from_key(text)
                .ok_or_else(|| violation(format!("{text:?} is not a node type")))?;
        }
        ValueKind::TxPower => {
            let text = value
                .as_text()
                .ok_or_else(|| violation("expected a tx power name".to_string()))?;
            TxPower::from_key(text)
                .ok_or_else(|| violation(format!("{text:?} is not a tx power")))?;
        }
        ValueKind::OperationMode => {
            let text = value
                .as_text()
                .ok_or_else(|| violation("expected an operation mode name".to_string()))?;
            OperationMode::from_key(text)
                .ok_or_else(|| violation(format!("{text:?} is not an operation mode")))?;
        }
        ValueKind::AddressList { max_entries } => {
            let ConfigValue::List(entries) = value else {
                return Err(violation("expected a short address list".to_string()));
            };
            if entries.is_empty() || entries.len() > *max_entries {
                return Err(violation(format!(
                    "{} entries outside 1..={max_entries}",
                    entries.len()
                )));
            }
            for entry in entries {
                check_hex(param, entry, 4)?;
            }
        }
        ValueKind::AddressMap => {
            let ConfigValue::Map(map) = value else {
                return Err(violation("expected a short-address map".to_string()));
            };
            for (short, mac) in map {
                check_hex(param, short, 4)?;
                check_hex(param, mac, 16)?;
            }
        }
        ValueKind::TimeSync => {
            let ConfigValue::TimeSync(sync) = value else {
                return Err(violation("expected a time sync block".to_string()));
            };
            for interval in [sync.interval_unsync, sync.interval_sync] {
                if interval != 0 && !(10..=86_400).contains(&interval) {
                    return Err(violation(format!(
                        "interval {interval} outside 0 or 10..=86400"
                    )));
                }
            }
            for jitter in [sync.jitter_unsync, sync.jitter_sync] {
                if jitter > 255 {
                    return Err(violation(format!("jitter {jitter} outside 0..=255")));
                }
            }
        }
    }

    Ok(())
}

fn check_hex(param: ParamId, text: &str, digits: usize) -> Result<()> {
    if text.len() != digits || !text.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(SchemaError::ConstraintViolation {
            param,
            message: format!("{text:?} is not a {digits}-digit hex string"),
        });
    }
    Ok(())
}
