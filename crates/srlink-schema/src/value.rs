use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Time synchronization timing block.
///
/// Intervals are in seconds, jitters in seconds of random spread. An
/// all-zero block disables periodic synchronization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSync {
    pub interval_unsync: u32,
    pub jitter_unsync: u32,
    pub interval_sync: u32,
    pub jitter_sync: u32,
}

impl TimeSync {
    /// The zeroed block that disables synchronization.
    pub fn disabled() -> Self {
        Self::default()
    }
}

/// A configuration value as it appears in a configuration document.
///
/// Enumerated parameters (NODE_TYPE, TX_POWER, OPERATION_MODE) and hex
/// parameters both arrive as text; the parameter table decides how a
/// given text value is interpreted and encoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Bool(bool),
    Int(u32),
    Text(String),
    /// Short-address list, e.g. `["0002", "0003"]`.
    List(Vec<String>),
    TimeSync(TimeSync),
    /// Short address to MAC address map.
    Map(BTreeMap<String, String>),
}

impl ConfigValue {
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            ConfigValue::Bool(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<u32> {
        match self {
            ConfigValue::Int(value) => Some(*value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ConfigValue::Text(value) => Some(value),
            _ => None,
        }
    }
}

impl From<bool> for ConfigValue {
    fn from(value: bool) -> Self {
        ConfigValue::Bool(value)
    }
}

impl From<u32> for ConfigValue {
    fn from(value: u32) -> Self {
        ConfigValue::Int(value)
    }
}

impl From<&str> for ConfigValue {
    fn from(value: &str) -> Self {
        ConfigValue::Text(value.to_string())
    }
}

impl From<TimeSync> for ConfigValue {
    fn from(value: TimeSync) -> Self {
        ConfigValue::TimeSync(value)
    }
}
