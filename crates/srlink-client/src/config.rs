//! Whole-document configuration apply and extract.
//!
//! `apply_config` validates a mapping against the parameter table,
//! expands document-level keys (OPERATION_MODE, ENABLE_TIME_SYNC,
//! FIXED_ADDRESSES) into device operations, and issues the writes in
//! table declaration order with NODE_TYPE first. Writes are not
//! transactional; a failure reports how many parameters were already
//! committed.

use srlink_schema::{
    node_type_of, operation_mode_params, validate, ConfigMap, ConfigValue, OperationMode,
    ParamId, ParamTable, SchemaError,
};
use tracing::{debug, info, warn};

use crate::commands::{ConfigStore, FixedAddressMode};
use crate::device::Device;
use crate::error::{ApplyError, CommandError, Result};

/// The device operations a validated mapping expands into.
#[derive(Debug, Default, PartialEq)]
pub(crate) struct ApplyPlan {
    /// Config writes in table declaration order (NODE_TYPE first).
    pub(crate) writes: Vec<(ParamId, ConfigValue)>,
    /// Fixed-address table entries, applied via the control command.
    pub(crate) fixed_addresses: Vec<(String, String)>,
}

pub(crate) fn plan_apply(
    table: &ParamTable,
    config: &ConfigMap,
) -> std::result::Result<ApplyPlan, SchemaError> {
    validate(table, config)?;

    let mut working = config.clone();
    let node_type = node_type_of(&working);

    let time_sync = matches!(
        working.remove(&ParamId::EnableTimeSync),
        Some(ConfigValue::Bool(true))
    );

    if let Some(value) = working.remove(&ParamId::OperationMode) {
        let mode = value
            .as_text()
            .and_then(OperationMode::from_key)
            .ok_or_else(|| SchemaError::ConstraintViolation {
                param: ParamId::OperationMode,
                message: "expected an operation mode name".to_string(),
            })?;
        debug!(?mode, ?node_type, time_sync, "expanding operation mode");
        working.extend(operation_mode_params(mode, node_type, time_sync));
    }

    let fixed_addresses = match working.remove(&ParamId::FixedAddresses) {
        Some(ConfigValue::Map(map)) => map.into_iter().collect(),
        Some(_) => {
            return Err(SchemaError::ConstraintViolation {
                param: ParamId::FixedAddresses,
                message: "expected an address map".to_string(),
            })
        }
        None => Vec::new(),
    };

    let writes = table
        .iter()
        .filter_map(|spec| working.remove(&spec.id).map(|value| (spec.id, value)))
        .collect::<Vec<_>>();

    if let Some((&param, _)) = working.iter().next() {
        return Err(SchemaError::UnknownParam(param));
    }

    Ok(ApplyPlan {
        writes,
        fixed_addresses,
    })
}

impl Device {
    /// Validate and apply a configuration mapping.
    ///
    /// Returns the number of parameters committed. When writing to
    /// flash, the caller still needs [`save_config`] and a reset for
    /// the values to take effect.
    ///
    /// [`save_config`]: Device::save_config
    pub fn apply_config(
        &self,
        config: &ConfigMap,
        store: ConfigStore,
    ) -> std::result::Result<usize, ApplyError> {
        let plan = plan_apply(self.table(), config)?;
        let mut committed = 0usize;

        let mut writes = plan.writes;
        if writes.first().map(|(param, _)| *param) == Some(ParamId::NodeType) {
            let (param, value) = writes.remove(0);
            self.write_config(param, &value, store)
                .map_err(|source| ApplyError::Write {
                    param,
                    committed,
                    source,
                })?;
            committed += 1;
        }

        if !plan.fixed_addresses.is_empty() {
            for (short, mac) in &plan.fixed_addresses {
                self.control_fixed_address(FixedAddressMode::Add, Some(short), Some(mac))
                    .map_err(|source| ApplyError::Write {
                        param: ParamId::FixedAddresses,
                        committed,
                        source,
                    })?;
            }
            self.control_fixed_address(FixedAddressMode::Save, None, None)
                .map_err(|source| ApplyError::Write {
                    param: ParamId::FixedAddresses,
                    committed,
                    source,
                })?;
            committed += 1;
        }

        for (param, value) in writes {
            self.write_config(param, &value, store)
                .map_err(|source| ApplyError::Write {
                    param,
                    committed,
                    source,
                })?;
            committed += 1;
        }

        info!(committed, ?store, "configuration applied");
        Ok(committed)
    }

    /// Read back every parameter the table knows a device id for.
    ///
    /// Parameters the firmware rejects or reports in an undecodable
    /// shape are skipped; transport-level failures abort the extract.
    pub fn extract_config(&self, store: ConfigStore) -> Result<ConfigMap> {
        let mut config = ConfigMap::new();
        for spec in self.table().iter() {
            if spec.id.device_id().is_none() {
                continue;
            }
            match self.read_config(spec.id, store) {
                Ok(value) => {
                    config.insert(spec.id, value);
                }
                Err(CommandError::Device { status, .. }) => {
                    debug!(param = %spec.id, status, "parameter not readable, skipping");
                }
                Err(CommandError::BadResponse { message, .. }) => {
                    warn!(param = %spec.id, message, "undecodable parameter, skipping");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use srlink_schema::{NodeType, TimeSync};

    use super::*;

    fn config(entries: Vec<(ParamId, ConfigValue)>) -> ConfigMap {
        entries.into_iter().collect()
    }

    #[test]
    fn node_type_is_planned_first() {
        let mapping = config(vec![
            (ParamId::Channel, 33u32.into()),
            (ParamId::NodeType, "COORDINATOR".into()),
            (ParamId::TxPower, "TX_20MW".into()),
        ]);
        let plan = plan_apply(ParamTable::builtin(), &mapping).unwrap();
        assert_eq!(plan.writes[0].0, ParamId::NodeType);
        assert!(plan.fixed_addresses.is_empty());
    }

    #[test]
    fn operation_mode_expands_to_timing_group() {
        let mapping = config(vec![
            (ParamId::NodeType, "SLEEP_ROUTER".into()),
            (ParamId::OperationMode, "LOW_LATENCY".into()),
        ]);
        let plan = plan_apply(ParamTable::builtin(), &mapping).unwrap();
        let params: Vec<ParamId> = plan.writes.iter().map(|(param, _)| *param).collect();
        assert!(params.contains(&ParamId::SleepInterval));
        assert!(params.contains(&ParamId::HelloInterval));
        // coordinator-side parameter dropped for routers
        assert!(!params.contains(&ParamId::RouteExpired));
        assert!(!params.contains(&ParamId::OperationMode));
    }

    #[test]
    fn time_sync_zeroed_unless_enabled() {
        let mapping = config(vec![
            (ParamId::NodeType, "COORDINATOR".into()),
            (ParamId::OperationMode, "BALANCE".into()),
        ]);
        let plan = plan_apply(ParamTable::builtin(), &mapping).unwrap();
        let time_sync = plan
            .writes
            .iter()
            .find(|(param, _)| *param == ParamId::TimeSync)
            .map(|(_, value)| value.clone());
        assert_eq!(time_sync, Some(ConfigValue::TimeSync(TimeSync::disabled())));

        let mapping = config(vec![
            (ParamId::NodeType, "COORDINATOR".into()),
            (ParamId::OperationMode, "BALANCE".into()),
            (ParamId::EnableTimeSync, true.into()),
        ]);
        let plan = plan_apply(ParamTable::builtin(), &mapping).unwrap();
        let time_sync = plan
            .writes
            .iter()
            .find(|(param, _)| *param == ParamId::TimeSync)
            .map(|(_, value)| value.clone());
        assert_eq!(
            time_sync,
            Some(ConfigValue::TimeSync(TimeSync {
                interval_unsync: 1800,
                jitter_unsync: 255,
                interval_sync: 10_800,
                jitter_sync: 255,
            }))
        );
    }

    #[test]
    fn fixed_addresses_split_out_of_writes() {
        let mut map = std::collections::BTreeMap::new();
        map.insert("0002".to_string(), "0000000000004567".to_string());
        let mapping = config(vec![
            (ParamId::NodeType, "COORDINATOR".into()),
            (ParamId::FixedAddresses, ConfigValue::Map(map)),
        ]);
        let plan = plan_apply(ParamTable::builtin(), &mapping).unwrap();
        assert_eq!(
            plan.fixed_addresses,
            vec![("0002".to_string(), "0000000000004567".to_string())]
        );
        assert_eq!(plan.writes.len(), 1); // just NODE_TYPE
    }

    #[test]
    fn invalid_mapping_is_rejected_before_any_write() {
        // detailed timing together with OPERATION_MODE
        let mapping = config(vec![
            (ParamId::NodeType, "SLEEP_ROUTER".into()),
            (ParamId::OperationMode, "BALANCE".into()),
            (ParamId::SleepInterval, 100u32.into()),
        ]);
        assert!(plan_apply(ParamTable::builtin(), &mapping).is_err());
    }

    #[test]
    fn document_level_keys_never_reach_the_wire() {
        let mapping = config(vec![
            (ParamId::NodeType, "SLEEP_ROUTER".into()),
            (ParamId::OperationMode, "POWER_SAVING".into()),
            (ParamId::EnableTimeSync, true.into()),
        ]);
        assert_eq!(node_type_of(&mapping), NodeType::SleepRouter);
        let plan = plan_apply(ParamTable::builtin(), &mapping).unwrap();
        assert!(plan.writes.iter().all(|(param, _)| {
            *param != ParamId::OperationMode && *param != ParamId::EnableTimeSync
        }));
    }
}
