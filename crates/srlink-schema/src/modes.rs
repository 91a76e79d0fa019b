//! Operation-mode presets.
//!
//! An OPERATION_MODE key in a configuration document stands for a whole
//! detailed timing parameter set. The tables here come from the module
//! vendor's recommended profiles.

use tracing::debug;

use crate::param::{NodeType, OperationMode, ParamId};
use crate::value::{ConfigValue, TimeSync};

/// Expand an operation mode into its detailed timing parameters.
///
/// ROUTE_EXPIRED is a coordinator-side parameter and is dropped for
/// router node types. Unless `time_sync` is set the TIME_SYNC block is
/// zeroed, which disables periodic synchronization.
pub fn operation_mode_params(
    mode: OperationMode,
    node_type: NodeType,
    time_sync: bool,
) -> Vec<(ParamId, ConfigValue)> {
    let mut params = match mode {
        OperationMode::PowerSaving => vec![
            (ParamId::ParentSelectionMode, "00".into()),
            (ParamId::HelloInterval, "4b".into()), // 3.7h
            (ParamId::RrecInterval, "41".into()),  // 51min
            (ParamId::UplinkRetry, 2u32.into()),
            (ParamId::DownlinkRetry, 2u32.into()),
            (ParamId::SleepInterval, 100u32.into()), // 2s
            (ParamId::HelloRequestInterval, 80u32.into()),
            (ParamId::RouteExpired, 12_240_000u32.into()), // 3.4h
            (
                ParamId::TimeSync,
                TimeSync {
                    interval_unsync: 3600,
                    jitter_unsync: 255,
                    interval_sync: 36_000,
                    jitter_sync: 255,
                }
                .into(),
            ),
        ],
        OperationMode::Balance => vec![
            (ParamId::ParentSelectionMode, "00".into()),
            (ParamId::HelloInterval, "40".into()), // 34.1min
            (ParamId::RrecInterval, "3f".into()),  // 17.5min
            (ParamId::UplinkRetry, 2u32.into()),
            (ParamId::DownlinkRetry, 2u32.into()),
            (ParamId::SleepInterval, 25u32.into()), // 500ms
            (ParamId::HelloRequestInterval, 15u32.into()),
            (ParamId::RouteExpired, 4_320_000u32.into()), // 1.2h
            (
                ParamId::TimeSync,
                TimeSync {
                    interval_unsync: 1800,
                    jitter_unsync: 255,
                    interval_sync: 10_800,
                    jitter_sync: 255,
                }
                .into(),
            ),
        ],
        OperationMode::LowLatency => vec![
            (ParamId::ParentSelectionMode, "01".into()),
            (ParamId::HelloInterval, "30".into()), // 9.6min
            (ParamId::RrecInterval, "2b".into()),  // 7min
            (ParamId::UplinkRetry, 2u32.into()),
            (ParamId::DownlinkRetry, 2u32.into()),
            (ParamId::SleepInterval, 5u32.into()), // 100ms
            (ParamId::HelloRequestInterval, 15u32.into()),
            (ParamId::RouteExpired, 1_680_000u32.into()), // 28min
            (
                ParamId::TimeSync,
                TimeSync {
                    interval_unsync: 600,
                    jitter_unsync: 180,
                    interval_sync: 3600,
                    jitter_sync: 180,
                }
                .into(),
            ),
        ],
        OperationMode::NonSleep => vec![
            (ParamId::ParentSelectionMode, "01".into()),
            (ParamId::HelloInterval, "20".into()), // 1.1min
            (ParamId::RrecInterval, "23".into()),  // 2.6min
            (ParamId::UplinkRetry, 2u32.into()),
            (ParamId::DownlinkRetry, 2u32.into()),
            (ParamId::HelloRequestInterval, 15u32.into()),
            (ParamId::RouteExpired, 600_000u32.into()), // 10min
            (
                ParamId::TimeSync,
                TimeSync {
                    interval_unsync: 10,
                    jitter_unsync: 5,
                    interval_sync: 10,
                    jitter_sync: 30,
                }
                .into(),
            ),
        ],
    };

    if node_type.is_router() {
        params.retain(|(id, _)| *id != ParamId::RouteExpired);
    }

    if !time_sync {
        for (id, value) in &mut params {
            if *id == ParamId::TimeSync {
                *value = TimeSync::disabled().into();
            }
        }
    }

    debug!(?mode, %node_type, time_sync, params = params.len(), "expanded operation mode");
    params
}
