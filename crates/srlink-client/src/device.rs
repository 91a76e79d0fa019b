//! Typed command surface over a [`Connection`].

use std::time::Duration;

use bytes::Bytes;
use srlink_frame::CommandId;
use srlink_schema::{decode_value, encode_value, ConfigValue, ParamId, ParamTable};
use srlink_transport::{Link, SerialLink};
use tracing::{debug, info};

use crate::commands::{
    self, ChannelScan, ConfigStore, FixedAddressMode, LinkEntry, MyNeighbor, Neighbor,
    NetworkAddress, NetworkMode, NodeEntry, NodeListKind, RttMeasurement,
};
use crate::connection::{CommandOptions, Connection};
use crate::error::{CommandError, Result};
use crate::notify::{NotificationKind, Subscription};

/// A handle to one SR-series module on a serial port.
pub struct Device {
    connection: Connection,
    table: ParamTable,
    options: CommandOptions,
}

impl Device {
    /// Open the named serial port with default settings.
    pub fn open(port: &str) -> Result<Self> {
        let link = SerialLink::open(port)?;
        Self::from_link(Box::new(link))
    }

    /// Build a device over an already-open link.
    pub fn from_link(link: Box<dyn Link>) -> Result<Self> {
        Ok(Self {
            connection: Connection::open(link)?,
            table: ParamTable::builtin().clone(),
            options: CommandOptions::default(),
        })
    }

    /// Replace the built-in parameter table, e.g. for a newer firmware
    /// revision described by a JSON document.
    pub fn set_param_table(&mut self, table: ParamTable) {
        self.table = table;
    }

    /// Override the default dispatch options for subsequent commands.
    pub fn set_command_options(&mut self, options: CommandOptions) {
        self.options = options;
    }

    pub(crate) fn table(&self) -> &ParamTable {
        &self.table
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.connection
    }

    /// Send a raw request and wait for its response payload.
    pub fn execute(&self, id: CommandId, payload: &[u8]) -> Result<Bytes> {
        self.connection.execute_with(id, payload, self.options)
    }

    pub(crate) fn execute_with(
        &self,
        id: CommandId,
        payload: &[u8],
        options: CommandOptions,
    ) -> Result<Bytes> {
        self.connection.execute_with(id, payload, options)
    }

    /// Subscribe to unsolicited notifications.
    pub fn subscribe(&self, filter: Option<NotificationKind>) -> Subscription {
        self.connection.subscribe(filter)
    }

    /// Firmware version in dotted form, e.g. `SRMP.02.02.0005`.
    pub fn version(&self) -> Result<String> {
        let reply = self.execute(CommandId::GetVersionRequest, &[])?;
        commands::parse_version(CommandId::GetVersionResponse, &reply)
    }

    /// Start network operation.
    pub fn start_network(&self, mode: NetworkMode) -> Result<()> {
        let payload = commands::encode_start_network(mode);
        let reply = self.execute(CommandId::StartNetworkRequest, &payload)?;
        commands::expect_status(CommandId::StartNetworkResponse, &reply)?;
        info!(?mode, "network started");
        Ok(())
    }

    /// Reboot the module.
    pub fn reset(&self) -> Result<()> {
        let reply = self.execute(CommandId::ResetRequest, &commands::RESET_BODY)?;
        commands::expect_status(CommandId::ResetResponse, &reply)?;
        info!("module reset");
        Ok(())
    }

    /// Send application data into the mesh.
    ///
    /// Refused with [`CommandError::NotConnected`] while the module has
    /// no network address. Delivery is best-effort; a success means the
    /// module accepted the data, not that it arrived.
    pub fn send_data(
        &self,
        data: &[u8],
        destination: &str,
        nor: u8,
        security: bool,
        ttl: u8,
    ) -> Result<()> {
        let address = self.network_address()?;
        if !address.is_assigned() {
            return Err(CommandError::NotConnected);
        }
        let payload = commands::encode_send_data(
            destination,
            &address.short_address,
            nor,
            security,
            ttl,
            data,
        )?;
        // Forwarding through the mesh can take longer than a local
        // command; give it a wider window.
        let options = self.options.timeout(Duration::from_secs(2));
        let reply = self.execute_with(CommandId::SendDataRequest, &payload, options)?;
        commands::expect_status(CommandId::SendDataResponse, &reply)?;
        Ok(())
    }

    /// The module's short address, PAN id, and coordinator address.
    pub fn network_address(&self) -> Result<NetworkAddress> {
        let reply = self.execute(CommandId::GetNetworkAddressRequest, &[])?;
        commands::parse_network_address(CommandId::GetNetworkAddressResponse, &reply)
    }

    /// Module clock as a duration since the Unix epoch.
    pub fn get_time(&self) -> Result<Duration> {
        let reply = self.execute(CommandId::GetTimeRequest, &[])?;
        commands::parse_time(CommandId::GetTimeResponse, &reply)
    }

    /// Set the module clock.
    pub fn set_time(&self, time: Duration) -> Result<()> {
        let payload = commands::encode_time(time);
        let reply = self.execute(CommandId::SetTimeRequest, &payload)?;
        commands::expect_status(CommandId::SetTimeResponse, &reply)?;
        Ok(())
    }

    /// Walk one of the module's address tables, following continuation
    /// pages until the module reports the list complete.
    pub fn node_list(&self, kind: NodeListKind) -> Result<Vec<NodeEntry>> {
        let mut entries = Vec::new();
        let mut seq_no = 1u16;
        loop {
            let payload = commands::encode_node_list(kind, seq_no);
            let reply = self.execute(CommandId::GetNodeListRequest, &payload)?;
            let (page, more) =
                commands::parse_node_list_page(CommandId::GetNodeListResponse, &reply)?;
            entries.extend(page);
            if !more {
                break;
            }
            seq_no += 1;
            debug!(seq_no, "fetching next node list page");
        }
        Ok(entries)
    }

    /// Child-to-parent links known to the coordinator.
    pub fn link_list(&self) -> Result<Vec<LinkEntry>> {
        let mut entries = Vec::new();
        let mut seq_no = 1u16;
        loop {
            let payload = commands::encode_link_list(seq_no);
            let reply = self.execute(CommandId::GetLinkListRequest, &payload)?;
            let (page, more) =
                commands::parse_link_list_page(CommandId::GetLinkListResponse, &reply)?;
            entries.extend(page);
            if !more {
                break;
            }
            seq_no += 1;
            debug!(seq_no, "fetching next link list page");
        }
        Ok(entries)
    }

    /// Current route to a node, target first, coordinator last.
    pub fn route(&self, target: &str) -> Result<Vec<String>> {
        let payload = commands::encode_route(target)?;
        let reply = self.execute(CommandId::GetRouteRequest, &payload)?;
        commands::parse_route(CommandId::GetRouteResponse, &reply)
    }

    /// Neighbor table of a remote node.
    pub fn neighbor_info(&self, target: &str) -> Result<Vec<Neighbor>> {
        let payload = commands::encode_route(target)?;
        let reply = self.execute(CommandId::GetNeighborInfoRequest, &payload)?;
        commands::parse_neighbors(CommandId::GetNeighborInfoResponse, &reply)
    }

    /// Neighbor table of the local module.
    pub fn my_neighbors(&self) -> Result<Vec<MyNeighbor>> {
        let reply = self.execute(CommandId::GetMyNeighborInfoRequest, &[])?;
        commands::parse_my_neighbors(CommandId::GetMyNeighborInfoResponse, &reply)
    }

    /// Round-trip time measurement against a node, with `length` dummy
    /// payload bytes.
    pub fn measure_rtt(&self, target: &str, length: u8) -> Result<RttMeasurement> {
        let payload = commands::encode_measure_rtt(target, length)?;
        let reply = self.execute(CommandId::MeasureRttRequest, &payload)?;
        commands::parse_rtt(CommandId::MeasureRttResponse, &reply)
    }

    /// Sample the noise floor on one channel: `count` RSSI samples,
    /// `interval` milliseconds apart.
    pub fn scan_channel(&self, channel: u8, count: u16, interval: u16) -> Result<ChannelScan> {
        let payload = commands::encode_scan_channel(channel, count, interval);
        // The module answers only once the sampling run finishes.
        let sampling = Duration::from_millis(u64::from(count) * u64::from(interval));
        let options = self.options.timeout(sampling + Duration::from_secs(1));
        let reply = self.execute_with(CommandId::ScanChannelRequest, &payload, options)?;
        commands::parse_channel_scan(CommandId::ScanChannelResponse, &reply)
    }

    /// Manage the coordinator's fixed-address table.
    ///
    /// `Add`/`Remove` need both addresses; `Save`/`Import` take none.
    pub fn control_fixed_address(
        &self,
        mode: FixedAddressMode,
        short_address: Option<&str>,
        mac_address: Option<&str>,
    ) -> Result<()> {
        let payload = commands::encode_control_fixed_address(mode, short_address, mac_address)?;
        let reply = self.execute(CommandId::ControlFixedAddressRequest, &payload)?;
        commands::expect_status(CommandId::ControlFixedAddressResponse, &reply)?;
        Ok(())
    }

    /// Read one configuration parameter as a typed value.
    pub fn read_config(&self, param: ParamId, store: ConfigStore) -> Result<ConfigValue> {
        let spec = self
            .table
            .get(param)
            .ok_or_else(|| CommandError::InvalidArgument(format!("unknown parameter {param}")))?;
        let config_id = param.device_id().ok_or_else(|| {
            CommandError::InvalidArgument(format!("{param} has no device config id"))
        })?;
        let (request, response) = commands::read_config_ids(store);
        let reply = self.execute(request, &[config_id])?;
        let value = commands::parse_config_value(response, config_id, &reply)?;
        decode_value(spec, &value).map_err(|err| CommandError::BadResponse {
            id: response.as_u16(),
            message: err.to_string(),
        })
    }

    /// Write one configuration parameter.
    ///
    /// Flash writes only take effect after [`save_config`] and a reset.
    ///
    /// [`save_config`]: Device::save_config
    pub fn write_config(
        &self,
        param: ParamId,
        value: &ConfigValue,
        store: ConfigStore,
    ) -> Result<()> {
        let spec = self
            .table
            .get(param)
            .ok_or_else(|| CommandError::InvalidArgument(format!("unknown parameter {param}")))?;
        let config_id = param.device_id().ok_or_else(|| {
            CommandError::InvalidArgument(format!("{param} has no device config id"))
        })?;
        let encoded = encode_value(spec, value)
            .map_err(|err| CommandError::InvalidArgument(err.to_string()))?;
        let (request, response) = commands::write_config_ids(store);
        let payload = commands::encode_write_config(store, config_id, &encoded);
        let reply = self.execute(request, &payload)?;
        commands::expect_status(response, &reply)?;
        debug!(%param, ?store, "config written");
        Ok(())
    }

    /// Persist the flash configuration.
    pub fn save_config(&self) -> Result<()> {
        let reply = self.execute(CommandId::SaveConfigRequest, &[])?;
        commands::expect_status(CommandId::SaveConfigResponse, &reply)?;
        info!("configuration saved to flash");
        Ok(())
    }

    /// Reset the flash configuration to factory defaults.
    pub fn reset_config(&self) -> Result<()> {
        let reply = self.execute(CommandId::ResetConfigRequest, &[])?;
        commands::expect_status(CommandId::ResetConfigResponse, &reply)?;
        info!("configuration reset to defaults");
        Ok(())
    }
}
