//! The module's command identifier space.
//!
//! Requests and responses come in pairs: `response id = request id + 1`.
//! Two identifiers are unsolicited notifications the module emits on its own.
//! The id space is not parity-aligned (some request ids are odd), so
//! direction is classified by table, never by arithmetic.

/// Direction of a frame, derived from its command identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandKind {
    /// Host → module.
    Request,
    /// Module → host, answering a request.
    Response,
    /// Module → host, unsolicited.
    Notification,
}

/// Identifier of an API command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum CommandId {
    GetNodeListRequest = 0x0330,
    GetNodeListResponse = 0x0331,
    GetLinkListRequest = 0x0332,
    GetLinkListResponse = 0x0333,
    GetRouteRequest = 0x0334,
    GetRouteResponse = 0x0335,
    MeasureRttRequest = 0x0336,
    MeasureRttResponse = 0x0337,
    GetNeighborInfoRequest = 0x0338,
    GetNeighborInfoResponse = 0x0339,
    ControlFixedAddressRequest = 0x0340,
    ControlFixedAddressResponse = 0x0341,
    MeasureRadioStatusRequest = 0x0342,
    MeasureRadioStatusResponse = 0x0343,
    ScanChannelRequest = 0x0709,
    ScanChannelResponse = 0x070A,
    UpdateFirmwareRequest = 0x0742,
    UpdateFirmwareResponse = 0x0743,
    GetMyNeighborInfoRequest = 0x0744,
    GetMyNeighborInfoResponse = 0x0745,
    ReadConfigRequest = 0x0780,
    ReadConfigResponse = 0x0781,
    WriteConfigRequest = 0x0782,
    WriteConfigResponse = 0x0783,
    SaveConfigRequest = 0x0784,
    SaveConfigResponse = 0x0785,
    ResetConfigRequest = 0x0786,
    ResetConfigResponse = 0x0787,
    SendDataRequest = 0x07A0,
    SendDataResponse = 0x07A1,
    DataReceivedNotification = 0x07A2,
    WriteRamConfigRequest = 0x07A3,
    WriteRamConfigResponse = 0x07A4,
    ReadRamConfigRequest = 0x07A5,
    ReadRamConfigResponse = 0x07A6,
    StartNetworkRequest = 0x07A7,
    StartNetworkResponse = 0x07A8,
    NetworkStateChangedNotification = 0x07A9,
    ResetRequest = 0x07F0,
    ResetResponse = 0x07F1,
    SetTimeRequest = 0x07F2,
    SetTimeResponse = 0x07F3,
    GetTimeRequest = 0x07F4,
    GetTimeResponse = 0x07F5,
    GetNetworkAddressRequest = 0x07F6,
    GetNetworkAddressResponse = 0x07F7,
    GetVersionRequest = 0x07FA,
    GetVersionResponse = 0x07FB,
}

impl CommandId {
    /// All defined identifiers, in numeric order.
    pub const ALL: [CommandId; 48] = [
        CommandId::GetNodeListRequest,
        CommandId::GetNodeListResponse,
        CommandId::GetLinkListRequest,
        CommandId::GetLinkListResponse,
        CommandId::GetRouteRequest,
        CommandId::GetRouteResponse,
        CommandId::MeasureRttRequest,
        CommandId::MeasureRttResponse,
        CommandId::GetNeighborInfoRequest,
        CommandId::GetNeighborInfoResponse,
        CommandId::ControlFixedAddressRequest,
        CommandId::ControlFixedAddressResponse,
        CommandId::MeasureRadioStatusRequest,
        CommandId::MeasureRadioStatusResponse,
        CommandId::ScanChannelRequest,
        CommandId::ScanChannelResponse,
        CommandId::UpdateFirmwareRequest,
        CommandId::UpdateFirmwareResponse,
        CommandId::GetMyNeighborInfoRequest,
        CommandId::GetMyNeighborInfoResponse,
        CommandId::ReadConfigRequest,
        CommandId::ReadConfigResponse,
        CommandId::WriteConfigRequest,
        CommandId::WriteConfigResponse,
        CommandId::SaveConfigRequest,
        CommandId::SaveConfigResponse,
        CommandId::ResetConfigRequest,
        CommandId::ResetConfigResponse,
        CommandId::SendDataRequest,
        CommandId::SendDataResponse,
        CommandId::DataReceivedNotification,
        CommandId::WriteRamConfigRequest,
        CommandId::WriteRamConfigResponse,
        CommandId::ReadRamConfigRequest,
        CommandId::ReadRamConfigResponse,
        CommandId::StartNetworkRequest,
        CommandId::StartNetworkResponse,
        CommandId::NetworkStateChangedNotification,
        CommandId::ResetRequest,
        CommandId::ResetResponse,
        CommandId::SetTimeRequest,
        CommandId::SetTimeResponse,
        CommandId::GetTimeRequest,
        CommandId::GetTimeResponse,
        CommandId::GetNetworkAddressRequest,
        CommandId::GetNetworkAddressResponse,
        CommandId::GetVersionRequest,
        CommandId::GetVersionResponse,
    ];

    /// Look up a defined identifier by wire value.
    pub fn from_u16(value: u16) -> Option<CommandId> {
        Self::ALL.iter().copied().find(|id| *id as u16 == value)
    }

    /// The wire value of this identifier.
    pub fn as_u16(self) -> u16 {
        self as u16
    }

    /// Classify this identifier's direction.
    pub fn kind(self) -> CommandKind {
        match self {
            CommandId::DataReceivedNotification | CommandId::NetworkStateChangedNotification => {
                CommandKind::Notification
            }
            CommandId::GetNodeListResponse
            | CommandId::GetLinkListResponse
            | CommandId::GetRouteResponse
            | CommandId::MeasureRttResponse
            | CommandId::GetNeighborInfoResponse
            | CommandId::ControlFixedAddressResponse
            | CommandId::MeasureRadioStatusResponse
            | CommandId::ScanChannelResponse
            | CommandId::UpdateFirmwareResponse
            | CommandId::GetMyNeighborInfoResponse
            | CommandId::ReadConfigResponse
            | CommandId::WriteConfigResponse
            | CommandId::SaveConfigResponse
            | CommandId::ResetConfigResponse
            | CommandId::SendDataResponse
            | CommandId::WriteRamConfigResponse
            | CommandId::ReadRamConfigResponse
            | CommandId::StartNetworkResponse
            | CommandId::ResetResponse
            | CommandId::SetTimeResponse
            | CommandId::GetTimeResponse
            | CommandId::GetNetworkAddressResponse
            | CommandId::GetVersionResponse => CommandKind::Response,
            _ => CommandKind::Request,
        }
    }

    /// The response identifier paired with this request.
    ///
    /// Only meaningful for `CommandKind::Request` identifiers.
    pub fn response_id(self) -> u16 {
        self.as_u16() + 1
    }
}
