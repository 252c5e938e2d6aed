use std::fmt;

use serde::{Deserialize, Serialize};

/// Command identifiers. The numeric values are the wire contract.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum CommandId {
    Printf = 0,
    TerminalCmd = 1,
    VescFwd = 2,
    RcControl = 3,
    SetPos = 4,
    SetServoDirect = 5,
    ApAddPoints = 6,
    ApRemoveLastPoint = 7,
    ApClearPoints = 8,
    ApSetActive = 9,
    SendRtcmUsb = 10,
    SendNmeaRadio = 11,
    GetState = 12,
    GetMainConfig = 13,
    GetMainConfigDefault = 14,
    SetMainConfig = 15,
}

impl CommandId {
    /// Every known identifier, in wire order.
    pub const ALL: [CommandId; 16] = [
        CommandId::Printf,
        CommandId::TerminalCmd,
        CommandId::VescFwd,
        CommandId::RcControl,
        CommandId::SetPos,
        CommandId::SetServoDirect,
        CommandId::ApAddPoints,
        CommandId::ApRemoveLastPoint,
        CommandId::ApClearPoints,
        CommandId::ApSetActive,
        CommandId::SendRtcmUsb,
        CommandId::SendNmeaRadio,
        CommandId::GetState,
        CommandId::GetMainConfig,
        CommandId::GetMainConfigDefault,
        CommandId::SetMainConfig,
    ];

    /// Look up an identifier by its wire value.
    pub fn from_u8(value: u8) -> Option<Self> {
        Self::ALL.get(usize::from(value)).copied()
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }

    /// Mutating commands the vehicle confirms by echoing the id back.
    pub fn is_ack_class(self) -> bool {
        matches!(
            self,
            CommandId::ApAddPoints
                | CommandId::ApRemoveLastPoint
                | CommandId::ApClearPoints
                | CommandId::ApSetActive
                | CommandId::SetMainConfig
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            CommandId::Printf => "CMD_PRINTF",
            CommandId::TerminalCmd => "CMD_TERMINAL_CMD",
            CommandId::VescFwd => "CMD_VESC_FWD",
            CommandId::RcControl => "CMD_RC_CONTROL",
            CommandId::SetPos => "CMD_SET_POS",
            CommandId::SetServoDirect => "CMD_SET_SERVO_DIRECT",
            CommandId::ApAddPoints => "CMD_AP_ADD_POINTS",
            CommandId::ApRemoveLastPoint => "CMD_AP_REMOVE_LAST_POINT",
            CommandId::ApClearPoints => "CMD_AP_CLEAR_POINTS",
            CommandId::ApSetActive => "CMD_AP_SET_ACTIVE",
            CommandId::SendRtcmUsb => "CMD_SEND_RTCM_USB",
            CommandId::SendNmeaRadio => "CMD_SEND_NMEA_RADIO",
            CommandId::GetState => "CMD_GET_STATE",
            CommandId::GetMainConfig => "CMD_GET_MAIN_CONFIG",
            CommandId::GetMainConfigDefault => "CMD_GET_MAIN_CONFIG_DEFAULT",
            CommandId::SetMainConfig => "CMD_SET_MAIN_CONFIG",
        }
    }
}

impl fmt::Display for CommandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl From<CommandId> for u8 {
    fn from(id: CommandId) -> Self {
        id as u8
    }
}

impl TryFrom<u8> for CommandId {
    type Error = u8;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::from_u8(value).ok_or(value)
    }
}
