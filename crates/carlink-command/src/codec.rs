use bytes::{BufMut, Bytes, BytesMut};
use tracing::trace;

use crate::error::{CommandError, Result};
use crate::fixed::{
    get_scaled, put_scaled, SCALE_DEFAULT, SCALE_DUTY, SCALE_POSITION, SCALE_QUATERNION,
};
use crate::id::CommandId;
use crate::types::{FaultCode, MainConfig, RcMode, RoutePoint, StateReport};

/// Bytes per route point on the wire: x, y, speed.
const ROUTE_POINT_LEN: usize = 12;

/// Which side of the link a payload is travelling towards.
///
/// Requests and their responses share a command id; the direction decides
/// whether `CMD_GET_STATE` is a request or a state report, and whether an
/// empty `CMD_AP_CLEAR_POINTS` is the command or its acknowledgment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Ground station to vehicle.
    ToVehicle,
    /// Vehicle to ground station.
    FromVehicle,
}

/// A decoded command message.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Log or console text from the vehicle.
    Print(String),
    /// Console command text for the vehicle.
    TerminalCmd(String),
    /// Opaque motor controller packet, forwarded as-is.
    VescForward(Bytes),
    RcControl {
        mode: RcMode,
        value: f64,
        steering: f64,
    },
    SetPosition {
        x: f64,
        y: f64,
        angle: f64,
    },
    SetServoDirect(f64),
    AddRoutePoints(Vec<RoutePoint>),
    RemoveLastRoutePoint,
    ClearRoute,
    SetAutopilotActive(bool),
    /// RTCM correction stream bytes.
    Rtcm(Bytes),
    /// NMEA sentence bytes.
    Nmea(Bytes),
    GetState,
    State(Box<StateReport>),
    GetConfig,
    GetDefaultConfig,
    Config(Box<MainConfig>),
    DefaultConfig(Box<MainConfig>),
    SetConfig(Box<MainConfig>),
    /// The vehicle confirmed a mutating command.
    Ack(CommandId),
}

impl Command {
    /// The wire identifier of this command.
    pub fn id(&self) -> CommandId {
        match self {
            Command::Print(_) => CommandId::Printf,
            Command::TerminalCmd(_) => CommandId::TerminalCmd,
            Command::VescForward(_) => CommandId::VescFwd,
            Command::RcControl { .. } => CommandId::RcControl,
            Command::SetPosition { .. } => CommandId::SetPos,
            Command::SetServoDirect(_) => CommandId::SetServoDirect,
            Command::AddRoutePoints(_) => CommandId::ApAddPoints,
            Command::RemoveLastRoutePoint => CommandId::ApRemoveLastPoint,
            Command::ClearRoute => CommandId::ApClearPoints,
            Command::SetAutopilotActive(_) => CommandId::ApSetActive,
            Command::Rtcm(_) => CommandId::SendRtcmUsb,
            Command::Nmea(_) => CommandId::SendNmeaRadio,
            Command::GetState | Command::State(_) => CommandId::GetState,
            Command::GetConfig | Command::Config(_) => CommandId::GetMainConfig,
            Command::GetDefaultConfig | Command::DefaultConfig(_) => {
                CommandId::GetMainConfigDefault
            }
            Command::SetConfig(_) => CommandId::SetMainConfig,
            Command::Ack(id) => *id,
        }
    }

    /// Whether the vehicle answers this command with an acknowledgment.
    pub fn expects_ack(&self) -> bool {
        !matches!(self, Command::Ack(_)) && self.id().is_ack_class()
    }
}

/// A command together with the vehicle id it targets or came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Packet {
    pub id: u8,
    pub command: Command,
}

impl Packet {
    pub fn new(id: u8, command: Command) -> Self {
        Self { id, command }
    }
}

/// Encode a command into a payload.
pub fn encode_packet(id: u8, command: &Command) -> Bytes {
    let mut dst = BytesMut::new();
    encode_packet_into(id, command, &mut dst);
    dst.freeze()
}

/// Encode a command, appending to `dst`.
pub fn encode_packet_into(id: u8, command: &Command, dst: &mut BytesMut) {
    dst.put_u8(id);
    dst.put_u8(command.id().as_u8());

    match command {
        Command::Print(text) | Command::TerminalCmd(text) => put_latin1(dst, text),
        Command::VescForward(data) | Command::Rtcm(data) | Command::Nmea(data) => {
            dst.put_slice(data)
        }
        Command::RcControl {
            mode,
            value,
            steering,
        } => {
            dst.put_u8(mode.as_u8());
            put_scaled(dst, *value, SCALE_DUTY);
            put_scaled(dst, *steering, SCALE_DEFAULT);
        }
        Command::SetPosition { x, y, angle } => {
            put_scaled(dst, *x, SCALE_POSITION);
            put_scaled(dst, *y, SCALE_POSITION);
            put_scaled(dst, *angle, SCALE_DEFAULT);
        }
        Command::SetServoDirect(value) => put_scaled(dst, *value, SCALE_DEFAULT),
        Command::AddRoutePoints(points) => {
            dst.reserve(points.len() * ROUTE_POINT_LEN);
            for point in points {
                put_scaled(dst, point.x, SCALE_POSITION);
                put_scaled(dst, point.y, SCALE_POSITION);
                put_scaled(dst, point.speed, SCALE_DEFAULT);
            }
        }
        Command::SetAutopilotActive(active) => dst.put_u8(u8::from(*active)),
        Command::State(state) => put_state(dst, state),
        Command::Config(conf) | Command::DefaultConfig(conf) | Command::SetConfig(conf) => {
            put_config(dst, conf)
        }
        Command::RemoveLastRoutePoint
        | Command::ClearRoute
        | Command::GetState
        | Command::GetConfig
        | Command::GetDefaultConfig
        | Command::Ack(_) => {}
    }
}

/// Decode a payload travelling in `direction`.
///
/// Returns `Ok(None)` for command ids this codec does not know.
pub fn decode_packet(payload: &[u8], direction: Direction) -> Result<Option<Packet>> {
    if payload.len() < 2 {
        return Err(CommandError::TooShort { len: payload.len() });
    }

    let id = payload[0];
    let Some(command_id) = CommandId::from_u8(payload[1]) else {
        trace!(id, command = payload[1], "ignoring unknown command");
        return Ok(None);
    };

    let mut body = Reader::new(command_id, &payload[2..]);
    let from_vehicle = direction == Direction::FromVehicle;

    let command = match command_id {
        CommandId::Printf => Command::Print(latin1(body.rest())),
        CommandId::TerminalCmd => Command::TerminalCmd(latin1(body.rest())),
        CommandId::VescFwd => Command::VescForward(Bytes::copy_from_slice(body.rest())),
        CommandId::SendRtcmUsb => Command::Rtcm(Bytes::copy_from_slice(body.rest())),
        CommandId::SendNmeaRadio => Command::Nmea(Bytes::copy_from_slice(body.rest())),
        CommandId::RcControl => {
            let raw_mode = body.u8()?;
            let mode = RcMode::from_u8(raw_mode).ok_or(CommandError::InvalidValue {
                command: command_id,
                field: "mode",
                value: raw_mode,
            })?;
            Command::RcControl {
                mode,
                value: body.scaled(SCALE_DUTY)?,
                steering: body.scaled(SCALE_DEFAULT)?,
            }
        }
        CommandId::SetPos => Command::SetPosition {
            x: body.scaled(SCALE_POSITION)?,
            y: body.scaled(SCALE_POSITION)?,
            angle: body.scaled(SCALE_DEFAULT)?,
        },
        CommandId::SetServoDirect => Command::SetServoDirect(body.scaled(SCALE_DEFAULT)?),
        acked if from_vehicle && acked.is_ack_class() => Command::Ack(acked),
        CommandId::ApAddPoints => Command::AddRoutePoints(body.route_points()?),
        CommandId::ApRemoveLastPoint => Command::RemoveLastRoutePoint,
        CommandId::ApClearPoints => Command::ClearRoute,
        CommandId::ApSetActive => Command::SetAutopilotActive(body.u8()? != 0),
        CommandId::SetMainConfig => Command::SetConfig(Box::new(body.config()?)),
        CommandId::GetState if from_vehicle => Command::State(Box::new(body.state()?)),
        CommandId::GetState => Command::GetState,
        CommandId::GetMainConfig if from_vehicle => Command::Config(Box::new(body.config()?)),
        CommandId::GetMainConfig => Command::GetConfig,
        CommandId::GetMainConfigDefault if from_vehicle => {
            Command::DefaultConfig(Box::new(body.config()?))
        }
        CommandId::GetMainConfigDefault => Command::GetDefaultConfig,
    };

    Ok(Some(Packet { id, command }))
}

fn put_latin1(dst: &mut BytesMut, text: &str) {
    dst.extend(text.chars().map(|c| u8::try_from(c).unwrap_or(b'?')));
}

fn latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| char::from(b)).collect()
}

fn put_state(dst: &mut BytesMut, state: &StateReport) {
    dst.put_u8(state.fw_major);
    dst.put_u8(state.fw_minor);
    for value in [state.roll, state.pitch, state.yaw] {
        put_scaled(dst, value, SCALE_DEFAULT);
    }
    for value in state.accel.iter().chain(&state.gyro).chain(&state.mag) {
        put_scaled(dst, *value, SCALE_DEFAULT);
    }
    for value in state.q {
        put_scaled(dst, value, SCALE_QUATERNION);
    }
    put_scaled(dst, state.px, SCALE_POSITION);
    put_scaled(dst, state.py, SCALE_POSITION);
    for value in [state.speed, state.vin, state.temp_fet] {
        put_scaled(dst, value, SCALE_DEFAULT);
    }
    dst.put_u8(state.fault.as_u8());
}

fn put_config(dst: &mut BytesMut, conf: &MainConfig) {
    dst.put_u8(u8::from(conf.mag_comp));
    put_scaled(dst, conf.yaw_imu_gain, SCALE_DEFAULT);
    for value in conf.mag_cal_center.iter().chain(conf.mag_cal_matrix.iter().flatten()) {
        put_scaled(dst, *value, SCALE_DEFAULT);
    }
    for value in [
        conf.gear_ratio,
        conf.wheel_diam,
        conf.motor_poles,
        conf.steering_max_angle_rad,
        conf.steering_center,
        conf.steering_left,
        conf.steering_right,
        conf.steering_ramp_time,
        conf.axis_distance,
    ] {
        put_scaled(dst, value, SCALE_DEFAULT);
    }
}

/// Cursor over a command body that reports truncation with context.
struct Reader<'a> {
    command: CommandId,
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(command: CommandId, buf: &'a [u8]) -> Self {
        Self { command, buf }
    }

    fn truncated(&self, needed: usize) -> CommandError {
        CommandError::Truncated {
            command: self.command,
            needed,
            available: self.buf.len(),
        }
    }

    fn u8(&mut self) -> Result<u8> {
        let buf = self.buf;
        let (&first, rest) = buf.split_first().ok_or_else(|| self.truncated(1))?;
        self.buf = rest;
        Ok(first)
    }

    fn scaled(&mut self, scale: f64) -> Result<f64> {
        get_scaled(&mut self.buf, scale).ok_or_else(|| self.truncated(4))
    }

    fn scaled_n<const N: usize>(&mut self, scale: f64) -> Result<[f64; N]> {
        let mut out = [0.0; N];
        for value in &mut out {
            *value = self.scaled(scale)?;
        }
        Ok(out)
    }

    fn rest(&mut self) -> &'a [u8] {
        std::mem::take(&mut self.buf)
    }

    fn route_points(&mut self) -> Result<Vec<RoutePoint>> {
        let partial = self.buf.len() % ROUTE_POINT_LEN;
        if partial != 0 {
            return Err(CommandError::Truncated {
                command: self.command,
                needed: ROUTE_POINT_LEN - partial,
                available: partial,
            });
        }
        let mut points = Vec::with_capacity(self.buf.len() / ROUTE_POINT_LEN);
        while !self.buf.is_empty() {
            points.push(RoutePoint::new(
                self.scaled(SCALE_POSITION)?,
                self.scaled(SCALE_POSITION)?,
                self.scaled(SCALE_DEFAULT)?,
            ));
        }
        Ok(points)
    }

    fn state(&mut self) -> Result<StateReport> {
        Ok(StateReport {
            fw_major: self.u8()?,
            fw_minor: self.u8()?,
            roll: self.scaled(SCALE_DEFAULT)?,
            pitch: self.scaled(SCALE_DEFAULT)?,
            yaw: self.scaled(SCALE_DEFAULT)?,
            accel: self.scaled_n(SCALE_DEFAULT)?,
            gyro: self.scaled_n(SCALE_DEFAULT)?,
            mag: self.scaled_n(SCALE_DEFAULT)?,
            q: self.scaled_n(SCALE_QUATERNION)?,
            px: self.scaled(SCALE_POSITION)?,
            py: self.scaled(SCALE_POSITION)?,
            speed: self.scaled(SCALE_DEFAULT)?,
            vin: self.scaled(SCALE_DEFAULT)?,
            temp_fet: self.scaled(SCALE_DEFAULT)?,
            fault: FaultCode::from_u8(self.u8()?),
        })
    }

    fn config(&mut self) -> Result<MainConfig> {
        Ok(MainConfig {
            mag_comp: self.u8()? != 0,
            yaw_imu_gain: self.scaled(SCALE_DEFAULT)?,
            mag_cal_center: self.scaled_n(SCALE_DEFAULT)?,
            mag_cal_matrix: [
                self.scaled_n(SCALE_DEFAULT)?,
                self.scaled_n(SCALE_DEFAULT)?,
                self.scaled_n(SCALE_DEFAULT)?,
            ],
            gear_ratio: self.scaled(SCALE_DEFAULT)?,
            wheel_diam: self.scaled(SCALE_DEFAULT)?,
            motor_poles: self.scaled(SCALE_DEFAULT)?,
            steering_max_angle_rad: self.scaled(SCALE_DEFAULT)?,
            steering_center: self.scaled(SCALE_DEFAULT)?,
            steering_left: self.scaled(SCALE_DEFAULT)?,
            steering_right: self.scaled(SCALE_DEFAULT)?,
            steering_ramp_time: self.scaled(SCALE_DEFAULT)?,
            axis_distance: self.scaled(SCALE_DEFAULT)?,
        })
    }
}
